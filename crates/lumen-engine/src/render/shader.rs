//! Shader sources and compilation.
//!
//! The three GPU programs are plain WGSL text. They are embedded into the
//! binary, or read from a directory so they can be edited without rebuilding.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::device::{ResourceLedger, Tracked};

pub const VERTEX_FILE: &str = "fullscreen.vert.wgsl";
pub const FRAGMENT_FILE: &str = "texture.frag.wgsl";
pub const COMPUTE_FILE: &str = "raytrace.comp.wgsl";

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader `{}` is empty", path.display())]
    Empty { path: PathBuf },

    #[error("shader `{name}` failed to compile:{messages}")]
    Compile { name: String, messages: String },
}

/// WGSL text plus the name used for labels and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub name: String,
    pub text: String,
}

impl ShaderSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads a WGSL file; the file name becomes the shader name.
    pub fn from_file(path: &Path) -> Result<Self, ShaderError> {
        let text = std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if text.trim().is_empty() {
            return Err(ShaderError::Empty {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { name, text })
    }
}

/// The display program (vertex + fragment) and the compute program.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
    pub compute: ShaderSource,
}

impl ShaderSet {
    /// Shaders compiled into the binary.
    pub fn embedded() -> Self {
        Self {
            vertex: ShaderSource::new(
                VERTEX_FILE,
                include_str!("../../shaders/fullscreen.vert.wgsl"),
            ),
            fragment: ShaderSource::new(
                FRAGMENT_FILE,
                include_str!("../../shaders/texture.frag.wgsl"),
            ),
            compute: ShaderSource::new(
                COMPUTE_FILE,
                include_str!("../../shaders/raytrace.comp.wgsl"),
            ),
        }
    }

    /// Reads `fullscreen.vert.wgsl`, `texture.frag.wgsl` and `raytrace.comp.wgsl`
    /// from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let dir = dir.as_ref();
        log::info!("loading shaders from {}", dir.display());

        Ok(Self {
            vertex: ShaderSource::from_file(&dir.join(VERTEX_FILE))?,
            fragment: ShaderSource::from_file(&dir.join(FRAGMENT_FILE))?,
            compute: ShaderSource::from_file(&dir.join(COMPUTE_FILE))?,
        })
    }
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Creates a shader module and checks the compiler's diagnostics.
///
/// Warnings are logged; any error message fails the compilation.
pub fn compile(
    device: &wgpu::Device,
    ledger: &ResourceLedger,
    source: &ShaderSource,
) -> Result<Tracked<wgpu::ShaderModule>, ShaderError> {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&source.name),
        source: wgpu::ShaderSource::Wgsl(source.text.as_str().into()),
    });

    let info = pollster::block_on(module.get_compilation_info());

    let mut errors = String::new();
    for msg in &info.messages {
        let line = msg.location.map(|l| l.line_number).unwrap_or(0);
        match msg.message_type {
            wgpu::CompilationMessageType::Error => {
                let _ = write!(errors, "\n  {}:{line}: {}", source.name, msg.message);
            }
            wgpu::CompilationMessageType::Warning => {
                log::warn!("{}:{line}: {}", source.name, msg.message);
            }
            wgpu::CompilationMessageType::Info => {
                log::debug!("{}:{line}: {}", source.name, msg.message);
            }
        }
    }

    if !errors.is_empty() {
        return Err(ShaderError::Compile {
            name: source.name.clone(),
            messages: errors,
        });
    }

    log::debug!("compiled shader `{}`", source.name);
    Ok(ledger.track(source.name.clone(), module))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lumen-shader-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn embedded_shaders_declare_expected_entry_points() {
        let set = ShaderSet::embedded();
        assert!(set.vertex.text.contains("fn vs_main"));
        assert!(set.fragment.text.contains("fn fs_main"));
        assert!(set.compute.text.contains("fn main"));
        assert_eq!(set.compute.name, COMPUTE_FILE);
    }

    #[test]
    fn compute_shader_uses_every_host_binding() {
        let text = ShaderSet::embedded().compute.text;
        for binding in 0..=7 {
            assert!(
                text.contains(&format!("@binding({binding})")),
                "binding {binding} missing from compute shader"
            );
        }
    }

    #[test]
    fn load_dir_reads_all_three_files() {
        let dir = scratch_dir("ok");
        std::fs::write(dir.join(VERTEX_FILE), "// vs").unwrap();
        std::fs::write(dir.join(FRAGMENT_FILE), "// fs").unwrap();
        std::fs::write(dir.join(COMPUTE_FILE), "// cs").unwrap();

        let set = ShaderSet::load_dir(&dir).unwrap();
        assert_eq!(set.vertex, ShaderSource::new(VERTEX_FILE, "// vs"));
        assert_eq!(set.compute.text, "// cs");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = scratch_dir("missing");
        std::fs::write(dir.join(VERTEX_FILE), "// vs").unwrap();

        let err = ShaderSet::load_dir(&dir).unwrap_err();
        match &err {
            ShaderError::Read { path, .. } => assert!(path.ends_with(FRAGMENT_FILE)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains(FRAGMENT_FILE));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn blank_file_is_rejected() {
        let dir = scratch_dir("blank");
        let path = dir.join(COMPUTE_FILE);
        std::fs::write(&path, "  \n").unwrap();

        assert!(matches!(
            ShaderSource::from_file(&path),
            Err(ShaderError::Empty { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
