//! Sizes of everything shared between the host and `raytrace.comp.wgsl`.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use super::scene::{PointLight, Sphere};

/// Extra floats after each xyz direction (keeps entries 16-byte aligned).
pub const DIRECTIONS_PADDING: usize = 1;

/// Floats per ray-stack entry: origin xyz + reflection weight, direction xyz +
/// transmission weight.
pub const RAY_STACK_LENGTH: usize = 4 + 3 + 1;

/// Slots of the per-pixel ray tree: a full binary tree five levels deep.
pub const STACK_DEPTH: u32 = 2 * 2 * 2 * 2 * 2 - 1;

/// Floats per ray origin.
pub const POSITION_STRIDE: usize = 4;

/// Floats per color-stack entry.
pub const COLOR_STRIDE: usize = 4;

/// `@workgroup_size` of the compute shader, in both x and y.
pub const LOCAL_SIZE: u32 = 16;

/// Storage buffers bound to the compute stage (bindings 1 to 6).
pub const STORAGE_BUFFER_COUNT: u32 = 6;

const F32: u64 = std::mem::size_of::<f32>() as u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("stack depth must be at least 1")]
    ZeroStackDepth,

    #[error("scene has no {0}")]
    EmptyScene(&'static str),

    #[error("{name} buffer needs {size} bytes but the device allows {limit}")]
    BufferTooLarge {
        name: &'static str,
        size: u64,
        limit: u64,
    },

    #[error("{width}x{height} output image exceeds the {limit}px texture limit")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },

    #[error("dispatch needs {count} workgroups per dimension but the device allows {limit}")]
    TooManyWorkgroups { count: u32, limit: u32 },

    #[error("compute stage needs {needed} storage buffers but the device allows {limit}")]
    TooFewStorageBuffers { needed: u32, limit: u32 },
}

/// Uniform at binding 7: what the shader would otherwise hard-code.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct TraceParams {
    pub width: u32,
    pub height: u32,
    pub stack_depth: u32,
    pub sphere_count: u32,
    pub light_count: u32,
    pub _pad: [u32; 3],
}

/// One storage buffer as sized for a given layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferSpec {
    pub name: &'static str,
    pub binding: u32,
    pub size: u64,
}

/// Image size and stack depth, with the derived byte sizes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceLayout {
    width: u32,
    height: u32,
    stack_depth: u32,
}

impl TraceLayout {
    pub fn new(width: u32, height: u32, stack_depth: u32) -> Result<Self, LayoutError> {
        if width == 0 || height == 0 {
            return Err(LayoutError::EmptyImage { width, height });
        }
        if stack_depth == 0 {
            return Err(LayoutError::ZeroStackDepth);
        }
        Ok(Self {
            width,
            height,
            stack_depth,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stack_depth(&self) -> u32 {
        self.stack_depth
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn direction_bytes(&self) -> u64 {
        self.pixels() * (3 + DIRECTIONS_PADDING) as u64 * F32
    }

    pub fn position_bytes(&self) -> u64 {
        self.pixels() * POSITION_STRIDE as u64 * F32
    }

    pub fn ray_stack_bytes(&self) -> u64 {
        self.pixels() * RAY_STACK_LENGTH as u64 * u64::from(self.stack_depth) * F32
    }

    pub fn color_stack_bytes(&self) -> u64 {
        self.pixels() * COLOR_STRIDE as u64 * u64::from(self.stack_depth) * F32
    }

    /// Storage buffers in binding order.
    pub fn buffers(&self, sphere_count: usize, light_count: usize) -> [BufferSpec; 6] {
        [
            BufferSpec {
                name: "directions",
                binding: 1,
                size: self.direction_bytes(),
            },
            BufferSpec {
                name: "positions",
                binding: 2,
                size: self.position_bytes(),
            },
            BufferSpec {
                name: "ray stack",
                binding: 3,
                size: self.ray_stack_bytes(),
            },
            BufferSpec {
                name: "spheres",
                binding: 4,
                size: (sphere_count * std::mem::size_of::<Sphere>()) as u64,
            },
            BufferSpec {
                name: "point lights",
                binding: 5,
                size: (light_count * std::mem::size_of::<PointLight>()) as u64,
            },
            BufferSpec {
                name: "color stack",
                binding: 6,
                size: self.color_stack_bytes(),
            },
        ]
    }

    /// Workgroup counts covering the image; edges are rounded up and the
    /// shader discards invocations outside the image.
    pub fn workgroups(&self) -> (u32, u32, u32) {
        (
            self.width.div_ceil(LOCAL_SIZE),
            self.height.div_ceil(LOCAL_SIZE),
            1,
        )
    }

    pub fn params(&self, sphere_count: usize, light_count: usize) -> TraceParams {
        TraceParams {
            width: self.width,
            height: self.height,
            stack_depth: self.stack_depth,
            sphere_count: sphere_count as u32,
            light_count: light_count as u32,
            _pad: [0; 3],
        }
    }

    /// Initial color stack: every entry opaque black.
    pub fn initial_color_stack(&self) -> Vec<f32> {
        let entries = (self.pixels() * u64::from(self.stack_depth)) as usize;
        [0.0, 0.0, 0.0, 1.0].repeat(entries)
    }

    /// Checks every buffer, the output image and the dispatch against `limits`.
    pub fn validate(
        &self,
        limits: &wgpu::Limits,
        sphere_count: usize,
        light_count: usize,
    ) -> Result<(), LayoutError> {
        if sphere_count == 0 {
            return Err(LayoutError::EmptyScene("spheres"));
        }
        if light_count == 0 {
            return Err(LayoutError::EmptyScene("point lights"));
        }

        if limits.max_storage_buffers_per_shader_stage < STORAGE_BUFFER_COUNT {
            return Err(LayoutError::TooFewStorageBuffers {
                needed: STORAGE_BUFFER_COUNT,
                limit: limits.max_storage_buffers_per_shader_stage,
            });
        }

        let tex_limit = limits.max_texture_dimension_2d;
        if self.width > tex_limit || self.height > tex_limit {
            return Err(LayoutError::TextureTooLarge {
                width: self.width,
                height: self.height,
                limit: tex_limit,
            });
        }

        let (gx, gy, _) = self.workgroups();
        let group_limit = limits.max_compute_workgroups_per_dimension;
        if gx.max(gy) > group_limit {
            return Err(LayoutError::TooManyWorkgroups {
                count: gx.max(gy),
                limit: group_limit,
            });
        }

        let binding_limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        for spec in self.buffers(sphere_count, light_count) {
            if spec.size > binding_limit {
                return Err(LayoutError::BufferTooLarge {
                    name: spec.name,
                    size: spec.size,
                    limit: binding_limit,
                });
            }
        }

        Ok(())
    }
}

const _: () = assert!(std::mem::size_of::<TraceParams>() == 32);
