use anyhow::{Context, Result};
use winit::dpi::{LogicalSize, PhysicalSize};

use lumen_engine::core::{App, AppControl, FrameCtx, InitCtx};
use lumen_engine::device::{Gpu, GpuInit};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::render::ShaderSet;
use lumen_engine::time::FpsCounter;
use lumen_engine::trace::{RayTracer, Scene, TracerConfig};
use lumen_engine::window::{Runtime, RuntimeConfig};

const TITLE: &str = "Lumen Ray Tracer";

/// Directory to read the WGSL programs from instead of the embedded copies.
const SHADER_DIR_ENV: &str = "LUMEN_SHADER_DIR";

const CLEAR: wgpu::Color = wgpu::Color::BLACK;

struct RayTracerDemo {
    config: TracerConfig,
    tracer: Option<RayTracer>,
    fps: FpsCounter,
}

impl RayTracerDemo {
    fn new(config: TracerConfig) -> Self {
        Self {
            config,
            tracer: None,
            fps: FpsCounter::new(1.0),
        }
    }
}

impl App for RayTracerDemo {
    fn init(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()> {
        let shaders = match std::env::var_os(SHADER_DIR_ENV) {
            Some(dir) => ShaderSet::load_dir(&dir)
                .with_context(|| format!("failed to load shaders from {SHADER_DIR_ENV}"))?,
            None => ShaderSet::embedded(),
        };

        let size = ctx.window.physical_size();
        log::info!(
            "window {}x{}, tracing at {}x{}",
            size.width,
            size.height,
            self.config.width,
            self.config.height
        );

        let tracer = RayTracer::new(ctx.gpu, &self.config, &Scene::demo(), &shaders)
            .context("failed to set up the ray tracer")?;
        self.tracer = Some(tracer);
        Ok(())
    }

    fn reshape(&mut self, size: PhysicalSize<u32>) {
        log::debug!("reshape to {}x{}", size.width, size.height);
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(tracer) = self.tracer.as_ref() else {
            return AppControl::Exit;
        };

        let control = ctx.render(CLEAR, |_, target| tracer.encode(target));

        if let Some(fps) = self.fps.record(ctx.time.dt) {
            ctx.runtime.set_title(format!("{TITLE} - {fps:.1} fps"));
        }

        control
    }

    fn terminate(&mut self, gpu: &Gpu<'_>) {
        self.tracer = None;

        let report = gpu.ledger().report();
        if report.is_balanced() {
            log::info!("{report}");
        } else {
            log::warn!("{report}");
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let tracer = TracerConfig::default();

    let runtime = RuntimeConfig {
        title: TITLE.to_string(),
        initial_size: LogicalSize::new(f64::from(tracer.width), f64::from(tracer.height)),
        resizable: false,
        exit_on_escape: true,
    };

    let gpu = GpuInit {
        prefer_srgb: false,
        use_adapter_limits: true,
        ..GpuInit::default()
    };

    Runtime::run(runtime, gpu, RayTracerDemo::new(tracer))
}
