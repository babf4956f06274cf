use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, InitCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Allow the user to resize the window.
    pub resizable: bool,
    /// Pressing Escape ends the run.
    pub exit_on_escape: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            initial_size: LogicalSize::new(640.0, 480.0),
            resizable: true,
            exit_on_escape: true,
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.commands.push(Command::SetTitle(title.into()));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }

    fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    SetTitle(String),
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, runs `app` until exit, and returns the init error if
    /// `App::init` failed.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    /// No window yet.
    Pending,
    /// `init` succeeded; `update` is being driven.
    Running,
    /// `terminate` ran, or `init` failed.
    Stopped,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    phase: Phase,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            phase: Phase::Pending,
            failure: None,
        }
    }

    /// Creates the window + GPU and runs `App::init`.
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Vec<Command>> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let entry = self.entry.insert(entry);
        let app = &mut self.app;
        let mut runtime_ctx = RuntimeCtx::default();

        entry.with_mut(|fields| {
            let mut ctx = InitCtx {
                window: WindowCtx {
                    id: fields.window.id(),
                    window: fields.window,
                },
                gpu: fields.gpu,
                runtime: &mut runtime_ctx,
            };
            app.init(&mut ctx)
        })?;

        // Measure the first frame from the end of init, not from clock creation.
        entry.with_clock_mut(|clock| clock.reset());
        self.phase = Phase::Running;
        log::info!("initialized `{}`", self.config.title);

        Ok(runtime_ctx.take_commands())
    }

    /// Runs `App::terminate` at most once, then drops the window and GPU.
    fn shutdown(&mut self) {
        if self.phase == Phase::Running {
            if let Some(entry) = self.entry.as_ref() {
                let app = &mut self.app;
                entry.with_gpu(|gpu| {
                    gpu.wait_idle();
                    app.terminate(gpu);
                });
            }
            log::info!("terminated");
        }
        self.phase = Phase::Stopped;
        self.entry = None;
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown();
        event_loop.exit();
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, commands: Vec<Command>) {
        for cmd in commands {
            match cmd {
                Command::SetTitle(title) => {
                    if let Some(entry) = self.entry.as_ref() {
                        entry.with_window(|w| w.set_title(&title));
                    }
                }
                Command::Exit => {
                    self.request_exit(event_loop);
                    return;
                }
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let app = &mut self.app;
        let mut runtime_ctx = RuntimeCtx::default();

        let control = entry.with_mut(|fields| {
            let time: FrameTime = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: fields.window,
                },
                gpu: fields.gpu,
                time,
                runtime: &mut runtime_ctx,
            };
            app.update(&mut ctx)
        });

        if control == AppControl::Exit {
            runtime_ctx.exit();
        }

        let commands = runtime_ctx.take_commands();
        self.apply_commands(event_loop, commands);
    }

    fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.phase != Phase::Pending {
            return;
        }

        match self.start(event_loop) {
            Ok(commands) => {
                self.apply_commands(event_loop, commands);
                if let Some(entry) = self.entry.as_ref() {
                    entry.with_window(|w| w.request_redraw());
                }
            }
            Err(e) => {
                log::error!("initialization failed: {e:#}");
                self.failure = Some(e);
                // Nothing to terminate: the app never reached the running phase.
                self.phase = Phase::Stopped;
                self.entry = None;
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.phase != Phase::Running {
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: one dispatch + draw per frame.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.phase != Phase::Running {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.request_exit(event_loop),

            WindowEvent::KeyboardInput { event: key, .. }
                if self.config.exit_on_escape && is_escape_press(key) =>
            {
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                    entry.with_window(|w| w.request_redraw());
                }
                self.app.reshape(*new_size);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                    self.app.reshape(new_size);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn is_escape_press(key: &KeyEvent) -> bool {
    key.state == ElementState::Pressed
        && !key.repeat
        && key.physical_key == PhysicalKey::Code(KeyCode::Escape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_buffered_in_order() {
        let mut ctx = RuntimeCtx::default();
        ctx.set_title("lumen - 60 fps");
        ctx.exit();

        let commands = ctx.take_commands();
        assert_eq!(
            commands,
            vec![Command::SetTitle("lumen - 60 fps".into()), Command::Exit]
        );
        assert!(ctx.take_commands().is_empty());
    }

    #[test]
    fn default_config_matches_demo_resolution() {
        let config = RuntimeConfig::default();
        assert_eq!(config.initial_size, LogicalSize::new(640.0, 480.0));
        assert!(config.exit_on_escape);
    }
}
