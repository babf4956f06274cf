use glam::Vec3;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::device::{Gpu, ResourceLedger, Tracked};
use crate::render::shader::{self, ShaderError, ShaderSet};
use crate::render::{DisplayPipeline, RenderTarget};

use super::layout::{LayoutError, TraceLayout, DIRECTIONS_PADDING, STACK_DEPTH};
use super::raygen::{self, RayGenError};
use super::scene::Scene;

/// Format of the image the compute shader writes (binding 0).
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Binding of the `TraceParams` uniform in the compute program.
pub const PARAMS_BINDING: u32 = 7;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("could not create direction buffer")]
    Directions(#[source] RayGenError),

    #[error("could not orient primary rays")]
    Camera(#[source] RayGenError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Resolution, camera and traversal depth of the tracer.
///
/// A zero width or height is rejected by [`TraceLayout::new`] as
/// [`TraceError::Layout`] before any ray is generated, so
/// [`TraceError::Directions`] only reports field-of-view problems.
#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    pub width: u32,
    pub height: u32,
    pub fov_y_degrees: f32,
    pub stack_depth: u32,
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_y_degrees: 30.0,
            stack_depth: STACK_DEPTH,
            eye: Vec3::ZERO,
            center: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

struct TraceBuffers {
    directions: Tracked<wgpu::Buffer>,
    positions: Tracked<wgpu::Buffer>,
    ray_stack: Tracked<wgpu::Buffer>,
    spheres: Tracked<wgpu::Buffer>,
    lights: Tracked<wgpu::Buffer>,
    colors: Tracked<wgpu::Buffer>,
    params: Tracked<wgpu::Buffer>,
}

/// Compute ray tracer writing into a texture, plus the quad that shows it.
///
/// Everything is created in [`RayTracer::new`] and released when the value drops.
pub struct RayTracer {
    layout: TraceLayout,

    compute_pipeline: Tracked<wgpu::ComputePipeline>,
    compute_bind_group: Tracked<wgpu::BindGroup>,
    display_bind_group: Tracked<wgpu::BindGroup>,
    display: DisplayPipeline,

    _compute_layout: Tracked<wgpu::PipelineLayout>,
    _compute_bgl: Tracked<wgpu::BindGroupLayout>,

    buffers: TraceBuffers,

    _output_view: Tracked<wgpu::TextureView>,
    _output: Tracked<wgpu::Texture>,

    _modules: [Tracked<wgpu::ShaderModule>; 3],
}

impl RayTracer {
    /// Builds the tracer on the window's device, drawing into its surface format.
    pub fn new(
        gpu: &Gpu<'_>,
        config: &TracerConfig,
        scene: &Scene,
        shaders: &ShaderSet,
    ) -> Result<Self, TraceError> {
        Self::with_device(
            gpu.device(),
            gpu.ledger(),
            &gpu.limits(),
            gpu.surface_format(),
            config,
            scene,
            shaders,
        )
    }

    /// Builds the tracer on any device. Every object is registered with
    /// `ledger`; on error, whatever was already created is released again.
    pub fn with_device(
        device: &wgpu::Device,
        ledger: &ResourceLedger,
        limits: &wgpu::Limits,
        surface_format: wgpu::TextureFormat,
        config: &TracerConfig,
        scene: &Scene,
        shaders: &ShaderSet,
    ) -> Result<Self, TraceError> {
        let layout = TraceLayout::new(config.width, config.height, config.stack_depth)?;
        layout.validate(limits, scene.spheres.len(), scene.lights.len())?;

        let vertex = shader::compile(device, ledger, &shaders.vertex)?;
        let fragment = shader::compile(device, ledger, &shaders.fragment)?;
        let compute = shader::compile(device, ledger, &shaders.compute)?;

        let (output, output_view) = create_output(device, ledger, &layout);

        let display = DisplayPipeline::new(device, ledger, surface_format, &vertex, &fragment);
        let display_bind_group = display.create_bind_group(device, ledger, &output_view);

        let buffers = upload_buffers(device, ledger, &layout, config, scene)?;

        let compute_bgl = ledger.track("trace bgl", create_compute_bgl(device));
        let compute_layout = ledger.track(
            "trace pipeline layout",
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trace pipeline layout"),
                bind_group_layouts: &[&*compute_bgl],
                immediate_size: 0,
            }),
        );

        let compute_pipeline = ledger.track(
            "trace pipeline",
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("trace pipeline"),
                layout: Some(&*compute_layout),
                module: &compute,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            }),
        );

        let compute_bind_group = ledger.track(
            "trace bind group",
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("trace bind group"),
                layout: &compute_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&output_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers.directions.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffers.positions.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: buffers.ray_stack.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: buffers.spheres.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: buffers.lights.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: buffers.colors.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: PARAMS_BINDING,
                        resource: buffers.params.as_entire_binding(),
                    },
                ],
            }),
        );

        log::info!(
            "ray tracer ready: {}x{}, {} spheres, {} lights, stack depth {}",
            layout.width(),
            layout.height(),
            scene.spheres.len(),
            scene.lights.len(),
            layout.stack_depth()
        );

        Ok(Self {
            layout,
            compute_pipeline,
            compute_bind_group,
            display_bind_group,
            display,
            _compute_layout: compute_layout,
            _compute_bgl: compute_bgl,
            buffers,
            _output_view: output_view,
            _output: output,
            _modules: [vertex, fragment, compute],
        })
    }

    pub fn layout(&self) -> &TraceLayout {
        &self.layout
    }

    /// Records one frame: the trace dispatch, then the full-screen quad.
    ///
    /// Both passes go into the same encoder, so the draw sees the finished image.
    pub fn encode(&self, target: &mut RenderTarget<'_>) {
        {
            let mut pass = target.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("trace pass"),
                timestamp_writes: None,
            });

            let (x, y, z) = self.layout.workgroups();
            pass.set_pipeline(&self.compute_pipeline);
            pass.set_bind_group(0, &*self.compute_bind_group, &[]);
            pass.dispatch_workgroups(x, y, z);
        }

        self.display.draw(target, &self.display_bind_group);
    }
}

impl Drop for RayTracer {
    fn drop(&mut self) {
        log::debug!(
            "releasing ray tracer ({} bytes of storage)",
            self.buffers.total_bytes()
        );
    }
}

impl TraceBuffers {
    fn total_bytes(&self) -> u64 {
        [
            &self.directions,
            &self.positions,
            &self.ray_stack,
            &self.spheres,
            &self.lights,
            &self.colors,
            &self.params,
        ]
        .iter()
        .map(|b| b.size())
        .sum()
    }
}

fn create_output(
    device: &wgpu::Device,
    ledger: &ResourceLedger,
    layout: &TraceLayout,
) -> (Tracked<wgpu::Texture>, Tracked<wgpu::TextureView>) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("trace output"),
        size: wgpu::Extent3d {
            width: layout.width(),
            height: layout.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    (
        ledger.track("trace output", texture),
        ledger.track("trace output view", view),
    )
}

fn upload_buffers(
    device: &wgpu::Device,
    ledger: &ResourceLedger,
    layout: &TraceLayout,
    config: &TracerConfig,
    scene: &Scene,
) -> Result<TraceBuffers, TraceError> {
    log::info!("preparing buffers ...");

    let directions = raygen::perspective_directions(
        config.fov_y_degrees,
        layout.width(),
        layout.height(),
        DIRECTIONS_PADDING,
    )
    .map_err(TraceError::Directions)?;

    let rays = raygen::look_at(
        &directions,
        DIRECTIONS_PADDING,
        layout.width(),
        layout.height(),
        config.eye,
        config.center,
        config.up,
    )
    .map_err(TraceError::Camera)?;

    let colors = layout.initial_color_stack();
    let params = layout.params(scene.spheres.len(), scene.lights.len());

    log::info!("buffers prepared");

    let storage = wgpu::BufferUsages::STORAGE;
    let init = |name: &'static str, contents: &[u8], usage: wgpu::BufferUsages| {
        ledger.track(
            name,
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(name),
                contents,
                usage,
            }),
        )
    };

    // wgpu zero-initializes new buffers, which is the ray stack's starting state.
    let ray_stack = ledger.track(
        "ray stack",
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ray stack"),
            size: layout.ray_stack_bytes(),
            usage: storage,
            mapped_at_creation: false,
        }),
    );

    Ok(TraceBuffers {
        directions: init("directions", bytemuck::cast_slice(&rays.directions), storage),
        positions: init("positions", bytemuck::cast_slice(&rays.positions), storage),
        ray_stack,
        spheres: init("spheres", scene.sphere_bytes(), storage),
        lights: init("point lights", scene.light_bytes(), storage),
        colors: init("color stack", bytemuck::cast_slice(&colors), storage),
        params: init(
            "trace params",
            bytemuck::bytes_of(&params),
            wgpu::BufferUsages::UNIFORM,
        ),
    })
}

fn create_compute_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("trace bgl"),
        entries: &[
            // Output image
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: OUTPUT_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            storage(1, true),  // directions
            storage(2, true),  // positions
            storage(3, false), // ray stack
            storage(4, true),  // spheres
            storage(5, true),  // point lights
            storage(6, false), // color stack
            wgpu::BindGroupLayoutEntry {
                binding: PARAMS_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_the_demo_camera() {
        let c = TracerConfig::default();
        assert_eq!((c.width, c.height), (640, 480));
        assert_eq!(c.fov_y_degrees, 30.0);
        assert_eq!(c.stack_depth, 31);
        assert_eq!((c.eye, c.center, c.up), (Vec3::ZERO, Vec3::NEG_Z, Vec3::Y));
    }

    #[test]
    fn direction_failure_names_the_buffer() {
        let err = TraceError::Directions(RayGenError::FieldOfView(0.0));
        assert_eq!(err.to_string(), "could not create direction buffer");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("vertical field of view must be within (0, 180) degrees, got 0")
        );
    }

    #[test]
    fn layout_errors_pass_through() {
        let err: TraceError = LayoutError::ZeroStackDepth.into();
        assert_eq!(err.to_string(), "stack depth must be at least 1");
    }

    use crate::device::ResourceKind;

    const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

    /// A device on wgpu's noop backend: full validation, no GPU needed.
    fn noop_device() -> (wgpu::Device, wgpu::Queue, wgpu::Limits) {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::NOOP,
            backend_options: wgpu::BackendOptions {
                noop: wgpu::NoopBackendOptions { enable: true },
                ..Default::default()
            },
            ..Default::default()
        });
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .expect("noop adapter");
        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("test device"),
            required_limits: limits.clone(),
            ..Default::default()
        }))
        .expect("noop device");
        (device, queue, limits)
    }

    fn small_config() -> TracerConfig {
        TracerConfig {
            width: 64,
            height: 48,
            ..TracerConfig::default()
        }
    }

    fn build(
        device: &wgpu::Device,
        ledger: &ResourceLedger,
        limits: &wgpu::Limits,
        config: &TracerConfig,
    ) -> Result<RayTracer, TraceError> {
        RayTracer::with_device(
            device,
            ledger,
            limits,
            SURFACE_FORMAT,
            config,
            &Scene::demo(),
            &ShaderSet::embedded(),
        )
    }

    #[test]
    fn tracer_records_dispatch_and_draw() {
        let (device, queue, limits) = noop_device();
        let ledger = ResourceLedger::new();
        let tracer = build(&device, &ledger, &limits, &small_config()).expect("tracer");

        assert_eq!(tracer.layout().workgroups(), (4, 3, 1));

        let surface = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test surface"),
            size: wgpu::Extent3d {
                width: 64,
                height: 48,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = surface.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test encoder"),
        });
        {
            let mut target = RenderTarget::new(&mut encoder, &view);
            tracer.encode(&mut target);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    #[test]
    fn dropping_the_tracer_releases_every_object_once() {
        let (device, _queue, limits) = noop_device();
        let ledger = ResourceLedger::new();
        let tracer = build(&device, &ledger, &limits, &small_config()).expect("tracer");

        assert_eq!(ledger.live_count(), 21);
        drop(tracer);

        let report = ledger.report();
        assert!(report.is_balanced(), "{report}");
        assert_eq!(report.total_allocated(), 21);

        let expected = [
            (ResourceKind::Texture, 1),
            (ResourceKind::TextureView, 1),
            (ResourceKind::Sampler, 1),
            (ResourceKind::Buffer, 7),
            (ResourceKind::ShaderModule, 3),
            (ResourceKind::BindGroupLayout, 2),
            (ResourceKind::BindGroup, 2),
            (ResourceKind::PipelineLayout, 2),
            (ResourceKind::RenderPipeline, 1),
            (ResourceKind::ComputePipeline, 1),
        ];
        for (kind, count) in expected {
            assert_eq!(report.allocated.get(&kind), Some(&count), "{kind}");
            assert_eq!(report.released.get(&kind), Some(&count), "{kind}");
        }
    }

    #[test]
    fn bad_field_of_view_aborts_and_releases_partial_setup() {
        let (device, _queue, limits) = noop_device();
        let ledger = ResourceLedger::new();
        let config = TracerConfig {
            fov_y_degrees: 0.0,
            ..small_config()
        };

        let result = build(&device, &ledger, &limits, &config);
        assert!(matches!(
            result,
            Err(TraceError::Directions(RayGenError::FieldOfView(_)))
        ));
        drop(result);

        let report = ledger.report();
        assert!(report.total_allocated() > 0);
        assert!(report.is_balanced(), "{report}");
    }

    #[test]
    fn empty_image_is_a_layout_error() {
        let (device, _queue, limits) = noop_device();
        let ledger = ResourceLedger::new();
        let config = TracerConfig {
            width: 0,
            ..small_config()
        };

        let result = build(&device, &ledger, &limits, &config);
        assert!(matches!(
            result,
            Err(TraceError::Layout(LayoutError::EmptyImage { width: 0, height: 48 }))
        ));
        assert_eq!(ledger.report().total_allocated(), 0);
    }
}
