//! Full-screen quad that samples a texture onto the surface.

use crate::device::{ResourceLedger, Tracked};

use super::RenderTarget;

/// Texture binding of the fragment program.
pub const TEXTURE_BINDING: u32 = 0;
/// Sampler binding of the fragment program.
pub const SAMPLER_BINDING: u32 = 1;

/// Vertex-less triangle strip covering the viewport.
pub const QUAD_VERTEX_COUNT: u32 = 4;

pub struct DisplayPipeline {
    pipeline: Tracked<wgpu::RenderPipeline>,
    bind_group_layout: Tracked<wgpu::BindGroupLayout>,
    sampler: Tracked<wgpu::Sampler>,
    _layout: Tracked<wgpu::PipelineLayout>,
}

impl DisplayPipeline {
    /// Links the full-screen vertex program with the texture fragment program.
    pub fn new(
        device: &wgpu::Device,
        ledger: &ResourceLedger,
        surface_format: wgpu::TextureFormat,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("display bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: TEXTURE_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("display pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        // Linear filtering, repeat wrapping.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("display sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("display pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline: ledger.track("display pipeline", pipeline),
            bind_group_layout: ledger.track("display bgl", bind_group_layout),
            sampler: ledger.track("display sampler", sampler),
            _layout: ledger.track("display pipeline layout", layout),
        }
    }

    /// Binds `texture_view` (must be filterable float) with the display sampler.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        ledger: &ResourceLedger,
        texture_view: &wgpu::TextureView,
    ) -> Tracked<wgpu::BindGroup> {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("display bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        ledger.track("display bind group", bind_group)
    }

    /// Draws the quad over `target`, keeping what is already there outside it.
    pub fn draw(&self, target: &mut RenderTarget<'_>, bind_group: &wgpu::BindGroup) {
        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("display pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
    }
}
