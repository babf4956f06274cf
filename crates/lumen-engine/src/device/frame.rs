/// A single acquired surface frame.
///
/// Holding the surface texture prevents acquisition of subsequent frames, so the
/// frame must be handed back to `Gpu::submit` promptly.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
