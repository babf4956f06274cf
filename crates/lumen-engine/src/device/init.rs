/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    ///
    /// The ray tracer writes display-ready values into an `Rgba8Unorm` image, so
    /// the demo turns this off to avoid a second gamma encode.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    ///
    /// Ignored when `use_adapter_limits` is set.
    pub required_limits: wgpu::Limits,

    /// Request everything the adapter supports instead of `required_limits`.
    ///
    /// The per-pixel ray and color stacks are far larger than the portable
    /// default storage binding size.
    pub use_adapter_limits: bool,

    /// Desired maximum frame latency for the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            use_adapter_limits: false,
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Resolves the limits to request from an adapter that supports `adapter_limits`.
    pub fn limits_for(&self, adapter_limits: &wgpu::Limits) -> wgpu::Limits {
        if self.use_adapter_limits {
            adapter_limits.clone()
        } else {
            self.required_limits.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requests_portable_limits() {
        let init = GpuInit::default();
        let adapter = wgpu::Limits {
            max_storage_buffer_binding_size: wgpu::Limits::default().max_storage_buffer_binding_size * 4,
            ..wgpu::Limits::default()
        };
        let resolved = init.limits_for(&adapter);
        assert_eq!(
            resolved.max_storage_buffer_binding_size,
            wgpu::Limits::default().max_storage_buffer_binding_size
        );
    }

    #[test]
    fn adapter_limits_are_forwarded_when_requested() {
        let init = GpuInit {
            use_adapter_limits: true,
            ..Default::default()
        };
        let adapter = wgpu::Limits {
            max_buffer_size: 1 << 33,
            ..wgpu::Limits::default()
        };
        assert_eq!(init.limits_for(&adapter).max_buffer_size, 1 << 33);
    }
}
