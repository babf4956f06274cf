//! Allocation/release bookkeeping for GPU objects.
//!
//! Every object wrapped in [`Tracked`] is registered on creation and released
//! exactly once when the wrapper drops. The report taken at shutdown lists
//! whatever is still alive.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

/// Category of a tracked GPU object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ResourceKind {
    Texture,
    TextureView,
    Sampler,
    Buffer,
    ShaderModule,
    BindGroupLayout,
    BindGroup,
    PipelineLayout,
    RenderPipeline,
    ComputePipeline,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Texture => "texture",
            ResourceKind::TextureView => "texture view",
            ResourceKind::Sampler => "sampler",
            ResourceKind::Buffer => "buffer",
            ResourceKind::ShaderModule => "shader module",
            ResourceKind::BindGroupLayout => "bind group layout",
            ResourceKind::BindGroup => "bind group",
            ResourceKind::PipelineLayout => "pipeline layout",
            ResourceKind::RenderPipeline => "render pipeline",
            ResourceKind::ComputePipeline => "compute pipeline",
        };
        f.write_str(name)
    }
}

/// Explicit teardown hook run right before a tracked object is dropped.
///
/// Buffers and textures free their memory eagerly; every other wgpu handle is
/// released by dropping it.
pub trait GpuRelease {
    const KIND: ResourceKind;

    fn release(&self) {}
}

impl GpuRelease for wgpu::Texture {
    const KIND: ResourceKind = ResourceKind::Texture;

    fn release(&self) {
        self.destroy();
    }
}

impl GpuRelease for wgpu::Buffer {
    const KIND: ResourceKind = ResourceKind::Buffer;

    fn release(&self) {
        self.destroy();
    }
}

impl GpuRelease for wgpu::TextureView {
    const KIND: ResourceKind = ResourceKind::TextureView;
}

impl GpuRelease for wgpu::Sampler {
    const KIND: ResourceKind = ResourceKind::Sampler;
}

impl GpuRelease for wgpu::ShaderModule {
    const KIND: ResourceKind = ResourceKind::ShaderModule;
}

impl GpuRelease for wgpu::BindGroupLayout {
    const KIND: ResourceKind = ResourceKind::BindGroupLayout;
}

impl GpuRelease for wgpu::BindGroup {
    const KIND: ResourceKind = ResourceKind::BindGroup;
}

impl GpuRelease for wgpu::PipelineLayout {
    const KIND: ResourceKind = ResourceKind::PipelineLayout;
}

impl GpuRelease for wgpu::RenderPipeline {
    const KIND: ResourceKind = ResourceKind::RenderPipeline;
}

impl GpuRelease for wgpu::ComputePipeline {
    const KIND: ResourceKind = ResourceKind::ComputePipeline;
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: u64,
    live: BTreeMap<u64, (ResourceKind, String)>,
    allocated: BTreeMap<ResourceKind, u64>,
    released: BTreeMap<ResourceKind, u64>,
}

/// Shared registry of live GPU objects. Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` and returns the owning wrapper.
    pub fn track<T: GpuRelease>(&self, label: impl Into<String>, value: T) -> Tracked<T> {
        let label = label.into();
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            *state.allocated.entry(T::KIND).or_default() += 1;
            state.live.insert(id, (T::KIND, label.clone()));
            id
        };
        log::trace!("allocated {} `{label}`", T::KIND);

        Tracked {
            value,
            id,
            ledger: self.clone(),
        }
    }

    fn release(&self, id: u64) {
        let mut state = self.lock();
        match state.live.remove(&id) {
            Some((kind, label)) => {
                *state.released.entry(kind).or_default() += 1;
                log::trace!("released {kind} `{label}`");
            }
            None => log::error!("resource #{id} released twice"),
        }
    }

    /// Number of objects currently alive.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Snapshot of allocation/release counters and the still-live objects.
    pub fn report(&self) -> LedgerReport {
        let state = self.lock();
        LedgerReport {
            allocated: state.allocated.clone(),
            released: state.released.clone(),
            live: state.live.values().cloned().collect(),
        }
    }

    // A poisoned ledger only means a panic happened mid-update; the counters
    // are still the best information available.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Result of [`ResourceLedger::report`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerReport {
    pub allocated: BTreeMap<ResourceKind, u64>,
    pub released: BTreeMap<ResourceKind, u64>,
    pub live: Vec<(ResourceKind, String)>,
}

impl LedgerReport {
    /// Every allocation was matched by exactly one release.
    pub fn is_balanced(&self) -> bool {
        self.live.is_empty() && self.allocated == self.released
    }

    pub fn total_allocated(&self) -> u64 {
        self.allocated.values().sum()
    }

    pub fn total_released(&self) -> u64 {
        self.released.values().sum()
    }
}

impl fmt::Display for LedgerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} allocated, {} released",
            self.total_allocated(),
            self.total_released()
        )?;
        for (kind, label) in &self.live {
            write!(f, "; leaked {kind} `{label}`")?;
        }
        Ok(())
    }
}

/// A GPU object registered with a [`ResourceLedger`].
///
/// Dereferences to the wrapped object. Dropping it runs [`GpuRelease::release`]
/// and records the release.
pub struct Tracked<T: GpuRelease> {
    value: T,
    id: u64,
    ledger: ResourceLedger,
}

impl<T: GpuRelease> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: GpuRelease> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.value.release();
        self.ledger.release(self.id);
    }
}

impl<T: GpuRelease + fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeBuffer {
        releases: Rc<Cell<u32>>,
    }

    impl GpuRelease for FakeBuffer {
        const KIND: ResourceKind = ResourceKind::Buffer;

        fn release(&self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    struct FakeSampler;

    impl GpuRelease for FakeSampler {
        const KIND: ResourceKind = ResourceKind::Sampler;
    }

    fn fake(counter: &Rc<Cell<u32>>) -> FakeBuffer {
        FakeBuffer {
            releases: Rc::clone(counter),
        }
    }

    #[test]
    fn allocation_and_release_are_paired() {
        let ledger = ResourceLedger::new();
        let releases = Rc::new(Cell::new(0));

        let a = ledger.track("directions", fake(&releases));
        let b = ledger.track("positions", fake(&releases));
        let s = ledger.track("sampler", FakeSampler);
        assert_eq!(ledger.live_count(), 3);

        drop(a);
        drop(b);
        drop(s);

        let report = ledger.report();
        assert!(report.is_balanced(), "{report}");
        assert_eq!(report.total_allocated(), 3);
        assert_eq!(report.allocated.get(&ResourceKind::Buffer), Some(&2));
        assert_eq!(releases.get(), 2);
    }

    #[test]
    fn each_object_is_released_exactly_once() {
        let ledger = ResourceLedger::new();
        let releases = Rc::new(Cell::new(0));

        let objects: Vec<_> = (0..6)
            .map(|i| ledger.track(format!("ssbo {i}"), fake(&releases)))
            .collect();
        drop(objects);

        assert_eq!(releases.get(), 6);
        assert_eq!(ledger.report().total_released(), 6);
    }

    #[test]
    fn live_objects_show_up_as_leaks() {
        let ledger = ResourceLedger::new();
        let kept = ledger.track("color stack", FakeSampler);

        let report = ledger.report();
        assert!(!report.is_balanced());
        assert_eq!(report.live, vec![(ResourceKind::Sampler, "color stack".to_string())]);
        assert!(report.to_string().contains("leaked sampler `color stack`"));

        drop(kept);
        assert!(ledger.report().is_balanced());
    }

    #[test]
    fn clones_share_one_registry() {
        let ledger = ResourceLedger::new();
        let other = ledger.clone();
        let t = other.track("texture", FakeSampler);
        assert_eq!(ledger.live_count(), 1);
        drop(t);
        assert_eq!(ledger.live_count(), 0);
    }

    #[test]
    fn tracked_derefs_to_value() {
        let ledger = ResourceLedger::new();
        let releases = Rc::new(Cell::new(7));
        let t = ledger.track("x", fake(&releases));
        assert_eq!(t.releases.get(), 7);
    }
}
