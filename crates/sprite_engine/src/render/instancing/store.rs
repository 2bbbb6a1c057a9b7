//! Channel store
//!
//! Host-side arena of `capacity * width` floats for one channel, mirrored into
//! one device buffer. The host copy is authoritative; the device copy is
//! refreshed in bulk by [`ChannelStore::sync_if_needed`].
//!
//! # Sync state
//!
//! ```text
//!   grow() ──► !CREATED, MUST_UPDATE
//!                  │ sync_if_needed
//!                  ▼
//!   create() ──► CREATED ──(MUST_UPDATE)──► upload_subrange
//!                                              ├─ static: clear MUST_UPDATE
//!                                              └─ dynamic: keep it set
//! ```

use bitflags::bitflags;

use crate::render::device::{BufferHandle, BufferUsage, GraphicsDevice};
use crate::render::instancing::binding::ChannelBinding;
use crate::render::instancing::channel::ChannelDescriptor;
use crate::render::instancing::view::{self, AttributeView, AttributeViewMut};

bitflags! {
    /// Device synchronization state of a store
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyncState: u8 {
        /// The device buffer exists and holds a full copy
        const CREATED = 0b001;
        /// The host copy changed since the last upload
        const MUST_UPDATE = 0b010;
        /// Re-upload on every sync
        const DYNAMIC = 0b100;
    }
}

/// What a call to [`ChannelStore::sync_if_needed`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Created a device buffer and uploaded everything
    Created,
    /// Re-uploaded the full buffer into the existing device buffer
    Updated,
    /// Nothing to do
    Skipped,
}

/// Growable per-channel storage plus its device buffer
#[derive(Debug)]
pub struct ChannelStore {
    descriptor: ChannelDescriptor,
    binding: ChannelBinding,
    data: Vec<f32>,
    capacity: usize,
    buffer: Option<BufferHandle>,
    state: SyncState,
}

impl ChannelStore {
    /// Allocate a zeroed store for `capacity` instances
    pub fn new(descriptor: ChannelDescriptor, binding: ChannelBinding, capacity: usize) -> Self {
        let mut state = SyncState::empty();
        if descriptor.dynamic {
            state |= SyncState::DYNAMIC | SyncState::MUST_UPDATE;
        }

        Self {
            data: vec![0.0; capacity * descriptor.width()],
            descriptor,
            binding,
            capacity,
            buffer: None,
            state,
        }
    }

    /// Channel configuration
    pub fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    /// Attribute locations the channel feeds
    pub fn binding(&self) -> &ChannelBinding {
        &self.binding
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Floats per instance
    pub fn width(&self) -> usize {
        self.descriptor.width()
    }

    /// Instances the host buffer can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The whole host buffer
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Current device buffer, if created
    pub fn device_buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Current sync state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether the device buffer exists
    pub fn is_created(&self) -> bool {
        self.state.contains(SyncState::CREATED)
    }

    /// Whether the next sync will upload
    pub fn must_update(&self) -> bool {
        self.state.contains(SyncState::MUST_UPDATE)
    }

    /// Force an upload on the next sync
    pub fn request_update(&mut self) {
        self.state.insert(SyncState::MUST_UPDATE);
    }

    /// Create the device buffer, upload the full host buffer and attach the
    /// channel's attributes to it
    pub fn create<D: GraphicsDevice>(&mut self, device: &mut D) {
        let buffer = device.create_buffer();
        let usage = BufferUsage::for_dynamic(self.descriptor.dynamic);
        device.upload_initial(buffer, &self.data, usage);
        self.binding.attach(device, buffer);

        self.buffer = Some(buffer);
        self.state.insert(SyncState::CREATED);
        if !self.state.contains(SyncState::DYNAMIC) {
            // The initial upload already carries the latest data
            self.state.remove(SyncState::MUST_UPDATE);
        }

        log::debug!(
            "Created device buffer {:?} for channel '{}' ({} instances, {} floats)",
            buffer,
            self.descriptor.name,
            self.capacity,
            self.data.len()
        );
    }

    /// Bring the device copy up to date
    pub fn sync_if_needed<D: GraphicsDevice>(&mut self, device: &mut D) -> SyncOutcome {
        let buffer = match self.buffer {
            Some(buffer) if self.is_created() => buffer,
            _ => {
                self.create(device);
                return SyncOutcome::Created;
            }
        };

        if !self.must_update() {
            return SyncOutcome::Skipped;
        }

        device.upload_subrange(buffer, 0, &self.data);
        if !self.state.contains(SyncState::DYNAMIC) {
            self.state.remove(SyncState::MUST_UPDATE);
        }
        SyncOutcome::Updated
    }

    /// Relocate into a buffer of `new_capacity` instances, keeping existing data
    /// in the prefix. The device buffer must have been released first; a fresh
    /// one is created on the next sync.
    pub fn grow(&mut self, new_capacity: usize) {
        debug_assert!(
            self.buffer.is_none(),
            "channel '{}' grown while its device buffer is alive",
            self.descriptor.name
        );
        debug_assert!(new_capacity >= self.capacity, "channel stores never shrink");

        let mut relocated = vec![0.0; new_capacity * self.width()];
        view::copy_slot(&mut relocated[..self.data.len()], &self.data);
        self.data = relocated;
        self.capacity = new_capacity;

        self.state.remove(SyncState::CREATED);
        self.state.insert(SyncState::MUST_UPDATE);
    }

    /// Destroy the device buffer, if any
    pub fn release_device<D: GraphicsDevice>(&mut self, device: &mut D) {
        if let Some(buffer) = self.buffer.take() {
            device.destroy_buffer(buffer);
            self.state.remove(SyncState::CREATED);
            self.state.insert(SyncState::MUST_UPDATE);
        }
    }

    /// Floats of slot `index`
    pub fn slot(&self, index: usize) -> &[f32] {
        let width = self.width();
        &self.data[index * width..(index + 1) * width]
    }

    /// Mutable floats of slot `index`
    pub fn slot_mut(&mut self, index: usize) -> &mut [f32] {
        let width = self.width();
        &mut self.data[index * width..(index + 1) * width]
    }

    /// View of slot `index`; `None` if `N` is not this channel's width
    pub fn view_at<const N: usize>(&self, index: usize) -> Option<AttributeView<'_, N>> {
        AttributeView::from_slot(self.slot(index))
    }

    /// Mutable view of slot `index`; `None` if `N` is not this channel's width
    pub fn view_mut_at<const N: usize>(&mut self, index: usize) -> Option<AttributeViewMut<'_, N>> {
        AttributeViewMut::from_slot(self.slot_mut(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::HeadlessDevice;
    use crate::render::instancing::binding::resolve_channel;

    fn matrix_store(device: &mut HeadlessDevice, dynamic: bool, capacity: usize) -> ChannelStore {
        let program = device.register_sprite_program();
        let mut descriptor = ChannelDescriptor::matrix("model");
        descriptor.dynamic = dynamic;
        let binding = resolve_channel(&*device, program, &descriptor).expect("sprite program");
        ChannelStore::new(descriptor, binding, capacity)
    }

    #[test]
    fn test_length_tracks_capacity() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, true, 3);
        assert_eq!(store.data().len(), 27);

        store.grow(6);
        assert_eq!(store.data().len(), 54);
        assert_eq!(store.capacity(), 6);
    }

    #[test]
    fn test_grow_preserves_prefix() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, true, 2);
        store.slot_mut(1).copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let before = store.data().to_vec();

        store.grow(4);

        assert_eq!(&store.data()[..before.len()], before.as_slice());
        assert!(store.data()[before.len()..].iter().all(|v| *v == 0.0));
        assert!(!store.is_created());
        assert!(store.must_update());
    }

    #[test]
    fn test_dynamic_store_uploads_every_sync() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, true, 2);

        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Created);
        assert_eq!(store.state(), SyncState::all());
        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Updated);
        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Updated);
        assert_eq!(device.stats().initial_uploads, 1);
        assert_eq!(device.stats().subrange_uploads, 2);
    }

    #[test]
    fn test_static_store_uploads_once() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, false, 2);
        assert_eq!(store.state(), SyncState::empty());

        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Created);
        assert_eq!(store.state(), SyncState::CREATED);
        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Skipped);

        store.request_update();
        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Updated);
        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Skipped);
    }

    #[test]
    fn test_device_copy_matches_host_after_sync() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, true, 2);
        store.sync_if_needed(&mut device);

        store.slot_mut(0)[6] = 42.0;
        store.sync_if_needed(&mut device);

        let buffer = store.device_buffer().expect("created");
        assert_eq!(device.buffer_data(buffer).as_deref(), Some(store.data()));
    }

    #[test]
    fn test_release_then_grow_recreates_buffer() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, false, 1);
        store.sync_if_needed(&mut device);
        let old = store.device_buffer().expect("created");

        store.release_device(&mut device);
        store.grow(2);
        assert_eq!(store.sync_if_needed(&mut device), SyncOutcome::Created);

        let new = store.device_buffer().expect("recreated");
        assert_ne!(old, new);
        assert!(!device.is_live(old));
        assert_eq!(device.live_buffer_count(), 1);
        assert_eq!(device.stats().invalid_operations, 0);
    }

    #[test]
    fn test_views_check_width() {
        let mut device = HeadlessDevice::new();
        let mut store = matrix_store(&mut device, true, 2);

        assert!(store.view_at::<2>(0).is_none());
        let mut view = store.view_mut_at::<9>(1).expect("matrix width");
        view.set_identity();
        assert_eq!(store.slot(1)[4], 1.0);
    }
}
