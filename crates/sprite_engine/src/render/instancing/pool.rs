//! Instance Pool
//!
//! Allocates per-instance slots across a set of channel stores and keeps the
//! stores in sync with the device. One pool renders all of its instances with a
//! single instanced draw of the shared quad.
//!
//! # Architecture
//!
//! ```text
//! InstancePool
//!   ├── ChannelSet ── ChannelStore "model" ── device buffer
//!   │              └─ ChannelStore "uv"    ── device buffer
//!   ├── slots[0..head]   (generation + state per slot)
//!   └── free_list        (released slots, reused before head advances)
//! ```
//!
//! # Slot lifecycle
//!
//! ```text
//! Free ──acquire──► Acquired ──release──► Released (zeroed, in free list)
//!                      ▲                       │
//!                      └──────acquire──────────┘
//! ```
//!
//! Handles are `(pool, index, generation)` triples. Views are looked up from the stores
//! on every access, so growing the stores never invalidates a live handle.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut pool = InstancePool::new(&mut device, program, quad, &channels, 8);
//!
//! let handle = pool.acquire(&mut device);
//! pool.instance_mut(handle)?.set_matrix("model", &transform)?;
//!
//! pool.prepare(&mut device);
//! pool.draw(&mut device);
//!
//! pool.release(handle)?;
//! pool.destroy(&mut device);
//! ```

use crate::foundation::math::{Mat3, MAT3_FLOATS};
use crate::render::device::{
    AttributeLayout, AttributeLocation, BufferHandle, GraphicsDevice, ProgramHandle, Topology,
};
use crate::render::instancing::binding::{self, BindingError};
use crate::render::instancing::channel::ChannelDescriptor;
use crate::render::instancing::store::{ChannelStore, SyncOutcome};
use crate::render::instancing::view::{self, AttributeView, AttributeViewMut};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Vertices in the shared quad strip
pub const QUAD_VERTEX_COUNT: u32 = 4;

/// Errors from handle and channel access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Handle does not refer to a slot currently owned by its holder
    #[error("Invalid handle {handle:?}: {reason}")]
    InvalidHandle {
        /// The offending handle
        handle: InstanceHandle,
        /// Why it was rejected
        reason: String,
    },

    /// No channel with this name was configured
    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    /// Channel was configured but could not be bound to the program
    #[error("Channel '{0}' was excluded because its attributes did not resolve")]
    ChannelExcluded(String),

    /// View width does not match the channel
    #[error("Channel '{channel}' holds {actual} floats per instance, not {requested}")]
    WidthMismatch {
        /// Channel name
        channel: String,
        /// Width asked for
        requested: usize,
        /// Width of the channel
        actual: usize,
    },
}

/// Handle to one acquired instance slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle {
    /// Id of the pool that issued the handle
    pub pool: u32,
    /// Slot index, shared by every channel
    pub index: u32,
    /// Generation of the slot at acquisition time
    pub generation: u32,
}

impl InstanceHandle {
    /// Slot index as `usize`
    pub fn slot(&self) -> usize {
        self.index as usize
    }
}

/// State of an allocated slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Owned by a handle
    Acquired,
    /// Zeroed and waiting in the free list
    Released,
}

#[derive(Debug, Clone, Copy)]
struct SlotRecord {
    generation: u32,
    state: SlotState,
}

/// Counters for pool activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful acquisitions
    pub acquired: u64,
    /// Successful releases
    pub released: u64,
    /// Acquisitions served from the free list
    pub recycled: u64,
    /// Number of capacity doublings
    pub growths: u32,
    /// Highest number of simultaneously live instances
    pub peak_live: usize,
}

/// Result of one [`InstancePool::prepare`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Stores that created a new device buffer
    pub created: usize,
    /// Stores that re-uploaded into an existing buffer
    pub updated: usize,
    /// Stores already up to date
    pub skipped: usize,
}

/// The active channel stores, addressable by name
#[derive(Debug)]
struct ChannelSet {
    stores: Vec<ChannelStore>,
    by_name: HashMap<String, usize>,
    excluded: HashSet<String>,
}

impl ChannelSet {
    fn lookup(&self, name: &str) -> Result<usize, PoolError> {
        if let Some(position) = self.by_name.get(name) {
            Ok(*position)
        } else if self.excluded.contains(name) {
            Err(PoolError::ChannelExcluded(name.to_string()))
        } else {
            Err(PoolError::UnknownChannel(name.to_string()))
        }
    }

    fn width_mismatch(&self, position: usize, requested: usize) -> PoolError {
        let store = &self.stores[position];
        PoolError::WidthMismatch {
            channel: store.name().to_string(),
            requested,
            actual: store.width(),
        }
    }
}

/// Read access to one instance's channels
#[derive(Debug)]
pub struct Instance<'a> {
    channels: &'a ChannelSet,
    index: usize,
}

impl Instance<'_> {
    /// View of the named channel, `N` floats wide
    pub fn channel<const N: usize>(&self, name: &str) -> Result<AttributeView<'_, N>, PoolError> {
        let position = self.channels.lookup(name)?;
        self.channels.stores[position]
            .view_at::<N>(self.index)
            .ok_or_else(|| self.channels.width_mismatch(position, N))
    }

    /// Value of a matrix channel
    pub fn matrix(&self, name: &str) -> Result<Mat3, PoolError> {
        Ok(self.channel::<MAT3_FLOATS>(name)?.matrix())
    }

    /// Whether every bound channel of this instance is zero
    pub fn is_zeroed(&self) -> bool {
        self.channels
            .stores
            .iter()
            .all(|store| view::is_zeroed(store.slot(self.index)))
    }
}

/// Write access to one instance's channels
#[derive(Debug)]
pub struct InstanceMut<'a> {
    channels: &'a mut ChannelSet,
    index: usize,
}

impl InstanceMut<'_> {
    /// Mutable view of the named channel, `N` floats wide
    pub fn channel<const N: usize>(
        &mut self,
        name: &str,
    ) -> Result<AttributeViewMut<'_, N>, PoolError> {
        let position = self.channels.lookup(name)?;
        let actual = self.channels.stores[position].width();
        self.channels.stores[position]
            .view_mut_at::<N>(self.index)
            .ok_or_else(|| PoolError::WidthMismatch {
                channel: name.to_string(),
                requested: N,
                actual,
            })
    }

    /// Write a matrix channel
    pub fn set_matrix(&mut self, name: &str, value: &Mat3) -> Result<(), PoolError> {
        self.channel::<MAT3_FLOATS>(name)?.set_matrix(value);
        Ok(())
    }

    /// Write a scalar channel
    pub fn set_scalar(&mut self, name: &str, value: f32) -> Result<(), PoolError> {
        self.channel::<1>(name)?.set_value(value);
        Ok(())
    }

    /// Read-only access to the same instance
    pub fn as_instance(&self) -> Instance<'_> {
        Instance {
            channels: &*self.channels,
            index: self.index,
        }
    }
}

/// Pool of instanced-attribute slots bound to one program and quad
#[derive(Debug)]
pub struct InstancePool {
    id: u32,
    program: ProgramHandle,
    quad_buffer: BufferHandle,
    vertex_location: Option<AttributeLocation>,
    channels: ChannelSet,
    malformed: Vec<BindingError>,
    capacity: usize,
    head: usize,
    slots: Vec<SlotRecord>,
    free_list: Vec<u32>,
    dirty: bool,
    stats: PoolStats,
}

impl InstancePool {
    /// Build a pool for `program`, drawing `quad_buffer` once per instance
    ///
    /// Channels whose attributes are missing from the program are excluded and
    /// reported through [`malformed_channels`](Self::malformed_channels).
    /// `initial_capacity` is clamped to at least one slot.
    pub fn new<D: GraphicsDevice>(
        device: &mut D,
        program: ProgramHandle,
        quad_buffer: BufferHandle,
        descriptors: &[ChannelDescriptor],
        initial_capacity: usize,
    ) -> Self {
        let capacity = if initial_capacity == 0 {
            log::warn!("Instance pool requested with zero capacity; using 1");
            1
        } else {
            initial_capacity
        };

        let vertex_location = binding::resolve_vertex(&*device, program);
        if let Some(location) = vertex_location {
            device.bind_vertex_attribute(quad_buffer, location, AttributeLayout::packed(2));
        }

        let resolved = binding::resolve_channels(&*device, program, descriptors);
        let mut by_name = HashMap::new();
        let mut stores = Vec::with_capacity(resolved.active.len());
        for (descriptor, channel_binding) in resolved.active {
            by_name.insert(descriptor.name.clone(), stores.len());
            stores.push(ChannelStore::new(descriptor, channel_binding, capacity));
        }
        let excluded = resolved
            .malformed
            .iter()
            .filter(|err| matches!(err, BindingError::AttributeNotFound { .. }))
            .map(|err| err.channel().to_string())
            .collect();

        log::info!(
            "Created instance pool with {} channel(s), {} excluded, capacity {}",
            stores.len(),
            resolved.malformed.len(),
            capacity
        );

        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            program,
            quad_buffer,
            vertex_location,
            channels: ChannelSet { stores, by_name, excluded },
            malformed: resolved.malformed,
            capacity,
            head: 0,
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            dirty: false,
            stats: PoolStats::default(),
        }
    }

    /// Acquire a slot, growing the pool if every slot is in use
    ///
    /// A recycled slot still holds the zeros written by `release`; a never-used
    /// slot starts with identity matrices and zero scalars/vectors.
    pub fn acquire<D: GraphicsDevice>(&mut self, device: &mut D) -> InstanceHandle {
        let index = if let Some(index) = self.free_list.pop() {
            self.stats.recycled += 1;
            index as usize
        } else {
            if self.head == self.capacity {
                self.grow(device, self.capacity * 2);
            }
            let index = self.head;
            self.head += 1;
            for store in &mut self.channels.stores {
                let kind = store.descriptor().kind;
                view::initialize_slot(kind, store.slot_mut(index));
            }
            self.slots.push(SlotRecord {
                generation: 0,
                state: SlotState::Released,
            });
            index
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Acquired;
        let handle = InstanceHandle {
            pool: self.id,
            index: index as u32,
            generation: slot.generation,
        };

        self.dirty = true;
        self.stats.acquired += 1;
        self.stats.peak_live = self.stats.peak_live.max(self.live_count());
        log::trace!("Acquired instance slot {} (generation {})", handle.index, handle.generation);
        handle
    }

    /// Return a slot to the pool, zeroing all of its channels
    ///
    /// Zeroed matrices collapse the quad to a point, so the slot stays in the
    /// draw (up to `head`) but produces no visible geometry.
    pub fn release(&mut self, handle: InstanceHandle) -> Result<(), PoolError> {
        let index = self.validate(handle)?;

        for store in &mut self.channels.stores {
            view::zero_slot(store.slot_mut(index));
        }
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Released;
        self.free_list.push(handle.index);

        self.dirty = true;
        self.stats.released += 1;
        log::trace!("Released instance slot {}", handle.index);
        Ok(())
    }

    /// Read access to a live instance
    pub fn instance(&self, handle: InstanceHandle) -> Result<Instance<'_>, PoolError> {
        let index = self.validate(handle)?;
        Ok(Instance {
            channels: &self.channels,
            index,
        })
    }

    /// Write access to a live instance
    pub fn instance_mut(&mut self, handle: InstanceHandle) -> Result<InstanceMut<'_>, PoolError> {
        let index = self.validate(handle)?;
        Ok(InstanceMut {
            channels: &mut self.channels,
            index,
        })
    }

    /// Upload whatever changed since the last frame
    ///
    /// Any acquire or release since the previous prepare forces every store,
    /// static ones included, to re-upload.
    pub fn prepare<D: GraphicsDevice>(&mut self, device: &mut D) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for store in &mut self.channels.stores {
            if self.dirty {
                store.request_update();
            }
            match store.sync_if_needed(device) {
                SyncOutcome::Created => summary.created += 1,
                SyncOutcome::Updated => summary.updated += 1,
                SyncOutcome::Skipped => summary.skipped += 1,
            }
        }
        self.dirty = false;

        log::trace!(
            "Instance pool prepared: {} created, {} updated, {} skipped",
            summary.created,
            summary.updated,
            summary.skipped
        );
        summary
    }

    /// Draw every allocated slot with one instanced draw
    ///
    /// The instance count is `head`, so released slots that have not been
    /// reused are still drawn, as degenerate quads.
    pub fn draw<D: GraphicsDevice>(&self, device: &mut D) {
        if let Some(location) = self.vertex_location {
            device.bind_vertex_attribute(self.quad_buffer, location, AttributeLayout::packed(2));
        }
        for store in &self.channels.stores {
            match store.device_buffer() {
                Some(buffer) => store.binding().attach(device, buffer),
                None => log::warn!("Channel '{}' drawn before prepare", store.name()),
            }
        }

        device.issue_instanced_draw(Topology::TriangleStrip, QUAD_VERTEX_COUNT, self.head as u32);
    }

    /// Destroy every device buffer owned by the pool
    ///
    /// Host data is kept; a later `prepare` would create fresh buffers.
    pub fn destroy<D: GraphicsDevice>(&mut self, device: &mut D) {
        for store in &mut self.channels.stores {
            store.release_device(device);
        }
        log::info!(
            "Destroyed instance pool ({} slots allocated, {} growth(s))",
            self.head,
            self.stats.growths
        );
    }

    fn grow<D: GraphicsDevice>(&mut self, device: &mut D, new_capacity: usize) {
        log::debug!(
            "Growing instance pool from {} to {} slots ({} live)",
            self.capacity,
            new_capacity,
            self.live_count()
        );

        for store in &mut self.channels.stores {
            store.release_device(device);
            store.grow(new_capacity);
        }
        self.capacity = new_capacity;
        self.stats.growths += 1;
    }

    fn validate(&self, handle: InstanceHandle) -> Result<usize, PoolError> {
        if handle.pool != self.id {
            return Err(PoolError::InvalidHandle {
                handle,
                reason: format!("issued by pool {}, not pool {}", handle.pool, self.id),
            });
        }

        let index = handle.slot();
        let Some(slot) = self.slots.get(index) else {
            return Err(PoolError::InvalidHandle {
                handle,
                reason: format!("slot {} was never allocated (head is {})", index, self.head),
            });
        };

        if slot.generation != handle.generation {
            return Err(PoolError::InvalidHandle {
                handle,
                reason: format!("stale generation, slot is at {}", slot.generation),
            });
        }
        if slot.state != SlotState::Acquired {
            return Err(PoolError::InvalidHandle {
                handle,
                reason: "slot was already released".to_string(),
            });
        }
        Ok(index)
    }

    /// Whether `handle` refers to a live slot
    pub fn is_live(&self, handle: InstanceHandle) -> bool {
        self.validate(handle).is_ok()
    }

    /// Slots the stores can hold before growing
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots ever allocated; also the instance count drawn
    pub fn head(&self) -> usize {
        self.head
    }

    /// Slots currently held by handles
    pub fn live_count(&self) -> usize {
        self.head - self.free_list.len()
    }

    /// Released slot indices awaiting reuse, most recent last
    pub fn free_slots(&self) -> &[u32] {
        &self.free_list
    }

    /// Whether the next prepare will force every store to upload
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Channels left out at construction
    pub fn malformed_channels(&self) -> &[BindingError] {
        &self.malformed
    }

    /// Whether the named channel is active
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.by_name.contains_key(name)
    }

    /// Names of the active channels, in declaration order
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.stores.iter().map(ChannelStore::name)
    }

    /// Store backing the named channel
    pub fn store(&self, name: &str) -> Option<&ChannelStore> {
        self.channels.by_name.get(name).map(|position| &self.channels.stores[*position])
    }

    /// Program the pool was bound against
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Activity counters
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

impl Drop for InstancePool {
    fn drop(&mut self) {
        let leaked = self
            .channels
            .stores
            .iter()
            .filter(|store| store.device_buffer().is_some())
            .count();
        if leaked > 0 {
            log::warn!(
                "Instance pool dropped with {} live device buffer(s); call destroy() first",
                leaked
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat3Ext, Vec2};
    use crate::render::device::{BufferUsage, HeadlessDevice};
    use std::collections::HashSet;

    struct Fixture {
        device: HeadlessDevice,
        pool: InstancePool,
    }

    fn fixture(capacity: usize) -> Fixture {
        let mut device = HeadlessDevice::new();
        let program =
            device.register_program(&["vertex", "model_x", "model_y", "model_z", "alpha"]);
        let quad = device.create_buffer();
        device.upload_initial(
            quad,
            &[-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
            BufferUsage::Static,
        );
        let channels = [
            ChannelDescriptor::matrix("model"),
            ChannelDescriptor::scalar("alpha").with_static(),
        ];
        let pool = InstancePool::new(&mut device, program, quad, &channels, capacity);
        Fixture { device, pool }
    }

    fn translation(x: f32) -> Mat3 {
        Mat3::translation_2d(Vec2::new(x, 0.0))
    }

    #[test]
    fn test_fresh_slot_starts_at_identity() {
        let mut f = fixture(2);
        let handle = f.pool.acquire(&mut f.device);

        let instance = f.pool.instance(handle).expect("live");
        assert_eq!(instance.matrix("model"), Ok(Mat3::identity()));
        assert_eq!(instance.channel::<1>("alpha").map(|v| v.value()), Ok(0.0));
    }

    #[test]
    fn test_growth_scenario() {
        let mut f = fixture(2);
        let a = f.pool.acquire(&mut f.device);
        let b = f.pool.acquire(&mut f.device);
        f.pool.instance_mut(a).unwrap().set_matrix("model", &translation(1.0)).unwrap();
        f.pool.instance_mut(b).unwrap().set_matrix("model", &translation(2.0)).unwrap();
        assert_eq!((a.index, b.index), (0, 1));
        assert_eq!(f.pool.head(), 2);
        assert!(f.pool.free_slots().is_empty());

        let c = f.pool.acquire(&mut f.device);
        assert_eq!(f.pool.capacity(), 4);
        assert_eq!(f.pool.stats().growths, 1);
        assert_eq!(c.index, 2);
        assert_eq!(f.pool.head(), 3);
        assert_eq!(f.pool.instance(a).unwrap().matrix("model"), Ok(translation(1.0)));
        assert_eq!(f.pool.instance(b).unwrap().matrix("model"), Ok(translation(2.0)));

        f.pool.release(b).unwrap();
        assert_eq!(f.pool.free_slots(), &[1]);

        let d = f.pool.acquire(&mut f.device);
        assert_eq!(d.index, 1);
        assert_eq!(f.pool.head(), 3);
        assert!(f.pool.instance(d).unwrap().is_zeroed());
    }

    #[test]
    fn test_growth_keeps_live_data_byte_identical() {
        let mut f = fixture(4);
        let handles: Vec<_> = (0..4).map(|_| f.pool.acquire(&mut f.device)).collect();
        for (i, handle) in handles.iter().enumerate() {
            let mut instance = f.pool.instance_mut(*handle).unwrap();
            instance.set_matrix("model", &translation(i as f32 + 0.5)).unwrap();
            instance.set_scalar("alpha", 0.25 * i as f32).unwrap();
        }
        let before: Vec<f32> = f.pool.store("model").unwrap().data().to_vec();

        f.pool.acquire(&mut f.device);

        let after = f.pool.store("model").unwrap().data();
        assert_eq!(&after[..before.len()], before.as_slice());
        assert_eq!(f.pool.capacity(), 8);
    }

    #[test]
    fn test_live_indices_are_unique() {
        let mut f = fixture(1);
        let mut live = Vec::new();

        for round in 0..40 {
            live.push(f.pool.acquire(&mut f.device));
            if round % 3 == 2 {
                let victim = live.remove(round % live.len());
                f.pool.release(victim).unwrap();
            }

            let indices: HashSet<u32> = live.iter().map(|h| h.index).collect();
            assert_eq!(indices.len(), live.len());
            assert_eq!(f.pool.live_count(), live.len());
        }
    }

    #[test]
    fn test_head_never_decreases() {
        let mut f = fixture(2);
        let mut last_head = 0;
        let mut live = Vec::new();

        for step in 0..30 {
            if step % 4 == 3 && !live.is_empty() {
                f.pool.release(live.pop().unwrap()).unwrap();
            } else {
                live.push(f.pool.acquire(&mut f.device));
            }
            assert!(f.pool.head() >= last_head);
            last_head = f.pool.head();
        }
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut f = fixture(2);
        let handle = f.pool.acquire(&mut f.device);

        f.pool.release(handle).unwrap();
        assert!(matches!(f.pool.release(handle), Err(PoolError::InvalidHandle { .. })));
        assert_eq!(f.pool.free_slots(), &[0]);
    }

    #[test]
    fn test_stale_handle_cannot_touch_reused_slot() {
        let mut f = fixture(2);
        let old = f.pool.acquire(&mut f.device);
        f.pool.release(old).unwrap();
        let new = f.pool.acquire(&mut f.device);

        assert_eq!(old.index, new.index);
        assert!(f.pool.instance_mut(old).is_err());
        assert!(f.pool.release(old).is_err());
        assert!(f.pool.is_live(new));
    }

    #[test]
    fn test_never_allocated_handle_is_rejected() {
        let f = fixture(2);
        let bogus = InstanceHandle {
            pool: f.pool.id,
            index: 5,
            generation: 1,
        };
        assert!(matches!(f.pool.instance(bogus), Err(PoolError::InvalidHandle { .. })));
    }

    #[test]
    fn test_handle_from_another_pool_is_rejected() {
        let mut f = fixture(2);
        let mut other = fixture(2);
        let mine = f.pool.acquire(&mut f.device);
        let theirs = other.pool.acquire(&mut other.device);
        other
            .pool
            .instance_mut(theirs)
            .unwrap()
            .set_matrix("model", &translation(7.0))
            .unwrap();

        // Same slot and generation, different issuer
        assert_eq!((mine.index, mine.generation), (theirs.index, theirs.generation));
        assert_ne!(mine.pool, theirs.pool);
        assert!(matches!(other.pool.release(mine), Err(PoolError::InvalidHandle { .. })));
        assert!(other.pool.instance_mut(mine).is_err());

        assert!(other.pool.is_live(theirs));
        assert!(other.pool.free_slots().is_empty());
        assert_eq!(other.pool.instance(theirs).unwrap().matrix("model"), Ok(translation(7.0)));
        assert!(f.pool.is_live(mine));
    }

    #[test]
    fn test_channel_errors() {
        let mut f = fixture(2);
        let handle = f.pool.acquire(&mut f.device);
        let mut instance = f.pool.instance_mut(handle).unwrap();

        assert_eq!(
            instance.channel::<2>("model").err(),
            Some(PoolError::WidthMismatch {
                channel: "model".to_string(),
                requested: 2,
                actual: 9,
            })
        );
        assert_eq!(
            instance.channel::<1>("tint").err(),
            Some(PoolError::UnknownChannel("tint".to_string()))
        );
    }

    #[test]
    fn test_draw_counts_head_not_live() {
        let mut f = fixture(2);
        let a = f.pool.acquire(&mut f.device);
        let _b = f.pool.acquire(&mut f.device);
        let _c = f.pool.acquire(&mut f.device);
        f.pool.release(a).unwrap();

        f.pool.prepare(&mut f.device);
        f.pool.draw(&mut f.device);

        let draw = f.device.last_draw().expect("one draw");
        assert_eq!(draw.instance_count, 3);
        assert_eq!(draw.vertex_count, QUAD_VERTEX_COUNT);
        assert_eq!(draw.topology, Topology::TriangleStrip);
        assert_eq!(f.pool.live_count(), 2);
    }

    #[test]
    fn test_prepare_resyncs_static_channels_after_changes() {
        let mut f = fixture(2);
        let handle = f.pool.acquire(&mut f.device);

        let first = f.pool.prepare(&mut f.device);
        assert_eq!(first, SyncSummary { created: 2, updated: 0, skipped: 0 });

        // Static alpha is skipped while nothing is acquired or released
        let idle = f.pool.prepare(&mut f.device);
        assert_eq!(idle, SyncSummary { created: 0, updated: 1, skipped: 1 });

        f.pool.release(handle).unwrap();
        assert!(f.pool.is_dirty());
        let after_release = f.pool.prepare(&mut f.device);
        assert_eq!(after_release, SyncSummary { created: 0, updated: 2, skipped: 0 });
        assert!(!f.pool.is_dirty());

        let alpha = f.pool.store("alpha").unwrap();
        let buffer = alpha.device_buffer().unwrap();
        assert_eq!(f.device.buffer_data(buffer).as_deref(), Some(alpha.data()));
    }

    #[test]
    fn test_growth_replaces_device_buffers() {
        let mut f = fixture(1);
        f.pool.acquire(&mut f.device);
        f.pool.prepare(&mut f.device);
        let old = f.pool.store("model").unwrap().device_buffer().unwrap();

        f.pool.acquire(&mut f.device);
        assert!(!f.device.is_live(old));
        assert!(f.pool.store("model").unwrap().device_buffer().is_none());

        f.pool.prepare(&mut f.device);
        let new = f.pool.store("model").unwrap().device_buffer().unwrap();
        assert_eq!(f.device.buffer_data(new).map(|d| d.len()), Some(2 * 9));
        assert_eq!(f.device.stats().invalid_operations, 0);
    }

    #[test]
    fn test_destroy_releases_device_buffers() {
        let mut f = fixture(2);
        f.pool.acquire(&mut f.device);
        f.pool.prepare(&mut f.device);
        // quad + model + alpha
        assert_eq!(f.device.live_buffer_count(), 3);

        f.pool.destroy(&mut f.device);
        assert_eq!(f.device.live_buffer_count(), 1);
        assert!(f.pool.store("model").unwrap().device_buffer().is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut f = fixture(0);
        assert_eq!(f.pool.capacity(), 1);
        f.pool.acquire(&mut f.device);
        f.pool.acquire(&mut f.device);
        assert_eq!(f.pool.capacity(), 2);
    }
}
