//! Instanced attribute channels
//!
//! Per-instance data (model matrices, texture-frame matrices, scalars) lives in
//! named channels. Each channel is a growable host store mirrored into one
//! device buffer; all channels of a pool share slot indices, so one slot is one
//! instance everywhere.

pub mod binding;
pub mod channel;
pub mod pool;
pub mod store;
pub mod view;

pub use binding::{BindingError, ChannelBinding};
pub use channel::{ChannelDescriptor, ChannelKind};
pub use pool::{
    Instance, InstanceHandle, InstanceMut, InstancePool, PoolError, PoolStats, SyncSummary,
    QUAD_VERTEX_COUNT,
};
pub use store::{ChannelStore, SyncOutcome, SyncState};
pub use view::{AttributeView, AttributeViewMut, MatrixView, MatrixViewMut};
