//! Rendering
//!
//! Instanced sprite rendering on top of a narrow [`GraphicsDevice`] trait.

pub mod atlas;
pub mod device;
pub mod instancing;
pub mod scene;
pub mod sprite;

pub use atlas::{AtlasConfig, AtlasError, FrameRect, SpriteAtlas, SpriteFrame};
pub use device::{GraphicsDevice, HeadlessDevice};
pub use instancing::{ChannelDescriptor, InstanceHandle, InstancePool, PoolError};
pub use scene::{RenderPass, Scene, SpritePass};
pub use sprite::Sprite;
