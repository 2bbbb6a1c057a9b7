//! # Sprite Engine
//!
//! Instanced 2D sprite rendering built around a growable per-instance
//! attribute pool.
//!
//! ## Features
//!
//! - **Instance pool**: named float channels sharing slot indices, recycled
//!   through a free list and grown by doubling
//! - **One draw per pass**: every sprite of a pass is a single instanced draw
//!   of a shared quad
//! - **Device abstraction**: a narrow [`GraphicsDevice`](render::GraphicsDevice)
//!   trait with a recording headless implementation
//! - **Configuration**: TOML or RON configuration for channels and sprite sheets
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprite_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut device = HeadlessDevice::new();
//!     let program = device.register_sprite_program();
//!     let texture = device.create_texture();
//!
//!     let mut scene = Scene::new(&mut device);
//!     let mut pass = SpritePass::new(&mut device, program, texture, scene.quad_buffer(), 8);
//!
//!     let mut ship = Sprite::new(&mut pass, &mut device, None)?;
//!     ship.position = Vec2::new(1.0, 2.0);
//!     ship.update(&mut pass)?;
//!
//!     scene.add_pass(Box::new(pass), 0.5);
//!     scene.update(1.0 / 60.0);
//!     scene.prepare(&mut device);
//!     scene.draw(&mut device);
//!     scene.destroy(&mut device);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::cast_precision_loss)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EngineConfig},
        foundation::{
            math::{Mat3, Mat3Ext, Point2, Vec2},
            time::FrameClock,
        },
        render::{
            atlas::{AtlasConfig, SpriteAtlas, SpriteFrame},
            device::{GraphicsDevice, HeadlessDevice},
            instancing::{ChannelDescriptor, InstanceHandle, InstancePool, PoolError},
            scene::{RenderPass, Scene, SpritePass},
            sprite::Sprite,
        },
    };
}
