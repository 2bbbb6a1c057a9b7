//! Sprites
//!
//! A sprite is one slot in a [`SpritePass`] pool plus the 2D state that
//! produces its model matrix. Setting a frame writes the slot's `uv` matrix
//! right away; `update` rewrites the `model` matrix from position, angle,
//! scale and mirroring.

use crate::foundation::math::{Mat3, Mat3Ext, Vec2};
use crate::render::atlas::SpriteFrame;
use crate::render::device::GraphicsDevice;
use crate::render::instancing::{InstanceHandle, PoolError};
use crate::render::scene::{SpritePass, MODEL_CHANNEL, UV_CHANNEL};

/// A textured quad drawn by a [`SpritePass`]
#[derive(Debug, Clone)]
pub struct Sprite {
    handle: InstanceHandle,
    frame_model: Mat3,
    visible: bool,
    /// World position of the sprite's center
    pub position: Vec2,
    /// Rotation in radians, counter-clockwise
    pub angle: f32,
    /// Uniform scale factor
    pub scale: f32,
    /// Flip horizontally
    pub mirror: bool,
}

impl Sprite {
    /// Acquire a slot in `pass` and show `frame` in it (or nothing if `None`)
    ///
    /// The slot goes back to the pool if the frame cannot be written.
    pub fn new<D: GraphicsDevice>(
        pass: &mut SpritePass,
        device: &mut D,
        frame: Option<&SpriteFrame>,
    ) -> Result<Self, PoolError> {
        let handle = pass.pool_mut().acquire(device);
        let mut sprite = Self {
            handle,
            frame_model: Mat3::identity(),
            visible: true,
            position: Vec2::zeros(),
            angle: 0.0,
            scale: 1.0,
            mirror: false,
        };
        if let Err(err) = sprite.set_frame(pass, frame) {
            pass.pool_mut().release(handle)?;
            return Err(err);
        }
        Ok(sprite)
    }

    /// Slot handle inside the pass's pool
    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    /// Whether a frame is shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show `frame`, or hide the sprite with `None`
    ///
    /// Hiding zeroes both matrices, which collapses the quad to a point.
    pub fn set_frame(
        &mut self,
        pass: &mut SpritePass,
        frame: Option<&SpriteFrame>,
    ) -> Result<(), PoolError> {
        let frame = match frame {
            Some(frame) => {
                self.visible = true;
                *frame
            }
            None => {
                self.visible = false;
                SpriteFrame::hidden()
            }
        };
        self.frame_model = frame.model;
        write_matrix(pass, self.handle, UV_CHANNEL, &frame.uv)
    }

    /// Model matrix: translate, rotate, scale (mirrored on x), then the frame
    pub fn model_matrix(&self) -> Mat3 {
        let flip = if self.mirror { -self.scale } else { self.scale };
        Mat3::translation_2d(self.position)
            * Mat3::rotation_2d(self.angle)
            * Mat3::scaling_2d(flip, self.scale)
            * self.frame_model
    }

    /// Write the current model matrix into the slot
    pub fn update(&self, pass: &mut SpritePass) -> Result<(), PoolError> {
        write_matrix(pass, self.handle, MODEL_CHANNEL, &self.model_matrix())
    }

    /// Release the slot; its data is zeroed until reused
    pub fn destroy(self, pass: &mut SpritePass) -> Result<(), PoolError> {
        pass.pool_mut().release(self.handle)
    }
}

/// Channels the program could not bind are skipped; the sprite is drawn with
/// whatever did bind.
fn write_matrix(
    pass: &mut SpritePass,
    handle: InstanceHandle,
    channel: &str,
    value: &Mat3,
) -> Result<(), PoolError> {
    match pass.pool_mut().instance_mut(handle)?.set_matrix(channel, value) {
        Err(PoolError::ChannelExcluded(_)) => Ok(()),
        other => other,
    }
}
