//! Graphics device abstraction
//!
//! The instancing pool only needs a narrow slice of a graphics API: buffer
//! creation and bulk uploads, attribute reflection and binding, and one
//! instanced draw. This module defines that slice as a trait so the pool can be
//! driven by a real backend or by the recording [`HeadlessDevice`].
//!
//! Every operation takes the device explicitly; there is no global context.

pub mod headless;

pub use headless::{HeadlessDevice, DeviceStats, DrawCall, AttributeBinding};

use crate::foundation::math::Mat3;

/// Handle to a device-side buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a linked shading program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Vertex attribute location reported by program reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeLocation(pub u32);

/// Upload frequency hint for a buffer's initial data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once, drawn many times
    Static,
    /// Rewritten roughly every frame
    Stream,
}

impl BufferUsage {
    /// Hint matching a channel's mutability
    pub const fn for_dynamic(dynamic: bool) -> Self {
        if dynamic {
            Self::Stream
        } else {
            Self::Static
        }
    }
}

/// Primitive topology. Sprites are only ever drawn as a 4-vertex strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Triangle strip
    TriangleStrip,
}

/// Layout of one float attribute inside a buffer, in floats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    /// Floats per attribute (1..=4)
    pub components: usize,
    /// Distance between consecutive elements; 0 means tightly packed
    pub stride_floats: usize,
    /// Offset of the first element
    pub offset_floats: usize,
}

impl AttributeLayout {
    /// Tightly packed attribute of `components` floats
    pub const fn packed(components: usize) -> Self {
        Self {
            components,
            stride_floats: 0,
            offset_floats: 0,
        }
    }

    /// Strided attribute
    pub const fn strided(components: usize, stride_floats: usize, offset_floats: usize) -> Self {
        Self {
            components,
            stride_floats,
            offset_floats,
        }
    }
}

/// Graphics capabilities consumed by the instancing pool and render passes
pub trait GraphicsDevice {
    /// Create an empty buffer
    fn create_buffer(&mut self) -> BufferHandle;

    /// Allocate the buffer's storage and fill it with `data`
    fn upload_initial(&mut self, buffer: BufferHandle, data: &[f32], usage: BufferUsage);

    /// Overwrite part of an already allocated buffer, `offset` in floats
    fn upload_subrange(&mut self, buffer: BufferHandle, offset: usize, data: &[f32]);

    /// Release a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Look up a vertex attribute in a program
    fn resolve_attribute_location(
        &self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<AttributeLocation>;

    /// Bind a per-vertex attribute to `buffer`
    fn bind_vertex_attribute(
        &mut self,
        buffer: BufferHandle,
        location: AttributeLocation,
        layout: AttributeLayout,
    );

    /// Bind an attribute to `buffer` advancing once per instance
    fn bind_per_instance_attribute(
        &mut self,
        buffer: BufferHandle,
        location: AttributeLocation,
        layout: AttributeLayout,
    );

    /// Draw `instance_count` copies of the first `vertex_count` vertices
    fn issue_instanced_draw(&mut self, topology: Topology, vertex_count: u32, instance_count: u32);

    /// Make `program` current
    fn use_program(&mut self, program: ProgramHandle);

    /// Bind a texture to the default sampler unit
    fn bind_texture(&mut self, texture: TextureHandle);

    /// Set a 3x3 matrix uniform on the current program
    fn set_uniform_mat3(&mut self, name: &str, value: &Mat3);
}
