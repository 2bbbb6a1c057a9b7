//! Headless graphics device
//!
//! Keeps buffer contents in host memory and records every binding and draw so
//! that frames can be inspected without a GPU. Used by the test suite and the
//! demo application.
//!
//! Misuse that a real driver would reject (uploading to a destroyed buffer,
//! sub-range writes past the end) is logged and counted in
//! [`DeviceStats::invalid_operations`] instead of panicking.

use super::{
    AttributeLayout, AttributeLocation, BufferHandle, BufferUsage, GraphicsDevice, ProgramHandle,
    TextureHandle, Topology,
};
use crate::foundation::math::Mat3;
use slotmap::{DefaultKey, Key, KeyData, SlotMap};
use std::collections::HashMap;

/// Device-side buffer storage
#[derive(Debug, Default)]
struct DeviceBuffer {
    bytes: Vec<u8>,
    usage: Option<BufferUsage>,
}

/// One recorded attribute binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    /// Source buffer
    pub buffer: BufferHandle,
    /// Layout inside the buffer
    pub layout: AttributeLayout,
    /// 0 for per-vertex, 1 for per-instance
    pub divisor: u32,
}

/// One recorded draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Topology drawn
    pub topology: Topology,
    /// Vertices per instance
    pub vertex_count: u32,
    /// Number of instances
    pub instance_count: u32,
    /// Program current at draw time
    pub program: Option<ProgramHandle>,
}

/// Counters for device traffic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Buffers created
    pub buffers_created: usize,
    /// Buffers destroyed
    pub buffers_destroyed: usize,
    /// Full (allocating) uploads
    pub initial_uploads: usize,
    /// Sub-range uploads
    pub subrange_uploads: usize,
    /// Total floats transferred
    pub floats_uploaded: usize,
    /// Operations a real driver would have rejected
    pub invalid_operations: usize,
}

/// Recording device with host-memory buffers
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: SlotMap<DefaultKey, DeviceBuffer>,
    programs: HashMap<ProgramHandle, HashMap<String, AttributeLocation>>,
    next_program: u64,
    next_texture: u64,
    bindings: HashMap<AttributeLocation, AttributeBinding>,
    current_program: Option<ProgramHandle>,
    bound_texture: Option<TextureHandle>,
    uniforms: HashMap<String, Mat3>,
    draws: Vec<DrawCall>,
    stats: DeviceStats,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program exposing the given vertex attributes, in location order
    pub fn register_program(&mut self, attributes: &[&str]) -> ProgramHandle {
        let handle = ProgramHandle(self.next_program);
        self.next_program += 1;

        let locations = attributes
            .iter()
            .enumerate()
            .map(|(location, name)| ((*name).to_string(), AttributeLocation(location as u32)))
            .collect();
        self.programs.insert(handle, locations);

        log::debug!(
            "Registered headless program {:?} with {} attributes",
            handle,
            attributes.len()
        );
        handle
    }

    /// The attributes of the built-in sprite shader
    pub fn register_sprite_program(&mut self) -> ProgramHandle {
        self.register_program(&["vertex", "model_x", "model_y", "model_z", "uv_x", "uv_y", "uv_z"])
    }

    /// Allocate a texture handle
    pub fn create_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        handle
    }

    /// Current contents of a buffer as floats
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<Vec<f32>> {
        self.buffers
            .get(Self::key(buffer))
            .map(|stored| bytemuck::pod_collect_to_vec::<u8, f32>(&stored.bytes))
    }

    /// Usage hint given at the buffer's initial upload
    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(Self::key(buffer)).and_then(|stored| stored.usage)
    }

    /// Whether the buffer exists
    pub fn is_live(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(Self::key(buffer))
    }

    /// Number of buffers not yet destroyed
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Binding currently attached to `location`
    pub fn binding(&self, location: AttributeLocation) -> Option<AttributeBinding> {
        self.bindings.get(&location).copied()
    }

    /// All recorded draws
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Most recent draw
    pub fn last_draw(&self) -> Option<&DrawCall> {
        self.draws.last()
    }

    /// Currently bound texture
    pub fn bound_texture(&self) -> Option<TextureHandle> {
        self.bound_texture
    }

    /// Last value written to a matrix uniform
    pub fn uniform_mat3(&self, name: &str) -> Option<&Mat3> {
        self.uniforms.get(name)
    }

    /// Traffic counters
    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    fn key(buffer: BufferHandle) -> DefaultKey {
        KeyData::from_ffi(buffer.0).into()
    }

    fn invalid(&mut self, message: std::fmt::Arguments<'_>) {
        log::error!("Headless device: {}", message);
        self.stats.invalid_operations += 1;
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&mut self) -> BufferHandle {
        let key = self.buffers.insert(DeviceBuffer::default());
        self.stats.buffers_created += 1;
        BufferHandle(key.data().as_ffi())
    }

    fn upload_initial(&mut self, buffer: BufferHandle, data: &[f32], usage: BufferUsage) {
        let Some(stored) = self.buffers.get_mut(Self::key(buffer)) else {
            self.invalid(format_args!("initial upload to unknown buffer {:?}", buffer));
            return;
        };

        stored.bytes = bytemuck::cast_slice(data).to_vec();
        stored.usage = Some(usage);
        self.stats.initial_uploads += 1;
        self.stats.floats_uploaded += data.len();
    }

    fn upload_subrange(&mut self, buffer: BufferHandle, offset: usize, data: &[f32]) {
        let Some(stored) = self.buffers.get_mut(Self::key(buffer)) else {
            self.invalid(format_args!("sub-range upload to unknown buffer {:?}", buffer));
            return;
        };

        let start = offset * std::mem::size_of::<f32>();
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let end = start + bytes.len();
        if end > stored.bytes.len() {
            let allocated = stored.bytes.len();
            self.invalid(format_args!(
                "sub-range upload of {} bytes at {} overflows buffer {:?} ({} bytes)",
                bytes.len(),
                start,
                buffer,
                allocated
            ));
            return;
        }

        stored.bytes[start..end].copy_from_slice(bytes);
        self.stats.subrange_uploads += 1;
        self.stats.floats_uploaded += data.len();
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(Self::key(buffer)).is_none() {
            self.invalid(format_args!("destroying unknown buffer {:?}", buffer));
            return;
        }
        self.bindings.retain(|_, binding| binding.buffer != buffer);
        self.stats.buffers_destroyed += 1;
    }

    fn resolve_attribute_location(
        &self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<AttributeLocation> {
        self.programs.get(&program)?.get(name).copied()
    }

    fn bind_vertex_attribute(
        &mut self,
        buffer: BufferHandle,
        location: AttributeLocation,
        layout: AttributeLayout,
    ) {
        self.bindings.insert(location, AttributeBinding { buffer, layout, divisor: 0 });
    }

    fn bind_per_instance_attribute(
        &mut self,
        buffer: BufferHandle,
        location: AttributeLocation,
        layout: AttributeLayout,
    ) {
        self.bindings.insert(location, AttributeBinding { buffer, layout, divisor: 1 });
    }

    fn issue_instanced_draw(&mut self, topology: Topology, vertex_count: u32, instance_count: u32) {
        log::trace!("Headless draw: {} vertices x {} instances", vertex_count, instance_count);
        self.draws.push(DrawCall {
            topology,
            vertex_count,
            instance_count,
            program: self.current_program,
        });
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.bound_texture = Some(texture);
    }

    fn set_uniform_mat3(&mut self, name: &str, value: &Mat3) {
        self.uniforms.insert(name.to_string(), *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_and_read_back() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer();

        device.upload_initial(buffer, &[1.0, 2.0, 3.0, 4.0], BufferUsage::Stream);
        device.upload_subrange(buffer, 2, &[30.0, 40.0]);

        assert_eq!(device.buffer_data(buffer), Some(vec![1.0, 2.0, 30.0, 40.0]));
        assert_eq!(device.buffer_usage(buffer), Some(BufferUsage::Stream));
        assert_eq!(device.stats().floats_uploaded, 6);
        assert_eq!(device.stats().invalid_operations, 0);
    }

    #[test]
    fn test_overflowing_subrange_is_rejected() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer();
        device.upload_initial(buffer, &[0.0; 2], BufferUsage::Static);

        device.upload_subrange(buffer, 1, &[1.0, 1.0]);

        assert_eq!(device.buffer_data(buffer), Some(vec![0.0, 0.0]));
        assert_eq!(device.stats().invalid_operations, 1);
    }

    #[test]
    fn test_destroy_drops_bindings() {
        let mut device = HeadlessDevice::new();
        let program = device.register_program(&["vertex", "offset"]);
        let location = device
            .resolve_attribute_location(program, "offset")
            .expect("registered attribute");
        let buffer = device.create_buffer();

        device.bind_per_instance_attribute(buffer, location, AttributeLayout::packed(2));
        assert_eq!(device.binding(location).map(|b| b.divisor), Some(1));

        device.destroy_buffer(buffer);
        assert!(!device.is_live(buffer));
        assert!(device.binding(location).is_none());

        // A second destroy is a driver error
        device.destroy_buffer(buffer);
        assert_eq!(device.stats().invalid_operations, 1);
    }

    #[test]
    fn test_unknown_attribute_does_not_resolve() {
        let mut device = HeadlessDevice::new();
        let program = device.register_sprite_program();

        assert_eq!(
            device.resolve_attribute_location(program, "vertex"),
            Some(AttributeLocation(0))
        );
        assert_eq!(device.resolve_attribute_location(program, "tint"), None);
        assert_eq!(device.resolve_attribute_location(ProgramHandle(99), "vertex"), None);
    }
}
