//! Scene and render passes
//!
//! A [`Scene`] owns the shared unit quad and an ordered list of render passes.
//! Each frame the application mutates its objects, then calls
//! `update` → `prepare` → `draw`, and the scene fans each call out to its
//! passes from the deepest to the shallowest.

use crate::config::EngineConfig;
use crate::foundation::math::Mat3;
use crate::render::device::{
    BufferHandle, BufferUsage, GraphicsDevice, ProgramHandle, TextureHandle,
};
use crate::render::instancing::{ChannelDescriptor, InstancePool};
use std::any::Any;

/// The shared quad as a 4-vertex triangle strip
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Depth used when the caller has no preference
pub const DEFAULT_PASS_DEPTH: f32 = 0.5;

/// Channel holding each sprite's model matrix
pub const MODEL_CHANNEL: &str = "model";

/// Channel holding each sprite's texture-frame matrix
pub const UV_CHANNEL: &str = "uv";

/// Uniform holding the camera matrix
pub const VIEW_UNIFORM: &str = "view";

/// One stage of scene rendering
pub trait RenderPass<D: GraphicsDevice> {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Per-frame logic; `view` is the scene camera
    fn update(&mut self, _view: &Mat3, _dt: f32) {}

    /// Flush host-side changes to the device
    fn prepare(&mut self, _device: &mut D) {}

    /// Issue the pass's draws
    fn draw(&self, device: &mut D);

    /// Release device resources
    fn destroy(&mut self, _device: &mut D) {}

    /// Type-erased access, for [`Scene::pass`]
    fn as_any(&self) -> &dyn Any;

    /// Type-erased mutable access, for [`Scene::pass_mut`]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct PassEntry<D: GraphicsDevice> {
    depth: f32,
    pass: Box<dyn RenderPass<D>>,
}

/// Ordered collection of render passes sharing one quad
pub struct Scene<D: GraphicsDevice> {
    quad: BufferHandle,
    view: Mat3,
    time: f32,
    passes: Vec<PassEntry<D>>,
}

impl<D: GraphicsDevice> Scene<D> {
    /// Create the scene and upload the shared quad
    pub fn new(device: &mut D) -> Self {
        let quad = device.create_buffer();
        device.upload_initial(quad, &QUAD_VERTICES, BufferUsage::Static);
        log::info!("Created scene with shared quad buffer {:?}", quad);

        Self {
            quad,
            view: Mat3::identity(),
            time: 0.0,
            passes: Vec::new(),
        }
    }

    /// Buffer holding [`QUAD_VERTICES`]
    pub fn quad_buffer(&self) -> BufferHandle {
        self.quad
    }

    /// Camera matrix handed to every pass
    pub fn view(&self) -> &Mat3 {
        &self.view
    }

    /// Replace the camera matrix
    pub fn set_view(&mut self, view: Mat3) {
        self.view = view;
    }

    /// Seconds accumulated by `update`
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Insert a pass; deeper passes run first, equal depths keep insertion order
    pub fn add_pass(&mut self, pass: Box<dyn RenderPass<D>>, depth: f32) {
        let at = self
            .passes
            .iter()
            .position(|entry| entry.depth < depth)
            .unwrap_or(self.passes.len());
        log::debug!("Adding render pass '{}' at depth {} (position {})", pass.name(), depth, at);
        self.passes.insert(at, PassEntry { depth, pass });
    }

    /// First pass of type `P`
    pub fn pass<P: 'static>(&self) -> Option<&P> {
        self.passes.iter().find_map(|entry| entry.pass.as_any().downcast_ref::<P>())
    }

    /// First pass of type `P`, mutably
    pub fn pass_mut<P: 'static>(&mut self) -> Option<&mut P> {
        self.passes
            .iter_mut()
            .find_map(|entry| entry.pass.as_any_mut().downcast_mut::<P>())
    }

    /// Names of the passes in execution order
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|entry| entry.pass.name()).collect()
    }

    /// Number of passes
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Advance time and update every pass
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        for entry in &mut self.passes {
            entry.pass.update(&self.view, dt);
        }
    }

    /// Prepare every pass
    pub fn prepare(&mut self, device: &mut D) {
        for entry in &mut self.passes {
            entry.pass.prepare(device);
        }
    }

    /// Draw every pass
    pub fn draw(&self, device: &mut D) {
        for entry in &self.passes {
            entry.pass.draw(device);
        }
    }

    /// Destroy every pass and the shared quad
    pub fn destroy(mut self, device: &mut D) {
        for entry in &mut self.passes {
            entry.pass.destroy(device);
        }
        device.destroy_buffer(self.quad);
        log::info!("Destroyed scene with {} pass(es)", self.passes.len());
    }
}

/// Built-in pass drawing every sprite with one instanced draw
///
/// Sprites are slots in the pass's pool; see [`crate::render::Sprite`].
#[derive(Debug)]
pub struct SpritePass {
    program: ProgramHandle,
    texture: TextureHandle,
    pool: InstancePool,
    view: Mat3,
}

impl SpritePass {
    /// Channels of the built-in sprite shader
    pub fn default_channels() -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::matrix(MODEL_CHANNEL), ChannelDescriptor::matrix(UV_CHANNEL)]
    }

    /// Sprite pass with the built-in channels
    pub fn new<D: GraphicsDevice>(
        device: &mut D,
        program: ProgramHandle,
        texture: TextureHandle,
        quad: BufferHandle,
        initial_capacity: usize,
    ) -> Self {
        let pool = InstancePool::new(
            device,
            program,
            quad,
            &Self::default_channels(),
            initial_capacity,
        );
        Self {
            program,
            texture,
            pool,
            view: Mat3::identity(),
        }
    }

    /// Sprite pass with channels and capacity taken from configuration
    pub fn from_config<D: GraphicsDevice>(
        device: &mut D,
        program: ProgramHandle,
        texture: TextureHandle,
        quad: BufferHandle,
        config: &EngineConfig,
    ) -> Self {
        let pool = InstancePool::new(
            device,
            program,
            quad,
            &config.channels,
            config.initial_capacity,
        );
        if !pool.has_channel(MODEL_CHANNEL) {
            log::warn!(
                "Sprite pass has no '{}' channel; sprites will not be positioned",
                MODEL_CHANNEL
            );
        }
        Self {
            program,
            texture,
            pool,
            view: Mat3::identity(),
        }
    }

    /// Sprite instances
    pub fn pool(&self) -> &InstancePool {
        &self.pool
    }

    /// Mutable sprite instances
    pub fn pool_mut(&mut self) -> &mut InstancePool {
        &mut self.pool
    }

    /// Camera matrix captured at the last update
    pub fn view(&self) -> &Mat3 {
        &self.view
    }
}

impl<D: GraphicsDevice> RenderPass<D> for SpritePass {
    fn name(&self) -> &str {
        "sprites"
    }

    fn update(&mut self, view: &Mat3, _dt: f32) {
        self.view = *view;
    }

    fn prepare(&mut self, device: &mut D) {
        self.pool.prepare(device);
    }

    fn draw(&self, device: &mut D) {
        device.use_program(self.program);
        device.bind_texture(self.texture);
        device.set_uniform_mat3(VIEW_UNIFORM, &self.view);
        self.pool.draw(device);
    }

    fn destroy(&mut self, device: &mut D) {
        self.pool.destroy(device);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
