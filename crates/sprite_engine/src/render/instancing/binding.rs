//! Attribute binding for instanced channels
//!
//! Resolves each channel's attribute location(s) from the shading program once,
//! at pool construction. Scalar and vector channels map to one attribute named
//! after the channel. A matrix channel is split into three 3-wide attributes
//! `<name>_x`, `<name>_y`, `<name>_z` that read columns 0, 1 and 2 of the packed
//! 9-float element.
//!
//! Channels that cannot be resolved are reported and left out; the pool keeps
//! working with whatever resolved.

use crate::render::device::{
    AttributeLayout, AttributeLocation, BufferHandle, GraphicsDevice, ProgramHandle,
};
use crate::render::instancing::channel::{ChannelDescriptor, ChannelKind};
use std::collections::HashSet;
use thiserror::Error;

/// Name of the per-vertex position attribute of the shared quad
pub const VERTEX_ATTRIBUTE: &str = "vertex";

/// Suffixes of the three column attributes of a matrix channel
pub const MATRIX_COLUMN_SUFFIXES: [&str; 3] = ["_x", "_y", "_z"];

/// Configuration problems found while binding channels
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The program does not expose one or more of the channel's attributes
    #[error("Channel '{channel}' is missing attribute(s) {missing:?} in the program")]
    AttributeNotFound {
        /// Channel name
        channel: String,
        /// Attribute names that did not resolve
        missing: Vec<String>,
    },

    /// Two descriptors share a name; the later one is ignored
    #[error("Channel '{0}' is declared more than once")]
    DuplicateChannel(String),
}

impl BindingError {
    /// Name of the channel the error refers to
    pub fn channel(&self) -> &str {
        match self {
            Self::AttributeNotFound { channel, .. } => channel,
            Self::DuplicateChannel(channel) => channel,
        }
    }
}

/// Resolved attribute locations of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    attributes: Vec<(AttributeLocation, AttributeLayout)>,
}

impl ChannelBinding {
    /// Locations and layouts, one entry per device attribute
    pub fn attributes(&self) -> &[(AttributeLocation, AttributeLayout)] {
        &self.attributes
    }

    /// Point every attribute of the channel at `buffer`, stepping per instance
    pub fn attach<D: GraphicsDevice>(&self, device: &mut D, buffer: BufferHandle) {
        for (location, layout) in &self.attributes {
            device.bind_per_instance_attribute(buffer, *location, *layout);
        }
    }
}

/// Outcome of resolving a list of channel descriptors
#[derive(Debug, Default)]
pub struct ResolvedChannels {
    /// Channels that resolved, in declaration order
    pub active: Vec<(ChannelDescriptor, ChannelBinding)>,
    /// Channels that were left out
    pub malformed: Vec<BindingError>,
}

/// Attribute names a channel needs from the program
pub fn attribute_names(descriptor: &ChannelDescriptor) -> Vec<String> {
    match descriptor.kind {
        ChannelKind::Scalar | ChannelKind::Vector => vec![descriptor.name.clone()],
        ChannelKind::Matrix => MATRIX_COLUMN_SUFFIXES
            .iter()
            .map(|suffix| format!("{}{}", descriptor.name, suffix))
            .collect(),
    }
}

/// Resolve one channel against the program
pub fn resolve_channel<D: GraphicsDevice>(
    device: &D,
    program: ProgramHandle,
    descriptor: &ChannelDescriptor,
) -> Result<ChannelBinding, BindingError> {
    let names = attribute_names(descriptor);
    let mut attributes = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for (column, name) in names.iter().enumerate() {
        match device.resolve_attribute_location(program, name) {
            Some(location) => {
                let width = descriptor.width();
                let layout = match descriptor.kind {
                    ChannelKind::Matrix => AttributeLayout::strided(3, width, column * 3),
                    ChannelKind::Scalar | ChannelKind::Vector => AttributeLayout::packed(width),
                };
                attributes.push((location, layout));
            }
            None => missing.push(name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(ChannelBinding { attributes })
    } else {
        Err(BindingError::AttributeNotFound {
            channel: descriptor.name.clone(),
            missing,
        })
    }
}

/// Resolve every descriptor, separating usable channels from malformed ones
pub fn resolve_channels<D: GraphicsDevice>(
    device: &D,
    program: ProgramHandle,
    descriptors: &[ChannelDescriptor],
) -> ResolvedChannels {
    let mut resolved = ResolvedChannels::default();
    let mut seen = HashSet::new();

    for descriptor in descriptors {
        if !seen.insert(descriptor.name.as_str()) {
            log::error!(
                "Channel '{}' declared twice; keeping the first declaration",
                descriptor.name
            );
            resolved.malformed.push(BindingError::DuplicateChannel(descriptor.name.clone()));
            continue;
        }

        match resolve_channel(device, program, descriptor) {
            Ok(binding) => {
                log::debug!(
                    "Bound {} channel '{}' to {} attribute(s)",
                    descriptor.kind,
                    descriptor.name,
                    binding.attributes().len()
                );
                resolved.active.push((descriptor.clone(), binding));
            }
            Err(err) => {
                log::error!("Excluding instanced channel: {}", err);
                resolved.malformed.push(err);
            }
        }
    }

    resolved
}

/// Resolve the quad's position attribute
pub fn resolve_vertex<D: GraphicsDevice>(
    device: &D,
    program: ProgramHandle,
) -> Option<AttributeLocation> {
    let location = device.resolve_attribute_location(program, VERTEX_ATTRIBUTE);
    if location.is_none() {
        log::error!(
            "Program {:?} has no '{}' attribute; quads cannot be positioned",
            program,
            VERTEX_ATTRIBUTE
        );
    }
    location
}
