//! Channel descriptors
//!
//! A channel is one named per-instance attribute (a model transform, a
//! texture rect, a tint...). Every channel stores the same number of slots; a
//! slot index addresses one instance across all of them.

use serde::{Deserialize, Serialize};

/// Element type of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// One float per instance
    Scalar,
    /// Two floats per instance
    #[serde(alias = "vec")]
    Vector,
    /// A 3x3 affine matrix, nine floats per instance
    #[serde(alias = "mat")]
    Matrix,
}

impl ChannelKind {
    /// Number of floats one instance occupies
    pub const fn width(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector => 2,
            Self::Matrix => 9,
        }
    }

    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Vector => "vector",
            Self::Matrix => "matrix",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static configuration of one channel
///
/// Serialized with the keys `name`, `type` and `dynamic`; `dynamic` defaults to
/// `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Attribute name in the shading program (matrix channels use
    /// `<name>_x`, `<name>_y`, `<name>_z`)
    pub name: String,
    /// Element type
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Whether the channel is re-uploaded every frame
    #[serde(default = "default_dynamic")]
    pub dynamic: bool,
}

fn default_dynamic() -> bool {
    true
}

impl ChannelDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, kind: ChannelKind, dynamic: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            dynamic,
        }
    }

    /// Dynamic scalar channel
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::Scalar, true)
    }

    /// Dynamic vector channel
    pub fn vector(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::Vector, true)
    }

    /// Dynamic matrix channel
    pub fn matrix(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::Matrix, true)
    }

    /// Mark the channel as static (uploaded only when the pool changes)
    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.dynamic = false;
        self
    }

    /// Number of floats one instance occupies
    pub fn width(&self) -> usize {
        self.kind.width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(ChannelKind::Scalar.width(), 1);
        assert_eq!(ChannelKind::Vector.width(), 2);
        assert_eq!(ChannelKind::Matrix.width(), 9);
    }

    #[test]
    fn test_descriptor_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            channels: Vec<ChannelDescriptor>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[channels]]
            name = "model"
            type = "matrix"

            [[channels]]
            name = "tint"
            type = "vec"
            dynamic = false
            "#,
        )
        .expect("valid channel table");

        assert_eq!(parsed.channels[0], ChannelDescriptor::matrix("model"));
        assert_eq!(parsed.channels[1], ChannelDescriptor::vector("tint").with_static());
    }
}
