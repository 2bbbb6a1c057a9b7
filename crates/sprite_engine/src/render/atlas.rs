//! Sprite sheet atlas
//!
//! Every named frame of a sprite sheet is a pair of matrices applied to the
//! shared `[-1, 1]²` quad:
//!
//! - `model` scales the quad to the frame's size in world units
//! - `uv` maps the quad onto the frame's rectangle in texture space
//!
//! Texture space has `v = 0` on the first image row, so the uv matrix flips
//! the quad vertically.

use crate::foundation::math::{Mat3, Mat3Ext, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Atlas construction and lookup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtlasError {
    /// The sheet has a zero dimension or a non-positive pixel scale
    #[error("Invalid sheet {width}x{height} at {pixels_per_unit} pixels per unit")]
    InvalidSheet {
        /// Sheet width in pixels
        width: u32,
        /// Sheet height in pixels
        height: u32,
        /// Pixels per world unit
        pixels_per_unit: f32,
    },

    /// A frame rectangle has no area
    #[error("Frame '{0}' has an empty rectangle")]
    EmptyFrame(String),

    /// A frame rectangle extends past the sheet
    #[error("Frame '{name}' ({rect:?}) lies outside the {width}x{height} sheet")]
    OutOfBounds {
        /// Frame name
        name: String,
        /// Offending rectangle
        rect: FrameRect,
        /// Sheet width in pixels
        width: u32,
        /// Sheet height in pixels
        height: u32,
    },

    /// No frame with this name
    #[error("Unknown sprite frame '{0}'")]
    UnknownFrame(String),
}

/// Pixel rectangle of one frame, origin at the sheet's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameRect {
    /// Create a rectangle
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Serialized description of a sprite sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Sheet width in pixels
    pub sheet_width: u32,
    /// Sheet height in pixels
    pub sheet_height: u32,
    /// Pixels per world unit
    #[serde(default = "default_pixels_per_unit")]
    pub pixels_per_unit: f32,
    /// Frame rectangles by name
    #[serde(default)]
    pub frames: BTreeMap<String, FrameRect>,
}

fn default_pixels_per_unit() -> f32 {
    32.0
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            sheet_width: 256,
            sheet_height: 256,
            pixels_per_unit: default_pixels_per_unit(),
            frames: BTreeMap::new(),
        }
    }
}

/// Matrices that place one frame on the quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteFrame {
    /// Quad to world-unit size
    pub model: Mat3,
    /// Quad to texture coordinates
    pub uv: Mat3,
}

impl SpriteFrame {
    /// Frame from explicit matrices
    pub fn new(model: Mat3, uv: Mat3) -> Self {
        Self { model, uv }
    }

    /// Frame for `rect` on a `sheet_width` x `sheet_height` sheet
    pub fn from_rect(
        rect: FrameRect,
        sheet_width: u32,
        sheet_height: u32,
        pixels_per_unit: f32,
    ) -> Self {
        let (w, h) = (rect.width as f32, rect.height as f32);
        let (sw, sh) = (sheet_width as f32, sheet_height as f32);

        let model = Mat3::scaling_2d(w / (2.0 * pixels_per_unit), h / (2.0 * pixels_per_unit));

        let center = Vec2::new((rect.x as f32 + w / 2.0) / sw, (rect.y as f32 + h / 2.0) / sh);
        let uv = Mat3::translation_2d(center) * Mat3::scaling_2d(w / (2.0 * sw), -h / (2.0 * sh));

        Self { model, uv }
    }

    /// Frame that draws nothing
    pub fn hidden() -> Self {
        Self {
            model: Mat3::degenerate(),
            uv: Mat3::degenerate(),
        }
    }
}

/// Named frames of one sprite sheet
#[derive(Debug, Clone, Default)]
pub struct SpriteAtlas {
    frames: HashMap<String, SpriteFrame>,
}

impl SpriteAtlas {
    /// Empty atlas
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and compute every frame
    pub fn from_config(config: &AtlasConfig) -> Result<Self, AtlasError> {
        if config.sheet_width == 0 || config.sheet_height == 0 || config.pixels_per_unit <= 0.0 {
            return Err(AtlasError::InvalidSheet {
                width: config.sheet_width,
                height: config.sheet_height,
                pixels_per_unit: config.pixels_per_unit,
            });
        }

        let mut atlas = Self::new();
        for (name, rect) in &config.frames {
            if rect.width == 0 || rect.height == 0 {
                return Err(AtlasError::EmptyFrame(name.clone()));
            }
            let fits_x = rect
                .x
                .checked_add(rect.width)
                .is_some_and(|right| right <= config.sheet_width);
            let fits_y = rect
                .y
                .checked_add(rect.height)
                .is_some_and(|bottom| bottom <= config.sheet_height);
            if !fits_x || !fits_y {
                return Err(AtlasError::OutOfBounds {
                    name: name.clone(),
                    rect: *rect,
                    width: config.sheet_width,
                    height: config.sheet_height,
                });
            }

            let frame = SpriteFrame::from_rect(
                *rect,
                config.sheet_width,
                config.sheet_height,
                config.pixels_per_unit,
            );
            atlas.insert(name.clone(), frame);
        }

        log::info!(
            "Loaded sprite atlas with {} frame(s) from a {}x{} sheet",
            atlas.len(),
            config.sheet_width,
            config.sheet_height
        );
        Ok(atlas)
    }

    /// Add or replace a frame
    pub fn insert(&mut self, name: impl Into<String>, frame: SpriteFrame) {
        self.frames.insert(name.into(), frame);
    }

    /// Frame by name
    pub fn get(&self, name: &str) -> Option<&SpriteFrame> {
        self.frames.get(name)
    }

    /// Frame by name, as an error if missing
    pub fn frame(&self, name: &str) -> Result<&SpriteFrame, AtlasError> {
        self.get(name).ok_or_else(|| AtlasError::UnknownFrame(name.to_string()))
    }

    /// Frame names, unordered
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the atlas has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point2;
    use approx::assert_relative_eq;

    fn sheet() -> AtlasConfig {
        let mut config = AtlasConfig {
            sheet_width: 128,
            sheet_height: 64,
            pixels_per_unit: 16.0,
            frames: BTreeMap::new(),
        };
        config.frames.insert("ship".to_string(), FrameRect::new(32, 0, 32, 16));
        config
    }

    #[test]
    fn test_uv_maps_quad_corners_to_rect() {
        let atlas = SpriteAtlas::from_config(&sheet()).expect("valid sheet");
        let frame = atlas.frame("ship").expect("ship frame");

        let top_left = frame.uv.transform_point_2d(Point2::new(-1.0, 1.0));
        let bottom_right = frame.uv.transform_point_2d(Point2::new(1.0, -1.0));

        assert_relative_eq!(top_left.x, 32.0 / 128.0);
        assert_relative_eq!(top_left.y, 0.0);
        assert_relative_eq!(bottom_right.x, 64.0 / 128.0);
        assert_relative_eq!(bottom_right.y, 16.0 / 64.0);
    }

    #[test]
    fn test_model_sizes_quad_in_world_units() {
        let atlas = SpriteAtlas::from_config(&sheet()).expect("valid sheet");
        let frame = atlas.frame("ship").expect("ship frame");

        let corner = frame.model.transform_point_2d(Point2::new(1.0, 1.0));
        // 32x16 pixels at 16 px/unit is 2x1 units, half-extents 1 and 0.5
        assert_relative_eq!(corner.x, 1.0);
        assert_relative_eq!(corner.y, 0.5);
    }

    #[test]
    fn test_rejects_bad_rects() {
        let mut config = sheet();
        config.frames.insert("wide".to_string(), FrameRect::new(100, 0, 40, 8));
        assert!(matches!(SpriteAtlas::from_config(&config), Err(AtlasError::OutOfBounds { .. })));

        let mut config = sheet();
        config.frames.insert("flat".to_string(), FrameRect::new(0, 0, 8, 0));
        assert_eq!(
            SpriteAtlas::from_config(&config).err(),
            Some(AtlasError::EmptyFrame("flat".to_string()))
        );

        let config = AtlasConfig {
            pixels_per_unit: 0.0,
            ..sheet()
        };
        assert!(matches!(SpriteAtlas::from_config(&config), Err(AtlasError::InvalidSheet { .. })));
    }

    #[test]
    fn test_unknown_frame() {
        let atlas = SpriteAtlas::from_config(&sheet()).expect("valid sheet");
        assert_eq!(atlas.frame("ufo").err(), Some(AtlasError::UnknownFrame("ufo".to_string())));
        assert!(atlas.get("ship").is_some());
    }

    #[test]
    fn test_hidden_frame_is_degenerate() {
        let frame = SpriteFrame::hidden();
        assert_eq!(frame.model, Mat3::zeros());
        assert_eq!(frame.uv, Mat3::zeros());
    }
}
