//! Fixed-width views over one slot of a channel buffer
//!
//! A view is a borrowed window of exactly `N` floats. Scalar, vector and matrix
//! channels share the same type (`N = 1`, `2`, `9`); width-specific accessors
//! are added per `N` instead of through a class hierarchy.

use crate::foundation::math::{Mat3, Mat3Ext, Vec2, MAT3_FLOATS};
use crate::render::instancing::channel::ChannelKind;

/// Read-only view of one instance's data in a channel
#[derive(Debug, Clone, Copy)]
pub struct AttributeView<'a, const N: usize> {
    data: &'a [f32; N],
}

/// Mutable view of one instance's data in a channel
#[derive(Debug)]
pub struct AttributeViewMut<'a, const N: usize> {
    data: &'a mut [f32; N],
}

/// View of a scalar channel
pub type ScalarView<'a> = AttributeView<'a, 1>;
/// View of a vector channel
pub type VectorView<'a> = AttributeView<'a, 2>;
/// View of a matrix channel
pub type MatrixView<'a> = AttributeView<'a, MAT3_FLOATS>;
/// Mutable view of a scalar channel
pub type ScalarViewMut<'a> = AttributeViewMut<'a, 1>;
/// Mutable view of a vector channel
pub type VectorViewMut<'a> = AttributeViewMut<'a, 2>;
/// Mutable view of a matrix channel
pub type MatrixViewMut<'a> = AttributeViewMut<'a, MAT3_FLOATS>;

impl<'a, const N: usize> AttributeView<'a, N> {
    /// Wrap a slot; `None` if the slot is not exactly `N` floats wide
    pub fn from_slot(slot: &'a [f32]) -> Option<Self> {
        <&[f32; N]>::try_from(slot).ok().map(|data| Self { data })
    }

    /// Copy of the slot's floats
    pub fn get(&self) -> [f32; N] {
        *self.data
    }

    /// The slot's floats
    pub fn as_slice(&self) -> &[f32] {
        self.data
    }

    /// Whether every float is zero
    pub fn is_zeroed(&self) -> bool {
        is_zeroed(&self.data[..])
    }
}

impl<'a, const N: usize> AttributeViewMut<'a, N> {
    /// Wrap a slot; `None` if the slot is not exactly `N` floats wide
    pub fn from_slot(slot: &'a mut [f32]) -> Option<Self> {
        <&mut [f32; N]>::try_from(slot).ok().map(|data| Self { data })
    }

    /// Copy of the slot's floats
    pub fn get(&self) -> [f32; N] {
        *self.data
    }

    /// Overwrite the slot
    pub fn set(&mut self, values: [f32; N]) {
        *self.data = values;
    }

    /// Zero the slot
    pub fn zero(&mut self) {
        zero_slot(&mut self.data[..]);
    }

    /// The slot's floats
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data[..]
    }

    /// Overwrite with another view's contents
    pub fn copy_from(&mut self, other: &AttributeView<'_, N>) {
        copy_slot(&mut self.data[..], other.as_slice());
    }

    /// Reborrow as a read-only view
    pub fn as_view(&self) -> AttributeView<'_, N> {
        AttributeView { data: &*self.data }
    }
}

impl AttributeView<'_, 1> {
    /// The scalar value
    pub fn value(&self) -> f32 {
        self.data[0]
    }
}

impl AttributeViewMut<'_, 1> {
    /// Set the scalar value
    pub fn set_value(&mut self, value: f32) {
        self.data[0] = value;
    }
}

impl AttributeView<'_, 2> {
    /// The vector value
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.data[0], self.data[1])
    }
}

impl AttributeViewMut<'_, 2> {
    /// Set the vector value
    pub fn set_vec(&mut self, value: Vec2) {
        self.data[0] = value.x;
        self.data[1] = value.y;
    }
}

impl AttributeView<'_, MAT3_FLOATS> {
    /// The matrix value
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_packed(self.data)
    }
}

impl AttributeViewMut<'_, MAT3_FLOATS> {
    /// Set the matrix value
    pub fn set_matrix(&mut self, value: &Mat3) {
        *self.data = value.to_packed();
    }

    /// Reset to the identity transform
    pub fn set_identity(&mut self) {
        fill_identity(&mut self.data[..]);
    }
}

/// Write zeros into a slot
pub fn zero_slot(slot: &mut [f32]) {
    slot.fill(0.0);
}

/// Copy `src` into `dst`; both must have the same length
pub fn copy_slot(dst: &mut [f32], src: &[f32]) {
    debug_assert_eq!(dst.len(), src.len(), "slot widths differ");
    dst.copy_from_slice(src);
}

/// Whether every float in a slot is zero
pub fn is_zeroed(slot: &[f32]) -> bool {
    slot.iter().all(|value| *value == 0.0)
}

/// Write a column-major 3x3 identity into a matrix slot
pub fn fill_identity(slot: &mut [f32]) {
    zero_slot(slot);
    for diagonal in [0, 4, 8] {
        if let Some(value) = slot.get_mut(diagonal) {
            *value = 1.0;
        }
    }
}

/// Initial contents of a never-used slot: identity for matrices, zero otherwise
pub fn initialize_slot(kind: ChannelKind, slot: &mut [f32]) {
    match kind {
        ChannelKind::Matrix => fill_identity(slot),
        ChannelKind::Scalar | ChannelKind::Vector => zero_slot(slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut slot = [0.0_f32; 2];
        assert!(ScalarViewMut::from_slot(&mut slot).is_none());
        assert!(VectorViewMut::from_slot(&mut slot).is_some());
        assert!(MatrixView::from_slot(&slot).is_none());
    }

    #[test]
    fn test_matrix_round_trip_through_view() {
        let mut slot = [0.0_f32; MAT3_FLOATS];
        let m = Mat3::rotation_2d(0.5) * Mat3::scaling_2d(2.0, 3.0);

        let mut view = MatrixViewMut::from_slot(&mut slot).expect("nine floats");
        view.set_matrix(&m);
        assert_eq!(view.as_view().matrix(), m);

        view.zero();
        assert!(view.as_view().is_zeroed());
    }

    #[test]
    fn test_initialize_slot() {
        let mut matrix = [5.0_f32; MAT3_FLOATS];
        initialize_slot(ChannelKind::Matrix, &mut matrix);
        assert_eq!(Mat3::from_packed(&matrix), Mat3::identity());

        let mut vector = [5.0_f32; 2];
        initialize_slot(ChannelKind::Vector, &mut vector);
        assert!(is_zeroed(&vector));
    }

    #[test]
    fn test_scalar_and_vector_accessors() {
        let mut scalar = [0.0_f32; 1];
        let mut view = ScalarViewMut::from_slot(&mut scalar).expect("one float");
        view.set_value(0.25);
        assert_eq!(view.as_view().value(), 0.25);

        let mut vector = [0.0_f32; 2];
        let mut view = VectorViewMut::from_slot(&mut vector).expect("two floats");
        view.set_vec(Vec2::new(1.0, -1.0));
        assert_eq!(view.as_view().vec(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_copy_between_slots() {
        let source = [1.0_f32, 2.0];
        let mut target = [0.0_f32; 2];

        let from = VectorView::from_slot(&source).expect("two floats");
        VectorViewMut::from_slot(&mut target).expect("two floats").copy_from(&from);
        assert_eq!(target, source);
    }
}
