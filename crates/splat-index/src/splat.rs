//! Oriented splat samples.

use glam::Vec3;

/// An oriented surface sample: position, influence radius and outward normal.
///
/// The radius defines an axis-aligned bounding cube of side `2 * radius`
/// centred on the position; that cube is what the spatial index operates on.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Splat {
    pub position: Vec3,
    pub radius: f32,
    pub normal: Vec3,
}

impl Splat {
    /// Create a splat. The radius must be positive for the splat to occupy
    /// any space; the normal is stored as given.
    pub fn new(position: Vec3, radius: f32, normal: Vec3) -> Self {
        Self {
            position,
            radius,
            normal,
        }
    }

    /// Lower corner of the bounding cube.
    #[inline]
    pub fn cube_min(&self) -> Vec3 {
        self.position - Vec3::splat(self.radius)
    }

    /// Upper corner of the bounding cube.
    #[inline]
    pub fn cube_max(&self) -> Vec3 {
        self.position + Vec3::splat(self.radius)
    }
}
