//! Axis-aligned boxes and rigid transforms shared by the trial machine and
//! the cart packer.
//!
//! All quantities are `f32` metres, matching what the host engine reports.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
///
/// # Example
///
/// ```
/// use cartlab_core::Aabb;
/// use nalgebra::{Point3, Vector3};
///
/// let a = Aabb::from_center(Point3::origin(), Vector3::new(0.05, 0.05, 0.05));
/// let b = Aabb::from_center(Point3::new(0.2, 0.0, 0.0), Vector3::new(0.05, 0.05, 0.05));
/// assert!(!a.overlaps(&b, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from two corners given in any order.
    #[must_use]
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates a box centred at `center` with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f32>, half_extents: Vector3<f32>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates a box centred at `center` with the given full size.
    #[must_use]
    pub fn from_center_size(center: Point3<f32>, size: Vector3<f32>) -> Self {
        Self::from_center(center, size * 0.5)
    }

    #[must_use]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Full dimensions of the box.
    #[must_use]
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Strict overlap test: the boxes must overlap by more than `tolerance`
    /// on every axis. Boxes that only share a face never overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self, tolerance: f32) -> bool {
        (0..3).all(|i| {
            let lo = self.min[i].max(other.min[i]);
            let hi = self.max[i].min(other.max[i]);
            hi - lo > tolerance
        })
    }

    /// Returns the union of this box and another.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Encapsulates a set of boxes, `None` when the set is empty.
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Option<Self> {
        boxes.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(a) => Some(a.union(b)),
        })
    }

    /// True when the box encloses no volume and cannot be placed.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        !(size.x > 0.0 && size.y > 0.0 && size.z > 0.0)
    }
}

/// Position and orientation of an entity or anchor in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    #[must_use]
    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    #[must_use]
    pub fn from_position(position: Point3<f32>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    #[must_use]
    pub fn isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.rotation)
    }

    /// Maps a point from this transform's local space to world space.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f32>) -> Point3<f32> {
        self.isometry().transform_point(local)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Point3::origin())
    }
}

/// A flat placement surface: its anchor transform plus its full extent.
///
/// The surface top sits at `size.y / 2` in the anchor's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub transform: Transform,
    pub size: Vector3<f32>,
}

impl Surface {
    #[must_use]
    pub fn top(&self) -> f32 {
        self.size.y * 0.5
    }
}
