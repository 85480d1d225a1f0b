//! First-fit placement of purchased items on the cart surface.
//!
//! Positions are in the surface's local frame: the origin is the middle of
//! the surface, x runs along its width, z along its depth and y up.

use cartlab_core::Aabb;
use nalgebra::{Point3, Vector3};

/// Slack for comparing candidate centres against the surface bounds.
const BOUNDS_EPSILON: f32 = 1e-5;
/// Overlap below this depth on any axis counts as touching.
pub const CONTACT_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementKind {
    /// A free raster cell, `row` along depth and `col` along width.
    Grid { row: usize, col: usize },
    /// On top of the tallest placed box.
    Stacked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub center: Point3<f32>,
    pub kind: PlacementKind,
}

impl Placement {
    /// The box the item occupies once placed.
    #[must_use]
    pub fn bounds(&self, item: Vector3<f32>) -> Aabb {
        Aabb::from_center_size(self.center, item)
    }
}

/// Candidate centres along one axis: from the near edge inwards by
/// `margin + item / 2`, stepping `item + spacing`, while the centre stays
/// within `extent / 2 - margin`.
fn axis_centers(item: f32, extent: f32, margin: f32, spacing: f32) -> impl Iterator<Item = f32> {
    let step = item + spacing;
    let start = -extent * 0.5 + margin + item * 0.5;
    let limit = extent * 0.5 - margin + BOUNDS_EPSILON;
    (0usize..)
        .map(move |i| start + i as f32 * step)
        .take_while(move |c| step > 0.0 && *c <= limit)
}

/// Grid cells `(rows, cols)` the raster scan visits for an item.
#[must_use]
pub fn grid_capacity(item: Vector3<f32>, surface: Vector3<f32>, margin: f32, spacing: f32) -> (usize, usize) {
    (
        axis_centers(item.z, surface.z, margin, spacing).count(),
        axis_centers(item.x, surface.x, margin, spacing).count(),
    )
}

/// Finds where an item of size `item` goes on a surface of size `surface`.
///
/// Scans cells row by row and takes the first whose box overlaps nothing
/// in `history`. With no free cell the item is stacked on the tallest box
/// at the surface centre. The result depends only on the inputs and the
/// order of the scan.
#[must_use]
pub fn find_position(
    item: Vector3<f32>,
    surface: Vector3<f32>,
    margin: f32,
    spacing: f32,
    history: &[Aabb],
) -> Placement {
    let y = surface.y * 0.5 + item.y * 0.5;

    for (row, z) in axis_centers(item.z, surface.z, margin, spacing).enumerate() {
        for (col, x) in axis_centers(item.x, surface.x, margin, spacing).enumerate() {
            let center = Point3::new(x, y, z);
            let candidate = Aabb::from_center_size(center, item);
            if !history.iter().any(|placed| placed.overlaps(&candidate, CONTACT_EPSILON)) {
                return Placement {
                    center,
                    kind: PlacementKind::Grid { row, col },
                };
            }
        }
    }

    let top = history
        .iter()
        .map(|b| b.max.y)
        .fold(surface.y * 0.5, f32::max);
    Placement {
        center: Point3::new(0.0, top + item.y * 0.5, 0.0),
        kind: PlacementKind::Stacked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fill(item: Vector3<f32>, surface: Vector3<f32>, margin: f32, spacing: f32, n: usize) -> (Vec<Placement>, Vec<Aabb>) {
        let mut history = Vec::new();
        let mut placements = Vec::new();
        for _ in 0..n {
            let p = find_position(item, surface, margin, spacing, &history);
            history.push(p.bounds(item));
            placements.push(p);
        }
        (placements, history)
    }

    #[test]
    fn small_cart_takes_a_two_by_two_grid_then_stacks() {
        let item = Vector3::new(0.10, 0.10, 0.10);
        let surface = Vector3::new(0.24, 0.0, 0.24);
        assert_eq!(grid_capacity(item, surface, 0.02, 0.02), (2, 2));

        let (placements, history) = fill(item, surface, 0.02, 0.02, 5);
        let kinds: Vec<_> = placements.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [
                PlacementKind::Grid { row: 0, col: 0 },
                PlacementKind::Grid { row: 0, col: 1 },
                PlacementKind::Grid { row: 1, col: 0 },
                PlacementKind::Grid { row: 1, col: 1 },
                PlacementKind::Stacked,
            ]
        );

        assert_relative_eq!(placements[0].center.x, -0.05, epsilon = 1e-6);
        assert_relative_eq!(placements[1].center.x, 0.07, epsilon = 1e-6);
        assert_relative_eq!(placements[2].center.z, 0.07, epsilon = 1e-6);
        assert_relative_eq!(placements[0].center.y, 0.05, epsilon = 1e-6);

        let tallest = history[..4].iter().map(|b| b.max.y).fold(f32::MIN, f32::max);
        assert!(history[4].min.y >= tallest - 1e-6);
        assert!(placements[4].center.y > tallest);
        assert_eq!((placements[4].center.x, placements[4].center.z), (0.0, 0.0));
    }

    #[test]
    fn grid_cells_never_overlap() {
        let item = Vector3::new(0.1, 0.2, 0.1);
        let surface = Vector3::new(0.5, 0.02, 0.3);
        let (rows, cols) = grid_capacity(item, surface, 0.01, 0.02);
        assert_eq!((rows, cols), (2, 4));

        let (placements, history) = fill(item, surface, 0.01, 0.02, rows * cols + 2);
        for (i, a) in history.iter().enumerate() {
            for b in &history[i + 1..] {
                assert!(!a.overlaps(b, CONTACT_EPSILON));
            }
        }
        assert!(placements[..rows * cols].iter().all(|p| matches!(p.kind, PlacementKind::Grid { .. })));
        assert_eq!(placements[rows * cols].kind, PlacementKind::Stacked);
        assert!(placements[rows * cols + 1].center.y > placements[rows * cols].center.y);
        // Surface top is at y = 0.01.
        assert_relative_eq!(placements[0].center.y, 0.11, epsilon = 1e-6);
    }

    #[test]
    fn scan_skips_cells_taken_by_other_sizes() {
        let surface = Vector3::new(0.24, 0.0, 0.24);
        let big = Aabb::from_center_size(Point3::new(-0.05, 0.05, -0.05), Vector3::new(0.1, 0.1, 0.1));
        let p = find_position(Vector3::new(0.1, 0.1, 0.1), surface, 0.02, 0.02, &[big]);
        assert_eq!(p.kind, PlacementKind::Grid { row: 0, col: 1 });
    }

    #[test]
    fn oversized_item_stacks_on_the_surface() {
        let p = find_position(
            Vector3::new(1.0, 0.2, 1.0),
            Vector3::new(0.24, 0.1, 0.24),
            0.02,
            0.02,
            &[],
        );
        assert_eq!(p.kind, PlacementKind::Stacked);
        assert_relative_eq!(p.center.y, 0.15, epsilon = 1e-6);
    }
}
