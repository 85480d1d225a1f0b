//! Shelf stocking: how many copies of a product fill a shelf slot, and
//! where each copy goes.

use std::cmp::Ordering;

use cartlab_core::{Aabb, ProductId};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LayoutError;

/// Usable area of one shelf slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfSpec {
    pub width: f32,
    pub depth: f32,
    pub spacing: f32,
}

impl Default for ShelfSpec {
    fn default() -> Self {
        Self {
            width: 0.6,
            depth: 0.42,
            spacing: 0.05,
        }
    }
}

impl ShelfSpec {
    /// Copies that fit across `(width, depth)`, at least one each way.
    #[must_use]
    pub fn capacity(&self, item: Vector3<f32>) -> (usize, usize) {
        let fit = |extent: f32, size: f32| {
            (((extent + self.spacing) / (size + self.spacing)).floor() as usize).max(1)
        };
        (fit(self.width, item.x), fit(self.depth, item.z))
    }
}

/// Pivot offset that puts an item's bottom on the shelf (y = 0) and its
/// front face on the shelf edge (z = 0), given bounds relative to its pivot.
#[must_use]
pub fn aligned_offset(bounds: &Aabb) -> Vector3<f32> {
    Vector3::new(0.0, -bounds.min.y, -bounds.max.z)
}

/// Pivot positions for a full shelf, in slot-local space.
///
/// The grid is centred across the width and runs back from the front
/// edge. The first position is where the shelved product itself goes.
pub fn stock_layout(bounds: &Aabb, shelf: &ShelfSpec) -> Result<Vec<Point3<f32>>, LayoutError> {
    if bounds.is_degenerate() {
        warn!(?bounds, "could not calculate bounds for stocking");
        return Err(LayoutError::DegenerateBounds);
    }
    let size = bounds.size();
    let (count_x, count_z) = shelf.capacity(size);
    debug!(count_x, count_z, width = size.x, depth = size.z, "shelf capacity");

    let used_width = count_x as f32 * size.x + (count_x - 1) as f32 * shelf.spacing;
    let start_x = -used_width * 0.5 + size.x * 0.5;
    let offset = aligned_offset(bounds);

    let mut positions = Vec::with_capacity(count_x * count_z);
    for z in 0..count_z {
        for x in 0..count_x {
            positions.push(Point3::new(
                start_x + x as f32 * (size.x + shelf.spacing),
                offset.y,
                offset.z - z as f32 * (size.z + shelf.spacing),
            ));
        }
    }
    Ok(positions)
}

/// Product ID encoded in a slot name: the first run of digits.
pub fn slot_product_id(name: &str) -> Result<ProductId, LayoutError> {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits
        .parse()
        .map_err(|_| LayoutError::SlotWithoutId(name.to_owned()))
}

/// Orders names so embedded numbers compare by value: `Slot_2 < Slot_10`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let take_number = |it: &mut std::iter::Peekable<std::str::Chars<'_>>| {
                    let mut digits = String::new();
                    while let Some(c) = it.next_if(char::is_ascii_digit) {
                        digits.push(c);
                    }
                    digits
                };
                let (da, db) = (take_number(&mut a), take_number(&mut b));
                let (ta, tb) = (da.trim_start_matches('0'), db.trim_start_matches('0'));
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

/// A shelf slot and whether something is already stocked in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub name: String,
    pub occupied: bool,
}

/// The first empty slot in natural name order.
#[must_use]
pub fn next_free_slot(slots: &[SlotInfo]) -> Option<&SlotInfo> {
    let mut free: Vec<&SlotInfo> = slots.iter().filter(|s| !s.occupied).collect();
    free.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    free.first().copied()
}
