//! Placement Generator: enumerates every geometrically valid `(x, y,
//! rotation)` tuple for a shape on an empty 12x12 board. Used both by
//! `Board::place_random` (filtered against the board's current occupancy)
//! and by the configuration enumerator (filtered against belief-map
//! compatibility), and by offline bias-grid tooling.
//!
//! The distribution this produces, once filtered and uniformly sampled, is
//! uniform over surviving `(x, y, rotation)` tuples — not over boards. That
//! mismatch is intentional; see spec.

use crate::geometry::{dimensions, Battleship, Rotation, ShapeType};
use crate::grid::{HEIGHT, WIDTH};

/// All raw placements of `shape_type` whose bounding box fits within the
/// board, with no other constraint applied.
pub fn all_geometric_placements(shape_type: ShapeType) -> Vec<Battleship> {
    let mut out = Vec::new();
    for rotation in [Rotation::Vertical, Rotation::Horizontal] {
        let (w, h) = dimensions(shape_type, rotation);
        let max_x = WIDTH - w as i32;
        let max_y = HEIGHT - h as i32;
        if max_x < 0 || max_y < 0 {
            continue;
        }
        for y in 0..=max_y {
            for x in 0..=max_x {
                out.push(Battleship::new(shape_type, x, y, rotation));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helicarrier_placements_cover_both_rotations() {
        let placements = all_geometric_placements(ShapeType::Helicarrier);
        assert!(placements.iter().any(|b| b.rotation == Rotation::Vertical));
        assert!(placements.iter().any(|b| b.rotation == Rotation::Horizontal));
    }

    #[test]
    fn patrol_boat_placement_count_matches_board_coverage() {
        // Vertical: 12 cols * 11 rows, horizontal: 11 cols * 12 rows.
        let placements = all_geometric_placements(ShapeType::PatrolBoat);
        assert_eq!(placements.len(), 12 * 11 + 11 * 12);
    }
}
