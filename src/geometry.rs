//! Ship shapes, rotations, and cell enumeration.
//!
//! Canonical shapes are defined in their `VERTICAL` orientation; `HORIZONTAL`
//! is obtained by transposing the grid (swapping the x/y axes), per spec.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One cell on a board, from the authoritative rules engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Water,
    Ship,
    Unknown,
}

/// Ship facing. Horizontal rotation swaps the coordinate axes for both shape
/// dimensions and cell lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Vertical,
    Horizontal,
}

/// The six fixed ship shapes in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Helicarrier,
    Carrier,
    Battleship,
    Destroyer,
    Submarine,
    PatrolBoat,
}

impl ShapeType {
    /// All six shapes, in descending size order. Placement must iterate in
    /// this order without shuffling: the helicarrier is hardest to fit and
    /// must be placed first.
    pub const ALL_DESCENDING: [ShapeType; 6] = [
        ShapeType::Helicarrier,
        ShapeType::Carrier,
        ShapeType::Battleship,
        ShapeType::Destroyer,
        ShapeType::Submarine,
        ShapeType::PatrolBoat,
    ];

    pub const ALL: [ShapeType; 6] = Self::ALL_DESCENDING;

    fn index(self) -> usize {
        match self {
            ShapeType::Helicarrier => 0,
            ShapeType::Carrier => 1,
            ShapeType::Battleship => 2,
            ShapeType::Destroyer => 3,
            ShapeType::Submarine => 4,
            ShapeType::PatrolBoat => 5,
        }
    }
}

/// Immutable description of a ship's canonical (vertical) footprint.
///
/// `cells` lists the relative (x, y) coordinates occupied in the
/// `VERTICAL` orientation, within a `width x height` bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub shape_type: ShapeType,
    pub width: u8,
    pub height: u8,
    pub cells: Vec<(i8, i8)>,
}

impl Shape {
    fn from_rows(shape_type: ShapeType, rows: &[&str]) -> Self {
        let height = rows.len() as u8;
        let width = rows[0].len() as u8;
        let mut cells = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == 'X' {
                    cells.push((x as i8, y as i8));
                }
            }
        }
        Shape {
            shape_type,
            width,
            height,
            cells,
        }
    }

    /// Occupied-cell count, identical regardless of rotation.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Process-wide, interned-by-`ShapeType` table of canonical shapes.
///
/// `HELICARRIER`'s row diagram resolves an inconsistency in the
/// specification's prose between the literal ASCII rows given and the stated
/// 11-cell / 28-total-cell invariant; see DESIGN.md.
static SHAPE_TABLE: Lazy<[Shape; 6]> = Lazy::new(|| {
    [
        Shape::from_rows(
            ShapeType::Helicarrier,
            &["XXX", ".X.", "XXX", ".X.", "XXX"],
        ),
        Shape::from_rows(ShapeType::Carrier, &["X", "X", "X", "X", "X"]),
        Shape::from_rows(ShapeType::Battleship, &["X", "X", "X", "X"]),
        Shape::from_rows(ShapeType::Destroyer, &["X", "X", "X"]),
        Shape::from_rows(ShapeType::Submarine, &["X", "X", "X"]),
        Shape::from_rows(ShapeType::PatrolBoat, &["X", "X"]),
    ]
});

/// Look up the interned canonical shape for a given type.
pub fn shape_of(shape_type: ShapeType) -> &'static Shape {
    &SHAPE_TABLE[shape_type.index()]
}

/// Number of SHIP cells a shape occupies, regardless of rotation.
pub fn cell_count(shape_type: ShapeType) -> usize {
    shape_of(shape_type).cell_count()
}

/// The cells of a placement's bounding box that are *not* SHIP cells (e.g.
/// the HELICARRIER's four interior notches). Empty for the five solid
/// 1-wide shapes.
pub fn gap_cells_at(shape_type: ShapeType, x: i32, y: i32, rotation: Rotation) -> Vec<(i32, i32)> {
    use std::collections::HashSet;
    let (w, h) = dimensions(shape_type, rotation);
    let ship_cells: HashSet<(i32, i32)> = ship_cells_at(shape_type, x, y, rotation).into_iter().collect();
    let mut gaps = Vec::new();
    for dy in 0..h as i32 {
        for dx in 0..w as i32 {
            let cell = (x + dx, y + dy);
            if !ship_cells.contains(&cell) {
                gaps.push(cell);
            }
        }
    }
    gaps
}

/// A ship placed (or candidate for placement) at a given origin and
/// rotation, with precomputed absolute occupied coordinates.
///
/// Equality is structural on `(shape_type, x, y, rotation)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battleship {
    pub shape_type: ShapeType,
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
    occupied: Vec<(i32, i32)>,
}

impl Battleship {
    pub fn new(shape_type: ShapeType, x: i32, y: i32, rotation: Rotation) -> Self {
        let occupied = ship_cells_at(shape_type, x, y, rotation);
        Battleship {
            shape_type,
            x,
            y,
            rotation,
            occupied,
        }
    }

    /// Absolute occupied coordinates of this placement.
    pub fn cells(&self) -> &[(i32, i32)] {
        &self.occupied
    }

    /// Width/height of this placement's bounding box, axis-swapped on
    /// `HORIZONTAL`.
    pub fn dimensions(&self) -> (u8, u8) {
        dimensions(self.shape_type, self.rotation)
    }
}

/// Width/height of a shape's bounding box for a given rotation; width and
/// height swap on `HORIZONTAL`.
pub fn dimensions(shape_type: ShapeType, rotation: Rotation) -> (u8, u8) {
    let shape = shape_of(shape_type);
    match rotation {
        Rotation::Vertical => (shape.width, shape.height),
        Rotation::Horizontal => (shape.height, shape.width),
    }
}

/// Absolute occupied cells for a battleship at `(x, y)` with the given
/// rotation, applying rotation by axis swap of the canonical shape.
pub fn ship_cells_at(
    shape_type: ShapeType,
    x: i32,
    y: i32,
    rotation: Rotation,
) -> Vec<(i32, i32)> {
    let shape = shape_of(shape_type);
    shape
        .cells
        .iter()
        .map(|&(rx, ry)| match rotation {
            Rotation::Vertical => (x + rx as i32, y + ry as i32),
            Rotation::Horizontal => (x + ry as i32, y + rx as i32),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helicarrier_has_eleven_cells() {
        assert_eq!(shape_of(ShapeType::Helicarrier).cell_count(), 11);
    }

    #[test]
    fn fleet_totals_twenty_eight_cells() {
        let total: usize = ShapeType::ALL.iter().map(|s| shape_of(*s).cell_count()).sum();
        assert_eq!(total, 28);
    }

    #[test]
    fn helicarrier_dimensions_swap_on_rotation() {
        assert_eq!(dimensions(ShapeType::Helicarrier, Rotation::Vertical), (3, 5));
        assert_eq!(
            dimensions(ShapeType::Helicarrier, Rotation::Horizontal),
            (5, 3)
        );
    }

    #[test]
    fn ship_cells_axis_swap_matches_canonical_with_transpose() {
        for &shape_type in &ShapeType::ALL {
            let vertical = ship_cells_at(shape_type, 0, 0, Rotation::Vertical);
            let horizontal = ship_cells_at(shape_type, 0, 0, Rotation::Horizontal);
            let mut transposed: Vec<(i32, i32)> =
                vertical.iter().map(|&(x, y)| (y, x)).collect();
            transposed.sort();
            let mut horizontal_sorted = horizontal.clone();
            horizontal_sorted.sort();
            assert_eq!(transposed, horizontal_sorted);
        }
    }

    #[test]
    fn submarine_and_destroyer_share_geometry() {
        let d = ship_cells_at(ShapeType::Destroyer, 0, 0, Rotation::Vertical);
        let s = ship_cells_at(ShapeType::Submarine, 0, 0, Rotation::Vertical);
        assert_eq!(d, s);
    }
}
