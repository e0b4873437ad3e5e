//! The bot-side Belief Map: what the bot has deduced about a board it
//! cannot see directly, kept in sync with truthful `FireResponse` snapshots.
//!
//! The inferred grid is monotone — a non-`UNKNOWN` cell never changes value
//! during a game. A server grid that contradicts it is a `Fatal` error: the
//! bot never recovers silently from a contradiction.

use std::collections::HashSet;

use crate::error::GameError;
use crate::geometry::{cell_count, gap_cells_at, Battleship, Cell, ShapeType};
use crate::grid::{neighborhood_with_self, HEIGHT, WIDTH};
use crate::placement::all_geometric_placements;

pub const HEATMAP_NO_VALUE: f64 = 0.0;
pub const HEATMAP_MAXIMUM_VALUE: f64 = 1.0e12;

#[derive(Debug, Clone)]
pub struct BeliefMap {
    inferred_grid: Vec<Vec<Cell>>,
    original_grid: Vec<Vec<Cell>>,
    confirmed: Vec<Vec<Option<usize>>>,
    confirmed_ships: Vec<Battleship>,
    possible_shapes: Vec<Vec<HashSet<ShapeType>>>,
    confirmed_shape: [bool; 6],
    heat: Vec<Vec<f64>>,
}

fn shape_slot(shape_type: ShapeType) -> usize {
    ShapeType::ALL
        .iter()
        .position(|s| *s == shape_type)
        .expect("ShapeType::ALL enumerates every shape")
}

impl BeliefMap {
    pub fn new() -> BeliefMap {
        let w = WIDTH as usize;
        let h = HEIGHT as usize;
        BeliefMap {
            inferred_grid: vec![vec![Cell::Unknown; h]; w],
            original_grid: vec![vec![Cell::Unknown; h]; w],
            confirmed: vec![vec![None; h]; w],
            confirmed_ships: Vec::new(),
            possible_shapes: vec![vec![HashSet::new(); h]; w],
            confirmed_shape: [false; 6],
            heat: vec![vec![HEATMAP_NO_VALUE; h]; w],
        }
    }

    pub fn inferred(&self, x: i32, y: i32) -> Cell {
        self.inferred_grid[x as usize][y as usize]
    }

    pub fn original(&self, x: i32, y: i32) -> Cell {
        self.original_grid[x as usize][y as usize]
    }

    pub fn heat_at(&self, x: i32, y: i32) -> f64 {
        self.heat[x as usize][y as usize]
    }

    pub fn set_heat(&mut self, x: i32, y: i32, value: f64) {
        self.heat[x as usize][y as usize] = value;
    }

    /// Demote an UNKNOWN cell to WATER because no valid fleet configuration
    /// covers it (zero heat after synthesis). A no-op on any other cell.
    pub fn demote_unreachable_to_water(&mut self, x: i32, y: i32) {
        if self.inferred_grid[x as usize][y as usize] == Cell::Unknown {
            self.inferred_grid[x as usize][y as usize] = Cell::Water;
            self.heat[x as usize][y as usize] = HEATMAP_NO_VALUE;
        }
    }

    pub fn confirmed_ship_at(&self, x: i32, y: i32) -> Option<&Battleship> {
        self.confirmed[x as usize][y as usize].map(|idx| &self.confirmed_ships[idx])
    }

    pub fn confirmed_ships(&self) -> &[Battleship] {
        &self.confirmed_ships
    }

    pub fn is_confirmed(&self, shape_type: ShapeType) -> bool {
        self.confirmed_shape[shape_slot(shape_type)]
    }

    pub fn unconfirmed_shapes(&self) -> Vec<ShapeType> {
        ShapeType::ALL
            .iter()
            .copied()
            .filter(|s| !self.is_confirmed(*s))
            .collect()
    }

    pub fn possible_shapes_at(&self, x: i32, y: i32) -> &HashSet<ShapeType> {
        &self.possible_shapes[x as usize][y as usize]
    }

    pub fn set_possible_shapes(&mut self, x: i32, y: i32, shapes: HashSet<ShapeType>) {
        self.possible_shapes[x as usize][y as usize] = shapes;
    }

    pub fn all_coords() -> impl Iterator<Item = (i32, i32)> {
        (0..WIDTH).flat_map(|x| (0..HEIGHT).map(move |y| (x, y)))
    }

    /// All placements of `shape_type` consistent with the current belief:
    /// fits in bounds (guaranteed by the raw generator), its SHIP cells
    /// don't overlap inferred WATER or a `possible_shapes` restriction that
    /// excludes this shape, its own non-SHIP bounding-box cells (gaps)
    /// don't overlap an inferred SHIP cell, and the no-touch rule holds
    /// against other inferred SHIP cells outside this very placement.
    pub fn candidate_placements_for(&self, shape_type: ShapeType) -> Vec<Battleship> {
        all_geometric_placements(shape_type)
            .into_iter()
            .filter(|b| self.is_compatible(b))
            .collect()
    }

    fn is_compatible(&self, battleship: &Battleship) -> bool {
        let own_cells: HashSet<(i32, i32)> = battleship.cells().iter().copied().collect();

        for &(x, y) in &own_cells {
            if self.inferred_grid[x as usize][y as usize] == Cell::Water {
                return false;
            }
            let possible = &self.possible_shapes[x as usize][y as usize];
            if !possible.is_empty() && !possible.contains(&battleship.shape_type) {
                return false;
            }
        }

        for (gx, gy) in gap_cells_at(battleship.shape_type, battleship.x, battleship.y, battleship.rotation) {
            if self.inferred_grid[gx as usize][gy as usize] == Cell::Ship {
                return false;
            }
        }

        for &(x, y) in &own_cells {
            for (nx, ny) in neighborhood_with_self(x, y) {
                if own_cells.contains(&(nx, ny)) {
                    continue;
                }
                if self.inferred_grid[nx as usize][ny as usize] == Cell::Ship {
                    return false;
                }
            }
        }

        true
    }

    /// Confirm a battleship's identity and exact placement: stamp
    /// `confirmed`/`possible_shapes`/`heat` for its cells, then set every
    /// UNKNOWN neighbour of those cells to WATER (safe, since no ship
    /// touches another).
    pub fn confirm(&mut self, battleship: Battleship) -> Result<(), GameError> {
        if self.is_confirmed(battleship.shape_type) {
            return Err(GameError::Fatal(format!(
                "shape {:?} confirmed twice",
                battleship.shape_type
            )));
        }
        self.confirmed_shape[shape_slot(battleship.shape_type)] = true;
        let idx = self.confirmed_ships.len();

        for &(x, y) in battleship.cells() {
            if self.inferred_grid[x as usize][y as usize] == Cell::Water {
                return Err(GameError::Fatal(format!(
                    "confirming {:?} at a cell already known WATER",
                    battleship.shape_type
                )));
            }
            self.inferred_grid[x as usize][y as usize] = Cell::Ship;
            self.confirmed[x as usize][y as usize] = Some(idx);
            self.possible_shapes[x as usize][y as usize] =
                std::iter::once(battleship.shape_type).collect();
            self.heat[x as usize][y as usize] = HEATMAP_MAXIMUM_VALUE;
        }

        for &(x, y) in battleship.cells() {
            for (nx, ny) in neighborhood_with_self(x, y) {
                if self.inferred_grid[nx as usize][ny as usize] == Cell::Unknown {
                    self.inferred_grid[nx as usize][ny as usize] = Cell::Water;
                    self.heat[nx as usize][ny as usize] = HEATMAP_NO_VALUE;
                }
            }
        }

        self.confirmed_ships.push(battleship);
        Ok(())
    }

    /// Refresh from a truthful `FireResponse` server grid (144 chars,
    /// row-major, index `y*12+x`). Any disagreement with an already-known
    /// inferred cell is `Fatal`.
    pub fn update_from_server_grid(&mut self, server_grid: &str) -> Result<(), GameError> {
        let chars: Vec<char> = server_grid.chars().collect();
        if chars.len() != (WIDTH * HEIGHT) as usize {
            return Err(GameError::Data(format!(
                "server grid has {} characters, expected {}",
                chars.len(),
                WIDTH * HEIGHT
            )));
        }
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let idx = (y * WIDTH + x) as usize;
                let cell = match chars[idx] {
                    '*' => Cell::Unknown,
                    'X' => Cell::Ship,
                    '.' => Cell::Water,
                    other => {
                        return Err(GameError::Data(format!(
                            "unexpected grid character '{other}' at ({x},{y})"
                        )))
                    }
                };
                self.original_grid[x as usize][y as usize] = cell;
                if cell == Cell::Unknown {
                    continue;
                }
                let existing = self.inferred_grid[x as usize][y as usize];
                if existing != Cell::Unknown && existing != cell {
                    return Err(GameError::Fatal(format!(
                        "monotonicity violation at ({x},{y}): inferred {existing:?}, server says {cell:?}"
                    )));
                }
                if existing == Cell::Unknown {
                    self.inferred_grid[x as usize][y as usize] = cell;
                    self.heat[x as usize][y as usize] = match cell {
                        Cell::Ship => HEATMAP_MAXIMUM_VALUE,
                        _ => HEATMAP_NO_VALUE,
                    };
                }
            }
        }
        Ok(())
    }

    /// When a response just granted the avenger (full HELICARRIER
    /// discovery) mark its four interior gap cells WATER, if not already.
    /// The no-touch rule plus the fully-discovered outline force this; it
    /// is normally redundant with `confirm`'s neighbour sweep but may run
    /// a tick earlier than the constraint propagator.
    pub fn reconcile_helicarrier_gaps_on_avenger_grant(&mut self) -> Result<(), GameError> {
        if self.is_confirmed(ShapeType::Helicarrier) {
            return Ok(());
        }
        let candidates: Vec<Battleship> = all_geometric_placements(ShapeType::Helicarrier)
            .into_iter()
            .filter(|b| {
                b.cells()
                    .iter()
                    .all(|&(x, y)| self.inferred_grid[x as usize][y as usize] == Cell::Ship)
            })
            .collect();
        if candidates.len() == 1 {
            self.confirm(candidates.into_iter().next().unwrap())?;
        }
        Ok(())
    }

    /// Apply an IRON_MAN hint: the given cell belongs to the smallest
    /// non-destroyed ship, without revealing its server-side cell.
    pub fn apply_iron_man_hint(&mut self, x: i32, y: i32) -> Result<(), GameError> {
        if self.inferred_grid[x as usize][y as usize] == Cell::Water {
            return Err(GameError::Fatal(
                "iron man hint contradicts a known water cell".to_string(),
            ));
        }
        self.inferred_grid[x as usize][y as usize] = Cell::Ship;
        self.heat[x as usize][y as usize] = HEATMAP_MAXIMUM_VALUE;

        let smallest_unconfirmed_count = self
            .unconfirmed_shapes()
            .iter()
            .map(|s| cell_count(*s))
            .min();

        if let Some(max_count) = smallest_unconfirmed_count {
            let restricted: HashSet<ShapeType> = self
                .unconfirmed_shapes()
                .into_iter()
                .filter(|s| cell_count(*s) <= max_count)
                .collect();
            self.possible_shapes[x as usize][y as usize] = restricted.clone();
            self.reproject_possible_shapes(&restricted);
        }
        Ok(())
    }

    /// Any cell not reachable by any candidate placement of a shape in
    /// `restricted` is excluded from that shape in that cell's
    /// `possible_shapes` set.
    fn reproject_possible_shapes(&mut self, restricted: &HashSet<ShapeType>) {
        let mut reachable: Vec<Vec<HashSet<ShapeType>>> =
            vec![vec![HashSet::new(); HEIGHT as usize]; WIDTH as usize];
        for &shape_type in restricted {
            for placement in self.candidate_placements_for(shape_type) {
                for &(x, y) in placement.cells() {
                    reachable[x as usize][y as usize].insert(shape_type);
                }
            }
        }
        for (x, y) in Self::all_coords() {
            let current = &mut self.possible_shapes[x as usize][y as usize];
            if current.is_empty() {
                continue;
            }
            let reach = &reachable[x as usize][y as usize];
            current.retain(|s| !restricted.contains(s) || reach.contains(s));
        }
    }
}

impl Default for BeliefMap {
    fn default() -> Self {
        BeliefMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;

    fn all_unknown_grid() -> String {
        "*".repeat((WIDTH * HEIGHT) as usize)
    }

    #[test]
    fn fresh_belief_is_all_unknown() {
        let belief = BeliefMap::new();
        for (x, y) in BeliefMap::all_coords() {
            assert_eq!(belief.inferred(x, y), Cell::Unknown);
        }
    }

    #[test]
    fn monotonicity_violation_is_fatal() {
        let mut belief = BeliefMap::new();
        let mut grid = all_unknown_grid().chars().collect::<Vec<_>>();
        grid[0] = 'X';
        belief
            .update_from_server_grid(&grid.iter().collect::<String>())
            .unwrap();

        let mut contradicting = all_unknown_grid().chars().collect::<Vec<_>>();
        contradicting[0] = '.';
        let result = belief.update_from_server_grid(&contradicting.iter().collect::<String>());
        assert!(matches!(result, Err(GameError::Fatal(_))));
    }

    #[test]
    fn repeated_truthful_update_is_idempotent() {
        let mut belief = BeliefMap::new();
        let mut grid = all_unknown_grid().chars().collect::<Vec<_>>();
        grid[5] = 'X';
        let grid_str: String = grid.iter().collect();
        belief.update_from_server_grid(&grid_str).unwrap();
        belief.update_from_server_grid(&grid_str).unwrap();
        assert_eq!(belief.inferred(5, 0), Cell::Ship);
    }

    #[test]
    fn confirming_sets_neighbours_to_water() {
        let mut belief = BeliefMap::new();
        let ship = Battleship::new(ShapeType::PatrolBoat, 5, 5, Rotation::Vertical);
        for &(x, y) in ship.cells() {
            belief.inferred_grid[x as usize][y as usize] = Cell::Ship;
        }
        belief.confirm(ship).unwrap();
        assert_eq!(belief.inferred(4, 4), Cell::Water);
        assert_eq!(belief.inferred(6, 7), Cell::Water);
        assert!(belief.is_confirmed(ShapeType::PatrolBoat));
    }

    #[test]
    fn helicarrier_gap_cells_become_water_once_outline_known() {
        let mut belief = BeliefMap::new();
        let ship = Battleship::new(ShapeType::Helicarrier, 0, 0, Rotation::Vertical);
        for &(x, y) in ship.cells() {
            belief.inferred_grid[x as usize][y as usize] = Cell::Ship;
        }
        belief.reconcile_helicarrier_gaps_on_avenger_grant().unwrap();
        assert!(belief.is_confirmed(ShapeType::Helicarrier));
        for (gx, gy) in gap_cells_at(ShapeType::Helicarrier, 0, 0, Rotation::Vertical) {
            assert_eq!(belief.inferred(gx, gy), Cell::Water);
        }
    }
}
