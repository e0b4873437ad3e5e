//! The authoritative board: fleet placement, fire/avenger resolution, and
//! map-completion detection. This is the rules engine's core.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::geometry::{shape_of, Battleship, Cell, Rotation, ShapeType};
use crate::grid::{in_bounds, neighborhood_with_self, HEIGHT, WIDTH};
use crate::placement::all_geometric_placements;

/// Single-use power-up granted on full HELICARRIER discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Avenger {
    Thor,
    IronMan,
    Hulk,
}

/// One cell revealed as a side effect of an avenger, outside the base shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvengerResult {
    pub x: i32,
    pub y: i32,
    pub hit: bool,
}

/// Authoritative board state: placed fleet, discovery tracking, move count
/// and avenger flag.
#[derive(Debug, Clone)]
pub struct Board {
    pub id: u64,
    pub width: i32,
    pub height: i32,
    battleships: Vec<Battleship>,
    discovered: Vec<Vec<bool>>,
    grid: Vec<Vec<Option<usize>>>,
    pub move_count: u32,
    pub avenger_available: bool,
}

impl Board {
    pub fn empty(id: u64) -> Board {
        Board {
            id,
            width: WIDTH,
            height: HEIGHT,
            battleships: Vec::new(),
            discovered: vec![vec![false; HEIGHT as usize]; WIDTH as usize],
            grid: vec![vec![None; HEIGHT as usize]; WIDTH as usize],
            move_count: 0,
            avenger_available: false,
        }
    }

    pub fn battleships(&self) -> &[Battleship] {
        &self.battleships
    }

    pub fn is_discovered(&self, x: i32, y: i32) -> bool {
        self.discovered[x as usize][y as usize]
    }

    /// All candidate `(x, y, rotation)` placements of `shape_type` that fit
    /// against the ships already placed on this board.
    pub fn candidate_placements(&self, shape_type: ShapeType) -> Vec<Battleship> {
        all_geometric_placements(shape_type)
            .into_iter()
            .filter(|b| self.can_place(b))
            .collect()
    }

    /// Bounding box in bounds, and no cell of the nine-cell neighbourhood of
    /// any SHIP cell is already occupied by a placed battleship (the
    /// no-touch rule, applied including diagonals and self).
    pub fn can_place(&self, battleship: &Battleship) -> bool {
        let cells = battleship.cells();
        if cells.iter().any(|&(x, y)| !in_bounds(x, y)) {
            return false;
        }
        for &(x, y) in cells {
            for (nx, ny) in neighborhood_with_self(x, y) {
                if self.grid[nx as usize][ny as usize].is_some() {
                    return false;
                }
            }
        }
        true
    }

    pub fn place(&mut self, battleship: Battleship) {
        let idx = self.battleships.len();
        for &(x, y) in battleship.cells() {
            self.grid[x as usize][y as usize] = Some(idx);
        }
        self.battleships.push(battleship);
    }

    /// Random placement of the full fleet. Shapes are iterated in
    /// descending size order (never shuffled) so the HELICARRIER, hardest to
    /// fit, is placed first.
    pub fn place_random(id: u64, rng: &mut impl Rng) -> Board {
        let mut board = Board::empty(id);
        for &shape_type in &ShapeType::ALL_DESCENDING {
            let candidates = board.candidate_placements(shape_type);
            let chosen = candidates
                .choose(rng)
                .expect("the fixed fleet always has a valid placement on an empty 12x12 board")
                .clone();
            board.place(chosen);
        }
        board
    }

    fn cell_at(&self, x: i32, y: i32) -> Cell {
        if self.grid[x as usize][y as usize].is_some() {
            Cell::Ship
        } else {
            Cell::Water
        }
    }

    fn all_coords() -> impl Iterator<Item = (i32, i32)> {
        (0..WIDTH).flat_map(|x| (0..HEIGHT).map(move |y| (x, y)))
    }

    fn helicarrier_index(&self) -> Option<usize> {
        self.battleships
            .iter()
            .position(|b| b.shape_type == ShapeType::Helicarrier)
    }

    fn ship_fully_discovered(&self, idx: usize) -> bool {
        self.battleships[idx]
            .cells()
            .iter()
            .all(|&(x, y)| self.discovered[x as usize][y as usize])
    }

    fn helicarrier_fully_discovered(&self) -> bool {
        self.helicarrier_index()
            .map(|idx| self.ship_fully_discovered(idx))
            .unwrap_or(false)
    }

    /// Mark `(x, y)` discovered and bump `move_count`. Does not check
    /// bounds or prior-discovery; callers (`fire`/`fire_avenger`) enforce
    /// those invariants.
    fn discover_and_count(&mut self, x: i32, y: i32) {
        let helicarrier_was_done = self.helicarrier_fully_discovered();
        self.discovered[x as usize][y as usize] = true;
        self.move_count += 1;
        if !helicarrier_was_done && self.helicarrier_fully_discovered() {
            self.avenger_available = true;
        }
    }

    /// Fire at `(x, y)`. Repeat fires on an already-discovered cell return
    /// the revealed value without incrementing `move_count`.
    pub fn fire(&mut self, x: i32, y: i32) -> Result<Cell, GameError> {
        if !in_bounds(x, y) {
            return Err(GameError::OutOfBounds(x, y));
        }
        if !self.discovered[x as usize][y as usize] {
            self.discover_and_count(x, y);
        }
        Ok(self.cell_at(x, y))
    }

    /// Smallest (by cell count) non-destroyed battleship, ties broken by
    /// iteration order (first encountered).
    fn smallest_non_destroyed(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, ship) in self.battleships.iter().enumerate() {
            if self.ship_fully_discovered(idx) {
                continue;
            }
            let count = ship.cells().len();
            match best {
                None => best = Some((idx, count)),
                Some((_, best_count)) if count < best_count => best = Some((idx, count)),
                _ => {}
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Fire with an avenger spent on the same shot. Precondition:
    /// `avenger_available`. The avenger is consumed regardless of whether
    /// its effect ends up redundant.
    pub fn fire_avenger(
        &mut self,
        x: i32,
        y: i32,
        avenger: Avenger,
        rng: &mut impl Rng,
    ) -> Result<(Cell, Vec<AvengerResult>), GameError> {
        if !self.avenger_available {
            return Err(GameError::Engine("avenger not available".to_string()));
        }
        self.avenger_available = false;
        let base_cell = self.fire(x, y)?;

        let mut results = Vec::new();
        match avenger {
            Avenger::Thor => {
                let undiscovered: Vec<(i32, i32)> = Self::all_coords()
                    .filter(|&(cx, cy)| !self.discovered[cx as usize][cy as usize])
                    .collect();
                let sample_count = undiscovered.len().min(10);
                let sample: Vec<(i32, i32)> = undiscovered
                    .choose_multiple(rng, sample_count)
                    .copied()
                    .collect();
                for (cx, cy) in sample {
                    self.discovered[cx as usize][cy as usize] = true;
                    let hit = self.grid[cx as usize][cy as usize].is_some();
                    results.push(AvengerResult { x: cx, y: cy, hit });
                }
            }
            Avenger::IronMan => {
                if let Some(idx) = self.smallest_non_destroyed() {
                    let undiscovered_cells: Vec<(i32, i32)> = self.battleships[idx]
                        .cells()
                        .iter()
                        .copied()
                        .filter(|&(cx, cy)| !self.discovered[cx as usize][cy as usize])
                        .collect();
                    if let Some(&(hx, hy)) = undiscovered_cells.choose(rng) {
                        results.push(AvengerResult {
                            x: hx,
                            y: hy,
                            hit: true,
                        });
                    }
                }
            }
            Avenger::Hulk => {
                if let Some(idx) = self.grid[x as usize][y as usize] {
                    let cells: Vec<(i32, i32)> = self.battleships[idx].cells().to_vec();
                    for (cx, cy) in cells {
                        if !self.discovered[cx as usize][cy as usize] {
                            self.discovered[cx as usize][cy as usize] = true;
                        }
                        results.push(AvengerResult {
                            x: cx,
                            y: cy,
                            hit: true,
                        });
                    }
                }
            }
        }
        Ok((base_cell, results))
    }

    pub fn all_discovered(&self) -> bool {
        self.battleships
            .iter()
            .all(|b| b.cells().iter().all(|&(x, y)| self.discovered[x as usize][y as usize]))
    }

    /// Row-major 144-character server grid string: `'*'` undiscovered,
    /// `'X'` discovered ship, `'.'` discovered water. Index is `y*12+x`.
    pub fn server_grid_string(&self) -> String {
        let mut out = String::with_capacity((WIDTH * HEIGHT) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                out.push(if !self.discovered[x as usize][y as usize] {
                    '*'
                } else if self.grid[x as usize][y as usize].is_some() {
                    'X'
                } else {
                    '.'
                });
            }
        }
        out
    }

    pub fn to_persisted(&self) -> PersistedBoard {
        PersistedBoard {
            id: self.id,
            width: self.width,
            height: self.height,
            battleships: self
                .battleships
                .iter()
                .map(|b| PersistedBattleship {
                    shape: b.shape_type,
                    x: b.x,
                    y: b.y,
                    rotation: b.rotation,
                })
                .collect(),
            discovered: Self::all_coords()
                .filter(|&(x, y)| self.discovered[x as usize][y as usize])
                .collect(),
            move_count: self.move_count,
            avenger_available: self.avenger_available,
        }
    }

    pub fn from_persisted(persisted: PersistedBoard) -> Result<Board, GameError> {
        if persisted.width != WIDTH || persisted.height != HEIGHT {
            return Err(GameError::Data("unexpected board dimensions".to_string()));
        }
        if persisted.battleships.len() != ShapeType::ALL.len() {
            return Err(GameError::Data("wrong number of battleships".to_string()));
        }
        let mut board = Board::empty(persisted.id);
        for ps in persisted.battleships {
            let candidate = Battleship::new(ps.shape, ps.x, ps.y, ps.rotation);
            if !board.can_place(&candidate) {
                return Err(GameError::Data(
                    "persisted battleship placement is invalid".to_string(),
                ));
            }
            board.place(candidate);
        }
        for (x, y) in persisted.discovered {
            if !in_bounds(x, y) {
                return Err(GameError::Data("discovered cell out of bounds".to_string()));
            }
            board.discovered[x as usize][y as usize] = true;
        }
        board.move_count = persisted.move_count;
        board.avenger_available = persisted.avenger_available;
        let expected_moves = board
            .discovered
            .iter()
            .flatten()
            .filter(|&&d| d)
            .count() as u32;
        if expected_moves != board.move_count {
            return Err(GameError::Data(
                "move_count disagrees with discovered cells".to_string(),
            ));
        }
        Ok(board)
    }
}

/// Wire/persisted form of a single battleship, as found in the persisted
/// Board JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedBattleship {
    pub shape: ShapeType,
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
}

/// Persisted Board JSON, exactly the shape described in the external
/// interfaces contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedBoard {
    pub id: u64,
    pub width: i32,
    pub height: i32,
    pub battleships: Vec<PersistedBattleship>,
    pub discovered: Vec<(i32, i32)>,
    pub move_count: u32,
    pub avenger_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn placed_fleet_has_no_touching_ships() {
        let mut rng = seeded(1);
        for seed in 0..25 {
            rng = seeded(seed);
            let board = Board::place_random(seed, &mut rng);
            let ships = board.battleships();
            for i in 0..ships.len() {
                for j in (i + 1)..ships.len() {
                    for &(x1, y1) in ships[i].cells() {
                        for &(x2, y2) in ships[j].cells() {
                            let cheby = (x1 - x2).abs().max((y1 - y2).abs());
                            assert!(cheby >= 2, "ships {i} and {j} touch");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn placed_fleet_has_all_six_shapes_and_28_cells() {
        let mut rng = seeded(7);
        let board = Board::place_random(7, &mut rng);
        assert_eq!(board.battleships().len(), 6);
        let total: usize = board.battleships().iter().map(|b| b.cells().len()).sum();
        assert_eq!(total, 28);
        let mut seen: Vec<ShapeType> = board.battleships().iter().map(|b| b.shape_type).collect();
        seen.sort_by_key(|s| format!("{s:?}"));
        let mut expected: Vec<ShapeType> = ShapeType::ALL.to_vec();
        expected.sort_by_key(|s| format!("{s:?}"));
        assert_eq!(seen, expected);
    }

    #[test]
    fn move_count_tracks_discovered_cells() {
        let mut rng = seeded(3);
        let mut board = Board::place_random(3, &mut rng);
        board.fire(0, 0).unwrap();
        board.fire(0, 1).unwrap();
        board.fire(0, 0).unwrap(); // repeat, should not increment
        let discovered_count: u32 = Board::all_coords()
            .filter(|&(x, y)| board.is_discovered(x, y))
            .count() as u32;
        assert_eq!(board.move_count, discovered_count);
        assert_eq!(board.move_count, 2);
    }

    #[test]
    fn helicarrier_completion_grants_avenger_once() {
        let mut board = Board::empty(1);
        board.place(Battleship::new(ShapeType::Helicarrier, 0, 0, Rotation::Vertical));
        assert!(!board.avenger_available);
        let helicarrier_cells = shape_of(ShapeType::Helicarrier).cells.clone();
        for (i, &(rx, ry)) in helicarrier_cells.iter().enumerate() {
            board.fire(rx as i32, ry as i32).unwrap();
            if i + 1 < helicarrier_cells.len() {
                assert!(!board.avenger_available);
            }
        }
        assert!(board.avenger_available);
    }

    #[test]
    fn all_discovered_iff_every_ship_cell_discovered() {
        let mut board = Board::empty(1);
        board.place(Battleship::new(ShapeType::PatrolBoat, 0, 0, Rotation::Vertical));
        assert!(!board.all_discovered());
        board.fire(0, 0).unwrap();
        assert!(!board.all_discovered());
        board.fire(0, 1).unwrap();
        assert!(board.all_discovered());
    }

    #[test]
    fn repeat_fire_does_not_double_count() {
        let mut board = Board::empty(1);
        board.place(Battleship::new(ShapeType::Carrier, 3, 4, Rotation::Vertical));
        board.fire(3, 4).unwrap();
        let count_after_first = board.move_count;
        let result = board.fire(3, 4).unwrap();
        assert_eq!(board.move_count, count_after_first);
        assert_eq!(result, Cell::Ship);
    }

    #[test]
    fn persisted_round_trip_preserves_state() {
        let mut rng = seeded(42);
        let mut board = Board::place_random(42, &mut rng);
        board.fire(0, 0).unwrap();
        board.fire(6, 6).unwrap();
        let persisted = board.to_persisted();
        let restored = Board::from_persisted(persisted).unwrap();
        assert_eq!(restored.move_count, board.move_count);
        assert_eq!(restored.battleships().len(), board.battleships().len());
        for (a, b) in restored.battleships().iter().zip(board.battleships()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn hulk_reveals_whole_ship_in_one_move() {
        let mut rng = seeded(9);
        let mut board = Board::empty(1);
        board.place(Battleship::new(ShapeType::Carrier, 0, 0, Rotation::Vertical));
        board.place(Battleship::new(ShapeType::PatrolBoat, 3, 0, Rotation::Vertical));
        // Manually grant the avenger as if helicarrier had been placed and sunk.
        board.avenger_available = true;
        let before = board.move_count;
        let (_, results) = board
            .fire_avenger(0, 2, Avenger::Hulk, &mut rng)
            .unwrap();
        assert_eq!(board.move_count, before + 1);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.hit));
    }

    #[test]
    fn thor_reveals_ten_without_replacement() {
        let mut rng = seeded(11);
        let mut board = Board::place_random(11, &mut rng);
        board.avenger_available = true;
        let before = board.move_count;
        let (_, results) = board.fire_avenger(5, 5, Avenger::Thor, &mut rng).unwrap();
        assert_eq!(board.move_count, before + 1);
        assert_eq!(results.len(), 10);
        let mut coords: Vec<(i32, i32)> = results.iter().map(|r| (r.x, r.y)).collect();
        coords.sort();
        coords.dedup();
        assert_eq!(coords.len(), 10);
    }
}
