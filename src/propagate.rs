//! Constraint Propagator: deduces confirmed ships and forced water cells
//! from the current belief, iterating to a fixpoint.

use std::collections::{HashMap, HashSet};

use crate::belief::BeliefMap;
use crate::error::GameError;
use crate::geometry::{cell_count, Battleship, Cell, ShapeType};
use crate::grid::{HEIGHT, WIDTH};

/// Run deduction passes until no new ship gets confirmed in a full pass.
pub fn propagate_to_fixpoint(belief: &mut BeliefMap) -> Result<(), GameError> {
    loop {
        if !run_one_pass(belief)? {
            break;
        }
    }
    Ok(())
}

/// A deduced confirmation, tagged by how sure the unique-shape rule was.
enum Deduction {
    /// Shape type was pinned down unambiguously (single valid type, or the
    /// SUBMARINE/DESTROYER pair with exactly one of the two unconfirmed).
    Definite(Battleship),
    /// SUBMARINE and DESTROYER share geometry and both were still
    /// unconfirmed at this cell; since the two are functionally
    /// interchangeable, a deterministic tie-break (prefer DESTROYER) is
    /// used rather than failing the whole game on a cosmetic ambiguity.
    /// See DESIGN.md.
    AmbiguousPair(Battleship),
}

/// Scans every unconfirmed SHIP cell once. Prefers applying any `Definite`
/// deduction found anywhere in the sweep; only falls back to an
/// `AmbiguousPair` tie-break if the sweep found no `Definite` deduction at
/// all. Returns whether a ship was confirmed.
fn run_one_pass(belief: &mut BeliefMap) -> Result<bool, GameError> {
    let mut first_definite: Option<Battleship> = None;
    let mut first_ambiguous: Option<Battleship> = None;

    'scan: for x in 0..WIDTH {
        for y in 0..HEIGHT {
            if belief.inferred(x, y) != Cell::Ship {
                continue;
            }
            if belief.confirmed_ship_at(x, y).is_some() {
                continue;
            }

            match deduce_confirmation_at(belief, x, y) {
                Some(Deduction::Definite(placement)) => {
                    first_definite = Some(placement);
                    break 'scan;
                }
                Some(Deduction::AmbiguousPair(placement)) => {
                    if first_ambiguous.is_none() {
                        first_ambiguous = Some(placement);
                    }
                }
                None => {}
            }
        }
    }

    let chosen = first_definite.or(first_ambiguous);
    match chosen {
        Some(placement) => {
            belief.confirm(placement)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn deduce_confirmation_at(belief: &BeliefMap, x: i32, y: i32) -> Option<Deduction> {
    let possible = belief.possible_shapes_at(x, y);
    let candidate_shapes: Vec<ShapeType> = if !possible.is_empty() {
        possible.iter().copied().collect()
    } else {
        belief.unconfirmed_shapes()
    };

    let mut valid: Vec<ShapeType> = Vec::new();
    let mut placements_by_shape: HashMap<ShapeType, Vec<Battleship>> = HashMap::new();
    for &shape in &candidate_shapes {
        let placements: Vec<Battleship> = belief
            .candidate_placements_for(shape)
            .into_iter()
            .filter(|b| b.cells().contains(&(x, y)))
            .collect();
        if !placements.is_empty() {
            valid.push(shape);
            placements_by_shape.insert(shape, placements);
        }
    }

    // Unique-shape rule: a single candidate shape type, or the
    // SUBMARINE/DESTROYER pair (which share geometry).
    if valid.len() == 1 {
        if let Some(placements) = placements_by_shape.get(&valid[0]) {
            if placements.len() == 1 {
                return Some(Deduction::Definite(placements[0].clone()));
            }
        }
        return None;
    }

    if valid.len() == 2 {
        let set: HashSet<ShapeType> = valid.iter().copied().collect();
        let is_sub_destroyer_pair = set.contains(&ShapeType::Submarine)
            && set.contains(&ShapeType::Destroyer)
            && set.len() == 2;
        if is_sub_destroyer_pair {
            let unconfirmed: Vec<ShapeType> = valid
                .iter()
                .copied()
                .filter(|s| !belief.is_confirmed(*s))
                .collect();
            let (chosen_shape, definite) = match unconfirmed.len() {
                1 => (Some(unconfirmed[0]), true),
                // Both still unconfirmed: interchangeable, so pick
                // DESTROYER deterministically rather than failing.
                2 => (Some(ShapeType::Destroyer), false),
                _ => (None, false),
            };
            if let Some(shape) = chosen_shape {
                if let Some(placements) = placements_by_shape.get(&shape) {
                    if placements.len() == 1 {
                        let placement = placements[0].clone();
                        return if definite {
                            Some(Deduction::Definite(placement))
                        } else {
                            Some(Deduction::AmbiguousPair(placement))
                        };
                    }
                }
            }
            return None;
        }
    }

    // Unique-unknown-free rule: the largest unconfirmed shape has exactly
    // one placement covering this cell whose SHIP cells are all already
    // inferred SHIP (no UNKNOWN overlay).
    if let Some(largest) = belief
        .unconfirmed_shapes()
        .into_iter()
        .max_by_key(|s| cell_count(*s))
    {
        let fully_known: Vec<Battleship> = belief
            .candidate_placements_for(largest)
            .into_iter()
            .filter(|b| b.cells().contains(&(x, y)))
            .filter(|b| {
                b.cells()
                    .iter()
                    .all(|&(cx, cy)| belief.inferred(cx, cy) == Cell::Ship)
            })
            .collect();
        if fully_known.len() == 1 {
            return Some(Deduction::Definite(fully_known.into_iter().next().unwrap()));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;

    fn grid_string(ship_cells: &HashSet<(i32, i32)>) -> String {
        (0..HEIGHT)
            .flat_map(|y| {
                (0..WIDTH).map(move |x| if ship_cells.contains(&(x, y)) { 'X' } else { '.' })
            })
            .collect()
    }

    #[test]
    fn fully_revealed_patrol_boat_gets_confirmed() {
        let mut belief = BeliefMap::new();
        let ship = Battleship::new(ShapeType::PatrolBoat, 0, 0, Rotation::Vertical);
        let cells: HashSet<(i32, i32)> = ship.cells().iter().copied().collect();
        belief.update_from_server_grid(&grid_string(&cells)).unwrap();
        propagate_to_fixpoint(&mut belief).unwrap();
        assert!(belief.is_confirmed(ShapeType::PatrolBoat));
    }

    #[test]
    fn confirmation_matches_real_placement_by_cells() {
        use crate::board::Board;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        for seed in 0..15u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let board = Board::place_random(seed, &mut rng);

            let mut belief = BeliefMap::new();
            let mut all_ship_cells: HashSet<(i32, i32)> = HashSet::new();
            for ship in board.battleships() {
                all_ship_cells.extend(ship.cells().iter().copied());
            }
            belief
                .update_from_server_grid(&grid_string(&all_ship_cells))
                .unwrap();
            propagate_to_fixpoint(&mut belief).unwrap();

            // Every real ship's cell set appears among the confirmed
            // placements. SUBMARINE and DESTROYER share geometry, so the
            // confirmed *shape label* for that pair may be swapped; only
            // the cell sets are asserted.
            let confirmed_cell_sets: Vec<Vec<(i32, i32)>> = belief
                .confirmed_ships()
                .iter()
                .map(|b| {
                    let mut cells = b.cells().to_vec();
                    cells.sort();
                    cells
                })
                .collect();
            for ship in board.battleships() {
                let mut expected = ship.cells().to_vec();
                expected.sort();
                assert!(
                    confirmed_cell_sets.contains(&expected),
                    "seed {seed}: ship {:?} at {expected:?} was never confirmed",
                    ship.shape_type
                );
            }
        }
    }
}
