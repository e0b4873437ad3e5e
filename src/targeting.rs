//! Targeting Policy: turns an `EnumerationResult` into a heat-map, then
//! picks the next shot and decides whether (and how) to spend an avenger.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::belief::{BeliefMap, HEATMAP_MAXIMUM_VALUE, HEATMAP_NO_VALUE};
use crate::bias::{cell_bias, shape_bias, EDGE_BIAS_LEFT_HORIZONTAL, EDGE_BIAS_TOP_VERTICAL};
use crate::board::Avenger;
use crate::enumerate::{CandidatePlacement, EnumerationResult};
use crate::geometry::{cell_count, Cell, Rotation, ShapeType};

/// A battleship's cell count from which it counts as "large" for the HULK
/// heuristic: worth spending a whole avenger finishing off in one shot.
const LARGE_SHIP_CELL_THRESHOLD: usize = 4;

/// Bot considers itself early-game (few discovered cells) below this
/// count, favouring a THOR broadcast-reveal over localizing a ship.
const EARLY_GAME_DISCOVERED_THRESHOLD: usize = 20;

/// Recompute every UNKNOWN cell's heat from an enumeration pass, per §4.9.
/// Cells already revealed by the server are left untouched; inferred-SHIP
/// cells are pinned to the sentinel maximum; everything else gets
/// `cellWeight * 1000 / validConfigurations * cellBias`. A zero-heat
/// UNKNOWN cell afterward is demoted to WATER: nothing in the fleet could
/// possibly occupy it.
pub fn synthesize_heatmap(
    belief: &mut BeliefMap,
    by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>,
    result: &EnumerationResult,
) {
    let mut cell_weight = vec![vec![0.0_f64; 12]; 12];

    for (&shape_type, candidates) in by_shape {
        for candidate in candidates {
            let mut weight = result.frequency_of(candidate) as f64;
            if weight == 0.0 {
                continue;
            }
            if candidate.target_mode {
                weight *= 100.0;
            }
            let b = &candidate.battleship;
            let edge_multiplier = if b.x == 0 && b.y != 0 && b.rotation == Rotation::Horizontal {
                EDGE_BIAS_LEFT_HORIZONTAL
            } else if b.x != 0 && b.y == 0 && b.rotation == Rotation::Vertical {
                EDGE_BIAS_TOP_VERTICAL
            } else {
                1.0
            };
            weight *= edge_multiplier;

            for &(x, y) in b.cells() {
                weight *= shape_bias(shape_type, x, y);
                cell_weight[x as usize][y as usize] += weight;
            }
        }
    }

    let valid = result.valid_configurations.max(1) as f64;

    for x in 0..12 {
        for y in 0..12 {
            if belief.original(x, y) != Cell::Unknown {
                continue;
            }
            if belief.inferred(x, y) == Cell::Ship {
                belief.set_heat(x, y, HEATMAP_MAXIMUM_VALUE);
                continue;
            }
            let raw = cell_weight[x as usize][y as usize];
            let heat = raw * 1000.0 / valid * cell_bias(x, y);
            belief.set_heat(x, y, heat);
        }
    }

    for x in 0..12 {
        for y in 0..12 {
            if belief.inferred(x, y) == Cell::Unknown && belief.heat_at(x, y) == HEATMAP_NO_VALUE {
                belief.demote_unreachable_to_water(x, y);
            }
        }
    }
}

/// Break ties among max-heat cells by distance to board centre instead of
/// uniformly at random.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    Random,
    CenterBias,
}

/// Highest-heat unfired cell(s): anything the server hasn't revealed yet
/// and the bot hasn't deduced to be water. This includes cells the
/// propagator has already confirmed SHIP via deduction alone (§3: those
/// carry sentinel `HEATMAP_MAXIMUM_VALUE` precisely so they're shot next) —
/// filtering on `original`, not `inferred`, is what lets the bot actually
/// fire the cells a confirmed-but-unfired ship still needs. `None` only
/// when every cell has been resolved (fatal — the game is exhausted with
/// shots still owed).
pub fn next_shot(belief: &BeliefMap, tie_break: TieBreak, rng: &mut impl Rng) -> Option<(i32, i32)> {
    let mut best_heat = f64::MIN;
    let mut best: Vec<(i32, i32)> = Vec::new();
    for x in 0..12 {
        for y in 0..12 {
            if belief.original(x, y) != Cell::Unknown || belief.inferred(x, y) == Cell::Water {
                continue;
            }
            let heat = belief.heat_at(x, y);
            if heat > best_heat {
                best_heat = heat;
                best = vec![(x, y)];
            } else if heat == best_heat {
                best.push((x, y));
            }
        }
    }
    if best.is_empty() {
        return None;
    }
    match tie_break {
        TieBreak::Random => best.choose(rng).copied(),
        TieBreak::CenterBias => {
            let dist = |&(x, y): &(i32, i32)| {
                let dx = x as f64 - 5.5;
                let dy = y as f64 - 5.5;
                (dx * dx + dy * dy).sqrt()
            };
            let min_dist = best.iter().map(dist).fold(f64::MAX, f64::min);
            let closest: Vec<(i32, i32)> = best
                .into_iter()
                .filter(|c| (dist(c) - min_dist).abs() < 1e-9)
                .collect();
            closest.choose(rng).copied()
        }
    }
}

/// Whether the belief is currently "in target mode": at least one
/// candidate placement of an unconfirmed shape covers an already-hit
/// (inferred-SHIP) cell, i.e. there's a wounded ship worth finishing.
pub fn target_mode_engaged(by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>) -> bool {
    by_shape
        .values()
        .any(|candidates| candidates.iter().any(|c| c.target_mode))
}

/// The largest unconfirmed shape type with at least one candidate
/// placement currently in target mode, if any — the "wounded ship" the
/// HULK heuristic would try to finish.
fn largest_wounded_shape(by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>) -> Option<ShapeType> {
    by_shape
        .iter()
        .filter(|(_, candidates)| candidates.iter().any(|c| c.target_mode))
        .map(|(&shape, _)| shape)
        .max_by_key(|&s| cell_count(s))
}

fn discovered_cell_count(belief: &BeliefMap) -> usize {
    BeliefMap::all_coords()
        .filter(|&(x, y)| belief.original(x, y) != Cell::Unknown)
        .count()
}

/// Decide whether (and which) avenger to spend on the next shot. Callers
/// only invoke this when `avenger_available`; a `None` result means "fire
/// normally, save the avenger for later" — never returned here, since the
/// avenger is consumed the instant it's available and there's no benefit
/// to holding it (it doesn't carry over board-to-board).
pub fn choose_avenger(belief: &BeliefMap, by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>) -> Avenger {
    if let Some(wounded) = largest_wounded_shape(by_shape) {
        if cell_count(wounded) >= LARGE_SHIP_CELL_THRESHOLD {
            return Avenger::Hulk;
        }
    }
    if !target_mode_engaged(by_shape) && discovered_cell_count(belief) < EARLY_GAME_DISCOVERED_THRESHOLD {
        return Avenger::Thor;
    }
    Avenger::IronMan
}
