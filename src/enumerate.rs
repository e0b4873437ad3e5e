//! Configuration Enumerator: for each unconfirmed shape, computes its
//! candidate placements against the current belief, then either
//! exhaustively backtracks or Monte-Carlo samples the space of mutually
//! compatible fleet configurations to build a per-placement frequency
//! table. `targeting` turns that frequency table into the heat-map.
//!
//! The incompatibility precomputation (§4.9) is a process-wide table built
//! once over an empty 12x12 belief: whether two raw placements (of
//! different shapes) overlap or violate the no-touch rule never depends on
//! what's been observed in a particular game, only on geometry.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::belief::BeliefMap;
use crate::geometry::{Battleship, Cell, Rotation, ShapeType};
use crate::placement::all_geometric_placements;

/// Exhaustive enumeration is used below this many total configurations;
/// above it, Monte-Carlo sampling takes over. A performance knob, not a
/// semantic boundary (§9).
pub const EXHAUSTIVE_LIMIT: u64 = 10_000_000;

const MONTE_CARLO_MIN_ATTEMPTS: u64 = 1_000_000;
const MONTE_CARLO_MIN_ACCEPTED: u64 = 10_000;

/// Process-wide table of every raw `(shape, x, y, rotation)` placement
/// across all six shapes, plus a dense pairwise incompatibility matrix.
/// Built once at process start; read-only and `Sync` thereafter.
pub struct IncompatibilityTable {
    placements: Vec<Battleship>,
    ids_by_shape: HashMap<ShapeType, Vec<usize>>,
    index_of: HashMap<(ShapeType, i32, i32, Rotation), usize>,
    incompatible: Vec<Vec<bool>>,
}

impl IncompatibilityTable {
    fn build() -> Self {
        let mut placements = Vec::new();
        let mut ids_by_shape: HashMap<ShapeType, Vec<usize>> = HashMap::new();
        let mut index_of = HashMap::new();

        for &shape_type in &ShapeType::ALL {
            let mut ids = Vec::new();
            for battleship in all_geometric_placements(shape_type) {
                let id = placements.len();
                index_of.insert(
                    (battleship.shape_type, battleship.x, battleship.y, battleship.rotation),
                    id,
                );
                ids.push(id);
                placements.push(battleship);
            }
            ids_by_shape.insert(shape_type, ids);
        }

        // Footprint = every cell within Chebyshev distance 1 of a SHIP
        // cell (self included). Two placements are incompatible exactly
        // when one's footprint intersects the other's SHIP cells.
        let footprints: Vec<HashSet<(i32, i32)>> = placements
            .iter()
            .map(|b| {
                let mut footprint = HashSet::new();
                for &(x, y) in b.cells() {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            footprint.insert((x + dx, y + dy));
                        }
                    }
                }
                footprint
            })
            .collect();

        let n = placements.len();
        let mut incompatible = vec![vec![false; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let hits = placements[j].cells().iter().any(|c| footprints[i].contains(c));
                incompatible[i][j] = hits;
                incompatible[j][i] = hits;
            }
        }

        IncompatibilityTable {
            placements,
            ids_by_shape,
            index_of,
            incompatible,
        }
    }

    fn global_id(&self, battleship: &Battleship) -> usize {
        self.index_of[&(battleship.shape_type, battleship.x, battleship.y, battleship.rotation)]
    }

    fn incompatible(&self, a: usize, b: usize) -> bool {
        self.incompatible[a][b]
    }
}

pub static INCOMPATIBILITY: Lazy<IncompatibilityTable> = Lazy::new(IncompatibilityTable::build);

/// A belief-filtered candidate placement of one unconfirmed shape, tagged
/// with whether it covers an already-inferred-SHIP cell (a live hit — i.e.
/// `target_mode`).
#[derive(Debug, Clone)]
pub struct CandidatePlacement {
    pub battleship: Battleship,
    pub target_mode: bool,
    global_id: usize,
}

/// Candidate placements of `shape_type` consistent with `belief`, each
/// annotated with `target_mode`.
pub fn candidate_placements(belief: &BeliefMap, shape_type: ShapeType) -> Vec<CandidatePlacement> {
    belief
        .candidate_placements_for(shape_type)
        .into_iter()
        .map(|battleship| {
            let target_mode = battleship
                .cells()
                .iter()
                .any(|&(x, y)| belief.inferred(x, y) == Cell::Ship);
            let global_id = INCOMPATIBILITY.global_id(&battleship);
            CandidatePlacement {
                battleship,
                target_mode,
                global_id,
            }
        })
        .collect()
}

/// Output of a single enumeration pass: how many fleet configurations were
/// found consistent with the belief (exact if exhaustive, sampled count
/// otherwise), and how often each candidate placement (by `global_id`)
/// appeared among them.
pub struct EnumerationResult {
    pub valid_configurations: u64,
    pub exhaustive: bool,
    frequency: HashMap<usize, u64>,
}

impl EnumerationResult {
    pub fn frequency_of(&self, candidate: &CandidatePlacement) -> u64 {
        self.frequency.get(&candidate.global_id).copied().unwrap_or(0)
    }
}

/// Enumerate all fleet configurations consistent with `belief` over its
/// unconfirmed shapes, exhaustively if the product of candidate counts is
/// small enough, Monte-Carlo sampled otherwise.
pub fn enumerate(
    belief: &BeliefMap,
    by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>,
    rng: &mut impl Rng,
) -> EnumerationResult {
    let shapes = belief.unconfirmed_shapes();
    let total: u64 = shapes
        .iter()
        .map(|s| by_shape.get(s).map(|v| v.len() as u64).unwrap_or(0))
        .product();

    if total == 0 {
        return EnumerationResult {
            valid_configurations: 0,
            exhaustive: true,
            frequency: HashMap::new(),
        };
    }

    if total <= EXHAUSTIVE_LIMIT {
        enumerate_exhaustive(&shapes, by_shape)
    } else {
        enumerate_monte_carlo(&shapes, by_shape, rng)
    }
}

/// Backtracking DFS over unconfirmed shapes, in reverse insertion order
/// (arbitrary per §4.9; `ShapeType::ALL` is largest-to-smallest, so this
/// walks smallest-to-largest).
fn enumerate_exhaustive(
    shapes: &[ShapeType],
    by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>,
) -> EnumerationResult {
    let mut order: Vec<ShapeType> = shapes.to_vec();
    order.reverse();

    let mut frequency: HashMap<usize, u64> = HashMap::new();
    let mut valid_configurations: u64 = 0;
    let mut chosen: Vec<usize> = Vec::with_capacity(order.len());

    fn recurse(
        order: &[ShapeType],
        depth: usize,
        chosen: &mut Vec<usize>,
        by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>,
        frequency: &mut HashMap<usize, u64>,
        valid_configurations: &mut u64,
    ) {
        if depth == order.len() {
            *valid_configurations += 1;
            for &id in chosen.iter() {
                *frequency.entry(id).or_insert(0) += 1;
            }
            return;
        }
        let empty = Vec::new();
        let candidates = by_shape.get(&order[depth]).unwrap_or(&empty);
        for candidate in candidates {
            if chosen
                .iter()
                .any(|&c| INCOMPATIBILITY.incompatible(c, candidate.global_id))
            {
                continue;
            }
            chosen.push(candidate.global_id);
            recurse(order, depth + 1, chosen, by_shape, frequency, valid_configurations);
            chosen.pop();
        }
    }

    recurse(
        &order,
        0,
        &mut chosen,
        by_shape,
        &mut frequency,
        &mut valid_configurations,
    );

    EnumerationResult {
        valid_configurations,
        exhaustive: true,
        frequency,
    }
}

/// Draw one candidate per unconfirmed shape independently and uniformly at
/// random; discard the sample if any pair is incompatible, else credit
/// every drawn placement's frequency. Runs until both thresholds are met.
fn enumerate_monte_carlo(
    shapes: &[ShapeType],
    by_shape: &HashMap<ShapeType, Vec<CandidatePlacement>>,
    rng: &mut impl Rng,
) -> EnumerationResult {
    let mut frequency: HashMap<usize, u64> = HashMap::new();
    let mut accepted: u64 = 0;
    let mut attempts: u64 = 0;

    while attempts < MONTE_CARLO_MIN_ATTEMPTS || accepted < MONTE_CARLO_MIN_ACCEPTED {
        attempts += 1;
        let mut draw: Vec<usize> = Vec::with_capacity(shapes.len());
        let mut ok = true;
        for shape in shapes {
            let empty = Vec::new();
            let candidates = by_shape.get(shape).unwrap_or(&empty);
            let Some(candidate) = candidates.choose(rng) else {
                ok = false;
                break;
            };
            if draw
                .iter()
                .any(|&c| INCOMPATIBILITY.incompatible(c, candidate.global_id))
            {
                ok = false;
                break;
            }
            draw.push(candidate.global_id);
        }
        if ok {
            accepted += 1;
            for id in draw {
                *frequency.entry(id).or_insert(0) += 1;
            }
        }
    }

    EnumerationResult {
        valid_configurations: accepted,
        exhaustive: false,
        frequency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::HEATMAP_MAXIMUM_VALUE;
    use crate::geometry::Rotation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn incompatibility_table_flags_overlap_and_adjacency() {
        let a = Battleship::new(ShapeType::PatrolBoat, 0, 0, Rotation::Vertical);
        let b = Battleship::new(ShapeType::Carrier, 1, 0, Rotation::Vertical);
        let c = Battleship::new(ShapeType::Carrier, 5, 5, Rotation::Vertical);
        assert!(INCOMPATIBILITY.incompatible(
            INCOMPATIBILITY.global_id(&a),
            INCOMPATIBILITY.global_id(&b)
        ));
        assert!(!INCOMPATIBILITY.incompatible(
            INCOMPATIBILITY.global_id(&a),
            INCOMPATIBILITY.global_id(&c)
        ));
    }

    #[test]
    fn fresh_belief_enumerates_many_exhaustive_configurations() {
        let belief = BeliefMap::new();
        let mut rng = StdRng::seed_from_u64(1);
        let by_shape: HashMap<ShapeType, Vec<CandidatePlacement>> = ShapeType::ALL
            .iter()
            .map(|&s| (s, candidate_placements(&belief, s)))
            .collect();
        let result = enumerate(&belief, &by_shape, &mut rng);
        assert!(result.valid_configurations > 0);
    }

    #[test]
    fn a_single_confirmed_hit_raises_frequency_of_covering_placements() {
        let mut belief = BeliefMap::new();
        // A lone hit with no other information: every unconfirmed shape's
        // candidates that cover it should show up with nonzero frequency,
        // and none should ever disagree with the hit (every consistent
        // configuration must explain that cell).
        belief.confirm(Battleship::new(ShapeType::PatrolBoat, 6, 6, Rotation::Vertical)).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let by_shape: HashMap<ShapeType, Vec<CandidatePlacement>> = belief
            .unconfirmed_shapes()
            .into_iter()
            .map(|s| (s, candidate_placements(&belief, s)))
            .collect();
        let result = enumerate(&belief, &by_shape, &mut rng);
        assert!(result.valid_configurations > 0);
        // Heat at the confirmed cell stays sentinel-max regardless.
        assert_eq!(belief.heat_at(6, 6), HEATMAP_MAXIMUM_VALUE);
    }
}
