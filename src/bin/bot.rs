//! The targeting bot binary: plays a full game against a running judge
//! instance over HTTP, maintaining a `BeliefMap` and driving it through
//! the constraint propagator, configuration enumerator, and targeting
//! policy after every shot.

use std::collections::HashMap;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use rusty_ship::belief::BeliefMap;
use rusty_ship::board::Avenger;
use rusty_ship::enumerate::{candidate_placements, enumerate, CandidatePlacement};
use rusty_ship::geometry::ShapeType;
use rusty_ship::propagate::propagate_to_fixpoint;
use rusty_ship::targeting::{choose_avenger, next_shot, synthesize_heatmap, TieBreak};

#[derive(Parser, Debug)]
#[command(about = "Plays rusty-ship against a running judge instance")]
struct Args {
    /// Base URL of the judge, e.g. http://127.0.0.1:3000
    #[arg(long, env = "RUSTY_SHIP_JUDGE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Bearer token identifying this player's session.
    #[arg(long, env = "RUSTY_SHIP_TOKEN")]
    token: String,

    /// Break heat-map ties by distance to board centre instead of randomly.
    #[arg(long, default_value_t = false)]
    center_bias: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FireResponseDto {
    grid: String,
    #[allow(dead_code)]
    cell: String,
    #[allow(dead_code)]
    result: bool,
    avenger_available: bool,
    map_id: u64,
    map_count: u32,
    move_count: u32,
    finished: bool,
}

#[derive(Debug, Deserialize)]
struct MapPointDto {
    x: i32,
    y: i32,
}

#[derive(Debug, Deserialize)]
struct AvengerResultDto {
    map_point: MapPointDto,
    #[allow(dead_code)]
    hit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvengerFireResponseDto {
    #[serde(flatten)]
    base: FireResponseDto,
    avenger_result: Vec<AvengerResultDto>,
}

fn avenger_name(avenger: Avenger) -> &'static str {
    match avenger {
        Avenger::Thor => "thor",
        Avenger::IronMan => "ironman",
        Avenger::Hulk => "hulk",
    }
}

async fn fetch_status(client: &reqwest::Client, base_url: &str, token: &str) -> anyhow::Result<FireResponseDto> {
    Ok(client
        .get(format!("{base_url}/fire"))
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

/// `x`/`y` are engine coordinates; the wire path is `row/column`, i.e.
/// `y/x` (§6's axis flip).
async fn fire_plain(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    x: i32,
    y: i32,
) -> anyhow::Result<FireResponseDto> {
    Ok(client
        .get(format!("{base_url}/fire/{y}/{x}"))
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

async fn fire_with_avenger(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    x: i32,
    y: i32,
    avenger: Avenger,
) -> anyhow::Result<AvengerFireResponseDto> {
    Ok(client
        .get(format!("{base_url}/fire/{y}/{x}/avenger/{}", avenger_name(avenger)))
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

fn candidates_by_shape(belief: &BeliefMap) -> HashMap<ShapeType, Vec<CandidatePlacement>> {
    belief
        .unconfirmed_shapes()
        .into_iter()
        .map(|shape| (shape, candidate_placements(belief, shape)))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let client = reqwest::Client::new();
    let mut rng = StdRng::from_entropy();
    let tie_break = if args.center_bias { TieBreak::CenterBias } else { TieBreak::Random };

    let mut total_shots: u64 = 0;
    let mut boards_played: u64 = 0;

    'game: loop {
        let mut current = fetch_status(&client, &args.base_url, &args.token).await?;
        let mut belief = BeliefMap::new();
        belief.update_from_server_grid(&current.grid)?;
        propagate_to_fixpoint(&mut belief)?;

        loop {
            if current.finished {
                boards_played += 1;
                total_shots += current.move_count as u64;
                log::info!(
                    "board {} complete in {} shots ({} maps remaining)",
                    current.map_id,
                    current.move_count,
                    current.map_count
                );
                break;
            }

            let by_shape = candidates_by_shape(&belief);
            let result = enumerate(&belief, &by_shape, &mut rng);
            synthesize_heatmap(&mut belief, &by_shape, &result);

            let (x, y) =
                next_shot(&belief, tie_break, &mut rng).expect("heat-map exhausted with shots still owed");

            if current.avenger_available {
                let avenger = choose_avenger(&belief, &by_shape);
                let response = fire_with_avenger(&client, &args.base_url, &args.token, x, y, avenger).await?;
                if avenger == Avenger::IronMan {
                    if let Some(hint) = response.avenger_result.first() {
                        belief.apply_iron_man_hint(hint.map_point.y, hint.map_point.x)?;
                    }
                }
                belief.update_from_server_grid(&response.base.grid)?;
                if response.base.avenger_available {
                    belief.reconcile_helicarrier_gaps_on_avenger_grant()?;
                }
                current = response.base;
            } else {
                let response = fire_plain(&client, &args.base_url, &args.token, x, y).await?;
                belief.update_from_server_grid(&response.grid)?;
                if response.avenger_available {
                    belief.reconcile_helicarrier_gaps_on_avenger_grant()?;
                }
                current = response;
            }

            propagate_to_fixpoint(&mut belief)?;
        }

        if current.map_count == 0 {
            log::info!("game complete: {boards_played} boards, {total_shots} total shots");
            break 'game;
        }
    }

    Ok(())
}
