//! Blackhole Arena headless demo
//!
//! Runs a seeded arena with a few scripted bots and prints a world summary.
//!
//! Usage: `blackhole-arena [seed] [config.json]`

use std::time::Duration;

use blackhole_arena::sim::vector::from_angle;
use blackhole_arena::{Arena, GameConfig};

const BOT_COUNT: u32 = 4;
const RUN_SECS: u64 = 60;
/// How often bots pick a new heading
const STEER_INTERVAL_MS: u64 = 250;

fn main() {
    env_logger::init();
    log::info!("Blackhole Arena (headless) starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(s) => s.parse::<u64>()?,
        None => 12345,
    };
    let config = match args.next() {
        Some(path) => GameConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };

    let mut arena = Arena::new(config, seed)?;
    log::info!("Game initialized with seed: {seed}");

    let mut bots = Vec::new();
    for i in 0..BOT_COUNT {
        let player = arena.connect(u128::from(i) + 1)?;
        arena.enter_game(player, &format!("bot-{i}"))?;
        bots.push(player);
    }

    let steps = RUN_SECS * 1000 / STEER_INTERVAL_MS;
    for step in 0..steps {
        for (i, &player) in bots.iter().enumerate() {
            if arena.snapshot().circle_count(player) == 0 {
                log::info!("bot {player} was consumed, respawning");
                arena.respawn(player)?;
            }
            // Each bot sweeps a slow spiral at its own rate
            let heading = step as f32 * 0.05 * (i as f32 + 1.0);
            arena.update_input(player, from_angle(heading))?;
            if step % 40 == 39 {
                arena.split(player)?;
            }
        }
        arena.advance_by(Duration::from_millis(STEER_INTERVAL_MS));
    }

    let info = arena.debug_info();
    log::info!(
        "Finished at {:.1}s: {} circles, {} food",
        arena.now().as_micros() as f64 / 1e6,
        info.circle_count,
        info.food_count
    );
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
