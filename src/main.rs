use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use hover_arena_core::config::SimulationConfig;
use hover_arena_core::game::entity::{ArenaEntity, EntityCategory, Footprint};
use hover_arena_core::game::sandbox::SandboxArena;
use hover_arena_core::game::services::PhysicsService;
use hover_arena_core::game::systems::ai::Mode;
use hover_arena_core::game::world::GameWorld;
use hover_arena_core::util::vec2::Vec2;

/// Obstacles scattered over the arena at startup
const OBSTACLE_COUNT: u32 = 12;
/// Seconds between status lines
const STATUS_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Hover arena simulation v{}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::var("ARENA_CONFIG") {
        Ok(path) => SimulationConfig::from_json_file(&path)?,
        Err(_) => SimulationConfig::load_or_default(),
    };
    config.validate()?;
    info!(
        "Configuration loaded: {}x{} arena, tile {}, {} bots at {} Hz",
        config.arena.width, config.arena.length, config.arena.tile_size, config.bot_count, config.tick_rate
    );

    let seed: u64 = std::env::var("ARENA_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let statics = scatter_obstacles(&mut rng, &config);

    let mut world = GameWorld::new(config.clone(), statics.clone())?;
    let mut arena = SandboxArena::new(&config.arena).with_contacts(world.contact_sender());
    for wall in &statics {
        let (min, max) = wall.footprint.ground_bounds();
        arena.add_obstacle(min, max);
    }

    info!(seed, stats = ?world.grid().stats(), "Arena built");
    debug!("\n{}", world.grid().render_ascii());

    let spawn_points: Vec<Vec2> = world.seek_points().iter().collect();
    let player = arena.spawn_player(spawn_points.first().copied().unwrap_or(Vec2::ZERO), 0.0);
    for i in 0..config.bot_count {
        let at = spawn_points
            .get((i + 1) % spawn_points.len().max(1))
            .copied()
            .unwrap_or(Vec2::ZERO);
        arena.spawn_bot(at, rng.gen_range(0.0..std::f32::consts::TAU));
    }

    let max_ticks: Option<u64> = std::env::var("SIM_TICKS").ok().and_then(|s| s.parse().ok());
    let dt = config.tick_duration();
    let status_every = config.tick_rate as u64 * STATUS_INTERVAL_SECS;

    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // The player wanders so the bots have something to chase
                if rng.gen_bool(0.05) {
                    arena.turn(player, rng.gen_range(-1.0..1.0));
                }
                arena.move_by(player, rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));

                let summary = world.tick(&mut arena, dt);
                arena.step(dt);

                let tick = world.tick_count();
                if tick % status_every == 0 {
                    let chasing = arena
                        .crafts()
                        .iter()
                        .filter(|c| {
                            world.coordinator().brain(c.id).map(|b| b.mode()) == Some(Mode::Chase)
                        })
                        .count();
                    info!(
                        tick,
                        bots = summary.applied,
                        skipped = summary.skipped,
                        chasing,
                        budget = %world.budget().status_message(),
                        "Simulation status"
                    );
                }
                if max_ticks.is_some_and(|max| tick >= max) {
                    info!(tick, "Tick limit reached");
                    break;
                }
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!(ticks = world.tick_count(), "Simulation stopped");
    Ok(())
}

/// Random wall blocks, keeping the arena centre clear
fn scatter_obstacles(rng: &mut StdRng, config: &SimulationConfig) -> Vec<ArenaEntity> {
    let arena = &config.arena;
    let half = Vec2::new(arena.width * 0.5, arena.length * 0.5);
    let tile = arena.tile_size;

    (0..OBSTACLE_COUNT)
        .filter_map(|i| {
            let size = Vec2::new(rng.gen_range(1..=4) as f32 * tile, rng.gen_range(1..=4) as f32 * tile);
            let min = arena.center - half
                + Vec2::new(
                    rng.gen_range(0.0..(arena.width - size.x).max(tile)),
                    rng.gen_range(0.0..(arena.length - size.y).max(tile)),
                );
            let max = min + size;
            let center = (min + max) * 0.5;
            if center.distance_to(arena.center) < 4.0 * tile {
                return None;
            }
            Some(ArenaEntity::new(
                1000 + i,
                EntityCategory::Static,
                Footprint::from_corners(min, max),
            ))
        })
        .collect()
}
