use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use loam_chunk::ChunkBuilder;
use loam_runtime::{StreamStats, StreamingManager};
use loam_world::{ChunkCoord, WorldConfig, WorldError};

mod walker;

use walker::Walker;

#[derive(Parser, Debug)]
#[command(
    name = "loam",
    about = "Stream a procedural voxel world around a scripted walker"
)]
struct Args {
    /// World config (TOML)
    #[arg(long, conflicts_with = "seed", required_unless_present = "seed")]
    config: Option<PathBuf>,
    /// Use the classic preset with this seed
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 200)]
    ticks: u32,
    /// Blocks travelled per tick
    #[arg(long, default_value_t = 0.5)]
    speed: f64,
    /// Walking direction in degrees, 0 = +X, 90 = +Z
    #[arg(long, default_value_t = 0.0)]
    heading: f64,
    #[arg(long)]
    view_distance: Option<u32>,
    #[arg(long)]
    workers: Option<usize>,
    /// Print the block column at WX,WZ after the run
    #[arg(long, value_parser = parse_column, value_name = "WX,WZ")]
    column: Option<(i32, i32)>,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_column(s: &str) -> Result<(i32, i32), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected WX,WZ, got '{s}'"))?;
    let wx = a.trim().parse::<i32>().map_err(|e| e.to_string())?;
    let wz = b.trim().parse::<i32>().map_err(|e| e.to_string())?;
    Ok((wx, wz))
}

fn load_config(args: &Args) -> Result<WorldConfig, WorldError> {
    let mut cfg = match (&args.config, args.seed) {
        (Some(path), _) => WorldConfig::load(path)?,
        (None, Some(seed)) => WorldConfig::classic(seed),
        (None, None) => {
            return Err(WorldError::Configuration(
                "either --config or --seed is required".into(),
            ));
        }
    };
    if let Some(v) = args.view_distance {
        cfg.view_distance = v;
    }
    if let Some(w) = args.workers {
        cfg.workers = w;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn print_column(mgr: &StreamingManager, wx: i32, wz: i32) -> Result<(), WorldError> {
    let cfg = mgr.config();
    let coord = ChunkCoord::from_block(wx, wz, cfg.chunk_size);
    let chunk = match mgr.read_chunk(coord) {
        Some(c) => c,
        None => {
            // Not resident any more; generation is deterministic, so rebuild it.
            let builder = ChunkBuilder::new(cfg)?;
            std::sync::Arc::new(builder.build(coord, builder.seed())?)
        }
    };
    println!("column ({wx}, {wz}) in chunk {coord}, revision {}:", chunk.revision());
    for wy in (0..cfg.max_height as i32).rev() {
        if let Some(kind) = chunk.get_world(wx, wy, wz) {
            if !kind.is_air() {
                println!("  y={wy:>4} {kind}");
            }
        }
    }
    Ok(())
}

fn print_summary(mgr: &StreamingManager, stats: StreamStats, failures: usize) {
    let store = mgr.store().stats();
    println!("center:       {}", mgr.center().map_or("-".to_string(), |c| c.to_string()));
    println!("ready chunks: {}", store.ready);
    println!("requested:    {}", stats.requested);
    println!("builds:       {}", stats.built);
    println!("evictions:    {} ({} deferred)", stats.evicted, stats.deferred_evictions);
    println!("cancelled:    {}", stats.cancelled);
    println!("retries:      {}", stats.retried);
    println!("failures:     {failures}");
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let cfg = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };
    let chunk_center = cfg.chunk_size as f64 * 0.5;
    let spawn_y = cfg.max_height as f64;
    let mut mgr = match StreamingManager::new(cfg) {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };

    let mut walker = Walker::new([chunk_center, spawn_y, chunk_center], args.heading, args.speed);
    let mut failures = 0usize;
    for tick in 0..args.ticks {
        let report = mgr.tick(&walker);
        if report.moved {
            log::debug!(
                target: "stream",
                "tick {tick}: center {:?} +{} -{} (outstanding {})",
                report.center,
                report.requested.len(),
                report.evicted.len(),
                mgr.outstanding()
            );
        }
        for f in &report.failures {
            log::warn!("tick {tick}: {f}");
        }
        failures += report.failures.len();
        walker.advance();
    }
    let tail = mgr.flush();
    for f in &tail.failures {
        log::warn!("{f}");
    }
    failures += tail.failures.len();

    print_summary(&mgr, mgr.stats(), failures);
    if let Some((wx, wz)) = args.column {
        if let Err(e) = print_column(&mgr, wx, wz) {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    }
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
