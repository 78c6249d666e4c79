//! fogtrail - trajectory processing CLI
//!
//! Replays recorded location samples through the deduplication gate and
//! runs the simplification and chain-stitching passes on projected data.

use fogtrail::analysis::geometry::{Point2D, Segment};
use fogtrail::analysis::rdp_simplification::PathSimplifier;
use fogtrail::analysis::trajectory::TrajectoryRenderer;
use fogtrail::app::cli::{Cli, Commands, ConfigAction};
use fogtrail::app::config::Config;
use fogtrail::app::replay;
use fogtrail::capture::dedup_gate::DeduplicationGate;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_override = cli.config.as_deref();

    match cli.command {
        Commands::Replay { input, summary } => {
            run_replay(&input, summary, &Config::load_from(config_override)?)?
        }
        Commands::Simplify { input, tolerance } => {
            run_simplify(&input, tolerance, &Config::load_from(config_override)?)?
        }
        Commands::Chains { input, tolerance } => {
            run_chains(&input, tolerance, &Config::load_from(config_override)?)?
        }
        Commands::Config { action } => run_config(action, config_override)?,
    }

    Ok(())
}

fn run_replay(input: &Path, summary: bool, config: &Config) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Samples file not found: {:?}", input);
    }

    let samples = replay::load_samples(input)?;
    let gate = DeduplicationGate::from_config(&config.window);
    info!(
        session = %gate.session_id(),
        "Replaying {} samples (radius {} m, window {} ms, capacity {})",
        samples.len(),
        config.window.dedup_radius_m,
        config.window.dedup_time_window_ms,
        config.window.max_size
    );

    let report = replay::replay(&gate, &samples);

    if !summary {
        for entry in &report.entries {
            match &entry.decision {
                Some(decision) => println!(
                    "#{:<5} ({:.6}, {:.6})  process={:<5} added={:<5} {}",
                    entry.index,
                    entry.sample.latitude,
                    entry.sample.longitude,
                    decision.should_process,
                    decision.was_added,
                    decision.reason
                ),
                None => println!(
                    "#{:<5} ({:.6}, {:.6})  invalid coordinate",
                    entry.index, entry.sample.latitude, entry.sample.longitude
                ),
            }
        }
        println!();
    }

    println!("Replay complete");
    println!("  Admitted:  {}", report.admitted);
    println!("  Rejected:  {}", report.rejected);
    println!("  Fallbacks: {}", report.fallbacks);
    println!("  Invalid:   {}", report.invalid);
    println!("  Buffered:  {}", report.stats.total_events_in_queue);
    println!("  Span:      {:.1}s", report.stats.queue_time_span_ms as f64 / 1000.0);

    Ok(())
}

fn run_simplify(input: &Path, tolerance: Option<f64>, config: &Config) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(input)?;
    let points: Vec<Point2D> = serde_json::from_str(&content)?;

    let simplifier =
        PathSimplifier::with_tolerance(tolerance.unwrap_or(config.render.simplify_tolerance_px));
    let simplified = simplifier.simplify(&points);

    info!(
        "Simplified {} points to {} ({:.0}% removed)",
        points.len(),
        simplified.len(),
        simplifier.compression_ratio(&points, &simplified) * 100.0
    );
    println!("{}", serde_json::to_string_pretty(&simplified)?);

    Ok(())
}

fn run_chains(input: &Path, tolerance: Option<f64>, config: &Config) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(input)?;
    let segments: Vec<Segment> = serde_json::from_str(&content)?;

    let mut renderer = TrajectoryRenderer::from_config(&config.render);
    if let Some(t) = tolerance {
        renderer.tolerance = t;
    }
    let rendered = renderer.render_segments(&segments);

    info!(
        "Stitched {} segments into {} chains ({} -> {} points)",
        segments.len(),
        rendered.chains.len(),
        rendered.original_point_count,
        rendered.simplified_point_count
    );
    println!("{}", serde_json::to_string_pretty(&rendered.chains)?);

    Ok(())
}

fn run_config(action: ConfigAction, config_override: Option<&Path>) -> anyhow::Result<()> {
    let config_path = Config::resolve_path(config_override);

    match action {
        ConfigAction::Show => {
            let config = Config::load_from(config_override)?;
            if config_path.exists() {
                println!("Configuration ({:?}):\n", config_path);
            } else {
                println!("Configuration (defaults, {:?} not found):\n", config_path);
            }
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            let config = Config::init(&config_path, force)?;
            println!("Created config at {:?}", config_path);
            println!("\nConfig content:\n{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
