//! Gaze mirror application: replays landmark streams into rendered pupil positions.

use anyhow::{Context, Result};
use clap::Parser;
use gaze_mirror::{
    app::GazeMirrorApp,
    config::{Config, EXAMPLE_CONFIG},
};
use log::info;
use std::fs::File;
use std::io::{self, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines landmark stream to read ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Direction strategy (reprojection, quantized[:t], iris[:t], face)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Gaze Mirror");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {config_path}");
        Config::from_file(config_path).with_context(|| format!("Failed to load config file {config_path}"))?
    } else {
        Config::default()
    };

    if let Some(strategy) = args.strategy {
        apply_strategy_override(&mut config, &strategy)?;
    }

    let mut app = GazeMirrorApp::new(&config).context("Invalid configuration")?;

    let stdout = io::stdout();
    let summary = if args.input == "-" {
        app.run(io::stdin().lock(), stdout.lock())?
    } else {
        let file = File::open(&args.input).with_context(|| format!("Failed to open {}", args.input))?;
        app.run(BufReader::new(file), stdout.lock())?
    };

    info!("Done: {} frames", summary.frames);
    Ok(())
}

/// Apply a `name[:param]` strategy argument on top of the loaded configuration
fn apply_strategy_override(config: &mut Config, spec: &str) -> Result<()> {
    let (name, param) = match spec.split_once(':') {
        Some((name, param)) => (name, Some(param)),
        None => (spec, None),
    };
    config.direction.strategy = name.to_string();

    if let Some(param) = param {
        let value: f64 = param
            .trim()
            .parse()
            .with_context(|| format!("Invalid strategy parameter '{param}'"))?;
        match name.to_lowercase().as_str() {
            "quantized" | "quantised" => config.direction.quantize_threshold = value,
            "iris" => config.direction.blink_threshold = value,
            other => anyhow::bail!("Strategy '{other}' takes no parameter"),
        }
    }
    Ok(())
}
