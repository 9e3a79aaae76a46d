//! Strata CLI
//!
//! Entry point for the `strata` command-line tool.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use strata::{
    Layer, LayerOrigin, LayerSet, OverlayRegistry, ResolvedConfig, Resolver, StrataError,
};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Layered configuration composition and overlay resolution", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Layer stack selection shared by every subcommand.
#[derive(Args)]
struct LayerArgs {
    /// Base layer file (lowest precedence)
    #[arg(long, short = 'b')]
    base: Option<PathBuf>,

    /// Overlay layer files, lowest precedence first
    #[arg(value_name = "LAYER")]
    layers: Vec<PathBuf>,

    /// Directory of overlay layers, loaded in sorted order after LAYER files
    #[arg(long, short = 'd')]
    layer_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose and resolve layers, printing the resolved configuration
    Resolve {
        #[command(flatten)]
        layers: LayerArgs,

        /// Print only the configuration, without provenance
        #[arg(long)]
        bare: bool,

        /// Write the output to a file instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Bound on override applications during resolution
        #[arg(long, default_value_t = strata::DEFAULT_STEP_BUDGET)]
        max_steps: usize,
    },

    /// Resolve and report the configuration digest
    Check {
        #[command(flatten)]
        layers: LayerArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Resolve and print the value at a dot-separated path
    Get {
        /// Dot-separated key path (e.g. "cache.mode")
        path: String,

        #[command(flatten)]
        layers: LayerArgs,

        /// Print string values without JSON quoting
        #[arg(long)]
        raw: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            layers,
            bare,
            out,
            max_steps,
        } => run_resolve(&layers, bare, out, max_steps),
        Commands::Check { layers, json } => run_check(&layers, json),
        Commands::Get { path, layers, raw } => run_get(&path, &layers, raw),
    }
}

fn load_layers(args: &LayerArgs) -> Result<LayerSet, StrataError> {
    let mut set = LayerSet::new();
    if let Some(base) = &args.base {
        set.push(Layer::from_path(base, LayerOrigin::Base)?);
    }
    for path in &args.layers {
        set.push(Layer::from_path(path, LayerOrigin::Overlay)?);
    }
    if let Some(dir) = &args.layer_dir {
        set.push_dir(dir)?;
    }
    Ok(set)
}

fn resolve_from_args(args: &LayerArgs, max_steps: usize) -> Result<ResolvedConfig, StrataError> {
    let layers = load_layers(args)?;
    let registry = OverlayRegistry::new();
    let resolver = Resolver::new().with_step_budget(max_steps);
    strata::resolve_layers(&layers, &registry, &resolver)
}

fn run_resolve(args: &LayerArgs, bare: bool, out: Option<PathBuf>, max_steps: usize) {
    let config = match resolve_from_args(args, max_steps) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let rendered = if bare {
        serde_json::to_string_pretty(&config.config)
    } else {
        config.to_json()
    };
    let rendered = match rendered {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    };

    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, rendered) {
                eprintln!("Error writing {}: {}", path.display(), e);
                process::exit(1);
            }
        }
        None => println!("{}", rendered),
    }
}

fn run_check(args: &LayerArgs, json: bool) {
    match resolve_from_args(args, strata::DEFAULT_STEP_BUDGET) {
        Ok(config) => {
            let digest = match config.digest() {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("Error computing digest: {}", e);
                    process::exit(1);
                }
            };
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "digest": digest,
                        "layers": config.sources.len(),
                    })
                );
            } else {
                println!("ok: {} ({} layers)", digest, config.sources.len());
            }
        }
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": e.to_string(),
                    })
                );
            } else {
                eprintln!("Configuration error: {}", e);
            }
            process::exit(1);
        }
    }
}

fn run_get(path: &str, args: &LayerArgs, raw: bool) {
    let config = match resolve_from_args(args, strata::DEFAULT_STEP_BUDGET) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let value = match config.lookup(path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if raw {
        if let Some(s) = value.as_str() {
            println!("{}", s);
            return;
        }
    }
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
