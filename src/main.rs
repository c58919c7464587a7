// src/main.rs - dmp-cli: train, generate and inspect reversible DMPs
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reversible_dmp::config::{load_config, DmpConfig, ForceCoupling, GenerationOverrides};
use reversible_dmp::dmp::{Direction, ReversibleDmp, SharedDmp, Termination, TrainedModel};
use reversible_dmp::io::{read_demo_csv, write_trajectory_csv};

type CliError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Parser, Debug)]
#[command(name = "dmp-cli", about = "Learn a motion from one demonstration and replay it forward or reversed.")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a model to a demonstration CSV
    Train {
        /// Demonstration CSV, one row per sample
        #[arg(short, long)]
        demo: PathBuf,

        /// Sampling interval of the rows in seconds
        #[arg(short, long, default_value_t = 0.01, conflicts_with = "timed")]
        sample_interval: f64,

        /// First column holds timestamps
        #[arg(long)]
        timed: bool,

        /// Where to write the trained model
        #[arg(short, long, default_value = "model.json")]
        model: PathBuf,
    },

    /// Generate a trajectory from a trained model
    Generate {
        #[arg(short, long, default_value = "model.json")]
        model: PathBuf,

        /// Run the motion backwards
        #[arg(short, long)]
        reverse: bool,

        /// Start position (comma-separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        start: Option<Vec<f64>>,

        /// Goal position (comma-separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        goal: Option<Vec<f64>>,

        /// Initial velocity (comma-separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        dy: Option<Vec<f64>>,

        /// External force (comma-separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        ext_force: Option<Vec<f64>>,

        /// Temporal scaling factor
        #[arg(long, conflicts_with = "speed")]
        tau: Option<f64>,

        /// Playback speed, tau = 1 / speed
        #[arg(long)]
        speed: Option<f64>,

        /// Phase-stopping gain
        #[arg(long)]
        ac: Option<f64>,

        /// External force coupling code, 1 adds the force
        #[arg(long)]
        force_type: Option<i64>,

        #[arg(long)]
        dt: Option<f64>,

        /// Output CSV
        #[arg(short, long, default_value = "trajectory.csv")]
        output: PathBuf,
    },

    /// Print a summary of a trained model
    Inspect {
        #[arg(short, long, default_value = "model.json")]
        model: PathBuf,
    },
}

fn resolve_config(path: Option<&Path>, dof: usize) -> Result<DmpConfig, CliError> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = load_config(path)?;
            if config.dof != dof {
                return Err(format!(
                    "config '{}' is for {} dof but the demonstration has {}",
                    path.display(),
                    config.dof,
                    dof
                )
                .into());
            }
            Ok(config)
        }
        None => Ok(DmpConfig::with_dof(dof)),
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::Train {
            demo,
            sample_interval,
            timed,
            model,
        } => {
            let interval = if timed { None } else { Some(sample_interval) };
            let demo = read_demo_csv(&demo, interval)?;
            tracing::info!(
                "Demonstration: {} samples, {} dof, {:.3}s",
                demo.len(),
                demo.dof(),
                demo.duration()
            );
            let config = resolve_config(cli.config.as_deref(), demo.dof())?;
            let mut dmp = ReversibleDmp::new(config)?;
            dmp.load_demo_trajectory(demo)?;
            let trained = dmp.train()?;
            trained.save_json(&model)?;
            tracing::info!(
                "Trained {} x {} weights, saved to {}",
                trained.dof,
                trained.rbf_num,
                model.display()
            );
        }
        Commands::Generate {
            model,
            reverse,
            start,
            goal,
            dy,
            ext_force,
            tau,
            speed,
            ac,
            force_type,
            dt,
            output,
        } => {
            let mut trained = TrainedModel::load_json(&model)?;
            if let Some(path) = cli.config.as_deref() {
                // generation defaults only; the trained parameters stay as saved
                trained.config.generation = load_config(path)?.generation;
            }
            let shared = SharedDmp::new(ReversibleDmp::from_model(trained)?);

            let overrides = GenerationOverrides {
                start,
                goal,
                dy,
                tau: tau.or(speed.map(|s| 1.0 / s)),
                ac,
                ext_force,
                coupling: force_type.map(ForceCoupling::from),
                dt,
            };
            let direction = if reverse {
                Direction::Reverse
            } else {
                Direction::Forward
            };
            let generated = shared.generate(direction, overrides).await?;
            match generated.termination {
                Termination::Completed | Termination::GoalReached => tracing::info!(
                    "Generated {} samples ({:?})",
                    generated.trajectory.len(),
                    generated.termination
                ),
                _ => tracing::warn!(
                    "Run ended {:?} after {} steps; writing the partial trajectory",
                    generated.termination,
                    generated.steps
                ),
            }
            write_trajectory_csv(&output, &generated.trajectory)?;
            tracing::info!("Wrote {}", output.display());
        }
        Commands::Inspect { model } => {
            let trained = TrainedModel::load_json(&model)?;
            let norm = trained.weights.iter().map(|w| w * w).sum::<f64>().sqrt();
            println!("model:     {}", model.display());
            println!("dof:       {}", trained.dof);
            println!("rbf_num:   {}", trained.rbf_num);
            println!("tau:       {}", trained.config.tau);
            println!("dt:        {}", trained.config.dt);
            println!("scaling:   {:?}", trained.config.scaling);
            println!("start:     {:?}", trained.demo_start);
            println!("goal:      {:?}", trained.demo_goal);
            println!("|weights|: {:.6e}", norm);
        }
    }
    Ok(())
}
