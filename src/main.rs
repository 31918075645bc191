use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use cvwim::config::{Config, OutputFormat, Stage};
use cvwim::model::{PriorityType, scenario_score};
use cvwim::raster::check_aligned;
use cvwim::readers::read_raster;
use cvwim::utils::log_raster_summary;
use cvwim::workflow::WorkflowRunner;
use cvwim::writers::write_raster;

#[derive(Parser)]
#[command(name = "cvwim")]
#[command(author, version, about = "ConservationVision Watershed Impact Model", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run workflow stages described by a JSON configuration
    Run {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Stages to run instead of those in the configuration
        #[arg(short, long, value_delimiter = ',')]
        stage: Vec<Stage>,
        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write ASCII grids instead of GeoTIFF
        #[arg(long)]
        ascii: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Score a scenario raster between best- and worst-case rasters
    Scenario {
        /// Scenario to score (e.g. runoff under planned land cover)
        case: PathBuf,
        /// Worst-case raster of the same variable
        worst: PathBuf,
        /// Best-case raster of the same variable
        best: PathBuf,
        /// Output file
        output: PathBuf,
        /// CONS or REST
        #[arg(short = 't', long = "type", default_value = "CONS")]
        priority: PriorityType,
        /// Optional processing mask
        #[arg(short, long)]
        mask: Option<PathBuf>,
    },
    /// List workflow stages in execution order
    Stages,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn run(config_path: PathBuf, stages: Vec<Stage>, output: Option<PathBuf>, ascii: bool) -> Result<()> {
    let mut config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;

    if let Some(dir) = output {
        config.set_output_directory(dir);
    }
    if !stages.is_empty() {
        config.set_stages(stages).context("Invalid stage selection")?;
    }
    if ascii {
        config.set_output_format(OutputFormat::AsciiGrid);
    }

    let start = Instant::now();
    let runner = WorkflowRunner::new(config).context("Failed to prepare workflow")?;
    let manifest = runner.run().context("Workflow failed")?;

    info!(
        "{} products from {} stages in {:.2?}",
        manifest.products.len(),
        manifest.stages.len(),
        start.elapsed()
    );
    Ok(())
}

fn scenario(
    case: PathBuf,
    worst: PathBuf,
    best: PathBuf,
    output: PathBuf,
    priority: PriorityType,
    mask: Option<PathBuf>,
) -> Result<()> {
    let read = |path: &PathBuf| read_raster(path).with_context(|| format!("Failed to read {}", path.display()));

    let case = read(&case)?;
    let worst = read(&worst)?;
    let best = read(&best)?;
    let mask = mask.as_ref().map(read).transpose()?;
    for other in [Some(&worst), Some(&best), mask.as_ref()].into_iter().flatten() {
        check_aligned(&case, other).context("Scenario inputs must share a grid")?;
    }

    let score = scenario_score(&case, &worst, &best, priority, mask.as_ref())?;
    log_raster_summary("ScenarioScore", &score);
    write_raster(&score, &output).context("Failed to write output")?;
    info!("Scenario score saved to {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            stage,
            output,
            ascii,
        } => run(config, stage, output, ascii)?,

        Commands::Info { input } => {
            let raster = read_raster(&input).with_context(|| format!("Failed to read {}", input.display()))?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nStatistics:");
            if let (Some(min), Some(max), Some(mean), Some(sd)) = (stats.min, stats.max, stats.mean, stats.std_dev) {
                println!("  Min: {:.4}", min);
                println!("  Max: {:.4}", max);
                println!("  Mean: {:.4}", mean);
                println!("  Std dev: {:.4}", sd);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Scenario {
            case,
            worst,
            best,
            output,
            priority,
            mask,
        } => scenario(case, worst, best, output, priority, mask)?,

        Commands::Stages => {
            for stage in Stage::ALL {
                println!("{}", stage);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_reports_second_install() {
        assert!(setup_logging(false).is_ok());
        assert!(setup_logging(true).is_err());
    }

    #[test]
    fn test_run_stage_list() {
        let cli = Cli::parse_from(["cvwim", "run", "--config", "wv.json", "--stage", "flow,karst", "--ascii"]);
        match cli.command {
            Commands::Run { stage, ascii, .. } => {
                assert_eq!(stage, vec![Stage::Flow, Stage::Karst]);
                assert!(ascii);
            }
            _ => panic!("expected the run command"),
        }
    }

    #[test]
    fn test_scenario_priority_type() {
        let cli = Cli::parse_from(["cvwim", "scenario", "case.tif", "worst.tif", "best.tif", "out.tif", "-t", "REST"]);
        match cli.command {
            Commands::Scenario { priority, mask, .. } => {
                assert_eq!(priority, PriorityType::Restoration);
                assert!(mask.is_none());
            }
            _ => panic!("expected the scenario command"),
        }
    }
}
