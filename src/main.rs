use clap::{Parser, Subcommand};
use status_trim::config::{self, TrimConfig};
use status_trim::imaging::RustBackend;
use status_trim::output::{self, PlanReport, Summary, TrimReport};
use status_trim::{Trimmer, plan_trim};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "status-trim")]
#[command(about = "Remove the status bar from iOS screenshots")]
#[command(long_about = "\
Remove the status bar from iOS screenshots

Each file is cropped in place: the top 20 points (20, 40 or 60 pixels
depending on the screen scale) are removed and the file is overwritten in
its original format.

Only screenshots whose exact pixel size matches a known iOS screen, in
portrait or landscape, are touched. Other images are skipped. Screenshots
that were already trimmed are detected and left alone, so running the tool
twice over the same files is safe.

Known screens (portrait pixels):
  320x480 @1x    640x960 @1x    768x1024 @1x
  640x1136 @2x   750x1334 @2x   1536x2048 @2x
  1242x2208 @3x

Run 'status-trim gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of files trimmed in parallel (overrides the config file)
    #[arg(long, global = true)]
    jobs: Option<usize>,

    /// Print a JSON report instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trim screenshots in place
    Trim {
        /// Screenshot files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show what `trim` would do without touching any file
    Check {
        /// Screenshot files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Trim { paths } => {
            let config = resolve_config(cli.config.as_deref(), cli.jobs)?;
            let trimmer = Trimmer::init_shared(&config)?;
            let results = trimmer.trim_all(paths);

            if cli.json {
                let reports: Vec<TrimReport> = results
                    .iter()
                    .map(|(path, result)| TrimReport::new(path, result))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                output::print_trim_results(&results);
            }

            if Summary::from_results(results.iter().map(|(_, r)| r)).failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Check { paths } => {
            let backend = RustBackend::new();
            let plans: Vec<_> = paths
                .into_iter()
                .map(|path| {
                    let plan = plan_trim(&backend, &path);
                    (path, plan)
                })
                .collect();

            if cli.json {
                let reports: Vec<PlanReport> = plans
                    .iter()
                    .map(|(path, plan)| PlanReport::new(path, plan))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                output::print_plans(&plans);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file, then apply command-line overrides.
fn resolve_config(
    path: Option<&std::path::Path>,
    jobs: Option<usize>,
) -> Result<TrimConfig, config::ConfigError> {
    let mut config = config::load_config(path)?;
    if jobs.is_some() {
        config.processing.max_processes = jobs;
    }
    config.validate()?;
    Ok(config)
}
