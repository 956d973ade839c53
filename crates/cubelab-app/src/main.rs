use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use cubelab_app::{default_ruleset, describe_algorithm, read_batch_config, read_ruleset};
use cubelab_core::pattern::{DEFAULT_DENSITY, StartPattern};
use cubelab_core::{AlgorithmKind, Classification, SimulationResult, analyze};
use cubelab_search::{BatchResult, generate_rulesets, run_batch, write_json};
use owo_colors::OwoColorize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "cubelab",
    version,
    about = "Run, search and rank 3D cellular-automaton rules"
)]
struct Cli {
    /// Seed for every random choice; runs are reproducible when set.
    #[arg(long, global = true, env = "CUBELAB_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a single ruleset and print its metrics.
    Run {
        /// Algorithm to run with its default parameters.
        #[arg(long, default_value = "competition", conflicts_with = "ruleset")]
        algorithm: AlgorithmKind,
        /// JSON ruleset file; overrides --algorithm, --size and --generations.
        #[arg(long)]
        ruleset: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        size: usize,
        #[arg(long, default_value_t = 100)]
        generations: u64,
        #[arg(long, value_enum, default_value_t = StartArg::Random)]
        start: StartArg,
        /// Fraction of living cells in a random start.
        #[arg(long, default_value_t = DEFAULT_DENSITY)]
        density: f32,
        /// Print the full result, snapshots included, as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Search the generated rule catalog and export the ranked results.
    Batch {
        /// JSON batch configuration; flags below override its fields.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        generations: Option<u64>,
        #[arg(long)]
        runs_per_ruleset: Option<usize>,
        #[arg(long)]
        max_rulesets: Option<usize>,
        #[arg(long)]
        no_random_start: bool,
        #[arg(long)]
        no_pattern_start: bool,
        /// Worker threads; defaults to one per core.
        #[arg(long, env = "CUBELAB_THREADS")]
        threads: Option<usize>,
        #[arg(short, long, default_value = "cubelab-batch.json")]
        output: PathBuf,
    },
    /// List the rulesets a batch search would explore.
    Rulesets {
        /// Only show rulesets whose name contains this text.
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StartArg {
    Random,
    Cluster,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            algorithm,
            ruleset,
            size,
            generations,
            start,
            density,
            json,
        } => {
            let ruleset = match ruleset {
                Some(path) => read_ruleset(&path)?,
                None => default_ruleset(algorithm, size, generations),
            };
            let start = match start {
                StartArg::Random => StartPattern::SparseRandom { density },
                StartArg::Cluster => StartPattern::CenteredCluster,
            };
            run_command(&ruleset, start, cli.seed, json)?;
        }
        Command::Batch {
            config,
            size,
            generations,
            runs_per_ruleset,
            max_rulesets,
            no_random_start,
            no_pattern_start,
            threads,
            output,
        } => {
            let mut batch = match config {
                Some(path) => read_batch_config(&path)?,
                None => cubelab_search::BatchSimulationConfig::default(),
            };
            batch.cube_size = size.unwrap_or(batch.cube_size);
            batch.max_generations = generations.unwrap_or(batch.max_generations);
            batch.runs_per_ruleset = runs_per_ruleset.unwrap_or(batch.runs_per_ruleset);
            batch.max_rulesets = max_rulesets.or(batch.max_rulesets);
            batch.rng_seed = cli.seed.or(batch.rng_seed);
            batch.include_random_start &= !no_random_start;
            batch.include_pattern_start &= !no_pattern_start;
            if let Some(threads) = threads {
                if threads == 0 {
                    bail!("--threads must be at least 1");
                }
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .context("failed to configure worker threads")?;
            }
            let result = run_batch(&batch).context("batch search failed")?;
            write_json(&result, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            print_batch(&result);
            println!("{} {}", "wrote".green().bold(), output.display());
        }
        Command::Rulesets { filter } => {
            let defaults = cubelab_search::BatchSimulationConfig::default();
            let rulesets = generate_rulesets(defaults.cube_size, defaults.max_generations);
            let mut shown = 0_usize;
            for ruleset in &rulesets {
                if filter
                    .as_deref()
                    .is_some_and(|needle| !ruleset.name.contains(needle))
                {
                    continue;
                }
                println!(
                    "{:<44} {}",
                    ruleset.name.bold(),
                    describe_algorithm(&ruleset.algorithm).dimmed()
                );
                shown += 1;
            }
            println!("{} of {} rulesets", shown.cyan(), rulesets.len());
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_command(
    ruleset: &cubelab_core::Ruleset,
    start: StartPattern,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    info!(ruleset = %ruleset.name, start = start.label(), ?seed, "running ruleset");
    let result = analyze(ruleset, start, seed)
        .with_context(|| format!("failed to run ruleset {}", ruleset.name))?;
    if json {
        let pretty =
            serde_json::to_string_pretty(&result).context("failed to format result JSON")?;
        println!("{pretty}");
    } else {
        print_result(&result);
    }
    Ok(())
}

fn classification_label(class: Classification) -> String {
    match class {
        Classification::Extinct => class.as_str().red().to_string(),
        Classification::Stable => class.as_str().blue().to_string(),
        Classification::Oscillating => class.as_str().magenta().to_string(),
        Classification::Glider => class.as_str().green().to_string(),
        Classification::Explosive => class.as_str().yellow().to_string(),
        Classification::Chaotic => class.as_str().cyan().to_string(),
    }
}

fn print_result(result: &SimulationResult) {
    let m = &result.metrics;
    println!(
        "{} {}",
        result.ruleset.name.bold().cyan(),
        describe_algorithm(&result.ruleset.algorithm).dimmed()
    );
    println!("{}", "-".repeat(64).dimmed());
    println!("{:<24} {}", "classification", classification_label(m.classification));
    println!("{:<24} {}", "interest score", m.interest_score.bold());
    println!("{:<24} {:?}", "status", result.status);
    println!("{:<24} {}", "generations", m.total_generations);
    println!(
        "{:<24} max {} / avg {:.1} / final {}",
        "population", m.max_population, m.avg_population, m.final_population
    );
    println!("{:<24} {:.2}", "changes per generation", m.avg_change_per_generation);
    println!("{:<24} {}", "colour diversity", m.color_diversity);
    match m.stability_generation {
        Some(generation) => println!("{:<24} {}", "stable from", generation),
        None => println!("{:<24} {}", "stable from", "never".dimmed()),
    }
    println!("{:<24} {}", "oscillation period", m.oscillation_period);
    println!("{:<24} {:.3}", "spatial distribution", m.spatial_distribution);
}

fn print_batch(batch: &BatchResult) {
    let summary = &batch.summary;
    println!(
        "{} {} rulesets, {} runs, mean score {:.1}",
        "batch".green().bold(),
        summary.total_rulesets,
        summary.total_runs,
        summary.average_interest_score
    );
    for class in Classification::ALL {
        let count = summary.classification_counts.get(&class).copied().unwrap_or(0);
        println!("  {:<24} {}", classification_label(class), count);
    }
    if summary.top_rulesets.is_empty() {
        println!("{}", "No runs completed".yellow());
        return;
    }
    println!(
        "{:<6} {:<44} {:<8} {}",
        "RANK".bold().cyan(),
        "RULESET".bold().cyan(),
        "SCORE".bold().cyan(),
        "CLASS".bold().cyan()
    );
    for (rank, entry) in summary.top_rulesets.iter().enumerate() {
        println!(
            "{:<6} {:<44} {:<8} {}",
            rank + 1,
            entry.ruleset_name,
            entry.interest_score,
            classification_label(entry.classification)
        );
    }
}
