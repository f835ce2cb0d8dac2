use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod log;
mod model;
mod render;
mod report;
mod run;
mod table;
mod theory;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "benchscope")]
#[command(about = "Benchmark runner, log aggregator and chart renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every module's benchmarks and merge their output logs.
    Run {
        #[arg(long)]
        config: PathBuf,

        /// Iterations per module (or per benchmark with --split).
        #[arg(long)]
        repeat: Option<usize>,

        /// Concurrent benchmark processes.
        #[arg(short = 'j', long)]
        jobs: Option<usize>,

        /// Benchmark name pattern.
        #[arg(long)]
        bench: Option<String>,

        /// Run each discovered benchmark as its own process.
        #[arg(long)]
        split: bool,
    },

    /// Parse merged logs, write summary tables and render charts.
    Report {
        #[arg(long)]
        config: PathBuf,

        #[arg(short = 'o', long, default_value = "parsed")]
        out: PathBuf,
    },

    /// Print predicted build success for a signature width.
    Theory {
        /// Maximum key width in bits.
        #[arg(long)]
        key_width: u32,

        /// Signature width in bits.
        #[arg(long)]
        signature_width: u32,

        /// Key counts, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        keys: Vec<u64>,

        #[arg(long, default_value_t = theory::DEFAULT_REBUILD_ATTEMPTS)]
        attempts: u32,

        /// Also print the signature width a relative trie with this many
        /// delimiters would pick for each key count.
        #[arg(long)]
        delimiters: Option<u64>,

        /// Render the predictions as a line chart.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run {
            config,
            repeat,
            jobs,
            bench,
            split,
        } => {
            let overrides = config::Overrides {
                repeat,
                jobs,
                bench,
                split,
            };
            let cfg = config::load_validated(&config, &overrides)?;
            let summary = run::run_all(&cfg)?;
            for m in &summary.modules {
                println!(
                    "{}: {} succeeded, {} failed -> {}",
                    m.name,
                    m.succeeded,
                    m.failed,
                    m.out.display()
                );
            }
            println!(
                "Total: {} succeeded, {} failed",
                summary.succeeded(),
                summary.failed()
            );
        }

        Commands::Report { config, out } => {
            let cfg = config::load_validated(&config, &config::Overrides::default())?;
            let summary = report::build_report(&cfg, &out)?;
            if summary.records == 0 {
                anyhow::bail!("no usable benchmark records found in {} module log(s)", cfg.modules.len());
            }
            println!(
                "Parsed {} records into {} groups ({} memory reports, {} skipped lines, {} noisy)",
                summary.records, summary.groups, summary.mem_reports, summary.skipped, summary.noisy
            );
            println!("Wrote {} charts and tables to {}", summary.charts, out.display());
        }

        Commands::Theory {
            key_width,
            signature_width,
            keys,
            attempts,
            delimiters,
            out,
        } => {
            println!(
                "w={key_width} S={signature_width} checks/query={} per-query failure={:.3e}",
                theory::signature_checks(key_width),
                theory::query_failure_probability(key_width, signature_width)
            );
            for &n in &keys {
                let p = theory::build_success_probability(n, key_width, signature_width, attempts);
                match delimiters.and_then(|d| theory::relative_trie_signature_bits(key_width, n, d)) {
                    Some(s) => println!("n={n} success={p:.6} relative_trie_S={s}"),
                    None => println!("n={n} success={p:.6}"),
                }
            }
            if let Some(path) = out {
                let series = theory::theory_series(
                    format!("w={key_width} S={signature_width}"),
                    &keys,
                    key_width,
                    signature_width,
                    attempts,
                );
                let labels = render::Labels::new("Predicted Build Success", "Keys (N)", "Success probability");
                let chart = render::render_line_chart(&labels, &[series], true, false)?;
                if render::write_chart(&path, &chart)? {
                    println!("Wrote {}", path.display());
                }
            }
        }
    }

    Ok(())
}
