//! Probate CLI - builds will models and executes them.
//!
//! # Architecture
//!
//! Two subcommands cover the pipeline:
//!
//! ```text
//! extractions.json --build--> will.json --devolve--> report.json
//!                                            ^
//!                                     people_db.json
//! ```
//!
//! `build` is pure local work. `devolve` additionally needs a configured
//! oracle (an OpenAI-compatible chat endpoint) for rule classification and
//! asset matching; see `probate_config` for the config file format.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use probate_config::{DEFAULT_API_KEY_VAR, ProbateConfig};
use probate_engine::{ChecksumPolicy, DevolveOptions, PopulationStore, build_will_model, devolve};
use probate_oracle::{HttpOracle, Oracle, RetryConfig, RuleClassifier, SimilarityJudge};
use probate_types::{ExtractionsDoc, WillModel};

#[derive(Parser)]
#[command(name = "probate", about = "Executes wills against a population database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a will model against a population database
    Devolve {
        /// Path to the will model JSON
        #[arg(short, long)]
        will: PathBuf,

        /// Path to the population database JSON
        #[arg(short, long)]
        population: PathBuf,

        /// Write the devolution report to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Refuse to execute a will whose checksum does not verify
        #[arg(long)]
        enforce_checksum: bool,
    },

    /// Build a will model from a text-extractions document
    Build {
        /// Path to the text-extractions JSON
        #[arg(short = 't', long)]
        extractions: PathBuf,

        /// Write the will model to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Echo each directive's serialized text while building
        #[arg(short, long)]
        serialize: bool,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Devolve {
            will,
            population,
            out,
            enforce_checksum,
        } => run_devolve(&will, &population, out.as_deref(), enforce_checksum).await,
        Commands::Build {
            extractions,
            out,
            serialize,
        } => run_build(&extractions, out.as_deref(), serialize),
    }
}

async fn run_devolve(
    will_path: &Path,
    population_path: &Path,
    out: Option<&Path>,
    enforce_checksum: bool,
) -> Result<()> {
    let config = ProbateConfig::load().unwrap_or_default();

    let will_json = fs::read_to_string(will_path)
        .with_context(|| format!("could not read will model at {}", will_path.display()))?;
    let will: WillModel =
        serde_json::from_str(&will_json).context("will model is not valid JSON")?;
    let store = PopulationStore::load(population_path)?;

    let Some(api_key) = config.api_key() else {
        bail!(
            "no oracle API key configured; set {DEFAULT_API_KEY_VAR} or add oracle.api_key \
             to the config file"
        );
    };
    let mut http = HttpOracle::new(config.endpoint(), config.model(), api_key);
    if let Some(max_retries) = config.max_retries() {
        http = http.with_retry(RetryConfig {
            max_retries,
            ..RetryConfig::default()
        });
    }
    let oracle: Arc<dyn Oracle> = Arc::new(http);

    let classifier = RuleClassifier::new(oracle.clone())
        .with_quorum(config.quorum())
        .with_parse_retries(config.parse_retries())
        .with_region(config.region());
    let judge = SimilarityJudge::new(oracle).with_parse_retries(config.parse_retries());

    let options = DevolveOptions {
        checksum_policy: if enforce_checksum || config.enforce_checksum() {
            ChecksumPolicy::Enforce
        } else {
            ChecksumPolicy::Warn
        },
        testator_alive_check: config.testator_alive_check(),
    };

    let report = devolve(&will, &store, &classifier, &judge, &options).await?;
    write_output(out, &report.to_json_pretty()?, "devolution report")?;

    let skipped = report.directives.len() - report.executed_count();
    if skipped > 0 {
        tracing::warn!(
            executed = report.executed_count(),
            skipped,
            "Some directives could not be executed; see the report"
        );
    }
    Ok(())
}

fn run_build(extractions_path: &Path, out: Option<&Path>, serialize: bool) -> Result<()> {
    let json = fs::read_to_string(extractions_path).with_context(|| {
        format!(
            "could not read extractions document at {}",
            extractions_path.display()
        )
    })?;
    let doc: ExtractionsDoc =
        serde_json::from_str(&json).context("extractions document is not valid JSON")?;
    let model = build_will_model(&doc)?;

    if serialize {
        for directive in &model.directives {
            println!("{}", directive.serialized_text);
        }
    }

    write_output(out, &serde_json::to_string_pretty(&model)?, "will model")
}

fn write_output(out: Option<&Path>, json: &str, what: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("could not write {what} to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote {what}");
        }
        None => println!("{json}"),
    }
    Ok(())
}
