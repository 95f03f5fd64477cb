use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use divergence::data::filter::{drop_empty_analytes, retain_analytes};
use divergence::data::loader::load_file;
use divergence::data::writer::{write_probabilities_csv, write_ranges_csv, write_table_csv};
use divergence::{
    negative_only, positive_only, probabilities_with, Config, DivergenceModel, MissingPolicy,
    Over, Table,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Learn per-analyte normal ranges from a reference population and flag
/// divergent measurements.
#[derive(Parser, Debug)]
#[command(name = "divergence", version)]
#[command(after_help = "\
Examples:
  divergence ranges reference.csv                        Print learned ranges
  divergence fit reference.parquet --model model.json    Save a model
  divergence transform cohort.csv --model model.json     Divergence matrix
  divergence probabilities cohort.csv --train reference.csv --over positive")]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Learn ranges from a reference population and write them as CSV
    Ranges {
        /// Reference population (.csv, .json or .parquet)
        train: PathBuf,

        #[command(flatten)]
        params: FitParams,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Learn ranges and save the model as JSON
    Fit {
        /// Reference population (.csv, .json or .parquet)
        train: PathBuf,

        #[command(flatten)]
        params: FitParams,

        /// Where to write the model
        #[arg(long)]
        model: PathBuf,
    },

    /// Label every measurement of a table as -1 / 0 / +1
    Transform {
        /// Table to classify
        input: PathBuf,

        #[command(flatten)]
        source: ModelSource,

        /// Drop analytes the model was not trained on instead of failing
        #[arg(long)]
        align: bool,

        /// Keep only one direction of divergence
        #[arg(long, value_enum)]
        only: Option<Direction>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-analyte probability of divergence across a table
    Probabilities {
        /// Table to classify
        input: PathBuf,

        #[command(flatten)]
        source: ModelSource,

        /// Drop analytes the model was not trained on instead of failing
        #[arg(long)]
        align: bool,

        /// absolute, positive or negative
        #[arg(long)]
        over: Option<Over>,

        /// How missing cells count: non-divergent or exclude
        #[arg(long)]
        missing: Option<MissingPolicy>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Fitting parameters; flags override the config file.
#[derive(Args, Debug)]
pub struct FitParams {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower percentile (default 0.025)
    #[arg(long)]
    lower: Option<f64>,

    /// Upper percentile (default 0.975)
    #[arg(long)]
    upper: Option<f64>,

    /// Quantize each individual's profile before fitting
    #[arg(long)]
    quantize: bool,

    /// Skip analytes with no observations instead of failing
    #[arg(long)]
    drop_empty: bool,
}

/// Either a saved model or a reference population to fit one from.
#[derive(Args, Debug)]
pub struct ModelSource {
    /// Reference population to fit a model from
    #[arg(long, required_unless_present = "model", conflicts_with = "model")]
    train: Option<PathBuf>,

    /// Previously saved model (see `fit`)
    #[arg(long)]
    model: Option<PathBuf>,

    #[command(flatten)]
    params: FitParams,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Direction {
    Positive,
    Negative,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ranges {
            train,
            params,
            output,
        } => {
            let model = fit_from_file(&train, &params)?;
            write_ranges_csv(model.ranges(), open_output(output.as_deref())?)
        }
        Commands::Fit {
            train,
            params,
            model: model_path,
        } => {
            let model = fit_from_file(&train, &params)?;
            let json = model.to_json().context("serialising model")?;
            std::fs::write(&model_path, json)
                .with_context(|| format!("writing model to {}", model_path.display()))?;
            log::info!(
                "saved {} analyte ranges to {}",
                model.ranges().len(),
                model_path.display()
            );
            Ok(())
        }
        Commands::Transform {
            input,
            source,
            align,
            only,
            output,
        } => {
            let model = resolve_model(&source)?;
            let table = load_input(&input, &model, align)?;
            let matrix = model.transform(&table, model.quantize())?;
            let matrix = match only {
                Some(Direction::Positive) => positive_only(&matrix),
                Some(Direction::Negative) => negative_only(&matrix),
                None => matrix,
            };
            write_table_csv(matrix.as_table(), open_output(output.as_deref())?)
        }
        Commands::Probabilities {
            input,
            source,
            align,
            over,
            missing,
            output,
        } => {
            let aggregation = load_config(&source.params)?.aggregation;
            let over = over.unwrap_or(aggregation.over);
            let missing = missing.unwrap_or(aggregation.missing);

            let model = resolve_model(&source)?;
            let table = load_input(&input, &model, align)?;
            let matrix = model.transform(&table, model.quantize())?;
            let probs = probabilities_with(&matrix, over, missing)?;
            write_probabilities_csv(&probs, open_output(output.as_deref())?)
        }
    }
}

fn load_config(params: &FitParams) -> Result<Config> {
    let mut config = match &params.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(lower) = params.lower {
        config.model.lower_pct = lower;
    }
    if let Some(upper) = params.upper {
        config.model.upper_pct = upper;
    }
    if params.quantize {
        config.model.quantize = true;
    }
    Ok(config)
}

fn fit_from_file(train: &Path, params: &FitParams) -> Result<DivergenceModel> {
    let config = load_config(params)?;
    let mut table = load_file(train)?;
    if params.drop_empty {
        table = drop_empty_analytes(&table).0;
    }
    DivergenceModel::fit(&table, &config.model)
        .with_context(|| format!("fitting ranges on {}", train.display()))
}

fn resolve_model(source: &ModelSource) -> Result<DivergenceModel> {
    match (&source.model, &source.train) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading model {}", path.display()))?;
            DivergenceModel::from_json(&text)
                .with_context(|| format!("parsing model {}", path.display()))
        }
        (None, Some(train)) => fit_from_file(train, &source.params),
        (None, None) => anyhow::bail!("either --model or --train is required"),
    }
}

fn load_input(path: &Path, model: &DivergenceModel, align: bool) -> Result<Table> {
    let table = load_file(path)?;
    if align {
        Ok(retain_analytes(&table, model.analytes()))
    } else {
        Ok(table)
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("creating {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
