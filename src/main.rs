use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use blackspot_data::{explore, EncoderSet, RecordReader, Schema, SeverityPredictor};
use blackspot_rf::{
    ClassificationReport, ConfusionMatrix, HoldoutSplit, RandomForestConfig,
};

mod chart;

use chart::{ConfusionGrid, FrequencyChart, ImportanceChart};

const MODEL_FILE: &str = "rf_model.bin";
const ENCODERS_FILE: &str = "encoders.bin";

#[derive(Parser)]
#[command(name = "blackspot")]
#[command(about = "Road accident severity classification with Random Forests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Chart the value distributions of every column in the dataset
    Explore {
        /// Path to the accident records CSV file
        #[arg(long)]
        data: PathBuf,

        /// Fallback CSV path, tried when --data cannot be opened
        #[arg(long)]
        fallback: Option<PathBuf>,

        /// Target (severity) column name
        #[arg(long, default_value = "Accident_severity")]
        target: String,

        /// Junction-type column, given its own top-10 chart when present
        #[arg(long, default_value = "Types_of_Junction")]
        junction_column: String,

        /// Number of most-frequent values to chart per column
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Train a severity classifier and persist the model and encoders
    Train {
        /// Path to the accident records CSV file
        #[arg(long)]
        data: PathBuf,

        /// Fallback CSV path, tried when --data cannot be opened
        #[arg(long)]
        fallback: Option<PathBuf>,

        /// Target (severity) column name
        #[arg(long, default_value = "Accident_severity")]
        target: String,

        /// Output directory for the model and encoders binaries
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Number of trees in the Random Forest
        #[arg(long, default_value_t = 100)]
        n_trees: usize,

        /// Maximum tree depth (unlimited if not set)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
    },

    /// Predict severity for one accident from raw column values
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the fitted encoders binary
        #[arg(long)]
        encoders: PathBuf,

        /// Feature values as Column=Value pairs, one per feature
        #[arg(long = "input", value_name = "COLUMN=VALUE")]
        inputs: Vec<String>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ExploreOutput {
    n_rows: usize,
    n_columns: usize,
    target: String,
    target_classes: usize,
}

#[derive(Serialize)]
struct TrainOutput {
    n_rows: usize,
    n_features: usize,
    n_classes: usize,
    n_trees: usize,
    n_train: usize,
    n_test: usize,
    test_accuracy: f64,
    model_path: PathBuf,
    encoders_path: PathBuf,
    example_input: HashMap<String, String>,
    example_prediction: String,
}

#[derive(Serialize)]
struct PredictOutput {
    prediction: String,
    probabilities: Vec<ClassProbability>,
}

#[derive(Serialize)]
struct ClassProbability {
    class: String,
    probability: f64,
}

/// Parse one `Column=Value` argument.
fn parse_input_pair(pair: &str) -> Result<(String, String)> {
    let (column, value) = pair
        .split_once('=')
        .with_context(|| format!("invalid input \"{pair}\" (expected COLUMN=VALUE)"))?;
    Ok((column.to_string(), value.to_string()))
}

fn read_records(data: &PathBuf, fallback: Option<&PathBuf>) -> Result<blackspot_data::RecordDataset> {
    let mut reader = RecordReader::new(data);
    if let Some(fallback) = fallback {
        reader = reader.with_fallback(fallback);
    }
    reader.read().context("failed to read records CSV")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Explore {
            data,
            fallback,
            target,
            junction_column,
            top,
        } => {
            let dataset = read_records(&data, fallback.as_ref())?;
            info!(n_rows = dataset.n_rows(), "dataset loaded");

            let target_counts = explore::frequency_counts(&dataset, &target)
                .context("failed to count target values")?;
            print!("{}", FrequencyChart::new(&target, &target_counts, 40).render());
            println!();

            for column in dataset.columns() {
                if column == &target {
                    continue;
                }
                let counts = explore::top_k(&dataset, column, top)?;
                print!("{}", FrequencyChart::new(column, &counts, 40).render());
                println!();
            }

            // Junction shape is the classic blackspot indicator and gets
            // its own top-10 chart.
            if dataset.column_index(&junction_column).is_ok() {
                let counts = explore::top_k(&dataset, &junction_column, 10)?;
                print!(
                    "{}",
                    FrequencyChart::new(
                        &format!("{junction_column} (top 10)"),
                        &counts,
                        40
                    )
                    .render()
                );
                println!();
            }

            let output = ExploreOutput {
                n_rows: dataset.n_rows(),
                n_columns: dataset.n_columns(),
                target,
                target_classes: target_counts.len(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Train {
            data,
            fallback,
            target,
            output_dir,
            n_trees,
            max_depth,
            test_fraction,
        } => {
            // 1. Load and encode
            let dataset = read_records(&data, fallback.as_ref())?;
            info!(n_rows = dataset.n_rows(), "dataset loaded");

            let schema = Schema::from_dataset(&dataset, &target)?;
            let encoders = EncoderSet::fit(&dataset, &schema)?;
            let (features, labels) = encoders.encode_dataset(&dataset)?;

            // 2. Stratified holdout split
            let split = HoldoutSplit::new(test_fraction)?
                .with_seed(cli.seed)
                .split(&features, &labels)
                .context("holdout split failed")?;
            info!(
                n_train = split.n_train(),
                n_test = split.n_test(),
                "stratified split complete"
            );

            // 3. Train on the training partition
            let result = RandomForestConfig::new(n_trees)?
                .with_max_depth(max_depth)
                .with_seed(cli.seed)
                .fit(&split.train_features, &split.train_labels, &encoders.feature_names())
                .context("training failed")?;

            // 4. Evaluate on held-out rows
            let predictions = result.forest().predict_batch(&split.test_features)?;
            let cm = ConfusionMatrix::from_labels(
                &split.test_labels,
                &predictions,
                encoders.target().n_classes(),
            )?;
            let report = ClassificationReport::from_confusion(&cm, encoders.target().classes())?;
            info!(test_accuracy = cm.accuracy(), "evaluation complete");

            println!("{report}");
            print!("{}", ConfusionGrid::new(&cm, encoders.target().classes()).render());
            println!();
            print!("{}", ImportanceChart::new(result.importances(), 10, 40).render());
            println!();

            // 5. Persist both artifacts
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            let model_path = output_dir.join(MODEL_FILE);
            let encoders_path = output_dir.join(ENCODERS_FILE);
            result.forest().save(&model_path).context("failed to save model")?;
            encoders.save(&encoders_path).context("failed to save encoders")?;
            info!(
                model = %model_path.display(),
                encoders = %encoders_path.display(),
                "artifacts saved"
            );

            // 6. Sanity prediction from each column's most frequent value
            let mut example_input = HashMap::new();
            for column in schema.feature_columns() {
                example_input.insert(column.clone(), explore::column_mode(&dataset, column)?);
            }
            let predictor = SeverityPredictor::new(result.forest().clone(), encoders)?;
            let example_prediction = predictor
                .predict(&example_input)
                .context("example prediction failed")?;
            info!(prediction = %example_prediction, "example prediction from modal values");

            // 7. Print summary
            let output = TrainOutput {
                n_rows: dataset.n_rows(),
                n_features: schema.n_features(),
                n_classes: predictor.encoders().target().n_classes(),
                n_trees,
                n_train: split.n_train(),
                n_test: split.n_test(),
                test_accuracy: cm.accuracy(),
                model_path,
                encoders_path,
                example_input,
                example_prediction,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            encoders,
            inputs,
        } => {
            let predictor = SeverityPredictor::from_files(&model, &encoders)
                .context("failed to load model artifacts")?;

            let input: HashMap<String, String> = inputs
                .iter()
                .map(|pair| parse_input_pair(pair))
                .collect::<Result<_>>()?;

            let (prediction, proba) = predictor
                .predict_with_proba(&input)
                .context("prediction failed")?;
            info!(prediction = %prediction, "severity predicted");

            let output = PredictOutput {
                prediction,
                probabilities: proba
                    .into_iter()
                    .map(|(class, probability)| ClassProbability { class, probability })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
