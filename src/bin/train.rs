//! Command line tool to trigger training

use std::path::PathBuf;

use anyhow::anyhow;
use genre_classifier::{
    cli::{self, config::load_yaml, models::Model, pipelines::Pipeline, TrainingBackend},
    models::bert,
    pipelines::{feature_classification, text_classification},
    training::FitConfig,
    utils::device::{is_accelerator, select_device},
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: train PIPELINE [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use ('feature-classification' or 'text-classification')

Options:
  -h, --help           Print help
  -c, --config         A YAML file with training settings
  -d, --data           The feature table, or the article tree for text-classification
  -o, --artifact-dir   Where to save the trained model
  -m, --model          The encoder to fine-tune, or the one assumed for a feature table
                       saved without extraction settings
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size
  --dense              Use the dense head instead of the attention head
  --verbose            Log every evaluation batch
";

#[derive(Debug)]
struct Args {
    pipeline: String,
    config: Option<PathBuf>,
    data: Option<String>,
    artifact_dir: Option<String>,
    model: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    dense: bool,
    verbose: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            data: pargs.opt_value_from_str(["-d", "--data"])?,
            artifact_dir: pargs.opt_value_from_str(["-o", "--artifact-dir"])?,
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            dense: pargs.contains("--dense"),
            verbose: pargs.contains("--verbose"),
            pipeline: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: PIPELINE"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }

    fn model_name(&self) -> anyhow::Result<Option<String>> {
        self.model
            .as_deref()
            .map(|model| Ok(Model::try_from(model)?.to_string()))
            .transpose()
    }

    /// Apply the epoch overrides, enabling loss scaling on accelerators unless configured
    fn fit_config(&self, mut fit: FitConfig, accelerator: bool) -> FitConfig {
        if let Some(num_epochs) = self.num_epochs {
            fit.num_epochs = num_epochs;
        }

        if fit.loss_scaling.is_none() {
            fit.loss_scaling = Some(accelerator);
        }

        fit
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::init_logging();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let pipeline = Pipeline::try_from(args.pipeline.as_str())?;

    match pipeline {
        Pipeline::FeatureClassification => handle_feature_classification(&args).await,
        Pipeline::TextClassification => handle_text_classification(&args).await,
    }
}

async fn handle_feature_classification(args: &Args) -> anyhow::Result<()> {
    let defaults = feature_classification::training::Config::new();
    let mut config = match &args.config {
        Some(path) => load_yaml(&defaults, path)?,
        None => defaults,
    };

    if let Some(data) = &args.data {
        config.features_path = data.clone();
    }

    if let Some(artifact_dir) = &args.artifact_dir {
        config.artifact_dir = artifact_dir.clone();
    }

    if let Some(model) = args.model_name()? {
        config.encoder = model;
    }

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    if args.dense {
        config.use_attention = false;
    }

    config.verbose |= args.verbose;

    let device = select_device();
    config.fit = args.fit_config(config.fit.clone(), is_accelerator(&device));

    feature_classification::train::<TrainingBackend>(device, config).await?;

    Ok(())
}

async fn handle_text_classification(args: &Args) -> anyhow::Result<()> {
    if args.dense {
        return Err(anyhow!("--dense only applies to feature-classification"));
    }

    let defaults = text_classification::training::Config::new();
    let mut config = match &args.config {
        Some(path) => load_yaml(&defaults, path)?,
        None => defaults,
    };

    if let Some(data) = &args.data {
        config.data_dir = data.clone();
    }

    if let Some(artifact_dir) = &args.artifact_dir {
        config.artifact_dir = artifact_dir.clone();
    }

    if let Some(model) = args.model_name()? {
        config.model_name = model;
    }

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    config.verbose |= args.verbose;

    let device = select_device();
    config.fit = args.fit_config(config.fit.clone(), is_accelerator(&device));

    text_classification::training::run::<
        TrainingBackend,
        bert::text_classification::Model<TrainingBackend>,
    >(device, config)
    .await?;

    Ok(())
}
