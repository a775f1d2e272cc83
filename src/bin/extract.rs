//! Command line tool to extract pooled encoder features from an article tree

use std::path::PathBuf;

use anyhow::anyhow;
use genre_classifier::{
    cli::{self, config::load_yaml, models::Model, InferenceBackend},
    pipelines::feature_extraction,
    utils::device::select_device,
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: extract [OPTIONS]

Options:
  -h, --help           Print help
  -c, --config         A YAML file with extraction settings
  -d, --data-dir       The article tree, one directory per category (defaults to 'articles')
  -o, --output         The feature table to write (defaults to 'features.csv')
  -m, --model          The encoder to use (e.g., 'bert-base-uncased')
  -b, --batch-size     Articles encoded per forward pass
  -s, --stopwords      A stopword file, one word per line, replacing the English list
";

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    data_dir: Option<String>,
    output: Option<String>,
    model: Option<String>,
    batch_size: Option<usize>,
    stopwords: Option<String>,
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
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            output: pargs.opt_value_from_str(["-o", "--output"])?,
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            stopwords: pargs.opt_value_from_str(["-s", "--stopwords"])?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }

        Ok(Some(args))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::init_logging();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let defaults = feature_extraction::Config::new();
    let mut config = match &args.config {
        Some(path) => load_yaml(&defaults, path)?,
        None => defaults,
    };

    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    if let Some(output) = args.output {
        config.output = output;
    }

    if let Some(model) = args.model {
        config.model_name = Model::try_from(model.as_str())?.to_string();
    }

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    if let Some(stopwords) = args.stopwords {
        config.stopwords = Some(stopwords);
    }

    let device = select_device();

    feature_extraction::extract::<InferenceBackend>(device, &config).await?;

    Ok(())
}
