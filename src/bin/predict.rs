//! Command line tool to predict the genre of article files

use std::path::PathBuf;

use anyhow::anyhow;
use futures::future::try_join_all;
use genre_classifier::{
    cli::{self, pipelines::Pipeline, InferenceBackend},
    models::bert,
    pipelines::{feature_classification, text_classification},
    utils::device::select_device,
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: predict PIPELINE [OPTIONS] FILE...

Arguments:
  PIPELINE             The pipeline to use ('feature-classification' or 'text-classification')
  FILE                 One or more article files

Options:
  -h, --help           Print help
  -a, --artifact-dir   The directory of a trained model (defaults to 'artifacts/PIPELINE')
";

#[derive(Debug)]
struct Args {
    pipeline: String,
    artifact_dir: Option<PathBuf>,
    files: Vec<PathBuf>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let artifact_dir = pargs.opt_value_from_str(["-a", "--artifact-dir"])?;

        let pipeline = pargs.free_from_str().map_err(|e| match e {
            pico_args::Error::MissingArgument => anyhow!("Missing required argument: PIPELINE"),
            _ => anyhow!("{}", e),
        })?;

        let files: Vec<PathBuf> = pargs.finish().into_iter().map(PathBuf::from).collect();
        if files.is_empty() {
            return Err(anyhow!("Missing required argument: FILE"));
        }

        Ok(Some(Args {
            pipeline,
            artifact_dir,
            files,
        }))
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

    let artifact_dir = args
        .artifact_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("artifacts/{}", pipeline)));

    let samples = try_join_all(args.files.iter().map(tokio::fs::read_to_string)).await?;

    let device = select_device();

    let predictions = match pipeline {
        Pipeline::FeatureClassification => {
            feature_classification::infer::<InferenceBackend>(device, &artifact_dir, samples)
                .await?
        }
        Pipeline::TextClassification => {
            text_classification::infer::<
                InferenceBackend,
                bert::text_classification::Model<InferenceBackend>,
            >(device, &artifact_dir, samples)
            .await?
        }
    };

    for (file, prediction) in args.files.iter().zip(predictions) {
        println!(
            "{}\t{}\t{:.4}",
            file.display(),
            prediction.label,
            prediction.probability
        );
    }

    Ok(())
}
