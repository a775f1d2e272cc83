use std::path::Path;

use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};

use crate::{
    datasets::{Article, ArticleDataset, LoadableDataset},
    training::{
        artifacts::{CONFIG_FILE, TRAINING_FILE},
        criterion, evaluate, fit, Artifacts, Evaluation, FitConfig,
    },
    utils::{
        classes::class_weights,
        hugging_face::{download_hf_model, load_tokenizer},
        split::train_test_split,
    },
};

use super::{Batcher, Item, Model, ModelConfig};

/// Settings for fine-tuning an encoder end to end
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// The `<category>/<file>` article tree
    #[config(default = "\"articles\".to_string()")]
    pub data_dir: String,

    /// Where the fine-tuned model is saved
    #[config(default = "\"artifacts/text-classification\".to_string()")]
    pub artifact_dir: String,

    /// Model name (e.g., "bert-base-uncased")
    #[config(default = "\"bert-base-uncased\".to_string()")]
    pub model_name: String,

    /// Maximum sequence length
    #[config(default = 512)]
    pub max_seq_length: usize,

    /// Batch size
    #[config(default = 1)]
    pub batch_size: usize,

    /// Dropout between the encoder and the classifier
    #[config(default = 0.2)]
    pub classifier_dropout: f64,

    /// Share of the articles held out for evaluation
    #[config(default = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/test split and shuffling
    #[config(default = 42)]
    pub seed: u64,

    /// Shuffle the training batches every epoch
    #[config(default = true)]
    pub shuffle: bool,

    /// Weight the loss by inverse class frequency
    #[config(default = false)]
    pub class_weighted: bool,

    /// Data loader workers
    #[config(default = 1)]
    pub num_workers: usize,

    /// The epoch loop
    #[config(
        default = "FitConfig::new().with_num_epochs(10).with_learning_rate(2e-5).with_plateau_factor(0.31622776601683794).with_plateau_patience(3)"
    )]
    pub fit: FitConfig,

    /// Log every evaluation batch
    #[config(default = false)]
    pub verbose: bool,
}

/// Load the article tree named in the config, split it and fine-tune on it
pub async fn run<B, M>(device: B::Device, config: Config) -> anyhow::Result<Evaluation>
where
    B: AutodiffBackend,
    M: Model<B> + AutodiffModule<B>,
    M::InnerModule: Model<B::InnerBackend>,
{
    let dataset = ArticleDataset::load(Path::new(&config.data_dir)).await?;
    let labels = dataset.categories();

    let split = train_test_split(dataset.len(), config.test_fraction, config.seed);
    let (dataset_train, dataset_test) = dataset.partition(&split.train, &split.test);

    if dataset_train.is_empty() || dataset_test.is_empty() {
        return Err(anyhow!(
            "Not enough articles to split: {} train, {} test",
            dataset_train.len(),
            dataset_test.len()
        ));
    }

    train::<B, M, Article, ArticleDataset>(device, dataset_train, dataset_test, labels, config)
        .await
}

/// Fine-tune a pretrained model on the given datasets and save it
pub async fn train<B, M, I, D>(
    device: B::Device, // Device on which to perform computation (e.g., CPU or CUDA device)
    dataset_train: D,  // Training dataset
    dataset_test: D,   // Testing dataset
    labels: Vec<String>, // Class labels, in class id order
    config: Config,    // Experiment configuration
) -> anyhow::Result<Evaluation>
where
    B: AutodiffBackend,
    M: Model<B> + AutodiffModule<B>,
    M::InnerModule: Model<B::InnerBackend>,
    I: Item + 'static,
    D: Dataset<I> + 'static,
{
    let files = download_hf_model(&config.model_name).await?;

    let model_config = M::Config::load_pretrained(
        &files.config,
        &labels,
        config.max_seq_length,
        config.classifier_dropout,
    )
    .map_err(|e| anyhow!("Unable to load pre-trained model config file: {}", e))?;

    let model = M::load_from_safetensors(&device, &files.weights, &model_config)?;

    // Initialize tokenizer
    let tokenizer = load_tokenizer(&files.tokenizer)?;

    // Initialize batchers for training and testing data
    let batcher_train =
        Batcher::<B>::new(tokenizer.clone(), model_config.get_config(), device.clone())?;
    let batcher_test =
        Batcher::<B::InnerBackend>::new(tokenizer, model_config.get_config(), device.clone())?;

    let class_weights = config.class_weighted.then(|| {
        let class_ids: Vec<usize> = dataset_train
            .iter()
            .filter_map(|item| batcher_train.class_id(item.class_label()))
            .collect();

        class_weights(&class_ids, labels.len())
    });

    log::info!(
        "Fine-tuning {} on {} articles, evaluating on {}",
        config.model_name,
        dataset_train.len(),
        dataset_test.len()
    );

    // Initialize data loaders for training and testing data
    let mut builder_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers);

    if config.shuffle {
        builder_train = builder_train.shuffle(config.seed);
    }

    let dataloader_train = builder_train.build(dataset_train);

    let dataloader_test = DataLoaderBuilder::new(batcher_test)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_test);

    let optimizer = AdamConfig::new().init::<B, M>();

    let (model, history) = fit::<B, M, _, _, _>(
        model,
        optimizer,
        dataloader_train,
        dataloader_test.clone(),
        class_weights,
        &config.fit,
        &device,
    )?;

    let evaluation = evaluate(
        &model.valid(),
        &dataloader_test,
        &criterion::<B::InnerBackend>(None, &device),
        config.verbose,
    )?;

    log::info!(
        "Test accuracy: {:.2}% ({}/{}), test loss: {:.4}",
        evaluation.accuracy,
        evaluation.correct,
        evaluation.total,
        evaluation.loss
    );

    // Save the configuration and the trained model
    let artifacts = Artifacts::create(&config.artifact_dir)?;
    artifacts.save_config(CONFIG_FILE, &model_config)?;
    artifacts.save_config(TRAINING_FILE, &config)?;
    artifacts.save_history(&history)?;
    artifacts.save_model::<B, M>(model)?;

    Ok(evaluation)
}
