use std::{path::Path, sync::Arc};

use burn::{
    config::Config as _,
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::InMemDataset,
    },
    module::AutodiffModule,
    optim::AdamWConfig,
    tensor::backend::AutodiffBackend,
};

use crate::{
    datasets::{FeatureTable, LoadableDataset},
    models::heads::{AttentionClassifierConfig, DenseClassifierConfig, HeadConfig},
    pipelines::feature_extraction::Provenance,
    training::{
        artifacts::{CONFIG_FILE, TRAINING_FILE},
        criterion, evaluate, fit, Artifacts, Classifier, Evaluation, FitConfig,
    },
    utils::{
        classes::{class_weights, LabelEncoder},
        scaling::FeatureScaler,
        split::{select, train_test_split},
    },
};

use super::{
    batcher::{Item, Train},
    Batcher, ModelConfig,
};

/// Settings for training a head on extracted features
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// The feature table written by extraction
    #[config(default = "\"features.csv\".to_string()")]
    pub features_path: String,

    /// Where the trained head is saved
    #[config(default = "\"artifacts/feature-classification\".to_string()")]
    pub artifact_dir: String,

    /// The encoder assumed for a table saved without extraction settings
    #[config(default = "\"bert-base-uncased\".to_string()")]
    pub encoder: String,

    /// The maximum sequence length assumed for a table saved without extraction settings
    #[config(default = 512)]
    pub max_seq_length: usize,

    /// Batch size
    #[config(default = 128)]
    pub batch_size: usize,

    /// Put a self-attention block in front of the dense layers
    #[config(default = true)]
    pub use_attention: bool,

    /// Widths of the hidden layers
    #[config(default = "vec![64, 128, 256, 512, 1024, 2048, 4096]")]
    pub hidden_sizes: Vec<usize>,

    /// Number of attention heads
    #[config(default = 3)]
    pub n_heads: usize,

    /// Width of each attention head, defaulting to the feature width divided by `n_heads`
    pub embed_size: Option<usize>,

    /// Dropout probability
    #[config(default = 0.2)]
    pub dropout: f64,

    /// Share of the table held out for evaluation
    #[config(default = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/test split and shuffling
    #[config(default = 33)]
    pub seed: u64,

    /// Weight the loss by inverse class frequency
    #[config(default = true)]
    pub class_weighted: bool,

    /// Shuffle the training batches every epoch
    #[config(default = false)]
    pub shuffle: bool,

    /// AdamW weight decay
    #[config(default = 1e-2)]
    pub weight_decay: f32,

    /// Data loader workers
    #[config(default = 1)]
    pub num_workers: usize,

    /// The epoch loop
    #[config(
        default = "FitConfig::new().with_num_epochs(100).with_learning_rate(3e-3).with_plateau_factor(0.31622776601683794).with_plateau_patience(16)"
    )]
    pub fit: FitConfig,

    /// Log every evaluation batch
    #[config(default = false)]
    pub verbose: bool,
}

impl Config {
    /// Extraction settings built from `encoder` and `max_seq_length`, with the English stopwords
    pub fn assumed_provenance(&self) -> Provenance {
        Provenance::new(self.encoder.clone(), self.max_seq_length)
    }

    /// The head to build for the given feature width and number of classes
    pub fn head_config(&self, n_inputs: usize, n_outputs: usize) -> HeadConfig {
        if self.use_attention {
            let embed_size = self
                .embed_size
                .unwrap_or(n_inputs / self.n_heads.max(1));

            HeadConfig::Attention(
                AttentionClassifierConfig::new(
                    n_inputs,
                    n_outputs,
                    embed_size,
                    self.hidden_sizes.clone(),
                )
                .with_n_heads(self.n_heads)
                .with_dropout(self.dropout),
            )
        } else {
            HeadConfig::Dense(
                DenseClassifierConfig::new(n_inputs, n_outputs, self.hidden_sizes.clone())
                    .with_dropout(self.dropout),
            )
        }
    }
}

/// Encoded, normalized and split training data
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Training items
    pub train: Vec<Item>,

    /// Held-out items
    pub test: Vec<Item>,

    /// The category mapping
    pub encoder: LabelEncoder,

    /// The normalization fitted on the whole table
    pub scaler: FeatureScaler,

    /// Per-class loss weights, when enabled
    pub class_weights: Option<Vec<f32>>,
}

/// Encode labels, normalize features and split the table
pub fn prepare(table: &FeatureTable, config: &Config) -> anyhow::Result<Prepared> {
    let categories = table.categories();
    let encoder = LabelEncoder::fit(&categories);
    let labels = encoder.encode_all(&categories)?;

    let features = table.features();
    let scaler = FeatureScaler::fit(&features);
    let items: Vec<Item> = scaler
        .transform(&features)
        .into_iter()
        .zip(labels.iter())
        .map(|(features, label)| Item::new(features, *label))
        .collect();

    let split = train_test_split(items.len(), config.test_fraction, config.seed);

    let class_weights = config
        .class_weighted
        .then(|| class_weights(&labels, encoder.len()));

    Ok(Prepared {
        train: select(&items, &split.train),
        test: select(&items, &split.test),
        encoder,
        scaler,
        class_weights,
    })
}

/// Train a head on the feature table named in the config and save it
pub async fn train<B: AutodiffBackend>(
    device: B::Device,
    config: Config,
) -> anyhow::Result<Evaluation> {
    let features_path = Path::new(&config.features_path);
    let table = FeatureTable::load(features_path).await?;
    let provenance = load_provenance(features_path, &config)?;

    train_on_table::<B>(device, &table, &provenance, &config)
}

/// Read the extraction settings saved next to a feature table.
///
/// Tables without them are assumed to come from `config.encoder` with the English stopwords.
pub fn load_provenance(features_path: &Path, config: &Config) -> anyhow::Result<Provenance> {
    let path = Provenance::path_for(features_path);

    if !path.exists() {
        log::warn!(
            "No extraction settings at {}, assuming {} with the English stopwords",
            path.display(),
            config.encoder
        );

        return Ok(config.assumed_provenance());
    }

    let provenance = Provenance::load(&path)
        .map_err(|e| anyhow!("Unable to load extraction settings {}: {}", path.display(), e))?;

    if provenance.model_name != config.encoder {
        log::warn!(
            "{} was extracted with {}, not {}; using {}",
            features_path.display(),
            provenance.model_name,
            config.encoder,
            provenance.model_name
        );
    }

    Ok(provenance)
}

/// Train a head on an in-memory feature table and save it
pub fn train_on_table<B: AutodiffBackend>(
    device: B::Device,
    table: &FeatureTable,
    provenance: &Provenance,
    config: &Config,
) -> anyhow::Result<Evaluation> {
    let prepared = prepare(table, config)?;

    if prepared.train.is_empty() || prepared.test.is_empty() {
        return Err(anyhow!(
            "Not enough rows to split: {} train, {} test",
            prepared.train.len(),
            prepared.test.len()
        ));
    }

    log::info!(
        "Train: {} x {}, test: {} x {}",
        prepared.train.len(),
        table.dim(),
        prepared.test.len(),
        table.dim()
    );
    log::info!("In: {}, out: {}", table.dim(), prepared.encoder.len());

    let model_config = ModelConfig::new(
        config.head_config(table.dim(), prepared.encoder.len()),
        prepared.scaler.clone(),
        prepared.encoder.id2label().clone(),
        provenance.clone(),
    );

    let artifacts = Artifacts::create(&config.artifact_dir)?;

    let evaluation = match &model_config.head {
        HeadConfig::Dense(head) => {
            let model = head.init::<B>(&device);
            log::info!("{}", head);
            fit_head(model, device, prepared, config, &artifacts)?
        }
        HeadConfig::Attention(head) => {
            let model = head.init::<B>(&device)?;
            log::info!("{}", head);
            fit_head(model, device, prepared, config, &artifacts)?
        }
    };

    artifacts.save_config(CONFIG_FILE, &model_config)?;
    artifacts.save_config(TRAINING_FILE, config)?;

    Ok(evaluation)
}

fn fit_head<B, M>(
    model: M,
    device: B::Device,
    prepared: Prepared,
    config: &Config,
    artifacts: &Artifacts,
) -> anyhow::Result<Evaluation>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B, Train<B>>,
    M::InnerModule: Classifier<B::InnerBackend, Train<B::InnerBackend>>,
{
    let mut builder_train = DataLoaderBuilder::new(Batcher::<B>::new(device.clone()))
        .batch_size(config.batch_size)
        .num_workers(config.num_workers);

    if config.shuffle {
        builder_train = builder_train.shuffle(config.seed);
    }

    let dataloader_train = builder_train.build(InMemDataset::new(prepared.train));

    let dataloader_test: Arc<dyn DataLoader<Train<B::InnerBackend>>> =
        DataLoaderBuilder::new(Batcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(config.batch_size)
            .num_workers(config.num_workers)
            .build(InMemDataset::new(prepared.test));

    let optimizer = AdamWConfig::new()
        .with_weight_decay(config.weight_decay)
        .init::<B, M>();

    let (model, history) = fit::<B, M, _, _, _>(
        model,
        optimizer,
        dataloader_train,
        dataloader_test.clone(),
        prepared.class_weights,
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

    artifacts.save_history(&history)?;
    artifacts.save_model::<B, M>(model)?;

    Ok(evaluation)
}
