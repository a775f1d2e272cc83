use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    config::Config as _,
    data::{
        dataloader::DataLoaderBuilder,
        dataset::{Dataset as _, InMemDataset},
    },
    module::AutodiffModule,
    optim::AdamConfig,
    tensor::{Data, Tensor},
};
use genre_classifier::{
    datasets::{FeatureRecord, FeatureTable},
    models::heads::{DenseClassifier, DenseClassifierConfig, FeatureHead, HeadConfig},
    pipelines::{
        feature_classification::{
            batcher::Item, inference::classify_features, training, Batcher, ModelConfig,
        },
        feature_extraction::Provenance,
    },
    training::{
        artifacts::{CONFIG_FILE, HISTORY_FILE, TRAINING_FILE},
        fit, Artifacts, FitConfig,
    },
};
use pretty_assertions::assert_eq;

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<TestBackend>;

fn table() -> FeatureTable {
    let records = (0..20)
        .map(|i| {
            let (category, sign) = if i % 2 == 0 {
                ("business", -1.0)
            } else {
                ("sport", 1.0)
            };
            let jitter = i as f32 * 0.01;

            FeatureRecord {
                category: category.to_string(),
                title: format!("article-{}", i),
                features: vec![sign * 2.0 + jitter, sign - jitter, 0.5 * sign],
                text: String::new(),
            }
        })
        .collect();

    FeatureTable::new(records).unwrap()
}

fn config(artifact_dir: &std::path::Path, use_attention: bool) -> training::Config {
    training::Config::new()
        .with_artifact_dir(artifact_dir.to_string_lossy().into_owned())
        .with_batch_size(4)
        .with_use_attention(use_attention)
        .with_hidden_sizes(vec![8, 4])
        .with_dropout(0.0)
        .with_fit(
            FitConfig::new()
                .with_num_epochs(3)
                .with_learning_rate(1e-2)
                .with_loss_scaling(Some(false)),
        )
}

fn trains_and_reloads(use_attention: bool) {
    let device = NdArrayDevice::Cpu;
    let dir = tempfile::tempdir().unwrap();
    let table = table();

    let config = config(dir.path(), use_attention);
    let evaluation = training::train_on_table::<TestAutodiffBackend>(
        device,
        &table,
        &config.assumed_provenance(),
        &config,
    )
    .unwrap();

    assert_eq!(evaluation.total, 4);
    assert!(evaluation.correct <= evaluation.total);
    assert!((0.0..=100.0).contains(&evaluation.accuracy));
    assert!(evaluation.loss.is_finite());
    assert!(evaluation.loss >= 0.0);

    let artifacts = Artifacts::new(dir.path());
    assert!(artifacts.path(TRAINING_FILE).exists());

    let history: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(artifacts.path(HISTORY_FILE)).unwrap())
            .unwrap();
    assert_eq!(history.as_array().map(Vec::len), Some(3));

    let model_config: ModelConfig = artifacts.load_config(CONFIG_FILE).unwrap();
    assert_eq!(model_config.head.n_inputs(), 3);
    assert_eq!(model_config.head.n_outputs(), 2);
    assert_eq!(model_config.id2label.get(&0).map(String::as_str), Some("business"));
    assert_eq!(
        matches!(model_config.head, HeadConfig::Attention(_)),
        use_attention
    );

    let probabilities = classify_features::<TestBackend>(
        &device,
        &artifacts,
        &model_config,
        &table.features()[..5],
    )
    .unwrap();

    assert_eq!(probabilities.dims(), [5, 2]);

    let sums = probabilities.sum_dim(1).into_data().convert::<f32>().value;
    for sum in sums {
        assert!((sum - 1.0).abs() < 1e-4);
    }
}

#[test]
fn dense_head_trains_and_reloads() {
    trains_and_reloads(false);
}

#[test]
fn attention_head_trains_and_reloads() {
    trains_and_reloads(true);
}

#[tokio::test]
async fn heads_keep_the_stopwords_their_features_were_extracted_with() {
    let device = NdArrayDevice::Cpu;
    let data = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();

    let features_path = data.path().join("features.csv");
    let records: Vec<FeatureRecord> = table().iter().collect();
    FeatureTable::write(&features_path, &records).unwrap();

    Provenance::new("bert-base-cased".to_string(), 128)
        .with_stopwords(Some(vec!["goal".to_string(), "late".to_string()]))
        .save(Provenance::path_for(&features_path))
        .unwrap();

    let config = config(artifact_dir.path(), false)
        .with_features_path(features_path.to_string_lossy().into_owned());

    training::train::<TestAutodiffBackend>(device, config)
        .await
        .unwrap();

    let model_config: ModelConfig = Artifacts::new(artifact_dir.path())
        .load_config(CONFIG_FILE)
        .unwrap();
    let extraction = &model_config.extraction;

    assert_eq!(extraction.model_name, "bert-base-cased");
    assert_eq!(extraction.max_seq_length, 128);
    assert_eq!(
        extraction.preprocessor().preprocess("The late goal was a surprise"),
        "the was a surprise"
    );
}

#[test]
fn saved_head_rejects_the_wrong_feature_width() {
    let device = NdArrayDevice::Cpu;
    let dir = tempfile::tempdir().unwrap();

    let config = config(dir.path(), false);
    training::train_on_table::<TestAutodiffBackend>(
        device,
        &table(),
        &config.assumed_provenance(),
        &config,
    )
    .unwrap();

    let artifacts = Artifacts::new(dir.path());
    let model_config: ModelConfig = artifacts.load_config(CONFIG_FILE).unwrap();

    let result =
        classify_features::<TestBackend>(&device, &artifacts, &model_config, &[vec![1.0, 2.0]]);

    assert!(result.is_err());
}

#[test]
fn too_small_tables_cannot_be_split() {
    let device = NdArrayDevice::Cpu;
    let dir = tempfile::tempdir().unwrap();
    let table = FeatureTable::new(vec![FeatureRecord {
        category: "sport".to_string(),
        title: "only".to_string(),
        features: vec![1.0, 2.0, 3.0],
        text: String::new(),
    }])
    .unwrap();

    let config = config(dir.path(), false);
    let result = training::train_on_table::<TestAutodiffBackend>(
        device,
        &table,
        &config.assumed_provenance(),
        &config,
    );

    assert!(result.is_err());
}

#[test]
fn zero_epochs_leave_the_head_untouched() {
    let device = NdArrayDevice::Cpu;
    let model = DenseClassifierConfig::new(3, 2, vec![4])
        .with_dropout(0.0)
        .init::<TestAutodiffBackend>(&device);

    let input = Tensor::<TestBackend, 2>::from_data(
        Data::<f32, 2>::from([[1.0, -1.0, 0.5], [0.0, 2.0, -3.0]]).convert(),
        &device,
    );
    let before = model.valid().forward(input.clone()).into_data();

    let items = vec![Item::new(vec![1.0, 0.0, 0.0], 0), Item::new(vec![0.0, 1.0, 0.0], 1)];
    let dataloader_train = DataLoaderBuilder::new(Batcher::<TestAutodiffBackend>::new(device))
        .batch_size(2)
        .build(InMemDataset::new(items.clone()));
    let dataloader_valid = DataLoaderBuilder::new(Batcher::<TestBackend>::new(device))
        .batch_size(2)
        .build(InMemDataset::new(items));

    let optimizer = AdamConfig::new()
        .init::<TestAutodiffBackend, DenseClassifier<TestAutodiffBackend>>();

    let (model, history) = fit::<TestAutodiffBackend, _, _, _, _>(
        model,
        optimizer,
        dataloader_train,
        dataloader_valid,
        None,
        &FitConfig::new().with_num_epochs(0),
        &device,
    )
    .unwrap();

    assert!(history.is_empty());
    assert_eq!(model.valid().forward(input).into_data(), before);
}
