//! The fixed, ordered step catalog

use crate::core::step::{EntryPoint, ParamSource, PreInvocationHook, Step, StepKind};

/// Ordered catalog of known steps
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    /// Build a registry from arbitrary steps, ordered by ordinal
    pub fn from_steps(mut steps: Vec<Step>) -> Self {
        steps.sort_by_key(|s| s.ordinal);
        Self { steps }
    }

    /// The built-in catalog
    pub fn standard() -> Self {
        Self::from_steps(StepKind::ALL.into_iter().map(standard_step).collect())
    }

    /// Steps in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn get(&self, kind: StepKind) -> Option<&Step> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub fn find(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn component(name: &str) -> EntryPoint {
    EntryPoint::Component {
        name: name.to_string(),
    }
}

fn local(path: &str) -> EntryPoint {
    EntryPoint::Local {
        path: path.to_string(),
    }
}

fn params(entries: Vec<(&str, ParamSource)>) -> Vec<(String, ParamSource)> {
    entries
        .into_iter()
        .map(|(name, source)| (name.to_string(), source))
        .collect()
}

fn standard_step(kind: StepKind) -> Step {
    match kind {
        StepKind::Download => Step {
            kind,
            ordinal: 1,
            entry_point: component("get_data"),
            version: Some("main".to_string()),
            parameter_spec: params(vec![
                ("sample", ParamSource::config("etl.sample")),
                ("artifact_name", ParamSource::literal("sample.csv")),
                ("artifact_type", ParamSource::literal("raw_data")),
                ("artifact_description", ParamSource::literal("Raw file as downloaded")),
            ]),
            is_default_active: true,
            hooks: vec![],
            note: None,
        },
        StepKind::BasicCleaning => Step {
            kind,
            ordinal: 2,
            entry_point: local("src/basic_cleaning"),
            version: None,
            parameter_spec: params(vec![
                ("input_artifact", ParamSource::artifact("sample.csv", "latest")),
                ("output_artifact", ParamSource::literal("clean_sample.csv")),
                ("output_type", ParamSource::literal("clean_data")),
                (
                    "output_description",
                    ParamSource::literal(
                        "Basic cleaned data with outliers removed and date formatted",
                    ),
                ),
                ("min_price", ParamSource::config("etl.min_price")),
                ("max_price", ParamSource::config("etl.max_price")),
            ]),
            is_default_active: true,
            hooks: vec![],
            note: None,
        },
        StepKind::DataCheck => Step {
            kind,
            ordinal: 3,
            entry_point: local("src/data_check"),
            version: None,
            parameter_spec: params(vec![
                ("csv", ParamSource::artifact("clean_sample.csv", "latest")),
                ("ref", ParamSource::artifact("clean_sample.csv", "reference")),
                ("kl_threshold", ParamSource::config("data_check.kl_threshold")),
                ("min_price", ParamSource::config("etl.min_price")),
                ("max_price", ParamSource::config("etl.max_price")),
            ]),
            is_default_active: true,
            hooks: vec![],
            note: None,
        },
        StepKind::DataSplit => Step {
            kind,
            ordinal: 4,
            entry_point: component("train_val_test_split"),
            version: None,
            parameter_spec: params(vec![
                ("input", ParamSource::artifact("clean_sample.csv", "latest")),
                ("test_size", ParamSource::config("modeling.test_size")),
                ("random_seed", ParamSource::config("modeling.random_seed")),
                ("stratify_by", ParamSource::config("modeling.stratify_by")),
            ]),
            is_default_active: true,
            hooks: vec![],
            note: None,
        },
        StepKind::TrainRandomForest => Step {
            kind,
            ordinal: 5,
            entry_point: local("src/train_random_forest"),
            version: None,
            parameter_spec: params(vec![
                ("trainval_artifact", ParamSource::artifact("trainval_data.csv", "latest")),
                ("output_artifact", ParamSource::literal("random_forest_export")),
                ("max_tfidf_features", ParamSource::config("modeling.max_tfidf_features")),
                ("val_size", ParamSource::config("modeling.val_size")),
                ("random_seed", ParamSource::config("modeling.random_seed")),
                ("stratify_by", ParamSource::config("modeling.stratify_by")),
            ]),
            is_default_active: true,
            hooks: vec![PreInvocationHook::WriteConfigJson {
                config_path: "modeling.random_forest".to_string(),
                file_name: "rf_config.json".to_string(),
                param: "rf_config".to_string(),
            }],
            note: None,
        },
        StepKind::TestRegressionModel => Step {
            kind,
            ordinal: 6,
            entry_point: component("test_regression_model"),
            version: None,
            parameter_spec: params(vec![
                ("mlflow_model", ParamSource::artifact("random_forest_export", "prod")),
                ("test_dataset", ParamSource::artifact("test_data.csv", "latest")),
            ]),
            // Needs a model export promoted to "prod" first, so it only runs
            // when named explicitly.
            is_default_active: false,
            hooks: vec![],
            note: Some(
                "requires a random_forest_export promoted to 'prod'; run it explicitly".to_string(),
            ),
        },
    }
}
