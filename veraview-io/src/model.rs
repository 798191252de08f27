//! In-memory VERAOutput data model.
//!
//! A [`VeraDataModel`] holds the core geometry plus one [`StatePoint`] per
//! state, each a map of named n-dimensional datasets. Dataset categories
//! are derived from dataset shapes when the model is built.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::ArrayD;
use veraview_core::{CoreGeometry, DataModel, DataSetCategory, DataSetName, STATE_TIME_DATASET};

/// Scalar datasets that can serve as the time axis, in preference order.
pub const TIME_DATASET_NAMES: [&str; 3] = ["exposure", "exposure_efpd", "hours"];

/// Datasets of a single state point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePoint {
    datasets: BTreeMap<String, ArrayD<f64>>,
}

impl StatePoint {
    /// Creates an empty state point.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset and returns the state point.
    #[must_use]
    pub fn with_dataset(mut self, name: impl Into<String>, data: ArrayD<f64>) -> Self {
        self.insert(name, data);
        self
    }

    /// Adds or replaces a dataset.
    pub fn insert(&mut self, name: impl Into<String>, data: ArrayD<f64>) {
        self.datasets.insert(name.into(), data);
    }

    /// Dataset by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.datasets.get(name)
    }

    /// Value of a single-element dataset.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name)
            .filter(|data| data.len() == 1)
            .and_then(|data| data.iter().next().copied())
    }

    /// Dataset names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Number of datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Returns true if the state point has no datasets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

/// A loaded VERAOutput file.
#[derive(Debug, Clone)]
pub struct VeraDataModel {
    label: String,
    core: CoreGeometry,
    states: Vec<StatePoint>,
    pin_volumes: Option<ArrayD<f64>>,
    categories: BTreeMap<DataSetCategory, Vec<String>>,
}

impl VeraDataModel {
    /// Builds a model and indexes dataset categories from the first state.
    #[must_use]
    pub fn new(label: impl Into<String>, core: CoreGeometry, states: Vec<StatePoint>) -> Self {
        let mut model = Self {
            label: label.into(),
            core,
            states,
            pin_volumes: None,
            categories: BTreeMap::new(),
        };
        model.categories = model.index_categories();
        model
    }

    /// Attaches pin volume weights shaped like pin datasets.
    #[must_use]
    pub fn with_pin_volumes(mut self, volumes: ArrayD<f64>) -> Self {
        self.pin_volumes = Some(volumes);
        self
    }

    /// All state points in order.
    #[must_use]
    pub fn states(&self) -> &[StatePoint] {
        &self.states
    }

    /// State point by index.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&StatePoint> {
        self.states.get(index)
    }

    /// Dataset values at a state point.
    #[must_use]
    pub fn dataset(&self, state_index: usize, name: &DataSetName) -> Option<&ArrayD<f64>> {
        self.state(state_index)?.get(&name.name)
    }

    /// Pin weights for averaging, taken from `pin_volumes`.
    #[must_use]
    pub fn pin_weights(&self) -> Option<&ArrayD<f64>> {
        self.pin_volumes.as_ref()
    }

    /// Category of a dataset with the given shape, if it fits the core.
    #[must_use]
    pub fn category_of(&self, shape: &[usize]) -> Option<DataSetCategory> {
        let core = &self.core;
        if shape.iter().product::<usize>() == 1 {
            return Some(DataSetCategory::Scalar);
        }
        match shape {
            [y, x, z, n] if core.npinx > 0 && *n == core.nass() && *z == core.nax() => {
                if (*y, *x) == (core.npiny, core.npinx) {
                    Some(DataSetCategory::Pin)
                } else if (*y, *x) == (core.npiny + 1, core.npinx + 1) {
                    Some(DataSetCategory::Channel)
                } else {
                    None
                }
            }
            [z, n] if core.ndet() > 0 && *n == core.ndet() => {
                if *z == core.ndetax() {
                    Some(DataSetCategory::Detector)
                } else if *z == core.nfdetax() {
                    Some(DataSetCategory::FixedDetector)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn index_categories(&self) -> BTreeMap<DataSetCategory, Vec<String>> {
        let mut categories: BTreeMap<DataSetCategory, Vec<String>> = BTreeMap::new();
        if let Some(first) = self.states.first() {
            for name in first.names() {
                let Some(data) = first.get(name) else {
                    continue;
                };
                if let Some(category) = self.category_of(data.shape()) {
                    categories
                        .entry(category)
                        .or_default()
                        .push(name.to_string());
                } else {
                    log::debug!("{}: skipping dataset {name} {:?}", self.label, data.shape());
                }
            }
        }
        categories
    }

    /// Scalar datasets usable as the time axis, present in every state.
    #[must_use]
    pub fn time_datasets(&self) -> Vec<String> {
        if self.states.is_empty() {
            return Vec::new();
        }
        TIME_DATASET_NAMES
            .iter()
            .filter(|name| self.states.iter().all(|state| state.scalar(name).is_some()))
            .map(ToString::to_string)
            .collect()
    }

    /// Values of a time dataset across the states.
    ///
    /// `state` yields the state indices. An unknown name yields an empty series.
    #[must_use]
    pub fn time_series(&self, name: &str) -> Vec<f64> {
        if name == STATE_TIME_DATASET {
            return (0..self.states.len()).map(index_to_f64).collect();
        }
        self.states
            .iter()
            .map(|state| state.scalar(name))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default()
    }

    /// Consistency problems, one human readable message each.
    #[must_use]
    pub fn check(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if self.core.core_map.is_empty() {
            messages.push("Core map is missing or empty".to_string());
        }
        if let Err(err) = self.core.validate() {
            messages.push(format!("Invalid core geometry: {err}"));
        }
        let Some(first) = self.states.first() else {
            messages.push("No state points found".to_string());
            return messages;
        };

        let expected: BTreeSet<&str> = first.names().collect();
        for (i, state) in self.states.iter().enumerate().skip(1) {
            for name in &expected {
                match (first.get(name), state.get(name)) {
                    (Some(_), None) => {
                        messages.push(format!("Dataset \"{name}\" missing from state {}", i + 1));
                    }
                    (Some(a), Some(b)) if a.shape() != b.shape() => {
                        messages.push(format!(
                            "Dataset \"{name}\" shape {:?} in state {} differs from {:?}",
                            b.shape(),
                            i + 1,
                            a.shape()
                        ));
                    }
                    _ => {}
                }
            }
        }

        if let Some(volumes) = &self.pin_volumes {
            if self.category_of(volumes.shape()) != Some(DataSetCategory::Pin) {
                messages.push(format!(
                    "pin_volumes shape {:?} does not match the pin layout",
                    volumes.shape()
                ));
            }
        }
        messages
    }
}

#[allow(clippy::cast_precision_loss)]
fn index_to_f64(index: usize) -> f64 {
    index as f64
}

impl DataModel for VeraDataModel {
    fn label(&self) -> &str {
        &self.label
    }

    fn core(&self) -> &CoreGeometry {
        &self.core
    }

    fn dataset_names(&self, category: DataSetCategory) -> Vec<String> {
        if category == DataSetCategory::Time {
            let mut names = self.time_datasets();
            names.push(STATE_TIME_DATASET.to_string());
            return names;
        }
        self.categories.get(&category).cloned().unwrap_or_default()
    }

    fn state_count(&self) -> usize {
        self.states.len()
    }

    fn scalar_value(&self, state_index: usize, name: &str) -> Option<f64> {
        self.state(state_index)?.scalar(name)
    }
}
