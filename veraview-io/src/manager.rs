//! Collection of open data models and the shared time axis.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use veraview_core::{DataModel, DataModelManager, ModelCallback, ModelEvent, STATE_TIME_DATASET};

use crate::model::VeraDataModel;

/// Relative tolerance when matching a time value against a series.
const TIME_TOLERANCE: f64 = 1e-9;

/// Open data models, in the order they were added.
///
/// Lives on the UI thread. Subscribers are invoked after every internal
/// borrow is released, so they may call back into the manager.
#[derive(Default)]
pub struct DataModelMgr {
    models: RefCell<Vec<Rc<VeraDataModel>>>,
    time_dataset: RefCell<String>,
    subscribers: RefCell<Vec<ModelCallback>>,
}

impl DataModelMgr {
    /// Creates an empty manager using the state index as time axis.
    #[must_use]
    pub fn new() -> Self {
        Self {
            time_dataset: RefCell::new(STATE_TIME_DATASET.to_string()),
            ..Self::default()
        }
    }

    /// Adds a model and notifies subscribers.
    pub fn add_model(&self, model: VeraDataModel) -> Rc<VeraDataModel> {
        let model = Rc::new(model);
        let count = {
            let mut models = self.models.borrow_mut();
            models.push(Rc::clone(&model));
            models.len()
        };
        log::info!("opened data model {} ({count} open)", model.label());
        self.emit(&ModelEvent::Added {
            label: model.label().to_string(),
            count,
        });
        model
    }

    /// Removes the model with the given label and notifies subscribers.
    pub fn remove_model(&self, label: &str) -> Option<Rc<VeraDataModel>> {
        let (removed, count) = {
            let mut models = self.models.borrow_mut();
            let pos = models.iter().position(|model| model.label() == label)?;
            let removed = models.remove(pos);
            (removed, models.len())
        };
        log::info!("closed data model {label} ({count} open)");
        self.emit(&ModelEvent::Removed {
            label: label.to_string(),
            count,
        });
        Some(removed)
    }

    /// Snapshot of the open models.
    #[must_use]
    pub fn models(&self) -> Vec<Rc<VeraDataModel>> {
        self.models.borrow().clone()
    }

    /// Model by label.
    #[must_use]
    pub fn model(&self, label: &str) -> Option<Rc<VeraDataModel>> {
        self.models
            .borrow()
            .iter()
            .find(|model| model.label() == label)
            .cloned()
    }

    /// First model with its concrete type.
    #[must_use]
    pub fn first_model(&self) -> Option<Rc<VeraDataModel>> {
        self.models.borrow().first().cloned()
    }

    /// Values of the current time dataset, taken from the first model.
    #[must_use]
    pub fn time_series(&self) -> Vec<f64> {
        let name = self.time_dataset.borrow().clone();
        self.first_model()
            .map(|model| model.time_series(&name))
            .unwrap_or_default()
    }

    fn emit(&self, event: &ModelEvent) {
        let subscribers = self.subscribers.borrow().clone();
        for callback in subscribers {
            callback(event);
        }
    }
}

impl DataModelManager for DataModelMgr {
    fn first_data_model(&self) -> Option<Rc<dyn DataModel>> {
        self.first_model().map(|model| model as Rc<dyn DataModel>)
    }

    fn data_model_count(&self) -> usize {
        self.models.borrow().len()
    }

    fn resolve_available_time_datasets(&self) -> Vec<String> {
        let models = self.models.borrow();
        let mut names = models
            .first()
            .map(|first| first.time_datasets())
            .unwrap_or_default();
        names.retain(|name| models.iter().all(|model| model.time_datasets().contains(name)));
        names.push(STATE_TIME_DATASET.to_string());
        names
    }

    fn time_dataset(&self) -> String {
        self.time_dataset.borrow().clone()
    }

    fn set_time_dataset(&self, name: &str) {
        if !self.resolve_available_time_datasets().iter().any(|n| n == name) {
            log::warn!("time dataset {name} is not available in every open model");
        }
        *self.time_dataset.borrow_mut() = name.to_string();
    }

    fn time_value_index(&self, value: f64) -> Option<usize> {
        self.time_series().iter().position(|&v| {
            let scale = v.abs().max(value.abs()).max(1.0);
            (v - value).abs() <= TIME_TOLERANCE * scale
        })
    }

    fn time_index_value(&self, index: usize) -> f64 {
        let series = self.time_series();
        series
            .get(index.min(series.len().saturating_sub(1)))
            .copied()
            .unwrap_or(0.0)
    }

    fn subscribe(&self, callback: ModelCallback) {
        self.subscribers.borrow_mut().push(callback);
    }
}

impl fmt::Debug for DataModelMgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self
            .models
            .borrow()
            .iter()
            .map(|model| model.label().to_string())
            .collect();
        f.debug_struct("DataModelMgr")
            .field("models", &labels)
            .field("time_dataset", &self.time_dataset.borrow())
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::small_model;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    #[test]
    fn test_events_report_counts() {
        let mgr = DataModelMgr::new();
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = counts.clone();
        mgr.subscribe(Rc::new(move |event: &ModelEvent| {
            sink.borrow_mut().push(event.count());
        }));

        mgr.add_model(small_model());
        assert!(mgr.remove_model("small.h5").is_some());
        assert!(mgr.remove_model("small.h5").is_none());
        assert_eq!(*counts.borrow(), vec![1, 0]);
    }

    #[test]
    fn test_subscriber_can_reenter() {
        let mgr = Rc::new(DataModelMgr::new());
        let seen = Rc::new(Cell::new(0));
        let weak = Rc::downgrade(&mgr);
        let sink = seen.clone();
        mgr.subscribe(Rc::new(move |_event: &ModelEvent| {
            if let Some(mgr) = weak.upgrade() {
                sink.set(mgr.data_model_count());
            }
        }));

        mgr.add_model(small_model());
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_time_axis() {
        let mgr = DataModelMgr::new();
        assert_eq!(mgr.resolve_available_time_datasets(), vec!["state"]);
        assert_relative_eq!(mgr.time_index_value(0), 0.0);

        mgr.add_model(small_model());
        assert_eq!(
            mgr.resolve_available_time_datasets(),
            vec!["exposure", "state"]
        );
        assert_eq!(mgr.time_value_index(2.0), Some(2));

        mgr.set_time_dataset("exposure");
        assert_eq!(mgr.time_dataset(), "exposure");
        assert_eq!(mgr.time_value_index(1.5 + 1e-12), Some(1));
        assert_eq!(mgr.time_value_index(1.6), None);
        assert_relative_eq!(mgr.time_index_value(1), 1.5);
        assert_relative_eq!(mgr.time_index_value(99), 3.0);
    }
}
