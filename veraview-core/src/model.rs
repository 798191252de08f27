//! Data model collaborator traits.
//!
//! The viewing state never reads files itself. It consumes a
//! [`DataModelManager`] holding one or more [`DataModel`]s and relies on
//! them for coordinate normalization and time series lookups.

use std::rc::Rc;

use crate::coord::{AssemblyAddr, AxialValue, DataSetCategory, DataSetName, SubAddr, SubAddrKind};
use crate::geometry::{AxialRequest, CoreGeometry, Extent, GridMap};

/// Name of the implicit time dataset: the state point index.
pub const STATE_TIME_DATASET: &str = "state";

/// Preferred time dataset when a file provides it.
pub const EXPOSURE_TIME_DATASET: &str = "exposure";

/// A loaded simulation output.
pub trait DataModel {
    /// Display label, usually the file name.
    fn label(&self) -> &str;

    /// Core geometry.
    fn core(&self) -> &CoreGeometry;

    /// Dataset names available in a category, sorted.
    fn dataset_names(&self, category: DataSetCategory) -> Vec<String>;

    /// Number of state points.
    fn state_count(&self) -> usize;

    /// Value of a scalar dataset at a state point.
    fn scalar_value(&self, state_index: usize, name: &str) -> Option<f64>;

    /// First dataset in a category.
    fn first_dataset(&self, category: DataSetCategory) -> Option<DataSetName> {
        self.dataset_names(category)
            .into_iter()
            .next()
            .map(|name| DataSetName::new(category, name))
    }

    /// Dataset shown when nothing else is selected: `pin_powers` if present,
    /// else the first pin dataset, else the first scalar dataset.
    fn default_dataset(&self) -> Option<DataSetName> {
        let pins = self.dataset_names(DataSetCategory::Pin);
        if pins.iter().any(|name| name == "pin_powers") {
            return Some(DataSetName::new(DataSetCategory::Pin, "pin_powers"));
        }
        self.first_dataset(DataSetCategory::Pin)
            .or_else(|| self.first_dataset(DataSetCategory::Scalar))
    }

    /// Core map lookup table.
    fn core_map(&self) -> &GridMap {
        &self.core().core_map
    }

    /// Detector map lookup table, if the core has detectors.
    fn detector_map(&self) -> Option<&GridMap> {
        self.core().detector_map.as_ref()
    }

    /// See [`CoreGeometry::normalize_assembly_addr`].
    fn normalize_assembly_addr(&self, addr: AssemblyAddr) -> AssemblyAddr {
        self.core().normalize_assembly_addr(addr)
    }

    /// See [`CoreGeometry::normalize_sub_addr`].
    fn normalize_sub_addr(&self, addr: SubAddr, kind: SubAddrKind) -> SubAddr {
        self.core().normalize_sub_addr(addr, kind)
    }

    /// See [`CoreGeometry::normalize_node_addr`].
    fn normalize_node_addr(&self, node: i32) -> i32 {
        self.core().normalize_node_addr(node)
    }

    /// See [`CoreGeometry::create_axial_value`].
    fn create_axial_value(&self, request: AxialRequest) -> AxialValue {
        self.core().create_axial_value(request)
    }

    /// See [`CoreGeometry::normalize_axial_value`].
    fn normalize_axial_value(&self, value: AxialValue) -> AxialValue {
        self.core().normalize_axial_value(value)
    }

    /// See [`CoreGeometry::extract_symmetry_extent`].
    fn extract_symmetry_extent(&self) -> Extent {
        self.core().extract_symmetry_extent()
    }
}

/// Notification from a [`DataModelManager`] after its model list changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// A model was added; `count` is the new number of models.
    Added { label: String, count: usize },
    /// A model was removed; `count` is the new number of models.
    Removed { label: String, count: usize },
}

impl ModelEvent {
    /// Number of models after the event.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            ModelEvent::Added { count, .. } | ModelEvent::Removed { count, .. } => *count,
        }
    }
}

/// Callback registered with [`DataModelManager::subscribe`].
pub type ModelCallback = Rc<dyn Fn(&ModelEvent)>;

/// Collection of open data models plus the shared time axis.
///
/// Methods take `&self`; implementations keep their mutable parts behind
/// interior mutability and must release internal borrows before invoking
/// subscribers.
pub trait DataModelManager {
    /// First open model.
    fn first_data_model(&self) -> Option<Rc<dyn DataModel>>;

    /// Number of open models.
    fn data_model_count(&self) -> usize;

    /// Dataset names usable as the time axis, in preference order.
    fn resolve_available_time_datasets(&self) -> Vec<String>;

    /// Current time dataset.
    fn time_dataset(&self) -> String;

    /// Switches the time dataset.
    fn set_time_dataset(&self, name: &str);

    /// Position of a time value in the current time series.
    fn time_value_index(&self, value: f64) -> Option<usize>;

    /// Time value at a position in the current time series.
    fn time_index_value(&self, index: usize) -> f64;

    /// Registers a callback for model added/removed events.
    fn subscribe(&self, callback: ModelCallback);
}
