//! Structured change requests.

use std::fmt;
use std::rc::Rc;

use veraview_core::{
    AssemblyAddr, AxialValue, DataModelManager, DataSetName, ScaleMode, SubAddr, WeightsMode,
};

/// A batch of field updates for [`State::change`](crate::State::change).
///
/// `None` means "not supplied", which is distinct from supplying the
/// current value: a supplied field is applied (and reported) even when it
/// equals what the state already holds.
#[derive(Clone, Default)]
pub struct StatePatch {
    pub assembly_addr: Option<AssemblyAddr>,
    /// Alternative to `assembly_addr`: select the assembly under a detector
    /// cell. Ignored when `assembly_addr` is also supplied.
    pub detector_addr: Option<AssemblyAddr>,
    pub aux_node_addrs: Option<Vec<i32>>,
    pub aux_sub_addrs: Option<Vec<SubAddr>>,
    pub axial_value: Option<AxialValue>,
    pub cur_dataset: Option<DataSetName>,
    pub data_model_mgr: Option<Rc<dyn DataModelManager>>,
    pub node_addr: Option<i32>,
    pub scale_mode: Option<ScaleMode>,
    pub sub_addr: Option<SubAddr>,
    pub time_dataset: Option<String>,
    pub time_value: Option<f64>,
    pub weights_mode: Option<WeightsMode>,
}

impl StatePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assembly_addr.is_none()
            && self.detector_addr.is_none()
            && self.aux_node_addrs.is_none()
            && self.aux_sub_addrs.is_none()
            && self.axial_value.is_none()
            && self.cur_dataset.is_none()
            && self.data_model_mgr.is_none()
            && self.node_addr.is_none()
            && self.scale_mode.is_none()
            && self.sub_addr.is_none()
            && self.time_dataset.is_none()
            && self.time_value.is_none()
            && self.weights_mode.is_none()
    }

    #[must_use]
    pub fn with_assembly_addr(mut self, addr: AssemblyAddr) -> Self {
        self.assembly_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_detector_addr(mut self, addr: AssemblyAddr) -> Self {
        self.detector_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_aux_node_addrs(mut self, nodes: Vec<i32>) -> Self {
        self.aux_node_addrs = Some(nodes);
        self
    }

    #[must_use]
    pub fn with_aux_sub_addrs(mut self, addrs: Vec<SubAddr>) -> Self {
        self.aux_sub_addrs = Some(addrs);
        self
    }

    #[must_use]
    pub fn with_axial_value(mut self, value: AxialValue) -> Self {
        self.axial_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_cur_dataset(mut self, dataset: DataSetName) -> Self {
        self.cur_dataset = Some(dataset);
        self
    }

    #[must_use]
    pub fn with_data_model_mgr(mut self, manager: Rc<dyn DataModelManager>) -> Self {
        self.data_model_mgr = Some(manager);
        self
    }

    #[must_use]
    pub fn with_node_addr(mut self, node: i32) -> Self {
        self.node_addr = Some(node);
        self
    }

    #[must_use]
    pub fn with_scale_mode(mut self, mode: ScaleMode) -> Self {
        self.scale_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_sub_addr(mut self, addr: SubAddr) -> Self {
        self.sub_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_time_dataset(mut self, name: impl Into<String>) -> Self {
        self.time_dataset = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_time_value(mut self, value: f64) -> Self {
        self.time_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_weights_mode(mut self, mode: WeightsMode) -> Self {
        self.weights_mode = Some(mode);
        self
    }
}

impl fmt::Debug for StatePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatePatch")
            .field("assembly_addr", &self.assembly_addr)
            .field("detector_addr", &self.detector_addr)
            .field("aux_node_addrs", &self.aux_node_addrs)
            .field("aux_sub_addrs", &self.aux_sub_addrs)
            .field("axial_value", &self.axial_value)
            .field("cur_dataset", &self.cur_dataset)
            .field("data_model_mgr", &self.data_model_mgr.is_some())
            .field("node_addr", &self.node_addr)
            .field("scale_mode", &self.scale_mode)
            .field("sub_addr", &self.sub_addr)
            .field("time_dataset", &self.time_dataset)
            .field("time_value", &self.time_value)
            .field("weights_mode", &self.weights_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patch() {
        assert!(StatePatch::new().is_empty());
        assert!(!StatePatch::new().with_node_addr(2).is_empty());
    }

    #[test]
    fn test_builder_sets_fields() {
        let patch = StatePatch::new()
            .with_sub_addr(SubAddr::new(3, 4))
            .with_time_dataset("exposure")
            .with_weights_mode(WeightsMode::Off);

        assert_eq!(patch.sub_addr, Some(SubAddr::new(3, 4)));
        assert_eq!(patch.time_dataset.as_deref(), Some("exposure"));
        assert_eq!(patch.weights_mode, Some(WeightsMode::Off));
        assert!(patch.axial_value.is_none());
    }
}
