//! Session persistence of the state fields.
//!
//! Properties are stored in a flat JSON object using camelCase keys so
//! they can sit next to window properties in a session file.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::state::State;

/// Keys written by [`State::save_props`], in write order.
pub const PROP_KEYS: [&str; 11] = [
    "assemblyAddr",
    "auxNodeAddrs",
    "auxSubAddrs",
    "axialValue",
    "curDataSet",
    "nodeAddr",
    "scaleMode",
    "subAddr",
    "timeDataSet",
    "timeValue",
    "weightsMode",
];

fn read<T: DeserializeOwned>(props: &Map<String, Value>, key: &'static str) -> Result<Option<T>> {
    props
        .get(key)
        .map(|value| serde_json::from_value(value.clone()))
        .transpose()
        .map_err(|source| Error::InvalidProp { key, source })
}

impl State {
    /// Writes the persistent fields into `props`.
    ///
    /// Listeners and the data model manager are not persisted.
    ///
    /// # Errors
    /// Returns an error if a field cannot be serialized.
    pub fn save_props(&self, props: &mut Map<String, Value>) -> Result<()> {
        props.insert("assemblyAddr".into(), serde_json::to_value(self.assembly_addr)?);
        props.insert("auxNodeAddrs".into(), serde_json::to_value(&self.aux_node_addrs)?);
        props.insert("auxSubAddrs".into(), serde_json::to_value(&self.aux_sub_addrs)?);
        props.insert("axialValue".into(), serde_json::to_value(self.axial_value)?);
        props.insert("curDataSet".into(), serde_json::to_value(&self.cur_dataset)?);
        props.insert("nodeAddr".into(), Value::from(self.node_addr));
        props.insert("scaleMode".into(), serde_json::to_value(self.scale_mode)?);
        props.insert("subAddr".into(), serde_json::to_value(self.sub_addr)?);
        props.insert("timeDataSet".into(), Value::from(self.time_dataset.as_str()));
        props.insert("timeValue".into(), serde_json::to_value(self.time_value)?);
        props.insert("weightsMode".into(), serde_json::to_value(self.weights_mode)?);
        Ok(())
    }

    /// Restores whichever persistent fields are present in `props`.
    ///
    /// Unknown keys are ignored. Listeners are not notified; callers fire
    /// [`StateChange::Init`](veraview_core::StateChange::Init) afterwards.
    ///
    /// # Errors
    /// Returns [`Error::InvalidProp`] for a present key with a malformed
    /// value. The state is left untouched in that case.
    pub fn load_props(&mut self, props: &Map<String, Value>) -> Result<()> {
        let assembly_addr = read(props, "assemblyAddr")?;
        let aux_node_addrs = read(props, "auxNodeAddrs")?;
        let aux_sub_addrs = read(props, "auxSubAddrs")?;
        let axial_value = read(props, "axialValue")?;
        let cur_dataset = read(props, "curDataSet")?;
        let node_addr = read(props, "nodeAddr")?;
        let scale_mode = read(props, "scaleMode")?;
        let sub_addr = read(props, "subAddr")?;
        let time_dataset = read(props, "timeDataSet")?;
        let time_value = read(props, "timeValue")?;
        let weights_mode = read(props, "weightsMode")?;

        if let Some(value) = assembly_addr {
            self.assembly_addr = value;
        }
        if let Some(value) = aux_node_addrs {
            self.aux_node_addrs = value;
        }
        if let Some(value) = aux_sub_addrs {
            self.aux_sub_addrs = value;
        }
        if let Some(value) = axial_value {
            self.axial_value = value;
        }
        if let Some(value) = cur_dataset {
            self.cur_dataset = value;
        }
        if let Some(value) = node_addr {
            self.node_addr = value;
        }
        if let Some(value) = scale_mode {
            self.scale_mode = value;
        }
        if let Some(value) = sub_addr {
            self.sub_addr = value;
        }
        if let Some(value) = time_dataset {
            self.time_dataset = value;
        }
        if let Some(value) = time_value {
            self.time_value = value;
        }
        if let Some(value) = weights_mode {
            self.weights_mode = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatePatch;
    use approx::assert_relative_eq;
    use serde_json::json;
    use veraview_core::{
        AssemblyAddr, AxialValue, DataSetCategory, DataSetName, ScaleMode, SubAddr, WeightsMode,
    };

    #[test]
    fn test_save_writes_every_key() {
        let state = State::new();
        let mut props = Map::new();
        state.save_props(&mut props).unwrap();

        for key in PROP_KEYS {
            assert!(props.contains_key(key), "missing {key}");
        }
        assert_eq!(props["curDataSet"], Value::Null);
        assert_eq!(props["assemblyAddr"], json!([-1, -1, -1]));
    }

    #[test]
    fn test_save_then_load_restores_fields() {
        let mut state = State::new();
        state.change(
            &StatePatch::new()
                .with_assembly_addr(AssemblyAddr::new(3, 2, 1))
                .with_aux_sub_addrs(vec![SubAddr::new(1, 2), SubAddr::new(3, 4)])
                .with_axial_value(AxialValue::new(12.5, 1, 0, 0))
                .with_cur_dataset(DataSetName::new(DataSetCategory::Pin, "pin_powers"))
                .with_scale_mode(ScaleMode::State)
                .with_time_dataset("exposure")
                .with_time_value(14.2)
                .with_weights_mode(WeightsMode::Off),
            None,
        );
        let mut props = Map::new();
        state.save_props(&mut props).unwrap();

        let mut restored = State::new();
        restored.load_props(&props).unwrap();

        assert_eq!(restored.assembly_addr(), AssemblyAddr::new(3, 2, 1));
        assert_eq!(restored.aux_sub_addrs().len(), 2);
        assert_relative_eq!(restored.axial_value().cm, 12.5);
        assert_eq!(restored.cur_dataset().unwrap().name, "pin_powers");
        assert_eq!(restored.scale_mode(), ScaleMode::State);
        assert_eq!(restored.time_dataset(), "exposure");
        assert_relative_eq!(restored.time_value(), 14.2);
        assert_eq!(restored.weights_mode(), WeightsMode::Off);
    }

    #[test]
    fn test_load_ignores_missing_and_unknown_keys() {
        let mut state = State::new();
        let props = json!({"nodeAddr": 2, "windowTitle": "core"});
        state.load_props(props.as_object().unwrap()).unwrap();

        assert_eq!(state.node_addr(), 2);
        assert_eq!(state.time_dataset(), "state");
    }

    #[test]
    fn test_load_rejects_malformed_value() {
        let mut state = State::new();
        let props = json!({"assemblyAddr": "center"});
        let err = state.load_props(props.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidProp { key: "assemblyAddr", .. }));
    }

    #[test]
    fn test_failed_load_leaves_state_unchanged() {
        let mut state = State::new();
        state.change(&StatePatch::new().with_node_addr(1), None);
        let props = json!({"assemblyAddr": [3, 1, 1], "nodeAddr": 2, "timeValue": "bad"});

        let err = state.load_props(props.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidProp { key: "timeValue", .. }));
        assert_eq!(state.assembly_addr(), AssemblyAddr::UNDEFINED);
        assert_eq!(state.node_addr(), 1);
    }
}
