//! State coordination against the real data model manager.
#![allow(clippy::float_cmp, clippy::unwrap_used)]

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use ndarray::{arr0, Array, IxDyn};
use tempfile::tempdir;
use veraview_core::{
    AssemblyAddr, ChangeReason, CoreGeometry, DataModelManager, DataSetCategory, GridMap,
    StateChange, SubAddr, WeightsMode,
};
use veraview_io::{
    begin_open_with, dataset_assembly_averages, wait_for_open, DataModelMgr, SessionConfig,
    StatePoint, VeraDataModel,
};
use veraview_state::{apply, bind_manager, State, StatePatch};

/// Quarter-symmetry 4x4 core with 3x3 pins and two axial levels.
fn quarter_model(label: &str) -> VeraDataModel {
    let map = GridMap::from_rows(&[
        vec![1, 1, 1, 1],
        vec![1, 2, 2, 1],
        vec![1, 2, 2, 1],
        vec![1, 1, 1, 1],
    ])
    .unwrap();
    let core = CoreGeometry::new(map)
        .with_symmetry(4)
        .with_pins(3, 3)
        .with_axial_mesh(vec![0.0, 50.0, 100.0]);
    let states = [0.0, 10.0, 20.0]
        .iter()
        .enumerate()
        .map(|(i, &exposure)| {
            let power = 1.0 + f64::from(u32::try_from(i).unwrap()) * 0.1;
            StatePoint::new()
                .with_dataset("exposure", arr0(exposure).into_dyn())
                .with_dataset("pin_powers", Array::from_elem(IxDyn(&[3, 3, 2, 2]), power))
        })
        .collect();
    VeraDataModel::new(label, core, states)
        .with_pin_volumes(Array::from_elem(IxDyn(&[3, 3, 2, 2]), 1.0))
}

fn open(manager: &DataModelMgr, label: &'static str) {
    let rx = begin_open_with(label, None, move |_| Ok(quarter_model(label)));
    let status = wait_for_open(&rx).unwrap();
    status.finish(manager).unwrap();
}

#[test]
fn test_first_model_initializes_state() {
    let manager = Rc::new(DataModelMgr::new());
    let shared = State::new().into_shared();
    let reason = bind_manager(&shared, manager.clone());
    assert_eq!(reason, ChangeReason::of(StateChange::DataModelMgr));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    shared
        .borrow_mut()
        .add_fn_listener(move |reason| sink.borrow_mut().push(reason));

    open(&manager, "c1.h5");
    assert_eq!(*seen.borrow(), vec![ChangeReason::of(StateChange::Init)]);

    let state = shared.borrow();
    // Quarter symmetry starts at (2, 2); its center is (3, 3).
    assert_eq!(state.assembly_addr(), AssemblyAddr::new(0, 3, 3));
    assert_eq!(state.axial_value().core_index, 1);
    assert_eq!(state.sub_addr(), SubAddr::new(1, 1));
    assert_eq!(state.time_dataset(), "exposure");
    assert_eq!(manager.time_dataset(), "exposure");
    assert_relative_eq!(state.time_value(), 0.0);
    assert_eq!(state.cur_dataset().unwrap().name, "pin_powers");
}

#[test]
fn test_second_model_keeps_selection() {
    let manager = Rc::new(DataModelMgr::new());
    let shared = State::new().into_shared();
    bind_manager(&shared, manager.clone());
    open(&manager, "c1.h5");

    apply(&shared, &StatePatch::new().with_node_addr(3), None);
    open(&manager, "c2.h5");
    assert_eq!(shared.borrow().node_addr(), 3);

    manager.remove_model("c1.h5");
    assert_eq!(shared.borrow().node_addr(), 3);
    manager.remove_model("c2.h5");
    assert_eq!(shared.borrow().assembly_addr(), AssemblyAddr::UNDEFINED);
}

#[test]
fn test_time_switch_through_manager() {
    let manager = Rc::new(DataModelMgr::new());
    let shared = State::new().into_shared();
    bind_manager(&shared, manager.clone());
    open(&manager, "c1.h5");

    apply(&shared, &StatePatch::new().with_time_value(20.0), None);
    let reason = apply(
        &shared,
        &StatePatch::new().with_time_dataset("state"),
        None,
    );
    assert_eq!(reason, StateChange::TimeDataSet | StateChange::TimeValue);
    assert_relative_eq!(shared.borrow().time_value(), 2.0);
}

#[test]
fn test_session_restores_state() {
    let manager = Rc::new(DataModelMgr::new());
    let shared = State::new().into_shared();
    bind_manager(&shared, manager.clone());
    open(&manager, "c1.h5");
    apply(
        &shared,
        &StatePatch::new()
            .with_assembly_addr(AssemblyAddr::new(1, 2, 2))
            .with_weights_mode(WeightsMode::Off),
        None,
    );

    let dir = tempdir().unwrap();
    let path = dir.path().join("run.vview");
    let mut session = SessionConfig::new()
        .with_file_path("c1.h5")
        .with_frame_size(1024, 768);
    session.save_state(&shared.borrow()).unwrap();
    session.write(&path).unwrap();

    let (file, loaded) = veraview_io::resolve_file(&path).unwrap();
    assert_eq!(file, dir.path().join("c1.h5"));
    let mut restored = State::new();
    loaded.unwrap().restore_state(&mut restored).unwrap();
    assert_eq!(restored.assembly_addr(), AssemblyAddr::new(1, 2, 2));
    assert_eq!(restored.weights_mode(), WeightsMode::Off);
    assert_eq!(restored.time_dataset(), "exposure");
}

#[test]
fn test_averages_for_current_selection() {
    let manager = Rc::new(DataModelMgr::new());
    let shared = State::new().into_shared();
    bind_manager(&shared, manager.clone());
    open(&manager, "c1.h5");
    apply(&shared, &StatePatch::new().with_time_value(10.0), None);

    let state = shared.borrow();
    let model = manager.first_model().unwrap();
    let state_index = manager.time_value_index(state.time_value()).unwrap();
    let dataset = state.cur_dataset().unwrap();
    assert_eq!(dataset.category, DataSetCategory::Pin);

    let averages =
        dataset_assembly_averages(&model, state_index, dataset, state.weights_mode()).unwrap();
    assert_eq!(averages.dim(), (2, 2));
    assert_relative_eq!(averages[[1, 0]], 1.1, epsilon = 1e-12);
}
