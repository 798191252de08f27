//! The shared viewing state.
//!
//! A [`State`] holds the current selection (assembly, axial level, dataset,
//! time point and so on) that every view follows. Views request updates
//! with [`State::change`], which applies the update under an optional lock
//! table and reports what actually changed as a [`ChangeReason`]. The caller
//! then fans the reason out with [`State::fire_state_change`] or [`notify`].
//!
//! The state is single-threaded. It is shared through [`SharedState`] and
//! never crosses threads; background work communicates back through
//! channels.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use veraview_core::{
    AssemblyAddr, AxialRequest, AxialValue, ChangeReason, DataModel, DataModelManager,
    DataSetCategory, DataSetName, Locks, ModelEvent, ScaleMode, StateChange, SubAddr,
    SubAddrKind, WeightsMode, EXPOSURE_TIME_DATASET, STATE_TIME_DATASET, UNDEFINED,
};

use crate::listener::{dispatch, FnListener, Listeners, StateListener};
use crate::patch::StatePatch;

/// State shared between the views of one window.
pub type SharedState = Rc<RefCell<State>>;

/// Current selection shared by all views.
pub struct State {
    pub(crate) assembly_addr: AssemblyAddr,
    pub(crate) aux_node_addrs: Vec<i32>,
    pub(crate) aux_sub_addrs: Vec<SubAddr>,
    pub(crate) axial_value: AxialValue,
    pub(crate) cur_dataset: Option<DataSetName>,
    pub(crate) data_model_mgr: Option<Rc<dyn DataModelManager>>,
    pub(crate) node_addr: i32,
    pub(crate) scale_mode: ScaleMode,
    pub(crate) sub_addr: SubAddr,
    pub(crate) time_dataset: String,
    pub(crate) time_value: f64,
    pub(crate) weights_mode: WeightsMode,
    listeners: Listeners,
    locks: Locks,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Creates an empty state with every field undefined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assembly_addr: AssemblyAddr::UNDEFINED,
            aux_node_addrs: Vec::new(),
            aux_sub_addrs: Vec::new(),
            axial_value: AxialValue::EMPTY,
            cur_dataset: None,
            data_model_mgr: None,
            node_addr: UNDEFINED,
            scale_mode: ScaleMode::All,
            sub_addr: SubAddr::UNDEFINED,
            time_dataset: STATE_TIME_DATASET.to_string(),
            time_value: 0.0,
            weights_mode: WeightsMode::On,
            listeners: Listeners::new(),
            locks: Locks::ALL,
        }
    }

    /// Wraps the state for sharing between views.
    #[must_use]
    pub fn into_shared(self) -> SharedState {
        Rc::new(RefCell::new(self))
    }

    // -- accessors ---------------------------------------------------------

    #[must_use]
    pub fn assembly_addr(&self) -> AssemblyAddr {
        self.assembly_addr
    }

    #[must_use]
    pub fn aux_node_addrs(&self) -> &[i32] {
        &self.aux_node_addrs
    }

    #[must_use]
    pub fn aux_sub_addrs(&self) -> &[SubAddr] {
        &self.aux_sub_addrs
    }

    #[must_use]
    pub fn axial_value(&self) -> AxialValue {
        self.axial_value
    }

    #[must_use]
    pub fn cur_dataset(&self) -> Option<&DataSetName> {
        self.cur_dataset.as_ref()
    }

    #[must_use]
    pub fn data_model_mgr(&self) -> Option<&Rc<dyn DataModelManager>> {
        self.data_model_mgr.as_ref()
    }

    #[must_use]
    pub fn node_addr(&self) -> i32 {
        self.node_addr
    }

    #[must_use]
    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    #[must_use]
    pub fn sub_addr(&self) -> SubAddr {
        self.sub_addr
    }

    #[must_use]
    pub fn time_dataset(&self) -> &str {
        &self.time_dataset
    }

    #[must_use]
    pub fn time_value(&self) -> f64 {
        self.time_value
    }

    #[must_use]
    pub fn weights_mode(&self) -> WeightsMode {
        self.weights_mode
    }

    /// The all-permissive lock table. Always the same instance.
    #[must_use]
    pub fn all_locks(&self) -> &Locks {
        &self.locks
    }

    /// First model of the bound manager.
    #[must_use]
    pub fn first_data_model(&self) -> Option<Rc<dyn DataModel>> {
        self.data_model_mgr
            .as_ref()
            .and_then(|mgr| mgr.first_data_model())
    }

    /// Detector cell at the current assembly column and row.
    ///
    /// The index is undefined when there is no model or no detector there.
    #[must_use]
    pub fn detector_addr(&self) -> AssemblyAddr {
        let AssemblyAddr { col, row, .. } = self.assembly_addr;
        let index = self
            .first_data_model()
            .map_or(UNDEFINED, |model| model.core().detector_at(col, row));
        AssemblyAddr::new(index, col, row)
    }

    // -- listeners ---------------------------------------------------------

    /// Registers a listener. Registering the same listener twice is a no-op.
    pub fn add_listener(&mut self, listener: Rc<dyn StateListener>) {
        self.listeners.add(listener);
    }

    /// Registers several listeners in order.
    pub fn add_listeners<I>(&mut self, listeners: I)
    where
        I: IntoIterator<Item = Rc<dyn StateListener>>,
    {
        for listener in listeners {
            self.listeners.add(listener);
        }
    }

    /// Registers a closure and returns its handle for later removal.
    pub fn add_fn_listener<F>(&mut self, f: F) -> Rc<dyn StateListener>
    where
        F: Fn(ChangeReason) + 'static,
    {
        let listener: Rc<dyn StateListener> = Rc::new(FnListener::new(f));
        self.listeners.add(listener.clone());
        listener
    }

    /// Unregisters a listener. Unknown listeners are ignored.
    pub fn remove_listener(&mut self, listener: &Rc<dyn StateListener>) {
        self.listeners.remove(listener);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Notifies every listener of `reason`, in registration order.
    ///
    /// An empty reason notifies nobody. A listener that errors or panics is
    /// logged and skipped.
    pub fn fire_state_change(&self, reason: ChangeReason) {
        dispatch(&self.listeners.snapshot(), reason);
    }

    // -- updates -----------------------------------------------------------

    /// Applies the fields present in `patch` and reports what changed.
    ///
    /// Fields in a lockable category are only applied when `locks` enables
    /// that category; `None` applies everything, as with
    /// [`all_locks`](Self::all_locks). Listeners are not notified.
    pub fn change(&mut self, patch: &StatePatch, locks: Option<&Locks>) -> ChangeReason {
        let locks = locks.copied().unwrap_or(Locks::ALL);
        let mut reason = ChangeReason::NOOP;

        if locks.is_enabled(StateChange::Coordinates) {
            if let Some(addr) = patch.assembly_addr {
                self.assembly_addr = addr;
                reason |= StateChange::Coordinates;
            } else if let Some(addr) = patch.detector_addr {
                self.assembly_addr = self.assembly_for_detector(addr);
                reason |= StateChange::Coordinates;
            }
            if let Some(nodes) = &patch.aux_node_addrs {
                self.aux_node_addrs.clone_from(nodes);
                reason |= StateChange::Coordinates;
            }
            if let Some(addrs) = &patch.aux_sub_addrs {
                self.aux_sub_addrs.clone_from(addrs);
                reason |= StateChange::Coordinates;
            }
            if let Some(node) = patch.node_addr {
                self.node_addr = node;
                reason |= StateChange::Coordinates;
            }
            if let Some(addr) = patch.sub_addr {
                self.sub_addr = addr;
                reason |= StateChange::Coordinates;
            }
        }

        if let Some(value) = patch.axial_value {
            if locks.is_enabled(StateChange::AxialValue) {
                self.axial_value = value;
                reason |= StateChange::AxialValue;
            }
        }

        if let Some(dataset) = &patch.cur_dataset {
            if locks.is_enabled(StateChange::CurDataSet) {
                self.cur_dataset = Some(dataset.clone());
                reason |= StateChange::CurDataSet;
                // Views re-derive their axial and time selections for the new dataset.
                if patch.axial_value.is_none() {
                    reason |= StateChange::AxialValue;
                }
                if patch.time_value.is_none() {
                    reason |= StateChange::TimeValue;
                }
            }
        }

        if let Some(mgr) = &patch.data_model_mgr {
            self.data_model_mgr = Some(Rc::clone(mgr));
            reason |= StateChange::DataModelMgr;
        }

        if let Some(mode) = patch.scale_mode {
            if locks.is_enabled(StateChange::ScaleMode) {
                self.scale_mode = mode;
                reason |= StateChange::ScaleMode;
            }
        }

        if let Some(name) = &patch.time_dataset {
            if locks.is_enabled(StateChange::TimeValue) && *name != self.time_dataset {
                reason |= self.switch_time_dataset(name);
            }
        }

        if let Some(value) = patch.time_value {
            if locks.is_enabled(StateChange::TimeValue) {
                self.time_value = value;
                reason |= StateChange::TimeValue;
            }
        }

        if let Some(mode) = patch.weights_mode {
            self.weights_mode = mode;
            reason |= StateChange::WeightsMode;
        }

        reason
    }

    /// Switches the time axis, keeping the same position along it.
    fn switch_time_dataset(&mut self, name: &str) -> ChangeReason {
        let mut reason = ChangeReason::of(StateChange::TimeDataSet);
        let mgr = self.data_model_mgr.clone();
        // The manager may be on another axis after props were restored.
        let index = mgr.as_ref().and_then(|mgr| {
            mgr.set_time_dataset(&self.time_dataset);
            mgr.time_value_index(self.time_value)
        });

        self.time_dataset = name.to_string();
        if let Some(mgr) = &mgr {
            mgr.set_time_dataset(name);
            if let Some(index) = index {
                self.time_value = mgr.time_index_value(index);
                reason |= StateChange::TimeValue;
            }
        }
        log::debug!("time dataset now {name}, time value {}", self.time_value);
        reason
    }

    fn assembly_for_detector(&self, addr: AssemblyAddr) -> AssemblyAddr {
        let index = self
            .first_data_model()
            .map_or(UNDEFINED, |model| model.core().assembly_at(addr.col, addr.row));
        AssemblyAddr::new(index, addr.col, addr.row)
    }

    /// Builds the patch that would reproduce the current values of every
    /// field covered by `reason`. [`StateChange::Init`] selects every field.
    #[must_use]
    pub fn create_update_args(&self, reason: ChangeReason) -> StatePatch {
        let init = reason.contains(StateChange::Init);
        let wants = |change: StateChange| init || reason.contains(change);
        let mut patch = StatePatch::new();

        if wants(StateChange::Coordinates) {
            patch.assembly_addr = Some(self.assembly_addr);
            patch.aux_node_addrs = Some(self.aux_node_addrs.clone());
            patch.aux_sub_addrs = Some(self.aux_sub_addrs.clone());
            patch.node_addr = Some(self.node_addr);
            patch.sub_addr = Some(self.sub_addr);
        }
        if wants(StateChange::AxialValue) {
            patch.axial_value = Some(self.axial_value);
        }
        if wants(StateChange::CurDataSet) {
            patch.cur_dataset.clone_from(&self.cur_dataset);
        }
        if wants(StateChange::DataModelMgr) {
            patch.data_model_mgr.clone_from(&self.data_model_mgr);
        }
        if wants(StateChange::ScaleMode) {
            patch.scale_mode = Some(self.scale_mode);
        }
        if wants(StateChange::TimeDataSet) {
            patch.time_dataset = Some(self.time_dataset.clone());
        }
        if wants(StateChange::TimeValue) {
            patch.time_value = Some(self.time_value);
        }
        if wants(StateChange::WeightsMode) {
            patch.weights_mode = Some(self.weights_mode);
        }
        patch
    }

    /// Resets every field from the first model of the bound manager.
    ///
    /// Without a model every field is set back to undefined. Returns the
    /// [`StateChange::Init`] reason and also fires it when `fire` is set.
    ///
    /// Firing happens inside this borrow, so listeners of a [`SharedState`]
    /// cannot read it back. Use [`reinit`] for shared states.
    pub fn init(&mut self, fire: bool) -> ChangeReason {
        self.assembly_addr = AssemblyAddr::UNDEFINED;
        self.aux_node_addrs.clear();
        self.aux_sub_addrs.clear();
        self.axial_value = AxialValue::EMPTY;
        self.cur_dataset = None;
        self.node_addr = UNDEFINED;
        self.scale_mode = ScaleMode::All;
        self.sub_addr = SubAddr::UNDEFINED;
        self.time_dataset = STATE_TIME_DATASET.to_string();
        self.time_value = 0.0;
        self.weights_mode = WeightsMode::On;

        if let Some(mgr) = self.data_model_mgr.clone() {
            if let Some(model) = mgr.first_data_model() {
                self.init_from_model(model.as_ref());
            }

            let available = mgr.resolve_available_time_datasets();
            if available.iter().any(|name| name == EXPOSURE_TIME_DATASET) {
                self.time_dataset = EXPOSURE_TIME_DATASET.to_string();
            }
            mgr.set_time_dataset(&self.time_dataset);
            self.time_value = mgr.time_index_value(0);
        }

        log::debug!("state initialized: {self}");
        let reason = ChangeReason::of(StateChange::Init);
        if fire {
            self.fire_state_change(reason);
        }
        reason
    }

    fn init_from_model(&mut self, model: &dyn DataModel) {
        let core = model.core();
        let (col, row) = model.extract_symmetry_extent().center();
        self.assembly_addr =
            model.normalize_assembly_addr(AssemblyAddr::new(core.assembly_at(col, row), col, row));
        self.axial_value = model.create_axial_value(AxialRequest::CoreIndex(half(core.nax())));
        self.cur_dataset = model
            .first_dataset(DataSetCategory::Pin)
            .or_else(|| model.default_dataset());
        self.node_addr = 0;
        self.sub_addr = model.normalize_sub_addr(
            SubAddr::new(half(core.npinx), half(core.npiny)),
            SubAddrKind::Pin,
        );
    }
}

fn half(count: usize) -> i32 {
    i32::try_from(count / 2).unwrap_or(i32::MAX)
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("assembly_addr", &self.assembly_addr)
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
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "assembly={} axial={} dataset={} node={} sub={} time={}:{} scale={} weights={}",
            self.assembly_addr,
            self.axial_value,
            self.cur_dataset
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            self.node_addr,
            self.sub_addr,
            self.time_dataset,
            self.time_value,
            self.scale_mode,
            self.weights_mode,
        )
    }
}

/// Fires `reason` to the listeners of a shared state.
///
/// The listener list is copied and the borrow released before dispatch, so
/// listeners may read the state or call [`apply`] themselves.
pub fn notify(state: &RefCell<State>, reason: ChangeReason) {
    if reason.is_noop() {
        return;
    }
    let listeners = state.borrow().listeners.snapshot();
    dispatch(&listeners, reason);
}

/// Applies `patch` to a shared state and notifies its listeners.
pub fn apply(state: &RefCell<State>, patch: &StatePatch, locks: Option<&Locks>) -> ChangeReason {
    let reason = state.borrow_mut().change(patch, locks);
    notify(state, reason);
    reason
}

/// Re-initializes a shared state and notifies its listeners once the
/// borrow is released.
pub fn reinit(state: &RefCell<State>) -> ChangeReason {
    let reason = state.borrow_mut().init(false);
    notify(state, reason);
    reason
}

/// Binds `manager` to a shared state.
///
/// The manager is stored through [`State::change`]. The state then
/// re-initializes and fires [`StateChange::Init`] whenever the first model
/// is added or the last one is removed.
pub fn bind_manager(state: &SharedState, manager: Rc<dyn DataModelManager>) -> ChangeReason {
    let patch = StatePatch::new().with_data_model_mgr(Rc::clone(&manager));
    let reason = state.borrow_mut().change(&patch, None);

    let weak = Rc::downgrade(state);
    manager.subscribe(Rc::new(move |event: &ModelEvent| {
        let resets = matches!(
            event,
            ModelEvent::Added { count: 1, .. } | ModelEvent::Removed { count: 0, .. }
        );
        if !resets {
            return;
        }
        let Some(state) = weak.upgrade() else {
            return;
        };
        let reason = match state.try_borrow_mut() {
            Ok(mut guard) => guard.init(false),
            Err(_) => {
                log::warn!("state busy, skipping re-initialization after {event:?}");
                return;
            }
        };
        notify(&state, reason);
    }));

    reason
}
