//! veraview-core: Core types for VERAView state coordination.
//!
//! This crate provides the change-category taxonomy and lock tables, the
//! coordinate value types, core geometry with coordinate normalization,
//! and the traits through which the viewing state talks to data models.
//!

pub mod change;
pub mod coord;
pub mod error;
pub mod geometry;
pub mod model;

pub use change::{resolve_locks, ChangeReason, Locks, StateChange, LOCKABLE_STATES};
pub use coord::{
    AssemblyAddr, AxialMesh, AxialValue, DataSetCategory, DataSetName, ScaleMode, SubAddr,
    SubAddrKind, WeightsMode, NODE_COUNT, UNDEFINED,
};
pub use error::{Error, Result};
pub use geometry::{AxialRequest, CoreGeometry, Extent, GridMap};
pub use model::{
    DataModel, DataModelManager, ModelCallback, ModelEvent, EXPOSURE_TIME_DATASET,
    STATE_TIME_DATASET,
};
