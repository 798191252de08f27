//! veraview-io: Data models and files for VERAView.
//!
//! This crate provides the in-memory VERAOutput data model, the HDF5
//! reader (behind the `hdf5` feature), the data model manager the state
//! binds to, pin averaging, session files and the background file-open
//! worker.
//!

pub mod average;
mod error;
#[cfg(feature = "hdf5")]
pub mod h5;
pub mod manager;
pub mod model;
pub mod open;
pub mod session;

pub use average::{assembly_averages, dataset_assembly_averages, scalar_average};
pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use h5::{read_vera_hdf5, write_vera_hdf5};
pub use manager::DataModelMgr;
pub use model::{StatePoint, VeraDataModel, TIME_DATASET_NAMES};
pub use open::{
    begin_open, begin_open_with, read_data_file, wait_for_open, OpenMessage, OpenStatus,
};
pub use session::{
    app_data_dir, resolve_app_data_dir, resolve_file, Platform, SessionConfig, WidgetConfig,
};
