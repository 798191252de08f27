//! veraview-state: Shared viewing state for VERAView.
//!
//! The [`State`] holds the selection every view follows. Updates are
//! applied with [`State::change`] under an optional [`Locks`] table, which
//! yields a [`ChangeReason`]; the reason is then fanned out to registered
//! [`StateListener`]s.
//!
//! [`Locks`]: veraview_core::Locks
//! [`ChangeReason`]: veraview_core::ChangeReason

pub mod error;
pub mod listener;
pub mod patch;
pub mod props;
pub mod state;

pub use error::{Error, Result};
pub use listener::{FnListener, ListenerResult, Listeners, StateListener};
pub use patch::StatePatch;
pub use props::PROP_KEYS;
pub use state::{apply, bind_manager, notify, reinit, SharedState, State};
