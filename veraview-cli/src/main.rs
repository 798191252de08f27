//! VERAView command-line interface.
//!
//! Opens a VERAOutput file (or a `.vview` session), drives the shared
//! state through the same path the viewer uses and prints the selection.
#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use thiserror::Error;
use veraview_core::{ChangeReason, DataModel, DataModelManager, DataSetCategory, StateChange};
use veraview_io::{
    begin_open, dataset_assembly_averages, resolve_file, wait_for_open, DataModelMgr,
    SessionConfig, VeraDataModel,
};
use veraview_state::{apply, bind_manager, notify, SharedState, State, StatePatch};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    VeraviewIo(#[from] veraview_io::Error),

    #[error("State error: {0}")]
    State(#[from] veraview_state::Error),

    #[error("{}", .0.join("\n"))]
    Open(Vec<String>),

    #[error("no data file given and no user session to restore")]
    NoFile,
}

/// VERAView - reactor output state viewer
#[derive(Parser)]
#[command(name = "veraview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// VERAOutput HDF5 file or .vview session to open
    #[arg(short, long)]
    file_path: Option<PathBuf>,

    /// Do not fall back to the user session when no file is given
    #[arg(long)]
    skip_startup_session_check: bool,

    /// Time dataset to select after opening
    #[arg(long)]
    time_dataset: Option<String>,

    /// Write the resulting state to a session file
    #[arg(long)]
    save_session: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let (file_path, session) = startup_file(&cli)?;
    log::info!("opening {}", file_path.display());

    let status = wait_for_open(&begin_open(&file_path, session))?;
    let manager = Rc::new(DataModelMgr::new());
    let shared = State::new().into_shared();
    bind_manager(&shared, manager.clone());
    shared
        .borrow_mut()
        .add_fn_listener(|reason| log::debug!("state change: {reason}"));

    let (model, session) = status.finish(&manager).map_err(|messages| {
        for message in &messages {
            eprintln!("{message}");
        }
        CliError::Open(messages)
    })?;

    if let Some(session) = &session {
        session.restore_state(&mut shared.borrow_mut())?;
        manager.set_time_dataset(shared.borrow().time_dataset());
        notify(&shared, ChangeReason::of(StateChange::Init));
    }
    if let Some(name) = &cli.time_dataset {
        let reason = apply(&shared, &StatePatch::new().with_time_dataset(name.as_str()), None);
        if reason.is_noop() {
            log::info!("time dataset already {name}");
        }
    }

    print_summary(&shared, &manager, &model);

    if let Some(path) = &cli.save_session {
        let mut session = session
            .unwrap_or_default()
            .with_file_path(std::path::absolute(&file_path)?);
        session.save_state(&shared.borrow())?;
        session.write(path)?;
        println!("Session written to {}", path.display());
    }
    Ok(())
}

/// The data file named on the command line or by the user session.
fn startup_file(cli: &Cli) -> Result<(PathBuf, Option<SessionConfig>)> {
    if let Some(path) = &cli.file_path {
        return Ok(resolve_file(path)?);
    }
    if cli.skip_startup_session_check {
        return Err(CliError::NoFile);
    }
    let Some(session) = SessionConfig::read_user_file()? else {
        return Err(CliError::NoFile);
    };
    match session.file_path.clone() {
        Some(path) if path.exists() => Ok((path, Some(session))),
        Some(path) => {
            log::warn!("user session file {} no longer exists", path.display());
            Err(CliError::NoFile)
        }
        None => Err(CliError::NoFile),
    }
}

fn print_summary(shared: &SharedState, manager: &DataModelMgr, model: &VeraDataModel) {
    let state = shared.borrow();
    let core = model.core();

    println!("File: {}", model.label());
    println!(
        "Core: {} assemblies, {} axial levels, {}x{} pins",
        core.nass(),
        core.nax(),
        core.npinx,
        core.npiny
    );
    println!(
        "Time datasets: {}",
        manager.resolve_available_time_datasets().join(", ")
    );
    println!("State: {state}");

    let Some(dataset) = state.cur_dataset() else {
        return;
    };
    if dataset.category != DataSetCategory::Pin {
        return;
    }
    let state_index = manager.time_value_index(state.time_value()).unwrap_or(0);
    let averages =
        match dataset_assembly_averages(model, state_index, dataset, state.weights_mode()) {
            Ok(averages) => averages,
            Err(err) => {
                log::warn!("cannot average {dataset}: {err}");
                return;
            }
        };

    let level = usize::try_from(state.axial_value().core_index).ok();
    let assy = usize::try_from(state.assembly_addr().index).ok();
    if let (Some(level), Some(assy)) = (level, assy) {
        if let Some(value) = averages.get([level, assy]) {
            println!(
                "{} average at assembly {} level {}: {:.6}",
                dataset.name,
                assy + 1,
                level + 1,
                value
            );
        }
    }
}
