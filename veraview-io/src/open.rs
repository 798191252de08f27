//! Background file opening.
//!
//! Reading a VERAOutput file can take a while, so it runs on a worker
//! thread that reports back over a channel. Only the finished
//! [`OpenStatus`] crosses to the UI thread, where [`OpenStatus::finish`]
//! hands the model to the [`DataModelMgr`] and thereby to the state.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use crate::manager::DataModelMgr;
use crate::model::VeraDataModel;
use crate::session::SessionConfig;
use crate::{Error, Result};

/// Messages sent from the open worker to the UI thread.
#[derive(Debug)]
pub enum OpenMessage {
    /// Progress update with a fraction in `[0, 1]`.
    Progress(f32, String),

    /// The worker is done; always the last message.
    Complete(Box<OpenStatus>),
}

/// Result of a background open.
#[derive(Debug)]
pub struct OpenStatus {
    pub file_path: PathBuf,
    pub session: Option<SessionConfig>,
    /// The model, or human readable reasons it cannot be used.
    pub outcome: std::result::Result<VeraDataModel, Vec<String>>,
}

impl OpenStatus {
    /// Problems reported for the file, empty on success.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match &self.outcome {
            Ok(_) => &[],
            Err(messages) => messages,
        }
    }

    /// Adds the model to `manager` on the UI thread.
    ///
    /// # Errors
    /// Returns the problem messages when the file could not be used.
    pub fn finish(
        self,
        manager: &DataModelMgr,
    ) -> std::result::Result<(Rc<VeraDataModel>, Option<SessionConfig>), Vec<String>> {
        let model = self.outcome?;
        Ok((manager.add_model(model), self.session))
    }
}

/// Reads a data file with the reader this build supports.
///
/// # Errors
/// Returns an error if the file cannot be read, or [`Error::Unsupported`]
/// when built without the `hdf5` feature.
pub fn read_data_file(path: &Path) -> Result<VeraDataModel> {
    #[cfg(feature = "hdf5")]
    {
        crate::h5::read_vera_hdf5(path)
    }
    #[cfg(not(feature = "hdf5"))]
    {
        Err(Error::Unsupported(format!(
            "{}: built without HDF5 support",
            path.display()
        )))
    }
}

/// Starts opening `path` on a worker thread using [`read_data_file`].
pub fn begin_open(
    path: impl Into<PathBuf>,
    session: Option<SessionConfig>,
) -> Receiver<OpenMessage> {
    begin_open_with(path, session, read_data_file)
}

/// Starts opening `path` on a worker thread with a custom reader.
pub fn begin_open_with<F>(
    path: impl Into<PathBuf>,
    session: Option<SessionConfig>,
    reader: F,
) -> Receiver<OpenMessage>
where
    F: FnOnce(&Path) -> Result<VeraDataModel> + Send + 'static,
{
    let path = path.into();
    let (tx, rx) = channel();
    thread::spawn(move || {
        let _ = tx.send(OpenMessage::Progress(
            0.0,
            format!("Opening {}...", path.display()),
        ));
        let outcome = open_worker(&path, reader);
        if let Err(messages) = &outcome {
            log::warn!("cannot open {}: {}", path.display(), messages.join("; "));
        }
        let _ = tx.send(OpenMessage::Progress(1.0, "Done".to_string()));
        let _ = tx.send(OpenMessage::Complete(Box::new(OpenStatus {
            file_path: path,
            session,
            outcome,
        })));
    });
    rx
}

fn open_worker<F>(path: &Path, reader: F) -> std::result::Result<VeraDataModel, Vec<String>>
where
    F: FnOnce(&Path) -> Result<VeraDataModel>,
{
    let model = reader(path).map_err(|err| vec![format!("Error opening data file:\n{err}")])?;
    let messages = model.check();
    if messages.is_empty() {
        Ok(model)
    } else {
        Err(messages)
    }
}

/// Blocks until the worker completes, logging progress.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the worker exits without a result.
pub fn wait_for_open(rx: &Receiver<OpenMessage>) -> Result<OpenStatus> {
    for message in rx {
        match message {
            OpenMessage::Progress(fraction, text) => {
                log::debug!("open {:.0}%: {text}", fraction * 100.0);
            }
            OpenMessage::Complete(status) => return Ok(*status),
        }
    }
    Err(Error::InvalidFormat(
        "open worker exited without a result".to_string(),
    ))
}
