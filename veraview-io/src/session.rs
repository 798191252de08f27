//! Session and widget configuration files.
//!
//! A session is a JSON object holding the frame geometry, the open file,
//! the persisted state properties and one entry per widget:
//!
//! ```json
//! {
//!   "filePath": "/data/c1.h5",
//!   "framePosition": [10, 20],
//!   "frameSize": [1280, 800],
//!   "state": { "assemblyAddr": [4, 2, 2] },
//!   "widgets": [ { "classpath": "widget.core_view.Core2DView", "mode": "pin" } ]
//! }
//! ```
//!
//! The per-user file lives at `<app data dir>/widget.config`; sessions
//! saved explicitly use the `.vview` extension.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use veraview_state::State;

use crate::{Error, Result};

/// Application directory name on macOS and Windows.
pub const APP_NAME: &str = "VERAView";

/// Fallback directory name under the home directory.
pub const APP_DIR_FALLBACK: &str = ".veraview";

/// Name of the per-user session file.
pub const USER_CONFIG_FILE: &str = "widget.config";

/// Extension of explicit session files.
pub const SESSION_EXTENSION: &str = "vview";

/// Persisted properties of one widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Fully qualified widget type name.
    pub classpath: String,
    /// Widget-specific properties stored next to `classpath`.
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl WidgetConfig {
    #[must_use]
    pub fn new(classpath: impl Into<String>) -> Self {
        Self {
            classpath: classpath.into(),
            props: Map::new(),
        }
    }

    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

/// A saved session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_position: Option<[i32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_size: Option<[u32; 2]>,
    #[serde(default)]
    pub state: Map<String, Value>,
    #[serde(default)]
    pub widgets: Vec<WidgetConfig>,
}

impl SessionConfig {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some([width, height]);
        self
    }

    #[must_use]
    pub fn with_frame_position(mut self, x: i32, y: i32) -> Self {
        self.frame_position = Some([x, y]);
        self
    }

    #[must_use]
    pub fn with_widget(mut self, widget: WidgetConfig) -> Self {
        self.widgets.push(widget);
        self
    }

    /// Reads a session file. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the session as pretty JSON, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Stores the persistent fields of `state`.
    ///
    /// # Errors
    /// Returns an error if a field cannot be serialized.
    pub fn save_state(&mut self, state: &State) -> Result<()> {
        self.state.clear();
        state.save_props(&mut self.state)?;
        Ok(())
    }

    /// Restores the persisted fields into `state`. Listeners are not notified.
    ///
    /// # Errors
    /// Returns an error if a stored property is malformed.
    pub fn restore_state(&self, state: &mut State) -> Result<()> {
        state.load_props(&self.state)?;
        Ok(())
    }

    /// Path of the per-user session file.
    ///
    /// # Errors
    /// Returns an error if the application directory cannot be created.
    pub fn user_file_path(create_dir: bool) -> Result<PathBuf> {
        Ok(app_data_dir(create_dir)?.join(USER_CONFIG_FILE))
    }

    /// Reads the per-user session file, `None` when there is none yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed.
    pub fn read_user_file() -> Result<Option<Self>> {
        let path = Self::user_file_path(false)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    /// Writes the per-user session file and returns its path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_user_file(&self) -> Result<PathBuf> {
        let path = Self::user_file_path(true)?;
        self.write(&path)?;
        log::info!("saved session to {}", path.display());
        Ok(path)
    }
}

/// Platform family for application directory resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Platform of the running build.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// Resolves the application data directory.
///
/// macOS uses `~/Library/Application Support/VERAView` when
/// `Application Support` exists, Windows uses `<data_dir>/VERAView`
/// (`%APPDATA%`), everything else falls back to `~/.veraview` or to
/// `./.veraview` without a home directory.
#[must_use]
pub fn resolve_app_data_dir(
    platform: Platform,
    home: Option<&Path>,
    data_dir: Option<&Path>,
) -> PathBuf {
    match (platform, home, data_dir) {
        (Platform::MacOs, Some(home), _) => {
            let support = home.join("Library").join("Application Support");
            if support.is_dir() {
                return support.join(APP_NAME);
            }
        }
        (Platform::Windows, _, Some(data_dir)) => return data_dir.join(APP_NAME),
        _ => {}
    }
    home.map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        .join(APP_DIR_FALLBACK)
}

/// The application data directory for the current user.
///
/// # Errors
/// Returns an error if `create` is set and the directory cannot be created.
pub fn app_data_dir(create: bool) -> Result<PathBuf> {
    let base = BaseDirs::new();
    let dir = resolve_app_data_dir(
        Platform::current(),
        base.as_ref().map(BaseDirs::home_dir),
        base.as_ref().map(BaseDirs::data_dir),
    );
    if create && !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Resolves a file argument into the data file to open.
///
/// A `.vview` path is read as a session and its `filePath` (relative paths
/// resolved against the session's directory) is returned with it. Any
/// other path is returned unchanged.
///
/// # Errors
/// Returns an error if the session cannot be read or names no data file.
pub fn resolve_file<P: AsRef<Path>>(path: P) -> Result<(PathBuf, Option<SessionConfig>)> {
    let path = path.as_ref();
    let is_session = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SESSION_EXTENSION));
    if !is_session {
        return Ok((path.to_path_buf(), None));
    }

    let session = SessionConfig::read(path)?;
    let file_path = session.file_path.clone().ok_or_else(|| {
        Error::InvalidFormat(format!("{}: session has no filePath", path.display()))
    })?;
    let file_path = match path.parent() {
        Some(dir) if file_path.is_relative() => dir.join(file_path),
        _ => file_path,
    };
    Ok((file_path, Some(session)))
}
