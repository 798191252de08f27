//! Coordinate and selection value types.
//!
//! All indices are 0-based; `-1` means undefined.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index value meaning "undefined / not applicable".
pub const UNDEFINED: i32 = -1;

/// Number of sub-assembly nodes for nodal datasets.
pub const NODE_COUNT: i32 = 4;

/// Selected fuel assembly: its index plus its column and row in the core map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[i32; 3]", into = "[i32; 3]"))]
pub struct AssemblyAddr {
    pub index: i32,
    pub col: i32,
    pub row: i32,
}

impl AssemblyAddr {
    /// Fully undefined address.
    pub const UNDEFINED: AssemblyAddr = AssemblyAddr::new(UNDEFINED, UNDEFINED, UNDEFINED);

    /// Creates an address.
    #[must_use]
    pub const fn new(index: i32, col: i32, row: i32) -> Self {
        Self { index, col, row }
    }

    /// Returns true if the index is defined.
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.index >= 0
    }
}

impl Default for AssemblyAddr {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl From<[i32; 3]> for AssemblyAddr {
    fn from([index, col, row]: [i32; 3]) -> Self {
        Self::new(index, col, row)
    }
}

impl From<AssemblyAddr> for [i32; 3] {
    fn from(addr: AssemblyAddr) -> Self {
        [addr.index, addr.col, addr.row]
    }
}

impl fmt::Display for AssemblyAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.index, self.col, self.row)
    }
}

/// Pin or channel position within an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[i32; 2]", into = "[i32; 2]"))]
pub struct SubAddr {
    pub col: i32,
    pub row: i32,
}

impl SubAddr {
    /// Undefined position.
    pub const UNDEFINED: SubAddr = SubAddr::new(UNDEFINED, UNDEFINED);

    /// Creates a position.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

impl Default for SubAddr {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl From<[i32; 2]> for SubAddr {
    fn from([col, row]: [i32; 2]) -> Self {
        Self::new(col, row)
    }
}

impl From<SubAddr> for [i32; 2] {
    fn from(addr: SubAddr) -> Self {
        [addr.col, addr.row]
    }
}

impl fmt::Display for SubAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Whether a sub address refers to pins or to the channels between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAddrKind {
    Pin,
    Channel,
}

/// Selected axial elevation.
///
/// The cm value is authoritative; each index is its projection onto one
/// of the axial meshes (core, detector, fixed detector).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "(f64, i32, i32, i32)", into = "(f64, i32, i32, i32)")
)]
pub struct AxialValue {
    pub cm: f64,
    pub core_index: i32,
    pub detector_index: i32,
    pub fixed_detector_index: i32,
}

impl AxialValue {
    /// No elevation selected.
    pub const EMPTY: AxialValue = AxialValue {
        cm: 0.0,
        core_index: UNDEFINED,
        detector_index: UNDEFINED,
        fixed_detector_index: UNDEFINED,
    };

    /// Creates an axial value.
    #[must_use]
    pub const fn new(
        cm: f64,
        core_index: i32,
        detector_index: i32,
        fixed_detector_index: i32,
    ) -> Self {
        Self {
            cm,
            core_index,
            detector_index,
            fixed_detector_index,
        }
    }

    /// Index on the mesh used by a dataset category.
    #[must_use]
    pub fn index_for(&self, mesh: AxialMesh) -> i32 {
        match mesh {
            AxialMesh::Core => self.core_index,
            AxialMesh::Detector => self.detector_index,
            AxialMesh::FixedDetector => self.fixed_detector_index,
        }
    }
}

impl Default for AxialValue {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<(f64, i32, i32, i32)> for AxialValue {
    fn from((cm, core, det, fixed): (f64, i32, i32, i32)) -> Self {
        Self::new(cm, core, det, fixed)
    }
}

impl From<AxialValue> for (f64, i32, i32, i32) {
    fn from(value: AxialValue) -> Self {
        (
            value.cm,
            value.core_index,
            value.detector_index,
            value.fixed_detector_index,
        )
    }
}

impl fmt::Display for AxialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}cm [core={}, det={}, fixed={}]",
            self.cm, self.core_index, self.detector_index, self.fixed_detector_index
        )
    }
}

/// The axial meshes a dataset can be resolved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxialMesh {
    Core,
    Detector,
    FixedDetector,
}

/// Dataset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DataSetCategory {
    Scalar,
    Pin,
    Channel,
    Detector,
    FixedDetector,
    Time,
}

impl DataSetCategory {
    /// All categories.
    pub const ALL: [DataSetCategory; 6] = [
        DataSetCategory::Scalar,
        DataSetCategory::Pin,
        DataSetCategory::Channel,
        DataSetCategory::Detector,
        DataSetCategory::FixedDetector,
        DataSetCategory::Time,
    ];

    /// Name used in files and menus.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DataSetCategory::Scalar => "scalar",
            DataSetCategory::Pin => "pin",
            DataSetCategory::Channel => "channel",
            DataSetCategory::Detector => "detector",
            DataSetCategory::FixedDetector => "fixed_detector",
            DataSetCategory::Time => "time",
        }
    }

    /// Axial mesh the category is resolved on, if any.
    #[must_use]
    pub const fn axial_mesh(self) -> Option<AxialMesh> {
        match self {
            DataSetCategory::Pin | DataSetCategory::Channel => Some(AxialMesh::Core),
            DataSetCategory::Detector => Some(AxialMesh::Detector),
            DataSetCategory::FixedDetector => Some(AxialMesh::FixedDetector),
            DataSetCategory::Scalar | DataSetCategory::Time => None,
        }
    }
}

impl fmt::Display for DataSetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSetCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DataSetCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// Dataset identifier: a name within a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataSetName {
    pub category: DataSetCategory,
    pub name: String,
}

impl DataSetName {
    /// Creates a dataset identifier.
    pub fn new(category: DataSetCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for DataSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

/// Whether the color scale spans all state points or only the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScaleMode {
    #[default]
    All,
    State,
}

impl FromStr for ScaleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(ScaleMode::All),
            "state" => Ok(ScaleMode::State),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleMode::All => "all",
            ScaleMode::State => "state",
        })
    }
}

/// Whether pins with zero weight are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WeightsMode {
    #[default]
    On,
    Off,
}

impl FromStr for WeightsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(WeightsMode::On),
            "off" => Ok(WeightsMode::Off),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for WeightsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WeightsMode::On => "on",
            WeightsMode::Off => "off",
        })
    }
}
