//! Core geometry: lookup maps, axial meshes and coordinate normalization.
//!
//! Normalization never fails. Any input tuple is resolved to the nearest
//! valid value, or to the undefined value when the geometry has nothing
//! to resolve against.

use crate::coord::{AssemblyAddr, AxialValue, SubAddr, SubAddrKind, NODE_COUNT, UNDEFINED};
use crate::{Error, Result};

/// Row-major 2D lookup table mapping a grid cell to a 1-based entity
/// index, 0 meaning an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

impl GridMap {
    /// Creates a map from row-major cells.
    ///
    /// # Errors
    /// Returns an error if `cells.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, cells: Vec<i32>) -> Result<Self> {
        if rows * cols != cells.len() {
            return Err(Error::InvalidMapShape {
                rows,
                cols,
                len: cells.len(),
            });
        }
        Ok(Self { rows, cols, cells })
    }

    /// Creates a map from nested rows.
    ///
    /// # Errors
    /// Returns an error if the rows have different lengths.
    pub fn from_rows(rows: &[Vec<i32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(Error::RaggedRow {
                row,
                cols,
                len: cells.len(),
            });
        }
        let cells: Vec<i32> = rows.iter().flatten().copied().collect();
        Self::new(rows.len(), cols, cells)
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns true if the map has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw 1-based value at a cell, `None` outside the grid.
    #[must_use]
    pub fn get(&self, col: i32, row: i32) -> Option<i32> {
        let col = usize::try_from(col).ok().filter(|&c| c < self.cols)?;
        let row = usize::try_from(row).ok().filter(|&r| r < self.rows)?;
        Some(self.cells[row * self.cols + col])
    }

    /// 0-based entity index at a cell, -1 when empty or outside the grid.
    #[must_use]
    pub fn entity_at(&self, col: i32, row: i32) -> i32 {
        self.get(col, row).map_or(UNDEFINED, |value| value - 1)
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&value| value > 0).count()
    }

    /// Largest entity number in the map.
    #[must_use]
    pub fn max_entity(&self) -> i32 {
        self.cells.iter().copied().max().unwrap_or(0).max(0)
    }

    /// Finds the `(col, row)` holding a 0-based entity index.
    #[must_use]
    pub fn locate(&self, index: i32) -> Option<(i32, i32)> {
        let pos = self.cells.iter().position(|&value| value == index + 1)?;
        Some((to_i32(pos % self.cols), to_i32(pos / self.cols)))
    }

    /// Nearest occupied cell to `(col, row)`, preferring the cell itself and
    /// then row-major order among equally distant cells.
    #[must_use]
    pub fn nearest_occupied(&self, col: i32, row: i32) -> Option<(i32, i32)> {
        if self.get(col, row).is_some_and(|value| value > 0) {
            return Some((col, row));
        }
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &value)| value > 0)
            .map(|(pos, _)| (to_i32(pos % self.cols), to_i32(pos / self.cols)))
            .min_by_key(|&(c, r)| {
                let dc = i64::from(c - col);
                let dr = i64::from(r - row);
                dc * dc + dr * dr
            })
    }
}

/// Bounding box of the displayed portion of the core, honoring symmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
}

impl Extent {
    /// Center cell of the extent.
    #[must_use]
    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width / 2, self.top + self.height / 2)
    }
}

/// What an axial value is being derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxialRequest {
    Cm(f64),
    CoreIndex(i32),
    DetectorIndex(i32),
    FixedDetectorIndex(i32),
}

/// Geometry of a reactor core.
///
/// `axial_mesh` and `fixed_detector_mesh` hold level boundaries (one more
/// entry than levels); `detector_mesh` holds detector elevations.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreGeometry {
    pub core_map: GridMap,
    pub detector_map: Option<GridMap>,
    pub core_sym: i32,
    pub npinx: usize,
    pub npiny: usize,
    pub axial_mesh: Vec<f64>,
    pub detector_mesh: Vec<f64>,
    pub fixed_detector_mesh: Vec<f64>,
}

impl CoreGeometry {
    /// Creates full-symmetry geometry around a core map with no pins or meshes.
    #[must_use]
    pub fn new(core_map: GridMap) -> Self {
        Self {
            core_map,
            detector_map: None,
            core_sym: 1,
            npinx: 0,
            npiny: 0,
            axial_mesh: Vec::new(),
            detector_mesh: Vec::new(),
            fixed_detector_mesh: Vec::new(),
        }
    }

    /// Sets the symmetry option.
    #[must_use]
    pub fn with_symmetry(mut self, core_sym: i32) -> Self {
        self.core_sym = core_sym;
        self
    }

    /// Sets the pin counts per assembly.
    #[must_use]
    pub fn with_pins(mut self, npinx: usize, npiny: usize) -> Self {
        self.npinx = npinx;
        self.npiny = npiny;
        self
    }

    /// Sets the core axial mesh boundaries.
    #[must_use]
    pub fn with_axial_mesh(mut self, mesh: Vec<f64>) -> Self {
        self.axial_mesh = mesh;
        self
    }

    /// Sets the detector map.
    #[must_use]
    pub fn with_detector_map(mut self, map: GridMap) -> Self {
        self.detector_map = Some(map);
        self
    }

    /// Sets the detector elevations.
    #[must_use]
    pub fn with_detector_mesh(mut self, mesh: Vec<f64>) -> Self {
        self.detector_mesh = mesh;
        self
    }

    /// Sets the fixed detector mesh boundaries.
    #[must_use]
    pub fn with_fixed_detector_mesh(mut self, mesh: Vec<f64>) -> Self {
        self.fixed_detector_mesh = mesh;
        self
    }

    /// Checks symmetry and mesh ordering.
    ///
    /// # Errors
    /// Returns an error for an unsupported symmetry or a non-ascending mesh.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.core_sym, 1 | 4 | 8) {
            return Err(Error::InvalidSymmetry(self.core_sym));
        }
        for (name, mesh) in [
            ("axial_mesh", &self.axial_mesh),
            ("detector_mesh", &self.detector_mesh),
            ("fixed_detector_mesh", &self.fixed_detector_mesh),
        ] {
            if mesh.windows(2).any(|pair| pair[1] < pair[0]) {
                return Err(Error::InvalidMesh(name.to_string()));
            }
        }
        Ok(())
    }

    /// Number of assemblies. Symmetric cores repeat entity numbers, so this
    /// is the largest number in the map rather than the occupied cell count.
    #[must_use]
    pub fn nass(&self) -> usize {
        usize::try_from(self.core_map.max_entity()).unwrap_or(0)
    }

    /// Number of core axial levels.
    #[must_use]
    pub fn nax(&self) -> usize {
        self.axial_mesh.len().saturating_sub(1)
    }

    /// Number of detectors.
    #[must_use]
    pub fn ndet(&self) -> usize {
        self.detector_map
            .as_ref()
            .map_or(0, |map| usize::try_from(map.max_entity()).unwrap_or(0))
    }

    /// Number of detector axial elevations.
    #[must_use]
    pub fn ndetax(&self) -> usize {
        self.detector_mesh.len()
    }

    /// Number of fixed detector axial levels.
    #[must_use]
    pub fn nfdetax(&self) -> usize {
        self.fixed_detector_mesh.len().saturating_sub(1)
    }

    /// 0-based assembly index at a cell, -1 if empty.
    #[must_use]
    pub fn assembly_at(&self, col: i32, row: i32) -> i32 {
        self.core_map.entity_at(col, row)
    }

    /// 0-based detector index at a cell, -1 if empty or there is no detector map.
    #[must_use]
    pub fn detector_at(&self, col: i32, row: i32) -> i32 {
        self.detector_map
            .as_ref()
            .map_or(UNDEFINED, |map| map.entity_at(col, row))
    }

    /// Resolves an assembly address to the nearest occupied core cell.
    #[must_use]
    pub fn normalize_assembly_addr(&self, addr: AssemblyAddr) -> AssemblyAddr {
        let map = &self.core_map;
        if map.is_empty() {
            return AssemblyAddr::UNDEFINED;
        }

        let (mut col, mut row) = (addr.col, addr.row);
        if (col < 0 || row < 0) && addr.index >= 0 {
            if let Some((c, r)) = map.locate(addr.index) {
                col = c;
                row = r;
            }
        }
        col = clamp_index(col, map.cols());
        row = clamp_index(row, map.rows());

        match map.nearest_occupied(col, row) {
            Some((c, r)) => AssemblyAddr::new(map.entity_at(c, r), c, r),
            None => AssemblyAddr::UNDEFINED,
        }
    }

    /// Clamps a pin or channel address into the assembly.
    #[must_use]
    pub fn normalize_sub_addr(&self, addr: SubAddr, kind: SubAddrKind) -> SubAddr {
        let extra = match kind {
            SubAddrKind::Pin => 0,
            SubAddrKind::Channel => 1,
        };
        let ncols = if self.npinx == 0 { 0 } else { self.npinx + extra };
        let nrows = if self.npiny == 0 { 0 } else { self.npiny + extra };
        SubAddr::new(clamp_index(addr.col, ncols), clamp_index(addr.row, nrows))
    }

    /// Clamps a node address into `[0, 4)`.
    #[must_use]
    pub fn normalize_node_addr(&self, node: i32) -> i32 {
        node.clamp(0, NODE_COUNT - 1)
    }

    /// Derives an axial value and projects it onto every mesh.
    #[must_use]
    pub fn create_axial_value(&self, request: AxialRequest) -> AxialValue {
        let cm = match request {
            AxialRequest::Cm(cm) => Some(cm),
            AxialRequest::CoreIndex(i) => level_center(&self.axial_mesh, i),
            AxialRequest::DetectorIndex(i) => point_value(&self.detector_mesh, i),
            AxialRequest::FixedDetectorIndex(i) => level_center(&self.fixed_detector_mesh, i),
        };

        match cm {
            Some(cm) => AxialValue::new(
                cm,
                level_index(&self.axial_mesh, cm),
                closest_index(&self.detector_mesh, cm),
                level_index(&self.fixed_detector_mesh, cm),
            ),
            None => AxialValue::EMPTY,
        }
    }

    /// Re-projects the cm value of an axial value onto every mesh.
    #[must_use]
    pub fn normalize_axial_value(&self, value: AxialValue) -> AxialValue {
        if value.core_index < 0 && value.detector_index < 0 && value.fixed_detector_index < 0 {
            return self.create_axial_value(AxialRequest::CoreIndex(to_i32(self.nax() / 2)));
        }
        self.create_axial_value(AxialRequest::Cm(value.cm))
    }

    /// Bounding box of the displayed core portion for the symmetry option.
    #[must_use]
    pub fn extract_symmetry_extent(&self) -> Extent {
        let right = to_i32(self.core_map.cols());
        let bottom = to_i32(self.core_map.rows());
        let (left, top) = match self.core_sym {
            4 => (right >> 1, bottom >> 1),
            8 => (right >> 2, bottom >> 2),
            _ => (0, 0),
        };
        Extent {
            left,
            top,
            right,
            bottom,
            width: right - left,
            height: bottom - top,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn to_i32(value: usize) -> i32 {
    value.min(i32::MAX as usize) as i32
}

fn clamp_index(value: i32, count: usize) -> i32 {
    if count == 0 {
        UNDEFINED
    } else {
        value.clamp(0, to_i32(count) - 1)
    }
}

fn level_center(mesh: &[f64], index: i32) -> Option<f64> {
    let levels = mesh.len().checked_sub(1).filter(|&n| n > 0)?;
    let i = usize::try_from(clamp_index(index, levels)).ok()?;
    Some((mesh[i] + mesh[i + 1]) / 2.0)
}

fn point_value(points: &[f64], index: i32) -> Option<f64> {
    let i = usize::try_from(clamp_index(index, points.len())).ok()?;
    points.get(i).copied()
}

/// Level containing `cm` on a boundary mesh, clamped to the mesh.
fn level_index(mesh: &[f64], cm: f64) -> i32 {
    let levels = mesh.len().saturating_sub(1);
    if levels == 0 {
        return UNDEFINED;
    }
    let upper = mesh.partition_point(|&boundary| boundary <= cm);
    to_i32(upper.saturating_sub(1).min(levels - 1))
}

/// Closest elevation to `cm` on a point mesh.
fn closest_index(points: &[f64], cm: f64) -> i32 {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - cm).abs().total_cmp(&(*b - cm).abs()))
        .map_or(UNDEFINED, |(i, _)| to_i32(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // 3x3 core with the corners empty.
    fn cross_core() -> CoreGeometry {
        let map = GridMap::from_rows(&[vec![0, 1, 0], vec![2, 3, 4], vec![0, 5, 0]]).unwrap();
        CoreGeometry::new(map)
            .with_pins(17, 17)
            .with_axial_mesh(vec![0.0, 10.0, 20.0, 30.0, 40.0])
            .with_detector_mesh(vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0])
            .with_fixed_detector_mesh(vec![0.0, 20.0, 40.0])
    }

    #[test]
    fn test_grid_map_shape_mismatch() {
        let err = GridMap::new(2, 2, vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::InvalidMapShape { .. }));
    }

    #[test]
    fn test_grid_map_rejects_ragged_rows() {
        let err = GridMap::from_rows(&[vec![1], vec![2, 3], vec![]]).unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedRow {
                row: 1,
                cols: 1,
                len: 2
            }
        ));
    }

    #[test]
    fn test_grid_lookup() {
        let core = cross_core();
        assert_eq!(core.nass(), 5);
        assert_eq!(core.assembly_at(1, 1), 2);
        assert_eq!(core.assembly_at(0, 0), -1);
        assert_eq!(core.assembly_at(9, 0), -1);
        assert_eq!(core.core_map.locate(4), Some((1, 2)));
        assert_eq!(core.detector_at(1, 1), -1);
    }

    #[test]
    fn test_normalize_assembly_empty_cell() {
        let core = cross_core();
        let addr = core.normalize_assembly_addr(AssemblyAddr::new(-1, 0, 0));
        // (1,0) and (0,1) are equally close; row-major order picks (1,0).
        assert_eq!(addr, AssemblyAddr::new(0, 1, 0));
    }

    #[test]
    fn test_normalize_assembly_out_of_range() {
        let core = cross_core();
        let addr = core.normalize_assembly_addr(AssemblyAddr::new(7, 10, 1));
        assert_eq!(addr, AssemblyAddr::new(3, 2, 1));
    }

    #[test]
    fn test_normalize_assembly_by_index() {
        let core = cross_core();
        let addr = core.normalize_assembly_addr(AssemblyAddr::new(4, -1, -1));
        assert_eq!(addr, AssemblyAddr::new(4, 1, 2));
    }

    #[test]
    fn test_normalize_assembly_empty_map() {
        let core = CoreGeometry::new(GridMap::default());
        assert_eq!(
            core.normalize_assembly_addr(AssemblyAddr::new(0, 0, 0)),
            AssemblyAddr::UNDEFINED
        );
    }

    #[test]
    fn test_normalize_sub_addr() {
        let core = cross_core();
        assert_eq!(
            core.normalize_sub_addr(SubAddr::new(20, -3), SubAddrKind::Pin),
            SubAddr::new(16, 0)
        );
        assert_eq!(
            core.normalize_sub_addr(SubAddr::new(20, 17), SubAddrKind::Channel),
            SubAddr::new(17, 17)
        );
        assert_eq!(core.normalize_node_addr(9), 3);
        assert_eq!(core.normalize_node_addr(-1), 0);
    }

    #[test]
    fn test_axial_from_core_index() {
        let core = cross_core();
        let value = core.create_axial_value(AxialRequest::CoreIndex(2));
        assert_relative_eq!(value.cm, 25.0);
        assert_eq!(value.core_index, 2);
        assert_eq!(value.detector_index, 2);
        assert_eq!(value.fixed_detector_index, 1);
    }

    #[test]
    fn test_axial_from_cm_clamps() {
        let core = cross_core();
        let value = core.create_axial_value(AxialRequest::Cm(99.0));
        assert_eq!(value.core_index, 3);
        assert_eq!(value.detector_index, 5);
        assert_eq!(value.fixed_detector_index, 1);

        let below = core.create_axial_value(AxialRequest::Cm(-4.0));
        assert_eq!(below.core_index, 0);
        assert_eq!(below.detector_index, 0);
    }

    #[test]
    fn test_axial_from_detector_index() {
        let core = cross_core();
        let value = core.create_axial_value(AxialRequest::DetectorIndex(1));
        assert_relative_eq!(value.cm, 15.0);
        assert_eq!(value.core_index, 1);
        assert_eq!(value.fixed_detector_index, 0);
    }

    #[test]
    fn test_axial_without_meshes() {
        let core = CoreGeometry::new(GridMap::from_rows(&[vec![1]]).unwrap());
        assert_eq!(
            core.create_axial_value(AxialRequest::CoreIndex(0)),
            AxialValue::EMPTY
        );
        let value = core.create_axial_value(AxialRequest::Cm(3.0));
        assert_eq!(value.core_index, -1);
        assert_eq!(value.detector_index, -1);
    }

    #[test]
    fn test_normalize_undefined_axial_uses_mid_level() {
        let core = cross_core();
        let value = core.normalize_axial_value(AxialValue::EMPTY);
        assert_eq!(value.core_index, 2);
    }

    #[test]
    fn test_symmetry_extent() {
        let map = GridMap::new(15, 15, vec![1; 225]).unwrap();
        let full = CoreGeometry::new(map.clone());
        assert_eq!(
            full.extract_symmetry_extent(),
            Extent {
                left: 0,
                top: 0,
                right: 15,
                bottom: 15,
                width: 15,
                height: 15,
            }
        );

        let quarter = CoreGeometry::new(map).with_symmetry(4);
        let extent = quarter.extract_symmetry_extent();
        assert_eq!((extent.left, extent.top, extent.width), (7, 7, 8));
        assert_eq!(extent.center(), (11, 11));
    }

    #[test]
    fn test_validate() {
        assert!(cross_core().validate().is_ok());
        assert!(matches!(
            cross_core().with_symmetry(2).validate(),
            Err(Error::InvalidSymmetry(2))
        ));
        assert!(matches!(
            cross_core().with_axial_mesh(vec![0.0, 5.0, 3.0]).validate(),
            Err(Error::InvalidMesh(_))
        ));
    }
}
