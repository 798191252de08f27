//! VERAOutput HDF5 reading and writing.
//!
//! Layout: a `CORE` group with the geometry (`core_map` required) and one
//! `STATE_NNNN` group per state point holding numeric datasets.

use std::path::Path;

use hdf5::types::TypeDescriptor;
use hdf5::{Dataset, File, Group};
use ndarray::{ArrayD, ArrayView2};
use veraview_core::{CoreGeometry, DataModel, GridMap};

use crate::model::{StatePoint, VeraDataModel};
use crate::{Error, Result};

const CORE_GROUP: &str = "CORE";
const STATE_PREFIX: &str = "STATE_";

/// Reads a VERAOutput file into memory.
///
/// # Errors
/// Returns an error if HDF5 I/O fails or `CORE/core_map` is missing or
/// malformed.
pub fn read_vera_hdf5<P: AsRef<Path>>(path: P) -> Result<VeraDataModel> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let core_group = file
        .group(CORE_GROUP)
        .map_err(|_| Error::InvalidFormat(format!("{}: missing CORE group", path.display())))?;

    let states = read_states(&file)?;
    let core = read_core(&core_group, &states)?;
    let label = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    log::debug!(
        "read {label}: {} states, {} assemblies, {} axial levels",
        states.len(),
        core.nass(),
        core.nax()
    );

    let mut model = VeraDataModel::new(label, core, states);
    if let Some(volumes) = read_array_opt(&core_group, "pin_volumes")? {
        model = model.with_pin_volumes(volumes);
    }
    Ok(model)
}

fn read_core(group: &Group, states: &[StatePoint]) -> Result<CoreGeometry> {
    let core_map = read_grid_map(group, "core_map")?
        .ok_or_else(|| Error::InvalidFormat("CORE/core_map is required".to_string()))?;
    let mut core = CoreGeometry::new(core_map);

    if let Some(sym) = read_scalar_opt::<i32>(group, "core_sym")? {
        core = core.with_symmetry(sym);
    }
    if let Some(mesh) = read_dataset_vec_opt::<f64>(group, "axial_mesh")? {
        core = core.with_axial_mesh(mesh);
    }
    if let Some(map) = read_grid_map(group, "detector_map")? {
        core = core.with_detector_map(map);
    }
    if let Some(mesh) = read_dataset_vec_opt::<f64>(group, "detector_mesh")? {
        core = core.with_detector_mesh(mesh);
    }
    if let Some(mesh) = read_dataset_vec_opt::<f64>(group, "fixed_detector_mesh")? {
        core = core.with_fixed_detector_mesh(mesh);
    }

    let (npinx, npiny) = match read_scalar_opt::<i32>(group, "npin")? {
        Some(npin) => {
            let npin = usize::try_from(npin)
                .map_err(|_| Error::InvalidFormat(format!("CORE/npin is negative: {npin}")))?;
            (npin, npin)
        }
        None => infer_pin_counts(group, &core, states)?,
    };
    Ok(core.with_pins(npinx, npiny))
}

/// Pin counts from `pin_volumes`, else the smallest 4-D state dataset that
/// matches the axial and assembly counts.
fn infer_pin_counts(
    group: &Group,
    core: &CoreGeometry,
    states: &[StatePoint],
) -> Result<(usize, usize)> {
    if let Ok(ds) = group.dataset("pin_volumes") {
        if let [y, x, _, _] = ds.shape()[..] {
            return Ok((x, y));
        }
    }
    let Some(first) = states.first() else {
        return Ok((0, 0));
    };
    let (nax, nass) = (core.nax(), core.nass());
    Ok(first
        .names()
        .filter_map(|name| first.get(name))
        .filter_map(|data| match data.shape() {
            [y, x, z, n] if *z == nax && *n == nass => Some((*x, *y)),
            _ => None,
        })
        .min_by_key(|&(x, y)| x * y)
        .unwrap_or((0, 0)))
}

fn read_states(file: &File) -> Result<Vec<StatePoint>> {
    let mut groups: Vec<(u32, String)> = file
        .member_names()?
        .into_iter()
        .filter_map(|name| {
            let number = name.strip_prefix(STATE_PREFIX)?.parse::<u32>().ok()?;
            Some((number, name))
        })
        .collect();
    groups.sort_unstable();

    let mut states = Vec::with_capacity(groups.len());
    for (_, name) in groups {
        let group = file.group(&name)?;
        let mut state = StatePoint::new();
        for dataset in group.datasets()? {
            let full_name = dataset.name();
            let short = full_name.rsplit('/').next().unwrap_or(&full_name).to_string();
            if is_numeric(&dataset)? {
                state.insert(short, dataset.read_dyn::<f64>()?);
            } else {
                log::debug!("{name}/{short}: skipping non-numeric dataset");
            }
        }
        states.push(state);
    }
    Ok(states)
}

fn is_numeric(dataset: &Dataset) -> Result<bool> {
    Ok(matches!(
        dataset.dtype()?.to_descriptor()?,
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Float(_)
    ))
}

fn read_grid_map(group: &Group, name: &str) -> Result<Option<GridMap>> {
    let Ok(ds) = group.dataset(name) else {
        return Ok(None);
    };
    let shape = ds.shape();
    let [rows, cols] = shape[..] else {
        return Err(Error::InvalidFormat(format!(
            "CORE/{name} must be 2-D, found shape {shape:?}"
        )));
    };
    Ok(Some(GridMap::new(rows, cols, ds.read_raw::<i32>()?)?))
}

fn read_array_opt(group: &Group, name: &str) -> Result<Option<ArrayD<f64>>> {
    match group.dataset(name) {
        Ok(dataset) => Ok(Some(dataset.read_dyn::<f64>()?)),
        Err(_) => Ok(None),
    }
}

fn read_dataset_vec_opt<T: hdf5::H5Type>(group: &Group, name: &str) -> Result<Option<Vec<T>>> {
    match group.dataset(name) {
        Ok(dataset) => Ok(Some(dataset.read_raw::<T>()?)),
        Err(_) => Ok(None),
    }
}

fn read_scalar_opt<T: hdf5::H5Type + Copy>(group: &Group, name: &str) -> Result<Option<T>> {
    Ok(read_dataset_vec_opt::<T>(group, name)?.and_then(|values| values.first().copied()))
}

/// Writes a model in the VERAOutput layout.
///
/// # Errors
/// Returns an error if the file or any dataset cannot be created.
pub fn write_vera_hdf5<P: AsRef<Path>>(path: P, model: &VeraDataModel) -> Result<()> {
    let file = File::create(path)?;
    let core = model.core();
    let core_group = file.create_group(CORE_GROUP)?;

    write_grid_map(&core_group, "core_map", &core.core_map)?;
    if let Some(map) = &core.detector_map {
        write_grid_map(&core_group, "detector_map", map)?;
    }
    core_group
        .new_dataset::<i32>()
        .shape(())
        .create("core_sym")?
        .write_scalar(&core.core_sym)?;
    for (name, mesh) in [
        ("axial_mesh", &core.axial_mesh),
        ("detector_mesh", &core.detector_mesh),
        ("fixed_detector_mesh", &core.fixed_detector_mesh),
    ] {
        if !mesh.is_empty() {
            core_group
                .new_dataset::<f64>()
                .shape(mesh.len())
                .create(name)?
                .write(mesh.as_slice())?;
        }
    }
    if let Some(volumes) = model.pin_weights() {
        write_array(&core_group, "pin_volumes", volumes)?;
    }

    for (i, state) in model.states().iter().enumerate() {
        let group = file.create_group(&format!("{STATE_PREFIX}{:04}", i + 1))?;
        for name in state.names() {
            if let Some(data) = state.get(name) {
                write_array(&group, name, data)?;
            }
        }
    }
    Ok(())
}

fn write_grid_map(group: &Group, name: &str, map: &GridMap) -> Result<()> {
    let (rows, cols) = (map.rows(), map.cols());
    let mut cells = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            cells.push(map.get(to_i32(col), to_i32(row)).unwrap_or(0));
        }
    }
    let view = ArrayView2::from_shape((rows, cols), cells.as_slice())
        .map_err(|e| Error::InvalidFormat(format!("{name} shape mismatch: {e}")))?;
    group
        .new_dataset::<i32>()
        .shape((rows, cols))
        .create(name)?
        .write(view)?;
    Ok(())
}

fn write_array(group: &Group, name: &str, data: &ArrayD<f64>) -> Result<()> {
    if data.ndim() == 0 {
        let value = data.iter().next().copied().unwrap_or_default();
        group
            .new_dataset::<f64>()
            .shape(())
            .create(name)?
            .write_scalar(&value)?;
    } else {
        group
            .new_dataset::<f64>()
            .shape(data.shape().to_vec())
            .create(name)?
            .write(data.view())?;
    }
    Ok(())
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::small_model;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;
    use veraview_core::DataSetCategory;

    #[test]
    fn test_hdf5_model_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let model = small_model();
        write_vera_hdf5(file.path(), &model).unwrap();

        let read = read_vera_hdf5(file.path()).unwrap();
        assert_eq!(read.state_count(), 3);
        assert_eq!(read.core().nass(), 4);
        assert_eq!(read.core().nax(), 3);
        assert_eq!((read.core().npinx, read.core().npiny), (2, 2));
        assert_eq!(read.core().ndet(), 1);
        assert_eq!(
            read.dataset_names(DataSetCategory::Pin),
            model.dataset_names(DataSetCategory::Pin)
        );
        assert_relative_eq!(read.scalar_value(1, "exposure").unwrap(), 1.5);
        assert!(read.check().is_empty());
    }

    #[test]
    fn test_hdf5_missing_core_map() {
        let file = NamedTempFile::new().unwrap();
        {
            let h5 = File::create(file.path()).unwrap();
            h5.create_group(CORE_GROUP).unwrap();
        }
        let err = read_vera_hdf5(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_hdf5_state_groups_sorted_numerically() {
        let file = NamedTempFile::new().unwrap();
        {
            let h5 = File::create(file.path()).unwrap();
            let core = h5.create_group(CORE_GROUP).unwrap();
            write_grid_map(&core, "core_map", &GridMap::from_rows(&[vec![1]]).unwrap()).unwrap();
            for (name, value) in [("STATE_0010", 10.0), ("STATE_0002", 2.0), ("STATE_0001", 1.0)] {
                let group = h5.create_group(name).unwrap();
                group
                    .new_dataset::<f64>()
                    .shape(())
                    .create("hours")
                    .unwrap()
                    .write_scalar(&value)
                    .unwrap();
            }
        }
        let model = read_vera_hdf5(file.path()).unwrap();
        assert_eq!(model.time_series("hours"), vec![1.0, 2.0, 10.0]);
    }
}
