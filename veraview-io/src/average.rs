//! Weighted averages over pin datasets.

use ndarray::{Array2, ArrayView4, ArrayViewD, Axis, Ix4};
use rayon::prelude::*;
use veraview_core::{DataSetCategory, DataSetName, WeightsMode};

use crate::model::VeraDataModel;
use crate::{Error, Result};

/// Per-assembly averages of a `(npiny, npinx, nax, nass)` dataset.
///
/// Returns an array shaped `(nax, nass)`. Each entry is the weighted mean
/// over the pins of one assembly at one axial level, or 0.0 where the
/// weights sum to zero. Without weights every pin counts once.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the weights shape differs from the
/// data shape.
pub fn assembly_averages(
    data: ArrayView4<'_, f64>,
    weights: Option<ArrayView4<'_, f64>>,
) -> Result<Array2<f64>> {
    if let Some(weights) = &weights {
        if weights.shape() != data.shape() {
            return Err(Error::InvalidFormat(format!(
                "weights shape {:?} does not match data shape {:?}",
                weights.shape(),
                data.shape()
            )));
        }
    }

    let (_, _, nax, nass) = data.dim();
    let columns: Vec<Vec<f64>> = (0..nass)
        .into_par_iter()
        .map(|assy| {
            let block = data.index_axis(Axis(3), assy);
            let wblock = weights.as_ref().map(|w| w.index_axis(Axis(3), assy));
            (0..nax)
                .map(|level| {
                    let values = block.index_axis(Axis(2), level);
                    match &wblock {
                        Some(w) => {
                            weighted_mean(values.iter().zip(w.index_axis(Axis(2), level).iter()))
                        }
                        None => weighted_mean(values.iter().map(|v| (v, &1.0))),
                    }
                })
                .collect()
        })
        .collect();

    let mut result = Array2::zeros((nax, nass));
    for (assy, column) in columns.into_iter().enumerate() {
        for (level, value) in column.into_iter().enumerate() {
            result[[level, assy]] = value;
        }
    }
    Ok(result)
}

/// Weighted mean over every element, 0.0 where the weights sum to zero.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the weights shape differs from the
/// data shape.
pub fn scalar_average(
    data: ArrayViewD<'_, f64>,
    weights: Option<ArrayViewD<'_, f64>>,
) -> Result<f64> {
    match weights {
        Some(weights) if weights.shape() != data.shape() => Err(Error::InvalidFormat(format!(
            "weights shape {:?} does not match data shape {:?}",
            weights.shape(),
            data.shape()
        ))),
        Some(weights) => Ok(weighted_mean(data.iter().zip(weights.iter()))),
        None => Ok(weighted_mean(data.iter().map(|v| (v, &1.0)))),
    }
}

fn weighted_mean<'a>(pairs: impl Iterator<Item = (&'a f64, &'a f64)>) -> f64 {
    let (sum, wsum) = pairs.fold((0.0, 0.0), |(sum, wsum), (value, weight)| {
        (sum + value * weight, wsum + weight)
    });
    if wsum == 0.0 {
        0.0
    } else {
        sum / wsum
    }
}

/// Per-assembly averages of a pin dataset at a state point.
///
/// With [`WeightsMode::On`] the model's pin weights are applied when it has
/// them.
///
/// # Errors
/// Returns an error if the dataset is missing, is not a pin dataset, or
/// its weights do not match.
pub fn dataset_assembly_averages(
    model: &VeraDataModel,
    state_index: usize,
    dataset: &DataSetName,
    weights_mode: WeightsMode,
) -> Result<Array2<f64>> {
    if dataset.category != DataSetCategory::Pin {
        return Err(Error::InvalidFormat(format!("{dataset} is not a pin dataset")));
    }
    let data = model
        .dataset(state_index, dataset)
        .ok_or_else(|| {
            Error::InvalidFormat(format!("{dataset} missing from state {}", state_index + 1))
        })?
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|e| Error::InvalidFormat(format!("{dataset}: {e}")))?;

    let weights = match (weights_mode, model.pin_weights()) {
        (WeightsMode::On, Some(weights)) => Some(
            weights
                .view()
                .into_dimensionality::<Ix4>()
                .map_err(|e| Error::InvalidFormat(format!("pin_volumes: {e}")))?,
        ),
        _ => None,
    };
    assembly_averages(data, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::small_model;
    use approx::assert_relative_eq;
    use ndarray::{Array, Array4, IxDyn};
    use veraview_core::DataModel;

    #[test]
    fn test_unweighted_average() {
        let data = Array4::from_shape_fn((2, 2, 3, 4), |(j, i, k, a)| {
            f64::from(u32::try_from(j + i + k + a).unwrap())
        });
        let avg = assembly_averages(data.view(), None).unwrap();

        assert_eq!(avg.dim(), (3, 4));
        // pins contribute 0,1,1,2 on top of k + a
        assert_relative_eq!(avg[[0, 0]], 1.0);
        assert_relative_eq!(avg[[2, 3]], 6.0);
    }

    #[test]
    fn test_weighted_average_skips_zero_weights() {
        let mut data = Array4::from_elem((2, 2, 1, 2), 1.0);
        data[[0, 0, 0, 0]] = 9.0;
        let mut weights = Array4::from_elem((2, 2, 1, 2), 1.0);
        weights[[0, 0, 0, 0]] = 0.0;
        weights.index_axis_mut(Axis(3), 1).fill(0.0);

        let avg = assembly_averages(data.view(), Some(weights.view())).unwrap();
        assert_relative_eq!(avg[[0, 0]], 1.0);
        assert_relative_eq!(avg[[0, 1]], 0.0);
    }

    #[test]
    fn test_weights_shape_mismatch() {
        let data = Array4::<f64>::zeros((2, 2, 1, 2));
        let weights = Array4::<f64>::zeros((2, 2, 1, 3));
        let err = assembly_averages(data.view(), Some(weights.view())).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_scalar_average() {
        let data = Array::from_shape_vec(IxDyn(&[4]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let weights = Array::from_shape_vec(IxDyn(&[4]), vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        assert_relative_eq!(scalar_average(data.view(), None).unwrap(), 2.5);
        assert_relative_eq!(
            scalar_average(data.view(), Some(weights.view())).unwrap(),
            3.5
        );
    }

    #[test]
    fn test_dataset_averages_follow_weights_mode() {
        let mut volumes = Array::from_elem(IxDyn(&[2, 2, 3, 4]), 1.0);
        volumes[IxDyn(&[0, 0, 0, 0])] = 0.0;
        let base = small_model();
        let mut powers = base.state(0).unwrap().get("pin_powers").unwrap().clone();
        powers[IxDyn(&[0, 0, 0, 0])] = 5.0;
        let state = base.state(0).unwrap().clone().with_dataset("pin_powers", powers);
        let model = VeraDataModel::new("small.h5", base.core().clone(), vec![state])
            .with_pin_volumes(volumes);
        let dataset = DataSetName::new(DataSetCategory::Pin, "pin_powers");

        let on = dataset_assembly_averages(&model, 0, &dataset, WeightsMode::On).unwrap();
        let off = dataset_assembly_averages(&model, 0, &dataset, WeightsMode::Off).unwrap();
        assert_relative_eq!(on[[0, 0]], 1.0);
        assert_relative_eq!(off[[0, 0]], 2.0);

        let scalar = DataSetName::new(DataSetCategory::Scalar, "keff");
        assert!(dataset_assembly_averages(&model, 0, &scalar, WeightsMode::On).is_err());
    }
}
