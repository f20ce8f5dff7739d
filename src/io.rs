// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use serde::Serialize;

use crate::error::{EikonalError, Result};

/// Supported file formats for model fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5). Read only.
    Mat,
}

/// Infer the file format from a path's extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(EikonalError::UnsupportedFileFormat(ext.to_string())),
        None => Err(EikonalError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Load a field (velocity, epsilon, delta) from a .npy file as row-major f64.
///
/// f32 arrays are promoted. Fortran-order files are re-laid out.
pub fn load_npy_field(path: &Path, expected_shape: &[usize]) -> Result<Vec<f64>> {
    let arr = match ndarray_npy::read_npy::<_, ArrayD<f64>>(path) {
        Ok(a) => a,
        Err(_) => ndarray_npy::read_npy::<_, ArrayD<f32>>(path)
            .map_err(|e| EikonalError::UnsupportedDtype(e.to_string()))?
            .mapv(f64::from),
    };
    into_grid_order(arr, expected_shape, false)
}

/// Load a named variable from a MAT file as row-major f64.
///
/// MAT data is column-major. The stored shape may be `expected_shape` or its
/// reverse (a field saved transposed); both come back in grid order.
pub fn load_mat_field(
    path: &Path,
    variable_name: &str,
    expected_shape: &[usize],
) -> Result<Vec<f64>> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(path)?);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| EikonalError::Other(format!("MAT parse error: {}", e)))?;

    let Some(array) = mat.find_by_name(variable_name) else {
        return Err(EikonalError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        });
    };
    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, .. } => real.clone(),
        matfile::NumericData::Single { real, .. } => real.iter().copied().map(f64::from).collect(),
        _ => {
            return Err(EikonalError::UnsupportedDtype(format!(
                "MAT variable '{}' is not f64 or f32",
                variable_name
            )))
        }
    };

    let stored = array.size().to_vec();
    let arr = ArrayD::from_shape_vec(IxDyn(&stored).f(), data).map_err(|_| {
        EikonalError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: stored.clone(),
        }
    })?;
    into_grid_order(arr, expected_shape, true)
}

/// Check a loaded array against the grid shape and return it row-major.
///
/// With `allow_reversed`, an array stored with the axes in reverse order is
/// transposed back.
fn into_grid_order(
    arr: ArrayD<f64>,
    expected_shape: &[usize],
    allow_reversed: bool,
) -> Result<Vec<f64>> {
    let stored = arr.shape().to_vec();
    let arr = if stored == expected_shape {
        arr
    } else if allow_reversed && stored.iter().rev().eq(expected_shape.iter()) {
        arr.reversed_axes()
    } else {
        return Err(EikonalError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: stored,
        });
    };
    Ok(arr.as_standard_layout().to_owned().into_raw_vec())
}

/// Load a field, choosing the reader from the extension.
///
/// `variable_name` is only consulted for MAT files.
pub fn load_field(path: &Path, variable_name: &str, expected_shape: &[usize]) -> Result<Vec<f64>> {
    match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, expected_shape),
        FileFormat::Mat => load_mat_field(path, variable_name, expected_shape),
    }
}

/// Save row-major data of the given shape to a .npy file.
pub fn save_npy(path: &Path, shape: &[usize], data: &[f64]) -> Result<()> {
    let arr = ArrayD::from_shape_vec(IxDyn(shape), data.to_vec())
        .map_err(|e| EikonalError::Other(format!("shape error: {}", e)))?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| EikonalError::Other(format!("NPY write error: {}", e)))?;
    Ok(())
}

/// Save one or more travel-time fields of the same shape.
///
/// A single field is written with the grid shape; several are stacked on a
/// new leading axis, one slice per shot. Only .npy output is supported.
pub fn save_travel_times(path: &Path, shape: &[usize], fields: &[Vec<f64>]) -> Result<()> {
    if infer_format(path)? != FileFormat::Npy {
        return Err(EikonalError::UnsupportedFileFormat(
            "mat (output must be .npy)".to_string(),
        ));
    }
    match fields {
        [single] => save_npy(path, shape, single),
        _ => {
            let mut stacked_shape = Vec::with_capacity(shape.len() + 1);
            stacked_shape.push(fields.len());
            stacked_shape.extend_from_slice(shape);
            let data: Vec<f64> = fields.iter().flatten().copied().collect();
            save_npy(path, &stacked_shape, &data)
        }
    }
}

/// Write any serializable report as pretty-printed JSON.
pub fn save_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)
        .map_err(|e| EikonalError::Other(format!("JSON write error: {}", e)))?;
    Ok(())
}
