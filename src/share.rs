//! # share
//!
//! Conversion methods between different libraries.

use ndarray::ArrayView2;
use polars::{prelude::NamedFrom, series::Series};

/// Convert the columns of an `ndarray::Array` into a vector of `polars::series::Series`.
pub fn ndarray_to_series_vec(arr: &ArrayView2<f32>, column_names: &[&str]) -> Vec<Series> {
    let num_dims = arr.shape()[1];
    if num_dims != column_names.len() {
        panic!("Number of array columns and column names must match.");
    }

    let mut series_vec = vec![];
    for (column, column_name) in arr.columns().into_iter().zip(column_names) {
        let series = Series::new(
            column_name,
            column.as_standard_layout().to_owned().into_raw_vec(),
        );
        series_vec.push(series);
    }
    series_vec
}

#[cfg(test)]
mod tests {
    use super::ndarray_to_series_vec;
    use crate::constants::XYZ_COLUMNS;
    use ndarray::array;

    #[test]
    fn test_ndarray_to_series_vec() {
        let arr = array![[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let series_vec = ndarray_to_series_vec(&arr.view(), &XYZ_COLUMNS);
        assert_eq!(series_vec.len(), 3);
        assert_eq!(series_vec[0].name(), "x");
        assert_eq!(series_vec[2].name(), "z");
        let y: Vec<f32> = series_vec[1].f32().unwrap().into_no_null_iter().collect();
        assert_eq!(y, vec![2.0, 5.0]);
    }
}
