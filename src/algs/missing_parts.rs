//! Missing-part synthesis.
//!
//! Every rank must agree on the material list of each element class. A
//! material the catalog assigns to a class, but which has no elements of that
//! class in the file, is a *missing part*. Block 0 of the class receives one
//! degenerate element per missing part: it reuses the first real element's
//! nodes (or a single synthetic node at the origin) and copies a donor data row.

use crate::topology::element_class::{ElementClass, MaterialType};

/// Materials of `class` that the catalog expects but `present` lacks.
///
/// `types[m - 1]` is the type mask of material id `m`; `present` must be sorted.
pub fn missing_materials(types: &[MaterialType], present: &[i64], class: ElementClass) -> Vec<i64> {
    let Some(bit) = class.material_type() else {
        return Vec::new();
    };
    types
        .iter()
        .enumerate()
        .filter(|(_, t)| t.contains(bit))
        .map(|(i, _)| i as i64 + 1)
        .filter(|id| present.binary_search(id).is_err())
        .collect()
}

/// Append `n_missing` degenerate elements to a flattened connectivity array.
///
/// Returns the number of synthetic nodes added to `coords` (0 or 1).
pub fn append_degenerate_elements(
    connectivity: &mut Vec<usize>,
    coords: &mut Vec<[f64; 3]>,
    arity: usize,
    n_missing: usize,
) -> usize {
    if n_missing == 0 {
        return 0;
    }
    let (template, synthetic) = if connectivity.len() >= arity && arity > 0 {
        (connectivity[..arity].to_vec(), 0)
    } else {
        let origin = coords.len();
        coords.push([0.0; 3]);
        (vec![origin; arity], 1)
    };
    for _ in 0..n_missing {
        connectivity.extend_from_slice(&template);
    }
    synthetic
}

/// Append `n_missing` copies of the first row of `values` (zeros when empty).
pub fn append_donor_rows<T: Copy + Default>(values: &mut Vec<T>, row_width: usize, n_missing: usize) {
    if n_missing == 0 || row_width == 0 {
        return;
    }
    let donor: Vec<T> = if values.len() >= row_width {
        values[..row_width].to_vec()
    } else {
        vec![T::default(); row_width]
    };
    for _ in 0..n_missing {
        values.extend_from_slice(&donor);
    }
}
