//! Ragged-to-dense flattening of element history variables.
//!
//! Each element carries its own number of history variables. The file stores
//! the counts (`NumberOfHistoryVariables`) and one flat value array
//! (`HistoryVariable`). Variable `v` of a block is exposed as one value per
//! element, zero for elements with `v` or fewer variables.

use crate::pvld_error::PvldError;

/// Dataset holding per-element history variable counts.
pub const HISTORY_COUNT_DATASET: &str = "NumberOfHistoryVariables";
/// Dataset holding the flat history variable values.
pub const HISTORY_VALUE_DATASET: &str = "HistoryVariable";
/// Marker identifying history variable requests.
pub const HISTORY_MARKER: &str = "HistoryVariable";

/// Exposed name of the 0-based history variable `index`.
pub fn history_variable_name(index: usize) -> String {
    format!("{HISTORY_MARKER}_{}", index + 1)
}

/// 0-based variable index of a history variable request.
///
/// Returns `None` when `name` lacks the marker; `Some(Err)` when the marker is
/// present but the 1-based suffix after the last `_` is not a positive integer.
pub fn parse_history_name(name: &str) -> Option<Result<usize, String>> {
    if !name.contains(HISTORY_MARKER) {
        return None;
    }
    let parsed = name
        .rsplit_once('_')
        .and_then(|(_, suffix)| suffix.parse::<usize>().ok())
        .filter(|&n| n >= 1)
        .map(|n| n - 1)
        .ok_or_else(|| format!("`{name}` has no 1-based history variable index"));
    Some(parsed)
}

/// Exclusive prefix sum of per-element slot counts; the result has one more
/// entry than `counts` and ends with the total.
pub fn exclusive_prefix(counts: &[i64]) -> Result<Vec<usize>, PvldError> {
    let mut out = Vec::with_capacity(counts.len() + 1);
    out.push(0usize);
    let mut acc = 0usize;
    for (i, &c) in counts.iter().enumerate() {
        let c = usize::try_from(c).map_err(|_| {
            PvldError::InconsistentMetadata(format!(
                "negative history variable count {c} for element {i}"
            ))
        })?;
        acc += c;
        out.push(acc);
    }
    Ok(out)
}

/// Dense column `var` of a block's ragged history table.
///
/// `hvsft` are the block's exclusive prefix sums and `values` the block's slice
/// of the flat value array.
pub fn flatten_history(hvsft: &[usize], values: &[f64], var: usize) -> Vec<f64> {
    hvsft
        .windows(2)
        .map(|w| {
            let slot = w[0] + var;
            if slot < w[1] { values[slot] } else { 0.0 }
        })
        .collect()
}

/// Largest per-element history variable count.
pub fn max_history_count(counts: &[i64]) -> usize {
    counts
        .iter()
        .filter_map(|&c| usize::try_from(c).ok())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_are_zero_filled() {
        // element 0: [1, 2], element 1: [], element 2: [3, 4, 5]
        let hvsft = exclusive_prefix(&[2, 0, 3]).unwrap();
        assert_eq!(hvsft, vec![0, 2, 2, 5]);
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(flatten_history(&hvsft, &values, 0), vec![1.0, 0.0, 3.0]);
        assert_eq!(flatten_history(&hvsft, &values, 1), vec![2.0, 0.0, 4.0]);
        assert_eq!(flatten_history(&hvsft, &values, 2), vec![0.0, 0.0, 5.0]);
        assert_eq!(flatten_history(&hvsft, &values, 3), vec![0.0; 3]);
    }

    #[test]
    fn uniform_counts_reconstruct_the_table() {
        let h = 3;
        let rows: Vec<Vec<f64>> = (0..4)
            .map(|e| (0..h).map(|v| (10 * e + v) as f64).collect())
            .collect();
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let hvsft = exclusive_prefix(&[h as i64; 4]).unwrap();
        for v in 0..h {
            let col = flatten_history(&hvsft, &flat, v);
            let expected: Vec<f64> = rows.iter().map(|r| r[v]).collect();
            assert_eq!(col, expected);
        }
        assert!(flatten_history(&hvsft, &flat, h).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn names_parse_to_zero_based_indices() {
        assert_eq!(parse_history_name("HistoryVariable_1"), Some(Ok(0)));
        assert_eq!(parse_history_name("HistoryVariable_12"), Some(Ok(11)));
        assert!(matches!(parse_history_name("HistoryVariable_0"), Some(Err(_))));
        assert!(matches!(parse_history_name("HistoryVariable"), Some(Err(_))));
        assert_eq!(parse_history_name("Stress"), None);
        assert_eq!(history_variable_name(0), "HistoryVariable_1");
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(exclusive_prefix(&[1, -2]).is_err());
        assert_eq!(max_history_count(&[1, 4, 2]), 4);
    }
}
