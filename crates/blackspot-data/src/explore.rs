//! Dataset exploration: frequency counts over categorical columns.

use std::collections::HashMap;

use crate::domain::RecordDataset;
use crate::DataError;

/// A category value paired with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    /// The raw category value.
    pub value: String,
    /// Number of records holding that value.
    pub count: usize,
}

/// Count the distinct values of one column.
///
/// Counts are sorted descending; ties break lexicographically by value so
/// the output is deterministic.
///
/// # Errors
///
/// Returns [`DataError::MissingColumn`] when no column has that name.
pub fn frequency_counts(
    dataset: &RecordDataset,
    column: &str,
) -> Result<Vec<ValueCount>, DataError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in dataset.column_values(column)? {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut out: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Ok(out)
}

/// Count the distinct values of one column, keeping only the `k` most
/// frequent.
///
/// # Errors
///
/// Returns [`DataError::MissingColumn`] when no column has that name.
pub fn top_k(dataset: &RecordDataset, column: &str, k: usize) -> Result<Vec<ValueCount>, DataError> {
    let mut counts = frequency_counts(dataset, column)?;
    counts.truncate(k);
    Ok(counts)
}

/// Return the most frequent value of one column.
///
/// With ties the lexicographically smallest value wins, matching the
/// ordering of [`frequency_counts`].
///
/// # Errors
///
/// Returns [`DataError::MissingColumn`] when no column has that name.
pub fn column_mode(dataset: &RecordDataset, column: &str) -> Result<String, DataError> {
    let counts = frequency_counts(dataset, column)?;
    // RecordReader rejects empty datasets, so counts is non-empty for any
    // dataset it produced; fall back to an empty string otherwise.
    Ok(counts
        .into_iter()
        .next()
        .map(|vc| vc.value)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordDataset;

    fn make_dataset() -> RecordDataset {
        RecordDataset::new(
            vec!["Types_of_Junction".to_string(), "Accident_severity".to_string()],
            vec![
                vec!["Y Shape".into(), "Slight Injury".into()],
                vec!["No junction".into(), "Slight Injury".into()],
                vec!["Y Shape".into(), "Serious Injury".into()],
                vec!["Crossing".into(), "Slight Injury".into()],
                vec!["Y Shape".into(), "Fatal injury".into()],
                vec!["No junction".into(), "Slight Injury".into()],
            ],
        )
    }

    #[test]
    fn counts_sorted_descending() {
        let ds = make_dataset();
        let counts = frequency_counts(&ds, "Types_of_Junction").unwrap();
        assert_eq!(
            counts,
            vec![
                ValueCount { value: "Y Shape".into(), count: 3 },
                ValueCount { value: "No junction".into(), count: 2 },
                ValueCount { value: "Crossing".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn ties_break_lexicographically() {
        let ds = RecordDataset::new(
            vec!["c".to_string(), "t".to_string()],
            vec![
                vec!["b".into(), "x".into()],
                vec!["a".into(), "x".into()],
            ],
        );
        let counts = frequency_counts(&ds, "c").unwrap();
        assert_eq!(counts[0].value, "a");
        assert_eq!(counts[1].value, "b");
    }

    #[test]
    fn top_k_truncates() {
        let ds = make_dataset();
        let counts = top_k(&ds, "Types_of_Junction", 2).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].value, "Y Shape");
    }

    #[test]
    fn mode_is_most_frequent() {
        let ds = make_dataset();
        assert_eq!(column_mode(&ds, "Accident_severity").unwrap(), "Slight Injury");
    }

    #[test]
    fn missing_column_error() {
        let ds = make_dataset();
        let err = frequency_counts(&ds, "Light_conditions").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }
}
