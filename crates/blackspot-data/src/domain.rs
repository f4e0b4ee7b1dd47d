//! Domain types for blackspot-data.

use crate::DataError;

/// A tabular dataset of raw categorical records.
///
/// Produced by [`RecordReader`](crate::RecordReader). All cells are kept as
/// strings; integer coding happens later in the
/// [`EncoderSet`](crate::EncoderSet). `rows[i][j]` is the value of column
/// `columns[j]` in record `i`.
#[derive(Debug)]
pub struct RecordDataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordDataset {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Return the column names from the CSV header.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return the raw record rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Return the number of records.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Return the index of a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] when no column has that name.
    pub fn column_index(&self, column: &str) -> Result<usize, DataError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DataError::MissingColumn {
                column: column.to_string(),
            })
    }

    /// Iterate over the values of one column.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] when no column has that name.
    pub fn column_values(&self, column: &str) -> Result<impl Iterator<Item = &str>, DataError> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(move |row| row[idx].as_str()))
    }
}

/// The column layout used for encoding and prediction: every feature column
/// in dataset order, plus the target column.
///
/// Prediction inputs are validated against this schema before any encoding,
/// so a malformed request fails with a named column rather than a lookup
/// error deep in the encoder.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    feature_columns: Vec<String>,
    target_column: String,
}

impl Schema {
    /// Derive the schema from a dataset header and the target column name.
    ///
    /// Feature columns are every dataset column except the target, in
    /// dataset order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] when the target column is absent.
    pub fn from_dataset(dataset: &RecordDataset, target_column: &str) -> Result<Self, DataError> {
        dataset.column_index(target_column)?;
        let feature_columns = dataset
            .columns()
            .iter()
            .filter(|c| c.as_str() != target_column)
            .cloned()
            .collect();
        Ok(Self {
            feature_columns,
            target_column: target_column.to_string(),
        })
    }

    /// Return the feature column names, in dataset order.
    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Return the target column name.
    #[must_use]
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset() -> RecordDataset {
        RecordDataset::new(
            vec![
                "Weather_conditions".to_string(),
                "Road_surface_type".to_string(),
                "Accident_severity".to_string(),
            ],
            vec![
                vec!["Normal".into(), "Asphalt roads".into(), "Slight Injury".into()],
                vec!["Raining".into(), "Earth roads".into(), "Serious Injury".into()],
            ],
        )
    }

    #[test]
    fn column_values_in_row_order() {
        let ds = make_dataset();
        let values: Vec<&str> = ds.column_values("Weather_conditions").unwrap().collect();
        assert_eq!(values, vec!["Normal", "Raining"]);
    }

    #[test]
    fn missing_column_error() {
        let ds = make_dataset();
        let err = ds.column_index("Light_conditions").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { column } if column == "Light_conditions"));
    }

    #[test]
    fn schema_excludes_target() {
        let ds = make_dataset();
        let schema = Schema::from_dataset(&ds, "Accident_severity").unwrap();
        assert_eq!(
            schema.feature_columns(),
            &["Weather_conditions", "Road_surface_type"]
        );
        assert_eq!(schema.target_column(), "Accident_severity");
        assert_eq!(schema.n_features(), 2);
    }

    #[test]
    fn schema_missing_target_error() {
        let ds = make_dataset();
        let err = Schema::from_dataset(&ds, "Severity").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }
}
