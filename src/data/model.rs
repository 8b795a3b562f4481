use std::collections::BTreeSet;

use ndarray::Array2;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// SampleTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// A wide metabolomics table: one row per sample, one group label per row,
/// and a fixed set of numeric feature columns shared by every row.
#[derive(Debug, Clone)]
pub struct SampleTable {
    /// Name of the column the group labels came from.
    pub group_column: String,
    /// Ordered feature column names (excludes the group column).
    pub feature_names: Vec<String>,
    /// Group label of each sample, in row order.
    pub groups: Vec<String>,
    /// Feature values, `n_samples × n_features`, same row order as `groups`.
    pub values: Array2<f64>,
    /// Sorted set of distinct group labels.
    pub unique_groups: BTreeSet<String>,
}

impl SampleTable {
    /// Build a table from parsed rows, enforcing a uniform feature count.
    ///
    /// Rows are `(group label, feature values)` in file order. The loader
    /// reports position-accurate errors before this point; the width check
    /// here guards construction from any other call site.
    pub fn from_rows(
        group_column: &str,
        feature_names: Vec<String>,
        rows: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, ParseError> {
        if feature_names.is_empty() {
            return Err(ParseError::NoFeatureColumns);
        }
        if rows.is_empty() {
            return Err(ParseError::Empty);
        }

        let n_features = feature_names.len();
        let mut groups = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * n_features);
        for (row_no, (group, values)) in rows.into_iter().enumerate() {
            if values.len() != n_features {
                return Err(ParseError::ColumnCountMismatch {
                    row: row_no + 1,
                    expected: n_features,
                    found: values.len(),
                });
            }
            groups.push(group);
            flat.extend(values);
        }

        let n_samples = groups.len();
        let values = Array2::from_shape_vec((n_samples, n_features), flat)
            .expect("row width checked above");

        let unique_groups: BTreeSet<String> = groups.iter().cloned().collect();

        Ok(SampleTable {
            group_column: group_column.to_string(),
            feature_names,
            groups,
            values,
            unique_groups,
        })
    }

    /// Number of samples (rows).
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the table has no samples.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of numeric feature columns.
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn from_rows_builds_matrix_and_group_index() {
        let table = SampleTable::from_rows(
            "group",
            names(&["m1", "m2"]),
            vec![
                ("a".into(), vec![1.0, 2.0]),
                ("b".into(), vec![3.0, 4.0]),
                ("a".into(), vec![5.0, 6.0]),
            ],
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.n_features(), 2);
        assert_eq!(table.values[[1, 0]], 3.0);
        assert_eq!(
            table.unique_groups.iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = SampleTable::from_rows(
            "group",
            names(&["m1", "m2"]),
            vec![("a".into(), vec![1.0, 2.0]), ("b".into(), vec![3.0])],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ParseError::ColumnCountMismatch {
                row: 2,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn from_rows_rejects_empty_input() {
        let err = SampleTable::from_rows("group", names(&["m1", "m2"]), vec![]).unwrap_err();
        assert!(matches!(err, ParseError::Empty));
    }
}
