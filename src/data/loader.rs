use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::SampleTable;
use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sample table from a file.  Dispatch by extension.
///
/// Supported formats, all in the same wide layout (one row per sample, one
/// group column, every other column a numeric feature):
/// * `.csv`     – delimited text with a header row (recommended)
/// * `.json`    – `[{ "group": "...", "citrate": 1.2, ... }, ...]`
/// * `.parquet` – Utf8 group column plus numeric columns
pub fn load_file(path: &Path, group_column: &str) -> Result<SampleTable, ParseError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path, group_column),
        "json" => load_json(path, group_column),
        "parquet" | "pq" => load_parquet(path, group_column),
        other => Err(ParseError::UnsupportedExtension(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, group_column: &str) -> Result<SampleTable, ParseError> {
    let file = std::fs::File::open(path)?;
    from_csv_reader(file, group_column)
}

/// Parse CSV from any reader.  Split out so tests can feed in-memory data.
///
/// Row numbers in errors are 1-based data rows (the header is row 0).
pub fn from_csv_reader<R: Read>(reader: R, group_column: &str) -> Result<SampleTable, ParseError> {
    // Flexible mode: row lengths are checked below, with row positions.
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let group_idx = headers
        .iter()
        .position(|h| h == group_column)
        .ok_or_else(|| ParseError::MissingGroupColumn(group_column.to_string()))?;

    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != group_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut rows: Vec<(String, Vec<f64>)> = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result?;
        if record.len() != headers.len() {
            return Err(ParseError::ColumnCountMismatch {
                row,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let group = record.get(group_idx).unwrap_or("").trim().to_string();
        let mut values = Vec::with_capacity(feature_names.len());
        for (col_idx, field) in record.iter().enumerate() {
            if col_idx == group_idx {
                continue;
            }
            let field = field.trim();
            let value: f64 = field.parse().map_err(|_| ParseError::NonNumeric {
                row,
                column: headers[col_idx].clone(),
                value: field.to_string(),
            })?;
            values.push(value);
        }
        rows.push((group, values));
    }

    SampleTable::from_rows(group_column, feature_names, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "group": "control", "citrate": 1.23, "lactate": 0.87, ... },
///   ...
/// ]
/// ```
///
/// JSON objects are unordered, so feature columns are taken from the first
/// record's keys as serde_json exposes them; every record must carry the same
/// keys.
fn load_json(path: &Path, group_column: &str) -> Result<SampleTable, ParseError> {
    let text = std::fs::read_to_string(path)?;
    from_json_str(&text, group_column)
}

pub fn from_json_str(text: &str, group_column: &str) -> Result<SampleTable, ParseError> {
    let root: JsonValue = serde_json::from_str(text)?;
    let records = root
        .as_array()
        .ok_or_else(|| ParseError::Malformed("expected a top-level JSON array".into()))?;

    let first = match records.first() {
        Some(JsonValue::Object(obj)) => obj,
        Some(_) => return Err(ParseError::Malformed("row 1 is not a JSON object".into())),
        None => return Err(ParseError::Empty),
    };
    if !first.contains_key(group_column) {
        return Err(ParseError::MissingGroupColumn(group_column.to_string()));
    }
    let feature_names: Vec<String> = first
        .keys()
        .filter(|k| k.as_str() != group_column)
        .cloned()
        .collect();

    let mut rows: Vec<(String, Vec<f64>)> = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let row = i + 1;
        let obj = rec
            .as_object()
            .ok_or_else(|| ParseError::Malformed(format!("row {row} is not a JSON object")))?;
        if obj.len() != feature_names.len() + 1 {
            return Err(ParseError::ColumnCountMismatch {
                row,
                expected: feature_names.len() + 1,
                found: obj.len(),
            });
        }

        let group = obj
            .get(group_column)
            .map(json_to_label)
            .ok_or_else(|| ParseError::MissingValue {
                row,
                column: group_column.to_string(),
            })?;

        let mut values = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let val = obj.get(name).ok_or_else(|| ParseError::MissingValue {
                row,
                column: name.clone(),
            })?;
            let num = val.as_f64().ok_or_else(|| ParseError::NonNumeric {
                row,
                column: name.clone(),
                value: val.to_string(),
            })?;
            values.push(num);
        }
        rows.push((group, values));
    }

    SampleTable::from_rows(group_column, feature_names, rows)
}

/// Group labels compare by string equality, so non-string JSON values are
/// stringified rather than rejected.
fn json_to_label(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing a wide sample table.
///
/// Expected schema:
/// - one Utf8 column holding the group labels (ints/bools are stringified)
/// - numeric feature columns: Float64, Float32, Int64 or Int32
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, group_column: &str) -> Result<SampleTable, ParseError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut feature_names: Vec<String> = Vec::new();
    let mut rows: Vec<(String, Vec<f64>)> = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        let group_idx = schema
            .index_of(group_column)
            .map_err(|_| ParseError::MissingGroupColumn(group_column.to_string()))?;

        let feature_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != group_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();
        if feature_names.is_empty() {
            feature_names = feature_cols.iter().map(|(_, n)| n.clone()).collect();
        }

        let group_col = batch.column(group_idx);
        for row in 0..batch.num_rows() {
            let group = extract_label(group_col, row).map_err(|msg| ParseError::Malformed(
                format!("group column '{group_column}', row {}: {msg}", rows.len() + 1),
            ))?;

            let mut values = Vec::with_capacity(feature_cols.len());
            for (col_idx, col_name) in &feature_cols {
                let col = batch.column(*col_idx);
                let value = extract_numeric(col, row).map_err(|msg| ParseError::NonNumeric {
                    row: rows.len() + 1,
                    column: col_name.clone(),
                    value: msg,
                })?;
                values.push(value);
            }
            rows.push((group, values));
        }
    }

    SampleTable::from_rows(group_column, feature_names, rows)
}

// -- Parquet / Arrow helpers --

/// Extract a group label from an Arrow column at a given row.
fn extract_label(col: &Arc<dyn Array>, row: usize) -> Result<String, String> {
    if col.is_null(row) {
        return Err("null group label".into());
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| "expected StringArray".to_string())?;
            Ok(arr.value(row).to_string())
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            Ok(arr.value(row).to_string())
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Ok(arr.value(row).to_string())
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            Ok(arr.value(row).to_string())
        }
        other => Err(format!("unsupported group column type {other:?}")),
    }
}

/// Extract a single numeric value from an Arrow column at a given row.
fn extract_numeric(col: &Arc<dyn Array>, row: usize) -> Result<f64, String> {
    if col.is_null(row) {
        return Err("<null>".into());
    }
    match col.data_type() {
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            Ok(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            Ok(arr.value(row) as f64)
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            Ok(arr.value(row) as f64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Ok(arr.value(row) as f64)
        }
        other => Err(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
group,citrate,lactate,alanine
control,1.0,2.0,3.0
treated,4.0,5.0,6.0
control,7.0,8.0,9.0
";

    #[test]
    fn csv_parses_wide_table() {
        let table = from_csv_reader(CSV.as_bytes(), "group").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.feature_names, vec!["citrate", "lactate", "alanine"]);
        assert_eq!(table.groups, vec!["control", "treated", "control"]);
        assert_eq!(table.values[[2, 1]], 8.0);
    }

    #[test]
    fn csv_group_column_may_sit_anywhere() {
        let csv = "citrate,group,lactate\n1.0,a,2.0\n3.0,b,4.0\n";
        let table = from_csv_reader(csv.as_bytes(), "group").unwrap();
        assert_eq!(table.feature_names, vec!["citrate", "lactate"]);
        assert_eq!(table.values[[1, 0]], 3.0);
        assert_eq!(table.values[[1, 1]], 4.0);
    }

    #[test]
    fn csv_rejects_non_numeric_feature() {
        let csv = "group,citrate\na,1.0\nb,oops\n";
        let err = from_csv_reader(csv.as_bytes(), "group").unwrap_err();
        match err {
            ParseError::NonNumeric { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "citrate");
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn csv_rejects_short_row() {
        let csv = "group,citrate,lactate\na,1.0,2.0\nb,3.0\n";
        let err = from_csv_reader(csv.as_bytes(), "group").unwrap_err();
        assert!(matches!(
            err,
            ParseError::ColumnCountMismatch {
                row: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn csv_rejects_missing_group_column() {
        let err = from_csv_reader(CSV.as_bytes(), "batch").unwrap_err();
        assert!(matches!(err, ParseError::MissingGroupColumn(c) if c == "batch"));
    }

    #[test]
    fn json_agrees_with_csv() {
        let json = r#"[
            {"group": "control", "alanine": 3.0, "citrate": 1.0, "lactate": 2.0},
            {"group": "treated", "alanine": 6.0, "citrate": 4.0, "lactate": 5.0}
        ]"#;
        let from_json = from_json_str(json, "group").unwrap();
        let from_csv = from_csv_reader(
            "group,alanine,citrate,lactate\ncontrol,3.0,1.0,2.0\ntreated,6.0,4.0,5.0\n".as_bytes(),
            "group",
        )
        .unwrap();

        assert_eq!(from_json.feature_names, from_csv.feature_names);
        assert_eq!(from_json.groups, from_csv.groups);
        assert_eq!(from_json.values, from_csv.values);
    }

    #[test]
    fn json_rejects_missing_key() {
        let json = r#"[
            {"group": "a", "citrate": 1.0, "lactate": 2.0},
            {"group": "b", "citrate": 3.0}
        ]"#;
        let err = from_json_str(json, "group").unwrap_err();
        assert!(matches!(err, ParseError::ColumnCountMismatch { row: 2, .. }));
    }

    #[test]
    fn json_stringifies_numeric_group_labels() {
        let json = r#"[
            {"batch": 1, "citrate": 1.0, "lactate": 2.0},
            {"batch": 2, "citrate": 3.0, "lactate": 4.0}
        ]"#;
        let table = from_json_str(json, "batch").unwrap();
        assert_eq!(table.groups, vec!["1", "2"]);
    }
}
