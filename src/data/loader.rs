use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, StringArray,
};
use arrow::datatypes::DataType;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Record, Value, DATE_FORMAT};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listing table from a file and check it carries `required` columns.
///
/// Dispatch by extension:
/// * `.csv` / `.tsv` / `.txt` – delimited text with a header row
/// * `.parquet` / `.pq`      – flat Parquet columns
/// * `.json`                 – `[{ "Price": 100, "Location": "A", ... }, ...]`
///
/// A missing required column fails with [`SchemaError`].
pub fn load_file<S: AsRef<str>>(path: &Path, required: &[S]) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" | "tsv" | "txt" => load_delimited(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    let missing = dataset.missing_columns(required);
    if !missing.is_empty() {
        return Err(SchemaError { missing }.into());
    }

    log::info!(
        "Loaded {} rows with {} columns from {}",
        dataset.len(),
        dataset.columns().len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Header row with column names, one record per line. The delimiter is
/// whichever of `,` `;` `\t` occurs most in the header (`,` on ties).
fn load_delimited(path: &Path) -> Result<Dataset> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context("opening delimited file")?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        cells.push(record.iter().map(str::to_string).collect());
    }

    Ok(from_text_cells(headers, cells))
}

fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = std::fs::File::open(path).context("opening delimited file")?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .context("reading header row")?;

    let count = |c: char| header.chars().filter(|&h| h == c).count();
    let candidates = [(b',', count(',')), (b';', count(';')), (b'\t', count('\t'))];
    let best = candidates
        .iter()
        .fold((b',', 0usize), |best, &(d, n)| if n > best.1 { (d, n) } else { best });
    Ok(best.0)
}

// ---------------------------------------------------------------------------
// Column type inference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Bool,
    Date,
    Text,
}

/// Pick one type per column from its non-empty cells.
///
/// Integers mixed with floats promote to `Float`; any cell that fits no
/// narrower type makes the whole column `Text`.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut seen_any = false;
    let (mut all_int, mut all_num, mut all_bool, mut all_date) = (true, true, true, true);

    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        seen_any = true;
        all_int &= cell.parse::<i64>().is_ok();
        all_num &= cell.parse::<f64>().is_ok();
        all_bool &= matches!(cell, "true" | "false" | "True" | "False");
        all_date &= NaiveDate::parse_from_str(cell, DATE_FORMAT).is_ok();
    }

    if !seen_any {
        ColumnKind::Text
    } else if all_int {
        ColumnKind::Integer
    } else if all_num {
        ColumnKind::Float
    } else if all_bool {
        ColumnKind::Bool
    } else if all_date {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

fn parse_cell(kind: ColumnKind, raw: &str) -> Value {
    let cell = raw.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    let parsed = match kind {
        ColumnKind::Integer => cell.parse().ok().map(Value::Integer),
        ColumnKind::Float => cell.parse().ok().map(Value::Float),
        ColumnKind::Bool => Some(Value::Bool(cell.eq_ignore_ascii_case("true"))),
        ColumnKind::Date => NaiveDate::parse_from_str(cell, DATE_FORMAT)
            .ok()
            .map(Value::Date),
        ColumnKind::Text => None,
    };
    parsed.unwrap_or_else(|| Value::Text(raw.to_string()))
}

/// Build a dataset from raw text cells, typing each column independently.
fn from_text_cells(headers: Vec<String>, cells: Vec<Vec<String>>) -> Dataset {
    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|col| {
            infer_kind(
                cells
                    .iter()
                    .map(move |row| row.get(col).map(String::as_str).unwrap_or("")),
            )
        })
        .collect();
    log::debug!("inferred column types: {:?}", headers.iter().zip(&kinds).collect::<Vec<_>>());

    let rows: Vec<Record> = cells
        .iter()
        .map(|row| {
            Record::new(
                kinds
                    .iter()
                    .enumerate()
                    .map(|(col, &kind)| {
                        parse_cell(kind, row.get(col).map(String::as_str).unwrap_or(""))
                    })
                    .collect(),
            )
        })
        .collect();

    Dataset::new(headers, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are
/// typed the same way as delimited text.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let cells: Vec<Vec<String>> = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_text).unwrap_or_default())
                .collect::<Vec<String>>()
        })
        .collect();

    Ok(from_text_cells(headers, cells))
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat columns (strings, ints, floats, bools,
/// dates). Works with files written by both Pandas and Polars.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_columns())
                .map(|col| extract_value(batch.column(col), row))
                .collect();
            rows.push(Record::new(values));
        }
    }

    Ok(Dataset::new(headers, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Value::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Value::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Value::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| Value::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| Value::Bool(a.value(row))),
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .and_then(|a| a.value_as_date(row))
            .map(Value::Date),
        other => Some(Value::Text(format!("{other:?}"))),
    };
    value.unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_columns_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "listings.csv",
            "Location,Price,Area,Listed,Note\n\
             A,100,2.5,2024-01-02,x\n\
             B,200,3,2024-02-03,\n",
        );
        let ds = load_file(&path, &["Location", "Price"]).unwrap();
        assert_eq!(ds.len(), 2);
        let row = &ds.rows()[1];
        assert_eq!(row.get(0), &Value::from("B"));
        assert_eq!(row.get(1), &Value::Integer(200));
        // Mixed ints and floats promote to Float.
        assert_eq!(row.get(2), &Value::Float(3.0));
        assert_eq!(
            row.get(3),
            &Value::Date(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap())
        );
        assert_eq!(row.get(4), &Value::Null);
    }

    #[test]
    fn missing_required_columns_fail_with_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "plots.csv", "Location,Price\nA,1\n");
        let err = load_file(&path, &["Url", "Price", "Latitude"]).unwrap_err();
        let schema = err.downcast_ref::<SchemaError>().expect("schema error");
        assert_eq!(schema.missing, vec!["Url".to_string(), "Latitude".to_string()]);
    }

    #[test]
    fn semicolon_delimiter_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "listings.csv", "Location;Price\nA;1,5\n");
        let ds = load_file(&path, &["Price"]).unwrap();
        assert_eq!(ds.rows()[0].get(1), &Value::from("1,5"));
    }

    #[test]
    fn quoted_fields_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "listings.csv",
            "Plot__DESC,Plot__Price\n\"3 BHK, near beach\",100\n",
        );
        let ds = load_file(&path, &["Plot__DESC"]).unwrap();
        assert_eq!(ds.rows()[0].get(0), &Value::from("3 BHK, near beach"));
    }

    #[test]
    fn json_records_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "plots.json",
            r#"[{"Location": "A", "Price": 10.5}, {"Location": "B", "Price": null, "density": "high"}]"#,
        );
        let ds = load_file(&path, &["Location", "Price", "density"]).unwrap();
        assert_eq!(ds.len(), 2);
        let price = ds.column_index("Price").unwrap();
        assert_eq!(ds.rows()[0].get(price), &Value::Float(10.5));
        assert_eq!(ds.rows()[1].get(price), &Value::Null);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "listings.xlsx", "");
        assert!(load_file::<&str>(&path, &[]).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file::<&str>(&dir.path().join("nope.csv"), &[]).is_err());
    }

    #[test]
    fn inference_prefers_narrowest_type() {
        assert_eq!(infer_kind(["1", "2", ""].into_iter()), ColumnKind::Integer);
        assert_eq!(infer_kind(["1", "2.5"].into_iter()), ColumnKind::Float);
        assert_eq!(infer_kind(["true", "False"].into_iter()), ColumnKind::Bool);
        assert_eq!(infer_kind(["2024-01-01", "x"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["", " "].into_iter()), ColumnKind::Text);
    }

    fn write_parquet(path: &std::path::Path) {
        use arrow::array::ArrayRef;
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let listed = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![Some("Kowdiar"), None])),
            Arc::new(Int64Array::from(vec![Some(2_500_000), None])),
            Arc::new(Float64Array::from(vec![Some(12.5), None])),
            Arc::new(BooleanArray::from(vec![Some(true), None])),
            Arc::new(Date32Array::from(vec![
                Some((listed - epoch).num_days() as i32),
                None,
            ])),
        ];
        let fields: Vec<Field> = ["Location", "Price", "Area", "Verified", "Listing_Date"]
            .iter()
            .zip(&arrays)
            .map(|(name, a)| Field::new(*name, a.data_type().clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();

        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_columns_map_to_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.parquet");
        write_parquet(&path);

        let ds = load_file(&path, &["Location", "Price", "Listing_Date"]).unwrap();
        assert_eq!(
            ds.columns(),
            &["Location", "Price", "Area", "Verified", "Listing_Date"]
        );
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.rows()[0].values,
            vec![
                Value::from("Kowdiar"),
                Value::Integer(2_500_000),
                Value::Float(12.5),
                Value::Bool(true),
                Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            ]
        );
        assert!(ds.rows()[1].values.iter().all(Value::is_null));
    }

    #[test]
    fn parquet_missing_columns_fail_with_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.pq");
        write_parquet(&path);

        let err = load_file(&path, &["Location", "Latitude"]).unwrap_err();
        let schema = err.downcast_ref::<SchemaError>().expect("schema error");
        assert_eq!(schema.missing, vec!["Latitude".to_string()]);
    }

    #[test]
    fn non_finite_cells_do_not_widen_numeric_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "plots.csv", "Location,Price\nA,1\nB,inf\nC,NaN\nD,7\n");
        let ds = load_file(&path, &["Price"]).unwrap();
        assert_eq!(ds.numeric_bounds("Price").unwrap(), Some((1.0, 7.0)));
        assert_eq!(ds.numeric_values("Price").unwrap(), vec![1.0, 7.0]);
    }
}
