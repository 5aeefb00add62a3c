use std::path::Path;

use anyhow::{Context, Result as AnyResult};

use super::model::Dataset;
use crate::error::{DataError, Result};

/// Serialize `dataset` as UTF-8 comma-separated text with a header row.
///
/// `projection` chooses and orders the exported columns (all columns when
/// `None`). Fields containing commas, quotes or newlines are quoted. A
/// zero-row dataset produces the header line alone.
pub fn to_delimited(dataset: &Dataset, projection: Option<&[String]>) -> Result<Vec<u8>> {
    let (header, indices): (Vec<&str>, Vec<usize>) = match projection {
        Some(cols) => cols
            .iter()
            .map(|c| dataset.require_column(c).map(|i| (c.as_str(), i)))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip(),
        None => dataset
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .unzip(),
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&header)?;
    for record in dataset.rows() {
        writer.write_record(indices.iter().map(|&i| record.get(i).to_field()))?;
    }
    writer
        .into_inner()
        .map_err(|e| DataError::Csv(csv::Error::from(e.into_error())))
}

/// Write an export produced by [`to_delimited`] to disk.
pub fn write_file(path: &Path, bytes: &[u8]) -> AnyResult<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("writing export to {}", path.display()))?;
    log::info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Record, Value};

    fn listings() -> Dataset {
        Dataset::new(
            vec!["loc".into(), "price".into(), "desc".into()],
            vec![
                Record::new(vec!["A".into(), Value::Float(100.0), "plain".into()]),
                Record::new(vec![
                    "B".into(),
                    Value::Integer(7),
                    "has, comma and \"quotes\"\nnewline".into(),
                ]),
                Record::new(vec!["C".into(), Value::Null, "".into()]),
            ],
        )
    }

    #[test]
    fn zero_rows_yield_header_only() {
        let empty = listings().empty_like();
        let bytes = to_delimited(&empty, None).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "loc,price,desc\n");
    }

    #[test]
    fn fields_are_escaped() {
        let bytes = to_delimited(&listings(), None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "loc,price,desc\n\
             A,100.0,plain\n\
             B,7,\"has, comma and \"\"quotes\"\"\nnewline\"\n\
             C,,\n"
        );
    }

    #[test]
    fn projection_orders_columns() {
        let cols = vec!["price".to_string(), "loc".to_string()];
        let bytes = to_delimited(&listings().select(&[0]), Some(&cols)).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "price,loc\n100.0,A\n");
    }

    #[test]
    fn projection_of_unknown_column_fails() {
        let cols = vec!["url".to_string()];
        assert!(matches!(
            to_delimited(&listings(), Some(&cols)),
            Err(DataError::UnknownColumn(c)) if c == "url"
        ));
    }

    #[test]
    fn output_is_reproducible() {
        let a = to_delimited(&listings(), None).unwrap();
        let b = to_delimited(&listings(), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn write_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered_property_data.csv");
        let bytes = to_delimited(&listings(), None).unwrap();
        write_file(&path, &bytes).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }
}
