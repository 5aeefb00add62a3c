use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use crate::error::{DataError, Result};

/// Date format used for parsing and exporting `Value::Date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Value – a single cell of a listing table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a listing CSV carries.
/// Used as a `BTreeSet` / `BTreeMap` key downstream, so it must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl Value {
    /// Interpret the value as an `f64` for range filters and reducers.
    /// `NaN` and infinities count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if v.is_finite() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Serialize the value as a delimited-file field.
    ///
    /// Floats use the shortest round-trip form and keep a trailing `.0`
    /// when integral, so a file read back infers the same column type.
    pub fn to_field(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(v) => format!("{v:?}"),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Null => String::new(),
        }
    }
}

static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single listing (one row of the source table), aligned with
/// [`Dataset::columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Record { values }
    }

    /// Cell at `col`, `Null` when the row is shorter than the header.
    pub fn get(&self, col: usize) -> &Value {
        self.values.get(col).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Dataset – an ordered table sharing one schema
// ---------------------------------------------------------------------------

/// An ordered, immutable collection of records sharing a fixed schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Dataset { columns, rows }
    }

    /// A zero-row dataset with the same columns.
    pub fn empty_like(&self) -> Self {
        Dataset {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    /// Ordered list of column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Dataset::column_index`] but an absent column is an error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    /// Required columns that are not present, in the order given.
    pub fn missing_columns<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !self.has_column(c))
            .map(str::to_string)
            .collect()
    }

    /// Iterate over one column's cells.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| r.get(col))
    }

    /// Numeric cells of a named column; nulls and text are skipped.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        let col = self.require_column(name)?;
        Ok(self.column(col).filter_map(Value::as_f64).collect())
    }

    /// Sorted distinct values of a column (categorical domain).
    pub fn distinct_values(&self, name: &str) -> Result<BTreeSet<Value>> {
        let col = self.require_column(name)?;
        Ok(self.column(col).cloned().collect())
    }

    /// `(min, max)` over the numeric cells of a column, `None` when it has none.
    pub fn numeric_bounds(&self, name: &str) -> Result<Option<(f64, f64)>> {
        let col = self.require_column(name)?;
        Ok(self.column(col).filter_map(Value::as_f64).fold(None, |acc, v| {
            Some(match acc {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            })
        }))
    }

    /// `(earliest, latest)` over the date cells of a column.
    pub fn date_bounds(&self, name: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let col = self.require_column(name)?;
        Ok(self.column(col).filter_map(Value::as_date).fold(None, |acc, d| {
            Some(match acc {
                None => (d, d),
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
            })
        }))
    }

    /// A new dataset holding the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["loc".into(), "price".into(), "listed".into()],
            vec![
                Record::new(vec![
                    "A".into(),
                    Value::Integer(100),
                    Value::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
                ]),
                Record::new(vec!["B".into(), Value::Float(2.5), Value::Null]),
                Record::new(vec!["A".into(), Value::Null]),
            ],
        )
    }

    #[test]
    fn short_rows_read_as_null() {
        let ds = sample();
        assert_eq!(ds.rows()[2].get(2), &Value::Null);
    }

    #[test]
    fn distinct_values_are_sorted() {
        let ds = sample();
        let locs: Vec<_> = ds.distinct_values("loc").unwrap().into_iter().collect();
        assert_eq!(locs, vec![Value::from("A"), Value::from("B")]);
    }

    #[test]
    fn numeric_bounds_skip_nulls() {
        let ds = sample();
        assert_eq!(ds.numeric_bounds("price").unwrap(), Some((2.5, 100.0)));
        assert_eq!(ds.numeric_bounds("loc").unwrap(), None);
    }

    #[test]
    fn date_bounds_single_value() {
        let ds = sample();
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(ds.date_bounds("listed").unwrap(), Some((d, d)));
    }

    #[test]
    fn missing_columns_keep_requested_order() {
        let ds = sample();
        assert_eq!(
            ds.missing_columns(&["zeta", "price", "alpha"]),
            vec!["zeta".to_string(), "alpha".to_string()]
        );
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = sample();
        assert!(matches!(
            ds.numeric_values("nope"),
            Err(DataError::UnknownColumn(c)) if c == "nope"
        ));
    }

    #[test]
    fn float_fields_keep_decimal_point() {
        assert_eq!(Value::Float(1000.0).to_field(), "1000.0");
        assert_eq!(Value::Float(0.1).to_field(), "0.1");
        assert_eq!(Value::Null.to_field(), "");
    }

    #[test]
    fn nan_floats_compare_equal_to_themselves() {
        let a = Value::Float(f64::NAN);
        assert_eq!(a, a.clone());
        assert_eq!(a.as_f64(), None);
    }

    #[test]
    fn infinite_floats_are_not_numeric() {
        assert_eq!(Value::Float(f64::INFINITY).as_f64(), None);
        assert_eq!(Value::Float(f64::NEG_INFINITY).as_f64(), None);

        let ds = Dataset::new(
            vec!["price".into()],
            vec![
                Record::new(vec![Value::Float(1.0)]),
                Record::new(vec![Value::Float(f64::INFINITY)]),
                Record::new(vec![Value::Float(4.0)]),
            ],
        );
        assert_eq!(ds.numeric_bounds("price").unwrap(), Some((1.0, 4.0)));
    }
}
