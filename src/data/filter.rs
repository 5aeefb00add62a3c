use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{Dataset, Value};
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Intervals
// ---------------------------------------------------------------------------

/// Closed numeric interval `[lo, hi]`. `lo == hi` is a valid point interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lo: f64,
    hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Result<Self> {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(DataError::InvalidInterval {
                lo: lo.to_string(),
                hi: hi.to_string(),
            });
        }
        Ok(Interval { lo, hi })
    }

    /// Zero-width interval, used when a column has a single distinct value.
    pub fn point(value: f64) -> Self {
        Interval { lo: value, hi: value }
    }

    /// The interval spanning a column's `(min, max)` bounds.
    pub fn from_bounds((lo, hi): (f64, f64)) -> Self {
        if lo >= hi {
            Interval::point(lo)
        } else {
            Interval { lo, hi }
        }
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }
}

/// Closed date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidInterval {
                lo: start.to_string(),
                hi: end.to_string(),
            });
        }
        Ok(DateInterval { start, end })
    }

    pub fn from_bounds((start, end): (NaiveDate, NaiveDate)) -> Self {
        DateInterval {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

// ---------------------------------------------------------------------------
// Filter predicate per column
// ---------------------------------------------------------------------------

/// A single constraint on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Keep rows whose value is in the set. An empty set selects everything.
    Members(BTreeSet<Value>),
    /// Keep rows whose numeric value lies in the interval.
    Range(Interval),
    /// Keep rows whose date lies in the interval.
    Dates(DateInterval),
}

impl Predicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::Members(selected) => selected.is_empty() || selected.contains(value),
            Predicate::Range(iv) => value.as_f64().is_some_and(|v| iv.contains(v)),
            Predicate::Dates(iv) => value.as_date().is_some_and(|d| iv.contains(d)),
        }
    }
}

/// Per-column predicates, all combined with AND.
///
/// Each column holds a list so that two specs can be conjoined without
/// losing either side's constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    predicates: BTreeMap<String, Vec<Predicate>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, predicate: Predicate) {
        self.predicates
            .entry(column.into())
            .or_default()
            .push(predicate);
    }

    pub fn with_members<I>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.push(column, Predicate::Members(values.into_iter().collect()));
        self
    }

    pub fn with_range(mut self, column: impl Into<String>, interval: Interval) -> Self {
        self.push(column, Predicate::Range(interval));
        self
    }

    pub fn with_dates(mut self, column: impl Into<String>, interval: DateInterval) -> Self {
        self.push(column, Predicate::Dates(interval));
        self
    }

    /// Conjunction of two specs: a row passes only if it passes both.
    pub fn and(&self, other: &FilterSpec) -> FilterSpec {
        let mut combined = self.clone();
        for (col, preds) in &other.predicates {
            combined
                .predicates
                .entry(col.clone())
                .or_default()
                .extend(preds.iter().cloned());
        }
        combined
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.predicates
            .iter()
            .flat_map(|(col, preds)| preds.iter().map(move |p| (col.as_str(), p)))
    }
}

// ---------------------------------------------------------------------------
// Applying a filter
// ---------------------------------------------------------------------------

/// Return indices of records that pass every predicate.
///
/// A record passes a column predicate when:
/// * the predicate is a value set that is empty → no constraint
/// * the record's value is in the selected set
/// * the record's value lies inside the closed interval (both ends inclusive)
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Result<Vec<usize>> {
    let resolved: Vec<(usize, &Predicate)> = spec
        .iter()
        .map(|(col, pred)| dataset.require_column(col).map(|idx| (idx, pred)))
        .collect::<Result<_>>()?;

    Ok(dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            resolved
                .iter()
                .all(|(col, pred)| pred.matches(record.get(*col)))
        })
        .map(|(i, _)| i)
        .collect())
}

/// The subset of `dataset` satisfying `spec`, in original row order.
///
/// A zero-row result is a valid dataset, not an error.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Result<Dataset> {
    let indices = filtered_indices(dataset, spec)?;
    log::debug!(
        "filter kept {} of {} rows ({} predicates)",
        indices.len(),
        dataset.len(),
        spec.iter().count()
    );
    Ok(dataset.select(&indices))
}
