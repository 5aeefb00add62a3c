use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{Dataset, Value};
use super::stats;
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Reducers and metric definitions
// ---------------------------------------------------------------------------

/// A named aggregation applied to the numeric cells of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Sum,
    Count,
    Median,
    Min,
    Max,
}

impl Reducer {
    /// Reduce the numeric cells of a group. `Sum` and `Count` of nothing
    /// are zero; the others are undefined.
    pub fn reduce(self, values: &[f64]) -> Option<f64> {
        match self {
            Reducer::Mean => stats::mean(values),
            Reducer::Sum => Some(values.iter().sum()),
            Reducer::Count => Some(values.len() as f64),
            Reducer::Median => stats::median(values),
            Reducer::Min => values.iter().copied().reduce(f64::min),
            Reducer::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

/// `name = reducer(column)` evaluated per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub column: String,
    pub reducer: Reducer,
}

impl Metric {
    pub fn new(name: impl Into<String>, column: impl Into<String>, reducer: Reducer) -> Self {
        Metric {
            name: name.into(),
            column: column.into(),
            reducer,
        }
    }
}

/// `name = numerator / denominator`, both naming metrics of the same row.
///
/// Evaluated after grouping, so a ratio of two sums weights every listing
/// by its size instead of averaging per-row ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

impl Ratio {
    pub fn new(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        Ratio {
            name: name.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AggregateRow
// ---------------------------------------------------------------------------

/// Summary statistics of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: Value,
    /// Number of records in the group.
    pub rows: usize,
    /// Metric name → value. Absent when undefined for this group.
    pub metrics: BTreeMap<String, f64>,
}

impl AggregateRow {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

// ---------------------------------------------------------------------------
// summarize
// ---------------------------------------------------------------------------

/// Group `dataset` by `group_key` and evaluate `metrics`, then `ratios`.
///
/// Output rows are ordered by group key. Rows with a `Null` key belong to
/// no group.
pub fn summarize(
    dataset: &Dataset,
    group_key: &str,
    metrics: &[Metric],
    ratios: &[Ratio],
) -> Result<Vec<AggregateRow>> {
    let key_col = dataset.require_column(group_key)?;
    let columns = resolve_metrics(dataset, metrics, ratios)?;

    let mut groups: BTreeMap<Value, Vec<usize>> = BTreeMap::new();
    for (i, record) in dataset.rows().iter().enumerate() {
        let key = record.get(key_col);
        if key.is_null() {
            continue;
        }
        groups.entry(key.clone()).or_default().push(i);
    }

    Ok(groups
        .into_iter()
        .map(|(key, indices)| build_row(dataset, key, &indices, metrics, &columns, ratios))
        .collect())
}

/// The same metrics over the whole dataset, keyed by `Value::Null`.
pub fn overall(dataset: &Dataset, metrics: &[Metric], ratios: &[Ratio]) -> Result<AggregateRow> {
    let columns = resolve_metrics(dataset, metrics, ratios)?;
    let indices: Vec<usize> = (0..dataset.len()).collect();
    Ok(build_row(dataset, Value::Null, &indices, metrics, &columns, ratios))
}

/// Column index of every metric; also checks ratios only name known metrics.
fn resolve_metrics(dataset: &Dataset, metrics: &[Metric], ratios: &[Ratio]) -> Result<Vec<usize>> {
    let columns = metrics
        .iter()
        .map(|m| dataset.require_column(&m.column))
        .collect::<Result<Vec<_>>>()?;

    let mut known: BTreeSet<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
    for ratio in ratios {
        for operand in [&ratio.numerator, &ratio.denominator] {
            if !known.contains(operand.as_str()) {
                return Err(DataError::UnknownMetric(operand.clone()));
            }
        }
        known.insert(ratio.name.as_str());
    }
    Ok(columns)
}

fn build_row(
    dataset: &Dataset,
    key: Value,
    indices: &[usize],
    metrics: &[Metric],
    columns: &[usize],
    ratios: &[Ratio],
) -> AggregateRow {
    let rows = dataset.rows();
    let mut values = BTreeMap::new();

    for (metric, &col) in metrics.iter().zip(columns) {
        let cells: Vec<f64> = indices
            .iter()
            .filter_map(|&i| rows[i].get(col).as_f64())
            .collect();
        if let Some(v) = metric.reducer.reduce(&cells) {
            values.insert(metric.name.clone(), v);
        }
    }

    for ratio in ratios {
        let num = values.get(&ratio.numerator).copied();
        let den = values.get(&ratio.denominator).copied();
        if let (Some(num), Some(den)) = (num, den) {
            if den != 0.0 {
                values.insert(ratio.name.clone(), num / den);
            }
        }
    }

    AggregateRow {
        key,
        rows: indices.len(),
        metrics: values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn scenario() -> Dataset {
        Dataset::new(
            vec!["loc".into(), "price".into(), "area".into()],
            vec![
                Record::new(vec!["A".into(), 100i64.into(), 10i64.into()]),
                Record::new(vec!["A".into(), 300i64.into(), 30i64.into()]),
                Record::new(vec!["B".into(), 1000i64.into(), 10i64.into()]),
            ],
        )
    }

    fn location_metrics() -> (Vec<Metric>, Vec<Ratio>) {
        (
            vec![
                Metric::new("mean_price", "price", Reducer::Mean),
                Metric::new("sum_price", "price", Reducer::Sum),
                Metric::new("sum_area", "area", Reducer::Sum),
                Metric::new("listings", "price", Reducer::Count),
            ],
            vec![Ratio::new("price_per_area", "sum_price", "sum_area")],
        )
    }

    #[test]
    fn summarize_groups_by_location() {
        let (metrics, ratios) = location_metrics();
        let rows = summarize(&scenario(), "loc", &metrics, &ratios).unwrap();
        assert_eq!(rows.len(), 2);

        let a = &rows[0];
        assert_eq!(a.key, Value::from("A"));
        assert_eq!(a.rows, 2);
        assert_eq!(a.get("mean_price"), Some(200.0));
        assert_eq!(a.get("sum_price"), Some(400.0));
        assert_eq!(a.get("sum_area"), Some(40.0));
        assert_eq!(a.get("price_per_area"), Some(10.0));

        let b = &rows[1];
        assert_eq!(b.key, Value::from("B"));
        assert_eq!(b.get("mean_price"), Some(1000.0));
        assert_eq!(b.get("price_per_area"), Some(100.0));
    }

    #[test]
    fn ratio_uses_sums_not_mean_of_ratios() {
        let ds = Dataset::new(
            vec!["loc".into(), "price".into(), "area".into()],
            vec![
                Record::new(vec!["A".into(), 100i64.into(), 1i64.into()]),
                Record::new(vec!["A".into(), 100i64.into(), 99i64.into()]),
            ],
        );
        let (metrics, ratios) = location_metrics();
        let rows = summarize(&ds, "loc", &metrics, &ratios).unwrap();
        // sum/sum = 200/100 = 2; mean of ratios would be (100 + 1.0101..)/2.
        assert_eq!(rows[0].get("price_per_area"), Some(2.0));
    }

    #[test]
    fn zero_denominator_leaves_ratio_undefined() {
        let ds = Dataset::new(
            vec!["loc".into(), "price".into(), "area".into()],
            vec![Record::new(vec!["A".into(), 100i64.into(), 0i64.into()])],
        );
        let (metrics, ratios) = location_metrics();
        let rows = summarize(&ds, "loc", &metrics, &ratios).unwrap();
        assert_eq!(rows[0].get("price_per_area"), None);
        assert_eq!(rows[0].get("sum_price"), Some(100.0));
    }

    #[test]
    fn nulls_are_skipped_by_reducers() {
        let ds = Dataset::new(
            vec!["loc".into(), "price".into()],
            vec![
                Record::new(vec!["A".into(), 10i64.into()]),
                Record::new(vec!["A".into(), Value::Null]),
                Record::new(vec!["A".into(), 30i64.into()]),
            ],
        );
        let metrics = vec![
            Metric::new("n", "price", Reducer::Count),
            Metric::new("median", "price", Reducer::Median),
            Metric::new("max", "price", Reducer::Max),
        ];
        let rows = summarize(&ds, "loc", &metrics, &[]).unwrap();
        assert_eq!(rows[0].rows, 3);
        assert_eq!(rows[0].get("n"), Some(2.0));
        assert_eq!(rows[0].get("median"), Some(20.0));
        assert_eq!(rows[0].get("max"), Some(30.0));
    }

    #[test]
    fn empty_dataset_yields_no_groups() {
        let (metrics, ratios) = location_metrics();
        let empty = scenario().empty_like();
        assert!(summarize(&empty, "loc", &metrics, &ratios).unwrap().is_empty());

        let total = overall(&empty, &metrics, &ratios).unwrap();
        assert_eq!(total.rows, 0);
        assert_eq!(total.get("mean_price"), None);
        assert_eq!(total.get("sum_price"), Some(0.0));
        assert_eq!(total.get("price_per_area"), None);
    }

    #[test]
    fn overall_matches_whole_table() {
        let (metrics, ratios) = location_metrics();
        let total = overall(&scenario(), &metrics, &ratios).unwrap();
        assert_eq!(total.rows, 3);
        assert_eq!(total.get("sum_price"), Some(1400.0));
        assert_eq!(total.get("price_per_area"), Some(28.0));
    }

    #[test]
    fn ratio_over_unknown_metric_is_rejected() {
        let ratios = vec![Ratio::new("r", "nope", "sum_area")];
        let metrics = vec![Metric::new("sum_area", "area", Reducer::Sum)];
        assert!(matches!(
            summarize(&scenario(), "loc", &metrics, &ratios),
            Err(DataError::UnknownMetric(m)) if m == "nope"
        ));
    }

    #[test]
    fn unknown_group_key_is_rejected() {
        assert!(matches!(
            summarize(&scenario(), "city", &[], &[]),
            Err(DataError::UnknownColumn(_))
        ));
    }

    #[test]
    fn null_locations_form_no_group() {
        let mut rows = scenario().rows().to_vec();
        rows.push(Record::new(vec![Value::Null, 50i64.into(), 5i64.into()]));
        let ds = Dataset::new(scenario().columns().to_vec(), rows);
        let (metrics, ratios) = location_metrics();

        let groups = summarize(&ds, "loc", &metrics, &ratios).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| !g.key.is_null()));

        // The unlocated row still counts towards the totals.
        let total = overall(&ds, &metrics, &ratios).unwrap();
        assert_eq!(total.get("listings"), Some(4.0));
    }
}
