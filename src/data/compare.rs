use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::aggregate::AggregateRow;
use super::model::Value;

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_BOTTOM_N: usize = 5;

/// Union of the selected groups, the `top_n` highest and the `bottom_n`
/// lowest groups by `rank_metric`.
///
/// * An empty `selected` means every group is selected.
/// * Output order is selected (input order), then top, then bottom; a
///   group already emitted is skipped.
/// * Ranking ties are broken by group key. Groups without `rank_metric`
///   never rank.
pub fn compare(
    rows: &[AggregateRow],
    selected: &[Value],
    rank_metric: &str,
    top_n: usize,
    bottom_n: usize,
) -> Vec<AggregateRow> {
    let selected: BTreeSet<&Value> = selected.iter().collect();
    let picked = rows
        .iter()
        .filter(|r| selected.is_empty() || selected.contains(&r.key));

    let mut ranked: Vec<(&AggregateRow, f64)> = rows
        .iter()
        .filter_map(|r| r.get(rank_metric).map(|v| (r, v)))
        .collect();

    ranked.sort_by(|(a, va), (b, vb)| vb.total_cmp(va).then_with(|| a.key.cmp(&b.key)));
    let top: Vec<&AggregateRow> = ranked.iter().take(top_n).map(|(r, _)| *r).collect();

    ranked.sort_by(|(a, va), (b, vb)| va.total_cmp(vb).then_with(|| a.key.cmp(&b.key)));
    let bottom: Vec<&AggregateRow> = ranked.iter().take(bottom_n).map(|(r, _)| *r).collect();

    let mut seen: BTreeSet<Value> = BTreeSet::new();
    picked
        .chain(top)
        .chain(bottom)
        .filter(|r| seen.insert(r.key.clone()))
        .cloned()
        .collect()
}

/// Order rows by a metric, highest first, ties by key. Rows lacking the
/// metric go last.
pub fn sort_desc(rows: &mut [AggregateRow], metric: &str) {
    rows.sort_by(|a, b| match (a.get(metric), b.get(metric)) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.key.cmp(&b.key)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.key.cmp(&b.key),
    });
}
