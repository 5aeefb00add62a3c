//! Everything one dashboard page shows, recomputed from scratch whenever a
//! control changes.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::Settings;
use crate::data::aggregate::{self, AggregateRow, Metric, Ratio, Reducer};
use crate::data::compare;
use crate::data::export;
use crate::data::filter::{self, DateInterval, FilterSpec, Interval, Predicate};
use crate::data::model::{Dataset, Value};
use crate::data::stats::{self, BoxStats, Histogram, LinearFit, QuantileBins};
use crate::error::Result;
use crate::schema::{ControlKind, FilterControl, InitialSelection, SchemaDescriptor};

pub const AVERAGE_PRICE: &str = "Average_Price";
pub const SUM_PRICE: &str = "Sum_Price";
pub const SUM_AREA: &str = "Sum_Area";
pub const TOTAL_LISTINGS: &str = "Total_Listings";
pub const AVERAGE_AREA: &str = "Average_Area";
pub const MEDIAN_AREA: &str = "Median_Area";
pub const AVERAGE_BUILD_AREA: &str = "Average_Build_Area";
pub const AVERAGE_PRICE_PER_AREA: &str = "Average_Price_per_Cent";

/// Metrics plotted side by side in the comparison chart.
pub const COMPARISON_METRICS: [&str; 3] = [AVERAGE_PRICE, AVERAGE_PRICE_PER_AREA, TOTAL_LISTINGS];

// ---------------------------------------------------------------------------
// Control domains and state
// ---------------------------------------------------------------------------

/// The values a control can take, derived from the full dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    Values(BTreeSet<Value>),
    Numeric(Interval),
    Dates(DateInterval),
    /// The column exists but holds nothing the control can use.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlDomain {
    pub control: FilterControl,
    pub domain: Domain,
}

/// Domains of the descriptor's controls. Optional controls whose column is
/// absent are dropped.
pub fn control_domains(descriptor: &SchemaDescriptor, dataset: &Dataset) -> Result<Vec<ControlDomain>> {
    let mut out = Vec::new();
    for control in &descriptor.controls {
        if control.optional && !dataset.has_column(&control.column) {
            continue;
        }
        let domain = match &control.kind {
            ControlKind::MultiSelect { .. } => Domain::Values(dataset.distinct_values(&control.column)?),
            ControlKind::Range { from_zero, .. } => match dataset.numeric_bounds(&control.column)? {
                Some((lo, hi)) if *from_zero => Domain::Numeric(Interval::from_bounds((lo.min(0.0), hi))),
                Some(bounds) => Domain::Numeric(Interval::from_bounds(bounds)),
                None => Domain::Unavailable,
            },
            ControlKind::DateRange => match dataset.date_bounds(&control.column)? {
                Some(bounds) => Domain::Dates(DateInterval::from_bounds(bounds)),
                None => Domain::Unavailable,
            },
        };
        out.push(ControlDomain {
            control: control.clone(),
            domain,
        });
    }
    Ok(out)
}

/// Current widget values, keyed by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlState {
    pub selections: BTreeMap<String, BTreeSet<Value>>,
    pub ranges: BTreeMap<String, Interval>,
    pub dates: BTreeMap<String, DateInterval>,
}

impl ControlState {
    /// Widgets at their initial values: multi-selects empty or full per the
    /// descriptor, ranges spanning the whole domain. Date controls add no
    /// constraint until the user picks dates, so undated rows stay visible.
    pub fn init(domains: &[ControlDomain]) -> Self {
        let mut state = ControlState::default();
        for cd in domains {
            let column = cd.control.column.clone();
            match (&cd.control.kind, &cd.domain) {
                (ControlKind::MultiSelect { initial }, Domain::Values(values)) => {
                    let selected = match initial {
                        InitialSelection::Empty => BTreeSet::new(),
                        InitialSelection::All => values.clone(),
                    };
                    state.selections.insert(column, selected);
                }
                (ControlKind::Range { .. }, Domain::Numeric(iv)) => {
                    state.ranges.insert(column, *iv);
                }
                _ => {}
            }
        }
        state
    }

    /// The filter these widget values describe.
    pub fn to_filter_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        for (col, selected) in &self.selections {
            spec.push(col.clone(), Predicate::Members(selected.clone()));
        }
        for (col, iv) in &self.ranges {
            spec.push(col.clone(), Predicate::Range(*iv));
        }
        for (col, iv) in &self.dates {
            spec.push(col.clone(), Predicate::Dates(*iv));
        }
        spec
    }

    /// Locations the user picked explicitly (empty when none).
    pub fn selected_locations(&self, descriptor: &SchemaDescriptor) -> Vec<Value> {
        self.selections
            .get(&descriptor.roles.location)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle(&mut self, column: &str, value: &Value) {
        let selected = self.selections.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub mean_price: Option<f64>,
    pub median_area: Option<f64>,
    pub count: usize,
    /// `sum(price) / sum(area)`, zero when the area sum is zero.
    pub price_per_area: f64,
    pub mean_build_area: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationBox {
    pub location: Value,
    pub stats: BoxStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub location: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub location: Value,
    pub price_per_area: f64,
    pub category: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub points: Vec<MapPoint>,
    pub bins: QuantileBins,
}

/// Derived data for one recomputation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub total_rows: usize,
    pub filtered: Dataset,
    pub kpis: Kpis,
    /// Per-location summary, ordered by location.
    pub locations: Vec<AggregateRow>,
    pub boxes: Vec<LocationBox>,
    pub scatter: Vec<ScatterPoint>,
    /// One least-squares line per location with enough spread.
    pub trends: Vec<(Value, LinearFit)>,
    pub histogram: Option<Histogram>,
    pub comparison: Vec<AggregateRow>,
    pub map: Option<MapView>,
    /// The listings table is only shown for an explicit location choice.
    pub show_listings: bool,
}

fn location_metrics(descriptor: &SchemaDescriptor) -> (Vec<Metric>, Vec<Ratio>) {
    let roles = &descriptor.roles;
    let mut metrics = vec![
        Metric::new(AVERAGE_PRICE, &roles.price, Reducer::Mean),
        Metric::new(SUM_PRICE, &roles.price, Reducer::Sum),
        Metric::new(SUM_AREA, &roles.area, Reducer::Sum),
        Metric::new(TOTAL_LISTINGS, &roles.price, Reducer::Count),
        Metric::new(AVERAGE_AREA, &roles.area, Reducer::Mean),
        Metric::new(MEDIAN_AREA, &roles.area, Reducer::Median),
    ];
    if let Some(build) = &roles.build_area {
        metrics.push(Metric::new(AVERAGE_BUILD_AREA, build, Reducer::Mean));
    }
    let ratios = vec![Ratio::new(AVERAGE_PRICE_PER_AREA, SUM_PRICE, SUM_AREA)];
    (metrics, ratios)
}

impl Snapshot {
    /// Run the full filter → aggregate → compare pass.
    pub fn compute(
        descriptor: &SchemaDescriptor,
        dataset: &Dataset,
        controls: &ControlState,
        settings: &Settings,
    ) -> Result<Snapshot> {
        let roles = &descriptor.roles;
        let filtered = filter::apply(dataset, &controls.to_filter_spec())?;
        let (metrics, ratios) = location_metrics(descriptor);

        let total = aggregate::overall(&filtered, &metrics, &ratios)?;
        let kpis = Kpis {
            mean_price: total.get(AVERAGE_PRICE),
            median_area: total.get(MEDIAN_AREA),
            count: filtered.len(),
            price_per_area: total.get(AVERAGE_PRICE_PER_AREA).unwrap_or(0.0),
            mean_build_area: total.get(AVERAGE_BUILD_AREA),
        };

        let locations = aggregate::summarize(&filtered, &roles.location, &metrics, &ratios)?;
        let selected = controls.selected_locations(descriptor);
        let comparison = compare::compare(
            &locations,
            &selected,
            AVERAGE_PRICE,
            settings.top_n,
            settings.bottom_n,
        );

        let loc_col = filtered.require_column(&roles.location)?;
        let price_col = filtered.require_column(&roles.price)?;
        let area_col = filtered.require_column(&roles.area)?;

        let mut prices_by_location: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
        let mut points_by_location: BTreeMap<Value, Vec<(f64, f64)>> = BTreeMap::new();
        let mut scatter = Vec::new();
        for record in filtered.rows() {
            let location = record.get(loc_col);
            let price = record.get(price_col).as_f64();
            if location.is_null() {
                continue;
            }
            if let Some(p) = price {
                prices_by_location.entry(location.clone()).or_default().push(p);
            }
            if let (Some(x), Some(y)) = (record.get(area_col).as_f64(), price) {
                points_by_location
                    .entry(location.clone())
                    .or_default()
                    .push((x, y));
                scatter.push(ScatterPoint {
                    x,
                    y,
                    location: location.clone(),
                });
            }
        }

        let boxes = prices_by_location
            .into_iter()
            .filter_map(|(location, prices)| {
                stats::box_stats(&prices).map(|stats| LocationBox { location, stats })
            })
            .collect();
        let trends = points_by_location
            .into_iter()
            .filter_map(|(location, pts)| stats::linear_fit(&pts).map(|fit| (location, fit)))
            .collect();

        let histogram = stats::histogram(&filtered.numeric_values(&roles.ratio)?, settings.histogram_bins);
        let map = map_view(descriptor, &filtered)?;

        log::debug!(
            "{}: {} of {} rows, {} locations, {} compared",
            descriptor.id,
            filtered.len(),
            dataset.len(),
            locations.len(),
            comparison.len()
        );

        Ok(Snapshot {
            total_rows: dataset.len(),
            kpis,
            locations,
            boxes,
            scatter,
            trends,
            histogram,
            comparison,
            map,
            show_listings: !selected.is_empty(),
            filtered,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// CSV bytes of the filtered rows, every column.
    pub fn export(&self) -> Result<Vec<u8>> {
        export::to_delimited(&self.filtered, None)
    }
}

fn map_view(descriptor: &SchemaDescriptor, filtered: &Dataset) -> Result<Option<MapView>> {
    let roles = &descriptor.roles;
    let (Some(lat), Some(lon), Some(ppa)) = (&roles.latitude, &roles.longitude, &roles.price_per_area)
    else {
        return Ok(None);
    };
    if filtered.is_empty() {
        return Ok(None);
    }

    let Some(bins) = QuantileBins::new(&filtered.numeric_values(ppa)?, &descriptor.currency) else {
        return Ok(None);
    };
    let (lat_col, lon_col, ppa_col, loc_col) = (
        filtered.require_column(lat)?,
        filtered.require_column(lon)?,
        filtered.require_column(ppa)?,
        filtered.require_column(&roles.location)?,
    );

    let points = filtered
        .rows()
        .iter()
        .filter_map(|r| {
            let lat = r.get(lat_col).as_f64()?;
            let lon = r.get(lon_col).as_f64()?;
            let price_per_area = r.get(ppa_col).as_f64()?;
            Some(MapPoint {
                lat,
                lon,
                location: r.get(loc_col).clone(),
                price_per_area,
                category: bins.category_of(price_per_area),
            })
        })
        .collect();

    Ok(Some(MapView { points, bins }))
}
