use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, Points,
};

use realty_lens::dashboard::{
    Kpis, Snapshot, AVERAGE_PRICE, AVERAGE_PRICE_PER_AREA, COMPARISON_METRICS, TOTAL_LISTINGS,
};
use realty_lens::data::aggregate::AggregateRow;
use realty_lens::data::compare::sort_desc;
use realty_lens::schema::SchemaDescriptor;

use crate::color::{blues, generate_palette, ColorMap, COMPARISON_COLORS, TEAL};
use crate::state::DashboardState;
use crate::ui::{decimal, money, thousands};

const CHART_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render every chart of the active dashboard.
pub fn dashboard_view(ui: &mut Ui, page: &DashboardState) {
    let descriptor = &page.descriptor;
    let Some(snapshot) = &page.snapshot else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view the dashboard  (File → Open…)");
        });
        return;
    };
    let fallback = ColorMap::new(&Default::default());
    let colors = page.color_map.as_ref().unwrap_or(&fallback);

    ui.heading(&descriptor.title);
    ui.add_space(4.0);
    kpi_row(ui, descriptor, &snapshot.kpis);
    ui.separator();

    if snapshot.is_empty() {
        ui.label(RichText::new("No data available for the selected filters.").italics());
        return;
    }

    ui.strong(format!("Average Price by Location ({})", descriptor.currency));
    overview_chart(ui, descriptor, &snapshot.locations);
    ui.add_space(8.0);

    ui.strong("Price Distribution by Location");
    price_box_plot(ui, snapshot, colors);
    ui.add_space(8.0);

    ui.strong(format!("Price vs Area ({})", descriptor.roles.area_unit));
    price_area_scatter(ui, descriptor, snapshot, colors);
    ui.add_space(8.0);

    ui.strong(format!("Distribution of {}", descriptor.roles.ratio));
    ratio_histogram(ui, snapshot);
    ui.add_space(8.0);

    ui.strong("Location Comparison");
    comparison_charts(ui, descriptor, &snapshot.comparison);
    ui.add_space(8.0);

    if descriptor.has_map() {
        ui.strong(format!(
            "Price per {} by Position",
            singular(&descriptor.roles.area_unit)
        ));
        location_map(ui, snapshot);
    }
}

fn singular(unit: &str) -> &str {
    unit.strip_suffix('s').unwrap_or(unit)
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

fn kpi_row(ui: &mut Ui, descriptor: &SchemaDescriptor, kpis: &Kpis) {
    let currency = descriptor.currency.as_str();
    let unit = &descriptor.roles.area_unit;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        kpi(ui, "Average Price", money(currency, kpis.mean_price));
        kpi(ui, &format!("Median Area ({unit})"), decimal(kpis.median_area));
        kpi(
            ui,
            &format!("Total {}", descriptor.item_label),
            kpis.count.to_string(),
        );
        kpi(
            ui,
            &format!("Average Price per {}", singular(unit)),
            money(currency, Some(kpis.price_per_area)),
        );
        if descriptor.roles.build_area.is_some() {
            kpi(ui, "Average Build Area (sqft)", decimal(kpis.mean_build_area));
        }
    });
}

fn kpi(ui: &mut Ui, title: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.weak(title);
            ui.label(RichText::new(value).size(20.0).strong());
        });
    });
}

// ---------------------------------------------------------------------------
// Categorical charts
// ---------------------------------------------------------------------------

/// Axis formatter that prints category names at integer positions.
fn category_axis(names: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let idx = mark.value.round();
        if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
            return String::new();
        }
        names.get(idx as usize).cloned().unwrap_or_default()
    }
}

/// Locations ranked by average price, highest first.
fn overview_chart(ui: &mut Ui, descriptor: &SchemaDescriptor, rows: &[AggregateRow]) {
    let mut rows = rows.to_vec();
    sort_desc(&mut rows, AVERAGE_PRICE);
    let values: Vec<f64> = rows
        .iter()
        .map(|r| r.get(AVERAGE_PRICE).unwrap_or(0.0))
        .collect();
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let bars: Vec<Bar> = rows
        .iter()
        .zip(&values)
        .enumerate()
        .map(|(i, (row, v))| {
            let t = if max > 0.0 { v / max } else { 0.0 };
            Bar::new(i as f64, *v)
                .name(format!("{}: {}", row.key, money(&descriptor.currency, Some(*v))))
                .fill(blues(t))
                .width(0.7)
        })
        .collect();
    let names = rows.iter().map(|r| r.key.to_string()).collect();

    Plot::new(format!("{}_overview", descriptor.id))
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(names))
        .y_axis_label(AVERAGE_PRICE)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(AVERAGE_PRICE));
        });
}

fn price_box_plot(ui: &mut Ui, snapshot: &Snapshot, colors: &ColorMap) {
    Plot::new("price_box_plot")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_formatter(category_axis(
            snapshot.boxes.iter().map(|b| b.location.to_string()).collect(),
        ))
        .y_axis_label("Price")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, b) in snapshot.boxes.iter().enumerate() {
                let color = colors.color_for(&b.location);
                let name = b.location.to_string();
                let s = &b.stats;
                let elem = BoxElem::new(
                    i as f64,
                    BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker),
                )
                .name(&name)
                .fill(color.gamma_multiply(0.4))
                .stroke(Stroke::new(1.5, color))
                .box_width(0.6);
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&name));

                if !s.outliers.is_empty() {
                    let pts: PlotPoints = s.outliers.iter().map(|&y| [i as f64, y]).collect();
                    plot_ui.points(Points::new(pts).color(color).radius(2.5).name(&name));
                }
            }
        });
}

fn price_area_scatter(
    ui: &mut Ui,
    descriptor: &SchemaDescriptor,
    snapshot: &Snapshot,
    colors: &ColorMap,
) {
    Plot::new(format!("{}_scatter", descriptor.id))
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(format!("Area ({})", descriptor.roles.area_unit))
        .y_axis_label("Price")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for row in &snapshot.locations {
                let pts: PlotPoints = snapshot
                    .scatter
                    .iter()
                    .filter(|p| p.location == row.key)
                    .map(|p| [p.x, p.y])
                    .collect();
                plot_ui.points(
                    Points::new(pts)
                        .color(colors.color_for(&row.key))
                        .radius(3.0)
                        .name(row.key.to_string()),
                );
            }

            for (location, fit) in &snapshot.trends {
                let xs = snapshot
                    .scatter
                    .iter()
                    .filter(|p| &p.location == location)
                    .map(|p| p.x);
                let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                    (lo.min(x), hi.max(x))
                });
                if !lo.is_finite() {
                    continue;
                }
                let line: PlotPoints = vec![[lo, fit.predict(lo)], [hi, fit.predict(hi)]].into();
                plot_ui.line(
                    Line::new(line)
                        .color(colors.color_for(location))
                        .width(1.5)
                        .name(format!("{location} trend (R² {:.2})", fit.r_squared)),
                );
            }
        });
}

fn ratio_histogram(ui: &mut Ui, snapshot: &Snapshot) {
    let Some(hist) = &snapshot.histogram else {
        ui.weak("No values to bin.");
        return;
    };
    let width = hist.bin_width();
    let bars: Vec<Bar> = hist
        .counts
        .iter()
        .zip(hist.edges.windows(2))
        .map(|(&count, edge)| {
            Bar::new((edge[0] + edge[1]) / 2.0, count as f64)
                .width(width)
                .fill(TEAL)
                .stroke(Stroke::new(0.5, Color32::BLACK))
        })
        .collect();

    Plot::new("ratio_histogram")
        .height(CHART_HEIGHT * 0.8)
        .y_axis_label("Count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

/// One bar chart per comparison metric, side by side.
fn comparison_charts(ui: &mut Ui, descriptor: &SchemaDescriptor, rows: &[AggregateRow]) {
    if rows.is_empty() {
        ui.weak("Nothing to compare.");
        return;
    }
    let names: Vec<String> = rows.iter().map(|r| r.key.to_string()).collect();
    ui.columns(COMPARISON_METRICS.len(), |columns| {
        for ((col_ui, metric), color) in columns
            .iter_mut()
            .zip(COMPARISON_METRICS)
            .zip(COMPARISON_COLORS)
        {
            col_ui.label(metric_title(metric, descriptor));
            let bars: Vec<Bar> = rows
                .iter()
                .enumerate()
                .filter_map(|(i, row)| {
                    let v = row.get(metric)?;
                    Some(
                        Bar::new(i as f64, v)
                            .name(format!("{}: {}", row.key, thousands(v)))
                            .fill(color)
                            .width(0.7),
                    )
                })
                .collect();
            Plot::new(format!("{}_compare_{metric}", descriptor.id))
                .height(CHART_HEIGHT * 0.8)
                .x_axis_formatter(category_axis(names.clone()))
                .allow_scroll(false)
                .show(col_ui, |plot_ui| {
                    plot_ui.bar_chart(BarChart::new(bars).name(metric));
                });
        }
    });
}

fn metric_title(metric: &str, descriptor: &SchemaDescriptor) -> String {
    match metric {
        AVERAGE_PRICE => format!("Average Price ({})", descriptor.currency),
        AVERAGE_PRICE_PER_AREA => format!(
            "Average Price per {} ({})",
            singular(&descriptor.roles.area_unit),
            descriptor.currency
        ),
        TOTAL_LISTINGS => format!("Total {}", descriptor.item_label),
        other => other.replace('_', " "),
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// Longitude/latitude scatter coloured by price-per-area quartile.
fn location_map(ui: &mut Ui, snapshot: &Snapshot) {
    let Some(map) = &snapshot.map else {
        ui.weak("No coordinates to show.");
        return;
    };
    let n = map.bins.len();
    let palette: Vec<Color32> = if n > 1 {
        (0..n).map(|i| blues(i as f64 / (n - 1) as f64)).collect()
    } else {
        generate_palette(1)
    };

    Plot::new("location_map")
        .height(CHART_HEIGHT * 1.5)
        .data_aspect(1.0)
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            for (cat, label) in map.bins.labels.iter().enumerate() {
                let pts: PlotPoints = map
                    .points
                    .iter()
                    .filter(|p| p.category == Some(cat))
                    .map(|p| [p.lon, p.lat])
                    .collect();
                plot_ui.points(
                    Points::new(pts)
                        .color(palette[cat])
                        .radius(4.0)
                        .name(label),
                );
            }
        });
}
