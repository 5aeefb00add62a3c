use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use realty_lens::config::Settings;
use realty_lens::dashboard::{control_domains, ControlDomain, ControlState, Domain, Snapshot};
use realty_lens::data::export;
use realty_lens::data::filter::{DateInterval, Interval};
use realty_lens::data::model::{Dataset, Value};
use realty_lens::data::store::RecordStore;
use realty_lens::schema::SchemaDescriptor;
use realty_lens::SchemaError;

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Per-dashboard state
// ---------------------------------------------------------------------------

/// One dashboard page: its schema, loaded table and widget values.
pub struct DashboardState {
    pub descriptor: SchemaDescriptor,

    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Arc<Dataset>>,

    /// Control domains from the full dataset.
    pub domains: Vec<ControlDomain>,

    /// Current widget values.
    pub controls: ControlState,

    /// Result of the last recomputation.
    pub snapshot: Option<Snapshot>,

    /// Location → colour, shared by every chart.
    pub color_map: Option<ColorMap>,

    /// Whether a load was attempted, so a failing file is not retried
    /// every frame.
    pub attempted: bool,
}

impl DashboardState {
    fn new(descriptor: SchemaDescriptor) -> Self {
        Self {
            descriptor,
            dataset: None,
            domains: Vec::new(),
            controls: ControlState::default(),
            snapshot: None,
            color_map: None,
            attempted: false,
        }
    }

    /// Domain of the control bound to `column`.
    pub fn domain(&self, column: &str) -> Option<&Domain> {
        self.domains
            .iter()
            .find(|cd| cd.control.column == column)
            .map(|cd| &cd.domain)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,
    pub dashboards: Vec<DashboardState>,
    /// Index of the dashboard on screen.
    pub active: usize,
    pub store: RecordStore,
    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings, active: usize) -> Self {
        let dashboards = settings
            .dashboards
            .iter()
            .cloned()
            .map(DashboardState::new)
            .collect::<Vec<_>>();
        let active = active.min(dashboards.len().saturating_sub(1));
        Self {
            settings,
            dashboards,
            active,
            store: RecordStore::new(),
            status_message: None,
        }
    }

    pub fn active(&self) -> &DashboardState {
        &self.dashboards[self.active]
    }

    fn active_mut(&mut self) -> &mut DashboardState {
        &mut self.dashboards[self.active]
    }

    /// Switch pages, loading the page's source file on first visit.
    pub fn switch_to(&mut self, index: usize) {
        if index < self.dashboards.len() && index != self.active {
            self.active = index;
            self.status_message = None;
        }
        self.ensure_loaded();
    }

    /// Load the active dashboard's configured source once.
    pub fn ensure_loaded(&mut self) {
        if self.active().attempted {
            return;
        }
        let source = self.active().descriptor.source.clone();
        self.load_path(&source);
    }

    /// Load a file into the active dashboard and remember it as its source.
    pub fn open_file(&mut self, path: PathBuf) {
        self.active_mut().descriptor.source = path.clone();
        self.load_path(&path);
    }

    /// Drop the cached copy and read the active source again.
    pub fn reload(&mut self) {
        let source = self.active().descriptor.source.clone();
        self.store.invalidate(&source);
        self.load_path(&source);
    }

    /// Empty the cache and reload every page: the active one now, the
    /// others on their next visit.
    pub fn reload_all(&mut self) {
        self.store.clear();
        for page in &mut self.dashboards {
            page.attempted = false;
        }
        self.ensure_loaded();
    }

    fn load_path(&mut self, path: &Path) {
        self.active_mut().attempted = true;
        let required = self.active().descriptor.required_columns.clone();
        match self.store.load(path, &required) {
            Ok(dataset) => {
                log::info!(
                    "{}: {} rows from {}",
                    self.active().descriptor.id,
                    dataset.len(),
                    path.display()
                );
                self.status_message = None;
                if let Err(e) = self.set_dataset(dataset) {
                    log::error!("Failed to prepare dashboard: {e:#}");
                    self.status_message = Some(format!("Error: {e:#}"));
                }
            }
            Err(e) => {
                let title = self.active().descriptor.title.clone();
                let message = match e.downcast_ref::<SchemaError>() {
                    Some(schema) => format!("{title} - {schema}"),
                    None => format!("Error: {e:#}"),
                };
                log::error!("Failed to load {}: {e:#}", path.display());
                let page = self.active_mut();
                page.dataset = None;
                page.snapshot = None;
                self.status_message = Some(message);
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise controls and colours.
    fn set_dataset(&mut self, dataset: Arc<Dataset>) -> Result<()> {
        let page = self.active_mut();
        page.domains = control_domains(&page.descriptor, &dataset)?;
        page.controls = ControlState::init(&page.domains);
        let locations = dataset.distinct_values(&page.descriptor.roles.location)?;
        page.color_map = Some(ColorMap::new(&locations));
        page.dataset = Some(dataset);
        self.refresh();
        Ok(())
    }

    /// Recompute the active snapshot after a control change.
    pub fn refresh(&mut self) {
        let settings = self.settings.clone();
        let page = self.active_mut();
        let Some(dataset) = page.dataset.clone() else {
            page.snapshot = None;
            return;
        };
        let started = Instant::now();
        match Snapshot::compute(&page.descriptor, &dataset, &page.controls, &settings) {
            Ok(snapshot) => {
                log::debug!(
                    "{} recomputed in {:?}",
                    page.descriptor.id,
                    started.elapsed()
                );
                page.snapshot = Some(snapshot);
            }
            Err(e) => {
                log::error!("Recompute failed: {e}");
                page.snapshot = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) {
        self.active_mut().controls.toggle(column, value);
        self.refresh();
    }

    /// Select every value of a column.
    pub fn select_all(&mut self, column: &str) {
        let page = self.active_mut();
        if let Some(Domain::Values(all)) = page.domain(column).cloned() {
            page.controls.selections.insert(column.to_string(), all);
            self.refresh();
        }
    }

    /// Clear a column's selection, which lifts its constraint.
    pub fn select_none(&mut self, column: &str) {
        self.active_mut()
            .controls
            .selections
            .insert(column.to_string(), BTreeSet::new());
        self.refresh();
    }

    pub fn set_range(&mut self, column: &str, lo: f64, hi: f64) {
        match Interval::new(lo.min(hi), hi.max(lo)) {
            Ok(iv) => {
                self.active_mut().controls.ranges.insert(column.to_string(), iv);
                self.refresh();
            }
            Err(e) => log::warn!("Ignoring range for {column}: {e}"),
        }
    }

    pub fn set_dates(&mut self, column: &str, start: NaiveDate, end: NaiveDate) {
        let iv = DateInterval::from_bounds((start.min(end), end.max(start)));
        self.active_mut().controls.dates.insert(column.to_string(), iv);
        self.refresh();
    }

    /// Put every control back to its initial value.
    pub fn reset_filters(&mut self) {
        let page = self.active_mut();
        page.controls = ControlState::init(&page.domains);
        self.refresh();
    }

    /// CSV bytes of the active dashboard's filtered rows.
    pub fn export_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = self
            .active()
            .snapshot
            .as_ref()
            .context("no data loaded to export")?;
        Ok(snapshot.export()?)
    }

    pub fn export_to(&mut self, path: &Path) {
        match self.export_bytes().and_then(|bytes| export::write_file(path, &bytes)) {
            Ok(()) => self.status_message = Some(format!("Exported to {}", path.display())),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_csv(dir: &tempfile::TempDir) -> PathBuf {
        let header = realty_lens::schema::PLOT_COLUMNS.join(",");
        let rows = [
            "u1,100000,10,10000,Kowdiar,8.5,76.9,1,2,3,4,5,high,10,near,far",
            "u2,300000,20,15000,Kowdiar,8.51,76.91,1,2,3,4,5,low,20,near,far",
            "u3,500000,10,50000,Vazhuthacaud,8.49,76.95,2,3,4,5,6,high,10,far,near",
        ];
        let path = dir.path().join("plots.csv");
        std::fs::write(&path, format!("{header}\n{}\n", rows.join("\n"))).unwrap();
        path
    }

    fn plot_state() -> AppState {
        let settings = Settings::default();
        let plot = settings.position("plot").unwrap();
        AppState::new(settings, plot)
    }

    #[test]
    fn opening_a_file_computes_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = plot_state();
        state.open_file(plot_csv(&dir));
        let snap = state.active().snapshot.as_ref().expect("snapshot");
        assert_eq!(snap.filtered.len(), 3);
        assert!(state.status_message.is_none());
    }

    #[test]
    fn schema_error_is_reported_and_page_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.csv");
        std::fs::write(&path, "Location,Price\nA,1\n").unwrap();
        let mut state = plot_state();
        state.open_file(path);
        assert!(state.active().dataset.is_none());
        let msg = state.status_message.clone().unwrap();
        assert!(msg.starts_with("Plot Data Dashboard - missing required columns"), "{msg}");
    }

    #[test]
    fn toggling_location_filters_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = plot_state();
        state.open_file(plot_csv(&dir));
        state.toggle_filter_value("Location", &Value::from("Vazhuthacaud"));
        let snap = state.active().snapshot.as_ref().unwrap();
        assert_eq!(snap.filtered.len(), 1);
        assert!(snap.show_listings);

        state.select_none("Location");
        assert_eq!(state.active().snapshot.as_ref().unwrap().filtered.len(), 3);
    }

    #[test]
    fn deselecting_every_density_lifts_the_constraint() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = plot_state();
        state.open_file(plot_csv(&dir));
        state.select_none("density");
        assert_eq!(state.active().snapshot.as_ref().unwrap().filtered.len(), 3);
    }

    #[test]
    fn range_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = plot_state();
        state.open_file(plot_csv(&dir));
        state.set_range("Price", 150_000.0, 500_000.0);
        assert_eq!(state.active().snapshot.as_ref().unwrap().filtered.len(), 2);
        state.reset_filters();
        assert_eq!(state.active().snapshot.as_ref().unwrap().filtered.len(), 3);
    }

    #[test]
    fn export_writes_filtered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = plot_state();
        state.open_file(plot_csv(&dir));
        state.set_range("Price", 400_000.0, 500_000.0);
        let out = dir.path().join("filtered_plot_data.csv");
        state.export_to(&out);
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Vazhuthacaud"));
    }

    #[test]
    fn export_without_data_fails() {
        let state = plot_state();
        assert!(state.export_bytes().is_err());
    }

    #[test]
    fn reload_all_rereads_the_active_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = plot_csv(&dir);
        let mut state = plot_state();
        state.open_file(path.clone());
        assert_eq!(state.store.len(), 1);

        let text = std::fs::read_to_string(&path).unwrap();
        let first_two: Vec<&str> = text.lines().take(2).collect();
        std::fs::write(&path, format!("{}\n", first_two.join("\n"))).unwrap();

        state.reload_all();
        assert_eq!(state.store.len(), 1);
        assert_eq!(state.active().snapshot.as_ref().unwrap().filtered.len(), 1);
        assert!(state.dashboards.iter().enumerate().all(|(i, d)| i == state.active || !d.attempted));
    }
}
