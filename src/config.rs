//! Settings loading.
//!
//! Priority order for every value:
//! 1. Command-line argument (applied by the binary)
//! 2. TOML config file
//! 3. Compiled default

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::compare::{DEFAULT_BOTTOM_N, DEFAULT_TOP_N};
use crate::schema::SchemaDescriptor;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Groups ranked highest by average price in the comparison chart.
    pub top_n: usize,
    pub bottom_n: usize,
    pub histogram_bins: usize,
    /// Dashboard variants; replaces the built-ins when present.
    pub dashboards: Vec<SchemaDescriptor>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            top_n: DEFAULT_TOP_N,
            bottom_n: DEFAULT_BOTTOM_N,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            dashboards: SchemaDescriptor::builtin(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).context("parsing config TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let settings = Self::from_toml_str(&text)
            .with_context(|| format!("in config file {}", path.display()))?;
        log::info!(
            "Loaded config from {} ({} dashboards)",
            path.display(),
            settings.dashboards.len()
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dashboards.is_empty() {
            bail!("at least one dashboard must be configured");
        }
        if self.histogram_bins == 0 {
            bail!("histogram_bins must be at least 1");
        }
        let mut ids: Vec<&str> = Vec::new();
        for d in &self.dashboards {
            d.validate()?;
            if ids.contains(&d.id.as_str()) {
                bail!("duplicate dashboard id '{}'", d.id);
            }
            ids.push(&d.id);
        }
        Ok(())
    }

    /// Point dashboard `id` at a different source file.
    pub fn set_source(&mut self, id: &str, path: PathBuf) -> Result<()> {
        match self.dashboards.iter_mut().find(|d| d.id == id) {
            Some(d) => {
                d.source = path;
                Ok(())
            }
            None => bail!("no dashboard with id '{id}'"),
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.dashboards.iter().position(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let s = Settings::from_toml_str("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.dashboards.len(), 2);
    }

    #[test]
    fn scalar_overrides_keep_builtin_dashboards() {
        let s = Settings::from_toml_str("top_n = 3\nhistogram_bins = 10\n").unwrap();
        assert_eq!(s.top_n, 3);
        assert_eq!(s.bottom_n, DEFAULT_BOTTOM_N);
        assert_eq!(s.histogram_bins, 10);
        assert_eq!(s.position("plot"), Some(1));
    }

    #[test]
    fn custom_dashboard_is_parsed() {
        let text = r#"
[[dashboards]]
id = "land"
title = "Land"
item_label = "Plots"
source = "land.csv"
export_file_name = "filtered_land.csv"
required_columns = ["Town", "Cost", "Cents", "Ratio"]
table_columns = ["Town", "Cost"]

[dashboards.roles]
location = "Town"
price = "Cost"
area = "Cents"
area_unit = "cents"
ratio = "Ratio"

[[dashboards.controls]]
column = "Town"
label = "Town(s)"
type = "multi_select"

[[dashboards.controls]]
column = "Cost"
label = "Cost"
type = "range"
step = 100.0
"#;
        let s = Settings::from_toml_str(text).unwrap();
        assert_eq!(s.dashboards.len(), 1);
        let d = &s.dashboards[0];
        assert_eq!(d.currency, "₹");
        assert_eq!(d.controls.len(), 2);
        assert!(!d.has_map());
    }

    #[test]
    fn zero_bins_are_rejected() {
        assert!(Settings::from_toml_str("histogram_bins = 0").is_err());
    }

    #[test]
    fn set_source_unknown_id_fails() {
        let mut s = Settings::default();
        s.set_source("plot", PathBuf::from("x.csv")).unwrap();
        assert_eq!(s.dashboards[1].source, PathBuf::from("x.csv"));
        assert!(s.set_source("nope", PathBuf::from("y.csv")).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("realty-lens.toml");
        std::fs::write(&path, "bottom_n = 2\n").unwrap();
        assert_eq!(Settings::load(&path).unwrap().bottom_n, 2);
        assert!(Settings::load(&dir.path().join("missing.toml")).is_err());
    }
}
