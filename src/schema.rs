//! Dashboard schema descriptors.
//!
//! One descriptor per dataset variant names the columns a file must carry,
//! which column plays which role in the summaries, and which filter
//! controls the side panel shows. Both built-in variants can be replaced
//! from the config file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Initial state of a multi-select control. Either way an empty selection
/// filters nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSelection {
    #[default]
    Empty,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    MultiSelect {
        #[serde(default)]
        initial: InitialSelection,
    },
    Range {
        step: f64,
        /// Start the slider at zero instead of the column minimum.
        #[serde(default)]
        from_zero: bool,
    },
    DateRange,
}

/// One side-panel filter widget bound to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterControl {
    pub column: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ControlKind,
    /// Skip the control when the file lacks the column instead of failing.
    #[serde(default)]
    pub optional: bool,
}

impl FilterControl {
    fn multi(column: &str, label: &str, initial: InitialSelection) -> Self {
        FilterControl {
            column: column.to_string(),
            label: label.to_string(),
            kind: ControlKind::MultiSelect { initial },
            optional: false,
        }
    }

    fn range(column: &str, label: &str, step: f64) -> Self {
        FilterControl {
            column: column.to_string(),
            label: label.to_string(),
            kind: ControlKind::Range {
                step,
                from_zero: false,
            },
            optional: false,
        }
    }

    fn from_zero(mut self) -> Self {
        if let ControlKind::Range { from_zero, .. } = &mut self.kind {
            *from_zero = true;
        }
        self
    }
}

/// Which column plays which part in the summaries and charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    /// Grouping key for every per-location aggregate.
    pub location: String,
    pub price: String,
    /// Area used for price-per-area ratios and the scatter x axis.
    pub area: String,
    pub area_unit: String,
    #[serde(default)]
    pub build_area: Option<String>,
    /// Per-row ratio column shown as a histogram.
    pub ratio: String,
    /// Per-row price-per-area column used to colour the map.
    #[serde(default)]
    pub price_per_area: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub id: String,
    pub title: String,
    /// Plural noun for the rows: "Listings", "Plots".
    pub item_label: String,
    pub source: PathBuf,
    pub export_file_name: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub required_columns: Vec<String>,
    pub roles: ColumnRoles,
    pub controls: Vec<FilterControl>,
    pub table_columns: Vec<String>,
}

fn default_currency() -> String {
    "₹".to_string()
}

fn strings(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

pub const PROPERTY_COLUMNS: [&str; 12] = [
    "Plot__url",
    "Plot__Price",
    "Plot__Beds",
    "Build__Area",
    "Plot__Area",
    "Plot__DESC",
    "Plot__Area_Cents",
    "Price_per_sqft",
    "Price_per_cent",
    "Total_Area",
    "Build_to_Plot_Ratio",
    "Standardized_Location_Name",
];

/// Optional listing-date column of the property table.
pub const LISTING_DATE: &str = "Listing_Date";

pub const PLOT_COLUMNS: [&str; 16] = [
    "Url",
    "Price",
    "Area",
    "Price per cent",
    "Location",
    "Latitude",
    "Longitude",
    "distance_to_technopark",
    "distance_to_agasthyamalai_hills",
    "distance_to_ponmudi_hills",
    "distance_to_nearest_beach",
    "distance_to_nearest_lake",
    "density",
    "price_to_price_per_cent_ratio",
    "beach_proximity",
    "lake_proximity",
];

pub const DISTANCE_COLUMNS: [&str; 5] = [
    "distance_to_technopark",
    "distance_to_agasthyamalai_hills",
    "distance_to_ponmudi_hills",
    "distance_to_nearest_beach",
    "distance_to_nearest_lake",
];

/// `distance_to_nearest_beach` → `Distance To Nearest Beach`
pub fn title_case(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl SchemaDescriptor {
    /// Property listings: price, bedrooms, plot and build area.
    pub fn property() -> Self {
        SchemaDescriptor {
            id: "property".to_string(),
            title: "Property Data Dashboard".to_string(),
            item_label: "Listings".to_string(),
            source: PathBuf::from("Updated_Cleaned_Dataset.csv"),
            export_file_name: "filtered_property_data.csv".to_string(),
            currency: default_currency(),
            required_columns: strings(&PROPERTY_COLUMNS),
            roles: ColumnRoles {
                location: "Standardized_Location_Name".to_string(),
                price: "Plot__Price".to_string(),
                area: "Plot__Area_Cents".to_string(),
                area_unit: "cents".to_string(),
                build_area: Some("Build__Area".to_string()),
                ratio: "Build_to_Plot_Ratio".to_string(),
                price_per_area: Some("Price_per_cent".to_string()),
                latitude: None,
                longitude: None,
                url: Some("Plot__url".to_string()),
                description: Some("Plot__DESC".to_string()),
            },
            controls: vec![
                FilterControl::multi(
                    "Standardized_Location_Name",
                    "Location(s)",
                    InitialSelection::Empty,
                ),
                FilterControl::multi("Plot__Beds", "Number of Bedrooms", InitialSelection::All),
                FilterControl::range("Plot__Price", "Price Range (₹)", 10_000.0),
                FilterControl::range("Plot__Area_Cents", "Plot Area (Cents)", 0.1),
                FilterControl::range("Build__Area", "Build Area (sqft)", 50.0),
                FilterControl::range("Build_to_Plot_Ratio", "Build-to-Plot Ratio", 0.1).from_zero(),
                FilterControl {
                    column: LISTING_DATE.to_string(),
                    label: "Listing Date".to_string(),
                    kind: ControlKind::DateRange,
                    optional: true,
                },
            ],
            table_columns: strings(&[
                "Standardized_Location_Name",
                "Plot__Price",
                "Plot__Beds",
                "Build__Area",
                "Plot__Area_Cents",
                "Price_per_sqft",
                "Price_per_cent",
                "Build_to_Plot_Ratio",
                "Total_Area",
                "Plot__DESC",
                "Plot__url",
            ]),
        }
    }

    /// Land plots: price, area, coordinates and distances to landmarks.
    pub fn plot() -> Self {
        let mut controls = vec![
            FilterControl::multi("Location", "Location(s)", InitialSelection::Empty),
            FilterControl::multi("density", "Density", InitialSelection::All),
            FilterControl::range("Price", "Price Range (₹)", 10_000.0),
            FilterControl::range("Area", "Area (Cents)", 0.1),
            FilterControl::range("Price per cent", "Price per Cent Range (₹)", 1_000.0),
            FilterControl::range(
                "price_to_price_per_cent_ratio",
                "Price to Price per Cent Ratio",
                0.1,
            )
            .from_zero(),
        ];
        controls.extend(DISTANCE_COLUMNS.iter().map(|col| {
            FilterControl::range(col, &format!("{} (km)", title_case(col)), 1.0)
        }));

        SchemaDescriptor {
            id: "plot".to_string(),
            title: "Plot Data Dashboard".to_string(),
            item_label: "Plots".to_string(),
            source: PathBuf::from("standardized_locations_dataset.csv"),
            export_file_name: "filtered_plot_data.csv".to_string(),
            currency: default_currency(),
            required_columns: strings(&PLOT_COLUMNS),
            roles: ColumnRoles {
                location: "Location".to_string(),
                price: "Price".to_string(),
                area: "Area".to_string(),
                area_unit: "cents".to_string(),
                build_area: None,
                ratio: "price_to_price_per_cent_ratio".to_string(),
                price_per_area: Some("Price per cent".to_string()),
                latitude: Some("Latitude".to_string()),
                longitude: Some("Longitude".to_string()),
                url: Some("Url".to_string()),
                description: None,
            },
            controls,
            table_columns: strings(&[
                "Location",
                "Price",
                "Area",
                "Price per cent",
                "density",
                "price_to_price_per_cent_ratio",
                "beach_proximity",
                "lake_proximity",
                "Url",
            ]),
        }
    }

    /// Built-in variants in navigation order.
    pub fn builtin() -> Vec<Self> {
        vec![Self::property(), Self::plot()]
    }

    /// Whether both coordinates are mapped, enabling the geo view.
    pub fn has_map(&self) -> bool {
        self.roles.latitude.is_some() && self.roles.longitude.is_some()
    }

    /// Every non-optional column the roles, controls and table refer to must
    /// be listed as required, otherwise a file could load and then fail
    /// mid-recompute.
    pub fn validate(&self) -> Result<()> {
        let required: BTreeSet<&str> = self.required_columns.iter().map(String::as_str).collect();
        let roles = &self.roles;
        let mut referenced: Vec<&str> = vec![
            &roles.location,
            &roles.price,
            &roles.area,
            &roles.ratio,
        ]
        .into_iter()
        .map(String::as_str)
        .collect();
        referenced.extend(
            [
                &roles.build_area,
                &roles.price_per_area,
                &roles.latitude,
                &roles.longitude,
                &roles.url,
                &roles.description,
            ]
            .into_iter()
            .filter_map(|c| c.as_deref()),
        );
        referenced.extend(
            self.controls
                .iter()
                .filter(|c| !c.optional)
                .map(|c| c.column.as_str()),
        );
        referenced.extend(self.table_columns.iter().map(String::as_str));

        let unlisted: Vec<&str> = referenced
            .into_iter()
            .filter(|c| !required.contains(c))
            .collect();
        if !unlisted.is_empty() {
            bail!(
                "dashboard '{}' refers to columns not listed as required: {}",
                self.id,
                unlisted.join(", ")
            );
        }

        for control in &self.controls {
            if let ControlKind::Range { step, .. } = control.kind {
                if !(step > 0.0) {
                    bail!(
                        "dashboard '{}': range control '{}' needs a positive step",
                        self.id,
                        control.column
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_descriptors_are_consistent() {
        for descriptor in SchemaDescriptor::builtin() {
            descriptor.validate().unwrap();
        }
    }

    #[test]
    fn builtin_column_counts() {
        assert_eq!(SchemaDescriptor::property().required_columns.len(), 12);
        assert_eq!(SchemaDescriptor::plot().required_columns.len(), 16);
        assert!(SchemaDescriptor::plot().has_map());
        assert!(!SchemaDescriptor::property().has_map());
    }

    #[test]
    fn unlisted_role_column_is_rejected() {
        let mut d = SchemaDescriptor::plot();
        d.roles.price = "Asking Price".to_string();
        let err = d.validate().unwrap_err().to_string();
        assert!(err.contains("Asking Price"), "{err}");
    }

    #[test]
    fn optional_controls_need_not_be_required() {
        let d = SchemaDescriptor::property();
        assert!(!d.required_columns.iter().any(|c| c == LISTING_DATE));
        d.validate().unwrap();
    }

    #[test]
    fn title_case_distance_labels() {
        assert_eq!(
            title_case("distance_to_nearest_beach"),
            "Distance To Nearest Beach"
        );
    }

    #[test]
    fn descriptor_round_trips_through_toml() {
        let d = SchemaDescriptor::plot();
        let text = toml::to_string(&d).unwrap();
        let back: SchemaDescriptor = toml::from_str(&text).unwrap();
        assert_eq!(back, d);
    }
}
