use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use realty_lens::data::model::Value;

// ---------------------------------------------------------------------------
// Fixed chart colours
// ---------------------------------------------------------------------------

pub const INDIAN_RED: Color32 = Color32::from_rgb(205, 92, 92);
pub const LIGHT_SALMON: Color32 = Color32::from_rgb(255, 160, 122);
pub const DARK_SEA_GREEN: Color32 = Color32::from_rgb(143, 188, 143);
pub const TEAL: Color32 = Color32::from_rgb(0, 128, 128);

/// One colour per comparison metric, in chart order.
pub const COMPARISON_COLORS: [Color32; 3] = [INDIAN_RED, LIGHT_SALMON, DARK_SEA_GREEN];

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Sequential light-to-dark blues for ranking bars by value.
pub fn blues(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let hsl = Hsl::new(210.0, 0.65, 0.85 - 0.55 * t);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color mapping: location value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a chosen column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from a column's distinct values.
    pub fn new(unique_values: &BTreeSet<Value>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &Value) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[2]);
    }

    #[test]
    fn unknown_value_gets_default_colour() {
        let values: BTreeSet<Value> = ["A", "B"].iter().map(|s| Value::from(*s)).collect();
        let cm = ColorMap::new(&values);
        assert_ne!(cm.color_for(&Value::from("A")), cm.color_for(&Value::from("B")));
        assert_eq!(cm.color_for(&Value::from("Z")), Color32::GRAY);
    }

    #[test]
    fn blues_darken_with_value() {
        let light = blues(0.0);
        let dark = blues(1.0);
        assert!(dark.r() < light.r());
    }
}
