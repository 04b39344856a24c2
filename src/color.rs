use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Marker colour for the highlighted species.
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(0xA7, 0xC7, 0xE7);

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.6, 0.4);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: common name → Color32
// ---------------------------------------------------------------------------

/// Maps each species' common name to a distinct marker colour.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map over the table's unique common names.
    pub fn new(common_names: &[String]) -> Self {
        let palette = generate_palette(common_names.len());
        let mapping: BTreeMap<String, Color32> = common_names
            .iter()
            .cloned()
            .zip(palette.into_iter())
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::DARK_GREEN,
        }
    }

    /// Look up the marker colour for a species.
    pub fn color_for(&self, common_name: &str) -> Color32 {
        self.mapping
            .get(common_name)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colors() {
        let palette = generate_palette(12);
        assert_eq!(palette.len(), 12);
        for pair in palette.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn unknown_species_gets_the_default_color() {
        let map = ColorMap::new(&["MAPLE".to_string()]);
        assert_eq!(map.color_for("NOT THERE"), Color32::DARK_GREEN);
        assert_ne!(map.color_for("MAPLE"), Color32::DARK_GREEN);
    }
}
