use eframe::egui::Color32;
use palette::Srgb;

// ---------------------------------------------------------------------------
// Qualitative palette for comparison lines
// ---------------------------------------------------------------------------

/// ColorBrewer "Set1".
pub const SET1: [&str; 9] = [
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#ffff33", "#a65628", "#f781bf",
    "#999999",
];

/// Line colour of the single-course charts.
pub const EVOLUTION_LINE: Color32 = Color32::from_rgb(0x1f, 0x77, 0xb4);

/// Colour of the forecast cutoff marker.
pub const CUTOFF_MARKER: Color32 = Color32::from_rgba_premultiplied(128, 128, 128, 128);

fn parse_hex(hex: &str) -> Option<Color32> {
    match hex.parse::<Srgb<u8>>() {
        Ok(rgb) => Some(Color32::from_rgb(rgb.red, rgb.green, rgb.blue)),
        Err(e) => {
            log::warn!("Ignoring palette colour {hex}: {e}");
            None
        }
    }
}

/// Fixed palette reused cyclically by draw position.
#[derive(Debug, Clone)]
pub struct SeriesPalette {
    colors: Vec<Color32>,
}

impl SeriesPalette {
    /// Build from hex strings; unparsable entries are dropped.
    pub fn from_hex(hex: &[&str]) -> Self {
        let colors = hex.iter().filter_map(|h| parse_hex(h)).collect();
        SeriesPalette { colors }
    }

    /// Colour of the `position`-th drawn course.
    pub fn color_for(&self, position: usize) -> Color32 {
        if self.colors.is_empty() {
            return Color32::GRAY;
        }
        self.colors[position % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for SeriesPalette {
    fn default() -> Self {
        Self::from_hex(&SET1)
    }
}
