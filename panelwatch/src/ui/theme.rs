//! Shared UI colors.

use ratatui::style::Color;

// Green below 25%, yellow below 60%, red above
pub fn load_color(ratio: f64) -> Color {
    match ratio * 100.0 {
        x if x < 25.0 => Color::Green,
        x if x < 60.0 => Color::Yellow,
        _ => Color::Red,
    }
}
