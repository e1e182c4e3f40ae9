// Colors for the overlay text.
// Audio bars are tinted by level so loud passages stand out; everything else
// uses the configured text color.

use iced::Color;

use crate::settings::parse_color;

/// Gradient stops for audio levels: (level, red, green, blue)
const LEVEL_POINTS: [(f32, u8, u8, u8); 3] = [
    (0.0, 0, 255, 0),   // Quiet - green
    (0.5, 255, 255, 0), // Medium - yellow
    (1.0, 255, 0, 0),   // Loud - red
];

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::from_rgb8(r, g, b)
}

/// Color of an audio bar at `level` (0.0..=1.0), green through yellow to red
pub fn level_color(level: f32) -> Color {
    let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };

    for pair in LEVEL_POINTS.windows(2) {
        let (l1, r1, g1, b1) = pair[0];
        let (l2, r2, g2, b2) = pair[1];
        if level >= l1 && level <= l2 {
            // How far we are between the two stops
            let ratio = (level - l1) / (l2 - l1);
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * ratio).round() as u8;
            return rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2));
        }
    }

    let (_, r, g, b) = LEVEL_POINTS[LEVEL_POINTS.len() - 1];
    rgb(r, g, b)
}

/// The configured text color, white when the value can't be parsed
pub fn text_color(value: &str) -> Color {
    match parse_color(value) {
        Some((r, g, b)) => rgb(r, g, b),
        None => Color::WHITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_gradient_stops() {
        assert_eq!(level_color(0.0), Color::from_rgb8(0, 255, 0));
        assert_eq!(level_color(0.5), Color::from_rgb8(255, 255, 0));
        assert_eq!(level_color(1.0), Color::from_rgb8(255, 0, 0));
        assert_eq!(level_color(3.0), Color::from_rgb8(255, 0, 0));
        assert_eq!(level_color(f32::NAN), Color::from_rgb8(0, 255, 0));
    }

    #[test]
    fn test_level_gradient_midpoints() {
        let quarter = level_color(0.25);
        assert!(quarter.r > 0.45 && quarter.r < 0.55);
        assert_eq!(quarter.g, 1.0);
        let three_quarters = level_color(0.75);
        assert_eq!(three_quarters.r, 1.0);
        assert!(three_quarters.g > 0.45 && three_quarters.g < 0.55);
    }

    #[test]
    fn test_text_color_fallback() {
        assert_eq!(text_color("#ff0000"), Color::from_rgb8(255, 0, 0));
        assert_eq!(text_color("not-a-color"), Color::WHITE);
    }
}
