//! Volume arithmetic shared by the media player and the overlay service
//!
//! Device levels are percentages (0-100), entity levels are fractions (0.0-1.0).

/// Upper bound of a device volume level
pub const MAX_LEVEL: u8 = 100;

/// One step up, never above the configured maximum
pub fn step_up(level: u8, step: u8, max_volume: u8) -> u8 {
    level.saturating_add(step).min(max_volume)
}

/// One step down, never below zero
///
/// The configured maximum is deliberately not applied here.
pub fn step_down(level: u8, step: u8) -> u8 {
    level.saturating_sub(step)
}

/// Current fraction moved by `offset`, kept within `[0.0, 1.0]`
pub fn relative_level(current: f64, offset: f64) -> f64 {
    let target = current + offset;
    if target.is_nan() {
        return current.clamp(0.0, 1.0);
    }
    target.clamp(0.0, 1.0)
}

/// Fraction to device percentage
pub fn to_percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, f64::from(MAX_LEVEL)) as u8
}

/// Device percentage to fraction
pub fn to_fraction(level: u8) -> f64 {
    f64::from(level) / 100.0
}

/// Overlay level for an offset on top of the current level, capped at 100
pub fn overlay_level(current: u8, offset: u8) -> u8 {
    current.saturating_add(offset).min(MAX_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_up_respects_maximum() {
        assert_eq!(step_up(40, 5, 100), 45);
        assert_eq!(step_up(78, 5, 80), 80);
        assert_eq!(step_up(80, 5, 80), 80);
    }

    #[test]
    fn test_step_down_ignores_maximum() {
        assert_eq!(step_down(95, 5), 90);
        assert_eq!(step_down(3, 5), 0);
    }

    #[test]
    fn test_relative_level_clamps() {
        assert_eq!(relative_level(0.9, 0.5), 1.0);
        assert_eq!(relative_level(0.1, -0.5), 0.0);
        assert!((relative_level(0.3, 0.1) - 0.4).abs() < 1e-9);
        assert_eq!(relative_level(0.5, f64::INFINITY), 1.0);
        assert_eq!(relative_level(0.5, f64::NAN), 0.5);
    }

    #[test]
    fn test_percent_conversion() {
        assert_eq!(to_percent(0.29), 29);
        assert_eq!(to_percent(1.5), 100);
        assert_eq!(to_percent(-0.2), 0);
        assert_eq!(to_fraction(45), 0.45);
    }

    #[test]
    fn test_overlay_level_capped() {
        assert_eq!(overlay_level(90, 20), 100);
        assert_eq!(overlay_level(30, 20), 50);
    }
}
