use mozart_beolink::volume::{
    overlay_level, relative_level, step_down, step_up, to_fraction, to_percent, MAX_LEVEL,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn step_up_stays_below_maximum(level in 0u8..=100, step in 1u8..=20, max in 20u8..=100) {
        let next = step_up(level, step, max);
        prop_assert!(next <= max);
        if level < max {
            prop_assert!(next > level);
        }
    }

    #[test]
    fn step_down_never_rises(level in 0u8..=100, step in 1u8..=20) {
        let next = step_down(level, step);
        prop_assert!(next <= level);
        if level >= step {
            prop_assert_eq!(next, level - step);
        } else {
            prop_assert_eq!(next, 0);
        }
    }

    #[test]
    fn relative_level_is_clamped(current in 0.0f64..=1.0, offset in -2.0f64..=2.0) {
        let level = relative_level(current, offset);
        prop_assert!((0.0..=1.0).contains(&level));
        if (0.0..=1.0).contains(&(current + offset)) {
            prop_assert!((level - (current + offset)).abs() < 1e-12);
        }
    }

    #[test]
    fn percent_round_trips(level in 0u8..=100) {
        prop_assert_eq!(to_percent(to_fraction(level)), level);
    }

    #[test]
    fn percent_is_bounded(fraction in -1.0f64..=2.0) {
        prop_assert!(to_percent(fraction) <= MAX_LEVEL);
    }

    #[test]
    fn overlay_offset_is_capped(current in 0u8..=100, offset in 0u8..=100) {
        let level = overlay_level(current, offset);
        prop_assert!(level <= MAX_LEVEL);
        prop_assert!(level >= current);
    }
}

#[test]
fn step_down_ignores_configured_maximum() {
    // A level above the configured maximum only comes down by one step
    assert_eq!(step_down(95, 5), 90);
    assert_eq!(step_up(95, 5, 80), 80);
}
