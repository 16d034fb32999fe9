use crate::color::Color;
use crate::frame::Frame;
use crate::frame::ZoneId;
use crate::source::Delay;
use crate::source::FunctionSource;
use crate::source::Tick;

/// Hue advance per tick
const HUE_STEP: f32 = 0.01;

/// Fully saturated color for `hue`, which wraps onto `[0, 1)` first
fn hsv_to_rgb(hue: f32) -> Color {
    let h = hue.rem_euclid(1.0);
    let c = 1.0;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());

    // rem_euclid can round up to exactly 1.0 for tiny negative hues
    let (r, g, b) = match ((h * 6.0) as u32).min(5) {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Color::from_rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// Rainbow frame for `tick`, zones spread evenly over the hue circle
pub fn frame(zones: &[ZoneId], tick: Tick) -> Frame {
    let base = (tick % 100) as f32 * HUE_STEP;
    let spread = 1.0 / zones.len().max(1) as f32;

    zones
        .iter()
        .enumerate()
        .fold(Frame::new(), |frame, (idx, zone)| {
            let hue = (base + idx as f32 * spread) % 1.0;
            frame.with_zone(zone.clone(), hsv_to_rgb(hue))
        })
}

pub fn source(zones: Vec<ZoneId>, delay: Delay) -> FunctionSource {
    FunctionSource::new(move |tick| frame(&zones, tick), delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::keyboard_zones;

    #[test]
    fn test_primary_hues() {
        assert_eq!(hsv_to_rgb(0.0), Color::new(0xff0000));
        assert_eq!(hsv_to_rgb(1.0 / 3.0), Color::from_rgb(0, 0xff, 0));
        assert_eq!(hsv_to_rgb(2.0 / 3.0), Color::from_rgb(0, 0, 0xff));
    }

    #[test]
    fn test_hue_wraps_around() {
        assert_eq!(hsv_to_rgb(-0.25), hsv_to_rgb(0.75));
        assert_eq!(hsv_to_rgb(1.5), hsv_to_rgb(0.5));
        assert_ne!(hsv_to_rgb(0.999), Color::new(0));
        assert_ne!(hsv_to_rgb(-f32::EPSILON / 4.0), Color::new(0));
    }

    #[test]
    fn test_frame_covers_all_zones() {
        let zones = keyboard_zones();
        let frame = frame(&zones, 3);
        assert_eq!(frame.len(), 4);
        assert!((&frame).into_iter().all(|(_, state)| state.color.is_valid()));
    }

    #[test]
    fn test_repeats_every_hundred_ticks() {
        let zones = keyboard_zones();
        assert_eq!(frame(&zones, 7), frame(&zones, 107));
        assert_ne!(frame(&zones, 7), frame(&zones, 8));
    }

    #[test]
    fn test_zones_are_spread() {
        let zones = keyboard_zones();
        let frame = frame(&zones, 0);
        assert_eq!(frame.get("1").unwrap().color, Color::new(0xff0000));
        assert_ne!(frame.get("1"), frame.get("3"));
    }
}
