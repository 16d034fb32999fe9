use crate::color::Color;
use crate::frame::Frame;
use crate::frame::ZoneId;
use crate::source::Delay;
use crate::source::GeneratorSource;

/// Phase advance per zone
const PHASE_STEP: f64 = 0.1;

/// Endless sine wave running over the zones.
///
/// Each channel follows `sin(phase + offset)`, with the green and blue channels
/// shifted by 2 and 4 radians. The phase advances once per zone, so neighbouring
/// zones are slightly out of step.
#[derive(Debug, Clone)]
pub struct Wave {
    zones: Vec<ZoneId>,
    phase: f64,
}

impl Wave {
    pub fn new(zones: Vec<ZoneId>) -> Self {
        Self { zones, phase: 0.0 }
    }

    fn channel(phase: f64) -> u8 {
        ((phase.sin() * 127.0).floor() + 128.0) as u8
    }

    fn color(phase: f64) -> Color {
        Color::from_rgb(
            Self::channel(phase),
            Self::channel(phase + 2.0),
            Self::channel(phase + 4.0),
        )
    }
}

impl Iterator for Wave {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let mut frame = Frame::new();
        for zone in &self.zones {
            frame = frame.with_zone(zone.clone(), Self::color(self.phase));
            self.phase += PHASE_STEP;
        }
        Some(frame)
    }
}

pub fn source(zones: Vec<ZoneId>, delay: Delay) -> GeneratorSource {
    GeneratorSource::new(Wave::new(zones), delay)
}
