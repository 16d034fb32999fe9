//! Built-in animations, one per source kind.

pub mod cycle;
pub mod rainbow;
pub mod wave;

use crate::frame::ZoneId;
use crate::manager::Manager;
use crate::source::Delay;
use crate::source::Sequence;
use crate::store::KEYBOARD_ZONES;

use self::cycle::CycleError;

pub fn keyboard_zones() -> Vec<ZoneId> {
    KEYBOARD_ZONES.iter().copied().map(ZoneId::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Hue rotation computed from the tick
    Rainbow,

    /// Endless sine wave
    Wave,

    /// Step through stored configs
    Cycle,
}

impl Program {
    /// Build the frame source for this program.
    ///
    /// `configs` is only read by [`Program::Cycle`].
    pub async fn sequence(
        self,
        manager: &mut Manager,
        configs: &[String],
        delay: Delay,
    ) -> Result<Sequence, CycleError> {
        let sequence = match self {
            Program::Rainbow => Sequence::from(rainbow::source(keyboard_zones(), delay)),
            Program::Wave => Sequence::from(wave::source(keyboard_zones(), delay)),
            Program::Cycle => Sequence::from(cycle::source(manager, configs, delay).await?),
        };
        Ok(sequence)
    }
}
