use std::collections::BTreeMap;

use crate::color::Color;

/// Independently addressable lighting region, e.g. `"1"` to `"4"` on the keyboard.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for ZoneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ZoneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// LED mode tag passed through to the executable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Mode(String);

impl Mode {
    pub const STATIC: &'static str = "static";

    pub fn new(mode: impl Into<String>) -> Self {
        Self(mode.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::new(Self::STATIC)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ZoneState {
    pub color: Color,

    #[serde(default)]
    pub mode: Mode,
}

impl ZoneState {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            mode: Mode::default(),
        }
    }
}

/// One complete set of per-zone assignments, applied in a single tick.
///
/// Zones are kept in key order; applying a frame visits exactly the zones present.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Frame {
    zones: BTreeMap<ZoneId, ZoneState>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame with every zone in `zones` set to `color` in static mode
    pub fn uniform<'a>(zones: impl IntoIterator<Item = &'a ZoneId>, color: Color) -> Self {
        zones
            .into_iter()
            .map(|zone| (zone.clone(), ZoneState::new(color)))
            .collect()
    }

    pub fn with_zone(mut self, zone: impl Into<ZoneId>, color: Color) -> Self {
        self.zones.insert(zone.into(), ZoneState::new(color));
        self
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneState> {
        self.zones.get(zone)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// `self` with every zone of `overlay` replacing or adding to it
    pub fn merged(&self, overlay: &Frame) -> Frame {
        let mut zones = self.zones.clone();
        zones.extend(overlay.zones.iter().map(|(z, s)| (z.clone(), s.clone())));
        Frame { zones }
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        for (zone, state) in &self.zones {
            if zone.as_str().is_empty() {
                return Err(FrameError::EmptyZoneId);
            }

            if !state.color.is_valid() {
                return Err(FrameError::ColorOutOfRange {
                    zone: zone.clone(),
                    color: state.color.packed(),
                });
            }

            if state.mode.as_str().is_empty() {
                return Err(FrameError::EmptyMode { zone: zone.clone() });
            }
        }

        Ok(())
    }
}

impl FromIterator<(ZoneId, ZoneState)> for Frame {
    fn from_iter<T: IntoIterator<Item = (ZoneId, ZoneState)>>(iter: T) -> Self {
        Self {
            zones: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Frame {
    type Item = (&'a ZoneId, &'a ZoneState);
    type IntoIter = std::collections::btree_map::Iter<'a, ZoneId, ZoneState>;

    fn into_iter(self) -> Self::IntoIter {
        self.zones.iter()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Zone identifier must not be empty")]
    EmptyZoneId,

    #[error("Color {color:#x} for zone {zone} is out of range")]
    ColorOutOfRange { zone: ZoneId, color: u32 },

    #[error("No mode specified for zone {zone}")]
    EmptyMode { zone: ZoneId },
}
