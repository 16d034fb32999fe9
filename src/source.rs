//! Frame producers for the animation engine.
//!
//! A [`FrameSource`] is asked for one [`Frame`] per tick. There are three ways of
//! producing them:
//!
//! * [`FunctionSource`]: a function of the tick counter, never ends
//! * [`ArraySource`]: a fixed, non-empty list of frames used as a ring buffer, never ends
//! * [`GeneratorSource`]: an iterator that is advanced once per tick and may run dry
//!
//! [`Sequence`] wraps all three for callers that pick the variant at runtime.

use std::time::Duration;

use crate::frame::Frame;

/// Index of the current iteration of an animation loop, starting at 0.
pub type Tick = u64;

/// Error type a producer may fail with.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Delay must be a non-negative number of milliseconds that fits a duration, got {millis}")]
    InvalidDelay { millis: f64 },

    #[error("A cyclic frame array needs at least one frame")]
    EmptyArray,
}

/// Pause between two ticks of an animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Delay(Duration);

impl Delay {
    pub const ZERO: Delay = Delay(Duration::ZERO);

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl From<Duration> for Delay {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl TryFrom<f64> for Delay {
    type Error = SourceError;

    fn try_from(millis: f64) -> Result<Self, Self::Error> {
        if !millis.is_finite() || millis < 0.0 {
            return Err(SourceError::InvalidDelay { millis });
        }

        Duration::try_from_secs_f64(millis / 1000.0)
            .map(Self)
            .map_err(|_| SourceError::InvalidDelay { millis })
    }
}

impl TryFrom<i64> for Delay {
    type Error = SourceError;

    fn try_from(millis: i64) -> Result<Self, Self::Error> {
        u64::try_from(millis)
            .map(Self::from_millis)
            .map_err(|_| SourceError::InvalidDelay {
                millis: millis as f64,
            })
    }
}

impl<'de> serde::Deserialize<'de> for Delay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let millis = f64::deserialize(deserializer)?;
        Delay::try_from(millis).map_err(serde::de::Error::custom)
    }
}

/// Which of the three producer strategies a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Function,
    Array,
    Generator,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Function => write!(f, "function"),
            SourceKind::Array => write!(f, "array"),
            SourceKind::Generator => write!(f, "generator"),
        }
    }
}

pub trait FrameSource: Send {
    fn kind(&self) -> SourceKind;

    fn delay(&self) -> Delay;

    /// Produce the frame for `tick`.
    ///
    /// `Ok(None)` ends the animation. Only generators ever return it.
    fn produce(&mut self, tick: Tick) -> Result<Option<Frame>, ProducerError>;
}

type FrameFn = Box<dyn FnMut(Tick) -> Result<Frame, ProducerError> + Send>;

pub struct FunctionSource {
    function: FrameFn,
    delay: Delay,
}

impl FunctionSource {
    pub fn new<F>(mut function: F, delay: Delay) -> Self
    where
        F: FnMut(Tick) -> Frame + Send + 'static,
    {
        Self::fallible(move |tick| Ok(function(tick)), delay)
    }

    pub fn fallible<F>(function: F, delay: Delay) -> Self
    where
        F: FnMut(Tick) -> Result<Frame, ProducerError> + Send + 'static,
    {
        Self {
            function: Box::new(function),
            delay,
        }
    }
}

impl std::fmt::Debug for FunctionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSource")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl FrameSource for FunctionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Function
    }

    fn delay(&self) -> Delay {
        self.delay
    }

    fn produce(&mut self, tick: Tick) -> Result<Option<Frame>, ProducerError> {
        (self.function)(tick).map(Some)
    }
}

#[derive(Debug, Clone)]
pub struct ArraySource {
    frames: Vec<Frame>,
    delay: Delay,
}

impl ArraySource {
    pub fn new(frames: Vec<Frame>, delay: Delay) -> Result<Self, SourceError> {
        if frames.is_empty() {
            return Err(SourceError::EmptyArray);
        }

        Ok(Self { frames, delay })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_at(&self, tick: Tick) -> &Frame {
        // len() >= 1, checked in new()
        let idx = tick % self.frames.len() as u64;
        &self.frames[idx as usize]
    }
}

impl FrameSource for ArraySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Array
    }

    fn delay(&self) -> Delay {
        self.delay
    }

    fn produce(&mut self, tick: Tick) -> Result<Option<Frame>, ProducerError> {
        Ok(Some(self.frame_at(tick).clone()))
    }
}

type FrameIter = Box<dyn Iterator<Item = Result<Frame, ProducerError>> + Send>;

pub struct GeneratorSource {
    generator: FrameIter,
    delay: Delay,
}

impl GeneratorSource {
    pub fn new<I>(generator: I, delay: Delay) -> Self
    where
        I: IntoIterator<Item = Frame>,
        I::IntoIter: Send + 'static,
    {
        Self::fallible(generator.into_iter().map(Ok), delay)
    }

    pub fn fallible<I>(generator: I, delay: Delay) -> Self
    where
        I: IntoIterator<Item = Result<Frame, ProducerError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            generator: Box::new(generator.into_iter()),
            delay,
        }
    }
}

impl std::fmt::Debug for GeneratorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSource")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl FrameSource for GeneratorSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Generator
    }

    fn delay(&self) -> Delay {
        self.delay
    }

    fn produce(&mut self, _tick: Tick) -> Result<Option<Frame>, ProducerError> {
        self.generator.next().transpose()
    }
}

/// Any of the three sources, chosen at runtime.
#[derive(Debug)]
pub enum Sequence {
    Function(FunctionSource),
    Array(ArraySource),
    Generator(GeneratorSource),
}

impl Sequence {
    fn inner(&self) -> &dyn FrameSource {
        match self {
            Sequence::Function(s) => s,
            Sequence::Array(s) => s,
            Sequence::Generator(s) => s,
        }
    }
}

impl FrameSource for Sequence {
    fn kind(&self) -> SourceKind {
        self.inner().kind()
    }

    fn delay(&self) -> Delay {
        self.inner().delay()
    }

    fn produce(&mut self, tick: Tick) -> Result<Option<Frame>, ProducerError> {
        match self {
            Sequence::Function(s) => s.produce(tick),
            Sequence::Array(s) => s.produce(tick),
            Sequence::Generator(s) => s.produce(tick),
        }
    }
}

impl From<FunctionSource> for Sequence {
    fn from(value: FunctionSource) -> Self {
        Sequence::Function(value)
    }
}

impl From<ArraySource> for Sequence {
    fn from(value: ArraySource) -> Self {
        Sequence::Array(value)
    }
}

impl From<GeneratorSource> for Sequence {
    fn from(value: GeneratorSource) -> Self {
        Sequence::Generator(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn single(color: u32) -> Frame {
        Frame::new().with_zone("1", Color::new(color))
    }

    #[test]
    fn test_array_is_cyclic() {
        let frames = vec![single(0xff0000), single(0x00ff00), single(0x0000ff)];
        let len = frames.len() as Tick;
        let source = ArraySource::new(frames.clone(), Delay::ZERO).unwrap();

        for tick in 0..50 {
            assert_eq!(source.frame_at(tick), &frames[(tick % len) as usize]);
            assert_eq!(source.frame_at(tick), source.frame_at(tick + len));
        }
    }

    #[test]
    fn test_array_handles_huge_ticks() {
        let source = ArraySource::new(vec![single(1), single(2)], Delay::ZERO).unwrap();
        assert_eq!(source.frame_at(u64::MAX), &single(2));
    }

    #[test]
    fn test_empty_array_is_rejected() {
        let result = ArraySource::new(Vec::new(), Delay::from_millis(10));
        assert!(matches!(result, Err(SourceError::EmptyArray)));
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        assert!(matches!(
            Delay::try_from(-1.0),
            Err(SourceError::InvalidDelay { .. })
        ));
        assert!(matches!(
            Delay::try_from(-5i64),
            Err(SourceError::InvalidDelay { .. })
        ));
    }

    #[test]
    fn test_non_finite_delay_is_rejected() {
        assert!(Delay::try_from(f64::NAN).is_err());
        assert!(Delay::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn test_overlong_delay_is_rejected() {
        assert!(matches!(
            Delay::try_from(1e300),
            Err(SourceError::InvalidDelay { .. })
        ));
        assert!(serde_json::from_str::<Delay>("1e300").is_err());
        assert!(Delay::try_from(f64::MAX).is_err());
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        assert_eq!(Delay::try_from(0.0).unwrap(), Delay::ZERO);
        assert_eq!(Delay::try_from(500.0).unwrap().as_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_delay_deserializes_from_millis() {
        let delay: Delay = serde_json::from_str("250").unwrap();
        assert_eq!(delay, Delay::from_millis(250));
        assert!(serde_json::from_str::<Delay>("-3").is_err());
    }

    #[test]
    fn test_function_receives_tick() {
        let mut source = FunctionSource::new(|tick| single(tick as u32), Delay::ZERO);
        assert_eq!(source.produce(7).unwrap(), Some(single(7)));
        assert_eq!(source.produce(0).unwrap(), Some(single(0)));
    }

    #[test]
    fn test_generator_ends() {
        let mut source = GeneratorSource::new(vec![single(1), single(2)], Delay::ZERO);
        assert_eq!(source.produce(0).unwrap(), Some(single(1)));
        assert_eq!(source.produce(1).unwrap(), Some(single(2)));
        assert_eq!(source.produce(2).unwrap(), None);
    }

    #[test]
    fn test_generator_ignores_tick() {
        let mut source = GeneratorSource::new((0..).map(single), Delay::ZERO);
        assert_eq!(source.produce(100).unwrap(), Some(single(0)));
        assert_eq!(source.produce(100).unwrap(), Some(single(1)));
    }

    #[test]
    fn test_generator_error_is_passed_on() {
        let items: Vec<Result<Frame, ProducerError>> = vec![Ok(single(1)), Err("broken".into())];
        let mut source = GeneratorSource::fallible(items, Delay::ZERO);
        assert!(source.produce(0).is_ok());
        assert_eq!(source.produce(1).unwrap_err().to_string(), "broken");
    }

    #[test]
    fn test_sequence_delegates() {
        let array = ArraySource::new(vec![single(3)], Delay::from_millis(40)).unwrap();
        let mut sequence = Sequence::from(array);
        assert_eq!(sequence.kind(), SourceKind::Array);
        assert_eq!(sequence.delay(), Delay::from_millis(40));
        assert_eq!(sequence.produce(5).unwrap(), Some(single(3)));
    }
}
