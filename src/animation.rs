//! The animation engine.
//!
//! An animation pulls one [`Frame`] per tick from a [`FrameSource`], applies every
//! zone of it through the shared [`HardwareSink`] and then waits for the source's
//! delay, until it is stopped or the source runs dry.
//!
//! Every animation gets its own [`CancellationToken`], derived from the engine's
//! current stop token. [`AnimationEngine::stop`] cancels all animations started
//! before the call; [`AnimationHandle::stop`] only the one it belongs to.
//!
//! The engine does not refuse a second animation while one is running. Both then
//! write to the same zones in turn. Callers are expected to keep at most one
//! animation active (the HTTP API stops the previous one before starting another).

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::PoisonError;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::frame::Frame;
use crate::sink::HardwareSink;
use crate::sink::ZoneError;
use crate::source::ArraySource;
use crate::source::Delay;
use crate::source::FrameSource;
use crate::source::FunctionSource;
use crate::source::GeneratorSource;
use crate::source::ProducerError;
use crate::source::Sequence;
use crate::source::Tick;

#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("Producing the frame for tick {tick} failed")]
    Produce {
        tick: Tick,
        #[source]
        source: ProducerError,
    },

    #[error("Applying the frame for tick {tick} failed")]
    Apply {
        tick: Tick,
        #[source]
        source: ZoneError,
    },

    #[error("Animation task did not finish")]
    Join(#[source] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEnd {
    /// A stop was requested
    Stopped,

    /// The source had no more frames
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationReport {
    pub end: AnimationEnd,
    pub frames_applied: u64,
}

/// Stops every animation of an engine that was started before [`StopHandle::stop`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    current: Arc<std::sync::Mutex<CancellationToken>>,
}

impl StopHandle {
    /// Idempotent. Animations started afterwards are not affected.
    pub fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
    }

    fn animation_token(&self) -> CancellationToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }
}

/// Decrements the running counter on every way out of the loop.
struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    fn new(running: &Arc<AtomicUsize>) -> Self {
        running.fetch_add(1, Ordering::SeqCst);
        Self(running.clone())
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct AnimationEngine<S> {
    sink: Arc<Mutex<S>>,
    stop: StopHandle,
    running: Arc<AtomicUsize>,
}

impl<S> AnimationEngine<S>
where
    S: HardwareSink + 'static,
{
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            stop: StopHandle::default(),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) > 0
    }

    pub fn stop(&self) {
        tracing::debug!(running = self.is_running(), "Stopping animations");
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Apply a single frame, outside of any animation
    pub async fn apply(&self, frame: &Frame) -> Result<(), ZoneError> {
        self.sink.lock().await.apply_frame(frame).await
    }

    pub async fn exec_function(
        &self,
        source: FunctionSource,
    ) -> Result<AnimationReport, AnimationError> {
        self.exec(source).await
    }

    pub async fn exec_array(&self, source: ArraySource) -> Result<AnimationReport, AnimationError> {
        self.exec(source).await
    }

    pub async fn exec_generator(
        &self,
        source: GeneratorSource,
    ) -> Result<AnimationReport, AnimationError> {
        self.exec(source).await
    }

    /// Run whichever source `sequence` holds
    pub async fn exec_sequence(
        &self,
        sequence: Sequence,
    ) -> Result<AnimationReport, AnimationError> {
        match sequence {
            Sequence::Function(source) => self.exec_function(source).await,
            Sequence::Array(source) => self.exec_array(source).await,
            Sequence::Generator(source) => self.exec_generator(source).await,
        }
    }

    /// Run `source` until it is stopped or exhausted
    async fn exec<Src>(&self, source: Src) -> Result<AnimationReport, AnimationError>
    where
        Src: FrameSource,
    {
        let task = AnimationTask::new(self, source);
        task.run().await
    }

    /// Run `source` on its own task
    pub fn spawn<Src>(&self, source: Src) -> AnimationHandle
    where
        Src: FrameSource + 'static,
    {
        let task = AnimationTask::new(self, source);
        let token = task.token.clone();
        let join = tokio::task::spawn(task.run());
        AnimationHandle { token, join }
    }
}

struct AnimationTask<S, Src> {
    sink: Arc<Mutex<S>>,
    source: Src,
    token: CancellationToken,
    _running: RunningGuard,
}

impl<S, Src> AnimationTask<S, Src>
where
    S: HardwareSink,
    Src: FrameSource,
{
    fn new(engine: &AnimationEngine<S>, source: Src) -> Self {
        Self {
            sink: engine.sink.clone(),
            source,
            token: engine.stop.animation_token(),
            _running: RunningGuard::new(&engine.running),
        }
    }

    async fn run(mut self) -> Result<AnimationReport, AnimationError> {
        let kind = self.source.kind();
        let delay = self.source.delay();
        tracing::info!(%kind, ?delay, "Starting animation");

        let mut tick: Tick = 0;
        let mut frames_applied = 0;

        let end = loop {
            if self.token.is_cancelled() {
                break AnimationEnd::Stopped;
            }

            let frame = self
                .source
                .produce(tick)
                .map_err(|source| AnimationError::Produce { tick, source })?;

            let Some(frame) = frame else {
                break AnimationEnd::Exhausted;
            };

            self.sink
                .lock()
                .await
                .apply_frame(&frame)
                .await
                .map_err(|source| AnimationError::Apply { tick, source })?;
            frames_applied += 1;
            tracing::trace!(tick, zones = frame.len(), "Applied frame");

            if !wait(&self.token, delay).await {
                break AnimationEnd::Stopped;
            }

            tick += 1;
        };

        tracing::info!(%kind, ?end, frames_applied, "Animation ended");
        Ok(AnimationReport {
            end,
            frames_applied,
        })
    }
}

/// Sleep for `delay`, returns `false` if cancelled meanwhile.
///
/// A zero delay still yields, so a busy animation does not starve the runtime.
async fn wait(token: &CancellationToken, delay: Delay) -> bool {
    if delay.is_zero() {
        token
            .run_until_cancelled(tokio::task::yield_now())
            .await
            .is_some()
    } else {
        token
            .run_until_cancelled(tokio::time::sleep(delay.as_duration()))
            .await
            .is_some()
    }
}

/// A spawned animation.
#[derive(Debug)]
pub struct AnimationHandle {
    token: CancellationToken,
    join: tokio::task::JoinHandle<Result<AnimationReport, AnimationError>>,
}

impl AnimationHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> Result<AnimationReport, AnimationError> {
        self.join.await.map_err(AnimationError::Join)?
    }

    /// Stop and wait for the loop to leave
    pub async fn shutdown(self) -> Result<AnimationReport, AnimationError> {
        self.stop();
        self.join().await
    }
}
