//! Trailing-edge debounced saving.
//!
//! A [`DebouncedSaver`] holds at most one pending payload and one pending
//! timer. Every [`DebouncedSaver::request_save`] replaces both; when a timer
//! elapses without being replaced, the payload it guards is handed to the
//! bound [`SaveOperation`]. Failures (including panics) stay inside the
//! coordinator and are reported through logging and the optional
//! [`SaveEventSink`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_debug, tracker_error, tracker_trace, tracker_warn};

use crate::{DispatchId, SaveError, SaveEvent, SaveEventSink, SaveFailureKind, SaveOperation};

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(800);

/// What happens when a window elapses while an earlier save is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Start the new save right away; saves may overlap.
    #[default]
    Overlapping,
    /// Wait for earlier saves to settle first, in dispatch order.
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no save operation configured")]
    MissingOperation,
    #[error("debounced saver must be configured inside a tokio runtime")]
    NoRuntime,
}

struct Binding<T> {
    operation: Arc<dyn SaveOperation<T>>,
    delay: Duration,
    policy: DispatchPolicy,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            delay: self.delay,
            policy: self.policy,
        }
    }
}

struct Slot<T> {
    binding: Binding<T>,
    /// Bumped whenever the pending timer is replaced; a timer only fires if
    /// its generation is still current.
    generation: u64,
    pending: Option<T>,
    timer: Option<CancellationToken>,
    last_dispatched: Option<T>,
    last_dispatch_id: DispatchId,
    in_flight: usize,
    closed: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    saving: watch::Sender<bool>,
    turn: tokio::sync::Mutex<()>,
    sink: Option<Arc<dyn SaveEventSink>>,
    runtime: Handle,
}

impl<T> Shared<T> {
    fn lock_slot(&self) -> MutexGuard<'_, Slot<T>> {
        // Nothing panics while holding the lock; recover the data regardless.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SaveEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

/// Coalesces bursts of save requests into one save per quiet window.
///
/// Owned by a single scope. Dropping it is the same as calling
/// [`DebouncedSaver::shutdown`].
pub struct DebouncedSaver<T: Clone + Send + 'static> {
    shared: Arc<Shared<T>>,
    root: CancellationToken,
}

impl<T: Clone + Send + 'static> DebouncedSaver<T> {
    pub fn builder() -> DebouncedSaverBuilder<T> {
        DebouncedSaverBuilder::new()
    }

    /// Binds `operation` with a quiet window of `delay` on the current runtime.
    pub fn configure<O>(operation: O, delay: Duration) -> Result<Self, ConfigError>
    where
        O: SaveOperation<T> + 'static,
    {
        Self::builder().operation(operation).delay(delay).build()
    }

    /// Records `payload` as the latest state and restarts the countdown.
    ///
    /// Never blocks and never fails; after shutdown the request is dropped.
    pub fn request_save(&self, payload: T) {
        let mut slot = self.shared.lock_slot();
        if slot.closed {
            tracker_debug!("save requested after shutdown; ignoring");
            return;
        }
        slot.pending = Some(payload);
        self.arm(&mut slot);
    }

    /// Swaps the bound operation and delay.
    ///
    /// A pending payload is re-armed under the new binding with a fresh
    /// countdown. The old binding's timer can no longer fire.
    pub fn reconfigure<O>(&self, operation: O, delay: Duration)
    where
        O: SaveOperation<T> + 'static,
    {
        let mut slot = self.shared.lock_slot();
        if slot.closed {
            return;
        }
        slot.binding = Binding {
            operation: Arc::new(operation),
            delay,
            policy: slot.binding.policy,
        };
        if slot.pending.is_some() {
            self.arm(&mut slot);
        } else {
            cancel_timer(&mut slot);
        }
        tracker_debug!("debounced saver reconfigured with delay {:?}", delay);
    }

    /// Dispatches the pending payload now instead of waiting for its window.
    ///
    /// Returns `None` when nothing was pending (or the dispatch was abandoned
    /// by a shutdown), otherwise the outcome of the save. The outcome has
    /// already been logged and reported to the event sink.
    pub async fn flush(&self) -> Option<Result<(), SaveError>> {
        let (binding, dispatch_id, payload) = {
            let mut slot = self.shared.lock_slot();
            if slot.closed {
                return None;
            }
            let payload = slot.pending.take()?;
            cancel_timer(&mut slot);
            slot.last_dispatch_id += 1;
            (slot.binding.clone(), slot.last_dispatch_id, payload)
        };
        tracker_debug!("flushing pending save as dispatch {}", dispatch_id);
        dispatch(&self.shared, &binding, dispatch_id, payload).await
    }

    /// Cancels the pending timer and forgets the pending payload.
    ///
    /// Saves already running are allowed to finish and still clear the
    /// saving flag, but their outcome is no longer sent to the event sink.
    pub fn shutdown(&self) {
        let mut slot = self.shared.lock_slot();
        if slot.closed {
            return;
        }
        slot.closed = true;
        let abandoned = slot.pending.take().is_some();
        cancel_timer(&mut slot);
        drop(slot);
        self.root.cancel();
        if abandoned {
            tracker_debug!("debounced saver shut down with a pending save; dropped it");
        }
    }

    /// True while at least one dispatched save has not settled.
    pub fn is_saving(&self) -> bool {
        *self.shared.saving.borrow()
    }

    /// Watches the saving flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.saving.subscribe()
    }

    /// The payload most recently handed to the save operation.
    pub fn last_dispatched(&self) -> Option<T> {
        self.shared.lock_slot().last_dispatched.clone()
    }

    pub fn has_pending(&self) -> bool {
        self.shared.lock_slot().pending.is_some()
    }

    pub fn delay(&self) -> Duration {
        self.shared.lock_slot().binding.delay
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.shared.lock_slot().binding.policy
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock_slot().closed
    }

    fn arm(&self, slot: &mut Slot<T>) {
        cancel_timer(slot);
        let generation = slot.generation;
        let token = self.root.child_token();
        slot.timer = Some(token.clone());

        let binding = slot.binding.clone();
        let shared = Arc::clone(&self.shared);
        tracker_trace!(
            "save countdown {} armed for {:?}",
            generation,
            binding.delay
        );
        self.shared.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(binding.delay) => {
                    fire(&shared, generation, &binding).await;
                }
            }
        });
    }
}

impl<T: Clone + Send + 'static> Drop for DebouncedSaver<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn cancel_timer<T>(slot: &mut Slot<T>) {
    if let Some(timer) = slot.timer.take() {
        timer.cancel();
    }
    slot.generation += 1;
}

async fn fire<T: Clone + Send + 'static>(shared: &Shared<T>, generation: u64, binding: &Binding<T>) {
    let (dispatch_id, payload) = {
        let mut slot = shared.lock_slot();
        // A newer request or a shutdown got the lock first.
        if slot.closed || slot.generation != generation {
            return;
        }
        let Some(payload) = slot.pending.take() else {
            return;
        };
        slot.timer = None;
        slot.last_dispatch_id += 1;
        (slot.last_dispatch_id, payload)
    };
    dispatch(shared, binding, dispatch_id, payload).await;
}

async fn dispatch<T: Clone + Send + 'static>(
    shared: &Shared<T>,
    binding: &Binding<T>,
    dispatch_id: DispatchId,
    payload: T,
) -> Option<Result<(), SaveError>> {
    let _turn = match binding.policy {
        DispatchPolicy::Sequential => Some(shared.turn.lock().await),
        DispatchPolicy::Overlapping => None,
    };

    {
        let mut slot = shared.lock_slot();
        if slot.closed {
            tracker_debug!("dispatch {} abandoned by shutdown before it started", dispatch_id);
            return None;
        }
        slot.last_dispatched = Some(payload.clone());
        slot.in_flight += 1;
        if slot.in_flight == 1 {
            shared.saving.send_replace(true);
        }
    }
    shared.emit(SaveEvent::Started { dispatch_id });
    tracker_debug!("save dispatch {} started", dispatch_id);

    let started = Instant::now();
    let operation = Arc::clone(&binding.operation);
    let result = AssertUnwindSafe(async move { operation.save(payload).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(SaveError::new(
                SaveFailureKind::Panicked,
                panic_message(panic.as_ref()),
            ))
        });
    let elapsed = started.elapsed();

    {
        let mut slot = shared.lock_slot();
        slot.in_flight = slot.in_flight.saturating_sub(1);
        if slot.in_flight == 0 {
            shared.saving.send_replace(false);
        }
        if slot.closed {
            tracker_debug!(
                "save dispatch {} settled after shutdown ({}); result discarded",
                dispatch_id,
                if result.is_ok() { "ok" } else { "failed" }
            );
            return Some(result);
        }
    }

    match &result {
        Ok(()) => {
            tracker_debug!("save dispatch {} succeeded in {:?}", dispatch_id, elapsed);
            shared.emit(SaveEvent::Succeeded {
                dispatch_id,
                elapsed,
            });
        }
        Err(error) => {
            if error.kind == SaveFailureKind::Panicked {
                tracker_error!("save dispatch {} panicked: {}", dispatch_id, error.message);
            } else {
                tracker_warn!("save dispatch {} failed: {}", dispatch_id, error);
            }
            shared.emit(SaveEvent::Failed {
                dispatch_id,
                error: error.clone(),
            });
        }
    }
    Some(result)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct DebouncedSaverBuilder<T> {
    operation: Option<Arc<dyn SaveOperation<T>>>,
    delay: Duration,
    policy: DispatchPolicy,
    sink: Option<Arc<dyn SaveEventSink>>,
    runtime: Option<Handle>,
}

impl<T: Clone + Send + 'static> DebouncedSaverBuilder<T> {
    fn new() -> Self {
        Self {
            operation: None,
            delay: DEFAULT_SAVE_DELAY,
            policy: DispatchPolicy::default(),
            sink: None,
            runtime: None,
        }
    }

    pub fn operation<O>(mut self, operation: O) -> Self
    where
        O: SaveOperation<T> + 'static,
    {
        self.operation = Some(Arc::new(operation));
        self
    }

    pub fn shared_operation(mut self, operation: Arc<dyn SaveOperation<T>>) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn SaveEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runtime that drives the timers. Defaults to the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<DebouncedSaver<T>, ConfigError> {
        let operation = self.operation.ok_or(ConfigError::MissingOperation)?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        let (saving, _) = watch::channel(false);

        let slot = Slot {
            binding: Binding {
                operation,
                delay: self.delay,
                policy: self.policy,
            },
            generation: 0,
            pending: None,
            timer: None,
            last_dispatched: None,
            last_dispatch_id: 0,
            in_flight: 0,
            closed: false,
        };

        Ok(DebouncedSaver {
            shared: Arc::new(Shared {
                slot: Mutex::new(slot),
                saving,
                turn: tokio::sync::Mutex::new(()),
                sink: self.sink,
                runtime,
            }),
            root: CancellationToken::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save_fn;

    #[test]
    fn builder_without_operation_fails_fast() {
        let result = DebouncedSaver::<String>::builder().build();
        assert_eq!(result.err(), Some(ConfigError::MissingOperation));
    }

    #[test]
    fn configure_outside_runtime_fails_fast() {
        let operation = save_fn(|_: String| async { Ok::<(), SaveError>(()) });
        let result = DebouncedSaver::<String>::configure(operation, DEFAULT_SAVE_DELAY);
        assert_eq!(result.err(), Some(ConfigError::NoRuntime));
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test(start_paused = true)]
    async fn defaults_to_overlapping_and_800ms() {
        let saver = DebouncedSaver::<String>::builder()
            .operation(save_fn(|_: String| async { Ok::<(), SaveError>(()) }))
            .build()
            .unwrap();
        assert_eq!(saver.delay(), Duration::from_millis(800));
        assert_eq!(saver.policy(), DispatchPolicy::Overlapping);
        assert!(!saver.is_saving());
        assert!(!saver.has_pending());
    }
}
