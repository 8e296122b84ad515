//! The async event sequencer.
//!
//! A [`Sequencer`] binds a [`HandlerTable`] onto a domain's event surface.
//! Emitting a name starts that name's handler under the domain's protection
//! and records two orders:
//!
//! - **emission order**: names in the exact order they were emitted
//! - **completion order**: names in the order their invocations settled
//!
//! A handler's body starts inside the emitting call: the handler is invoked
//! and polled once before the next name is emitted, and whatever is still
//! pending continues as a task on the sequencer's runtime. A sequencer only
//! reacts to its own emissions, so several sequencers can share a domain and
//! its event names.
//!
//! Handler failures go to the domain's error channel. They never stop sibling
//! handlers, [`emit_events`](Sequencer::emit_events), or
//! [`wait_for_completion`](Sequencer::wait_for_completion).
//!
//! ```rust,ignore
//! let sequencer = domain.async_event_sequencer(
//!     HandlerTable::new()
//!         .on("eventA", || async { sleep(Duration::from_millis(40)).await })
//!         .on("eventB", || async { sleep(Duration::from_millis(20)).await }),
//! )?;
//!
//! sequencer.emit_events(["eventA", "eventB"])?;
//! let report = sequencer.wait_for_completion().await;
//! assert_eq!(report.completion_order, ["eventB", "eventA"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::{self, Shared};
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, trace};
use warden_core::{Domain, EventArgs, ListenerId};

use crate::error::{SequencerError, SequencerResult};
use crate::handler::{BoxFuture, BoxedHandler};
use crate::table::HandlerTable;

/// A settle signal shared between the listener and every waiter.
type Settled = Shared<BoxFuture<'static, ()>>;

static NEXT_SEQUENCER: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Options & Report
// ============================================================================

/// Behavioural options for a [`Sequencer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerOptions {
    /// Reject emission of names that have no handler.
    ///
    /// When `false`, unknown names are recorded in emission order and reach no
    /// listener.
    pub strict: bool,
}

/// Both orders, as returned by [`Sequencer::wait_for_completion`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Names in the order they were emitted.
    pub emission_order: Vec<String>,
    /// Names in the order their handler invocations settled.
    pub completion_order: Vec<String>,
}

// ============================================================================
// Run State
// ============================================================================

#[derive(Default)]
struct RunState {
    emission_order: Mutex<Vec<String>>,
    completion_order: Mutex<Vec<String>>,
    /// Latest invocation per name; an older one is dropped from tracking when
    /// the name fires again.
    in_flight: Mutex<HashMap<String, Settled>>,
    running: AtomicUsize,
}

/// Appends the event name to completion order when the invocation task ends,
/// however it ends.
struct CompletionGuard {
    state: Arc<RunState>,
    name: String,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        trace!(event = %self.name, "Handler settled");
        self.state.running.fetch_sub(1, Ordering::SeqCst);
        self.state
            .completion_order
            .lock()
            .push(std::mem::take(&mut self.name));
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Triggers named asynchronous handlers and tracks their ordering.
///
/// Dropping the sequencer detaches its listeners from the domain. Invocations
/// already running are not cancelled.
pub struct Sequencer {
    id: u64,
    domain: Domain,
    options: SequencerOptions,
    names: Vec<String>,
    known: HashSet<String>,
    listeners: Vec<(String, ListenerId)>,
    state: Arc<RunState>,
    emit_lock: ReentrantMutex<()>,
}

impl Sequencer {
    /// Creates a lenient sequencer for `domain`.
    ///
    /// Must be called inside a tokio runtime; handler invocations that do not
    /// finish on their first poll continue on it.
    pub fn new(domain: &Domain, table: HandlerTable) -> SequencerResult<Self> {
        Self::with_options(domain, table, SequencerOptions::default())
    }

    /// Creates a sequencer with explicit options.
    pub fn with_options(
        domain: &Domain,
        table: HandlerTable,
        options: SequencerOptions,
    ) -> SequencerResult<Self> {
        table.validate()?;
        let runtime = Handle::try_current().map_err(|_| SequencerError::NoRuntime)?;
        let state = Arc::new(RunState::default());
        let id = NEXT_SEQUENCER.fetch_add(1, Ordering::Relaxed);

        let entries = table.into_entries();
        let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
        let listeners = entries
            .into_iter()
            .map(|(name, handler)| {
                let listener = attach(id, domain, &name, handler, &state, &runtime);
                (name, listener)
            })
            .collect();

        debug!(
            parent: domain.span(),
            sequencer = id,
            events = ?names,
            strict = options.strict,
            "Sequencer created"
        );

        Ok(Self {
            id,
            domain: domain.clone(),
            options,
            known: names.iter().cloned().collect(),
            names,
            listeners,
            state,
            emit_lock: ReentrantMutex::new(()),
        })
    }

    /// Emits each name in order, without waiting for any handler to settle.
    ///
    /// Every name is appended to emission order before its event fires, and
    /// each handler has started before the next name is emitted. In
    /// strict mode the whole call is rejected, and nothing is emitted, if any
    /// name has no handler.
    pub fn emit_events<I, S>(&self, names: I) -> SequencerResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        for name in &names {
            self.check(name.as_ref())?;
        }

        let args = EventArgs::new().sent_by(self.id);
        let _emitting = self.emit_lock.lock();
        for name in &names {
            self.trigger(name.as_ref(), &args);
        }
        Ok(())
    }

    /// Emits a single event carrying `args`.
    pub fn emit_with(&self, name: &str, args: impl Into<EventArgs>) -> SequencerResult<()> {
        self.check(name)?;
        let args = args.into().sent_by(self.id);
        let _emitting = self.emit_lock.lock();
        self.trigger(name, &args);
        Ok(())
    }

    /// Waits for the latest invocation of every emitted name to settle, then
    /// returns both orders.
    ///
    /// Never fails: handler failures were already reported to the domain.
    pub async fn wait_for_completion(&self) -> SequenceReport {
        let pending: Vec<Settled> = self.state.in_flight.lock().values().cloned().collect();
        trace!(pending = pending.len(), "Waiting for handlers");
        future::join_all(pending).await;
        self.report()
    }

    /// Returns both orders as they stand now.
    pub fn report(&self) -> SequenceReport {
        SequenceReport {
            emission_order: self.emission_order(),
            completion_order: self.completion_order(),
        }
    }

    /// Returns the emission order so far.
    pub fn emission_order(&self) -> Vec<String> {
        self.state.emission_order.lock().clone()
    }

    /// Returns the completion order so far.
    pub fn completion_order(&self) -> Vec<String> {
        self.state.completion_order.lock().clone()
    }

    /// Returns the names this sequencer has handlers for.
    pub fn event_names(&self) -> &[String] {
        &self.names
    }

    /// Returns `true` if `name` has a handler.
    pub fn handles(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Returns how many handler invocations have not settled yet.
    pub fn in_flight(&self) -> usize {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Returns the domain this sequencer reports to.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Returns the options this sequencer was built with.
    pub fn options(&self) -> SequencerOptions {
        self.options
    }

    fn check(&self, name: &str) -> SequencerResult<()> {
        if self.options.strict && !self.handles(name) {
            return Err(SequencerError::UnknownEvent {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn trigger(&self, name: &str, args: &EventArgs) {
        self.state.emission_order.lock().push(name.to_owned());
        let delivered = self.domain.events().emit(name, args);
        trace!(parent: self.domain.span(), event = name, delivered, "Event emitted");
    }
}

/// Attaches the listener that starts `handler` whenever sequencer `id` emits
/// `name`.
fn attach(
    id: u64,
    domain: &Domain,
    name: &str,
    handler: BoxedHandler,
    state: &Arc<RunState>,
    runtime: &Handle,
) -> ListenerId {
    let weak = domain.downgrade();
    let state = Arc::clone(state);
    let runtime = runtime.clone();
    let event = name.to_owned();

    domain.events().on(name, move |args: &EventArgs| {
        if args.sender() != Some(id) {
            return;
        }
        let Some(domain) = weak.upgrade() else {
            return;
        };
        let _runtime = runtime.enter();

        let handler = Arc::clone(&handler);
        let args = args.clone();
        state.running.fetch_add(1, Ordering::SeqCst);
        let guard = CompletionGuard {
            state: Arc::clone(&state),
            name: event.clone(),
        };

        // Failures are reported on the domain's error channel.
        let mut invocation = domain.run_async(move || handler.call(args));
        let settled: Settled = match (&mut invocation).now_or_never() {
            Some(_) => {
                drop(guard);
                future::ready(()).boxed().shared()
            }
            None => {
                let task = runtime.spawn(async move {
                    let _guard = guard;
                    let _ = invocation.await;
                });
                async move {
                    let _ = task.await;
                }
                .boxed()
                .shared()
            }
        };

        state.in_flight.lock().insert(event.clone(), settled);
    })
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        for (name, id) in self.listeners.drain(..) {
            self.domain.events().remove_listener(&name, id);
        }
        debug!(parent: self.domain.span(), "Sequencer dropped");
    }
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("id", &self.id)
            .field("domain", &self.domain.id())
            .field("events", &self.names)
            .field("options", &self.options)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Creates sequencers from a domain.
pub trait SequencerExt {
    /// Binds `table` onto this domain's event surface.
    fn async_event_sequencer(&self, table: HandlerTable) -> SequencerResult<Sequencer>;
}

impl SequencerExt for Domain {
    fn async_event_sequencer(&self, table: HandlerTable) -> SequencerResult<Sequencer> {
        Sequencer::new(self, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;
    use warden_core::{BoxError, DomainError, ErrorOrigin};

    fn collecting_domain() -> (Domain, Arc<Mutex<Vec<DomainError>>>) {
        let domain = Domain::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        domain.on_error(move |err| sink.lock().push(err.clone()));
        (domain, seen)
    }

    fn delayed(ms: u64) -> impl Fn() -> BoxFuture<'static, ()> + Clone + Send + Sync + 'static {
        move || -> BoxFuture<'static, ()> { Box::pin(sleep(Duration::from_millis(ms))) }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_order_matches_arguments() {
        let (domain, _) = collecting_domain();
        let sequencer = domain
            .async_event_sequencer(
                HandlerTable::new()
                    .on("event1", delayed(30))
                    .on("event2", delayed(10))
                    .on("event3", delayed(20)),
            )
            .unwrap();

        sequencer.emit_events(["event1", "event2", "event3"]).unwrap();
        let report = sequencer.wait_for_completion().await;

        assert_eq!(report.emission_order, ["event1", "event2", "event3"]);
        assert_eq!(report.completion_order, ["event2", "event3", "event1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_follows_latency() {
        let (domain, seen) = collecting_domain();
        let sequencer = domain
            .async_event_sequencer(
                HandlerTable::new()
                    .on("eventA", delayed(40))
                    .on("eventB", delayed(20)),
            )
            .unwrap();

        sequencer.emit_events(["eventA", "eventB"]).unwrap();
        assert_eq!(sequencer.in_flight(), 2);

        let report = sequencer.wait_for_completion().await;
        assert_eq!(report.emission_order, ["eventA", "eventB"]);
        assert_eq!(report.completion_order, ["eventB", "eventA"]);
        assert_eq!(sequencer.in_flight(), 0);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_handler_is_isolated() {
        let (domain, seen) = collecting_domain();
        let sequencer = domain
            .async_event_sequencer(
                HandlerTable::new()
                    .on("event1", delayed(10))
                    .on("event2", || async {
                        sleep(Duration::from_millis(5)).await;
                        Err::<(), BoxError>("An error in event 2".into())
                    })
                    .on("event3", delayed(15)),
            )
            .unwrap();

        sequencer.emit_events(["event1", "event2", "event3"]).unwrap();
        let report = sequencer.wait_for_completion().await;

        assert_eq!(report.completion_order, ["event2", "event1", "event3"]);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_string(), "An error in event 2");
        assert_eq!(seen[0].origin(), ErrorOrigin::Rejected);
    }

    #[tokio::test]
    async fn test_panicking_handler_still_completes() {
        fn explode() {
            panic!("handler panicked")
        }

        let (domain, seen) = collecting_domain();
        let sequencer = domain
            .async_event_sequencer(HandlerTable::new().on("boom", || async { explode() }))
            .unwrap();

        sequencer.emit_events(["boom"]).unwrap();
        let report = sequencer.wait_for_completion().await;

        assert_eq!(report.completion_order, ["boom"]);
        assert!(seen.lock()[0].is_panic());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_invocation_is_awaited() {
        let (domain, _) = collecting_domain();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sequencer = domain
            .async_event_sequencer(HandlerTable::new().on("a", move || {
                let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    let ms = if first { 100 } else { 10 };
                    sleep(Duration::from_millis(ms)).await;
                }
            }))
            .unwrap();

        sequencer.emit_events(["a"]).unwrap();
        sequencer.emit_events(["a"]).unwrap();
        let report = sequencer.wait_for_completion().await;
        assert_eq!(report.emission_order, ["a", "a"]);
        assert_eq!(report.completion_order, ["a"]);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(sequencer.completion_order(), ["a", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_body_starts_during_emit() {
        let (domain, _) = collecting_domain();
        let log = Arc::new(Mutex::new(Vec::new()));
        let step = |name: &'static str, ms: u64| {
            let log = Arc::clone(&log);
            move || {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(format!("start:{name}"));
                    sleep(Duration::from_millis(ms)).await;
                    log.lock().push(format!("end:{name}"));
                }
            }
        };
        let sequencer = domain
            .async_event_sequencer(
                HandlerTable::new()
                    .on("a", step("a", 20))
                    .on("b", step("b", 10))
                    .on("c", || async {}),
            )
            .unwrap();

        sequencer.emit_events(["a", "b", "c"]).unwrap();
        assert_eq!(*log.lock(), ["start:a", "start:b"]);
        assert_eq!(sequencer.completion_order(), ["c"]);
        assert_eq!(sequencer.in_flight(), 2);

        let report = sequencer.wait_for_completion().await;
        assert_eq!(report.completion_order, ["c", "b", "a"]);
        assert_eq!(
            *log.lock(),
            ["start:a", "start:b", "end:b", "end:a"]
        );
    }

    #[tokio::test]
    async fn test_nested_emit_lands_inside_outer_block() {
        let (domain, _) = collecting_domain();
        let sequencer = Arc::new(
            domain
                .async_event_sequencer(
                    HandlerTable::new()
                        .on("outer", || async {})
                        .on("inner", || async {})
                        .on("last", || async {}),
                )
                .unwrap(),
        );

        let weak = Arc::downgrade(&sequencer);
        domain.events().on("outer", move |_: &EventArgs| {
            if let Some(sequencer) = weak.upgrade() {
                sequencer.emit_events(["inner"]).unwrap();
            }
        });

        sequencer.emit_events(["outer", "last"]).unwrap();
        let report = sequencer.wait_for_completion().await;
        assert_eq!(report.emission_order, ["outer", "inner", "last"]);
        assert_eq!(report.completion_order, ["outer", "inner", "last"]);
    }

    #[tokio::test]
    async fn test_sequencers_sharing_a_name_stay_separate() {
        let (domain, _) = collecting_domain();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let table = |tag: &'static str| {
            let hits = Arc::clone(&hits);
            HandlerTable::new().on("x", move || {
                hits.lock().push(tag);
                async {}
            })
        };
        let first = domain.async_event_sequencer(table("first")).unwrap();
        let second = domain.async_event_sequencer(table("second")).unwrap();

        first.emit_events(["x"]).unwrap();
        domain.events().emit("x", &EventArgs::new());

        let first = first.wait_for_completion().await;
        let second = second.wait_for_completion().await;
        assert_eq!(first.emission_order, ["x"]);
        assert_eq!(first.completion_order, ["x"]);
        assert_eq!(second, SequenceReport::default());
        assert_eq!(*hits.lock(), ["first"]);
    }

    #[tokio::test]
    async fn test_emit_with_passes_arguments() {
        let (domain, seen) = collecting_domain();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let sequencer = Sequencer::new(
            &domain,
            HandlerTable::new().on("resize", move |w: u32, h: u32| {
                let sink = Arc::clone(&sink);
                async move { sink.lock().push((w, h)) }
            }),
        )
        .unwrap();

        sequencer
            .emit_with("resize", EventArgs::new().with(2).with(3))
            .unwrap();
        sequencer
            .emit_with("resize", EventArgs::new().with("wide"))
            .unwrap();
        sequencer.wait_for_completion().await;

        // Both invocations share a name, so wait for the untracked one too.
        while sequencer.completion_order().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*received.lock(), [(2, 3)]);
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_lenient_mode_records_unknown_names() {
        let (domain, _) = collecting_domain();
        let sequencer = domain
            .async_event_sequencer(HandlerTable::new().on("known", || async {}))
            .unwrap();

        sequencer.emit_events(["unknown", "known"]).unwrap();
        let report = sequencer.wait_for_completion().await;
        assert_eq!(report.emission_order, ["unknown", "known"]);
        assert_eq!(report.completion_order, ["known"]);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_whole_call() {
        let (domain, _) = collecting_domain();
        let sequencer = Sequencer::with_options(
            &domain,
            HandlerTable::new().on("known", || async {}),
            SequencerOptions { strict: true },
        )
        .unwrap();

        let err = sequencer.emit_events(["known", "unknown"]).unwrap_err();
        assert_eq!(
            err,
            SequencerError::UnknownEvent {
                name: "unknown".into()
            }
        );
        assert!(sequencer.emission_order().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let domain = Domain::new();
        let result = domain.async_event_sequencer(
            HandlerTable::new()
                .on("same", || async {})
                .on("same", || async {}),
        );
        assert!(matches!(
            result,
            Err(SequencerError::DuplicateEvent { .. })
        ));
    }

    #[test]
    fn test_requires_runtime() {
        let domain = Domain::new();
        let result = domain.async_event_sequencer(HandlerTable::new());
        assert!(matches!(result, Err(SequencerError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_drop_detaches_listeners() {
        let domain = Domain::new();
        let sequencer = domain
            .async_event_sequencer(HandlerTable::new().on("tick", || async {}))
            .unwrap();
        assert_eq!(domain.events().listener_count("tick"), 1);

        drop(sequencer);
        assert_eq!(domain.events().listener_count("tick"), 0);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let report = SequenceReport {
            emission_order: vec!["a".into(), "b".into()],
            completion_order: vec!["b".into(), "a".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "emission_order": ["a", "b"],
                "completion_order": ["b", "a"],
            })
        );
    }
}
