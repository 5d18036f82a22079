//! Turn orchestrator — opens, assembles, and closes assistant turns.
//!
//! Public entry points are [`TurnOrchestrator::send_message`] and
//! [`TurnOrchestrator::stop_generation`]. The orchestrator owns the single
//! source-of-truth [`TurnState`] for the in-flight turn, wires incoming
//! transport events through the pure reducer, and publishes a snapshot to
//! observers on every event via a `watch` channel.
//!
//! Cancellation control: one [`CancellationToken`] per turn. Starting a new
//! turn cancels the previous token first (supersede-by-replacement), so at
//! most one turn is open per orchestrator at any time. A deliberate stop is
//! not an error: the turn closes as `sent` and the error callback stays
//! quiet.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use weft_core::events::StreamEvent;
use weft_core::ids::ConversationId;
use weft_core::reducer;
use weft_core::turn::{ChatMessage, GENERIC_FAILURE_CONTENT, MessageStatus, TurnState};

use crate::errors::RuntimeError;
use crate::transport::{Transport, TransportError, TurnRequest};

/// Bound on in-flight events between transport and the drive task.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Callback invoked once per turn that reaches a terminal, non-superseded
/// state through natural stream termination.
pub type CompleteCallback = Box<dyn Fn(ChatMessage, Option<ConversationId>) + Send + Sync>;

/// Callback invoked for genuine (non-cancellation) transport failures.
pub type ErrorCallback = Box<dyn Fn(&RuntimeError) + Send + Sync>;

/// Bookkeeping for the currently open turn.
struct ActiveTurn {
    generation: u64,
    cancel: CancellationToken,
    /// Whether this turn already bound a conversation identifier. The
    /// binding is sticky for the life of the turn: a caller-supplied id or
    /// the first `session_start` wins, later ones are no-ops.
    conversation_bound: bool,
}

struct Inner {
    transport: Arc<dyn Transport>,
    target: String,
    state_tx: watch::Sender<Option<TurnState>>,
    conversation_tx: watch::Sender<Option<ConversationId>>,
    active: Mutex<Option<ActiveTurn>>,
    generations: AtomicU64,
    on_message_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

/// Builder for [`TurnOrchestrator`].
pub struct TurnOrchestratorBuilder {
    transport: Arc<dyn Transport>,
    target: String,
    on_message_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl TurnOrchestratorBuilder {
    /// Set the completion callback.
    #[must_use]
    pub fn on_message_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(ChatMessage, Option<ConversationId>) + Send + Sync + 'static,
    {
        self.on_message_complete = Some(Box::new(callback));
        self
    }

    /// Set the error callback.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RuntimeError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Finish the builder.
    #[must_use]
    pub fn build(self) -> TurnOrchestrator {
        let (state_tx, _) = watch::channel(None);
        let (conversation_tx, _) = watch::channel(None);
        TurnOrchestrator {
            inner: Arc::new(Inner {
                transport: self.transport,
                target: self.target,
                state_tx,
                conversation_tx,
                active: Mutex::new(None),
                generations: AtomicU64::new(0),
                on_message_complete: self.on_message_complete,
                on_error: self.on_error,
            }),
        }
    }
}

/// Single-turn orchestrator over a streaming transport.
///
/// Cheap to clone; all clones share the same turn state and callbacks.
#[derive(Clone)]
pub struct TurnOrchestrator {
    inner: Arc<Inner>,
}

impl TurnOrchestrator {
    /// Start building an orchestrator for `target` over `transport`.
    pub fn builder(
        transport: Arc<dyn Transport>,
        target: impl Into<String>,
    ) -> TurnOrchestratorBuilder {
        TurnOrchestratorBuilder {
            transport,
            target: target.into(),
            on_message_complete: None,
            on_error: None,
        }
    }

    /// Orchestrator without callbacks; progress observed via [`Self::subscribe`].
    pub fn new(transport: Arc<dyn Transport>, target: impl Into<String>) -> Self {
        Self::builder(transport, target).build()
    }

    /// Open a new turn for `message`. Fire and forget.
    ///
    /// Any still-open turn is superseded: its cancellation token fires
    /// before the new stream opens. The fresh [`TurnState`] is published
    /// immediately and then on every folded event. Must be called from
    /// within a Tokio runtime.
    pub fn send_message(
        &self,
        message: impl Into<String>,
        conversation_id: Option<ConversationId>,
    ) {
        if self.inner.target.is_empty() {
            warn!("no stream target configured; dropping message");
            return;
        }

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let state = TurnState::new();
        {
            // Swap the active record and publish the fresh snapshot in one
            // critical section, so a superseded drive task can never slip a
            // stale publish in between.
            let mut active = self.inner.active.lock();
            if let Some(previous) = active.take() {
                debug!(
                    superseded = previous.generation,
                    generation, "superseding open turn"
                );
                previous.cancel.cancel();
            }
            *active = Some(ActiveTurn {
                generation,
                cancel: cancel.clone(),
                conversation_bound: conversation_id.is_some(),
            });
            if conversation_id.is_some() {
                let _ = self
                    .inner
                    .conversation_tx
                    .send_replace(conversation_id.clone());
            }
            let _ = self.inner.state_tx.send_replace(Some(state.clone()));
        }

        info!(message_id = %state.id, generation, "turn opened");
        counter!("weft_turns_started_total").increment(1);
        gauge!("weft_turns_active").set(1.0);

        let request = TurnRequest {
            message: message.into(),
            conversation_id,
        };
        let inner = Arc::clone(&self.inner);
        let _ = tokio::spawn(async move {
            Inner::drive(inner, generation, state, request, cancel).await;
        });
    }

    /// Stop the current generation. No-op when no turn is open.
    ///
    /// The turn closes as `sent` immediately, without waiting for the
    /// transport to acknowledge cancellation; stopping is a deliberate user
    /// action, not an error.
    pub fn stop_generation(&self) {
        {
            let active = self.inner.active.lock();
            let Some(turn) = active.as_ref() else {
                return;
            };
            info!(generation = turn.generation, "stop requested");
            turn.cancel.cancel();
        }
        self.inner.state_tx.send_modify(|state| {
            if let Some(turn) = state.as_mut() {
                turn.is_streaming = false;
                turn.status = MessageStatus::Sent;
            }
        });
    }

    /// Subscribe to published turn snapshots (`None` before the first turn).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<TurnState>> {
        self.inner.state_tx.subscribe()
    }

    /// Latest published snapshot, if any.
    #[must_use]
    pub fn current_state(&self) -> Option<TurnState> {
        self.inner.state_tx.borrow().clone()
    }

    /// Whether a turn is currently open.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.inner
            .state_tx
            .borrow()
            .as_ref()
            .is_some_and(|t| t.is_streaming)
    }

    /// The resolved conversation identifier, once known.
    #[must_use]
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.conversation_tx.borrow().clone()
    }

    /// Subscribe to conversation binding updates.
    #[must_use]
    pub fn subscribe_conversation(&self) -> watch::Receiver<Option<ConversationId>> {
        self.inner.conversation_tx.subscribe()
    }
}

impl Inner {
    /// Drive one turn: run the transport, fold events, finalize.
    async fn drive(
        inner: Arc<Self>,
        generation: u64,
        mut state: TurnState,
        request: TurnRequest,
        cancel: CancellationToken,
    ) {
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transport = Arc::clone(&inner.transport);
        let target = inner.target.clone();
        let transport_cancel = cancel.clone();
        let transport_task = tokio::spawn(async move {
            transport
                .open_stream(&target, &request, events_tx, transport_cancel)
                .await
        });

        // Single consumer: fold and publish synchronously, one event at a
        // time, in arrival order.
        while let Some(event) = events_rx.recv().await {
            trace!(kind = event.kind(), generation, "stream event");
            if let StreamEvent::SessionStart {
                conversation_id: Some(conversation),
                ..
            } = &event
            {
                inner.bind_conversation(generation, conversation.clone());
            }
            state = reducer::apply(state, event);
            let _ = inner.publish_if_current(generation, &state);
        }

        let outcome = match transport_task.await {
            Ok(result) => result.map_err(RuntimeError::from),
            Err(join_error) => Err(RuntimeError::Task(join_error.to_string())),
        };

        match outcome {
            Ok(()) => {
                state.is_streaming = false;
                if state.status != MessageStatus::Error {
                    state.status = MessageStatus::Sent;
                }
                if inner.publish_if_current(generation, &state) {
                    info!(message_id = %state.id, generation, status = ?state.status, "turn finished");
                    if let Some(callback) = &inner.on_message_complete {
                        callback(
                            ChatMessage::from(&state),
                            inner.conversation_tx.borrow().clone(),
                        );
                    }
                } else {
                    debug!(generation, "superseded turn finished; dropping result");
                }
            }
            Err(RuntimeError::Transport(err)) if err.is_cancelled() => {
                // Deliberate stop or supersession: a graceful close, never
                // surfaced through the error callback.
                state.is_streaming = false;
                state.status = MessageStatus::Sent;
                let _ = inner.publish_if_current(generation, &state);
                debug!(generation, "turn cancelled");
            }
            Err(error) => {
                state.is_streaming = false;
                state.status = MessageStatus::Error;
                if state.content.is_empty() {
                    state.content = GENERIC_FAILURE_CONTENT.to_string();
                }
                let _ = inner.publish_if_current(generation, &state);
                counter!("weft_turn_errors_total").increment(1);
                warn!(%error, generation, "turn failed");
                if let Some(callback) = &inner.on_error {
                    callback(&error);
                }
            }
        }

        inner.finish_turn(generation);
    }

    /// Publish a snapshot unless this turn was superseded. Returns whether
    /// the turn is still current.
    ///
    /// The check and the publish form one critical section under the
    /// `active` lock (watch publication is synchronous), so a superseded
    /// drive task cannot overwrite the successor's snapshots.
    fn publish_if_current(&self, generation: u64, state: &TurnState) -> bool {
        let active = self.active.lock();
        let current = active
            .as_ref()
            .is_some_and(|turn| turn.generation == generation);
        if current {
            let _ = self.state_tx.send_replace(Some(state.clone()));
        }
        current
    }

    /// Bind the conversation for this turn, first binding wins.
    fn bind_conversation(&self, generation: u64, conversation: ConversationId) {
        let mut active = self.active.lock();
        if let Some(turn) = active.as_mut()
            && turn.generation == generation
            && !turn.conversation_bound
        {
            turn.conversation_bound = true;
            debug!(%conversation, "conversation bound");
            let _ = self.conversation_tx.send_replace(Some(conversation));
        }
    }

    /// Clear the active record if it still belongs to this turn.
    fn finish_turn(&self, generation: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|t| t.generation == generation) {
            *active = None;
            gauge!("weft_turns_active").set(0.0);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio::time::{sleep, timeout};

    /// How a scripted stream ends after its events are delivered.
    enum ScriptEnd {
        /// Remote closes normally.
        Close,
        /// Stream hangs until the cancellation token fires.
        AwaitCancel,
        /// Transport fails with a protocol error.
        Fail,
    }

    struct Script {
        events: Vec<StreamEvent>,
        end: ScriptEnd,
    }

    /// Transport that plays back one script per `open_stream` call.
    struct ScriptedTransport {
        scripts: Mutex<VecDeque<Script>>,
        cancel_seen: AtomicBool,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                cancel_seen: AtomicBool::new(false),
            })
        }

        fn saw_cancel(&self) -> bool {
            self.cancel_seen.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn open_stream(
            &self,
            _target: &str,
            _request: &TurnRequest,
            events: mpsc::Sender<StreamEvent>,
            cancel: CancellationToken,
        ) -> Result<(), TransportError> {
            let script = self
                .scripts
                .lock()
                .pop_front()
                .expect("unexpected extra open_stream call");
            for event in script.events {
                if events.send(event).await.is_err() {
                    return Ok(());
                }
            }
            match script.end {
                ScriptEnd::Close => Ok(()),
                ScriptEnd::Fail => Err(TransportError::Protocol("connection reset".into())),
                ScriptEnd::AwaitCancel => {
                    cancel.cancelled().await;
                    self.cancel_seen.store(true, Ordering::SeqCst);
                    Err(TransportError::Cancelled)
                }
            }
        }
    }

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::TextDelta { text: text.into() }
    }

    fn session_start(conversation: &str) -> StreamEvent {
        StreamEvent::SessionStart {
            session_id: None,
            conversation_id: Some(conversation.into()),
            message_id: None,
        }
    }

    /// Counters shared with the orchestrator callbacks.
    #[derive(Default)]
    struct Observed {
        completions: Mutex<Vec<(ChatMessage, Option<ConversationId>)>>,
        errors: AtomicUsize,
    }

    fn orchestrator_with(
        transport: Arc<ScriptedTransport>,
        observed: &Arc<Observed>,
    ) -> TurnOrchestrator {
        let completions = Arc::clone(observed);
        let errors = Arc::clone(observed);
        TurnOrchestrator::builder(transport, "wf_1")
            .on_message_complete(move |message, conversation| {
                completions.completions.lock().push((message, conversation));
            })
            .on_error(move |_err| {
                let _ = errors.errors.fetch_add(1, Ordering::SeqCst);
            })
            .build()
    }

    /// Wait until the published snapshot satisfies `predicate`.
    async fn wait_for(
        orch: &TurnOrchestrator,
        predicate: impl Fn(&TurnState) -> bool,
    ) -> TurnState {
        let mut rx = orch.subscribe();
        timeout(Duration::from_secs(5), async move {
            loop {
                if let Some(state) = rx.borrow_and_update().as_ref()
                    && predicate(state)
                {
                    return state.clone();
                }
                rx.changed().await.expect("orchestrator dropped");
            }
        })
        .await
        .expect("timed out waiting for turn state")
    }

    async fn wait_terminal(orch: &TurnOrchestrator) -> TurnState {
        wait_for(orch, TurnState::is_terminal).await
    }

    #[tokio::test]
    async fn natural_completion_assembles_and_calls_back() {
        weft_core::logging::init();
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![
                session_start("c1"),
                delta("Hel"),
                delta("lo"),
                StreamEvent::Done {},
            ],
            end: ScriptEnd::Close,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", None);
        let state = wait_terminal(&orch).await;

        assert_eq!(state.content, "Hello");
        assert_eq!(state.status, MessageStatus::Sent);
        assert_eq!(orch.conversation_id(), Some("c1".into()));

        let completions = observed.completions.lock();
        assert_eq!(completions.len(), 1);
        let (message, conversation) = &completions[0];
        assert_eq!(message.content, "Hello");
        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(conversation.as_ref().map(ConversationId::as_str), Some("c1"));
        assert_eq!(observed.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn caller_supplied_conversation_is_published() {
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![delta("ok"), StreamEvent::Done {}],
            end: ScriptEnd::Close,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", Some("c_given".into()));
        let _ = wait_terminal(&orch).await;

        assert_eq!(orch.conversation_id(), Some("c_given".into()));
        let completions = observed.completions.lock();
        assert_eq!(
            completions[0].1.as_ref().map(ConversationId::as_str),
            Some("c_given")
        );
    }

    #[tokio::test]
    async fn caller_bound_conversation_survives_session_start() {
        // Binding is sticky for the life of the turn: a caller-supplied id
        // wins over a conflicting server-assigned one.
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![session_start("c_server"), delta("ok"), StreamEvent::Done {}],
            end: ScriptEnd::Close,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);
        let mut conversations = orch.subscribe_conversation();

        orch.send_message("hi", Some("c_caller".into()));
        let _ = wait_terminal(&orch).await;

        assert_eq!(orch.conversation_id(), Some("c_caller".into()));
        assert_eq!(*conversations.borrow_and_update(), Some("c_caller".into()));
        let completions = observed.completions.lock();
        assert_eq!(
            completions[0].1.as_ref().map(ConversationId::as_str),
            Some("c_caller")
        );
    }

    #[tokio::test]
    async fn first_session_start_binding_wins() {
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![
                session_start("c_first"),
                session_start("c_second"),
                StreamEvent::Done {},
            ],
            end: ScriptEnd::Close,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", None);
        let _ = wait_terminal(&orch).await;
        assert_eq!(orch.conversation_id(), Some("c_first".into()));
    }

    #[tokio::test]
    async fn stop_generation_closes_as_sent_without_error() {
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![delta("par")],
            end: ScriptEnd::AwaitCancel,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(Arc::clone(&transport), &observed);

        orch.send_message("hi", None);
        let mid = wait_for(&orch, |t| t.content == "par").await;
        assert!(mid.is_streaming);
        assert!(orch.is_streaming());

        orch.stop_generation();
        let state = wait_terminal(&orch).await;
        assert_eq!(state.content, "par");
        assert_eq!(state.status, MessageStatus::Sent);
        assert!(!orch.is_streaming());

        // Let the drive task observe the cancellation and wind down.
        let _ = timeout(Duration::from_secs(5), async {
            while !transport.saw_cancel() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        sleep(Duration::from_millis(20)).await;
        assert_eq!(observed.errors.load(Ordering::SeqCst), 0);
        assert!(observed.completions.lock().is_empty());
    }

    #[tokio::test]
    async fn stop_without_open_turn_is_noop() {
        let transport = ScriptedTransport::new(vec![]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.stop_generation();
        assert!(orch.current_state().is_none());
        assert!(!orch.is_streaming());
    }

    #[tokio::test]
    async fn transport_failure_keeps_partial_content_and_errors() {
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![delta("A")],
            end: ScriptEnd::Fail,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", None);
        let state = wait_terminal(&orch).await;

        assert_eq!(state.content, "A");
        assert_eq!(state.status, MessageStatus::Error);
        assert_eq!(observed.errors.load(Ordering::SeqCst), 1);
        assert!(observed.completions.lock().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_with_no_content_uses_fallback() {
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![],
            end: ScriptEnd::Fail,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", None);
        let state = wait_terminal(&orch).await;

        assert_eq!(state.content, GENERIC_FAILURE_CONTENT);
        assert_eq!(state.status, MessageStatus::Error);
    }

    #[tokio::test]
    async fn new_turn_supersedes_and_cancels_previous() {
        let transport = ScriptedTransport::new(vec![
            Script {
                events: vec![delta("first ")],
                end: ScriptEnd::AwaitCancel,
            },
            Script {
                events: vec![delta("second"), StreamEvent::Done {}],
                end: ScriptEnd::Close,
            },
        ]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(Arc::clone(&transport), &observed);

        orch.send_message("one", None);
        let _ = wait_for(&orch, |t| t.content == "first ").await;

        orch.send_message("two", None);
        let state = wait_terminal(&orch).await;

        // The previous turn's token fired and its state never leaked into
        // the new turn's published snapshots.
        assert!(transport.saw_cancel());
        assert_eq!(state.content, "second");
        assert_eq!(state.status, MessageStatus::Sent);

        sleep(Duration::from_millis(20)).await;
        let completions = observed.completions.lock();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].0.content, "second");
        assert_eq!(observed.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn in_band_error_then_done_completes_with_error_status() {
        // The `error` event records status=error but leaves the turn open;
        // only the later `done` closes it. Preserved observed behavior.
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![
                StreamEvent::Error {
                    code: "upstream".into(),
                    message: "boom".into(),
                },
                delta(" more"),
                StreamEvent::Done {},
            ],
            end: ScriptEnd::Close,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", None);
        let state = wait_terminal(&orch).await;

        assert_eq!(state.status, MessageStatus::Error);
        assert_eq!(state.content, "boom more");

        // Natural termination still fires completion (with the error
        // status); the error callback is reserved for transport failures.
        let completions = observed.completions.lock();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].0.status, MessageStatus::Error);
        assert_eq!(observed.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_message_id_overrides_local_id() {
        let transport = ScriptedTransport::new(vec![Script {
            events: vec![
                StreamEvent::SessionStart {
                    session_id: None,
                    conversation_id: None,
                    message_id: Some("m_server".into()),
                },
                StreamEvent::Done {},
            ],
            end: ScriptEnd::Close,
        }]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("hi", None);
        let state = wait_terminal(&orch).await;
        assert_eq!(state.id.as_str(), "m_server");
    }

    #[tokio::test]
    async fn empty_target_drops_message() {
        let transport = ScriptedTransport::new(vec![]);
        let orch = TurnOrchestrator::new(transport, "");
        orch.send_message("hi", None);
        assert!(orch.current_state().is_none());
    }

    #[tokio::test]
    async fn each_turn_gets_a_fresh_state() {
        let transport = ScriptedTransport::new(vec![
            Script {
                events: vec![delta("one"), StreamEvent::Done {}],
                end: ScriptEnd::Close,
            },
            Script {
                events: vec![delta("two"), StreamEvent::Done {}],
                end: ScriptEnd::Close,
            },
        ]);
        let observed = Arc::new(Observed::default());
        let orch = orchestrator_with(transport, &observed);

        orch.send_message("a", None);
        let first = wait_terminal(&orch).await;
        orch.send_message("b", None);
        let second = wait_for(&orch, |t| !t.is_streaming && t.content == "two").await;

        assert_eq!(first.content, "one");
        assert_ne!(first.id, second.id);
        let completions = observed.completions.lock();
        assert_matches!(completions.as_slice(), [(a, _), (b, _)] => {
            assert_eq!(a.content, "one");
            assert_eq!(b.content, "two");
        });
    }
}
