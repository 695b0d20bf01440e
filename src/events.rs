//! Observability sink boundary: engine events, sinks, and the event bus.
//!
//! The executor emits an [`EngineEvent`] for every step trace, dispatch miss,
//! and contained action failure. Events flow through a flume channel into a
//! background listener that broadcasts to the configured [`EventSink`]s, so
//! producers never block on slow consumers.

use std::fmt;
use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::{sync::oneshot, task};

/// A structured engine event with its emission time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EngineEvent {
    /// Informational trace of one executed (or advanced) step.
    Step {
        context: String,
        step: usize,
        node: String,
        message: String,
        when: DateTime<Utc>,
    },
    /// No implementation registered for `(profile, code)`; the step was a
    /// no-op. Non-fatal, always observable.
    DispatchMiss {
        context: String,
        step: usize,
        profile: String,
        code: String,
        when: DateTime<Utc>,
    },
    /// An action failed and was contained at the dispatch boundary.
    ActionFailure {
        context: String,
        step: usize,
        action: String,
        message: String,
        when: DateTime<Utc>,
    },
    /// Engine-scoped diagnostic outside the per-step flow.
    Diagnostic {
        scope: String,
        message: String,
        when: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn step(
        context: impl Into<String>,
        step: usize,
        node: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineEvent::Step {
            context: context.into(),
            step,
            node: node.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }

    pub fn dispatch_miss(
        context: impl Into<String>,
        step: usize,
        profile: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        EngineEvent::DispatchMiss {
            context: context.into(),
            step,
            profile: profile.into(),
            code: code.into(),
            when: Utc::now(),
        }
    }

    pub fn action_failure(
        context: impl Into<String>,
        step: usize,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineEvent::ActionFailure {
            context: context.into(),
            step,
            action: action.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        EngineEvent::Diagnostic {
            scope: scope.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }

    /// Compact single-line rendering for text sinks.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            EngineEvent::Step {
                context,
                step,
                node,
                message,
                ..
            } => format!("[{context}@{step}] {node}: {message}"),
            EngineEvent::DispatchMiss {
                context,
                step,
                profile,
                code,
                ..
            } => format!("[{context}@{step}] no implementation for ({profile}, {code}); step skipped"),
            EngineEvent::ActionFailure {
                context,
                step,
                action,
                message,
                ..
            } => format!("[{context}@{step}] action {action} failed: {message}"),
            EngineEvent::Diagnostic { scope, message, .. } => format!("[{scope}] {message}"),
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Abstraction over an output target that consumes full events.
pub trait EventSink: Send + Sync {
    /// Handle a structured event. The sink decides how to serialize it.
    fn handle(&mut self, event: &EngineEvent) -> IoResult<()>;
}

/// Stdout sink, one rendered line per event.
pub struct StdOutSink {
    out: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self { out: io::stdout() }
    }
}

impl EventSink for StdOutSink {
    fn handle(&mut self, event: &EngineEvent) -> IoResult<()> {
        writeln!(self.out, "{}", event.render())?;
        self.out.flush()
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<EngineEvent>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events.
    pub fn snapshot(&self) -> Vec<EngineEvent> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &EngineEvent) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Channel-based sink for streaming to async consumers.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &EngineEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "event consumer hung up"))
    }
}

/// Receives events from producers and broadcasts them to all sinks from a
/// background task.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    sender: flume::Sender<EngineEvent>,
    receiver: flume::Receiver<EngineEvent>,
    listener: Mutex<Option<ListenerHandle>>,
}

struct ListenerHandle {
    stop: oneshot::Sender<()>,
    task: task::JoinHandle<()>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Create an event bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create an event bus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            sender,
            receiver,
            listener: Mutex::new(None),
        }
    }

    /// Dynamically add a sink.
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the sender side, handed to executors so they can emit.
    pub fn get_sender(&self) -> flume::Sender<EngineEvent> {
        self.sender.clone()
    }

    /// Spawn the background listener that fans events out to sinks.
    /// Idempotent: calling multiple times has no effect.
    pub fn listen_for_events(&self) {
        let mut active = self.listener.lock().expect("listener poisoned");
        if active.is_some() {
            return;
        }

        let receiver = self.receiver.clone();
        let sinks = self.sinks.clone();
        let (stop, mut stopped) = oneshot::channel();

        let task = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    incoming = receiver.recv_async() => match incoming {
                        Ok(event) => fan_out(&sinks, &event),
                        Err(_) => break,
                    }
                }
            }
            // Deliver anything already queued before shutting down.
            while let Ok(event) = receiver.try_recv() {
                fan_out(&sinks, &event);
            }
        });

        *active = Some(ListenerHandle { stop, task });
    }

    /// Stop the background listener after it drains the queued events.
    pub async fn stop_listener(&self) {
        let handle = self.listener.lock().expect("listener poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.stop.send(());
            let _ = handle.task.await;
        }
    }
}

fn fan_out(sinks: &Mutex<Vec<Box<dyn EventSink>>>, event: &EngineEvent) {
    for sink in sinks.lock().unwrap().iter_mut() {
        if let Err(error) = sink.handle(event) {
            tracing::warn!(%error, "event sink write failed");
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut active) = self.listener.lock()
            && let Some(handle) = active.take()
        {
            let _ = handle.stop.send(());
            handle.task.abort();
        }
    }
}
