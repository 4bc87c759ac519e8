//! Per-service deployment coordinator.
//!
//! One tokio task owns all run/queue state for one service, so the state
//! machine below is free of locks and data races. External callers interact
//! only through the mailbox: `Attach` registers an observer (and starts or
//! queues a run), `Shutdown` retires the coordinator once the active run, if
//! any, has finished.
//!
//! Coalescing: any burst of attaches arriving while a run is active collapses
//! into a single queued follow-up run. Queued observers see the tail of the
//! active run first, then the whole follow-up run.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{debug, info, warn};

use crate::metrics as metric_names;
use crate::model::{DeploySpec, Event, QUEUED_NOTICE};
use crate::runner;

/// Capacity of one observer's event channel. Sized so a briefly slow HTTP
/// client absorbs a burst of output without stalling the broadcast loop.
pub const OBSERVER_BUFFER: usize = 64;

/// Mailbox capacity. Attaches beyond this briefly await the actor loop.
const MAILBOX_BUFFER: usize = 16;

/// How long one broadcast waits on a full observer channel before evicting
/// the observer. Bounds the damage a wedged client can do to everyone else.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages accepted by the coordinator task.
enum Command {
    Attach(mpsc::Sender<Event>),
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
#[error("coordinator is shut down")]
pub struct AttachError;

/// Cloneable handle to one service's coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    mailbox: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Spawns the coordinator task for `service` and returns its handle.
    ///
    /// `spec` is shared with the registry: metadata refreshes swap it in
    /// place and the next run picks the new value up.
    pub fn spawn(service: String, spec: Arc<ArcSwap<DeploySpec>>) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_BUFFER);

        let actor = Coordinator {
            service,
            spec,
            mailbox: rx,
            run_events: None,
            current: Vec::new(),
            next: Vec::new(),
            shutting_down: false,
            mailbox_closed: false,
        };
        tokio::task::spawn(actor.run());

        Self { mailbox: tx }
    }

    /// Registers a new observer and returns its event stream.
    ///
    /// Starts a run if the service is idle, otherwise coalesces into the
    /// queued follow-up. Fails only when the coordinator has shut down.
    pub async fn attach(&self) -> Result<mpsc::Receiver<Event>, AttachError> {
        let (tx, rx) = mpsc::channel(OBSERVER_BUFFER);
        self.mailbox
            .send(Command::Attach(tx))
            .await
            .map_err(|_| AttachError)?;
        Ok(rx)
    }

    /// Signals the coordinator to retire. Non-blocking: if the mailbox is
    /// momentarily full the message is delivered from a helper task so the
    /// caller (registry sync, holding its write lock) never waits.
    pub fn shutdown(&self) {
        if self.mailbox.try_send(Command::Shutdown).is_ok() {
            return;
        }
        let mailbox = self.mailbox.clone();
        tokio::task::spawn(async move {
            let _ = mailbox.send(Command::Shutdown).await;
        });
    }
}

/// Outcome of one `select!` round, pulled out of the macro so handler
/// methods can borrow the actor mutably.
enum Input {
    Command(Option<Command>),
    RunEvent(Option<Event>),
}

struct Coordinator {
    service: String,
    spec: Arc<ArcSwap<DeploySpec>>,
    mailbox: mpsc::Receiver<Command>,
    /// Event source of the active run; `None` while idle.
    run_events: Option<mpsc::Receiver<Event>>,
    /// Observers of the active run, in attach order.
    current: Vec<mpsc::Sender<Event>>,
    /// Observers coalesced into the queued follow-up run, in attach order.
    next: Vec<mpsc::Sender<Event>>,
    shutting_down: bool,
    /// Set once `recv` yields `None`; the mailbox branch goes quiet so a
    /// closed channel does not spin the loop while a run drains.
    mailbox_closed: bool,
}

impl Coordinator {
    async fn run(mut self) {
        loop {
            let input = tokio::select! {
                cmd = recv_command(&mut self.mailbox, self.mailbox_closed) => Input::Command(cmd),
                event = next_run_event(self.run_events.as_mut()) => Input::RunEvent(event),
            };

            match input {
                Input::Command(Some(Command::Attach(observer))) => self.on_attach(observer),
                Input::Command(Some(Command::Shutdown)) => {
                    self.shutting_down = true;
                    if self.run_events.is_none() {
                        break;
                    }
                }
                Input::Command(None) => {
                    self.shutting_down = true;
                    self.mailbox_closed = true;
                    if self.run_events.is_none() {
                        break;
                    }
                }
                Input::RunEvent(Some(event)) => self.broadcast(event).await,
                Input::RunEvent(None) => {
                    if self.on_run_finished() {
                        break;
                    }
                }
            }
        }

        info!(
            component = "coordinator",
            event = "stopped",
            service = %self.service,
            "coordinator stopped"
        );
    }

    fn on_attach(&mut self, observer: mpsc::Sender<Event>) {
        if self.shutting_down {
            // Entry already left the registry; dropping the sender ends the
            // observer's stream immediately.
            debug!(
                component = "coordinator",
                event = "attach_after_shutdown",
                service = %self.service,
                "observer attached during shutdown, released"
            );
            return;
        }

        metrics::counter!(metric_names::OBSERVER_ATTACHES).increment(1);

        if self.run_events.is_some() {
            // Coalesce: the burst shares one follow-up run regardless of
            // how many observers arrive.
            if observer.try_send(Event::info(QUEUED_NOTICE)).is_err() {
                return;
            }
            self.next.push(observer);
            metrics::counter!(metric_names::OBSERVER_COALESCED).increment(1);
            debug!(
                component = "coordinator",
                event = "attach_queued",
                service = %self.service,
                queued = self.next.len(),
                "deployment in progress, observer queued"
            );
        } else {
            self.current.push(observer);
            self.start_run();
        }
    }

    fn start_run(&mut self) {
        let spec = self.spec.load_full();
        info!(
            component = "coordinator",
            event = "run_started",
            service = %self.service,
            command = %spec.command,
            "deployment run started"
        );
        metrics::counter!(metric_names::RUNS_STARTED).increment(1);
        self.run_events = Some(runner::run(&spec.command, &spec.args));
    }

    /// Delivers one event to every interested observer: current listeners
    /// first, then queued listeners, each group in attach order.
    async fn broadcast(&mut self, event: Event) {
        Self::fan_out(&self.service, &mut self.current, &event).await;
        Self::fan_out(&self.service, &mut self.next, &event).await;
    }

    async fn fan_out(service: &str, observers: &mut Vec<mpsc::Sender<Event>>, event: &Event) {
        if observers.is_empty() {
            return;
        }

        let mut kept = Vec::with_capacity(observers.len());
        for observer in observers.drain(..) {
            match observer.send_timeout(event.clone(), SEND_TIMEOUT).await {
                Ok(()) => kept.push(observer),
                Err(SendTimeoutError::Timeout(_)) => {
                    metrics::counter!(metric_names::OBSERVER_DROPPED).increment(1);
                    warn!(
                        component = "coordinator",
                        event = "observer_stalled",
                        service = service,
                        "observer failed to drain its buffer in time, evicted"
                    );
                }
                Err(SendTimeoutError::Closed(_)) => {
                    metrics::counter!(metric_names::OBSERVER_DROPPED).increment(1);
                    debug!(
                        component = "coordinator",
                        event = "observer_gone",
                        service = service,
                        "observer disconnected, evicted"
                    );
                }
            }
        }
        *observers = kept;
    }

    /// The active run's event stream closed. Returns `true` when the actor
    /// task should exit.
    fn on_run_finished(&mut self) -> bool {
        metrics::counter!(metric_names::RUNS_FINISHED).increment(1);
        self.run_events = None;
        // Dropping the senders closes every current observer's stream.
        self.current.clear();

        if self.shutting_down {
            // Queued observers are released without their follow-up run;
            // their streams end after the terminal event they already saw.
            self.next.clear();
            return true;
        }

        if self.next.is_empty() {
            debug!(
                component = "coordinator",
                event = "idle",
                service = %self.service,
                "no queued observers, coordinator idle"
            );
            return false;
        }

        self.current = std::mem::take(&mut self.next);
        info!(
            component = "coordinator",
            event = "follow_up_promoted",
            service = %self.service,
            observers = self.current.len(),
            "queued observers promoted, follow-up run starting"
        );
        self.start_run();
        false
    }
}

/// Resolves to the next event of the active run, or never while idle.
async fn next_run_event(run_events: Option<&mut mpsc::Receiver<Event>>) -> Option<Event> {
    match run_events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves to the next mailbox command, or never once the mailbox closed.
async fn recv_command(mailbox: &mut mpsc::Receiver<Command>, closed: bool) -> Option<Command> {
    if closed {
        std::future::pending().await
    } else {
        mailbox.recv().await
    }
}
