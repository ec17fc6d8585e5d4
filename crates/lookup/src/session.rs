use crate::number::normalize;
use crate::resolver::CallerLookup;
use crate::summary::{fallback_message, summarize, CallerSummary};
use async_trait::async_trait;
use callscreen_protocol::{CallEvent, PhoneState};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Companion channel closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Receives call notifications for the companion application.
///
/// Delivery is fire-and-forget: the session logs failures and carries on.
#[async_trait]
pub trait CompanionSink: Send + Sync {
    async fn emit(&self, event: CallEvent) -> Result<(), SinkError>;
}

/// Forwards events into an in-process channel owned by the consumer.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CallEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl CompanionSink for ChannelSink {
    async fn emit(&self, event: CallEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }
}

/// Discards every event.
pub struct NullSink;

#[async_trait]
impl CompanionSink for NullSink {
    async fn emit(&self, _event: CallEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum ScreenUpdate {
    Loading { number: String },
    Caller { number: String, summary: CallerSummary },
    Fallback { number: String, message: String },
    Hidden,
}

/// What the session currently shows, as far as screen actions are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Showing {
    Nothing,
    Pending { number: String },
    Lead { number: String, lead_id: String },
    Unknown { number: String },
}

struct ScreenState {
    generation: u64,
    showing: Showing,
}

fn lock_state(state: &Mutex<ScreenState>) -> MutexGuard<'_, ScreenState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records and sends `update` if `generation` is still current. The check and
/// the send happen under one lock, so a superseded result never follows the
/// update that replaced it.
fn deliver(
    state: &Mutex<ScreenState>,
    updates: &mpsc::UnboundedSender<ScreenUpdate>,
    generation: u64,
    showing: Showing,
    update: ScreenUpdate,
) -> bool {
    let mut state = lock_state(state);
    if state.generation != generation {
        return false;
    }
    state.showing = showing;
    if updates.send(update).is_err() {
        log::debug!("Screen update receiver dropped");
    }
    true
}

/// Turns phone-state events into screen updates and companion notifications.
///
/// At most one lookup is in flight. A new ringing event, an idle event or a
/// dismissal abandons the previous lookup; its result is never delivered.
pub struct ScreeningSession {
    lookup: CallerLookup,
    sink: Arc<dyn CompanionSink>,
    updates: mpsc::UnboundedSender<ScreenUpdate>,
    inflight: Option<JoinHandle<()>>,
    state: Arc<Mutex<ScreenState>>,
}

impl ScreeningSession {
    pub fn new(
        lookup: CallerLookup,
        sink: Arc<dyn CompanionSink>,
    ) -> (Self, mpsc::UnboundedReceiver<ScreenUpdate>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let session = Self {
            lookup,
            sink,
            updates,
            inflight: None,
            state: Arc::new(Mutex::new(ScreenState {
                generation: 0,
                showing: Showing::Nothing,
            })),
        };
        (session, rx)
    }

    pub async fn handle(&mut self, state: PhoneState) {
        match state.ringing_number() {
            Some(raw) => {
                let raw = raw.to_string();
                self.on_ringing(&raw).await;
            }
            None => self.on_idle().await,
        }
    }

    /// Hides the current screen and abandons any lookup without ending the call.
    pub fn dismiss(&mut self) {
        self.replace_screen(Showing::Nothing, ScreenUpdate::Hidden);
    }

    /// The screen's lead button: edit the caller's lead when one is shown,
    /// otherwise start a new lead for the number. Hides the screen.
    ///
    /// Returns `false` when nothing is on screen.
    pub async fn lead_action(&mut self) -> bool {
        let event = match self.showing() {
            Showing::Lead { number, lead_id } => CallEvent::edit_lead(number, lead_id),
            Showing::Pending { number } | Showing::Unknown { number } => {
                CallEvent::new_lead(number)
            }
            Showing::Nothing => {
                log::debug!("Lead action ignored: no screen shown");
                return false;
            }
        };
        self.act(event).await;
        true
    }

    /// The screen's "show more" link: lead details for a known caller, call
    /// details otherwise. Hides the screen.
    pub async fn show_details(&mut self) -> bool {
        let event = match self.showing() {
            Showing::Lead { number, lead_id } => CallEvent::show_lead_details(number, lead_id),
            Showing::Pending { number } | Showing::Unknown { number } => {
                CallEvent::show_call_details(number)
            }
            Showing::Nothing => {
                log::debug!("Details ignored: no screen shown");
                return false;
            }
        };
        self.act(event).await;
        true
    }

    #[must_use]
    pub fn is_lookup_pending(&self) -> bool {
        self.inflight.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn on_ringing(&mut self, raw: &str) {
        let canonical = normalize(raw);
        let number = if canonical.is_empty() {
            raw.to_string()
        } else {
            canonical.to_string()
        };
        log::info!("Handling incoming call: {raw} (cleaned: {number})");

        let generation = self.replace_screen(
            Showing::Pending {
                number: number.clone(),
            },
            ScreenUpdate::Loading {
                number: number.clone(),
            },
        );

        if canonical.is_empty() {
            deliver(
                &self.state,
                &self.updates,
                generation,
                Showing::Unknown {
                    number: number.clone(),
                },
                ScreenUpdate::Fallback {
                    message: fallback_message(&number),
                    number: number.clone(),
                },
            );
        } else {
            self.inflight = Some(self.spawn_lookup(raw.to_string(), number.clone(), generation));
        }

        self.notify(CallEvent::incoming(number)).await;
    }

    async fn on_idle(&mut self) {
        log::info!("Call ended");
        self.replace_screen(Showing::Nothing, ScreenUpdate::Hidden);
        self.notify(CallEvent::ended()).await;
    }

    async fn act(&mut self, event: CallEvent) {
        log::info!("Screen action: {}", event.kind());
        self.notify(event).await;
        self.dismiss();
    }

    fn spawn_lookup(&self, raw: String, number: String, generation: u64) -> JoinHandle<()> {
        let lookup = self.lookup.clone();
        let updates = self.updates.clone();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let (showing, update) = match lookup.lookup(&raw).await {
                Ok(result) => match summarize(&result) {
                    Some(summary) => {
                        log::debug!("Found lead data: {}", summary.name);
                        let showing = Showing::Lead {
                            number: number.clone(),
                            lead_id: summary.lead_id.clone(),
                        };
                        (showing, ScreenUpdate::Caller { number, summary })
                    }
                    None => {
                        log::debug!("No lead data found for: {number}");
                        unknown_screen(number)
                    }
                },
                Err(err) => {
                    log::error!("Error fetching caller data for {number}: {err}");
                    unknown_screen(number)
                }
            };

            if !deliver(&state, &updates, generation, showing, update) {
                log::debug!("Discarding lookup result for superseded call");
            }
        })
    }

    /// Aborts the in-flight lookup, starts a new screen generation and sends
    /// `update` as its first screen. Returns the new generation.
    fn replace_screen(&mut self, showing: Showing, update: ScreenUpdate) -> u64 {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
        let mut state = lock_state(&self.state);
        state.generation += 1;
        state.showing = showing;
        if self.updates.send(update).is_err() {
            log::debug!("Screen update receiver dropped");
        }
        state.generation
    }

    fn showing(&self) -> Showing {
        lock_state(&self.state).showing.clone()
    }

    async fn notify(&self, event: CallEvent) {
        let kind = event.kind();
        if let Err(err) = self.sink.emit(event).await {
            log::warn!("Error notifying companion about {kind}: {err}");
        }
    }
}

fn unknown_screen(number: String) -> (Showing, ScreenUpdate) {
    let showing = Showing::Unknown {
        number: number.clone(),
    };
    let update = ScreenUpdate::Fallback {
        message: fallback_message(&number),
        number,
    };
    (showing, update)
}

impl Drop for ScreeningSession {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}
