//! Conversation lifecycle and coordination.
//!
//! The controller owns every piece of per-session messaging state: the
//! selection state machine, the conversation store, the inbound and
//! outbound delivery filters, the presence signaler, and the roster with
//! its unread markers. All access is serialized by one driver loop; slow
//! work (history fetches, acknowledgment waits) runs elsewhere and comes
//! back as a completion carrying a ticket, which is checked against the
//! current generation before it may touch state.
//!
//! State changes surface as [`ConversationEvent`] values on a channel
//! handed out at construction. The frontend decides how to render them;
//! the controller never blocks on the consumer.

use crate::channel::{AckFuture, EventChannel, SendAck, ServerEvent};
use crate::chat::filter::{dedup_history, Admission, DeliveryFilter};
use crate::chat::presence::PresenceSignaler;
use crate::chat::store::ConversationStore;
use crate::chat::types::{Message, MessageKey, MessageOrigin, MessageView, Notice, UserId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::roster::{Counterpart, Roster, RosterEntry};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which conversation, if any, the session is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// Nothing selected; roster fetch pending or empty.
    NoCounterpart,
    /// A counterpart was selected and its history fetch is outstanding.
    Loading {
        /// The selected counterpart.
        counterpart_id: UserId,
        /// Selection generation the fetch belongs to.
        generation: u64,
    },
    /// History installed; the conversation is live.
    Active {
        /// The selected counterpart.
        counterpart_id: UserId,
        /// Selection generation of this conversation.
        generation: u64,
    },
}

/// Claim ticket for an outstanding history fetch.
///
/// `apply_history` only accepts a result whose ticket still matches the
/// current selection generation; anything else is a late completion for a
/// conversation the user has already left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    /// Counterpart the fetch was issued for.
    pub counterpart_id: UserId,
    /// Selection generation at issue time.
    pub generation: u64,
}

/// Claim ticket for an outstanding send acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    /// Duplicate-rule identity of the optimistic entry.
    pub key: MessageKey,
    /// Selection generation at send time.
    pub generation: u64,
}

/// A send that was emitted and is now waiting for its acknowledgment.
///
/// The driver awaits `ack` off the controller and feeds the outcome back
/// through [`ConversationController::apply_send_ack`] with the ticket.
#[derive(Debug)]
pub struct PendingSend {
    /// Ticket to return with the acknowledgment.
    pub ticket: SendTicket,
    /// Single-shot acknowledgment from the channel.
    pub ack: AckFuture,
}

/// State change notifications for the frontend.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// The channel confirmed the session.
    Connected {
        /// Identity the server bound the session to.
        user_id: UserId,
    },
    /// Roster entries were replaced (unread markers survive).
    RosterUpdated {
        /// Current rows joined with their unread markers.
        entries: Vec<RosterEntry>,
    },
    /// A counterpart was selected and its history fetch started.
    ConversationLoading {
        /// The selected counterpart.
        counterpart_id: UserId,
    },
    /// History was installed and the conversation is now active.
    HistoryLoaded {
        /// The active counterpart.
        counterpart_id: UserId,
        /// Number of installed messages.
        count: usize,
    },
    /// A message entered the active conversation (render and scroll).
    MessageAppended {
        /// Render-ready entry.
        view: MessageView,
    },
    /// The active counterpart's typing indicator changed.
    TypingChanged {
        /// New indicator state.
        typing: bool,
    },
    /// An unread marker changed.
    UnreadChanged {
        /// The counterpart the marker belongs to.
        counterpart_id: UserId,
        /// New count; zero means cleared.
        unread: u32,
    },
    /// The send control was disabled or re-enabled.
    SendStateChanged {
        /// Whether sending is currently allowed.
        enabled: bool,
    },
    /// A user-facing notice. Display timing belongs to the frontend.
    NoticeRaised(Notice),
}

/// Owner of all per-session conversation state.
pub struct ConversationController {
    channel: Arc<dyn EventChannel>,
    local_user: UserId,
    state: SelectionState,
    generation: u64,
    store: ConversationStore,
    inbound: DeliveryFilter,
    outbound: DeliveryFilter,
    presence: PresenceSignaler,
    roster: Roster,
    send_enabled: bool,
    events: mpsc::UnboundedSender<ConversationEvent>,
}

impl ConversationController {
    /// Create a controller over the given channel.
    ///
    /// Returns the controller and the receiving end of its event stream.
    pub fn new(
        channel: Arc<dyn EventChannel>,
        config: &Config,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let local_user = channel.local_user().clone();
        let presence = PresenceSignaler::new(
            Arc::clone(&channel),
            config.typing_idle(),
            config.typing_expiry(),
        );

        let controller = Self {
            channel,
            local_user,
            state: SelectionState::NoCounterpart,
            generation: 0,
            store: ConversationStore::new(),
            inbound: DeliveryFilter::new(config.inbound_window(), config.strict_dedup),
            outbound: DeliveryFilter::new(config.outbound_window(), config.strict_dedup),
            presence,
            roster: Roster::new(),
            send_enabled: true,
            events: event_tx,
        };
        (controller, event_rx)
    }

    /// The local user's ID.
    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    /// Current selection state.
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// The active counterpart, if the conversation is live.
    pub fn active_counterpart(&self) -> Option<&UserId> {
        match &self.state {
            SelectionState::Active { counterpart_id, .. } => Some(counterpart_id),
            _ => None,
        }
    }

    /// Whether the send control is currently enabled.
    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    /// Whether the active counterpart is shown as typing.
    pub fn is_remote_typing(&self) -> bool {
        self.presence.is_remote_typing()
    }

    /// Render-ready view of the active conversation.
    pub fn render(&self) -> Vec<MessageView> {
        self.store.render(&self.local_user)
    }

    /// Current roster rows joined with their unread markers.
    pub fn roster_entries(&self) -> Vec<RosterEntry> {
        self.roster.entries()
    }

    /// Replace the roster with fresh API data. Unread markers survive.
    pub fn update_roster(&mut self, entries: Vec<Counterpart>) {
        self.roster.replace_entries(entries);
        self.emit(ConversationEvent::RosterUpdated {
            entries: self.roster.entries(),
        });
    }

    /// Select a counterpart and start a new conversation generation.
    ///
    /// Rejects unapproved (or unknown) counterparts with a notice and no
    /// state change. On success the store, both filters and the presence
    /// state are fully reset, the unread marker is consumed, and the
    /// returned ticket must accompany the history fetch result into
    /// [`Self::apply_history`].
    pub fn select_counterpart(&mut self, id: &UserId) -> Result<HistoryTicket> {
        if !self.roster.is_approved(id) {
            return Err(self.reject(Error::NotApproved));
        }

        self.generation += 1;
        let was_typing = self.presence.is_remote_typing();

        self.store.reset(id.clone());
        self.inbound.reset();
        self.outbound.reset();
        self.presence.set_counterpart(Some(id.clone()));
        self.state = SelectionState::Loading {
            counterpart_id: id.clone(),
            generation: self.generation,
        };

        if was_typing {
            self.emit(ConversationEvent::TypingChanged { typing: false });
        }
        if self.roster.clear_unread(id) {
            self.emit(ConversationEvent::UnreadChanged {
                counterpart_id: id.clone(),
                unread: 0,
            });
        }
        self.emit(ConversationEvent::ConversationLoading {
            counterpart_id: id.clone(),
        });

        tracing::info!(counterpart = %id, generation = self.generation, "conversation selected");
        Ok(HistoryTicket {
            counterpart_id: id.clone(),
            generation: self.generation,
        })
    }

    /// Install a history fetch result.
    ///
    /// A result whose ticket no longer matches the current generation is
    /// dropped silently. Success sorts and dedups the rows, installs them,
    /// seeds the inbound filter's seen set, and reports the messages as
    /// seen. Failure returns the selection to no-counterpart with a notice.
    pub async fn apply_history(&mut self, ticket: &HistoryTicket, result: Result<Vec<Message>>) {
        let current = matches!(
            &self.state,
            SelectionState::Loading { generation, .. } if *generation == ticket.generation
        );
        if !current {
            tracing::debug!(
                counterpart = %ticket.counterpart_id,
                generation = ticket.generation,
                "stale history result dropped"
            );
            return;
        }

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, counterpart = %ticket.counterpart_id, "history fetch failed");
                self.state = SelectionState::NoCounterpart;
                self.store.clear();
                self.presence.set_counterpart(None);
                self.emit(ConversationEvent::NoticeRaised(Notice::error(format!(
                    "could not load the conversation: {err}"
                ))));
                return;
            }
        };

        let rows = dedup_history(rows);
        for row in &rows {
            self.inbound.remember(row);
        }
        let count = self.store.load_history(rows);
        self.state = SelectionState::Active {
            counterpart_id: ticket.counterpart_id.clone(),
            generation: ticket.generation,
        };

        // Arrivals during the fetch were booked as unread; the fetched
        // history already contains them.
        if self.roster.clear_unread(&ticket.counterpart_id) {
            self.emit(ConversationEvent::UnreadChanged {
                counterpart_id: ticket.counterpart_id.clone(),
                unread: 0,
            });
        }
        self.emit(ConversationEvent::HistoryLoaded {
            counterpart_id: ticket.counterpart_id.clone(),
            count,
        });

        if let Err(err) = self.presence.mark_seen().await {
            tracing::debug!(error = %err, "mark_seen not delivered");
        }
    }

    /// Send a message to the active counterpart.
    ///
    /// Appends the optimistic entry and disables the send control before
    /// emitting; the returned [`PendingSend`] carries the acknowledgment
    /// future. Validation and filter rejections raise a notice and return
    /// the matching error without touching the transport.
    pub async fn send(&mut self, text: &str) -> Result<PendingSend> {
        let counterpart_id = match &self.state {
            SelectionState::Active { counterpart_id, .. } => counterpart_id.clone(),
            SelectionState::Loading { .. } => return Err(self.reject(Error::NotReady)),
            SelectionState::NoCounterpart => return Err(self.reject(Error::NoCounterpart)),
        };
        if !self.roster.is_approved(&counterpart_id) {
            return Err(self.reject(Error::NotApproved));
        }
        let body = text.trim();
        if body.is_empty() {
            return Err(self.reject(Error::EmptyMessage));
        }
        if !self.send_enabled {
            return Err(self.reject(Error::SendInFlight));
        }

        let message = Message::new_outgoing(
            self.local_user.clone(),
            counterpart_id.clone(),
            body.to_string(),
        );
        match self.outbound.admit(&message) {
            Admission::Admitted => {}
            Admission::Duplicate => return Err(self.reject(Error::DuplicateMessage)),
            Admission::Throttled => return Err(self.reject(Error::Throttled)),
        }

        // Optimistic append; the registration makes the server echo land
        // as a suppressed verdict instead of a second entry.
        let key = message.key();
        self.inbound.expect_echo(&message);
        self.store.append(message.clone(), MessageOrigin::LocalEcho);
        self.emit(ConversationEvent::MessageAppended {
            view: MessageView {
                sender_id: message.sender_id.clone(),
                body: message.body.clone(),
                created_at: message.created_at,
                mine: true,
                confirmed: false,
            },
        });

        self.set_send_enabled(false);
        match self.channel.send_message(&counterpart_id, body).await {
            Ok(ack) => Ok(PendingSend {
                ticket: SendTicket {
                    key,
                    generation: self.generation,
                },
                ack,
            }),
            Err(err) => {
                self.set_send_enabled(true);
                self.emit(ConversationEvent::NoticeRaised(Notice::error(format!(
                    "message not sent: {err}"
                ))));
                Err(err)
            }
        }
    }

    /// Apply a send acknowledgment (or its loss).
    ///
    /// Re-enables the send control unconditionally. A stale-generation
    /// ticket, or one whose key no longer resolves in the store, is then
    /// dropped silently. An error acknowledgment raises a notice but never
    /// rolls back the optimistic entry.
    pub fn apply_send_ack(&mut self, ticket: &SendTicket, ack: Option<SendAck>) {
        self.set_send_enabled(true);

        if ticket.generation != self.generation {
            tracing::debug!(generation = ticket.generation, "stale send ack dropped");
            return;
        }

        let Some(ack) = ack else {
            self.emit(ConversationEvent::NoticeRaised(Notice::error(
                "message delivery was not confirmed",
            )));
            return;
        };

        if ack.ok {
            if !self.store.confirm(&ticket.key) {
                tracing::debug!("ack target no longer in store");
            }
        } else if self.store.contains(&ticket.key) {
            let reason = ack.error.as_deref().unwrap_or("message was not delivered");
            self.emit(ConversationEvent::NoticeRaised(Notice::error(reason)));
        }
    }

    /// Apply one inbound channel event.
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { ok, user_id } => {
                if ok {
                    self.emit(ConversationEvent::Connected { user_id });
                } else {
                    self.emit(ConversationEvent::NoticeRaised(Notice::error(
                        "the channel rejected the session",
                    )));
                }
            }
            ServerEvent::NewMessage(message) => self.handle_new_message(message),
            ServerEvent::TypingUpdate {
                from_id, is_typing, ..
            } => {
                if let Some(typing) = self.presence.handle_typing_update(&from_id, is_typing) {
                    self.emit(ConversationEvent::TypingChanged { typing });
                }
            }
            ServerEvent::MessagesSeen { by } => {
                if self.presence.handle_messages_seen(&by) {
                    self.emit(ConversationEvent::TypingChanged { typing: false });
                }
            }
        }
    }

    /// Report local input activity (typing signal with idle timeout).
    pub async fn input_activity(&mut self) -> Result<()> {
        self.presence.input_activity().await
    }

    /// Periodic housekeeping; clears an expired remote typing indicator.
    pub fn tick(&mut self) {
        if self.presence.sweep_expired() {
            self.emit(ConversationEvent::TypingChanged { typing: false });
        }
    }

    fn handle_new_message(&mut self, message: Message) {
        let active = self
            .active_counterpart()
            .map(|id| message.is_between(&self.local_user, id))
            .unwrap_or(false);

        if !active {
            // Not for the conversation on screen; book it on the roster.
            let other = message.counterpart_of(&self.local_user).clone();
            let unread = self.roster.mark_unread(&other);
            self.emit(ConversationEvent::UnreadChanged {
                counterpart_id: other,
                unread,
            });
            return;
        }

        match self.inbound.admit(&message) {
            Admission::Admitted => {
                let view = MessageView {
                    sender_id: message.sender_id.clone(),
                    body: message.body.clone(),
                    created_at: message.created_at,
                    mine: message.is_from(&self.local_user),
                    confirmed: true,
                };
                self.store.append(message, MessageOrigin::Live);
                self.emit(ConversationEvent::MessageAppended { view });
            }
            Admission::Duplicate | Admission::Throttled if message.is_from(&self.local_user) => {
                // Server echo of the optimistic entry, whichever rule
                // caught it.
                if self.store.confirm(&message.key()) {
                    tracing::debug!("echo confirmed optimistic entry");
                }
            }
            Admission::Duplicate | Admission::Throttled => {}
        }
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        if self.send_enabled != enabled {
            self.send_enabled = enabled;
            self.emit(ConversationEvent::SendStateChanged { enabled });
        }
    }

    fn reject(&self, err: Error) -> Error {
        self.emit(ConversationEvent::NoticeRaised(Notice::error(
            err.to_string(),
        )));
        err
    }

    fn emit(&self, event: ConversationEvent) {
        // The receiver living shorter than the controller is fine.
        let _ = self.events.send(event);
    }
}
