//! Conversation engine — consumes one normalized event at a time, drives the
//! per-user intake state machine, and emits outbound actions plus at most
//! one record append.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::channels::{ButtonChoice, OutboundMessage};
use crate::conversation::event::{EventKind, InboundEvent};
use crate::conversation::session::{Session, Step};
use crate::conversation::store::SessionStore;
use crate::error::Result;
use crate::orders::{OrderIdGenerator, OrderRecord};
use crate::store::RecordStore;

/// Button ids offered on the welcome menu.
const BUTTON_SLOTS: &str = "slots";
const BUTTON_BOOK: &str = "book";
/// Booking buttons may carry a selected pickup date, e.g. `date_2026-08-09`.
const DATE_BUTTON_PREFIX: &str = "date_";

/// Bound on the redelivery dedupe cache.
const SEEN_CACHE_CAPACITY: usize = 512;

/// What one handled event produced.
#[derive(Debug)]
pub struct EngineOutput {
    pub outbound: Vec<OutboundMessage>,
    pub append: Option<OrderRecord>,
}

impl EngineOutput {
    fn empty() -> Self {
        Self {
            outbound: Vec::new(),
            append: None,
        }
    }
}

/// Drives the intake dialogue for every user.
pub struct ConversationEngine {
    sessions: Arc<SessionStore>,
    records: Arc<dyn RecordStore>,
    order_ids: OrderIdGenerator,
    operator: String,
    seen: Mutex<SeenCache>,
}

impl ConversationEngine {
    pub fn new(
        sessions: Arc<SessionStore>,
        records: Arc<dyn RecordStore>,
        order_ids: OrderIdGenerator,
        operator: String,
    ) -> Self {
        Self {
            sessions,
            records,
            order_ids,
            operator,
            seen: Mutex::new(SeenCache::default()),
        }
    }

    /// Handle one inbound event.
    ///
    /// Session state is mutated under the store lock before any delivery
    /// happens; the returned actions are executed by the dispatch layer.
    /// The only error path is order-id generation (sequential strategy),
    /// in which case the session is left intact so a redelivery can
    /// complete the order.
    pub async fn handle(&self, event: InboundEvent) -> Result<EngineOutput> {
        if !self.seen.lock().await.insert(&event.message_id) {
            debug!(message_id = %event.message_id, "Dropped redelivered event");
            return Ok(EngineOutput::empty());
        }

        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;

        match transition(sessions.get(&event.from), &event, now) {
            Outcome::Ignore => {
                debug!(from = %event.from, "Dropped unrecognized event");
                Ok(EngineOutput::empty())
            }
            Outcome::Reply(outbound) => Ok(EngineOutput {
                outbound,
                append: None,
            }),
            Outcome::Advance(session, reply) => {
                debug!(from = %event.from, step = %session.step, "Session advanced");
                sessions.put(session);
                Ok(EngineOutput {
                    outbound: vec![reply],
                    append: None,
                })
            }
            Outcome::Finalize(intake) => {
                let today = Local::now().date_naive();
                let order_id = match self.order_ids.next(self.records.as_ref(), today).await {
                    Ok(id) => id,
                    Err(e) => {
                        // Release the dedupe slot: the session is still at
                        // the address step, and a redelivery must be allowed
                        // to complete the order.
                        self.seen.lock().await.remove(&event.message_id);
                        return Err(e.into());
                    }
                };
                sessions.delete(&event.from);
                drop(sessions);

                let pickup_date = intake
                    .pickup_date
                    .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());
                let record = OrderRecord::new(
                    order_id,
                    pickup_date,
                    intake.name,
                    intake.mobile,
                    intake.address,
                    now,
                );
                info!(order_id = %record.order_id, "Order finalized");

                let outbound = vec![
                    confirmation(&event.from, &record),
                    operator_notice(&self.operator, &record),
                ];
                Ok(EngineOutput {
                    outbound,
                    append: Some(record),
                })
            }
        }
    }
}

// ── Transition table ────────────────────────────────────────────────

/// Fields collected by a completed intake, ready for order assembly.
#[derive(Debug, PartialEq, Eq)]
struct Intake {
    pickup_date: Option<String>,
    name: String,
    mobile: String,
    address: String,
}

/// What a single event does to the session for its address.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// No state change, no outbound action.
    Ignore,
    /// Informational reply, session untouched.
    Reply(Vec<OutboundMessage>),
    /// Store the session and send one prompt.
    Advance(Session, OutboundMessage),
    /// The final field arrived; promote to an order.
    Finalize(Intake),
}

/// Pure transition function over (current session, event).
fn transition(current: Option<&Session>, event: &InboundEvent, now: DateTime<Utc>) -> Outcome {
    match (&event.kind, current) {
        // The menu is stateless informational: a greeting re-shows it from
        // any state and never creates or destroys a session.
        (EventKind::Greeting, _) => Outcome::Reply(vec![welcome(&event.from)]),

        (EventKind::Button { id }, None) => match parse_menu_button(id) {
            MenuButton::Slots => Outcome::Reply(vec![slots_info(&event.from)]),
            MenuButton::Book { date } => {
                let session = Session::new(&event.from, date, now);
                Outcome::Advance(session, name_prompt(&event.from))
            }
            MenuButton::Unrecognized => Outcome::Ignore,
        },

        // Buttons mid-intake are dropped; the expected input is free text.
        (EventKind::Button { .. }, Some(_)) => Outcome::Ignore,

        (EventKind::Text(text), Some(session)) => {
            let input = text.trim();
            if input.is_empty() {
                return Outcome::Ignore;
            }
            match session.step {
                Step::AwaitingName => {
                    let name = title_case(input);
                    let prompt = mobile_prompt(&event.from, &name);
                    let mut next = session.clone();
                    next.name = Some(name);
                    next.step = Step::AwaitingMobile;
                    next.last_activity = now;
                    Outcome::Advance(next, prompt)
                }
                Step::AwaitingMobile => {
                    // Accepted as-is, no format validation.
                    let mut next = session.clone();
                    next.mobile = Some(input.to_string());
                    next.step = Step::AwaitingAddress;
                    next.last_activity = now;
                    Outcome::Advance(next, address_prompt(&event.from))
                }
                Step::AwaitingAddress => Outcome::Finalize(Intake {
                    pickup_date: session.pickup_date.clone(),
                    name: session.name.clone().unwrap_or_default(),
                    mobile: session.mobile.clone().unwrap_or_default(),
                    address: input.to_string(),
                }),
            }
        }

        // Free text from an address with no session and no greeting match.
        (EventKind::Text(_), None) => Outcome::Ignore,
    }
}

/// Recognized welcome-menu button ids.
#[derive(Debug, PartialEq, Eq)]
enum MenuButton {
    Slots,
    Book { date: Option<String> },
    Unrecognized,
}

fn parse_menu_button(id: &str) -> MenuButton {
    if id == BUTTON_SLOTS {
        return MenuButton::Slots;
    }
    if id == BUTTON_BOOK {
        return MenuButton::Book { date: None };
    }
    if let Some(raw) = id.strip_prefix(DATE_BUTTON_PREFIX) {
        return match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => MenuButton::Book {
                date: Some(date.format("%Y-%m-%d").to_string()),
            },
            Err(_) => MenuButton::Unrecognized,
        };
    }
    MenuButton::Unrecognized
}

/// Trim and title-case a name: first letter of each word upper, rest lower.
fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Message texts ───────────────────────────────────────────────────

fn welcome(to: &str) -> OutboundMessage {
    OutboundMessage::with_choices(
        to,
        "👋 Welcome to Sparkle Laundry!\nHow can we help you today?",
        vec![
            ButtonChoice::new(BUTTON_SLOTS, "Check Slots"),
            ButtonChoice::new(BUTTON_BOOK, "Book Laundry"),
        ],
    )
}

fn slots_info(to: &str) -> OutboundMessage {
    OutboundMessage::text(
        to,
        "🧺 Pickup slots:\n• Today 4–6 PM\n• Tomorrow 10–12 AM\n• Tomorrow 4–6 PM\n\nTap *Book Laundry* to reserve one.",
    )
}

fn name_prompt(to: &str) -> OutboundMessage {
    OutboundMessage::text(to, "📝 Great! Please send your *Full Name*.")
}

fn mobile_prompt(to: &str, name: &str) -> OutboundMessage {
    OutboundMessage::text(to, format!("📱 Thanks, {name}! Now send your *Mobile Number*."))
}

fn address_prompt(to: &str) -> OutboundMessage {
    OutboundMessage::text(to, "🏠 Almost done! Please send your *Pickup Address*.")
}

fn order_summary(record: &OrderRecord) -> String {
    format!(
        "🧾 Order ID: {}\n📅 Pickup: {}\n👤 Name: {}\n📱 Mobile: {}\n🏠 Address: {}",
        record.order_id, record.pickup_date, record.name, record.mobile, record.address
    )
}

fn confirmation(to: &str, record: &OrderRecord) -> OutboundMessage {
    OutboundMessage::text(
        to,
        format!(
            "✅ Your laundry order is booked!\n\n{}\n\nOur team will contact you soon.",
            order_summary(record)
        ),
    )
}

fn operator_notice(operator: &str, record: &OrderRecord) -> OutboundMessage {
    OutboundMessage::text(operator, format!("🆕 New order received!\n\n{}", order_summary(record)))
}

// ── Redelivery dedupe ───────────────────────────────────────────────

/// Bounded set of recently seen platform message ids.
#[derive(Default)]
struct SeenCache {
    set: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenCache {
    /// Record an id. Returns `false` if it was already present. Empty ids
    /// (payloads without one) are never deduplicated.
    fn insert(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }
        if !self.set.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        if self.order.len() > SEEN_CACHE_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }

    /// Forget an id, re-admitting a future redelivery.
    fn remove(&mut self, id: &str) {
        if self.set.remove(id) {
            self.order.retain(|seen| seen != id);
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
