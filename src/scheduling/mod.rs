//! Interview slot scheduling.
//!
//! [`store::SlotStore`] owns slot and booking persistence.
//! [`SchedulingCoordinator`] layers conversation defaults on top of it and
//! turns each [`SchedulingIntent`] into exactly one [`SchedulingOutcome`].

pub mod format;
pub mod phone;
pub mod seed;
pub mod slot;
pub mod store;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SchedulingConfig;
use crate::logging::masked_phone;

use self::phone::{is_valid_phone, normalize_phone};
use self::slot::{Interview, Slot, SlotKey, SlotQuery, SlotRequest};
use self::store::{SearchLimits, SlotStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the slot store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Slot identifier could not be parsed.
    #[error("invalid slot format: {0}")]
    InvalidSlotFormat(String),
    /// No free slot matches the request.
    #[error("slot {slot} is not available for {position}")]
    SlotNotAvailable {
        /// Requested slot.
        slot: SlotKey,
        /// Requested position.
        position: String,
    },
    /// The database could not be reached or the statement failed.
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored row could not be decoded.
    #[error("corrupt slot row: {0}")]
    Corrupt(String),
}

/// Failure category carried by [`SchedulingOutcome::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unparseable slot.
    InvalidSlotFormat,
    /// Slot already taken or never existed.
    SlotNotAvailable,
    /// Storage failure.
    DatabaseUnavailable,
}

impl From<&StoreError> for FailureKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::InvalidSlotFormat(_) => Self::InvalidSlotFormat,
            StoreError::SlotNotAvailable { .. } => Self::SlotNotAvailable,
            StoreError::Database(_) | StoreError::Corrupt(_) => Self::DatabaseUnavailable,
        }
    }
}

// ---------------------------------------------------------------------------
// Intents and outcomes
// ---------------------------------------------------------------------------

/// What the candidate wants done within scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingIntent {
    /// Offer available slots.
    Search {
        /// Position; `None` uses the default.
        position: Option<String>,
        /// Inclusive start date.
        start_date: Option<NaiveDate>,
        /// Inclusive end date.
        end_date: Option<NaiveDate>,
        /// Previously offered slots the candidate turned down.
        excluded: Vec<String>,
    },
    /// Book a specific slot.
    Book {
        /// Position; `None` uses the default.
        position: Option<String>,
        /// Requested slot.
        slot: SlotRequest,
    },
    /// Report the current booking.
    Status,
    /// Cancel every booking.
    Cancel,
}

impl SchedulingIntent {
    /// A plain search for the default position.
    pub fn search() -> Self {
        Self::Search {
            position: None,
            start_date: None,
            end_date: None,
            excluded: Vec::new(),
        }
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::Book { .. } => "book",
            Self::Status => "status",
            Self::Cancel => "cancel",
        }
    }
}

/// Result of one coordinator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingOutcome {
    /// Slots were found (possibly none).
    SlotsOffered {
        /// Position searched.
        position: String,
        /// Offered slots in `(date, time)` order.
        slots: Vec<Slot>,
    },
    /// A booking was made.
    ScheduleConfirmed(Interview),
    /// Read-only lookup.
    ScheduleStatus(Option<Interview>),
    /// Bookings were released.
    ScheduleCancelled {
        /// Number of interviews removed.
        released: u64,
    },
    /// The store refused or failed.
    Error {
        /// Failure category.
        kind: FailureKind,
        /// Candidate-facing explanation.
        message: String,
    },
    /// Name or phone is missing.
    NotRegistered,
}

impl SchedulingOutcome {
    /// Stable label for logs and metadata.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SlotsOffered { .. } => "slots_offered",
            Self::ScheduleConfirmed(_) => "schedule_confirmed",
            Self::ScheduleStatus(_) => "schedule_status",
            Self::ScheduleCancelled { .. } => "schedule_cancelled",
            Self::Error { .. } => "error",
            Self::NotRegistered => "not_registered",
        }
    }

    /// Candidate-facing reply for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::SlotsOffered { position, slots } => format::format_offer(position, slots),
            Self::ScheduleConfirmed(interview) => format::format_confirmation(interview),
            Self::ScheduleStatus(interview) => format::format_status(interview.as_ref()),
            Self::ScheduleCancelled { released: 0 } => {
                "You don't have any interviews to cancel.".to_owned()
            }
            Self::ScheduleCancelled { .. } => {
                "Your interview has been cancelled. Let me know if you'd like to pick a new time."
                    .to_owned()
            }
            Self::Error { message, .. } => message.clone(),
            Self::NotRegistered => {
                "Before I can schedule an interview, I need your full name and phone number."
                    .to_owned()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Stateless scheduling front end over [`SlotStore`].
#[derive(Debug, Clone)]
pub struct SchedulingCoordinator {
    store: SlotStore,
    default_position: String,
    recruiter_phone: String,
}

impl SchedulingCoordinator {
    /// Build a coordinator from config. Search limits are applied to the store.
    pub fn new(store: SlotStore, config: &SchedulingConfig) -> Self {
        let store = store.with_limits(SearchLimits {
            window_days: config.search_window_days,
            max_dates: config.max_offer_dates,
        });
        Self {
            store,
            default_position: config.default_position.clone(),
            recruiter_phone: config.recruiter_phone.clone(),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    /// Position used when none is given.
    pub fn default_position(&self) -> &str {
        &self.default_position
    }

    /// Carry out a scheduling intent for a candidate.
    ///
    /// Refuses with [`SchedulingOutcome::NotRegistered`] unless both a name
    /// and a valid phone are supplied. Store failures become
    /// [`SchedulingOutcome::Error`].
    pub async fn handle(
        &self,
        name: Option<&str>,
        phone: Option<&str>,
        intent: SchedulingIntent,
    ) -> SchedulingOutcome {
        let registered_phone = match (name, phone) {
            (Some(n), Some(p)) if !n.trim().is_empty() && is_valid_phone(p) => normalize_phone(p),
            _ => {
                warn!(intent = intent.label(), "scheduling refused for unregistered candidate");
                return SchedulingOutcome::NotRegistered;
            }
        };

        let label = intent.label();
        let outcome = match intent {
            SchedulingIntent::Search {
                position,
                start_date,
                end_date,
                excluded,
            } => {
                let position = self.position_or_default(position);
                let query = SlotQuery::for_position(position.clone())
                    .between(start_date, end_date)
                    .excluding(excluded);
                self.store
                    .search(&query)
                    .await
                    .map(|slots| SchedulingOutcome::SlotsOffered { position, slots })
            }
            SchedulingIntent::Book { position, slot } => {
                let position = self.position_or_default(position);
                self.book(&position, &slot, &registered_phone)
                    .await
                    .map(SchedulingOutcome::ScheduleConfirmed)
            }
            SchedulingIntent::Status => self
                .store
                .get_schedule(&registered_phone)
                .await
                .map(SchedulingOutcome::ScheduleStatus),
            SchedulingIntent::Cancel => self
                .store
                .cancel(&registered_phone)
                .await
                .map(|released| SchedulingOutcome::ScheduleCancelled { released }),
        };

        let outcome = outcome.unwrap_or_else(|err| failure_outcome(&err));
        info!(
            intent = label,
            outcome = outcome.label(),
            candidate = %masked_phone(&registered_phone),
            "scheduling handled"
        );
        outcome
    }

    /// Direct lookup of a candidate's booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the lookup fails.
    pub async fn get_schedule(&self, phone: &str) -> Result<Option<Interview>, StoreError> {
        self.store.get_schedule(phone).await
    }

    /// A candidate holds at most one interview: any earlier booking is
    /// released in the same write transaction that claims the new slot.
    async fn book(
        &self,
        position: &str,
        slot: &SlotRequest,
        phone: &str,
    ) -> Result<Interview, StoreError> {
        self.store
            .reschedule(position, slot, phone, &self.recruiter_phone)
            .await
    }

    fn position_or_default(&self, position: Option<String>) -> String {
        position
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.default_position.clone())
    }
}

fn failure_outcome(err: &StoreError) -> SchedulingOutcome {
    let kind = FailureKind::from(err);
    let message = match err {
        StoreError::InvalidSlotFormat(raw) => format!(
            "I couldn't read \"{raw}\" as a time slot. Please reply with a date and time like 2025-09-10 10:00."
        ),
        StoreError::SlotNotAvailable { slot, .. } => format!(
            "Sorry, the {slot} slot is no longer available. Would you like me to show other times?"
        ),
        StoreError::Database(_) | StoreError::Corrupt(_) => {
            "I'm having trouble reaching the interview calendar right now. Please try again in a moment."
                .to_owned()
        }
    };
    warn!(error = %err, kind = ?kind, "scheduling failed");
    SchedulingOutcome::Error { kind, message }
}
