//! Slot and interview value types.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::StoreError;

/// Storage format for slot dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for slot times.
pub const TIME_FORMAT: &str = "%H:%M";

/// A resolved `(date, time)` pair identifying a slot within a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    /// Interview date.
    pub date: NaiveDate,
    /// Interview start time (minute precision).
    pub time: NaiveTime,
}

impl SlotKey {
    /// Build a key, truncating the time to whole minutes.
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        let time = NaiveTime::from_hms_opt(
            chrono::Timelike::hour(&time),
            chrono::Timelike::minute(&time),
            0,
        )
        .unwrap_or(time);
        Self { date, time }
    }

    /// Parse `"YYYY-MM-DD HH:MM"` (seconds are tolerated and dropped).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSlotFormat`] when the text does not match.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim();
        let (date, time) = trimmed
            .split_once(|c: char| c == ' ' || c == 'T')
            .ok_or_else(|| StoreError::InvalidSlotFormat(raw.to_owned()))?;
        Self::from_parts(date, time).map_err(|_| StoreError::InvalidSlotFormat(raw.to_owned()))
    }

    /// Parse separate date and time strings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSlotFormat`] when either part is malformed.
    pub fn from_parts(date: &str, time: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidSlotFormat(format!("{date} {time}"));
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| invalid())?;
        let time = parse_time(time.trim()).ok_or_else(invalid)?;
        Ok(Self::new(date, time))
    }

    /// Date in storage format.
    pub fn date_str(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Time in storage format.
    pub fn time_str(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date_str(), self.time_str())
    }
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, TIME_FORMAT))
        .ok()
}

/// Booking input as it arrives from a caller or a tool call.
///
/// Resolved once into a [`SlotKey`] at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotRequest {
    /// `"YYYY-MM-DD HH:MM"`.
    Raw(String),
    /// Separate date and time fields.
    Structured {
        /// `YYYY-MM-DD`.
        date: String,
        /// `HH:MM` or `HH:MM:SS`.
        time: String,
    },
}

impl SlotRequest {
    /// Resolve into a [`SlotKey`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSlotFormat`] when the input cannot be parsed.
    pub fn resolve(&self) -> Result<SlotKey, StoreError> {
        match self {
            Self::Raw(raw) => SlotKey::parse(raw),
            Self::Structured { date, time } => SlotKey::from_parts(date, time),
        }
    }

    /// Interpret an arbitrary JSON value as a slot request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSlotFormat`] for anything other than a
    /// string or a `{date, time}` object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, StoreError> {
        serde_json::from_value(value.clone())
            .map_err(|_| StoreError::InvalidSlotFormat(value.to_string()))
    }
}

/// A bookable interview opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    /// Store-assigned identifier.
    pub id: i64,
    /// Interview date.
    pub date: NaiveDate,
    /// Interview start time.
    pub time: NaiveTime,
    /// Position label.
    pub position: String,
    /// Whether the slot is free.
    pub available: bool,
}

impl Slot {
    /// The `(date, time)` key of this slot.
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.date, self.time)
    }
}

/// A confirmed booking joined with its slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interview {
    /// Interview identifier.
    pub id: i64,
    /// Booked slot identifier.
    pub slot_id: i64,
    /// Position interviewed for.
    pub position: String,
    /// Interview date.
    pub date: NaiveDate,
    /// Interview start time.
    pub time: NaiveTime,
    /// Canonical candidate phone (digits only).
    pub candidate_phone: String,
    /// Recruiter contact phone.
    pub recruiter_phone: String,
}

impl Interview {
    /// The `(date, time)` key of the booked slot.
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.date, self.time)
    }
}

/// Parameters for an availability search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotQuery {
    /// Position label to search.
    pub position: String,
    /// Inclusive start date. Defaults to today.
    pub start_date: Option<NaiveDate>,
    /// Inclusive end date. Defaults to the start date plus the search window.
    pub end_date: Option<NaiveDate>,
    /// Previously offered slots (`"YYYY-MM-DD HH:MM"`). Matching is by date.
    pub excluded: Vec<String>,
}

impl SlotQuery {
    /// Search a position with default dates and no exclusions.
    pub fn for_position(position: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            ..Self::default()
        }
    }

    /// Restrict to an inclusive date range.
    #[must_use]
    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Exclude dates of previously offered slots.
    #[must_use]
    pub fn excluding(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }
}
