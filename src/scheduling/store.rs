//! Relational slot store.
//!
//! [`SlotStore`] owns the `slots` and `interviews` tables. Booking is a
//! compare-and-swap on `slots.available` inside a transaction, so two
//! concurrent bookings of the same slot cannot both succeed. Cancellation
//! releases slots by flipping the flag back; slot rows are never deleted.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::logging::masked_phone;

use super::phone::normalize_phone;
use super::slot::{parse_time, Interview, Slot, SlotKey, SlotQuery, SlotRequest, DATE_FORMAT};
use super::StoreError;

/// Raw `slots` row: `(id, date, time, position, available)`.
type SlotRow = (i64, String, String, String, bool);

/// Raw interview join row:
/// `(id, slot_id, position, date, time, candidate_phone, recruiter_phone)`.
type InterviewRow = (i64, i64, String, String, String, String, String);

/// Search limits applied by [`SlotStore::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Days after the start date searched when no end date is given.
    pub window_days: u32,
    /// Maximum distinct dates returned.
    pub max_dates: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            window_days: 14,
            max_dates: 5,
        }
    }
}

/// Persistent store of interview slots and bookings.
#[derive(Debug, Clone)]
pub struct SlotStore {
    pool: SqlitePool,
    limits: SearchLimits,
    today: Option<NaiveDate>,
}

impl SlotStore {
    /// Create a store over a migrated pool with default limits.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            limits: SearchLimits::default(),
            today: None,
        }
    }

    /// Override the search limits.
    #[must_use]
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Pin "today" for default search ranges.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The date searches start from by default.
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Find available slots for a position.
    ///
    /// Results are ordered by `(date, time)` and capped to the first
    /// [`SearchLimits::max_dates`] distinct dates. Any date that appears in
    /// `query.excluded` is skipped entirely. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the query fails.
    pub async fn search(&self, query: &SlotQuery) -> Result<Vec<Slot>, StoreError> {
        let start = query.start_date.unwrap_or_else(|| self.today());
        let end = match query.end_date {
            Some(end) => end,
            None => start
                .checked_add_days(Days::new(u64::from(self.limits.window_days)))
                .unwrap_or(NaiveDate::MAX),
        };

        let excluded_dates = excluded_dates(&query.excluded);

        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT id, date, time, position, available \
             FROM slots \
             WHERE position = ?1 COLLATE NOCASE \
               AND available = 1 \
               AND date >= ?2 AND date <= ?3 \
             ORDER BY date, time, id",
        )
        .bind(&query.position)
        .bind(start.format(DATE_FORMAT).to_string())
        .bind(end.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut dates_seen: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut slots = Vec::new();
        for row in rows {
            let slot = row_to_slot(row)?;
            if excluded_dates.contains(&slot.date) {
                continue;
            }
            if !dates_seen.contains(&slot.date) {
                if dates_seen.len() >= self.limits.max_dates {
                    break;
                }
                dates_seen.insert(slot.date);
            }
            slots.push(slot);
        }

        debug!(
            position = %query.position,
            %start,
            %end,
            excluded = excluded_dates.len(),
            found = slots.len(),
            "slot search"
        );
        Ok(slots)
    }

    // -----------------------------------------------------------------------
    // Booking
    // -----------------------------------------------------------------------

    /// Book a slot for a candidate.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidSlotFormat`] when `slot` cannot be parsed.
    /// - [`StoreError::SlotNotAvailable`] when no free slot matches, including
    ///   when a concurrent caller booked it first.
    /// - [`StoreError::Database`] on storage failure.
    pub async fn book(
        &self,
        position: &str,
        slot: &SlotRequest,
        candidate_phone: &str,
        recruiter_phone: &str,
    ) -> Result<Interview, StoreError> {
        let key = slot.resolve()?;
        let phone = normalize_phone(candidate_phone);

        let mut tx = self.pool.begin().await?;
        let interview = claim_slot(&mut tx, position, key, &phone, recruiter_phone).await?;
        tx.commit().await?;

        info!(
            interview_id = interview.id,
            slot_id = interview.slot_id,
            position = %interview.position,
            slot = %key,
            candidate = %masked_phone(&phone),
            "interview booked"
        );
        Ok(interview)
    }

    /// Move a candidate's bookings to a new slot in one transaction.
    ///
    /// Existing interviews are released first; if the new slot cannot be
    /// claimed the whole transaction rolls back and the old booking stands.
    /// With no earlier booking this is a plain [`SlotStore::book`]. The
    /// release opens the transaction with a write, so concurrent calls for
    /// one candidate run one after the other.
    ///
    /// # Errors
    ///
    /// Same as [`SlotStore::book`].
    pub async fn reschedule(
        &self,
        position: &str,
        slot: &SlotRequest,
        candidate_phone: &str,
        recruiter_phone: &str,
    ) -> Result<Interview, StoreError> {
        let key = slot.resolve()?;
        let phone = normalize_phone(candidate_phone);

        let mut tx = self.pool.begin().await?;
        let released = release_all(&mut tx, &phone).await?;
        let interview = claim_slot(&mut tx, position, key, &phone, recruiter_phone).await?;
        tx.commit().await?;

        info!(
            interview_id = interview.id,
            released,
            slot = %key,
            candidate = %masked_phone(&phone),
            "interview booked"
        );
        Ok(interview)
    }

    // -----------------------------------------------------------------------
    // Lookup and cancellation
    // -----------------------------------------------------------------------

    /// The candidate's most recent booking, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the query fails.
    pub async fn get_schedule(&self, candidate_phone: &str) -> Result<Option<Interview>, StoreError> {
        let phone = normalize_phone(candidate_phone);
        let row: Option<InterviewRow> = sqlx::query_as(
            "SELECT i.id, i.slot_id, s.position, s.date, s.time, \
                    i.candidate_phone, i.recruiter_phone \
             FROM interviews i \
             JOIN slots s ON s.id = i.slot_id \
             WHERE i.candidate_phone = ?1 \
             ORDER BY i.id DESC \
             LIMIT 1",
        )
        .bind(&phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_interview).transpose()
    }

    /// Cancel every booking held by a candidate, restoring the slots.
    ///
    /// Returns the number of interviews removed (zero when none existed).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the transaction fails; in that
    /// case nothing is released.
    pub async fn cancel(&self, candidate_phone: &str) -> Result<u64, StoreError> {
        let phone = normalize_phone(candidate_phone);
        let mut tx = self.pool.begin().await?;
        let released = release_all(&mut tx, &phone).await?;
        tx.commit().await?;

        info!(candidate = %masked_phone(&phone), released, "interviews cancelled");
        Ok(released)
    }

    // -----------------------------------------------------------------------
    // Population
    // -----------------------------------------------------------------------

    /// Insert a single slot row. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the insert fails.
    pub async fn insert_slot(
        &self,
        key: SlotKey,
        position: &str,
        available: bool,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO slots (date, time, position, available) \
             VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(key.date_str())
        .bind(key.time_str())
        .bind(position)
        .bind(available)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Insert many slots in one transaction. Returns the number inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when any insert fails; nothing is kept.
    pub async fn insert_slots(
        &self,
        slots: &[(SlotKey, String, bool)],
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted: u64 = 0;
        for (key, position, available) in slots {
            sqlx::query("INSERT INTO slots (date, time, position, available) VALUES (?1, ?2, ?3, ?4)")
                .bind(key.date_str())
                .bind(key.time_str())
                .bind(position)
                .bind(*available)
                .execute(&mut *tx)
                .await?;
            inserted = inserted.saturating_add(1);
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Count slots, optionally only the available ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the query fails.
    pub async fn count_slots(&self, only_available: bool) -> Result<i64, StoreError> {
        let count: i64 = if only_available {
            sqlx::query_scalar("SELECT count(*) FROM slots WHERE available = 1")
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT count(*) FROM slots")
                .fetch_one(&self.pool)
                .await?
        };
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Transaction steps
// ---------------------------------------------------------------------------

/// Flip one matching free slot to booked and record the interview.
async fn claim_slot(
    tx: &mut Transaction<'_, Sqlite>,
    position: &str,
    key: SlotKey,
    phone: &str,
    recruiter_phone: &str,
) -> Result<Interview, StoreError> {
    // The outer `available = 1` re-checks the row at write time.
    let claimed: Option<(i64, String)> = sqlx::query_as(
        "UPDATE slots SET available = 0 \
         WHERE id = ( \
             SELECT id FROM slots \
             WHERE date = ?1 AND time = ?2 \
               AND position = ?3 COLLATE NOCASE \
               AND available = 1 \
             ORDER BY id LIMIT 1 \
         ) AND available = 1 \
         RETURNING id, position",
    )
    .bind(key.date_str())
    .bind(key.time_str())
    .bind(position)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((slot_id, stored_position)) = claimed else {
        debug!(%key, position, "no free slot to claim");
        return Err(StoreError::SlotNotAvailable {
            slot: key,
            position: position.to_owned(),
        });
    };

    let interview_id: i64 = sqlx::query_scalar(
        "INSERT INTO interviews (slot_id, candidate_phone, recruiter_phone) \
         VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(slot_id)
    .bind(phone)
    .bind(recruiter_phone)
    .fetch_one(&mut **tx)
    .await?;

    Ok(Interview {
        id: interview_id,
        slot_id,
        position: stored_position,
        date: key.date,
        time: key.time,
        candidate_phone: phone.to_owned(),
        recruiter_phone: recruiter_phone.to_owned(),
    })
}

/// Restore every slot booked by `phone` and delete the interviews.
async fn release_all(tx: &mut Transaction<'_, Sqlite>, phone: &str) -> Result<u64, StoreError> {
    sqlx::query(
        "UPDATE slots SET available = 1 \
         WHERE id IN (SELECT slot_id FROM interviews WHERE candidate_phone = ?1)",
    )
    .bind(phone)
    .execute(&mut **tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM interviews WHERE candidate_phone = ?1")
        .bind(phone)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn excluded_dates(excluded: &[String]) -> BTreeSet<NaiveDate> {
    excluded
        .iter()
        .filter_map(|raw| {
            let parsed = SlotKey::parse(raw).map(|k| k.date).ok().or_else(|| {
                NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
            });
            if parsed.is_none() {
                debug!(value = %raw, "ignoring unparseable excluded slot");
            }
            parsed
        })
        .collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| StoreError::Corrupt(format!("bad date '{raw}'")))
}

fn row_to_slot(row: SlotRow) -> Result<Slot, StoreError> {
    let (id, date, time, position, available) = row;
    Ok(Slot {
        id,
        date: parse_date(&date)?,
        time: parse_time(&time).ok_or_else(|| StoreError::Corrupt(format!("bad time '{time}'")))?,
        position,
        available,
    })
}

fn row_to_interview(row: InterviewRow) -> Result<Interview, StoreError> {
    let (id, slot_id, position, date, time, candidate_phone, recruiter_phone) = row;
    Ok(Interview {
        id,
        slot_id,
        position,
        date: parse_date(&date)?,
        time: parse_time(&time).ok_or_else(|| StoreError::Corrupt(format!("bad time '{time}'")))?,
        candidate_phone,
        recruiter_phone,
    })
}
