//! Sample slot population for development databases.
//!
//! Never runs implicitly: callers opt in through the `seed` subcommand or
//! `scheduling.seed_sample_slots`, and every run is logged at `warn`.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use rand::Rng;
use tracing::warn;

use super::slot::SlotKey;
use super::store::SlotStore;
use super::StoreError;

/// Interview days in the sample calendar.
pub const SAMPLE_WEEKDAYS: &[Weekday] = &[Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Sun];

/// First and last interview hour (inclusive).
pub const SAMPLE_HOURS: (u32, u32) = (9, 16);

/// Build the sample calendar from `from` through `until` (inclusive).
///
/// Each qualifying day gets hourly slots for every position; roughly half are
/// marked available.
pub fn sample_slots(
    from: NaiveDate,
    until: NaiveDate,
    positions: &[String],
    rng: &mut impl Rng,
) -> Vec<(SlotKey, String, bool)> {
    let mut slots = Vec::new();
    let mut day = from;
    while day <= until {
        if SAMPLE_WEEKDAYS.contains(&day.weekday()) {
            for hour in SAMPLE_HOURS.0..=SAMPLE_HOURS.1 {
                let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
                    continue;
                };
                for position in positions {
                    slots.push((SlotKey::new(day, time), position.clone(), rng.gen_bool(0.5)));
                }
            }
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    slots
}

/// Populate the store with sample slots through December 31 of `from`'s year.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`StoreError::Database`] when the insert transaction fails.
pub async fn seed_sample_slots(
    store: &SlotStore,
    from: NaiveDate,
    positions: &[String],
    rng: &mut impl Rng,
) -> Result<u64, StoreError> {
    let until = NaiveDate::from_ymd_opt(from.year(), 12, 31).unwrap_or(from);
    let slots = sample_slots(from, until, positions, rng);
    let inserted = store.insert_slots(&slots).await?;
    warn!(
        inserted,
        %from,
        %until,
        "seeded sample interview slots; development data only"
    );
    Ok(inserted)
}
