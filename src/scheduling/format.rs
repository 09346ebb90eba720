//! Candidate-facing rendering of slots and bookings.

use std::fmt::Write as _;

use super::slot::{Interview, Slot};

/// Reply used when a search finds nothing.
pub const NO_AVAILABILITY_MESSAGE: &str = "I apologize, but I don't have any available interview slots at the moment. Could you please let me know your preferred time range (morning, afternoon, or evening) or specific dates that work better for you? I'll check for alternative options.";

/// Render offered slots grouped by date.
///
/// Slots are expected in `(date, time)` order, as returned by the store.
pub fn format_offer(position: &str, slots: &[Slot]) -> String {
    if slots.is_empty() {
        return NO_AVAILABILITY_MESSAGE.to_owned();
    }

    let mut out = format!("Here are the available interview slots for the {position} position:\n");
    let mut current = None;
    for slot in slots {
        if current != Some(slot.date) {
            current = Some(slot.date);
            let _ = write!(out, "\n**{}:**\n", slot.date.format("%A, %B %d"));
        }
        let _ = writeln!(out, "• {}", slot.time.format("%H:%M"));
    }
    out.push_str(
        "\nPlease let me know which time slot works best for you, or if you'd like to see more options.",
    );
    out
}

/// Human date and time for a booking, e.g. `Wednesday, September 10 at 10:00`.
pub fn describe_interview(interview: &Interview) -> String {
    format!(
        "{} at {}",
        interview.date.format("%A, %B %d"),
        interview.time.format("%H:%M")
    )
}

/// Confirmation sent when a booking succeeds.
pub fn format_confirmation(interview: &Interview) -> String {
    format!(
        "Your interview for the {} position is booked for {}. Your recruiter will call you from {}.",
        interview.position,
        describe_interview(interview),
        interview.recruiter_phone
    )
}

/// Status reply for a candidate's current booking.
pub fn format_status(interview: Option<&Interview>) -> String {
    match interview {
        Some(i) => format!(
            "You have an interview for the {} position on {}.",
            i.position,
            describe_interview(i)
        ),
        None => "You don't have an interview scheduled yet. Would you like me to find a time?"
            .to_owned(),
    }
}
