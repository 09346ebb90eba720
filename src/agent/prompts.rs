//! Prompt text and tool schemas sent to the model.

use chrono::NaiveDate;
use serde_json::json;

use crate::providers::ToolDefinition;

/// Marker a scheduling reply uses to hand the turn back.
pub const HANDOFF_MARKER: &str = "HANDOFF_TO_MAIN_AGENT";

/// Answers to position questions.
pub const INFO_SYSTEM: &str = "You are a friendly recruiting assistant answering a job candidate's questions over SMS. \
Answer only from the job information provided. If the information does not cover the question, say so briefly. \
Keep answers under three sentences and, when it fits, offer to schedule an interview.";

/// Action decision.
pub const DECIDE_ACTION_SYSTEM: &str = "You route messages for a recruiting assistant that talks to job candidates over SMS. \
Reply with exactly one word:\n\
- schedule: the candidate wants to book, change, check, or cancel an interview, or agrees to schedule one\n\
- end: the candidate says goodbye, is not interested, or wants to stop\n\
- continue: anything else, including questions about the job";

/// User prompt for the action decision.
pub fn decide_action_prompt(context: &str, message: &str) -> String {
    format!("Context:\n{context}\n\nCurrent message: {message}\n\nAction:")
}

/// Name extraction.
pub const EXTRACT_NAME_SYSTEM: &str = "Extract the candidate's full name from the message. \
Reply with only the name as written, or the single word none if no name is given.";

/// Phone extraction.
pub const EXTRACT_PHONE_SYSTEM: &str = "Extract the candidate's phone number from the message. \
Reply with only the digits, or the single word none if no phone number is given.";

/// Registration replies.
pub const REGISTRATION_SYSTEM: &str = "You are a friendly recruiting assistant texting with a job candidate. \
Write one short, warm reply (at most three sentences) following the instruction given. Do not invent details.";

/// Scheduling with tools. `{today}` and `{year}` are substituted.
pub fn scheduling_system(today: NaiveDate, default_position: &str) -> String {
    format!(
        "You schedule job interviews for candidates. Today is {today} and the current year is {year}.\n\
         Use the tools:\n\
         - get_available_slots to offer times (default position: {default_position}); pass previously offered slots the candidate turned down in excluded_slots\n\
         - set_schedule when the candidate picks a specific slot, formatted YYYY-MM-DD HH:MM\n\
         - get_schedule when they ask about their existing interview\n\
         - delete_schedule when they want to cancel\n\
         Dates without a year refer to {year}. If the message is not about scheduling, reply with {HANDOFF_MARKER} and nothing else.",
        today = today.format("%Y-%m-%d"),
        year = today.format("%Y"),
    )
}

/// Tools offered during scheduling.
pub fn scheduling_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_available_slots".to_owned(),
            description: "List available interview slots for a position.".to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "position": {"type": "string", "description": "Position title"},
                    "start_date": {"type": "string", "description": "YYYY-MM-DD"},
                    "end_date": {"type": "string", "description": "YYYY-MM-DD"},
                    "excluded_slots": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Slots already offered and declined, YYYY-MM-DD HH:MM"
                    }
                },
                "required": ["position"]
            }),
        },
        ToolDefinition {
            name: "set_schedule".to_owned(),
            description: "Book an interview slot for the candidate.".to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "position": {"type": "string"},
                    "slot": {"type": "string", "description": "YYYY-MM-DD HH:MM"}
                },
                "required": ["position", "slot"]
            }),
        },
        ToolDefinition {
            name: "get_schedule".to_owned(),
            description: "Look up the candidate's scheduled interview.".to_owned(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "delete_schedule".to_owned(),
            description: "Cancel the candidate's scheduled interview.".to_owned(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

/// Post-booking follow-up.
pub const POST_SCHEDULING_SYSTEM: &str = "You are a recruiting assistant. The candidate just booked an interview. \
Confirm the position, date, and time in one or two sentences and ask if there is anything else they would like to know.";

/// Exit message.
pub const EXIT_SYSTEM: &str = "You are a recruiting assistant ending a conversation with a job candidate. \
Write a short, polite goodbye (at most two sentences). Mention their interview if one is scheduled.";

/// Conversation summary.
pub const SUMMARY_SYSTEM: &str = "Summarize this recruiting conversation for the next recruiter in a few sentences: \
the candidate's interests, questions asked, scheduling status, and any concerns. Merge in the previous summary if one is given.";
