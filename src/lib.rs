//! Hirebot, a conversational recruiting assistant.
//!
//! Registers candidates by name and phone, answers questions about open
//! positions, and books interview slots from a SQLite calendar. Model calls
//! go through [`providers`]; every model-backed step has a deterministic
//! fallback so a conversation never stalls.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod db;
pub mod logging;

pub mod candidates;
pub mod knowledge;
pub mod providers;
pub mod scheduling;

pub mod agent;
