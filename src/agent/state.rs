//! Per-conversation state.

use serde::{Deserialize, Serialize};

use crate::candidates::TranscriptEntry;
use crate::scheduling::slot::SlotKey;

/// Registration progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStage {
    /// Name or phone still unknown.
    #[default]
    Welcome,
    /// Reserved for collecting job interest; treated like `Welcome`.
    JobInterest,
    /// Name and phone both known.
    Complete,
}

impl RegistrationStage {
    /// Returns the label reported in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::JobInterest => "job_interest",
            Self::Complete => "complete",
        }
    }
}

/// Who said a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The candidate.
    User,
    /// The assistant.
    Assistant,
}

impl Speaker {
    /// Returns the transcript label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker.
    pub speaker: Speaker,
    /// Text.
    pub text: String,
}

/// Everything the orchestrator remembers about one conversation.
///
/// `stage == Complete` exactly when both `name` and `phone` are set; only
/// [`ConversationState::set_identity`] changes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    name: Option<String>,
    phone: Option<String>,
    stage: RegistrationStage,
    /// Transcript in order.
    pub transcript: Vec<Turn>,
    /// Summary persisted by an earlier conversation.
    pub previous_summary: Option<String>,
    /// Whether a candidate record existed before this conversation.
    pub user_exists: bool,
    /// Interview booked, as of the last lookup.
    pub scheduled_interview: Option<(String, SlotKey)>,
    /// Slots offered in the current scheduling exchange.
    pub offered_slots: Vec<String>,
    /// A booking was confirmed during this conversation.
    pub scheduling_completed: bool,
}

impl ConversationState {
    /// Candidate name, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Canonical candidate phone, if known.
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Registration stage.
    pub fn stage(&self) -> RegistrationStage {
        self.stage
    }

    /// Whether both name and phone are known.
    pub fn is_registered(&self) -> bool {
        self.stage == RegistrationStage::Complete
    }

    /// Fill in missing identity fields and recompute the stage.
    ///
    /// Known values are never overwritten. Returns `true` on the transition
    /// into [`RegistrationStage::Complete`].
    pub fn set_identity(&mut self, name: Option<String>, phone: Option<String>) -> bool {
        let was_complete = self.is_registered();
        if self.name.is_none() {
            self.name = name.filter(|n| !n.trim().is_empty());
        }
        if self.phone.is_none() {
            self.phone = phone.filter(|p| !p.trim().is_empty());
        }
        self.stage = if self.name.is_some() && self.phone.is_some() {
            RegistrationStage::Complete
        } else {
            RegistrationStage::Welcome
        };
        !was_complete && self.is_registered()
    }

    /// Append a line, dropping the oldest beyond `max_turns`.
    pub fn record(&mut self, speaker: Speaker, text: impl Into<String>, max_turns: usize) {
        self.transcript.push(Turn {
            speaker,
            text: text.into(),
        });
        if self.transcript.len() > max_turns {
            let excess = self.transcript.len().saturating_sub(max_turns);
            self.transcript.drain(..excess);
        }
    }

    /// Transcript in the persisted format.
    pub fn transcript_entries(&self) -> Vec<TranscriptEntry> {
        self.transcript
            .iter()
            .map(|t| TranscriptEntry {
                role: t.speaker.as_str().to_owned(),
                content: t.text.clone(),
            })
            .collect()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
