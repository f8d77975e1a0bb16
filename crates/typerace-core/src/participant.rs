use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport-assigned identifier, unique per live connection.
pub type ConnectionId = Uuid;

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Maximum stored typed text length in characters. Longer reports keep
/// their leading characters.
pub const MAX_TYPED_TEXT_LEN: usize = 2048;

/// Words per minute before any progress is reported.
pub const INITIAL_WPM: f64 = 0.0;

/// Accuracy baseline: nothing typed means nothing typed wrong.
pub const BASELINE_ACCURACY: f64 = 100.0;

/// Role of a participant within its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Player,
}

/// A member of a race room together with its latest reported progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub role: Role,
    pub display_name: String,
    pub typed_text: String,
    pub wpm: f64,
    pub accuracy: f64,
    /// Position in the room's join sequence. Lower joined earlier.
    pub join_order: u64,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, display_name: String, role: Role, join_order: u64) -> Self {
        Self {
            connection_id,
            role,
            display_name,
            typed_text: String::new(),
            wpm: INITIAL_WPM,
            accuracy: BASELINE_ACCURACY,
            join_order,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Overwrite the progress fields with a fresh report.
    pub fn record_progress(&mut self, mut typed_text: String, wpm: f64, accuracy: f64) {
        if let Some((cut, _)) = typed_text.char_indices().nth(MAX_TYPED_TEXT_LEN) {
            typed_text.truncate(cut);
        }
        self.typed_text = typed_text;
        self.wpm = wpm;
        self.accuracy = accuracy;
    }

    /// Return progress to its pre-test values.
    pub fn reset_progress(&mut self) {
        self.typed_text.clear();
        self.wpm = INITIAL_WPM;
        self.accuracy = BASELINE_ACCURACY;
    }
}

/// Normalize a client-supplied display name. Returns `None` when the name
/// is empty after trimming, too long, or contains control characters.
pub fn normalize_display_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty()
        || name.chars().count() > MAX_DISPLAY_NAME_LEN
        || name.chars().any(|c| c.is_control())
    {
        return None;
    }
    Some(name.to_string())
}
