use serde::{Deserialize, Serialize};

/// Moderation state shared by listings and the bookings submitted against them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }

    /// Lenient parse for values read back from storage.
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => ModerationStatus::Approved,
            "rejected" => ModerationStatus::Rejected,
            _ => ModerationStatus::Pending,
        }
    }

    /// Strict parse for values coming from a request.
    pub fn from_request(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(ModerationStatus::Pending),
            "approved" => Some(ModerationStatus::Approved),
            "rejected" => Some(ModerationStatus::Rejected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "Pending",
            ModerationStatus::Approved => "Approved",
            ModerationStatus::Rejected => "Rejected",
        }
    }
}
