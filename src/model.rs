//! Domain enums and their wire-string forms.
//!
//! Rows store these as TEXT; `parse` is strict and case-sensitive so an
//! unknown string surfaces as a validation error instead of a silent default.

use serde::Serialize;

/// Quest workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Todo,
    InProgress,
    PendingReview,
    Done,
}

impl TaskStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(Self::Todo),
            "IN_PROGRESS" => Some(Self::InProgress),
            "PENDING_REVIEW" => Some(Self::PendingReview),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Done => "DONE",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Feature,
    Bug,
    Enhancement,
}

impl Label {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FEATURE" => Some(Self::Feature),
            "BUG" => Some(Self::Bug),
            "ENHANCEMENT" => Some(Self::Enhancement),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "FEATURE",
            Self::Bug => "BUG",
            Self::Enhancement => "ENHANCEMENT",
        }
    }
}

/// Hero classes. Warrior and Rogue carry damage multipliers, Cleric an
/// XP bonus; Mage and Grandmaster have no mechanical effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeroClass {
    Warrior,
    Mage,
    Rogue,
    Cleric,
    Grandmaster,
}

impl HeroClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Warrior" => Some(Self::Warrior),
            "Mage" => Some(Self::Mage),
            "Rogue" => Some(Self::Rogue),
            "Cleric" => Some(Self::Cleric),
            "Grandmaster" => Some(Self::Grandmaster),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warrior => "Warrior",
            Self::Mage => "Mage",
            Self::Rogue => "Rogue",
            Self::Cleric => "Cleric",
            Self::Grandmaster => "Grandmaster",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

/// Comment rows double as an audit trail; resolver-generated entries use
/// the non-`Comment` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Comment,
    ProofOfWork,
    Approval,
    Denial,
}

impl CommentKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COMMENT" => Some(Self::Comment),
            "PROOF_OF_WORK" => Some(Self::ProofOfWork),
            "APPROVAL" => Some(Self::Approval),
            "DENIAL" => Some(Self::Denial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "COMMENT",
            Self::ProofOfWork => "PROOF_OF_WORK",
            Self::Approval => "APPROVAL",
            Self::Denial => "DENIAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Assignment,
    Status,
    Review,
    Success,
    Social,
    Reward,
    Denied,
}

impl NotificationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "assignment" => Some(Self::Assignment),
            "status" => Some(Self::Status),
            "review" => Some(Self::Review),
            "success" => Some(Self::Success),
            "social" => Some(Self::Social),
            "reward" => Some(Self::Reward),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Assignment => "assignment",
            Self::Status => "status",
            Self::Review => "review",
            Self::Success => "success",
            Self::Social => "social",
            Self::Reward => "reward",
            Self::Denied => "denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrip() {
        for s in ["TODO", "IN_PROGRESS", "PENDING_REVIEW", "DONE"] {
            assert_eq!(TaskStatus::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(TaskStatus::parse("done"), None);
    }

    #[test]
    fn class_parse_is_case_sensitive() {
        assert_eq!(HeroClass::parse("Warrior"), Some(HeroClass::Warrior));
        assert_eq!(HeroClass::parse("warrior"), None);
        assert_eq!(HeroClass::parse("WARRIOR"), None);
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
    }
}
