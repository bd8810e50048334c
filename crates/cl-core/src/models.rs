//! # Domain Models
//!
//! These structs represent the core entities of crumblog.
//! Submissions and users use UUID v7 for time-ordered, globally unique identification;
//! breads are keyed by their URL slug (e.g., "sourdough").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Sourdough,
    #[serde(rename = "Quick Bread", alias = "QuickBread")]
    QuickBread,
    Artisan,
    Classic,
    #[serde(rename = "Whole Grain", alias = "WholeGrain")]
    WholeGrain,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sourdough => "Sourdough",
            Category::QuickBread => "Quick Bread",
            Category::Artisan => "Artisan",
            Category::Classic => "Classic",
            Category::WholeGrain => "Whole Grain",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
}

/// Time breakdown in minutes. `total` is always `prep + rise + bake`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeTime {
    pub prep: u32,
    pub rise: u32,
    pub bake: u32,
    pub total: u32,
}

impl RecipeTime {
    pub fn new(prep: u32, rise: u32, bake: u32) -> Self {
        Self {
            prep,
            rise,
            bake,
            total: prep.saturating_add(rise).saturating_add(bake),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.prep.checked_add(self.rise).and_then(|t| t.checked_add(self.bake)) == Some(self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub author: String,
    pub difficulty: Difficulty,
    pub time: RecipeTime,
    #[serde(rename = "yield")]
    pub yield_desc: String,
    pub ingredients: Vec<Ingredient>,
    /// Order-significant steps.
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
}

/// Immutable catalog record, loaded at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreadEntity {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub best_for: Vec<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    /// Vetted recipes shipped with the catalog.
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

/// Minutes as sent by a client. Kept as raw JSON numbers so that negative and
/// fractional values reach validation instead of failing deserialization.
/// A stage left out of the form counts as zero minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDraft {
    #[serde(default = "zero_minutes")]
    pub prep: Number,
    #[serde(default = "zero_minutes")]
    pub rise: Number,
    #[serde(default = "zero_minutes")]
    pub bake: Number,
    /// Ignored; recomputed from the components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Number>,
}

fn zero_minutes() -> Number {
    Number::from(0u32)
}

impl TimeDraft {
    pub fn minutes(prep: u32, rise: u32, bake: u32) -> Self {
        Self {
            prep: prep.into(),
            rise: rise.into(),
            bake: bake.into(),
            total: None,
        }
    }
}

/// A recipe as submitted by a user, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    pub author: String,
    pub difficulty: Difficulty,
    pub time: TimeDraft,
    #[serde(rename = "yield", default)]
    pub yield_desc: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(format!("unknown submission status '{other}'")),
        }
    }
}

/// A community recipe awaiting (or past) moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: Uuid,
    /// Always references a catalog bread.
    pub bread_id: String,
    pub submitted_by: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Only set when `status` is `Rejected`.
    pub rejection_reason: Option<String>,
    pub recipe: Recipe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: Option<String> },
}

impl Decision {
    pub fn target_status(&self) -> SubmissionStatus {
        match self {
            Decision::Approve => SubmissionStatus::Approved,
            Decision::Reject { .. } => SubmissionStatus::Rejected,
        }
    }
}

/// A moderation decision ready to be applied to a pending submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub decision: Decision,
    pub reviewer: Uuid,
    pub reviewed_at: DateTime<Utc>,
}

/// Outcome of a compare-and-swap on a submission's status.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied(PendingSubmission),
    NotFound,
    AlreadyDecided(SubmissionStatus),
}

impl PendingSubmission {
    /// Moves a pending submission into its terminal state.
    /// Returns the current status untouched if it was already decided.
    pub fn apply_review(&mut self, review: &Review) -> std::result::Result<(), SubmissionStatus> {
        if self.status.is_terminal() {
            return Err(self.status);
        }
        self.status = review.decision.target_status();
        self.reviewed_by = Some(review.reviewer);
        self.reviewed_at = Some(review.reviewed_at);
        if let Decision::Reject { reason } = &review.decision {
            self.rejection_reason = reason.clone();
        }
        Ok(())
    }
}

/// One user's rating of one bread. Unique per (bread_id, user_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecord {
    pub bread_id: String,
    pub user_id: Uuid,
    /// 1..=5
    pub value: u8,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Mean rounded to one decimal; `None` when nobody has rated yet.
    pub average: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Read view of a user. `submitted_recipes` and `ratings` are derived by the
/// store from the submission and rating records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    pub favorites: BTreeSet<String>,
    pub submitted_recipes: Vec<Uuid>,
    pub ratings: BTreeMap<String, u8>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Row written on registration. The password only ever exists as a PHC hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> PendingSubmission {
        PendingSubmission {
            id: Uuid::now_v7(),
            bread_id: "sourdough".into(),
            submitted_by: Uuid::now_v7(),
            submitted_at: Utc::now(),
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            recipe: Recipe {
                id: "r1".into(),
                title: "Country Loaf".into(),
                author: "Ada".into(),
                difficulty: Difficulty::Advanced,
                time: RecipeTime::new(30, 600, 45),
                yield_desc: "1 loaf".into(),
                ingredients: vec![Ingredient { name: "flour".into(), amount: "500 g".into() }],
                instructions: vec!["Mix".into()],
                tips: vec![],
            },
        }
    }

    #[test]
    fn review_applies_once() {
        let mut s = submission();
        let reviewer = Uuid::now_v7();
        let reject = Review {
            decision: Decision::Reject { reason: Some("needs weights".into()) },
            reviewer,
            reviewed_at: Utc::now(),
        };
        assert!(s.apply_review(&reject).is_ok());
        assert_eq!(s.status, SubmissionStatus::Rejected);
        assert_eq!(s.rejection_reason.as_deref(), Some("needs weights"));

        let approve = Review { decision: Decision::Approve, reviewer, reviewed_at: Utc::now() };
        assert_eq!(s.apply_review(&approve), Err(SubmissionStatus::Rejected));
        assert_eq!(s.status, SubmissionStatus::Rejected);
    }

    #[test]
    fn recipe_time_total_is_sum() {
        let t = RecipeTime::new(20, 90, 35);
        assert_eq!(t.total, 145);
        assert!(t.is_consistent());
        assert!(!RecipeTime { total: 1, ..t }.is_consistent());
    }

    #[test]
    fn category_uses_display_names_on_the_wire() {
        let json = serde_json::to_string(&Category::QuickBread).unwrap();
        assert_eq!(json, "\"Quick Bread\"");
        let parsed: Category = serde_json::from_str("\"WholeGrain\"").unwrap();
        assert_eq!(parsed, Category::WholeGrain);
    }

    #[test]
    fn recipe_serializes_yield_field() {
        let value = serde_json::to_value(&submission().recipe).unwrap();
        assert_eq!(value["yield"], "1 loaf");
        assert!(value.get("tips").is_none());
    }
}
