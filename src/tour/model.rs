//! User profile and tour progress data models.
//!
//! The profile is treated as a value: every update consumes it and returns
//! the new version, which is then handed whole to the profile store.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interests;

/// Catalog step identifier.
pub type StepId = String;

/// Preference field names written by the built-in questionnaires.
pub mod fields {
    pub const PRIMARY_GOAL: &str = "primaryGoal";
    pub const TIMELINE: &str = "timeline";
    pub const EXPERIENCE: &str = "experience";
    pub const PROPERTY_TYPES: &str = "propertyTypes";
    pub const BUDGET: &str = "budget";
    pub const PREFERRED_AREAS: &str = "preferredAreas";
}

/// A questionnaire answer as stored in `tourProgress.preferences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Single choice, free text, or a budget bracket.
    Text(String),
    /// Multiple choice.
    Choices(Vec<String>),
    /// Scale value.
    Number(i64),
}

impl Answer {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// All string values carried by the answer.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Text(s) => vec![s.as_str()],
            Self::Choices(items) => items.iter().map(String::as_str).collect(),
            Self::Number(_) => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Choices(items) => items.is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<&str>> for Answer {
    fn from(values: Vec<&str>) -> Self {
        Self::Choices(values.into_iter().map(String::from).collect())
    }
}

/// How soon the user intends to buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    Immediate,
    WithinSixMonths,
    WithinYear,
    Exploring,
}

impl Timeline {
    /// Map a timeline questionnaire option to its value.
    pub fn from_answer(option: &str) -> Option<Self> {
        match option {
            "Immediately (within 3 months)" => Some(Self::Immediate),
            "Within 6 months" => Some(Self::WithinSixMonths),
            "Within a year" => Some(Self::WithinYear),
            "Just exploring" => Some(Self::Exploring),
            _ => None,
        }
    }
}

/// Buyer sophistication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    FirstTime,
    SomeExperience,
    Seasoned,
}

impl Experience {
    pub fn from_answer(option: &str) -> Option<Self> {
        match option {
            "First-time buyer" => Some(Self::FirstTime),
            "I've bought before" => Some(Self::SomeExperience),
            "Seasoned investor" => Some(Self::Seasoned),
            _ => None,
        }
    }
}

/// Price range in whole dollars. `max` is open-ended when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

impl PriceRange {
    /// Map a budget questionnaire bracket to a range.
    pub fn from_answer(option: &str) -> Option<Self> {
        let (min, max) = match option {
            "Under $500K" => (0, Some(500_000)),
            "$500K - $1M" => (500_000, Some(1_000_000)),
            "$1M - $2M" => (1_000_000, Some(2_000_000)),
            "$2M - $5M" => (2_000_000, Some(5_000_000)),
            "$5M+" => (5_000_000, None),
            _ => return None,
        };
        Some(Self { min, max })
    }
}

/// Browsing behavior remembered for personalization.
///
/// Additive only. Growth is unbounded unless a cap is passed to the
/// interaction transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Interactions {
    pub pages_viewed: Vec<String>,
    /// Total seconds spent, across visits.
    pub time_spent: u64,
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<DateTime<Utc>>,
}

/// Progress through the guided tour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TourProgress {
    pub completed_steps: Vec<StepId>,
    pub skipped_steps: Vec<StepId>,
    pub time_spent_per_step: BTreeMap<StepId, u64>,
    pub preferences: BTreeMap<String, Answer>,
}

impl TourProgress {
    pub fn preference(&self, field: &str) -> Option<&Answer> {
        self.preferences.get(field)
    }

    /// Whether `field` currently holds the text answer `value`.
    pub fn preference_is(&self, field: &str, value: &str) -> bool {
        self.preference(field).and_then(Answer::as_text) == Some(value)
    }
}

/// Per-device user profile driving tour personalization.
///
/// Stored as JSON under [`crate::store::profile::keys::PROFILE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_areas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Experience>,
    #[serde(default)]
    pub interactions: Interactions,
    #[serde(default)]
    pub tour_progress: TourProgress,
    /// Missing in documents written before timestamps were tracked.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for UserProfile {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            interests: Vec::new(),
            preferred_price_range: None,
            preferred_areas: None,
            property_types: None,
            timeline: None,
            experience: None,
            interactions: Interactions::default(),
            tour_progress: TourProgress::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UserProfile {
    /// Add interest tags. The whole list is deduplicated, first occurrence
    /// wins, so repeats in a stored document are dropped too.
    pub fn with_interests<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        self.interests = std::mem::take(&mut self.interests)
            .into_iter()
            .chain(tags.into_iter().map(Into::into))
            .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
            .collect();
        self.touch()
    }

    /// Record a questionnaire answer.
    ///
    /// Writes the preference, derives interest tags, and mirrors the answer
    /// into the typed filter fields where one exists.
    pub fn with_answer(mut self, field: &str, answer: Answer) -> Self {
        let tags = interests::derive(field, &answer);

        match field {
            fields::PROPERTY_TYPES => {
                self.property_types = Some(answer.values().into_iter().map(String::from).collect());
            }
            fields::PREFERRED_AREAS => {
                self.preferred_areas = Some(answer.values().into_iter().map(String::from).collect());
            }
            fields::TIMELINE => {
                if let Some(timeline) = answer.as_text().and_then(Timeline::from_answer) {
                    self.timeline = Some(timeline);
                }
            }
            fields::EXPERIENCE => {
                if let Some(experience) = answer.as_text().and_then(Experience::from_answer) {
                    self.experience = Some(experience);
                }
            }
            fields::BUDGET => {
                if let Some(range) = answer.as_text().and_then(PriceRange::from_answer) {
                    self.preferred_price_range = Some(range);
                }
            }
            _ => {}
        }

        self.tour_progress
            .preferences
            .insert(field.to_string(), answer);
        self.with_interests(tags)
    }

    /// Append step ids to `completedSteps`, skipping ones already present.
    pub fn with_completed_steps<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.tour_progress.completed_steps.contains(&id) {
                self.tour_progress.completed_steps.push(id);
            }
        }
        self.touch()
    }

    pub fn with_skipped_step(mut self, id: &str) -> Self {
        if !self.tour_progress.skipped_steps.iter().any(|s| s == id) {
            self.tour_progress.skipped_steps.push(id.to_string());
        }
        self.touch()
    }

    /// Record time spent on a step, replacing any earlier value.
    pub fn with_step_time(mut self, id: &str, seconds: u64) -> Self {
        self.tour_progress
            .time_spent_per_step
            .insert(id.to_string(), seconds);
        self.touch()
    }

    pub fn with_page_view(mut self, path: &str, cap: Option<usize>) -> Self {
        self.interactions.pages_viewed.push(path.to_string());
        keep_newest(&mut self.interactions.pages_viewed, cap);
        self.visited()
    }

    pub fn with_action(mut self, action: &str, cap: Option<usize>) -> Self {
        self.interactions.actions.push(action.to_string());
        keep_newest(&mut self.interactions.actions, cap);
        self.visited()
    }

    pub fn with_time_spent(mut self, seconds: u64) -> Self {
        self.interactions.time_spent = self.interactions.time_spent.saturating_add(seconds);
        self.visited()
    }

    pub fn has_completed(&self, id: &str) -> bool {
        self.tour_progress.completed_steps.iter().any(|s| s == id)
    }

    fn visited(mut self) -> Self {
        self.interactions.last_visit = Some(Utc::now());
        self.touch()
    }

    fn touch(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }
}

fn keep_newest(entries: &mut Vec<String>, cap: Option<usize>) {
    if let Some(cap) = cap {
        if entries.len() > cap {
            let excess = entries.len() - cap;
            entries.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_repeats_are_dropped_on_next_write() {
        let stored: UserProfile =
            serde_json::from_str(r#"{"interests": ["luxury", "luxury", "relocation", "luxury"]}"#)
                .unwrap();
        let profile = stored.with_interests(["investment", "relocation"]);
        assert_eq!(profile.interests, vec!["luxury", "relocation", "investment"]);
    }

    #[test]
    fn document_without_timestamps_loads() {
        let json = r#"{
            "interests": ["luxury"],
            "interactions": {"pagesViewed": ["/"], "timeSpent": 30, "actions": []},
            "tourProgress": {
                "completedSteps": ["welcome", "primary-goal"],
                "skippedSteps": [],
                "timeSpentPerStep": {"welcome": 4},
                "preferences": {"primaryGoal": "Making an investment"}
            }
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(
            profile.tour_progress.completed_steps,
            vec!["welcome", "primary-goal"]
        );
        assert!(
            profile
                .tour_progress
                .preference_is(fields::PRIMARY_GOAL, "Making an investment")
        );
        assert_eq!(profile.interactions.time_spent, 30);
    }

    #[test]
    fn partial_nested_objects_fill_defaults() {
        let json = r#"{"interactions": {"actions": ["clicked"]}, "tourProgress": {"completedSteps": ["welcome"]}}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.interactions.actions, vec!["clicked"]);
        assert!(profile.interactions.pages_viewed.is_empty());
        assert!(profile.tour_progress.preferences.is_empty());
        assert!(profile.has_completed("welcome"));
    }

    #[test]
    fn interests_dedup_regardless_of_repeats() {
        let profile = UserProfile::default()
            .with_interests(["luxury", "investment"])
            .with_interests(["luxury"])
            .with_interests(vec!["investment".to_string(), "luxury".to_string()]);

        assert_eq!(profile.interests, vec!["luxury", "investment"]);
    }

    #[test]
    fn multiple_choice_property_types_add_slug_interests() {
        let profile = UserProfile::default()
            .with_interests(["waterfront"])
            .with_answer(
                fields::PROPERTY_TYPES,
                Answer::from(vec!["Modern Contemporary", "Urban Loft/Penthouse"]),
            );

        assert_eq!(
            profile.interests,
            vec!["waterfront", "modern-contemporary", "urban-loft/penthouse"]
        );
        assert_eq!(
            profile.property_types,
            Some(vec![
                "Modern Contemporary".to_string(),
                "Urban Loft/Penthouse".to_string()
            ])
        );
    }

    #[test]
    fn answer_writes_preference_immediately() {
        let profile =
            UserProfile::default().with_answer(fields::PRIMARY_GOAL, "Making an investment".into());
        assert!(
            profile
                .tour_progress
                .preference_is(fields::PRIMARY_GOAL, "Making an investment")
        );
        assert!(profile.interests.contains(&"investment".to_string()));
    }

    #[test]
    fn typed_filters_follow_answers() {
        let profile = UserProfile::default()
            .with_answer(fields::TIMELINE, "Immediately (within 3 months)".into())
            .with_answer(fields::EXPERIENCE, "Seasoned investor".into())
            .with_answer(fields::BUDGET, "$5M+".into());

        assert_eq!(profile.timeline, Some(Timeline::Immediate));
        assert_eq!(profile.experience, Some(Experience::Seasoned));
        assert_eq!(
            profile.preferred_price_range,
            Some(PriceRange {
                min: 5_000_000,
                max: None
            })
        );
    }

    #[test]
    fn unknown_field_is_stored_but_derives_nothing() {
        let profile = UserProfile::default().with_answer("favoriteColor", "teal".into());
        assert!(profile.interests.is_empty());
        assert_eq!(
            profile.tour_progress.preference("favoriteColor"),
            Some(&Answer::Text("teal".to_string()))
        );
    }

    #[test]
    fn completed_steps_append_only_new_ids() {
        let profile = UserProfile::default()
            .with_completed_steps(["welcome", "primary-goal"])
            .with_completed_steps(["primary-goal", "timeline"]);
        assert_eq!(
            profile.tour_progress.completed_steps,
            vec!["welcome", "primary-goal", "timeline"]
        );
    }

    #[test]
    fn step_time_overwrites() {
        let profile = UserProfile::default()
            .with_step_time("welcome", 12)
            .with_step_time("welcome", 3);
        assert_eq!(profile.tour_progress.time_spent_per_step["welcome"], 3);
    }

    #[test]
    fn interactions_grow_without_cap() {
        let mut profile = UserProfile::default();
        for i in 0..50 {
            profile = profile.with_page_view(&format!("/listings/{i}"), None);
        }
        assert_eq!(profile.interactions.pages_viewed.len(), 50);
        assert!(profile.interactions.last_visit.is_some());
    }

    #[test]
    fn interaction_cap_keeps_newest() {
        let profile = UserProfile::default()
            .with_action("a", Some(2))
            .with_action("b", Some(2))
            .with_action("c", Some(2));
        assert_eq!(profile.interactions.actions, vec!["b", "c"]);
    }

    #[test]
    fn profile_serde_uses_camel_case_document() {
        let profile = UserProfile::default()
            .with_answer(fields::PROPERTY_TYPES, Answer::from(vec!["Estate"]))
            .with_completed_steps(["welcome"]);

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("tourProgress").is_some());
        assert_eq!(json["tourProgress"]["completedSteps"][0], "welcome");
        assert_eq!(json["tourProgress"]["preferences"]["propertyTypes"][0], "Estate");

        let parsed: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn answer_untagged_serde() {
        let text: Answer = serde_json::from_str("\"Within a year\"").unwrap();
        assert_eq!(text, Answer::Text("Within a year".to_string()));

        let choices: Answer = serde_json::from_str("[\"Condo\",\"Estate\"]").unwrap();
        assert_eq!(choices.values(), vec!["Condo", "Estate"]);

        let number: Answer = serde_json::from_str("4").unwrap();
        assert_eq!(number, Answer::Number(4));
    }
}
