//! The step catalog: the fixed, ordered list every run is derived from.

use std::collections::HashSet;

use crate::error::CatalogError;

use super::model::{Answer, fields};
use super::step::{QuestionType, StepAction, StepCategory, TourStep};

/// Well-known step ids the sequencer treats specially.
pub mod ids {
    pub const WELCOME: &str = "welcome";
    pub const INVESTMENT_FOCUS: &str = "investment-focus";
    pub const FINAL_CONNECTION: &str = "final-connection";
}

/// Answer values the sequencer reacts to.
pub mod triggers {
    pub const INVESTMENT_GOAL: &str = "Making an investment";
    pub const URGENT_TIMELINE: &str = "Immediately (within 3 months)";
}

/// Immutable, ordered list of tour steps.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<TourStep>,
}

impl StepCatalog {
    /// Build a catalog, rejecting empty lists and duplicate ids.
    pub fn new(steps: Vec<TourStep>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.as_str()) {
                return Err(CatalogError::DuplicateStep(step.id.clone()));
            }
        }
        Ok(Self { steps })
    }

    /// Load a catalog from a JSON array of steps.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let steps: Vec<TourStep> = serde_json::from_str(json)?;
        Self::new(steps)
    }

    pub fn steps(&self) -> &[TourStep] {
        &self.steps
    }

    pub fn get(&self, id: &str) -> Option<&TourStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether some step's questionnaire writes `field`.
    pub fn is_known_field(&self, field: &str) -> bool {
        self.steps
            .iter()
            .filter_map(|s| s.questionnaire.as_ref())
            .any(|q| q.field == field)
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self {
            steps: default_steps(),
        }
    }
}

fn default_steps() -> Vec<TourStep> {
    vec![
        TourStep::new(ids::WELCOME, StepCategory::Welcome, 10, "Welcome Home")
            .with_description("A two-minute tour tailored to what you're looking for.")
            .with_icon("sparkles"),
        TourStep::new("primary-goal", StepCategory::Questionnaire, 9, "What brings you here?")
            .with_icon("target")
            .with_question(
                QuestionType::Single,
                fields::PRIMARY_GOAL,
                "What is your primary goal?",
                &[
                    "Buying my first home",
                    "Upgrading to a luxury property",
                    triggers::INVESTMENT_GOAL,
                    "Relocating to the area",
                ],
            )
            .required(),
        TourStep::new("timeline", StepCategory::Questionnaire, 8, "Your Timeline")
            .with_icon("calendar")
            .with_question(
                QuestionType::Single,
                fields::TIMELINE,
                "When are you hoping to move?",
                &[
                    triggers::URGENT_TIMELINE,
                    "Within 6 months",
                    "Within a year",
                    "Just exploring",
                ],
            ),
        TourStep::new("experience", StepCategory::Questionnaire, 7, "Your Experience")
            .with_icon("award")
            .with_question(
                QuestionType::Single,
                fields::EXPERIENCE,
                "How familiar are you with buying property?",
                &["First-time buyer", "I've bought before", "Seasoned investor"],
            ),
        TourStep::new("property-types", StepCategory::Questionnaire, 7, "Your Style")
            .with_icon("home")
            .with_question(
                QuestionType::Multiple,
                fields::PROPERTY_TYPES,
                "Which styles speak to you?",
                &[
                    "Modern Contemporary",
                    "Classic Estate",
                    "Urban Loft/Penthouse",
                    "Beachfront Villa",
                    "Mediterranean",
                ],
            ),
        TourStep::new("budget", StepCategory::Questionnaire, 6, "Your Budget")
            .with_icon("wallet")
            .with_question(
                QuestionType::Budget,
                fields::BUDGET,
                "What price range are you considering?",
                &["Under $500K", "$500K - $1M", "$1M - $2M", "$2M - $5M", "$5M+"],
            ),
        TourStep::new("smart-search", StepCategory::Search, 6, "Smart Search")
            .with_description("Filter by neighborhood, price, and lifestyle in one place.")
            .with_icon("search")
            .with_action(StepAction::Navigate {
                path: "/listings".to_string(),
            }),
        TourStep::new("neighborhoods", StepCategory::Discovery, 5, "Explore Neighborhoods")
            .with_icon("map")
            .with_question(
                QuestionType::Multiple,
                fields::PREFERRED_AREAS,
                "Which areas interest you?",
                &[
                    "Beverly Hills",
                    "Santa Monica",
                    "Malibu",
                    "Downtown",
                    "Hollywood Hills",
                ],
            ),
        TourStep::new("luxury-collection", StepCategory::Luxury, 5, "The Luxury Collection")
            .with_description("Private listings and estates shown by appointment.")
            .with_icon("gem")
            .skip_when(fields::PRIMARY_GOAL, Answer::from("Buying my first home")),
        TourStep::new("first-time-buyer", StepCategory::Discovery, 4, "First-Time Buyer Guide")
            .with_description("Financing, inspections, and closing, step by step.")
            .with_icon("book")
            .skip_when(fields::EXPERIENCE, Answer::from("Seasoned investor")),
        TourStep::new(ids::INVESTMENT_FOCUS, StepCategory::Personalization, 4, "Investment Insights")
            .with_description("Rental yields, appreciation trends, and market reports.")
            .with_icon("trending-up"),
        TourStep::new("saved-favorites", StepCategory::Personalization, 3, "Save Your Favorites")
            .with_description("Heart a listing to get price-change alerts.")
            .with_icon("heart"),
        TourStep::new("schedule-viewing", StepCategory::Action, 3, "Schedule a Viewing")
            .with_icon("key")
            .with_action(StepAction::Navigate {
                path: "/listings?view=schedule".to_string(),
            }),
        TourStep::new(ids::FINAL_CONNECTION, StepCategory::Action, 2, "Meet Your Concierge")
            .with_description("An agent is ready when you are.")
            .with_icon("message-circle")
            .with_action(StepAction::OpenConcierge),
    ]
}
