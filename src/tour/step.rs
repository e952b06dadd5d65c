//! Tour step definitions.

use serde::{Deserialize, Serialize};

use super::model::{Answer, StepId};

/// Step categories. Drive ordering in the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Welcome,
    Discovery,
    Search,
    Luxury,
    Personalization,
    Questionnaire,
    Action,
}

impl std::fmt::Display for StepCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Discovery => "discovery",
            Self::Search => "search",
            Self::Luxury => "luxury",
            Self::Personalization => "personalization",
            Self::Questionnaire => "questionnaire",
            Self::Action => "action",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Single,
    Multiple,
    Scale,
    Input,
    Budget,
}

/// A question asked on a step. The answer lands in
/// `tourProgress.preferences[field]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub field: String,
    #[serde(default)]
    pub required: bool,
}

impl Questionnaire {
    /// Check that an answer fits this question.
    pub fn validate(&self, answer: &Answer) -> Result<(), String> {
        if self.required && answer.is_empty() {
            return Err(format!("An answer to '{}' is required", self.field));
        }

        let shape_ok = match (self.question_type, answer) {
            (QuestionType::Multiple, Answer::Choices(_)) => true,
            (QuestionType::Scale, Answer::Number(_)) => true,
            (QuestionType::Single | QuestionType::Input | QuestionType::Budget, Answer::Text(_)) => {
                true
            }
            _ => false,
        };
        if !shape_ok {
            return Err(format!(
                "Answer shape does not match {:?} question '{}'",
                self.question_type, self.field
            ));
        }

        if matches!(
            self.question_type,
            QuestionType::Single | QuestionType::Multiple | QuestionType::Budget
        ) && !self.options.is_empty()
        {
            if let Some(unknown) = answer
                .values()
                .into_iter()
                .find(|v| !self.options.iter().any(|o| o == v))
            {
                return Err(format!("'{}' is not an option for '{}'", unknown, self.field));
            }
        }

        Ok(())
    }
}

/// Skip this step when a preference already holds `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalLogic {
    pub based_on: String,
    pub value: Answer,
    /// Informational; the sequencer never redirects to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_to_step_id: Option<StepId>,
}

impl ConditionalLogic {
    /// Whether the stored answer triggers the skip.
    pub fn triggered_by(&self, answer: Option<&Answer>) -> bool {
        answer == Some(&self.value)
    }
}

/// Side effect attached to a step's primary button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepAction {
    /// Open the concierge contact widget.
    OpenConcierge,
    /// Go to another screen.
    Navigate { path: String },
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenConcierge => "open_concierge",
            Self::Navigate { .. } => "navigate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourStep {
    pub id: StepId,
    pub category: StepCategory,
    /// Higher sorts earlier when the sequencer re-sorts.
    pub priority: i32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<Questionnaire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<ConditionalLogic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<StepAction>,
}

impl TourStep {
    pub fn new(id: &str, category: StepCategory, priority: i32, title: &str) -> Self {
        Self {
            id: id.to_string(),
            category,
            priority,
            title: title.to_string(),
            description: String::new(),
            icon: None,
            questionnaire: None,
            conditional_logic: None,
            action: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn with_question(
        mut self,
        question_type: QuestionType,
        field: &str,
        question: &str,
        options: &[&str],
    ) -> Self {
        self.questionnaire = Some(Questionnaire {
            question_type,
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            field: field.to_string(),
            required: false,
        });
        self
    }

    /// Mark the step's question as required.
    pub fn required(mut self) -> Self {
        if let Some(ref mut q) = self.questionnaire {
            q.required = true;
        }
        self
    }

    pub fn skip_when(mut self, based_on: &str, value: Answer) -> Self {
        self.conditional_logic = Some(ConditionalLogic {
            based_on: based_on.to_string(),
            value,
            skip_to_step_id: None,
        });
        self
    }

    pub fn with_action(mut self, action: StepAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> Questionnaire {
        Questionnaire {
            question_type: QuestionType::Single,
            question: "Goal?".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
            field: "goal".to_string(),
            required: true,
        }
    }

    #[test]
    fn validate_accepts_listed_option() {
        assert!(single().validate(&"A".into()).is_ok());
    }

    #[test]
    fn validate_rejects_empty_required_and_unknown_option() {
        assert!(single().validate(&"".into()).is_err());
        assert!(single().validate(&"C".into()).is_err());
    }

    #[test]
    fn validate_rejects_shape_mismatch() {
        let err = single().validate(&Answer::from(vec!["A"])).unwrap_err();
        assert!(err.contains("shape"));
    }

    #[test]
    fn free_input_accepts_anything_textual() {
        let q = Questionnaire {
            question_type: QuestionType::Input,
            question: "Anything else?".to_string(),
            options: vec![],
            field: "notes".to_string(),
            required: false,
        };
        assert!(q.validate(&"ocean view please".into()).is_ok());
        assert!(q.validate(&"".into()).is_ok());
    }

    #[test]
    fn conditional_logic_matches_structurally() {
        let logic = ConditionalLogic {
            based_on: "goal".to_string(),
            value: "A".into(),
            skip_to_step_id: Some("other".to_string()),
        };
        assert!(logic.triggered_by(Some(&"A".into())));
        assert!(!logic.triggered_by(Some(&"B".into())));
        assert!(!logic.triggered_by(None));
    }

    #[test]
    fn step_json_shape() {
        let step = TourStep::new("final-connection", StepCategory::Action, 2, "Talk to us")
            .with_action(StepAction::Navigate {
                path: "/contact".to_string(),
            });
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["category"], "action");
        assert_eq!(json["action"]["type"], "navigate");
        assert_eq!(json["action"]["path"], "/contact");
        assert!(json.get("questionnaire").is_none());
    }
}
