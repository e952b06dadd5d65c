//! Interest tags derived from questionnaire answers.

use std::sync::LazyLock;

use regex::Regex;

use super::model::{Answer, fields};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Lower-case a value and join whitespace runs with `-`.
pub fn slugify(value: &str) -> String {
    WHITESPACE
        .replace_all(value.trim(), "-")
        .to_lowercase()
}

/// Interest tags implied by answering `field` with `answer`.
pub fn derive(field: &str, answer: &Answer) -> Vec<String> {
    match field {
        fields::PROPERTY_TYPES | fields::PREFERRED_AREAS => {
            answer.values().into_iter().map(slugify).collect()
        }
        fields::PRIMARY_GOAL => {
            let tag = match answer.as_text() {
                Some("Buying my first home") => "first-time-buyer",
                Some("Upgrading to a luxury property") => "luxury",
                Some("Making an investment") => "investment",
                Some("Relocating to the area") => "relocation",
                _ => return Vec::new(),
            };
            vec![tag.to_string()]
        }
        fields::TIMELINE => match answer.as_text() {
            Some("Immediately (within 3 months)") => vec!["urgent-buyer".to_string()],
            _ => Vec::new(),
        },
        fields::EXPERIENCE => match answer.as_text() {
            Some("Seasoned investor") => vec!["experienced-investor".to_string()],
            _ => Vec::new(),
        },
        fields::BUDGET => match answer.as_text() {
            Some("$2M - $5M") | Some("$5M+") => vec!["luxury".to_string()],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
