//! Pattern analysis report types.
//!
//! Reports are produced by a model, so individual entries stay loosely typed
//! (`serde_json::Value`) while the top-level shape is fixed. Every field
//! defaults, so a partial model answer still deserializes and an empty
//! report is the well-typed "nothing found" value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Recurring topics, preferences and habits across all memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternReport {
    pub preferences: Vec<Value>,
    pub behavioral_patterns: Vec<Value>,
    pub topic_clusters: Vec<Value>,
    pub conversation_traits: Value,
}

impl Default for PatternReport {
    fn default() -> Self {
        Self {
            preferences: Vec::new(),
            behavioral_patterns: Vec::new(),
            topic_clusters: Vec::new(),
            conversation_traits: empty_object(),
        }
    }
}

/// Likes, dislikes and how they changed over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceReport {
    pub strong_preferences: Vec<Value>,
    pub moderate_interests: Vec<Value>,
    pub emerging_interests: Vec<Value>,
    pub dislikes: Vec<Value>,
    pub preference_evolution: Vec<Value>,
}

/// How the user communicates, derived from episodic memories only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleReport {
    pub communication_style: Value,
    pub question_patterns: Value,
    pub response_preferences: Value,
    pub engagement_patterns: Value,
    pub adaptation_suggestions: Vec<String>,
}

impl Default for StyleReport {
    fn default() -> Self {
        Self {
            communication_style: empty_object(),
            question_patterns: empty_object(),
            response_preferences: empty_object(),
            engagement_patterns: empty_object(),
            adaptation_suggestions: Vec::new(),
        }
    }
}

/// All three analyses under named keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComprehensivePatterns {
    pub patterns: PatternReport,
    pub preferences: PreferenceReport,
    pub conversation_style: StyleReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_report_partial_answer() {
        let json = r#"{"preferences":[{"topic":"pizza","strength":"strong"}]}"#;
        let report: PatternReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.preferences.len(), 1);
        assert!(report.behavioral_patterns.is_empty());
        assert!(report.conversation_traits.is_object());
    }

    #[test]
    fn test_style_report_default_shape() {
        let json = serde_json::to_value(StyleReport::default()).unwrap();
        assert_eq!(json["communication_style"], serde_json::json!({}));
        assert_eq!(json["adaptation_suggestions"], serde_json::json!([]));
    }

    #[test]
    fn test_comprehensive_keys() {
        let json = serde_json::to_value(ComprehensivePatterns::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("patterns"));
        assert!(obj.contains_key("preferences"));
        assert!(obj.contains_key("conversation_style"));
    }
}
