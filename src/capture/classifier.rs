//! URL-based classification of captured requests

use super::types::TargetKind;
use serde::{Deserialize, Serialize};

/// A single `(pattern, target)` entry of the classification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Substring matched against the raw request target
    pub pattern: String,
    pub target: TargetKind,
}

impl ClassificationRule {
    pub fn new(pattern: impl Into<String>, target: TargetKind) -> Self {
        Self {
            pattern: pattern.into(),
            target,
        }
    }
}

/// Embedding markers come first so they win when a URL carries both kinds.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new("/api/", TargetKind::Embedding),
        ClassificationRule::new("/embedding", TargetKind::Embedding),
        ClassificationRule::new("/collections", TargetKind::VectorStore),
        ClassificationRule::new("/points", TargetKind::VectorStore),
    ]
}

/// Ordered rule table; the first matching rule decides the target
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    rules: Vec<ClassificationRule>,
}

impl RequestClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn classify(&self, url: &str) -> TargetKind {
        self.rules
            .iter()
            .find(|rule| url.contains(rule.pattern.as_str()))
            .map(|rule| rule.target)
            .unwrap_or(TargetKind::Unclassified)
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}
