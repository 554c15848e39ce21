use serde::{Deserialize, Serialize};

/// Outcome of the business-rule validation pass.
///
/// The four issue lists are independent: only `errors` blocks a document;
/// violations and quality issues force review without invalidating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub requires_review: bool,
    pub confidence_score: f64,
    pub errors: Vec<String>,
    pub rule_violations: Vec<String>,
    pub quality_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            is_valid: true,
            requires_review: false,
            confidence_score: 0.0,
            errors: Vec::new(),
            rule_violations: Vec::new(),
            quality_issues: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocking problem. Any error makes the document invalid.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    /// Policy-bound breach. Forces review but never invalidates on its own.
    pub fn push_violation(&mut self, message: impl Into<String>) {
        self.rule_violations.push(message.into());
    }

    pub fn push_quality_issue(&mut self, message: impl Into<String>) {
        self.quality_issues.push(message.into());
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn push_recommendation(&mut self, message: impl Into<String>) {
        self.recommendations.push(message.into());
    }
}
