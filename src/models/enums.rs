use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ProcessingState {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

impl ProcessingState {
    /// Terminal states never transition again without a fresh submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

str_enum!(AuditStage {
    Upload => "upload",
    Ocr => "ocr",
    Extraction => "extraction",
    Validation => "validation",
    Completion => "completion",
    Error => "error",
});

str_enum!(AuditSeverity {
    Debug => "debug",
    Info => "info",
    Warning => "warning",
    Error => "error",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn processing_state_round_trip() {
        for (variant, s) in [
            (ProcessingState::Pending, "pending"),
            (ProcessingState::Processing, "processing"),
            (ProcessingState::Completed, "completed"),
            (ProcessingState::Failed, "failed"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ProcessingState::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn audit_stage_round_trip() {
        for (variant, s) in [
            (AuditStage::Upload, "upload"),
            (AuditStage::Ocr, "ocr"),
            (AuditStage::Extraction, "extraction"),
            (AuditStage::Validation, "validation"),
            (AuditStage::Completion, "completion"),
            (AuditStage::Error, "error"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AuditStage::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn audit_severity_round_trip() {
        for (variant, s) in [
            (AuditSeverity::Debug, "debug"),
            (AuditSeverity::Info, "info"),
            (AuditSeverity::Warning, "warning"),
            (AuditSeverity::Error, "error"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AuditSeverity::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!ProcessingState::Pending.is_terminal());
        assert!(!ProcessingState::Processing.is_terminal());
        assert!(ProcessingState::Completed.is_terminal());
        assert!(ProcessingState::Failed.is_terminal());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(ProcessingState::from_str("archived").is_err());
        assert!(AuditStage::from_str("unknown").is_err());
        assert!(AuditSeverity::from_str("").is_err());
    }
}
