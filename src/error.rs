use thiserror::Error;

/// Errors raised by feature derivation.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("missing column {column} for match {match_id}")]
    MissingColumn { column: String, match_id: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeatureError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>, match_id: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
            match_id: match_id.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::MissingColumn { .. })
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;

#[cfg(test)]
mod tests {
    use super::FeatureError;

    #[test]
    fn validation_message_names_field() {
        let err = FeatureError::validation("home_odds", "must be positive, got -1");
        assert_eq!(err.to_string(), "invalid home_odds: must be positive, got -1");
        assert!(err.is_validation());
    }

    #[test]
    fn missing_column_names_match() {
        let err = FeatureError::missing_column("away_form", "m42");
        assert_eq!(err.to_string(), "missing column away_form for match m42");
    }
}
