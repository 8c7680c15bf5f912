use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Status transition from {from} to {to} is not allowed")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Malformed task context: {0}")]
    MalformedContext(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_display_names_both_states() {
        let error = CoreError::InvalidStatusTransition {
            from: "applied".to_string(),
            to: "analyzing".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("applied"));
        assert!(msg.contains("analyzing"));
    }

    #[test]
    fn test_malformed_context_keeps_the_reason() {
        let error = CoreError::MalformedContext("unknown tag 'review'".to_string());
        assert!(error.to_string().contains("unknown tag"));
    }
}
