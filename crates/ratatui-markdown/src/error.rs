use thiserror::Error;

/// Failure of the parse step. Everything after parsing is total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed markdown at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("markdown input is {len} bytes, limit is {max}")]
    TooLarge { len: usize, max: usize },

    #[error("parse worker unavailable: {0}")]
    Worker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offset() {
        let err = ParseError::Malformed {
            offset: 12,
            reason: "unclosed list".into(),
        };
        assert_eq!(err.to_string(), "malformed markdown at byte 12: unclosed list");
        let err = ParseError::TooLarge { len: 10, max: 4 };
        assert_eq!(err.to_string(), "markdown input is 10 bytes, limit is 4");
    }
}
