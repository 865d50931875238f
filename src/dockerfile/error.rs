use thiserror::Error;

/// Failure to turn Dockerfile text into a [`super::Dockerfile`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line where the offending instruction starts
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),

    #[error("{keyword} requires {expected}")]
    MissingArguments {
        keyword: String,
        expected: &'static str,
    },

    #[error("invalid argument for {keyword}: {message}")]
    InvalidArgument { keyword: String, message: String },

    #[error("unterminated quote in arguments")]
    UnterminatedQuote,

    #[error("file ends inside a line continuation")]
    UnterminatedContinuation,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_line() {
        let err = ParseError::new(3, ParseErrorKind::UnknownInstruction("FOO".to_string()));
        assert_eq!(err.to_string(), "line 3: unknown instruction 'FOO'");
    }

    #[test]
    fn test_missing_arguments_display() {
        let err = ParseError::new(
            1,
            ParseErrorKind::MissingArguments {
                keyword: "COPY".to_string(),
                expected: "at least one source and a destination",
            },
        );
        assert!(err
            .to_string()
            .contains("COPY requires at least one source and a destination"));
    }
}
