use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// An internal invariant of the search was broken. Such errors abort the
    /// current sentence only.
    pub fn contract_violation(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::ContractViolation {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn sentence(index: usize, source: Error) -> Error {
        Error(
            ErrorKind::Sentence {
                index,
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Returns `true` for failures caused by broken internal invariants,
    /// as opposed to bad input or configuration.
    pub fn is_contract_violation(&self) -> bool {
        match self.kind() {
            ErrorKind::ContractViolation { .. } => true,
            ErrorKind::Sentence { source, .. } => source.is_contract_violation(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("contract violation: {message}")]
    ContractViolation { message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("failed to decode sentence {index}: {source}")]
    Sentence { index: usize, source: Box<Error> },

    #[error("external collaborator failed: {context}")]
    External {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_error_keeps_contract_flag() {
        let inner = Error::contract_violation("missing key");
        let err = Error::sentence(3, inner);
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("sentence 3"));

        let err = Error::sentence(1, Error::invalid_arg("stack_limit", "must be positive"));
        assert!(!err.is_contract_violation());
    }
}
