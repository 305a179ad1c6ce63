use thiserror::Error;

/// Rejected analysis input. The message names the offending flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{flag} must be between {min} and {max}")]
    OutOfRange {
        flag: &'static str,
        min: String,
        max: String,
    },
    #[error("{flag} must be >= 0")]
    Negative { flag: &'static str },
    #[error("{flag} must be a finite number")]
    NotFinite { flag: &'static str },
    #[error("--template must be < {count}")]
    UnknownTemplate { count: usize },
    #[error("Invalid API payload: {0}")]
    Payload(String),
    #[error("Could not read holdings CSV: {0}")]
    HoldingsCsv(String),
}

impl InputError {
    pub fn out_of_range(flag: &'static str, min: f64, max: f64) -> Self {
        InputError::OutOfRange {
            flag,
            min: min.to_string(),
            max: max.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_flag() {
        let err = InputError::out_of_range("--age", 18.0, 100.0);
        assert_eq!(err.to_string(), "--age must be between 18 and 100");
        assert_eq!(
            InputError::Negative { flag: "--investment" }.to_string(),
            "--investment must be >= 0"
        );
        assert_eq!(
            InputError::UnknownTemplate { count: 6 }.to_string(),
            "--template must be < 6"
        );
    }
}
