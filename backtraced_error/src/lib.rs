use std::backtrace::Backtrace;

pub fn error_chain_to_pretty_formatted<E>(error: &E) -> String
where
    E: std::error::Error + 'static,
{
    let mut error: &(dyn std::error::Error + 'static) = error;
    let mut err = format!("{}", error);
    while let Some(inner_err) = error.source() {
        err.push_str(&format!("\nCaused by: \n{}", inner_err));
        error = inner_err;
    }
    err
}

#[derive(Debug, thiserror::Error)]
#[error("ReqwestError Context: {context}\n{backtrace}")]
pub struct ReqwestError {
    #[source]
    pub source: reqwest::Error,
    pub context: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

impl ReqwestError {
    pub fn from_reqwest_error<S: Into<String>>(source: reqwest::Error, context: S) -> Self {
        Self {
            source,
            context: context.into(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("SerdeJsonError Context: {context}\n{bad_input_sample}\n{backtrace}")]
pub struct SerdeJsonError {
    #[source]
    pub source: serde_json::Error,
    pub context: String,
    pub bad_input_sample: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

/// How much of the offending payload is kept alongside a decoding error
pub const BAD_INPUT_SAMPLE_CHARS: usize = 512;

impl SerdeJsonError {
    pub fn from_serde_json_error<S: Into<String>>(
        source: serde_json::Error,
        context: S,
        bad_input: &str,
    ) -> Self {
        Self {
            source,
            context: context.into(),
            bad_input_sample: bad_input.chars().take(BAD_INPUT_SAMPLE_CHARS).collect(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[derive(Debug)]
pub struct OptionBacktracePrettyPrinter(pub Option<Backtrace>);

impl OptionBacktracePrettyPrinter {
    pub fn capture() -> Self {
        Self::from(Backtrace::capture())
    }
}

impl From<Backtrace> for OptionBacktracePrettyPrinter {
    fn from(value: Backtrace) -> Self {
        Self(Some(value))
    }
}
impl std::fmt::Display for OptionBacktracePrettyPrinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            Some(child) => write!(f, "{}", child),
            None => write!(f, "No backtrace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_includes_every_source() {
        let source = serde_json::from_str::<u64>("not a number").unwrap_err();
        let err = SerdeJsonError {
            source,
            context: "decoding test payload".to_string(),
            bad_input_sample: "not a number".to_string(),
            backtrace: OptionBacktracePrettyPrinter(None),
        };
        let formatted = error_chain_to_pretty_formatted(&err);
        assert!(formatted.starts_with("SerdeJsonError Context: decoding test payload"));
        assert!(formatted.contains("No backtrace"));
        assert!(formatted.contains("Caused by: \nexpected ident"));
    }

    #[test]
    fn bad_input_sample_is_truncated() {
        let long_input = "x".repeat(BAD_INPUT_SAMPLE_CHARS * 2);
        let source = serde_json::from_str::<u64>(&long_input).unwrap_err();
        let err = SerdeJsonError::from_serde_json_error(source, "long payload", &long_input);
        assert_eq!(err.bad_input_sample.chars().count(), BAD_INPUT_SAMPLE_CHARS);
    }
}
