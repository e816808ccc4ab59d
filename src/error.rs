use k8s_event_types::InvalidLevel;

/// Errors raised while reading a `k8s_event` stanza
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidLevel(#[from] InvalidLevel),

    #[error("line {line}: Wrong argument count or unexpected line ending after '{token}'")]
    ArgumentCount { line: usize, token: String },

    #[error("line {line}: {field} must be in range [{min}, {max}]: {value}")]
    OutOfRange {
        line: usize,
        field: &'static str,
        min: String,
        max: String,
        value: String,
    },

    #[error("line {line}: unknown property '{name}'")]
    UnknownDirective { line: usize, name: String },

    #[error("this plugin may only be used once")]
    DuplicateStanza,

    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: unbalanced braces")]
    UnbalancedBrace { line: usize },
}

/// A setup failure attributed to the plugin that raised it
#[derive(Debug, thiserror::Error)]
#[error("plugin/{plugin}: {source}")]
pub struct PluginError {
    pub plugin: &'static str,
    #[source]
    pub source: ConfigError,
}
