//! Top-level error types for the nomaster domain.
//!
//! [`NomasterError`] covers conditions that stop the bot before it serves:
//! invalid settings and an unusable comment pool. Failures of the remote
//! actions are not errors at all; they are reported as
//! [`crate::ActionOutcome`] values and only ever logged.

use thiserror::Error;

/// Errors that prevent the bot from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NomasterError {
    /// The comment pool has no templates.
    #[error("Comment pool has no templates")]
    EmptyCommentPool,

    /// The comment pool has no theme words to substitute.
    #[error("Comment pool has no theme words")]
    EmptyThemePool,

    /// A template does not contain the theme placeholder exactly once, or
    /// already contains a theme word.
    #[error("Invalid comment template '{template}': {reason}")]
    InvalidCommentTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; the bot never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}
