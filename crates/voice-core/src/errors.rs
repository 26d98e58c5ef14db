use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error_table::{ErrorFamily, TwilioErrorKind};

const GENERIC_NAME: &str = "TwilioError";
const GENERIC_DESCRIPTION: &str = "Generic Twilio error.";
const GENERIC_EXPLANATION: &str = "The SDK has encountered an unexpected error.";

/// Error payload `{ code, message }` embedded in native events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NativeErrorInfo {
    pub code: u32,
    #[serde(default)]
    pub message: Option<String>,
}

/// A coded error reported by the native voice engine.
///
/// Known codes carry the catalogue metadata of their [`TwilioErrorKind`].
/// Unknown codes keep the code and message and fall back to generic text.
#[derive(Debug, Clone, PartialEq)]
pub struct TwilioError {
    kind: Option<TwilioErrorKind>,
    code: u32,
    message: String,
}

impl TwilioError {
    /// Build the error registered for `code`.
    ///
    /// A missing message is replaced with the kind's explanation. Coded
    /// messages read `"{name} ({code}): {message}"`.
    pub fn construct(code: u32, message: Option<String>) -> Self {
        match TwilioErrorKind::from_code(code) {
            Some(kind) => {
                let info = kind.info();
                let msg = message.unwrap_or_else(|| info.explanation.to_string());
                Self {
                    kind: Some(kind),
                    code,
                    message: format!("{} ({}): {}", info.name, code, msg),
                }
            }
            None => Self {
                kind: None,
                code,
                message: message.unwrap_or_else(|| GENERIC_EXPLANATION.to_string()),
            },
        }
    }

    pub fn kind(&self) -> Option<TwilioErrorKind> {
        self.kind
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn name(&self) -> &'static str {
        self.kind.map_or(GENERIC_NAME, |k| k.info().name)
    }

    pub fn family(&self) -> Option<ErrorFamily> {
        self.kind.map(|k| k.info().family)
    }

    pub fn description(&self) -> &'static str {
        self.kind.map_or(GENERIC_DESCRIPTION, |k| k.info().description)
    }

    pub fn explanation(&self) -> &'static str {
        self.kind.map_or(GENERIC_EXPLANATION, |k| k.info().explanation)
    }

    pub fn causes(&self) -> &'static [&'static str] {
        self.kind.map_or(&[], |k| k.info().causes)
    }

    pub fn solutions(&self) -> &'static [&'static str] {
        self.kind.map_or(&[], |k| k.info().solutions)
    }
}

impl fmt::Display for TwilioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TwilioError {}

impl From<NativeErrorInfo> for TwilioError {
    fn from(info: NativeErrorInfo) -> Self {
        Self::construct(info.code, info.message)
    }
}

/// Map a message and numeric code onto the matching coded error.
pub fn construct_twilio_error(message: impl Into<String>, code: u32) -> TwilioError {
    TwilioError::construct(code, Some(message.into()))
}

/// Coarse classification of a [`VoiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ArgumentValidation,
    StateViolation,
    PlatformUnsupported,
    NativeDomain,
    NativeUnexpected,
    InternalInvariant,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoiceError {
    #[error("{0}")]
    Twilio(TwilioError),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    UnsupportedPlatform(String),
    #[error("{message}")]
    UnexpectedNative { message: String, misc: Option<Value> },
    #[error("internal error: {0}")]
    Internal(String),
}

impl VoiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Twilio(_) => ErrorCategory::NativeDomain,
            Self::InvalidArgument(_) => ErrorCategory::ArgumentValidation,
            Self::InvalidState(_) => ErrorCategory::StateViolation,
            Self::UnsupportedPlatform(_) => ErrorCategory::PlatformUnsupported,
            Self::UnexpectedNative { .. } => ErrorCategory::NativeUnexpected,
            Self::Internal(_) => ErrorCategory::InternalInvariant,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Twilio(e) => e.name(),
            Self::InvalidArgument(_) => "InvalidArgumentError",
            Self::InvalidState(_) => "InvalidStateError",
            Self::UnsupportedPlatform(_) => "UnsupportedPlatformError",
            Self::UnexpectedNative { .. } => "UnexpectedNativeError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Numeric code, present only for coded native errors.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Twilio(e) => Some(e.code()),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Twilio(e) => e.description(),
            Self::UnsupportedPlatform(_) => "Unsupported platform error.",
            Self::UnexpectedNative { .. } => "Unexpected native error.",
            _ => GENERIC_DESCRIPTION,
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Twilio(e) => e.explanation(),
            Self::UnsupportedPlatform(_) => "An unsupported platform has been detected.",
            Self::UnexpectedNative { .. } => "An unexpected native error has occurred.",
            _ => GENERIC_EXPLANATION,
        }
    }

    pub fn causes(&self) -> &'static [&'static str] {
        match self {
            Self::Twilio(e) => e.causes(),
            _ => &[],
        }
    }

    pub fn solutions(&self) -> &'static [&'static str] {
        match self {
            Self::Twilio(e) => e.solutions(),
            _ => &[],
        }
    }

    pub(crate) fn unsupported(platform: &str, supported: &str) -> Self {
        Self::UnsupportedPlatform(format!(
            "Unsupported platform \"{platform}\". This method is only supported on {supported}."
        ))
    }
}

impl From<TwilioError> for VoiceError {
    fn from(e: TwilioError) -> Self {
        Self::Twilio(e)
    }
}

impl From<NativeErrorInfo> for VoiceError {
    fn from(info: NativeErrorInfo) -> Self {
        Self::Twilio(info.into())
    }
}
