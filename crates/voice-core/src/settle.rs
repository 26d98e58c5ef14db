//! Decoding of the settled-promise envelope every native operation resolves with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{TwilioError, VoiceError};

pub const INVALID_ARGUMENT_ERROR: &str = "InvalidArgumentError";
pub const INVALID_STATE_ERROR: &str = "InvalidStateError";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromiseStatus {
    #[serde(rename = "promiseStatusValueResolved")]
    Resolved,
    #[serde(rename = "promiseStatusValueRejectedWithCode")]
    RejectedWithCode,
    #[serde(rename = "promiseStatusValueRejectedWithName")]
    RejectedWithName,
    /// Any other status resolves like `Resolved`.
    #[serde(other)]
    Other,
}

/// Result envelope of a native asynchronous operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativePromise {
    #[serde(rename = "promiseKeyStatus")]
    pub status: PromiseStatus,
    #[serde(rename = "promiseKeyValue", default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(rename = "promiseKeyErrorCode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    #[serde(rename = "promiseKeyErrorName", default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    #[serde(rename = "promiseKeyErrorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl NativePromise {
    pub fn resolved(value: Value) -> Self {
        Self {
            status: PromiseStatus::Resolved,
            value,
            error_code: None,
            error_name: None,
            error_message: None,
        }
    }

    pub fn rejected_with_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            status: PromiseStatus::RejectedWithCode,
            value: Value::Null,
            error_code: Some(code),
            error_name: None,
            error_message: Some(message.into()),
        }
    }

    pub fn rejected_with_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: PromiseStatus::RejectedWithName,
            value: Value::Null,
            error_code: None,
            error_name: Some(name.into()),
            error_message: Some(message.into()),
        }
    }
}

/// Turn an envelope into its resolved value or the typed error it carries.
pub fn settle<T: DeserializeOwned>(promise: NativePromise) -> Result<T, VoiceError> {
    match promise.status {
        PromiseStatus::RejectedWithCode => {
            let message = promise.error_message.ok_or_else(|| {
                VoiceError::InvalidArgument(
                    "The \"message\" argument is not of type \"string\".".to_string(),
                )
            })?;
            let code = promise.error_code.ok_or_else(|| {
                VoiceError::InvalidArgument(
                    "The \"code\" argument is not of type \"number\".".to_string(),
                )
            })?;
            tracing::warn!("native operation rejected with code {code}: {message}");
            Err(TwilioError::construct(code, Some(message)).into())
        }
        PromiseStatus::RejectedWithName => {
            let message = promise.error_message.unwrap_or_default();
            tracing::warn!(
                "native operation rejected with name {:?}: {message}",
                promise.error_name
            );
            Err(match promise.error_name.as_deref() {
                Some(INVALID_ARGUMENT_ERROR) => VoiceError::InvalidArgument(message),
                Some(INVALID_STATE_ERROR) => VoiceError::InvalidState(message),
                _ => VoiceError::UnexpectedNative {
                    misc: Some(Value::String(message.clone())),
                    message,
                },
            })
        }
        PromiseStatus::Resolved | PromiseStatus::Other => {
            serde_json::from_value(promise.value.clone()).map_err(|e| {
                VoiceError::UnexpectedNative {
                    message: format!("unexpected value from native layer: {e}"),
                    misc: Some(promise.value),
                }
            })
        }
    }
}

/// Like [`settle`], discarding whatever value the native layer resolved with.
pub fn settle_unit(promise: NativePromise) -> Result<(), VoiceError> {
    settle::<serde::de::IgnoredAny>(promise).map(|_| ())
}
