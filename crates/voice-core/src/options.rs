use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTACT_HANDLE: &str = "Default Contact";

/// Options accepted by `Voice::connect`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectOptions {
    /// Shown in the iOS call history. Empty or absent means "Default Contact".
    pub contact_handle: Option<String>,
    /// Android only.
    pub notification_display_name: Option<String>,
    /// Custom parameters forwarded to the TwiML application.
    pub params: BTreeMap<String, String>,
}

/// Kind of handle CallKit displays for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HandleType {
    Generic,
    PhoneNumber,
    EmailAddress,
}

impl From<HandleType> for u8 {
    fn from(t: HandleType) -> u8 {
        match t {
            HandleType::Generic => 0,
            HandleType::PhoneNumber => 1,
            HandleType::EmailAddress => 2,
        }
    }
}

impl TryFrom<u8> for HandleType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HandleType::Generic),
            1 => Ok(HandleType::PhoneNumber),
            2 => Ok(HandleType::EmailAddress),
            other => Err(format!("unknown CallKit handle type {other}")),
        }
    }
}

/// iOS CallKit provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallKitConfiguration {
    #[serde(rename = "callKitIconTemplateImageData", default, skip_serializing_if = "Option::is_none")]
    pub icon_template_image_data: Option<String>,
    #[serde(rename = "callKitIncludesCallsInRecents", default, skip_serializing_if = "Option::is_none")]
    pub includes_calls_in_recents: Option<bool>,
    #[serde(rename = "callKitMaximumCallGroups", default, skip_serializing_if = "Option::is_none")]
    pub maximum_call_groups: Option<u32>,
    #[serde(rename = "callKitMaximumCallsPerCallGroup", default, skip_serializing_if = "Option::is_none")]
    pub maximum_calls_per_call_group: Option<u32>,
    #[serde(rename = "callKitRingtoneSound", default, skip_serializing_if = "Option::is_none")]
    pub ringtone_sound: Option<String>,
    #[serde(rename = "callKitSupportedHandleTypes", default, skip_serializing_if = "Option::is_none")]
    pub supported_handle_types: Option<Vec<HandleType>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_kit_configuration_uses_native_keys() {
        let config = CallKitConfiguration {
            maximum_call_groups: Some(2),
            supported_handle_types: Some(vec![HandleType::PhoneNumber, HandleType::Generic]),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "callKitMaximumCallGroups": 2,
                "callKitSupportedHandleTypes": [1, 0],
            })
        );
    }

    #[test]
    fn unknown_handle_type_is_rejected() {
        let parsed: Result<CallKitConfiguration, _> =
            serde_json::from_value(json!({ "callKitSupportedHandleTypes": [7] }));
        assert!(parsed.is_err());
    }
}
