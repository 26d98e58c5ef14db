//! Structural checks on caller-supplied options.
//!
//! Every validator runs before anything reaches the native layer and fails
//! with [`VoiceError::InvalidArgument`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::call_message::{CallMessage, MESSAGE_TYPE_USER_DEFINED, ValidatedCallMessage};
use crate::errors::VoiceError;
use crate::options::ConnectOptions;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceTransportPolicy {
    Relay,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub server_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodecType {
    Opus,
    Pcmu,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioCodec {
    pub codec_type: Option<AudioCodecType>,
    pub max_average_bitrate: Option<f64>,
}

fn invalid(message: &str) -> VoiceError {
    VoiceError::InvalidArgument(message.to_string())
}

pub fn validate_ice_transport_policy(value: &Value) -> Result<IceTransportPolicy, VoiceError> {
    match value.as_str() {
        Some("relay") => Ok(IceTransportPolicy::Relay),
        Some("all") => Ok(IceTransportPolicy::All),
        _ => Err(invalid(
            "If \"iceTransportPolicy\" is present, it must be a string of value \"relay\" or \"all\".",
        )),
    }
}

/// Accepts exactly `{serverUrl}` or `{username, password, serverUrl}`.
pub fn validate_ice_server(value: &Value) -> Result<IceServer, VoiceError> {
    let server = value
        .as_object()
        .ok_or_else(|| invalid("\"iceServer\" must be a non-null object."))?;

    let username = optional_string(server, "username")?;
    let password = optional_string(server, "password")?;
    let server_url = optional_string(server, "serverUrl")?;

    match (username, password, server_url) {
        (Some(username), Some(password), Some(server_url)) => Ok(IceServer {
            server_url,
            username: Some(username),
            password: Some(password),
        }),
        (None, None, Some(server_url)) => Ok(IceServer {
            server_url,
            username: None,
            password: None,
        }),
        _ => Err(invalid(
            "Ice server must have type: { serverUrl: string } | { username: string; password: string; serverUrl: string }",
        )),
    }
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Result<Option<String>, VoiceError> {
    match object.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(VoiceError::InvalidArgument(format!(
            "If \"{key}\" is present in \"iceServer\", it must be a string."
        ))),
    }
}

pub fn validate_ice_servers(value: &Value) -> Result<Vec<IceServer>, VoiceError> {
    let servers = value.as_array().ok_or_else(|| {
        invalid("If \"iceServers\" are present, it must be an array of valid IceServer objects.")
    })?;
    servers.iter().map(validate_ice_server).collect()
}

pub fn validate_audio_codec(value: &Value) -> Result<AudioCodec, VoiceError> {
    let codec = value
        .as_object()
        .ok_or_else(|| invalid("If \"audioCodec\" is present, it must be an object."))?;

    let codec_type = match codec.get("type") {
        None => None,
        Some(t) => Some(match t.as_str() {
            Some("opus") => AudioCodecType::Opus,
            Some("pcmu") => AudioCodecType::Pcmu,
            _ => {
                return Err(invalid(
                    "The type of \"audioCodec.type\" must be a string valued one of [\"opus\", \"pcmu\"].",
                ));
            }
        }),
    };

    let max_average_bitrate = match codec.get("maxAverageBitrate") {
        None => None,
        Some(b) => Some(b.as_f64().ok_or_else(|| {
            invalid("The type of \"audioCodec.maxAverageBitrate\" must be a number.")
        })?),
    };

    Ok(AudioCodec {
        codec_type,
        max_average_bitrate,
    })
}

pub fn validate_audio_codecs(value: &Value) -> Result<Vec<AudioCodec>, VoiceError> {
    let codecs = value.as_array().ok_or_else(|| {
        invalid(
            "If \"preferredAudioCodecs\" is present, it must be an array of valid \"audioCodec\" objects.",
        )
    })?;
    codecs.iter().map(validate_audio_codec).collect()
}

/// Validate only the keys present in `options`, returning them untouched.
pub fn validate_preflight_options(options: &Value) -> Result<&Value, VoiceError> {
    let Some(object) = options.as_object() else {
        return Ok(options);
    };
    if let Some(policy) = object.get("iceTransportPolicy") {
        validate_ice_transport_policy(policy)?;
    }
    if let Some(servers) = object.get("iceServers") {
        validate_ice_servers(servers)?;
    }
    if let Some(codecs) = object.get("preferredAudioCodecs") {
        validate_audio_codecs(codecs)?;
    }
    Ok(options)
}

/// Apply the default content type and serialise non-string content as JSON.
pub fn validate_call_message(message: &CallMessage) -> Result<ValidatedCallMessage, VoiceError> {
    let content_type = message
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    if message.message_type != MESSAGE_TYPE_USER_DEFINED {
        return Err(VoiceError::InvalidArgument(format!(
            "\"messageType\" must be one of [\"{MESSAGE_TYPE_USER_DEFINED}\"]."
        )));
    }

    let content = match &message.content {
        Value::Null => return Err(invalid("\"content\" must be defined and not \"null\".")),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok(ValidatedCallMessage {
        content,
        content_type,
        message_type: message.message_type.clone(),
    })
}

pub fn validate_token(token: &str) -> Result<(), VoiceError> {
    if token.is_empty() {
        return Err(invalid("Argument \"token\" must be a non-empty string."));
    }
    Ok(())
}

/// Build [`ConnectOptions`] from an untyped options object.
pub fn parse_connect_options(value: &Value) -> Result<ConnectOptions, VoiceError> {
    let object = match value {
        Value::Null => return Ok(ConnectOptions::default()),
        Value::Object(object) => object,
        _ => return Err(invalid("Optional argument \"options\" must be undefined or of type \"object\".")),
    };

    let contact_handle = match object.get("contactHandle") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(invalid(
                "Optional argument \"contactHandle\" must be undefined or of type \"string\".",
            ));
        }
    };

    let notification_display_name = match object.get("notificationDisplayName") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(invalid(
                "Optional argument \"notificationDisplayName\" must be undefined or of type \"string\".",
            ));
        }
    };

    let params = match object.get("params") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(params)) => params
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key.clone(), s.clone())),
                _ => Err(VoiceError::InvalidArgument(format!(
                    "Voice.ConnectOptions.params[\"{key}\"] must be of type string"
                ))),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(invalid(
                "Optional argument \"params\" must be undefined or of type \"object\".",
            ));
        }
    };

    Ok(ConnectOptions {
        contact_handle,
        notification_display_name,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use serde_json::json;

    fn message_of(err: VoiceError) -> String {
        assert_eq!(err.category(), ErrorCategory::ArgumentValidation);
        err.to_string()
    }

    #[test]
    fn ice_transport_policy() {
        assert_eq!(
            validate_preflight_options(&json!({ "iceTransportPolicy": "relay" })).unwrap(),
            &json!({ "iceTransportPolicy": "relay" })
        );
        let err = validate_preflight_options(&json!({ "iceTransportPolicy": "bogus" })).unwrap_err();
        assert_eq!(
            message_of(err),
            "If \"iceTransportPolicy\" is present, it must be a string of value \"relay\" or \"all\"."
        );
        assert!(validate_ice_transport_policy(&json!(1)).is_err());
    }

    #[test]
    fn ice_server_shapes() {
        let url_only = validate_ice_server(&json!({ "serverUrl": "turn:x" })).unwrap();
        assert_eq!(url_only.server_url, "turn:x");
        assert_eq!(url_only.username, None);

        let full = validate_ice_server(&json!({
            "username": "a", "password": "b", "serverUrl": "turn:x"
        }))
        .unwrap();
        assert_eq!(full.password.as_deref(), Some("b"));

        let err = validate_ice_server(&json!({ "username": "a" })).unwrap_err();
        assert!(message_of(err).starts_with("Ice server must have type"));

        assert!(validate_ice_server(&json!({ "username": "a", "serverUrl": "turn:x" })).is_err());
        assert!(validate_ice_server(&json!(null)).is_err());

        let err = validate_ice_server(&json!({ "serverUrl": 3 })).unwrap_err();
        assert_eq!(
            message_of(err),
            "If \"serverUrl\" is present in \"iceServer\", it must be a string."
        );
    }

    #[test]
    fn ice_servers_short_circuit_on_first_failure() {
        let err = validate_ice_servers(&json!([
            { "serverUrl": "stun:ok" },
            { "password": 5 },
            { "username": "x" },
        ]))
        .unwrap_err();
        assert_eq!(
            message_of(err),
            "If \"password\" is present in \"iceServer\", it must be a string."
        );
        assert!(validate_ice_servers(&json!({ "serverUrl": "x" })).is_err());
    }

    #[test]
    fn audio_codecs() {
        let codecs = validate_audio_codecs(&json!([
            { "type": "opus", "maxAverageBitrate": 16000 },
            {},
        ]))
        .unwrap();
        assert_eq!(codecs[0].codec_type, Some(AudioCodecType::Opus));
        assert_eq!(codecs[0].max_average_bitrate, Some(16000.0));
        assert_eq!(codecs[1].codec_type, None);

        assert!(validate_audio_codec(&json!({ "type": "g722" })).is_err());
        let err = validate_audio_codec(&json!({ "maxAverageBitrate": "fast" })).unwrap_err();
        assert_eq!(
            message_of(err),
            "The type of \"audioCodec.maxAverageBitrate\" must be a number."
        );
        assert!(validate_audio_codecs(&json!("opus")).is_err());
    }

    #[test]
    fn preflight_options_only_check_present_keys() {
        let options = json!({ "unrelated": 1 });
        assert_eq!(validate_preflight_options(&options).unwrap(), &options);

        let err = validate_preflight_options(&json!({
            "iceServers": [{ "serverUrl": "turn:x" }],
            "preferredAudioCodecs": [{ "type": "speex" }],
        }))
        .unwrap_err();
        assert!(message_of(err).contains("audioCodec.type"));
    }

    #[test]
    fn call_message_defaults_and_serialisation() {
        let validated = validate_call_message(&CallMessage {
            content: json!({ "key": "value" }),
            content_type: None,
            message_type: "user-defined-message".into(),
        })
        .unwrap();
        assert_eq!(validated.content, r#"{"key":"value"}"#);
        assert_eq!(validated.content_type, "application/json");

        let validated = validate_call_message(&CallMessage {
            content: json!("plain"),
            content_type: Some("text/plain".into()),
            message_type: "user-defined-message".into(),
        })
        .unwrap();
        assert_eq!(validated.content, "plain");
        assert_eq!(validated.content_type, "text/plain");
    }

    #[test]
    fn call_message_rejections() {
        let err = validate_call_message(&CallMessage {
            content: Value::Null,
            content_type: None,
            message_type: "user-defined-message".into(),
        })
        .unwrap_err();
        assert_eq!(message_of(err), "\"content\" must be defined and not \"null\".");

        assert!(
            validate_call_message(&CallMessage {
                content: json!(1),
                content_type: None,
                message_type: "system".into(),
            })
            .is_err()
        );
    }

    #[test]
    fn connect_options_params_must_be_strings() {
        let err = parse_connect_options(&json!({ "params": { "to": "alice", "n": 1 } })).unwrap_err();
        assert_eq!(
            message_of(err),
            "Voice.ConnectOptions.params[\"n\"] must be of type string"
        );

        let err = parse_connect_options(&json!({ "contactHandle": 3 })).unwrap_err();
        assert!(message_of(err).contains("contactHandle"));

        let options = parse_connect_options(&json!({
            "contactHandle": "Bob",
            "params": { "to": "alice" },
        }))
        .unwrap();
        assert_eq!(options.contact_handle.as_deref(), Some("Bob"));
        assert_eq!(options.params.get("to").map(String::as_str), Some("alice"));
        assert_eq!(parse_connect_options(&Value::Null).unwrap(), ConnectOptions::default());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(validate_token("").is_err());
        assert!(validate_token("eyJ").is_ok());
    }
}
