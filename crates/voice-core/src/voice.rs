//! Process-wide voice façade.
//!
//! `Voice` mints [`Call`], [`CallInvite`] and [`PreflightTest`] handles from
//! native results and events, and forwards registration and device-level
//! operations to the platform.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::audio_device::{AudioDevice, NativeAudioDeviceInfo};
use crate::bridge::{NativeBridge, NativeEventSubscriber, NativeMethod, Scope, decode_event};
use crate::call::{Call, NativeCallInfo};
use crate::call_invite::{CallInvite, NativeCallInviteInfo};
use crate::errors::{NativeErrorInfo, TwilioError, VoiceError};
use crate::events::{EventEmitter, EventListener, ListenerId};
use crate::options::{CallKitConfiguration, ConnectOptions};
use crate::platform::Platform;
use crate::preflight::PreflightTest;
use crate::validation::{validate_preflight_options, validate_token};

#[derive(Deserialize)]
#[serde(tag = "type")]
enum NativeVoiceEvent {
    #[serde(rename = "voiceEventError")]
    Error { error: NativeErrorInfo },
    #[serde(rename = "voiceEventTypeValueIncomingCallInvite")]
    CallInvite {
        #[serde(rename = "callInvite")]
        call_invite: NativeCallInviteInfo,
    },
    #[serde(rename = "voiceEventRegistered")]
    Registered,
    #[serde(rename = "voiceEventUnregistered")]
    Unregistered,
    #[serde(rename = "voiceEventAudioDevicesUpdated")]
    AudioDevicesUpdated(NativeAudioDevices),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeAudioDevices {
    audio_devices: Vec<NativeAudioDeviceInfo>,
    #[serde(default)]
    selected_device: Option<NativeAudioDeviceInfo>,
}

/// Events the [`Voice`] façade emits to application listeners.
#[derive(Debug, Clone)]
pub enum VoiceEvent {
    Error(TwilioError),
    CallInvite(CallInvite),
    Registered,
    Unregistered,
    AudioDevicesUpdated {
        audio_devices: Vec<AudioDevice>,
        selected_device: Option<AudioDevice>,
    },
}

/// Audio routes known to the native layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDevices {
    pub audio_devices: Vec<AudioDevice>,
    pub selected_device: Option<AudioDevice>,
}

struct Inner {
    bridge: NativeBridge,
    emitter: EventEmitter<VoiceEvent>,
}

impl Inner {
    fn audio_devices(&self, native: NativeAudioDevices) -> AudioDevices {
        AudioDevices {
            audio_devices: native
                .audio_devices
                .into_iter()
                .map(|info| AudioDevice::new(&self.bridge, info))
                .collect(),
            selected_device: native.selected_device.map(|info| AudioDevice::new(&self.bridge, info)),
        }
    }
}

impl NativeEventSubscriber for Inner {
    fn handle_native_event(&self, event: &Value) -> Result<(), VoiceError> {
        let public = match decode_event(Scope::Voice, event)? {
            NativeVoiceEvent::Error { error } => {
                tracing::warn!("native voice error {}: {:?}", error.code, error.message);
                VoiceEvent::Error(error.into())
            }
            NativeVoiceEvent::CallInvite { call_invite } => {
                tracing::info!("incoming call invite {}", call_invite.call_sid);
                VoiceEvent::CallInvite(CallInvite::new(&self.bridge, call_invite))
            }
            NativeVoiceEvent::Registered => VoiceEvent::Registered,
            NativeVoiceEvent::Unregistered => VoiceEvent::Unregistered,
            NativeVoiceEvent::AudioDevicesUpdated(devices) => {
                let devices = self.audio_devices(devices);
                VoiceEvent::AudioDevicesUpdated {
                    audio_devices: devices.audio_devices,
                    selected_device: devices.selected_device,
                }
            }
        };
        self.emitter.emit(public);
        Ok(())
    }
}

/// Entry point for placing calls and receiving invites.
#[derive(Clone)]
pub struct Voice {
    inner: Arc<Inner>,
}

impl Voice {
    pub fn new(bridge: NativeBridge) -> Self {
        let inner = Arc::new(Inner {
            bridge,
            emitter: EventEmitter::new(),
        });
        let subscriber: Arc<dyn NativeEventSubscriber> = inner.clone();
        inner.bridge.subscribe(Scope::Voice, Arc::downgrade(&subscriber));
        tracing::info!("voice façade ready on {}", inner.bridge.platform().platform());
        Self { inner }
    }

    pub fn platform(&self) -> Platform {
        self.inner.bridge.platform().platform()
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<VoiceEvent>>) -> ListenerId {
        self.inner.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.emitter.remove_listener(id)
    }

    /// Place an outgoing call.
    pub async fn connect(&self, token: &str, options: ConnectOptions) -> Result<Call, VoiceError> {
        validate_token(token)?;
        let bridge = &self.inner.bridge;
        let info = bridge.platform().connect(bridge, token.to_string(), options).await?;
        tracing::info!("connected call {}", info.uuid);
        Ok(Call::new(bridge, info))
    }

    pub async fn register(&self, token: &str) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::VoiceRegister { token: token.to_string() })
            .await
    }

    pub async fn unregister(&self, token: &str) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::VoiceUnregister { token: token.to_string() })
            .await
    }

    /// Calls the native layer currently tracks, keyed by uuid.
    pub async fn get_calls(&self) -> Result<HashMap<String, Call>, VoiceError> {
        let infos: Vec<NativeCallInfo> = self.inner.bridge.call(NativeMethod::VoiceGetCalls).await?;
        Ok(infos
            .into_iter()
            .map(|info| (info.uuid.clone(), Call::new(&self.inner.bridge, info)))
            .collect())
    }

    /// Pending invites the native layer currently tracks, keyed by uuid.
    pub async fn get_call_invites(&self) -> Result<HashMap<String, CallInvite>, VoiceError> {
        let infos: Vec<NativeCallInviteInfo> = self.inner.bridge.call(NativeMethod::VoiceGetCallInvites).await?;
        Ok(infos
            .into_iter()
            .map(|info| (info.uuid.clone(), CallInvite::new(&self.inner.bridge, info)))
            .collect())
    }

    pub async fn get_audio_devices(&self) -> Result<AudioDevices, VoiceError> {
        let native: NativeAudioDevices = self.inner.bridge.call(NativeMethod::VoiceGetAudioDevices).await?;
        Ok(self.inner.audio_devices(native))
    }

    /// Start a preflight test. Options are validated before the native layer
    /// is involved.
    pub async fn run_preflight(&self, token: &str, options: Value) -> Result<PreflightTest, VoiceError> {
        validate_preflight_options(&options)?;
        let uuid: String = self
            .inner
            .bridge
            .call(NativeMethod::VoiceRunPreflight {
                token: token.to_string(),
                options,
            })
            .await?;
        Ok(PreflightTest::new(&self.inner.bridge, uuid))
    }

    pub async fn get_version(&self) -> Result<String, VoiceError> {
        self.inner.bridge.call(NativeMethod::VoiceGetVersion).await
    }

    pub async fn get_device_token(&self) -> Result<String, VoiceError> {
        self.inner.bridge.call(NativeMethod::VoiceGetDeviceToken).await
    }

    /// Show the system audio route picker. iOS only; resolves without doing
    /// anything on Android.
    pub async fn show_av_route_picker_view(&self) -> Result<(), VoiceError> {
        let bridge = &self.inner.bridge;
        bridge.platform().show_av_route_picker_view(bridge).await
    }

    pub async fn initialize_push_registry(&self) -> Result<(), VoiceError> {
        let bridge = &self.inner.bridge;
        bridge.platform().initialize_push_registry(bridge).await
    }

    pub async fn set_call_kit_configuration(&self, configuration: CallKitConfiguration) -> Result<(), VoiceError> {
        let bridge = &self.inner.bridge;
        bridge.platform().set_call_kit_configuration(bridge, configuration).await
    }

    /// Hand a Firebase data message to the native layer. Android only.
    pub async fn handle_firebase_message(&self, message: BTreeMap<String, String>) -> Result<bool, VoiceError> {
        let bridge = &self.inner.bridge;
        bridge.platform().handle_firebase_message(bridge, message).await
    }

    /// Template for the caller name of incoming calls, e.g. `"{DisplayName}"`.
    /// `None` restores the native default.
    pub async fn set_incoming_call_contact_handle_template(&self, template: Option<String>) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::VoiceSetIncomingCallContactHandleTemplate { template })
            .await
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice").field("bridge", &self.inner.bridge).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallState;
    use crate::call_invite::CallInviteState;
    use crate::errors::ErrorCategory;
    use crate::settle::NativePromise;
    use crate::test_support::{Capture, harness, harness_on};
    use serde_json::json;

    #[tokio::test]
    async fn incoming_invite_end_to_end() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        let capture = Capture::new();
        voice.add_listener(capture.listener());

        h.bus
            .dispatch(
                Scope::Voice,
                &json!({
                    "type": "voiceEventTypeValueIncomingCallInvite",
                    "callInvite": { "uuid": "u1", "callSid": "CA123", "from": "client:alice", "to": "client:bob" },
                }),
            )
            .unwrap();

        let invite = match capture.get(0) {
            VoiceEvent::CallInvite(invite) => invite,
            other => panic!("expected call invite, got {other:?}"),
        };
        assert_eq!(invite.state(), CallInviteState::Pending);
        assert_eq!(invite.call_sid(), "CA123");

        let invite_events = Capture::new();
        invite.add_listener(invite_events.listener());
        h.native.respond_value("callInvite_accept", json!({ "uuid": "u1", "sid": "CA123" }));

        let call = invite.accept(json!({})).await.unwrap();
        assert_eq!(call.state(), CallState::Connecting);

        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({
                    "type": "callInviteEventTypeValueAccepted",
                    "callSid": "CA123",
                    "callInvite": { "uuid": "u1", "callSid": "CA123" },
                }),
            )
            .unwrap();
        assert!(invite_events.is_empty());
        assert_eq!(invite.state(), CallInviteState::Accepted);

        assert!(matches!(invite.reject().await, Err(VoiceError::InvalidState(_))));
    }

    #[test]
    fn error_registration_and_devices_events() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        let capture = Capture::new();
        voice.add_listener(capture.listener());

        for event in [
            json!({ "type": "voiceEventError", "error": { "code": 20101, "message": "expired" } }),
            json!({ "type": "voiceEventRegistered" }),
            json!({ "type": "voiceEventUnregistered" }),
            json!({
                "type": "voiceEventAudioDevicesUpdated",
                "audioDevices": [
                    { "uuid": "d1", "type": "earpiece", "name": "Phone" },
                    { "uuid": "d2", "type": "speaker", "name": "Speaker" },
                ],
                "selectedDevice": { "uuid": "d2", "type": "speaker", "name": "Speaker" },
            }),
        ] {
            h.bus.dispatch(Scope::Voice, &event).unwrap();
        }

        assert_eq!(capture.len(), 4);
        match capture.get(0) {
            VoiceEvent::Error(e) => {
                assert_eq!(e.code(), 20101);
                assert_eq!(e.name(), "AccessTokenInvalid");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(capture.get(1), VoiceEvent::Registered));
        assert!(matches!(capture.get(2), VoiceEvent::Unregistered));
        match capture.get(3) {
            VoiceEvent::AudioDevicesUpdated { audio_devices, selected_device } => {
                assert_eq!(audio_devices.len(), 2);
                assert_eq!(selected_device.map(|d| d.uuid().to_string()).as_deref(), Some("d2"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_voice_event_is_internal_error() {
        let h = harness();
        let _voice = Voice::new(h.bridge.clone());
        let err = h
            .bus
            .dispatch(Scope::Voice, &json!({ "type": "voiceEventExploded" }))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InternalInvariant);
    }

    #[tokio::test]
    async fn connect_validates_token_before_native_call() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        let err = voice.connect("", ConnectOptions::default()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ArgumentValidation);
        assert!(h.native.calls().is_empty());
    }

    #[tokio::test]
    async fn connect_wraps_native_call_info() {
        let h = harness_on(Platform::Android);
        let voice = Voice::new(h.bridge.clone());
        h.native.respond_value(
            "voice_connect_android",
            json!({ "uuid": "c1", "state": "ringing", "customParameters": { "k": "v" } }),
        );

        let options = ConnectOptions {
            notification_display_name: Some("Support".into()),
            params: BTreeMap::from([("To".to_string(), "+15550100".to_string())]),
            ..Default::default()
        };
        let call = voice.connect("tok", options).await.unwrap();

        assert_eq!(call.uuid(), "c1");
        assert_eq!(call.state(), CallState::Ringing);
        assert_eq!(
            h.native.calls(),
            vec![NativeMethod::VoiceConnectAndroid {
                token: "tok".into(),
                params: BTreeMap::from([("To".to_string(), "+15550100".to_string())]),
                notification_display_name: Some("Support".into()),
            }]
        );
    }

    #[tokio::test]
    async fn registration_errors_propagate() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        h.native.respond("voice_register", NativePromise::rejected_with_code(31301, "bad binding"));

        let err = voice.register("tok").await.unwrap_err();
        assert_eq!(err.code(), Some(31301));
        voice.unregister("tok").await.unwrap();
    }

    #[tokio::test]
    async fn get_calls_and_invites_are_keyed_by_uuid() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        h.native.respond_value("voice_getCalls", json!([{ "uuid": "c1" }, { "uuid": "c2", "state": "connected" }]));
        h.native.respond_value("voice_getCallInvites", json!([{ "uuid": "i1", "callSid": "CA1" }]));

        let calls = voice.get_calls().await.unwrap();
        let invites = voice.get_call_invites().await.unwrap();

        assert_eq!(calls.len(), 2);
        assert_eq!(calls["c2"].state(), CallState::Connected);
        assert_eq!(invites["i1"].state(), CallInviteState::Pending);
    }

    #[tokio::test]
    async fn get_audio_devices_without_selection() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        h.native.respond_value(
            "voice_getAudioDevices",
            json!({ "audioDevices": [{ "uuid": "d1", "type": "bluetooth", "name": "Buds" }] }),
        );

        let devices = voice.get_audio_devices().await.unwrap();
        assert_eq!(devices.audio_devices[0].name(), "Buds");
        assert!(devices.selected_device.is_none());
    }

    #[tokio::test]
    async fn run_preflight_rejects_invalid_options_locally() {
        let h = harness_on(Platform::Android);
        let voice = Voice::new(h.bridge.clone());

        let err = voice
            .run_preflight("tok", json!({ "iceTransportPolicy": "bogus" }))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ArgumentValidation);
        assert!(h.native.calls().is_empty());

        h.native.respond_value("voice_runPreflight", json!("p1"));
        let test = voice
            .run_preflight("tok", json!({ "iceTransportPolicy": "relay" }))
            .await
            .unwrap();
        assert_eq!(test.uuid(), "p1");
        assert_eq!(
            h.native.calls(),
            vec![NativeMethod::VoiceRunPreflight {
                token: "tok".into(),
                options: json!({ "iceTransportPolicy": "relay" }),
            }]
        );
    }

    #[tokio::test]
    async fn platform_restricted_methods() {
        let h = harness_on(Platform::Android);
        let voice = Voice::new(h.bridge.clone());
        voice.show_av_route_picker_view().await.unwrap();
        assert_eq!(
            voice.initialize_push_registry().await.unwrap_err().category(),
            ErrorCategory::PlatformUnsupported
        );
        h.native.respond_value("voice_handleEvent", json!(true));
        assert!(voice.handle_firebase_message(BTreeMap::new()).await.unwrap());

        let h = harness_on(Platform::Ios);
        let voice = Voice::new(h.bridge.clone());
        voice.show_av_route_picker_view().await.unwrap();
        voice.initialize_push_registry().await.unwrap();
        assert_eq!(
            h.native.calls(),
            vec![NativeMethod::VoiceShowNativeAvRoutePicker, NativeMethod::VoiceInitializePushRegistry]
        );
        assert!(voice.handle_firebase_message(BTreeMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn version_token_and_template() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        h.native.respond_value("voice_getVersion", json!("6.1.0"));
        h.native.respond_value("voice_getDeviceToken", json!("apns-token"));

        assert_eq!(voice.get_version().await.unwrap(), "6.1.0");
        assert_eq!(voice.get_device_token().await.unwrap(), "apns-token");
        voice
            .set_incoming_call_contact_handle_template(Some("{DisplayName}".into()))
            .await
            .unwrap();
        assert_eq!(
            h.native.calls().last(),
            Some(&NativeMethod::VoiceSetIncomingCallContactHandleTemplate {
                template: Some("{DisplayName}".into())
            })
        );
    }

    #[tokio::test]
    async fn unexpected_resolved_type_is_native_unexpected() {
        let h = harness();
        let voice = Voice::new(h.bridge.clone());
        h.native.respond_value("voice_getVersion", json!(42));
        let err = voice.get_version().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NativeUnexpected);
    }
}
