//! Single point of contact with the native voice layer.
//!
//! Outbound: every operation is one [`NativeMethod`] handed to a
//! [`NativeModule`], answered with a [`NativePromise`] envelope.
//! Inbound: the native layer pushes untyped JSON events into a
//! [`NativeEventBus`], which fans them out per [`Scope`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::VoiceError;
use crate::options::CallKitConfiguration;
use crate::platform::PlatformProvider;
use crate::settle::{NativePromise, settle, settle_unit};

/// Event channel a native event is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "scopeVoice")]
    Voice,
    #[serde(rename = "scopeCall")]
    Call,
    #[serde(rename = "scopeCallInvite")]
    CallInvite,
    #[serde(rename = "scopeCallMessage")]
    CallMessage,
    #[serde(rename = "scopePreflightTest")]
    PreflightTest,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Voice => "scopeVoice",
            Scope::Call => "scopeCall",
            Scope::CallInvite => "scopeCallInvite",
            Scope::CallMessage => "scopeCallMessage",
            Scope::PreflightTest => "scopePreflightTest",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "scopeVoice" => Some(Scope::Voice),
            "scopeCall" => Some(Scope::Call),
            "scopeCallInvite" => Some(Scope::CallInvite),
            "scopeCallMessage" => Some(Scope::CallMessage),
            "scopePreflightTest" => Some(Scope::PreflightTest),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound native operation, serialised as `{"method": "...", ...args}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all_fields = "camelCase")]
pub enum NativeMethod {
    #[serde(rename = "call_disconnect")]
    CallDisconnect { uuid: String },
    #[serde(rename = "call_getStats")]
    CallGetStats { uuid: String },
    #[serde(rename = "call_hold")]
    CallHold { uuid: String, hold: bool },
    #[serde(rename = "call_mute")]
    CallMute { uuid: String, mute: bool },
    #[serde(rename = "call_sendDigits")]
    CallSendDigits { uuid: String, digits: String },
    #[serde(rename = "call_sendMessage")]
    CallSendMessage {
        uuid: String,
        content: String,
        content_type: String,
        message_type: String,
    },
    #[serde(rename = "call_postFeedback")]
    CallPostFeedback { uuid: String, score: u8, issue: String },

    #[serde(rename = "callInvite_accept")]
    CallInviteAccept { uuid: String, options: Value },
    #[serde(rename = "callInvite_reject")]
    CallInviteReject { uuid: String },
    #[serde(rename = "callInvite_isValid")]
    CallInviteIsValid { uuid: String },
    #[serde(rename = "callInvite_updateCallerHandle")]
    CallInviteUpdateCallerHandle { uuid: String, handle: String },

    #[serde(rename = "voice_connect_ios")]
    VoiceConnectIos {
        token: String,
        params: BTreeMap<String, String>,
        contact_handle: String,
    },
    #[serde(rename = "voice_connect_android")]
    VoiceConnectAndroid {
        token: String,
        params: BTreeMap<String, String>,
        notification_display_name: Option<String>,
    },
    #[serde(rename = "voice_register")]
    VoiceRegister { token: String },
    #[serde(rename = "voice_unregister")]
    VoiceUnregister { token: String },
    #[serde(rename = "voice_getCalls")]
    VoiceGetCalls,
    #[serde(rename = "voice_getCallInvites")]
    VoiceGetCallInvites,
    #[serde(rename = "voice_getAudioDevices")]
    VoiceGetAudioDevices,
    #[serde(rename = "voice_selectAudioDevice")]
    VoiceSelectAudioDevice { uuid: String },
    #[serde(rename = "voice_getVersion")]
    VoiceGetVersion,
    #[serde(rename = "voice_getDeviceToken")]
    VoiceGetDeviceToken,
    #[serde(rename = "voice_showNativeAvRoutePicker")]
    VoiceShowNativeAvRoutePicker,
    #[serde(rename = "voice_initializePushRegistry")]
    VoiceInitializePushRegistry,
    #[serde(rename = "voice_setCallKitConfiguration")]
    VoiceSetCallKitConfiguration { configuration: CallKitConfiguration },
    #[serde(rename = "voice_handleEvent")]
    VoiceHandleEvent { message: BTreeMap<String, String> },
    #[serde(rename = "voice_setIncomingCallContactHandleTemplate")]
    VoiceSetIncomingCallContactHandleTemplate { template: Option<String> },
    #[serde(rename = "voice_runPreflight")]
    VoiceRunPreflight { token: String, options: Value },

    #[serde(rename = "preflightTest_getCallSid")]
    PreflightTestGetCallSid { uuid: String },
    #[serde(rename = "preflightTest_getEndTime")]
    PreflightTestGetEndTime { uuid: String },
    #[serde(rename = "preflightTest_getLatestSample")]
    PreflightTestGetLatestSample { uuid: String },
    #[serde(rename = "preflightTest_getReport")]
    PreflightTestGetReport { uuid: String },
    #[serde(rename = "preflightTest_getStartTime")]
    PreflightTestGetStartTime { uuid: String },
    #[serde(rename = "preflightTest_getState")]
    PreflightTestGetState { uuid: String },
    #[serde(rename = "preflightTest_stop")]
    PreflightTestStop { uuid: String },
    #[serde(rename = "preflightTest_flushEvents")]
    PreflightTestFlushEvents,
}

impl NativeMethod {
    pub fn to_json(&self) -> Result<String, VoiceError> {
        serde_json::to_string(self)
            .map_err(|e| VoiceError::Internal(format!("failed to encode native call: {e}")))
    }
}

/// Outbound call surface implemented by the native layer.
pub trait NativeModule: Send + Sync {
    fn invoke(&self, method: NativeMethod) -> BoxFuture<'_, Result<NativePromise, VoiceError>>;
}

/// Receiver of raw events for one scope.
///
/// Returning an error aborts the current dispatch pass.
pub trait NativeEventSubscriber: Send + Sync {
    fn handle_native_event(&self, event: &Value) -> Result<(), VoiceError>;
}

/// Inbound event channel entities subscribe to.
pub trait EventSource: Send + Sync {
    /// Subscriptions are weak: an entity dropped by the application stops
    /// receiving events without unsubscribing.
    fn subscribe(&self, scope: Scope, subscriber: Weak<dyn NativeEventSubscriber>);
}

/// Per-process event bus keyed by scope.
#[derive(Default)]
pub struct NativeEventBus {
    subscribers: Mutex<HashMap<Scope, Vec<Weak<dyn NativeEventSubscriber>>>>,
}

impl NativeEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every live subscriber of `scope`.
    pub fn dispatch(&self, scope: Scope, event: &Value) -> Result<(), VoiceError> {
        let live: Vec<Arc<dyn NativeEventSubscriber>> = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let entries = subscribers.entry(scope).or_default();
            entries.retain(|weak| weak.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };

        tracing::debug!("dispatching {scope} event to {} subscriber(s)", live.len());
        for subscriber in live {
            subscriber.handle_native_event(event).inspect_err(|e| {
                tracing::error!("native {scope} event dispatch aborted: {e}");
            })?;
        }
        Ok(())
    }

    /// Parse a JSON event string and dispatch it.
    pub fn dispatch_json(&self, scope: Scope, event_json: &str) -> Result<(), VoiceError> {
        let event: Value = serde_json::from_str(event_json)
            .map_err(|e| VoiceError::Internal(format!("malformed {scope} event: {e}")))?;
        self.dispatch(scope, &event)
    }

    pub fn subscriber_count(&self, scope: Scope) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .map_or(0, |entries| entries.iter().filter(|w| w.strong_count() > 0).count())
    }
}

impl EventSource for NativeEventBus {
    fn subscribe(&self, scope: Scope, subscriber: Weak<dyn NativeEventSubscriber>) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(scope)
            .or_default()
            .push(subscriber);
    }
}

/// Handle shared by every entity: the native call surface, the inbound event
/// source and the platform capabilities.
#[derive(Clone)]
pub struct NativeBridge {
    native: Arc<dyn NativeModule>,
    events: Arc<dyn EventSource>,
    platform: Arc<dyn PlatformProvider>,
}

impl NativeBridge {
    pub fn new(
        native: Arc<dyn NativeModule>,
        events: Arc<dyn EventSource>,
        platform: Arc<dyn PlatformProvider>,
    ) -> Self {
        Self {
            native,
            events,
            platform,
        }
    }

    pub fn platform(&self) -> &dyn PlatformProvider {
        self.platform.as_ref()
    }

    pub(crate) fn subscribe(&self, scope: Scope, subscriber: Weak<dyn NativeEventSubscriber>) {
        self.events.subscribe(scope, subscriber);
    }

    /// Invoke a native method and decode its resolved value.
    pub async fn call<T: DeserializeOwned>(&self, method: NativeMethod) -> Result<T, VoiceError> {
        tracing::debug!(?method, "invoking native method");
        settle(self.native.invoke(method).await?)
    }

    /// Invoke a native method whose resolved value is irrelevant.
    pub async fn call_unit(&self, method: NativeMethod) -> Result<(), VoiceError> {
        tracing::debug!(?method, "invoking native method");
        settle_unit(self.native.invoke(method).await?)
    }
}

impl fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBridge")
            .field("platform", &self.platform.platform())
            .finish_non_exhaustive()
    }
}

/// Decode a raw event into an entity's typed event enum.
pub(crate) fn decode_event<T: DeserializeOwned>(scope: Scope, event: &Value) -> Result<T, VoiceError> {
    T::deserialize(event).map_err(|e| {
        VoiceError::Internal(format!("unexpected {scope} event from the native layer: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        seen: AtomicUsize,
        fail: bool,
    }

    impl NativeEventSubscriber for Counter {
        fn handle_native_event(&self, _event: &Value) -> Result<(), VoiceError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(VoiceError::Internal("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn counter(fail: bool) -> Arc<Counter> {
        Arc::new(Counter {
            seen: AtomicUsize::new(0),
            fail,
        })
    }

    #[test]
    fn method_serializes_with_tag_and_camel_case_args() {
        let method = NativeMethod::CallSendMessage {
            uuid: "u1".into(),
            content: "{}".into(),
            content_type: "application/json".into(),
            message_type: "user-defined-message".into(),
        };
        assert_eq!(
            serde_json::to_value(&method).unwrap(),
            json!({
                "method": "call_sendMessage",
                "uuid": "u1",
                "content": "{}",
                "contentType": "application/json",
                "messageType": "user-defined-message",
            })
        );
        assert_eq!(
            serde_json::to_value(NativeMethod::VoiceGetVersion).unwrap(),
            json!({ "method": "voice_getVersion" })
        );
    }

    #[test]
    fn scope_names_round_trip() {
        for scope in [
            Scope::Voice,
            Scope::Call,
            Scope::CallInvite,
            Scope::CallMessage,
            Scope::PreflightTest,
        ] {
            assert_eq!(Scope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(Scope::parse("scopeNope"), None);
    }

    #[test]
    fn dispatch_only_reaches_subscribed_scope() {
        let bus = NativeEventBus::new();
        let calls = counter(false);
        let voice = counter(false);
        let calls_dyn: Arc<dyn NativeEventSubscriber> = calls.clone();
        let voice_dyn: Arc<dyn NativeEventSubscriber> = voice.clone();
        bus.subscribe(Scope::Call, Arc::downgrade(&calls_dyn));
        bus.subscribe(Scope::Voice, Arc::downgrade(&voice_dyn));

        bus.dispatch(Scope::Call, &json!({ "type": "x" })).unwrap();

        assert_eq!(calls.seen.load(Ordering::SeqCst), 1);
        assert_eq!(voice.seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = NativeEventBus::new();
        {
            let gone: Arc<dyn NativeEventSubscriber> = counter(false);
            bus.subscribe(Scope::Call, Arc::downgrade(&gone));
            assert_eq!(bus.subscriber_count(Scope::Call), 1);
        }
        assert_eq!(bus.subscriber_count(Scope::Call), 0);
        bus.dispatch(Scope::Call, &json!({})).unwrap();
    }

    #[test]
    fn first_error_aborts_dispatch() {
        let bus = NativeEventBus::new();
        let failing = counter(true);
        let after = counter(false);
        let failing_dyn: Arc<dyn NativeEventSubscriber> = failing.clone();
        let after_dyn: Arc<dyn NativeEventSubscriber> = after.clone();
        bus.subscribe(Scope::Voice, Arc::downgrade(&failing_dyn));
        bus.subscribe(Scope::Voice, Arc::downgrade(&after_dyn));

        assert!(bus.dispatch(Scope::Voice, &json!({})).is_err());
        assert_eq!(after.seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_json_is_internal_error() {
        let bus = NativeEventBus::new();
        let err = bus.dispatch_json(Scope::Voice, "{not json").unwrap_err();
        assert!(matches!(err, VoiceError::Internal(_)));
    }
}
