use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use serde_json::Value;

use crate::bridge::{NativeBridge, NativeEventSubscriber, NativeMethod, Scope, decode_event};
use crate::call::{Call, NativeCallInfo, send_call_message};
use crate::call_message::{CallMessage, IncomingCallMessage, OutgoingCallMessage};
use crate::errors::{NativeErrorInfo, TwilioError, VoiceError};
use crate::events::{EventEmitter, EventListener, ListenerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallInviteState {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl CallInviteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallInviteState::Pending => "pending",
            CallInviteState::Accepted => "accepted",
            CallInviteState::Rejected => "rejected",
            CallInviteState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CallInviteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invite snapshot as sent by the native layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCallInviteInfo {
    pub uuid: String,
    pub call_sid: String,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum NativeCallInviteEvent {
    #[serde(rename = "callInviteEventTypeValueAccepted")]
    Accepted {
        #[serde(rename = "callInvite")]
        call_invite: NativeCallInviteInfo,
    },
    #[serde(rename = "callInviteEventTypeValueRejected")]
    Rejected,
    #[serde(rename = "callInviteEventTypeValueCancelled")]
    Cancelled {
        #[serde(default)]
        error: Option<NativeErrorInfo>,
    },
    #[serde(rename = "callInviteEventTypeValueNotificationTapped")]
    NotificationTapped,
    #[serde(rename = "callEventMessageReceived")]
    MessageReceived {
        #[serde(rename = "callMessage")]
        message: IncomingCallMessage,
    },
}

/// Events a [`CallInvite`] emits to application listeners.
#[derive(Debug, Clone)]
pub enum CallInviteEvent {
    Accepted(Call),
    Rejected,
    Cancelled(Option<TwilioError>),
    NotificationTapped,
    MessageReceived(IncomingCallMessage),
}

struct Inner {
    info: NativeCallInviteInfo,
    bridge: NativeBridge,
    state: Mutex<CallInviteState>,
    emitter: EventEmitter<CallInviteEvent>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, CallInviteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move out of `Pending`. Returns false when the invite already settled.
    fn settle(&self, next: CallInviteState) -> bool {
        let mut state = self.state();
        if *state != CallInviteState::Pending {
            tracing::debug!(
                "call invite {} already {}, not moving to {}",
                self.info.call_sid,
                *state,
                next
            );
            return false;
        }
        *state = next;
        true
    }

    fn ensure_pending(&self) -> Result<(), VoiceError> {
        let state = *self.state();
        if state != CallInviteState::Pending {
            return Err(VoiceError::InvalidState(format!(
                "Call in state \"{state}\", expected state \"{}\".",
                CallInviteState::Pending
            )));
        }
        Ok(())
    }

    fn call_from(&self, invite: &NativeCallInviteInfo) -> Call {
        Call::new(
            &self.bridge,
            NativeCallInfo {
                uuid: invite.uuid.clone(),
                custom_parameters: self.info.custom_parameters.clone(),
                from: invite.from.clone(),
                to: invite.to.clone(),
                sid: Some(invite.call_sid.clone()),
                ..Default::default()
            },
        )
    }
}

/// A pending incoming call offer.
#[derive(Clone)]
pub struct CallInvite {
    inner: Arc<Inner>,
}

impl CallInvite {
    pub(crate) fn new(bridge: &NativeBridge, info: NativeCallInviteInfo) -> Self {
        let inner = Arc::new(Inner {
            info,
            bridge: bridge.clone(),
            state: Mutex::new(CallInviteState::Pending),
            emitter: EventEmitter::new(),
        });
        let subscriber: Arc<dyn NativeEventSubscriber> = inner.clone();
        bridge.subscribe(Scope::CallInvite, Arc::downgrade(&subscriber));
        Self { inner }
    }

    pub fn uuid(&self) -> &str {
        &self.inner.info.uuid
    }

    pub fn call_sid(&self) -> &str {
        &self.inner.info.call_sid
    }

    pub fn custom_parameters(&self) -> &HashMap<String, String> {
        &self.inner.info.custom_parameters
    }

    pub fn from(&self) -> Option<&str> {
        self.inner.info.from.as_deref()
    }

    pub fn to(&self) -> Option<&str> {
        self.inner.info.to.as_deref()
    }

    pub fn state(&self) -> CallInviteState {
        *self.inner.state()
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<CallInviteEvent>>) -> ListenerId {
        self.inner.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.emitter.remove_listener(id)
    }

    /// Accept the invite. `options` is forwarded to the native layer as is.
    pub async fn accept(&self, options: Value) -> Result<Call, VoiceError> {
        self.inner.ensure_pending()?;
        let info: NativeCallInfo = self
            .inner
            .bridge
            .call(NativeMethod::CallInviteAccept {
                uuid: self.inner.info.uuid.clone(),
                options,
            })
            .await?;
        self.inner.settle(CallInviteState::Accepted);
        Ok(Call::new(&self.inner.bridge, info))
    }

    pub async fn reject(&self) -> Result<(), VoiceError> {
        self.inner.ensure_pending()?;
        self.inner
            .bridge
            .call_unit(NativeMethod::CallInviteReject { uuid: self.inner.info.uuid.clone() })
            .await?;
        self.inner.settle(CallInviteState::Rejected);
        Ok(())
    }

    pub async fn is_valid(&self) -> Result<bool, VoiceError> {
        self.inner
            .bridge
            .call(NativeMethod::CallInviteIsValid { uuid: self.inner.info.uuid.clone() })
            .await
    }

    pub async fn send_message(&self, message: &CallMessage) -> Result<OutgoingCallMessage, VoiceError> {
        send_call_message(&self.inner.bridge, &self.inner.info.uuid, message).await
    }

    /// Change the caller name shown by the system call UI. iOS only.
    pub async fn update_caller_handle(&self, handle: &str) -> Result<(), VoiceError> {
        let bridge = &self.inner.bridge;
        bridge
            .platform()
            .update_caller_handle(bridge, self.inner.info.uuid.clone(), handle.to_string())
            .await
    }
}

impl fmt::Debug for CallInvite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallInvite")
            .field("uuid", &self.inner.info.uuid)
            .field("call_sid", &self.inner.info.call_sid)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl NativeEventSubscriber for Inner {
    fn handle_native_event(&self, event: &Value) -> Result<(), VoiceError> {
        let call_sid = event
            .as_object()
            .ok_or_else(|| VoiceError::Internal(format!("call invite event is not an object: {event}")))?
            .get("callSid")
            .and_then(Value::as_str)
            .ok_or_else(|| VoiceError::Internal("call invite event is missing \"callSid\"".to_string()))?;
        if call_sid != self.info.call_sid {
            return Ok(());
        }

        let public = match decode_event(Scope::CallInvite, event)? {
            NativeCallInviteEvent::Accepted { call_invite } => {
                if !self.settle(CallInviteState::Accepted) {
                    return Ok(());
                }
                CallInviteEvent::Accepted(self.call_from(&call_invite))
            }
            NativeCallInviteEvent::Rejected => {
                if !self.settle(CallInviteState::Rejected) {
                    return Ok(());
                }
                CallInviteEvent::Rejected
            }
            NativeCallInviteEvent::Cancelled { error } => {
                if !self.settle(CallInviteState::Cancelled) {
                    return Ok(());
                }
                CallInviteEvent::Cancelled(error.map(Into::into))
            }
            NativeCallInviteEvent::NotificationTapped => CallInviteEvent::NotificationTapped,
            NativeCallInviteEvent::MessageReceived { message } => CallInviteEvent::MessageReceived(message),
        };

        tracing::debug!("call invite {}: {public:?}", self.info.call_sid);
        self.emitter.emit(public);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallState;
    use crate::platform::Platform;
    use crate::settle::NativePromise;
    use crate::test_support::{Capture, harness, harness_on};
    use serde_json::json;

    fn invite_info(call_sid: &str) -> NativeCallInviteInfo {
        NativeCallInviteInfo {
            uuid: "inv-1".into(),
            call_sid: call_sid.into(),
            custom_parameters: HashMap::from([("team".to_string(), "support".to_string())]),
            from: Some("client:alice".into()),
            to: Some("client:bob".into()),
        }
    }

    #[test]
    fn other_invites_receive_nothing() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        let capture = Capture::new();
        invite.add_listener(capture.listener());

        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({ "type": "callInviteEventTypeValueRejected", "callSid": "CA2" }),
            )
            .unwrap();

        assert!(capture.is_empty());
        assert_eq!(invite.state(), CallInviteState::Pending);
    }

    #[test]
    fn malformed_events_are_errors() {
        let h = harness();
        let _invite = CallInvite::new(&h.bridge, invite_info("CA1"));

        for event in [
            Value::Null,
            json!("callInviteEventTypeValueRejected"),
            json!({ "type": "callInviteEventTypeValueRejected" }),
            json!({ "type": "callInviteEventTypeValueEscalated", "callSid": "CA1" }),
        ] {
            let err = h.bus.dispatch(Scope::CallInvite, &event).unwrap_err();
            assert!(matches!(err, VoiceError::Internal(_)), "{event}");
        }
    }

    #[test]
    fn cancelled_carries_optional_error_and_is_terminal() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        let capture = Capture::new();
        invite.add_listener(capture.listener());

        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({
                    "type": "callInviteEventTypeValueCancelled",
                    "callSid": "CA1",
                    "error": { "code": 31008, "message": "caller hung up" },
                }),
            )
            .unwrap();
        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({ "type": "callInviteEventTypeValueRejected", "callSid": "CA1" }),
            )
            .unwrap();

        assert_eq!(capture.len(), 1);
        match capture.get(0) {
            CallInviteEvent::Cancelled(Some(e)) => assert_eq!(e.code(), 31008),
            other => panic!("expected cancelled, got {other:?}"),
        }
        assert_eq!(invite.state(), CallInviteState::Cancelled);
    }

    #[test]
    fn accepted_event_builds_call_from_invite() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        let capture = Capture::new();
        invite.add_listener(capture.listener());

        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({
                    "type": "callInviteEventTypeValueAccepted",
                    "callSid": "CA1",
                    "callInvite": { "uuid": "inv-1", "callSid": "CA1", "from": "client:alice", "to": "client:bob" },
                }),
            )
            .unwrap();

        match capture.get(0) {
            CallInviteEvent::Accepted(call) => {
                assert_eq!(call.uuid(), "inv-1");
                assert_eq!(call.sid().as_deref(), Some("CA1"));
                assert_eq!(call.custom_parameters().get("team").map(String::as_str), Some("support"));
            }
            other => panic!("expected accepted, got {other:?}"),
        }
        assert_eq!(invite.state(), CallInviteState::Accepted);
    }

    #[test]
    fn notification_tapped_and_messages_do_not_settle() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        let capture = Capture::new();
        invite.add_listener(capture.listener());

        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({ "type": "callInviteEventTypeValueNotificationTapped", "callSid": "CA1" }),
            )
            .unwrap();
        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({
                    "type": "callEventMessageReceived",
                    "callSid": "CA1",
                    "callMessage": { "content": "ping", "voiceEventSid": "VE1" },
                }),
            )
            .unwrap();

        assert_eq!(capture.len(), 2);
        assert!(matches!(capture.get(0), CallInviteEvent::NotificationTapped));
        assert!(matches!(capture.get(1), CallInviteEvent::MessageReceived(_)));
        assert_eq!(invite.state(), CallInviteState::Pending);
    }

    #[tokio::test]
    async fn accept_then_native_accepted_event_is_idempotent() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA123"));
        let capture = Capture::new();
        invite.add_listener(capture.listener());
        h.native.respond_value("callInvite_accept", json!({ "uuid": "inv-1", "sid": "CA123" }));

        let call = invite.accept(json!({})).await.unwrap();
        assert_eq!(call.state(), CallState::Connecting);
        assert_eq!(invite.state(), CallInviteState::Accepted);

        h.bus
            .dispatch(
                Scope::CallInvite,
                &json!({
                    "type": "callInviteEventTypeValueAccepted",
                    "callSid": "CA123",
                    "callInvite": { "uuid": "inv-1", "callSid": "CA123" },
                }),
            )
            .unwrap();

        assert!(capture.is_empty());
        assert_eq!(invite.state(), CallInviteState::Accepted);
        assert_eq!(
            h.native.calls(),
            vec![NativeMethod::CallInviteAccept { uuid: "inv-1".into(), options: json!({}) }]
        );
    }

    #[tokio::test]
    async fn actions_require_pending() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        invite.reject().await.unwrap();
        assert_eq!(invite.state(), CallInviteState::Rejected);

        let err = invite.accept(json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Call in state \"rejected\", expected state \"pending\".");
        let err = invite.reject().await.unwrap_err();
        assert!(matches!(err, VoiceError::InvalidState(_)));
        assert_eq!(invite.state(), CallInviteState::Rejected);
        assert_eq!(h.native.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_accept_stays_pending() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        h.native.respond("callInvite_accept", NativePromise::rejected_with_code(31603, "declined"));

        assert!(invite.accept(json!({})).await.is_err());
        assert_eq!(invite.state(), CallInviteState::Pending);
    }

    #[tokio::test]
    async fn update_caller_handle_is_ios_only() {
        let h = harness_on(Platform::Android);
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        let err = invite.update_caller_handle("Alice").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported platform \"android\". This method is only supported on iOS."
        );

        let h = harness_on(Platform::Ios);
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        invite.update_caller_handle("Alice").await.unwrap();
        assert_eq!(
            h.native.calls(),
            vec![NativeMethod::CallInviteUpdateCallerHandle { uuid: "inv-1".into(), handle: "Alice".into() }]
        );
    }

    #[tokio::test]
    async fn is_valid_and_send_message_forward_uuid() {
        let h = harness();
        let invite = CallInvite::new(&h.bridge, invite_info("CA1"));
        h.native.respond_value("callInvite_isValid", json!(true));
        h.native.respond_value("call_sendMessage", json!("VE7"));

        assert!(invite.is_valid().await.unwrap());
        let message = invite.send_message(&CallMessage::user_defined(json!("hello"))).await.unwrap();

        assert_eq!(message.sid(), "VE7");
        assert_eq!(message.content(), "hello");
        assert!(matches!(
            &h.native.calls()[1],
            NativeMethod::CallSendMessage { uuid, .. } if uuid == "inv-1"
        ));
    }
}
