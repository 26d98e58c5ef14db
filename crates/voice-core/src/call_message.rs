use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use serde_json::Value;

use crate::bridge::{NativeBridge, NativeEventSubscriber, Scope, decode_event};
use crate::errors::{NativeErrorInfo, TwilioError, VoiceError};
use crate::events::{EventEmitter, EventListener, ListenerId};

pub const MESSAGE_TYPE_USER_DEFINED: &str = "user-defined-message";

/// Message an application sends over a call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMessage {
    pub content: Value,
    /// Defaults to `application/json`.
    pub content_type: Option<String>,
    pub message_type: String,
}

impl CallMessage {
    pub fn user_defined(content: Value) -> Self {
        Self {
            content,
            content_type: None,
            message_type: MESSAGE_TYPE_USER_DEFINED.to_string(),
        }
    }
}

/// A [`CallMessage`] ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCallMessage {
    pub content: String,
    pub content_type: String,
    pub message_type: String,
}

/// Message received on a call or call invite.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCallMessage {
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub voice_event_sid: Option<String>,
}

#[derive(Debug, Clone)]
pub enum OutgoingCallMessageEvent {
    Sent,
    Failure(TwilioError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutgoingCallMessageStatus {
    InFlight,
    Sent,
    Failed,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum NativeCallMessageEvent {
    #[serde(rename = "callEventMessageSent")]
    Sent,
    #[serde(rename = "callEventMessageFailure")]
    Failure { error: NativeErrorInfo },
}

struct Inner {
    message: ValidatedCallMessage,
    voice_event_sid: String,
    status: Mutex<OutgoingCallMessageStatus>,
    emitter: EventEmitter<OutgoingCallMessageEvent>,
}

/// A message in flight, correlated with native delivery results by its
/// voice event SID. Emits exactly one of `Sent` or `Failure`.
#[derive(Clone)]
pub struct OutgoingCallMessage {
    inner: Arc<Inner>,
}

impl OutgoingCallMessage {
    pub(crate) fn new(bridge: &NativeBridge, message: ValidatedCallMessage, voice_event_sid: String) -> Self {
        let inner = Arc::new(Inner {
            message,
            voice_event_sid,
            status: Mutex::new(OutgoingCallMessageStatus::InFlight),
            emitter: EventEmitter::new(),
        });
        let subscriber: Arc<dyn NativeEventSubscriber> = inner.clone();
        bridge.subscribe(Scope::CallMessage, Arc::downgrade(&subscriber));
        Self { inner }
    }

    pub fn sid(&self) -> &str {
        &self.inner.voice_event_sid
    }

    pub fn content(&self) -> &str {
        &self.inner.message.content
    }

    pub fn content_type(&self) -> &str {
        &self.inner.message.content_type
    }

    pub fn message_type(&self) -> &str {
        &self.inner.message.message_type
    }

    pub fn status(&self) -> OutgoingCallMessageStatus {
        *self.inner.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<OutgoingCallMessageEvent>>) -> ListenerId {
        self.inner.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.emitter.remove_listener(id)
    }
}

impl fmt::Debug for OutgoingCallMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingCallMessage")
            .field("sid", &self.inner.voice_event_sid)
            .field("status", &self.status())
            .finish()
    }
}

impl NativeEventSubscriber for Inner {
    fn handle_native_event(&self, event: &Value) -> Result<(), VoiceError> {
        if event.get("voiceEventSid").and_then(Value::as_str) != Some(self.voice_event_sid.as_str()) {
            return Ok(());
        }
        let event: NativeCallMessageEvent = decode_event(Scope::CallMessage, event)?;

        let public = {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            if *status != OutgoingCallMessageStatus::InFlight {
                tracing::debug!(
                    "call message {} already settled as {:?}, ignoring event",
                    self.voice_event_sid,
                    *status
                );
                return Ok(());
            }
            match event {
                NativeCallMessageEvent::Sent => {
                    *status = OutgoingCallMessageStatus::Sent;
                    OutgoingCallMessageEvent::Sent
                }
                NativeCallMessageEvent::Failure { error } => {
                    *status = OutgoingCallMessageStatus::Failed;
                    OutgoingCallMessageEvent::Failure(error.into())
                }
            }
        };

        tracing::debug!("call message {}: {public:?}", self.voice_event_sid);
        self.emitter.emit(public);
        Ok(())
    }
}
