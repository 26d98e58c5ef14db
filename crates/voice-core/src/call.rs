use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::bridge::{NativeBridge, NativeEventSubscriber, NativeMethod, Scope, decode_event};
use crate::call_message::{CallMessage, IncomingCallMessage, OutgoingCallMessage};
use crate::errors::{NativeErrorInfo, TwilioError, VoiceError};
use crate::events::{EventEmitter, EventListener, ListenerId};
use crate::stats::StatsReport;
use crate::validation::validate_call_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Connecting,
    Ringing,
    Connected,
    Reconnecting,
    Disconnected,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Connecting => "connecting",
            CallState::Ringing => "ringing",
            CallState::Connected => "connected",
            CallState::Reconnecting => "reconnecting",
            CallState::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityWarning {
    ConstantAudioInputLevel,
    HighJitter,
    HighPacketLoss,
    HighRtt,
    LowMos,
    #[serde(other)]
    Unknown,
}

impl QualityWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConstantAudioInputLevel => "constant-audio-input-level",
            Self::HighJitter => "high-jitter",
            Self::HighPacketLoss => "high-packet-loss",
            Self::HighRtt => "high-rtt",
            Self::LowMos => "low-mos",
            Self::Unknown => "unknown",
        }
    }
}

/// Call quality score for `Call::post_feedback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    NotReported,
    One,
    Two,
    Three,
    Four,
    Five,
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        match score {
            Score::NotReported => 0,
            Score::One => 1,
            Score::Two => 2,
            Score::Three => 3,
            Score::Four => 4,
            Score::Five => 5,
        }
    }
}

impl TryFrom<u8> for Score {
    type Error = VoiceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Score::NotReported),
            1 => Ok(Score::One),
            2 => Ok(Score::Two),
            3 => Ok(Score::Three),
            4 => Ok(Score::Four),
            5 => Ok(Score::Five),
            _ => Err(VoiceError::InvalidArgument(
                "\"score\" parameter invalid. Must be a member of the `Call.Score` enum.".to_string(),
            )),
        }
    }
}

/// Issue reported alongside a feedback score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    NotReported,
    DroppedCall,
    AudioLatency,
    OneWayAudio,
    ChoppyAudio,
    NoisyCall,
    Echo,
}

impl Issue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Issue::NotReported => "not-reported",
            Issue::DroppedCall => "dropped-call",
            Issue::AudioLatency => "audio-latency",
            Issue::OneWayAudio => "one-way-audio",
            Issue::ChoppyAudio => "choppy-audio",
            Issue::NoisyCall => "noisy-call",
            Issue::Echo => "echo",
        }
    }
}

impl FromStr for Issue {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-reported" => Ok(Issue::NotReported),
            "dropped-call" => Ok(Issue::DroppedCall),
            "audio-latency" => Ok(Issue::AudioLatency),
            "one-way-audio" => Ok(Issue::OneWayAudio),
            "choppy-audio" => Ok(Issue::ChoppyAudio),
            "noisy-call" => Ok(Issue::NoisyCall),
            "echo" => Ok(Issue::Echo),
            _ => Err(VoiceError::InvalidArgument(
                "\"issue\" parameter invalid. Must be a member of the `Call.Issue` enum.".to_string(),
            )),
        }
    }
}

/// Call snapshot embedded in native call events and returned by native
/// operations that create calls.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCallInfo {
    pub uuid: String,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub state: Option<CallState>,
    #[serde(default)]
    pub is_muted: Option<bool>,
    #[serde(default)]
    pub is_on_hold: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub initial_connected_timestamp: Option<DateTime<Utc>>,
}

/// Native layers send either epoch milliseconds (number or numeric string)
/// or an RFC 3339 string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Number(n) => n.as_f64().and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single()),
        Value::String(s) => match s.parse::<f64>() {
            Ok(ms) => Utc.timestamp_millis_opt(ms as i64).single(),
            Err(_) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        },
        _ => None,
    };
    if parsed.is_none() && !value.is_null() {
        tracing::warn!("ignoring unparseable call timestamp {value}");
    }
    parsed
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum NativeCallEvent {
    #[serde(rename = "callEventConnected")]
    Connected { call: NativeCallInfo },
    #[serde(rename = "callEventConnectFailure")]
    ConnectFailure { call: NativeCallInfo, error: NativeErrorInfo },
    #[serde(rename = "callEventDisconnected")]
    Disconnected {
        call: NativeCallInfo,
        #[serde(default)]
        error: Option<NativeErrorInfo>,
    },
    #[serde(rename = "callEventReconnecting")]
    Reconnecting { call: NativeCallInfo, error: NativeErrorInfo },
    #[serde(rename = "callEventReconnected")]
    Reconnected { call: NativeCallInfo },
    #[serde(rename = "callEventRinging")]
    Ringing { call: NativeCallInfo },
    #[serde(rename = "callEventQualityWarningsChanged")]
    QualityWarningsChanged {
        call: NativeCallInfo,
        #[serde(rename = "callEventCurrentWarnings")]
        current: Vec<QualityWarning>,
        #[serde(rename = "callEventPreviousWarnings")]
        previous: Vec<QualityWarning>,
    },
    #[serde(rename = "callEventMessageReceived")]
    MessageReceived {
        call: NativeCallInfo,
        #[serde(rename = "callMessage")]
        message: IncomingCallMessage,
    },
}

impl NativeCallEvent {
    fn call(&self) -> &NativeCallInfo {
        match self {
            Self::Connected { call }
            | Self::ConnectFailure { call, .. }
            | Self::Disconnected { call, .. }
            | Self::Reconnecting { call, .. }
            | Self::Reconnected { call }
            | Self::Ringing { call }
            | Self::QualityWarningsChanged { call, .. }
            | Self::MessageReceived { call, .. } => call,
        }
    }

    fn next_state(&self) -> Option<CallState> {
        match self {
            Self::Connected { .. } | Self::Reconnected { .. } => Some(CallState::Connected),
            Self::ConnectFailure { .. } | Self::Disconnected { .. } => Some(CallState::Disconnected),
            Self::Reconnecting { .. } => Some(CallState::Reconnecting),
            Self::Ringing { .. } => Some(CallState::Ringing),
            Self::QualityWarningsChanged { .. } | Self::MessageReceived { .. } => None,
        }
    }

    fn into_public(self) -> CallEvent {
        match self {
            Self::Connected { .. } => CallEvent::Connected,
            Self::ConnectFailure { error, .. } => CallEvent::ConnectFailure(error.into()),
            Self::Disconnected { error, .. } => CallEvent::Disconnected(error.map(Into::into)),
            Self::Reconnecting { error, .. } => CallEvent::Reconnecting(error.into()),
            Self::Reconnected { .. } => CallEvent::Reconnected,
            Self::Ringing { .. } => CallEvent::Ringing,
            Self::QualityWarningsChanged { current, previous, .. } => {
                CallEvent::QualityWarningsChanged { current, previous }
            }
            Self::MessageReceived { message, .. } => CallEvent::MessageReceived(message),
        }
    }
}

/// Events a [`Call`] emits to application listeners.
#[derive(Debug, Clone)]
pub enum CallEvent {
    Connected,
    ConnectFailure(TwilioError),
    Reconnecting(TwilioError),
    Reconnected,
    Disconnected(Option<TwilioError>),
    Ringing,
    QualityWarningsChanged {
        current: Vec<QualityWarning>,
        previous: Vec<QualityWarning>,
    },
    MessageReceived(IncomingCallMessage),
}

#[derive(Debug, Clone)]
struct CallData {
    state: CallState,
    from: Option<String>,
    to: Option<String>,
    sid: Option<String>,
    is_muted: Option<bool>,
    is_on_hold: Option<bool>,
    initial_connected_timestamp: Option<DateTime<Utc>>,
}

struct Inner {
    uuid: String,
    custom_parameters: HashMap<String, String>,
    bridge: NativeBridge,
    data: Mutex<CallData>,
    emitter: EventEmitter<CallEvent>,
}

impl Inner {
    fn data(&self) -> MutexGuard<'_, CallData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One leg of a voice session, driven by native call events.
#[derive(Clone)]
pub struct Call {
    inner: Arc<Inner>,
}

impl Call {
    pub(crate) fn new(bridge: &NativeBridge, info: NativeCallInfo) -> Self {
        let inner = Arc::new(Inner {
            uuid: info.uuid,
            custom_parameters: info.custom_parameters,
            bridge: bridge.clone(),
            data: Mutex::new(CallData {
                state: info.state.unwrap_or(CallState::Connecting),
                from: info.from,
                to: info.to,
                sid: info.sid,
                is_muted: info.is_muted,
                is_on_hold: info.is_on_hold,
                initial_connected_timestamp: info.initial_connected_timestamp,
            }),
            emitter: EventEmitter::new(),
        });
        let subscriber: Arc<dyn NativeEventSubscriber> = inner.clone();
        bridge.subscribe(Scope::Call, Arc::downgrade(&subscriber));
        Self { inner }
    }

    pub fn uuid(&self) -> &str {
        &self.inner.uuid
    }

    pub fn custom_parameters(&self) -> &HashMap<String, String> {
        &self.inner.custom_parameters
    }

    pub fn state(&self) -> CallState {
        self.inner.data().state
    }

    pub fn from(&self) -> Option<String> {
        self.inner.data().from.clone()
    }

    pub fn to(&self) -> Option<String> {
        self.inner.data().to.clone()
    }

    pub fn sid(&self) -> Option<String> {
        self.inner.data().sid.clone()
    }

    pub fn is_muted(&self) -> Option<bool> {
        self.inner.data().is_muted
    }

    pub fn is_on_hold(&self) -> Option<bool> {
        self.inner.data().is_on_hold
    }

    pub fn initial_connected_timestamp(&self) -> Option<DateTime<Utc>> {
        self.inner.data().initial_connected_timestamp
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<CallEvent>>) -> ListenerId {
        self.inner.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.emitter.remove_listener(id)
    }

    pub async fn disconnect(&self) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::CallDisconnect { uuid: self.inner.uuid.clone() })
            .await
    }

    /// Hold or resume the call. The local flag takes whatever value the native
    /// layer resolves with; concurrent calls are not serialised, so the last
    /// resolution wins.
    pub async fn hold(&self, hold: bool) -> Result<bool, VoiceError> {
        let on_hold: bool = self
            .inner
            .bridge
            .call(NativeMethod::CallHold { uuid: self.inner.uuid.clone(), hold })
            .await?;
        self.inner.data().is_on_hold = Some(on_hold);
        Ok(on_hold)
    }

    /// Mute or unmute the call. Last resolution wins, as with [`Call::hold`].
    pub async fn mute(&self, mute: bool) -> Result<bool, VoiceError> {
        let muted: bool = self
            .inner
            .bridge
            .call(NativeMethod::CallMute { uuid: self.inner.uuid.clone(), mute })
            .await?;
        self.inner.data().is_muted = Some(muted);
        Ok(muted)
    }

    pub async fn send_digits(&self, digits: &str) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::CallSendDigits {
                uuid: self.inner.uuid.clone(),
                digits: digits.to_string(),
            })
            .await
    }

    pub async fn send_message(&self, message: &CallMessage) -> Result<OutgoingCallMessage, VoiceError> {
        send_call_message(&self.inner.bridge, &self.inner.uuid, message).await
    }

    pub async fn post_feedback(&self, score: Score, issue: Issue) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::CallPostFeedback {
                uuid: self.inner.uuid.clone(),
                score: score.into(),
                issue: issue.as_str().to_string(),
            })
            .await
    }

    pub async fn get_stats(&self) -> Result<StatsReport, VoiceError> {
        self.inner
            .bridge
            .call(NativeMethod::CallGetStats { uuid: self.inner.uuid.clone() })
            .await
    }
}

/// Validate and send a message on the call identified by `uuid`.
pub(crate) async fn send_call_message(
    bridge: &NativeBridge,
    uuid: &str,
    message: &CallMessage,
) -> Result<OutgoingCallMessage, VoiceError> {
    let validated = validate_call_message(message)?;
    let voice_event_sid: String = bridge
        .call(NativeMethod::CallSendMessage {
            uuid: uuid.to_string(),
            content: validated.content.clone(),
            content_type: validated.content_type.clone(),
            message_type: validated.message_type.clone(),
        })
        .await?;
    Ok(OutgoingCallMessage::new(bridge, validated, voice_event_sid))
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data().clone();
        f.debug_struct("Call")
            .field("uuid", &self.inner.uuid)
            .field("sid", &data.sid)
            .field("state", &data.state)
            .finish_non_exhaustive()
    }
}

impl NativeEventSubscriber for Inner {
    fn handle_native_event(&self, event: &Value) -> Result<(), VoiceError> {
        let uuid = event.get("call").and_then(|call| call.get("uuid")).and_then(Value::as_str);
        if uuid != Some(self.uuid.as_str()) {
            return Ok(());
        }
        let event: NativeCallEvent = decode_event(Scope::Call, event)?;

        {
            let mut data = self.data();
            if data.state == CallState::Disconnected {
                tracing::debug!("call {} already disconnected, ignoring event", self.uuid);
                return Ok(());
            }
            if let Some(state) = event.next_state() {
                data.state = state;
            }
            let snapshot = event.call();
            data.from = snapshot.from.clone();
            data.to = snapshot.to.clone();
            data.sid = snapshot.sid.clone();
            data.initial_connected_timestamp = snapshot.initial_connected_timestamp;
            tracing::debug!("call {} now {}", self.uuid, data.state.as_str());
        }

        self.emitter.emit(event.into_public());
        Ok(())
    }
}
