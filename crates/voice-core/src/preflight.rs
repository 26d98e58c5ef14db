//! Preflight test handles.
//!
//! A preflight test is a diagnostic call run before a real one. Its state
//! lives on the native side; this handle forwards queries and re-emits the
//! native events addressed to its uuid.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::bridge::{NativeBridge, NativeEventSubscriber, NativeMethod, Scope, decode_event};
use crate::call::QualityWarning;
use crate::errors::{TwilioError, VoiceError, construct_twilio_error};
use crate::events::{EventEmitter, EventListener, ListenerId};
use crate::platform::PlatformProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallQuality {
    Excellent,
    Great,
    Good,
    Fair,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreflightTestState {
    Connecting,
    Connected,
    Completed,
    Failed,
}

impl PreflightTestState {
    fn parse(native: &str) -> Result<Self, VoiceError> {
        match native {
            "completed" => Ok(Self::Completed),
            "connected" => Ok(Self::Connected),
            "connecting" => Ok(Self::Connecting),
            "failed" => Ok(Self::Failed),
            other => Err(VoiceError::InvalidState(format!(
                "PreflightTest state invalid. Expected one of \"[completed, connected, connecting, failed]\". Got \"{other}\"."
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RtcStats {
    pub jitter: Stats,
    pub mos: Stats,
    pub rtt: Stats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeMeasurement {
    pub duration: f64,
    pub start: f64,
    pub end: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeTimeMeasurement {
    duration: f64,
    start_time: f64,
    end_time: f64,
}

impl From<NativeTimeMeasurement> for TimeMeasurement {
    fn from(native: NativeTimeMeasurement) -> Self {
        Self {
            duration: native.duration,
            start: native.start_time,
            end: native.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTiming {
    pub signaling: TimeMeasurement,
    pub peer_connection: TimeMeasurement,
    pub ice: TimeMeasurement,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeNetworkTiming {
    signaling: NativeTimeMeasurement,
    peer_connection: NativeTimeMeasurement,
    ice_connection: NativeTimeMeasurement,
    preflight_test: NativeTimeMeasurement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RtcIceCandidateStats {
    pub candidate_type: Option<String>,
    pub deleted: Option<bool>,
    pub ip: Option<String>,
    pub is_remote: Option<bool>,
    pub network_cost: Option<f64>,
    pub network_id: Option<f64>,
    pub network_type: Option<String>,
    pub port: Option<u32>,
    pub priority: Option<f64>,
    pub protocol: Option<String>,
    pub related_address: Option<String>,
    pub related_port: Option<u32>,
    pub tcp_type: Option<String>,
    pub transport_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectedIceCandidatePairStats {
    pub local_candidate: RtcIceCandidateStats,
    pub remote_candidate: RtcIceCandidateStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Warning {
    pub name: String,
    pub threshold: String,
    pub values: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningCleared {
    pub name: String,
    pub timestamp: f64,
}

/// One media sample. Native layers send the timestamp as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RtcSample {
    pub audio_input_level: Option<f64>,
    pub audio_output_level: Option<f64>,
    pub bytes_received: Option<f64>,
    pub bytes_sent: Option<f64>,
    pub codec: Option<String>,
    pub jitter: Option<f64>,
    pub mos: Option<f64>,
    pub packets_lost: Option<f64>,
    pub packets_lost_fraction: Option<f64>,
    pub packets_received: Option<f64>,
    pub packets_sent: Option<f64>,
    pub rtt: Option<f64>,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub timestamp: Option<f64>,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub call_sid: Option<String>,
    pub call_quality: Option<CallQuality>,
    pub edge: Option<String>,
    pub ice_candidate_stats: Vec<RtcIceCandidateStats>,
    pub is_turn_required: Option<bool>,
    pub stats: Option<RtcStats>,
    pub network_timing: NetworkTiming,
    pub test_timing: TimeMeasurement,
    pub samples: Vec<RtcSample>,
    pub selected_edge: Option<String>,
    pub selected_ice_candidate_pair_stats: Option<SelectedIceCandidatePairStats>,
    pub warnings: Vec<Warning>,
    pub warnings_cleared: Vec<WarningCleared>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeReport {
    #[serde(default)]
    call_sid: Option<String>,
    #[serde(default)]
    call_quality: Value,
    #[serde(default)]
    edge: Option<String>,
    #[serde(default)]
    ice_candidates: Vec<RtcIceCandidateStats>,
    #[serde(default)]
    is_turn_required: Value,
    #[serde(default)]
    network_stats: Option<RtcStats>,
    network_timing: NativeNetworkTiming,
    stats_samples: Vec<RtcSample>,
    #[serde(default)]
    selected_edge: Option<String>,
    #[serde(default)]
    selected_ice_candidate_pair: Option<SelectedIceCandidatePairStats>,
    #[serde(default)]
    warnings: Option<Vec<Warning>>,
    #[serde(default)]
    warnings_cleared: Option<Vec<WarningCleared>>,
}

/// Parse the JSON report string the native layer produces. Call quality and
/// the TURN flag are encoded differently per platform.
pub fn parse_report(raw: &str, platform: &dyn PlatformProvider) -> Result<Report, VoiceError> {
    let native: NativeReport = serde_json::from_str(raw)
        .map_err(|e| VoiceError::InvalidState(format!("PreflightTest report invalid: {e}")))?;
    let timing = native.network_timing;
    Ok(Report {
        call_sid: native.call_sid,
        call_quality: platform.parse_call_quality(&native.call_quality)?,
        edge: native.edge,
        ice_candidate_stats: native.ice_candidates,
        is_turn_required: platform.parse_is_turn_required(&native.is_turn_required)?,
        stats: native.network_stats,
        network_timing: NetworkTiming {
            signaling: timing.signaling.into(),
            peer_connection: timing.peer_connection.into(),
            ice: timing.ice_connection.into(),
        },
        test_timing: timing.preflight_test.into(),
        samples: native.stats_samples,
        selected_edge: native.selected_edge,
        selected_ice_candidate_pair_stats: native.selected_ice_candidate_pair,
        warnings: native.warnings.unwrap_or_default(),
        warnings_cleared: native.warnings_cleared.unwrap_or_default(),
    })
}

pub fn parse_sample(raw: &str) -> Result<RtcSample, VoiceError> {
    serde_json::from_str(raw).map_err(|e| VoiceError::InvalidState(format!("PreflightTest sample invalid: {e}")))
}

/// Events a [`PreflightTest`] emits to application listeners.
#[derive(Debug, Clone)]
pub enum PreflightTestEvent {
    Connected,
    Completed(Report),
    Failed(TwilioError),
    Sample(RtcSample),
    QualityWarning {
        current: Vec<QualityWarning>,
        previous: Vec<QualityWarning>,
    },
}

impl PreflightTestEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Sample(_) => "sample",
            Self::QualityWarning { .. } => "qualityWarning",
        }
    }
}

#[derive(Deserialize)]
enum NativePreflightEventType {
    #[serde(rename = "preflightTestEventTypeValueConnected")]
    Connected,
    #[serde(rename = "preflightTestEventTypeValueCompleted")]
    Completed,
    #[serde(rename = "preflightTestEventTypeValueFailed")]
    Failed,
    #[serde(rename = "preflightTestEventTypeValueSample")]
    Sample,
    #[serde(rename = "preflightTestEventTypeValueQualityWarning")]
    QualityWarning,
}

#[derive(Deserialize)]
struct NativePreflightEvent {
    #[serde(rename = "type")]
    kind: NativePreflightEventType,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Null | Value::Array(_) | Value::Object(_)) => "object",
    }
}

fn invalid_value(event: &str, name: &str, expected: &str, actual: Option<&Value>) -> VoiceError {
    VoiceError::InvalidState(format!(
        "Invalid \"preflightTest#{event}\" value type for \"{name}\". Expected \"{expected}\"; actual \"{}\".",
        type_name(actual)
    ))
}

fn string_field<'a>(payload: &'a Map<String, Value>, event: &str, name: &str) -> Result<&'a str, VoiceError> {
    let value = payload.get(name);
    value
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_value(event, name, "string", value))
}

fn warnings_field(payload: &Map<String, Value>, name: &str) -> Result<Vec<QualityWarning>, VoiceError> {
    let value = payload.get(name);
    let items = value
        .and_then(Value::as_array)
        .ok_or_else(|| invalid_value("qualityWarning", name, "array", value))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(_) => QualityWarning::deserialize(item)
                .map_err(|e| VoiceError::Internal(format!("unreadable quality warning: {e}"))),
            other => Err(invalid_value(
                "qualityWarning",
                &format!("element-in-{name}"),
                "string",
                Some(other),
            )),
        })
        .collect()
}

struct Inner {
    uuid: String,
    bridge: NativeBridge,
    emitter: EventEmitter<PreflightTestEvent>,
}

impl Inner {
    fn translate(&self, event: NativePreflightEvent) -> Result<PreflightTestEvent, VoiceError> {
        let payload = &event.payload;
        Ok(match event.kind {
            NativePreflightEventType::Connected => PreflightTestEvent::Connected,
            NativePreflightEventType::Completed => {
                let report = string_field(payload, "completed", "report")?;
                PreflightTestEvent::Completed(parse_report(report, self.bridge.platform())?)
            }
            NativePreflightEventType::Failed => {
                let error = payload.get("error").and_then(Value::as_object).cloned().unwrap_or_default();
                let message = string_field(&error, "failed", "message")?;
                let code = error.get("code");
                let code = code
                    .and_then(Value::as_u64)
                    .and_then(|c| u32::try_from(c).ok())
                    .ok_or_else(|| invalid_value("failed", "code", "number", code))?;
                PreflightTestEvent::Failed(construct_twilio_error(message, code))
            }
            NativePreflightEventType::Sample => {
                let sample = string_field(payload, "sample", "sample")?;
                PreflightTestEvent::Sample(parse_sample(sample)?)
            }
            NativePreflightEventType::QualityWarning => PreflightTestEvent::QualityWarning {
                current: warnings_field(payload, "currentWarnings")?,
                previous: warnings_field(payload, "previousWarnings")?,
            },
        })
    }
}

/// Handle on one native preflight test run.
#[derive(Clone)]
pub struct PreflightTest {
    inner: Arc<Inner>,
}

impl PreflightTest {
    pub(crate) fn new(bridge: &NativeBridge, uuid: String) -> Self {
        let inner = Arc::new(Inner {
            uuid,
            bridge: bridge.clone(),
            emitter: EventEmitter::new(),
        });
        let subscriber: Arc<dyn NativeEventSubscriber> = inner.clone();
        bridge.subscribe(Scope::PreflightTest, Arc::downgrade(&subscriber));
        bridge.platform().preflight_created(bridge);
        Self { inner }
    }

    pub fn uuid(&self) -> &str {
        &self.inner.uuid
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<PreflightTestEvent>>) -> ListenerId {
        self.inner.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.emitter.remove_listener(id)
    }

    pub async fn get_call_sid(&self) -> Result<String, VoiceError> {
        self.query(NativeMethod::PreflightTestGetCallSid { uuid: self.uuid_owned() }).await
    }

    /// Milliseconds since the epoch.
    pub async fn get_start_time(&self) -> Result<f64, VoiceError> {
        let raw: Value = self.query(NativeMethod::PreflightTestGetStartTime { uuid: self.uuid_owned() }).await?;
        to_number(&raw, "startTime")
    }

    /// Milliseconds since the epoch.
    pub async fn get_end_time(&self) -> Result<f64, VoiceError> {
        let raw: Value = self.query(NativeMethod::PreflightTestGetEndTime { uuid: self.uuid_owned() }).await?;
        to_number(&raw, "endTime")
    }

    pub async fn get_latest_sample(&self) -> Result<RtcSample, VoiceError> {
        let raw: String = self
            .query(NativeMethod::PreflightTestGetLatestSample { uuid: self.uuid_owned() })
            .await?;
        parse_sample(&raw)
    }

    pub async fn get_report(&self) -> Result<Report, VoiceError> {
        let raw: String = self.query(NativeMethod::PreflightTestGetReport { uuid: self.uuid_owned() }).await?;
        parse_report(&raw, self.inner.bridge.platform())
    }

    pub async fn get_state(&self) -> Result<PreflightTestState, VoiceError> {
        let raw: String = self.query(NativeMethod::PreflightTestGetState { uuid: self.uuid_owned() }).await?;
        PreflightTestState::parse(&raw)
    }

    pub async fn stop(&self) -> Result<(), VoiceError> {
        self.inner
            .bridge
            .call_unit(NativeMethod::PreflightTestStop { uuid: self.uuid_owned() })
            .await
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, method: NativeMethod) -> Result<T, VoiceError> {
        self.inner.bridge.call(method).await
    }

    fn uuid_owned(&self) -> String {
        self.inner.uuid.clone()
    }
}

fn to_number(raw: &Value, name: &str) -> Result<f64, VoiceError> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| VoiceError::UnexpectedNative {
        message: format!("PreflightTest \"{name}\" is not a number"),
        misc: Some(raw.clone()),
    })
}

impl fmt::Debug for PreflightTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreflightTest").field("uuid", &self.inner.uuid).finish_non_exhaustive()
    }
}

impl NativeEventSubscriber for Inner {
    fn handle_native_event(&self, event: &Value) -> Result<(), VoiceError> {
        let uuid = event.get("uuid");
        let Some(uuid) = uuid.and_then(Value::as_str) else {
            return Err(VoiceError::InvalidState(format!(
                "Unexpected PreflightTest UUID type: \"{}\".",
                uuid.unwrap_or(&Value::Null)
            )));
        };
        if uuid != self.uuid {
            return Ok(());
        }

        let public = self.translate(decode_event(Scope::PreflightTest, event)?)?;
        tracing::debug!("preflight test {}: {} event", self.uuid, public.name());
        self.emitter.emit(public);
        Ok(())
    }
}
