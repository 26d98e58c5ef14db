//! UniFFI bindings for voice-core.
//!
//! Provides a VoiceClient object that owns the native bridge and keeps the
//! entities the core creates (calls, call invites, outgoing messages,
//! preflight tests) addressable by uuid or SID from the host language.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use voice_core::{
    self, AudioDevice as CoreAudioDevice, AudioDeviceType, AudioDevices as CoreAudioDevices, Call as CoreCall,
    CallEvent, CallInvite as CoreCallInvite, CallInviteEvent, CallInviteState as CoreCallInviteState, CallKitConfiguration,
    CallMessage, CallState as CoreCallState, IncomingCallMessage, Issue, NativeBridge, NativeEventBus, NativeMethod,
    NativeModule, NativePromise, OutgoingCallMessage, OutgoingCallMessageEvent, Platform, PreflightTest,
    PreflightTestEvent, PreflightTestState, QualityWarning, Scope, Score, TwilioError, Voice, VoiceEvent,
    call_message::MESSAGE_TYPE_USER_DEFINED, validation::parse_connect_options,
};

uniffi::include_scaffolding!("voice");

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using VoiceClient.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("voice_core=debug,voice_ffi=debug")),
            )
            .with_ansi(false)
            .init();
    });
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Connecting,
    Ringing,
    Connected,
    Reconnecting,
    Disconnected,
}

impl From<CoreCallState> for CallState {
    fn from(s: CoreCallState) -> Self {
        match s {
            CoreCallState::Connecting => Self::Connecting,
            CoreCallState::Ringing => Self::Ringing,
            CoreCallState::Connected => Self::Connected,
            CoreCallState::Reconnecting => Self::Reconnecting,
            CoreCallState::Disconnected => Self::Disconnected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallInviteState {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl From<CoreCallInviteState> for CallInviteState {
    fn from(s: CoreCallInviteState) -> Self {
        match s {
            CoreCallInviteState::Pending => Self::Pending,
            CoreCallInviteState::Accepted => Self::Accepted,
            CoreCallInviteState::Rejected => Self::Rejected,
            CoreCallInviteState::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDeviceKind {
    Earpiece,
    Speaker,
    Bluetooth,
}

impl From<AudioDeviceType> for AudioDeviceKind {
    fn from(t: AudioDeviceType) -> Self {
        match t {
            AudioDeviceType::Earpiece => Self::Earpiece,
            AudioDeviceType::Speaker => Self::Speaker,
            AudioDeviceType::Bluetooth => Self::Bluetooth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightState {
    Connecting,
    Connected,
    Completed,
    Failed,
}

impl From<PreflightTestState> for PreflightState {
    fn from(s: PreflightTestState) -> Self {
        match s {
            PreflightTestState::Connecting => Self::Connecting,
            PreflightTestState::Connected => Self::Connected,
            PreflightTestState::Completed => Self::Completed,
            PreflightTestState::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwilioErrorInfo {
    pub code: u32,
    pub name: String,
    pub message: String,
}

impl From<TwilioError> for TwilioErrorInfo {
    fn from(e: TwilioError) -> Self {
        Self {
            code: e.code(),
            name: e.name().to_string(),
            message: e.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallInfo {
    pub uuid: String,
    pub sid: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub state: CallState,
    pub is_muted: Option<bool>,
    pub is_on_hold: Option<bool>,
    pub custom_parameters: HashMap<String, String>,
    pub initial_connected_timestamp_ms: Option<i64>,
}

impl From<&CoreCall> for CallInfo {
    fn from(c: &CoreCall) -> Self {
        Self {
            uuid: c.uuid().to_string(),
            sid: c.sid(),
            from: c.from(),
            to: c.to(),
            state: c.state().into(),
            is_muted: c.is_muted(),
            is_on_hold: c.is_on_hold(),
            custom_parameters: c.custom_parameters().clone(),
            initial_connected_timestamp_ms: c.initial_connected_timestamp().map(|t| t.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallInviteInfo {
    pub uuid: String,
    pub call_sid: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub custom_parameters: HashMap<String, String>,
    pub state: CallInviteState,
}

impl From<&CoreCallInvite> for CallInviteInfo {
    fn from(i: &CoreCallInvite) -> Self {
        Self {
            uuid: i.uuid().to_string(),
            call_sid: i.call_sid().to_string(),
            from: i.from().map(str::to_string),
            to: i.to().map(str::to_string),
            custom_parameters: i.custom_parameters().clone(),
            state: i.state().into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallMessageInfo {
    pub content: String,
    pub content_type: Option<String>,
    pub message_type: Option<String>,
    pub voice_event_sid: Option<String>,
}

impl From<IncomingCallMessage> for CallMessageInfo {
    fn from(m: IncomingCallMessage) -> Self {
        let content = match m.content {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            content,
            content_type: m.content_type,
            message_type: m.message_type,
            voice_event_sid: m.voice_event_sid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioDeviceInfo {
    pub uuid: String,
    pub kind: AudioDeviceKind,
    pub name: String,
}

impl From<CoreAudioDevice> for AudioDeviceInfo {
    fn from(d: CoreAudioDevice) -> Self {
        Self {
            uuid: d.uuid().to_string(),
            kind: d.device_type().into(),
            name: d.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioDeviceList {
    pub audio_devices: Vec<AudioDeviceInfo>,
    pub selected_device: Option<AudioDeviceInfo>,
}

impl From<CoreAudioDevices> for AudioDeviceList {
    fn from(d: CoreAudioDevices) -> Self {
        Self {
            audio_devices: d.audio_devices.into_iter().map(AudioDeviceInfo::from).collect(),
            selected_device: d.selected_device.map(AudioDeviceInfo::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub default_contact_handle: String,
    pub notification_display_name: Option<String>,
    pub incoming_call_contact_handle_template: Option<String>,
    pub call_kit_configuration_json: Option<String>,
}

impl From<voice_core::VoiceSettings> for VoiceSettings {
    fn from(s: voice_core::VoiceSettings) -> Self {
        Self {
            default_contact_handle: s.default_contact_handle,
            notification_display_name: s.notification_display_name,
            incoming_call_contact_handle_template: s.incoming_call_contact_handle_template,
            call_kit_configuration_json: s
                .call_kit_configuration
                .and_then(|c| serde_json::to_string(&c).ok()),
        }
    }
}

fn warning_names(warnings: Vec<QualityWarning>) -> Vec<String> {
    warnings.iter().map(|w| w.as_str().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceClientEvent {
    Error { error: TwilioErrorInfo },
    CallInviteReceived { invite: CallInviteInfo },
    Registered,
    Unregistered,
    AudioDevicesUpdated { devices: AudioDeviceList },
    CallConnected { uuid: String },
    CallConnectFailure { uuid: String, error: TwilioErrorInfo },
    CallReconnecting { uuid: String, error: TwilioErrorInfo },
    CallReconnected { uuid: String },
    CallDisconnected { uuid: String, error: Option<TwilioErrorInfo> },
    CallRinging { uuid: String },
    CallQualityWarningsChanged { uuid: String, current: Vec<String>, previous: Vec<String> },
    CallMessageReceived { uuid: String, message: CallMessageInfo },
    CallInviteAccepted { uuid: String, call: CallInfo },
    CallInviteRejected { uuid: String },
    CallInviteCancelled { uuid: String, error: Option<TwilioErrorInfo> },
    CallInviteNotificationTapped { uuid: String },
    CallInviteMessageReceived { uuid: String, message: CallMessageInfo },
    MessageSent { voice_event_sid: String },
    MessageFailure { voice_event_sid: String, error: TwilioErrorInfo },
    PreflightConnected { uuid: String },
    PreflightCompleted { uuid: String, report_json: String },
    PreflightFailed { uuid: String, error: TwilioErrorInfo },
    PreflightSample { uuid: String, sample_json: String },
    PreflightQualityWarning { uuid: String, current: Vec<String>, previous: Vec<String> },
}

fn call_event(uuid: String, event: CallEvent) -> VoiceClientEvent {
    match event {
        CallEvent::Connected => VoiceClientEvent::CallConnected { uuid },
        CallEvent::ConnectFailure(e) => VoiceClientEvent::CallConnectFailure { uuid, error: e.into() },
        CallEvent::Reconnecting(e) => VoiceClientEvent::CallReconnecting { uuid, error: e.into() },
        CallEvent::Reconnected => VoiceClientEvent::CallReconnected { uuid },
        CallEvent::Disconnected(e) => VoiceClientEvent::CallDisconnected { uuid, error: e.map(Into::into) },
        CallEvent::Ringing => VoiceClientEvent::CallRinging { uuid },
        CallEvent::QualityWarningsChanged { current, previous } => VoiceClientEvent::CallQualityWarningsChanged {
            uuid,
            current: warning_names(current),
            previous: warning_names(previous),
        },
        CallEvent::MessageReceived(m) => VoiceClientEvent::CallMessageReceived { uuid, message: m.into() },
    }
}

fn preflight_event(uuid: String, event: PreflightTestEvent) -> Result<VoiceClientEvent, VoiceError> {
    Ok(match event {
        PreflightTestEvent::Connected => VoiceClientEvent::PreflightConnected { uuid },
        PreflightTestEvent::Completed(report) => VoiceClientEvent::PreflightCompleted {
            uuid,
            report_json: to_json(&report)?,
        },
        PreflightTestEvent::Failed(e) => VoiceClientEvent::PreflightFailed { uuid, error: e.into() },
        PreflightTestEvent::Sample(sample) => VoiceClientEvent::PreflightSample {
            uuid,
            sample_json: to_json(&sample)?,
        },
        PreflightTestEvent::QualityWarning { current, previous } => VoiceClientEvent::PreflightQualityWarning {
            uuid,
            current: warning_names(current),
            previous: warning_names(previous),
        },
    })
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("{msg}")]
    Twilio { code: u32, name: String, msg: String },
    #[error("Invalid argument: {msg}")]
    InvalidArgument { msg: String },
    #[error("Invalid state: {msg}")]
    InvalidState { msg: String },
    #[error("Unsupported platform: {msg}")]
    UnsupportedPlatform { msg: String },
    #[error("Unexpected native error: {msg}")]
    UnexpectedNative { msg: String },
    #[error("Internal error: {msg}")]
    Internal { msg: String },
    #[error("Not found: {msg}")]
    NotFound { msg: String },
}

impl From<voice_core::VoiceError> for VoiceError {
    fn from(e: voice_core::VoiceError) -> Self {
        tracing::error!("VoiceError: {e}");
        match e {
            voice_core::VoiceError::Twilio(err) => Self::Twilio {
                code: err.code(),
                name: err.name().to_string(),
                msg: err.message().to_string(),
            },
            voice_core::VoiceError::InvalidArgument(msg) => Self::InvalidArgument { msg },
            voice_core::VoiceError::InvalidState(msg) => Self::InvalidState { msg },
            voice_core::VoiceError::UnsupportedPlatform(msg) => Self::UnsupportedPlatform { msg },
            voice_core::VoiceError::UnexpectedNative { message, .. } => Self::UnexpectedNative { msg: message },
            voice_core::VoiceError::Internal(msg) => Self::Internal { msg },
        }
    }
}

fn not_found(kind: &str, id: &str) -> VoiceError {
    VoiceError::NotFound { msg: format!("no {kind} with id \"{id}\"") }
}

fn parse_json_arg(name: &str, raw: Option<&str>) -> Result<Value, VoiceError> {
    match raw {
        None => Ok(Value::Null),
        Some(raw) => serde_json::from_str(raw).map_err(|e| VoiceError::InvalidArgument {
            msg: format!("\"{name}\" is not valid JSON: {e}"),
        }),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, VoiceError> {
    serde_json::to_string(value).map_err(|e| VoiceError::Internal { msg: e.to_string() })
}

fn parse_platform(name: &str) -> Platform {
    match name.to_ascii_lowercase().as_str() {
        "android" => Platform::Android,
        "ios" => Platform::Ios,
        _ => Platform::Other(name.to_string()),
    }
}

// ── Callback interfaces ───────────────────────────────────────────────

/// Host side of the native bridge. Receives one JSON-encoded method call
/// (`{"method": "...", ...}`) and answers with the JSON promise envelope.
/// Called from a blocking worker thread, never from the host's UI thread.
pub trait NativeVoiceModule: Send + Sync {
    fn invoke(&self, request_json: String) -> String;
}

pub trait VoiceEventListener: Send + Sync {
    fn on_event(&self, event: VoiceClientEvent);
}

// ── Host module: FFI callback → core native module ────────────────────

struct HostModule {
    host: Arc<dyn NativeVoiceModule>,
}

impl NativeModule for HostModule {
    fn invoke(&self, method: NativeMethod) -> BoxFuture<'_, Result<NativePromise, voice_core::VoiceError>> {
        let host = self.host.clone();
        async move {
            let request = method.to_json()?;
            let response = tokio::task::spawn_blocking(move || host.invoke(request))
                .await
                .map_err(|e| voice_core::VoiceError::Internal(format!("native module invocation failed: {e}")))?;
            serde_json::from_str::<NativePromise>(&response)
                .map_err(|e| voice_core::VoiceError::Internal(format!("malformed native promise: {e}")))
        }
        .boxed()
    }
}

// ── Bridge listener: client events → FFI callback ─────────────────────

struct BridgeListener {
    ffi_listener: Arc<dyn VoiceEventListener>,
}

impl voice_core::EventListener<VoiceClientEvent> for BridgeListener {
    fn on_event(&self, event: VoiceClientEvent) {
        self.ffi_listener.on_event(event);
    }
}

// ── Entity registries ─────────────────────────────────────────────────

fn lock<T>(registry: &Mutex<HashMap<String, T>>) -> MutexGuard<'_, HashMap<String, T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Live entities, keyed by call uuid, invite uuid, voice event SID and
/// preflight uuid. Entries leave once their entity reaches a terminal state.
#[derive(Default)]
struct Registry {
    listeners: voice_core::EventEmitter<VoiceClientEvent>,
    calls: Mutex<HashMap<String, CoreCall>>,
    invites: Mutex<HashMap<String, CoreCallInvite>>,
    messages: Mutex<HashMap<String, OutgoingCallMessage>>,
    preflights: Mutex<HashMap<String, PreflightTest>>,
}

impl Registry {
    fn track_call(self: &Arc<Self>, call: CoreCall) -> CallInfo {
        let info = CallInfo::from(&call);
        let mut calls = lock(&self.calls);
        if !calls.contains_key(call.uuid()) {
            let registry = Arc::downgrade(self);
            let uuid = call.uuid().to_string();
            call.add_listener(Arc::new(move |event: CallEvent| {
                let Some(registry) = registry.upgrade() else { return };
                if matches!(event, CallEvent::ConnectFailure(_) | CallEvent::Disconnected(_)) {
                    lock(&registry.calls).remove(&uuid);
                }
                registry.listeners.emit(call_event(uuid.clone(), event));
            }));
            calls.insert(call.uuid().to_string(), call);
        }
        info
    }

    fn track_invite(self: &Arc<Self>, invite: CoreCallInvite) -> CallInviteInfo {
        let info = CallInviteInfo::from(&invite);
        let mut invites = lock(&self.invites);
        if !invites.contains_key(invite.uuid()) {
            let registry = Arc::downgrade(self);
            let uuid = invite.uuid().to_string();
            invite.add_listener(Arc::new(move |event: CallInviteEvent| {
                let Some(registry) = registry.upgrade() else { return };
                let uuid = uuid.clone();
                let event = match event {
                    CallInviteEvent::Accepted(call) => {
                        lock(&registry.invites).remove(&uuid);
                        let call = registry.track_call(call);
                        VoiceClientEvent::CallInviteAccepted { uuid, call }
                    }
                    CallInviteEvent::Rejected => {
                        lock(&registry.invites).remove(&uuid);
                        VoiceClientEvent::CallInviteRejected { uuid }
                    }
                    CallInviteEvent::Cancelled(e) => {
                        lock(&registry.invites).remove(&uuid);
                        VoiceClientEvent::CallInviteCancelled { uuid, error: e.map(Into::into) }
                    }
                    CallInviteEvent::NotificationTapped => VoiceClientEvent::CallInviteNotificationTapped { uuid },
                    CallInviteEvent::MessageReceived(m) => {
                        VoiceClientEvent::CallInviteMessageReceived { uuid, message: m.into() }
                    }
                };
                registry.listeners.emit(event);
            }));
            invites.insert(invite.uuid().to_string(), invite);
        }
        info
    }

    fn track_message(self: &Arc<Self>, message: OutgoingCallMessage) -> String {
        let sid = message.sid().to_string();
        let registry = Arc::downgrade(self);
        let voice_event_sid = sid.clone();
        message.add_listener(Arc::new(move |event: OutgoingCallMessageEvent| {
            let Some(registry) = registry.upgrade() else { return };
            lock(&registry.messages).remove(&voice_event_sid);
            let voice_event_sid = voice_event_sid.clone();
            registry.listeners.emit(match event {
                OutgoingCallMessageEvent::Sent => VoiceClientEvent::MessageSent { voice_event_sid },
                OutgoingCallMessageEvent::Failure(e) => {
                    VoiceClientEvent::MessageFailure { voice_event_sid, error: e.into() }
                }
            });
        }));
        lock(&self.messages).insert(sid.clone(), message);
        sid
    }

    fn track_preflight(self: &Arc<Self>, test: PreflightTest) -> String {
        let uuid = test.uuid().to_string();
        let registry = Arc::downgrade(self);
        let id = uuid.clone();
        test.add_listener(Arc::new(move |event: PreflightTestEvent| {
            let Some(registry) = registry.upgrade() else { return };
            if matches!(event, PreflightTestEvent::Completed(_) | PreflightTestEvent::Failed(_)) {
                lock(&registry.preflights).remove(&id);
            }
            match preflight_event(id.clone(), event) {
                Ok(event) => registry.listeners.emit(event),
                Err(e) => tracing::warn!("dropping preflight {id} event: {e}"),
            }
        }));
        lock(&self.preflights).insert(uuid.clone(), test);
        uuid
    }

    fn on_voice_event(self: &Arc<Self>, event: VoiceEvent) {
        let event = match event {
            VoiceEvent::Error(e) => VoiceClientEvent::Error { error: e.into() },
            VoiceEvent::CallInvite(invite) => VoiceClientEvent::CallInviteReceived {
                invite: self.track_invite(invite),
            },
            VoiceEvent::Registered => VoiceClientEvent::Registered,
            VoiceEvent::Unregistered => VoiceClientEvent::Unregistered,
            VoiceEvent::AudioDevicesUpdated { audio_devices, selected_device } => {
                VoiceClientEvent::AudioDevicesUpdated {
                    devices: CoreAudioDevices { audio_devices, selected_device }.into(),
                }
            }
        };
        self.listeners.emit(event);
    }

    fn call(&self, uuid: &str) -> Result<CoreCall, VoiceError> {
        lock(&self.calls).get(uuid).cloned().ok_or_else(|| not_found("call", uuid))
    }

    fn invite(&self, uuid: &str) -> Result<CoreCallInvite, VoiceError> {
        lock(&self.invites).get(uuid).cloned().ok_or_else(|| not_found("call invite", uuid))
    }

    fn preflight(&self, uuid: &str) -> Result<PreflightTest, VoiceError> {
        lock(&self.preflights).get(uuid).cloned().ok_or_else(|| not_found("preflight test", uuid))
    }
}

fn call_message(content: String, content_type: Option<String>, message_type: Option<String>) -> CallMessage {
    CallMessage {
        content: Value::String(content),
        content_type,
        message_type: message_type.unwrap_or_else(|| MESSAGE_TYPE_USER_DEFINED.to_string()),
    }
}

// ── VoiceClient: main FFI object ──────────────────────────────────────

pub struct VoiceClient {
    bus: Arc<NativeEventBus>,
    voice: Voice,
    registry: Arc<Registry>,
    settings: voice_core::SettingsStore,
    rt: tokio::runtime::Runtime,
}

impl VoiceClient {
    pub fn new(
        data_dir: String,
        platform: String,
        native_module: Box<dyn NativeVoiceModule>,
    ) -> Result<Self, VoiceError> {
        let rt = tokio::runtime::Runtime::new().map_err(|e| VoiceError::Internal {
            msg: format!("failed to create tokio runtime: {e}"),
        })?;
        let platform = parse_platform(&platform);
        let bus = Arc::new(NativeEventBus::new());
        let native = Arc::new(HostModule { host: Arc::from(native_module) });
        let voice = Voice::new(NativeBridge::new(native, bus.clone(), platform.provider()));

        let registry = Arc::new(Registry::default());
        let weak = Arc::downgrade(&registry);
        voice.add_listener(Arc::new(move |event: VoiceEvent| {
            if let Some(registry) = weak.upgrade() {
                registry.on_voice_event(event);
            }
        }));

        let settings = voice_core::SettingsStore::new(&data_dir);
        tracing::info!("voice client ready on {platform}, settings in {data_dir}");
        Ok(Self {
            bus,
            voice,
            registry,
            settings,
            rt,
        })
    }

    pub fn platform(&self) -> String {
        self.voice.platform().name().to_string()
    }

    pub fn add_listener(&self, listener: Box<dyn VoiceEventListener>) {
        let bridge = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        self.registry.listeners.add_listener(bridge);
    }

    /// Entry point for every event the native layer publishes.
    pub fn dispatch_native_event(&self, scope: String, event_json: String) -> Result<(), VoiceError> {
        let scope = Scope::parse(&scope).ok_or_else(|| VoiceError::InvalidArgument {
            msg: format!("unknown event scope \"{scope}\""),
        })?;
        self.bus.dispatch_json(scope, &event_json).map_err(VoiceError::from)
    }

    pub fn connect(&self, token: String, options_json: Option<String>) -> Result<CallInfo, VoiceError> {
        let options = parse_connect_options(&parse_json_arg("options", options_json.as_deref())?)?;
        let options = self.settings.get().apply_to(options);

        // Keep panics from crossing the FFI boundary.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.rt.block_on(self.voice.connect(&token, options)).map_err(VoiceError::from)
        }));

        match result {
            Ok(Ok(call)) => Ok(self.registry.track_call(call)),
            Ok(Err(e)) => Err(e),
            Err(panic_info) => {
                let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!("connect() panicked: {msg}");
                Err(VoiceError::Internal { msg: format!("panic in connect: {msg}") })
            }
        }
    }

    pub fn register(&self, token: String) -> Result<(), VoiceError> {
        self.rt.block_on(self.voice.register(&token)).map_err(VoiceError::from)
    }

    pub fn unregister(&self, token: String) -> Result<(), VoiceError> {
        self.rt.block_on(self.voice.unregister(&token)).map_err(VoiceError::from)
    }

    pub fn get_calls(&self) -> Result<Vec<CallInfo>, VoiceError> {
        let calls = self.rt.block_on(self.voice.get_calls())?;
        let mut infos: Vec<CallInfo> = calls.into_values().map(|c| self.registry.track_call(c)).collect();
        infos.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(infos)
    }

    pub fn get_call_invites(&self) -> Result<Vec<CallInviteInfo>, VoiceError> {
        let invites = self.rt.block_on(self.voice.get_call_invites())?;
        let mut infos: Vec<CallInviteInfo> = invites
            .into_values()
            .map(|i| self.registry.track_invite(i))
            .collect();
        infos.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(infos)
    }

    pub fn get_audio_devices(&self) -> Result<AudioDeviceList, VoiceError> {
        Ok(self.rt.block_on(self.voice.get_audio_devices())?.into())
    }

    pub fn select_audio_device(&self, uuid: String) -> Result<(), VoiceError> {
        self.rt.block_on(async {
            let devices = self.voice.get_audio_devices().await?;
            match devices.audio_devices.into_iter().find(|d| d.uuid() == uuid) {
                Some(device) => device.select().await.map_err(VoiceError::from),
                None => Err(not_found("audio device", &uuid)),
            }
        })
    }

    pub fn get_version(&self) -> Result<String, VoiceError> {
        self.rt.block_on(self.voice.get_version()).map_err(VoiceError::from)
    }

    pub fn get_device_token(&self) -> Result<String, VoiceError> {
        self.rt.block_on(self.voice.get_device_token()).map_err(VoiceError::from)
    }

    pub fn show_av_route_picker_view(&self) -> Result<(), VoiceError> {
        self.rt.block_on(self.voice.show_av_route_picker_view()).map_err(VoiceError::from)
    }

    pub fn initialize_push_registry(&self) -> Result<(), VoiceError> {
        self.rt.block_on(self.voice.initialize_push_registry()).map_err(VoiceError::from)
    }

    /// Apply a CallKit configuration and remember it for the next launch.
    pub fn set_call_kit_configuration(&self, configuration_json: String) -> Result<(), VoiceError> {
        let configuration: CallKitConfiguration =
            serde_json::from_str(&configuration_json).map_err(|e| VoiceError::InvalidArgument {
                msg: format!("invalid CallKit configuration: {e}"),
            })?;
        self.rt.block_on(self.voice.set_call_kit_configuration(configuration.clone()))?;
        self.settings.set_call_kit_configuration(Some(configuration));
        Ok(())
    }

    pub fn handle_firebase_message(&self, message: HashMap<String, String>) -> Result<bool, VoiceError> {
        let message: BTreeMap<String, String> = message.into_iter().collect();
        self.rt.block_on(self.voice.handle_firebase_message(message)).map_err(VoiceError::from)
    }

    pub fn set_incoming_call_contact_handle_template(&self, handle_template: Option<String>) -> Result<(), VoiceError> {
        self.rt
            .block_on(self.voice.set_incoming_call_contact_handle_template(handle_template.clone()))?;
        self.settings.set_incoming_call_contact_handle_template(handle_template);
        Ok(())
    }

    /// Re-apply persisted native configuration, typically right after launch.
    pub fn apply_stored_settings(&self) -> Result<(), VoiceError> {
        let stored = self.settings.get();
        self.rt.block_on(async {
            if let Some(template) = stored.incoming_call_contact_handle_template {
                self.voice.set_incoming_call_contact_handle_template(Some(template)).await?;
            }
            if let (Platform::Ios, Some(configuration)) = (self.voice.platform(), stored.call_kit_configuration) {
                self.voice.set_call_kit_configuration(configuration).await?;
            }
            Ok::<(), VoiceError>(())
        })
    }

    // ── Calls ─────────────────────────────────────────────────────────

    pub fn call_info(&self, uuid: String) -> Result<CallInfo, VoiceError> {
        Ok(CallInfo::from(&self.registry.call(&uuid)?))
    }

    pub fn call_disconnect(&self, uuid: String) -> Result<(), VoiceError> {
        let call = self.registry.call(&uuid)?;
        self.rt.block_on(call.disconnect()).map_err(VoiceError::from)
    }

    pub fn call_hold(&self, uuid: String, hold: bool) -> Result<bool, VoiceError> {
        let call = self.registry.call(&uuid)?;
        self.rt.block_on(call.hold(hold)).map_err(VoiceError::from)
    }

    pub fn call_mute(&self, uuid: String, mute: bool) -> Result<bool, VoiceError> {
        let call = self.registry.call(&uuid)?;
        self.rt.block_on(call.mute(mute)).map_err(VoiceError::from)
    }

    pub fn call_send_digits(&self, uuid: String, digits: String) -> Result<(), VoiceError> {
        let call = self.registry.call(&uuid)?;
        self.rt.block_on(call.send_digits(&digits)).map_err(VoiceError::from)
    }

    /// Returns the voice event SID that later `MessageSent` or
    /// `MessageFailure` events refer to.
    pub fn call_send_message(
        &self,
        uuid: String,
        content: String,
        content_type: Option<String>,
        message_type: Option<String>,
    ) -> Result<String, VoiceError> {
        let call = self.registry.call(&uuid)?;
        let message = call_message(content, content_type, message_type);
        let outgoing = self.rt.block_on(call.send_message(&message))?;
        Ok(self.registry.track_message(outgoing))
    }

    pub fn call_post_feedback(&self, uuid: String, score: u8, issue: String) -> Result<(), VoiceError> {
        let call = self.registry.call(&uuid)?;
        let score = Score::try_from(score)?;
        let issue: Issue = issue.parse()?;
        self.rt.block_on(call.post_feedback(score, issue)).map_err(VoiceError::from)
    }

    pub fn call_get_stats(&self, uuid: String) -> Result<String, VoiceError> {
        let call = self.registry.call(&uuid)?;
        let report = self.rt.block_on(call.get_stats())?;
        to_json(&report)
    }

    // ── Call invites ──────────────────────────────────────────────────

    pub fn call_invite_accept(&self, uuid: String, options_json: Option<String>) -> Result<CallInfo, VoiceError> {
        let invite = self.registry.invite(&uuid)?;
        let options = parse_json_arg("options", options_json.as_deref())?;
        let call = self.rt.block_on(invite.accept(options))?;
        lock(&self.registry.invites).remove(&uuid);
        Ok(self.registry.track_call(call))
    }

    pub fn call_invite_reject(&self, uuid: String) -> Result<(), VoiceError> {
        let invite = self.registry.invite(&uuid)?;
        self.rt.block_on(invite.reject())?;
        lock(&self.registry.invites).remove(&uuid);
        Ok(())
    }

    pub fn call_invite_is_valid(&self, uuid: String) -> Result<bool, VoiceError> {
        let invite = self.registry.invite(&uuid)?;
        self.rt.block_on(invite.is_valid()).map_err(VoiceError::from)
    }

    pub fn call_invite_send_message(
        &self,
        uuid: String,
        content: String,
        content_type: Option<String>,
        message_type: Option<String>,
    ) -> Result<String, VoiceError> {
        let invite = self.registry.invite(&uuid)?;
        let message = call_message(content, content_type, message_type);
        let outgoing = self.rt.block_on(invite.send_message(&message))?;
        Ok(self.registry.track_message(outgoing))
    }

    pub fn call_invite_update_caller_handle(&self, uuid: String, handle: String) -> Result<(), VoiceError> {
        let invite = self.registry.invite(&uuid)?;
        self.rt.block_on(invite.update_caller_handle(&handle)).map_err(VoiceError::from)
    }

    // ── Preflight tests ───────────────────────────────────────────────

    /// Start a preflight test and return its uuid.
    pub fn run_preflight(&self, token: String, options_json: Option<String>) -> Result<String, VoiceError> {
        let options = parse_json_arg("options", options_json.as_deref())?;
        let test = self.rt.block_on(self.voice.run_preflight(&token, options))?;
        Ok(self.registry.track_preflight(test))
    }

    pub fn preflight_get_call_sid(&self, uuid: String) -> Result<String, VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        self.rt.block_on(test.get_call_sid()).map_err(VoiceError::from)
    }

    pub fn preflight_get_start_time(&self, uuid: String) -> Result<f64, VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        self.rt.block_on(test.get_start_time()).map_err(VoiceError::from)
    }

    pub fn preflight_get_end_time(&self, uuid: String) -> Result<f64, VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        self.rt.block_on(test.get_end_time()).map_err(VoiceError::from)
    }

    pub fn preflight_get_latest_sample(&self, uuid: String) -> Result<String, VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        let sample = self.rt.block_on(test.get_latest_sample())?;
        to_json(&sample)
    }

    pub fn preflight_get_report(&self, uuid: String) -> Result<String, VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        let report = self.rt.block_on(test.get_report())?;
        to_json(&report)
    }

    pub fn preflight_get_state(&self, uuid: String) -> Result<PreflightState, VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        Ok(self.rt.block_on(test.get_state())?.into())
    }

    pub fn preflight_stop(&self, uuid: String) -> Result<(), VoiceError> {
        let test = self.registry.preflight(&uuid)?;
        self.rt.block_on(test.stop()).map_err(VoiceError::from)
    }

    // ── Settings ──────────────────────────────────────────────────────

    pub fn get_settings(&self) -> VoiceSettings {
        self.settings.get().into()
    }

    pub fn set_default_contact_handle(&self, handle: String) {
        self.settings.set_default_contact_handle(handle);
    }

    pub fn set_notification_display_name(&self, name: Option<String>) {
        self.settings.set_notification_display_name(name);
    }
}
