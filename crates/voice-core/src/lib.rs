//! Voice SDK bridging core.
//!
//! Pure Rust crate with no platform dependencies. Turns untyped native
//! events and settled-promise envelopes into typed entities (calls, call
//! invites, call messages, preflight tests) and typed errors.
//! Consumed by native shells via UniFFI bindings.

pub mod audio_device;
pub mod bridge;
pub mod call;
pub mod call_invite;
pub mod call_message;
pub mod error_table;
pub mod errors;
pub mod events;
pub mod options;
pub mod platform;
pub mod preflight;
pub mod settings;
pub mod settle;
pub mod stats;
pub mod validation;
pub mod voice;

#[cfg(test)]
mod test_support;

pub use audio_device::{AudioDevice, AudioDeviceType};
pub use bridge::{EventSource, NativeBridge, NativeEventBus, NativeEventSubscriber, NativeMethod, NativeModule, Scope};
pub use call::{Call, CallEvent, CallState, Issue, QualityWarning, Score};
pub use call_invite::{CallInvite, CallInviteEvent, CallInviteState};
pub use call_message::{CallMessage, IncomingCallMessage, OutgoingCallMessage, OutgoingCallMessageEvent};
pub use error_table::{ErrorFamily, TwilioErrorKind};
pub use errors::{ErrorCategory, TwilioError, VoiceError};
pub use events::{EventEmitter, EventListener, ListenerId};
pub use options::{CallKitConfiguration, ConnectOptions};
pub use platform::{Platform, PlatformProvider};
pub use preflight::{PreflightTest, PreflightTestEvent, PreflightTestState, Report, RtcSample};
pub use settings::{SettingsStore, VoiceSettings};
pub use settle::NativePromise;
pub use stats::StatsReport;
pub use voice::{AudioDevices, Voice, VoiceEvent};
