//! Platform capability providers.
//!
//! Each target platform gets one [`PlatformProvider`] implementation chosen
//! at construction. Operations a platform lacks keep the default body, which
//! fails with [`VoiceError::UnsupportedPlatform`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;

use crate::bridge::{NativeBridge, NativeMethod};
use crate::call::NativeCallInfo;
use crate::errors::VoiceError;
use crate::options::{CallKitConfiguration, ConnectOptions, DEFAULT_CONTACT_HANDLE};
use crate::preflight::CallQuality;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Other(String),
}

impl Platform {
    pub fn name(&self) -> &str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Other(name) => name,
        }
    }

    /// Pick the capability provider for this platform.
    pub fn provider(&self) -> Arc<dyn PlatformProvider> {
        match self {
            Platform::Android => Arc::new(AndroidPlatform),
            Platform::Ios => Arc::new(IosPlatform),
            Platform::Other(name) => Arc::new(UnsupportedPlatform { name: name.clone() }),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn only_on<'a, T: Send + 'a>(platform: &Platform, supported: &str) -> BoxFuture<'a, Result<T, VoiceError>> {
    future::ready(Err(VoiceError::unsupported(platform.name(), supported))).boxed()
}

pub trait PlatformProvider: Send + Sync {
    fn platform(&self) -> Platform;

    fn connect<'a>(
        &'a self,
        _bridge: &'a NativeBridge,
        _token: String,
        _options: ConnectOptions,
    ) -> BoxFuture<'a, Result<NativeCallInfo, VoiceError>> {
        future::ready(Err(VoiceError::UnsupportedPlatform(format!(
            "Unsupported platform \"{}\". Expected \"android\" or \"ios\".",
            self.platform()
        ))))
        .boxed()
    }

    fn show_av_route_picker_view<'a>(&'a self, _bridge: &'a NativeBridge) -> BoxFuture<'a, Result<(), VoiceError>> {
        only_on(&self.platform(), "iOS")
    }

    fn initialize_push_registry<'a>(&'a self, _bridge: &'a NativeBridge) -> BoxFuture<'a, Result<(), VoiceError>> {
        only_on(&self.platform(), "iOS")
    }

    fn set_call_kit_configuration<'a>(
        &'a self,
        _bridge: &'a NativeBridge,
        _configuration: CallKitConfiguration,
    ) -> BoxFuture<'a, Result<(), VoiceError>> {
        only_on(&self.platform(), "iOS")
    }

    fn update_caller_handle<'a>(
        &'a self,
        _bridge: &'a NativeBridge,
        _uuid: String,
        _handle: String,
    ) -> BoxFuture<'a, Result<(), VoiceError>> {
        only_on(&self.platform(), "iOS")
    }

    /// Resolves `true` when the message was a Voice push and got handled.
    fn handle_firebase_message<'a>(
        &'a self,
        _bridge: &'a NativeBridge,
        _message: BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<bool, VoiceError>> {
        only_on(&self.platform(), "Android")
    }

    /// Hook run right after a preflight test handle is created.
    fn preflight_created(&self, _bridge: &NativeBridge) {}

    /// Decode the platform's encoding of a preflight report's call quality.
    fn parse_call_quality(&self, _value: &Value) -> Result<Option<CallQuality>, VoiceError> {
        Err(VoiceError::InvalidState("Invalid platform.".to_string()))
    }

    /// Decode the platform's encoding of a preflight report's TURN flag.
    fn parse_is_turn_required(&self, _value: &Value) -> Result<Option<bool>, VoiceError> {
        Err(VoiceError::InvalidState("Invalid platform.".to_string()))
    }
}

pub struct IosPlatform;

impl PlatformProvider for IosPlatform {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn connect<'a>(
        &'a self,
        bridge: &'a NativeBridge,
        token: String,
        options: ConnectOptions,
    ) -> BoxFuture<'a, Result<NativeCallInfo, VoiceError>> {
        let contact_handle = match options.contact_handle {
            Some(handle) if !handle.is_empty() => handle,
            _ => DEFAULT_CONTACT_HANDLE.to_string(),
        };
        bridge
            .call(NativeMethod::VoiceConnectIos {
                token,
                params: options.params,
                contact_handle,
            })
            .boxed()
    }

    fn show_av_route_picker_view<'a>(&'a self, bridge: &'a NativeBridge) -> BoxFuture<'a, Result<(), VoiceError>> {
        bridge.call_unit(NativeMethod::VoiceShowNativeAvRoutePicker).boxed()
    }

    fn initialize_push_registry<'a>(&'a self, bridge: &'a NativeBridge) -> BoxFuture<'a, Result<(), VoiceError>> {
        bridge.call_unit(NativeMethod::VoiceInitializePushRegistry).boxed()
    }

    fn set_call_kit_configuration<'a>(
        &'a self,
        bridge: &'a NativeBridge,
        configuration: CallKitConfiguration,
    ) -> BoxFuture<'a, Result<(), VoiceError>> {
        bridge
            .call_unit(NativeMethod::VoiceSetCallKitConfiguration { configuration })
            .boxed()
    }

    fn update_caller_handle<'a>(
        &'a self,
        bridge: &'a NativeBridge,
        uuid: String,
        handle: String,
    ) -> BoxFuture<'a, Result<(), VoiceError>> {
        bridge
            .call_unit(NativeMethod::CallInviteUpdateCallerHandle { uuid, handle })
            .boxed()
    }

    /// iOS queues preflight events until asked to flush them. The flush runs
    /// on a later task so listeners attached right after creation see them.
    fn preflight_created(&self, bridge: &NativeBridge) {
        let bridge = bridge.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    if let Err(e) = bridge.call_unit(NativeMethod::PreflightTestFlushEvents).await {
                        tracing::warn!("failed to flush preflight test events: {e}");
                    }
                });
            }
            Err(_) => tracing::warn!("no async runtime available to flush preflight test events"),
        }
    }

    /// iOS reports call quality as an integer in `[0, 4]`.
    fn parse_call_quality(&self, value: &Value) -> Result<Option<CallQuality>, VoiceError> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => {
                let quality = match n.as_u64() {
                    Some(0) => CallQuality::Excellent,
                    Some(1) => CallQuality::Great,
                    Some(2) => CallQuality::Good,
                    Some(3) => CallQuality::Fair,
                    Some(4) => CallQuality::Degraded,
                    _ => {
                        return Err(VoiceError::InvalidState(format!(
                            "Call quality invalid. Expected [0, 4], found \"{n}\"."
                        )));
                    }
                };
                Ok(Some(quality))
            }
            other => Err(VoiceError::InvalidState(format!(
                "Call quality not of type \"number\". Found \"{other}\"."
            ))),
        }
    }

    /// iOS reports the TURN flag as the string `"true"` or `"false"`.
    fn parse_is_turn_required(&self, value: &Value) -> Result<Option<bool>, VoiceError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s == "true" => Ok(Some(true)),
            Value::String(s) if s == "false" => Ok(Some(false)),
            Value::String(s) => Err(VoiceError::InvalidState(format!(
                "PreflightTest \"isTurnRequired\" not valid. Found \"{s}\"."
            ))),
            other => Err(VoiceError::InvalidState(format!(
                "PreflightTest \"isTurnRequired\" not of type \"string\". Found \"{other}\"."
            ))),
        }
    }
}

pub struct AndroidPlatform;

impl PlatformProvider for AndroidPlatform {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn connect<'a>(
        &'a self,
        bridge: &'a NativeBridge,
        token: String,
        options: ConnectOptions,
    ) -> BoxFuture<'a, Result<NativeCallInfo, VoiceError>> {
        bridge
            .call(NativeMethod::VoiceConnectAndroid {
                token,
                params: options.params,
                notification_display_name: options.notification_display_name,
            })
            .boxed()
    }

    /// No route picker on Android; resolves without touching the native layer.
    fn show_av_route_picker_view<'a>(&'a self, _bridge: &'a NativeBridge) -> BoxFuture<'a, Result<(), VoiceError>> {
        future::ready(Ok(())).boxed()
    }

    fn handle_firebase_message<'a>(
        &'a self,
        bridge: &'a NativeBridge,
        message: BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<bool, VoiceError>> {
        bridge.call(NativeMethod::VoiceHandleEvent { message }).boxed()
    }

    /// Android reports call quality as a capitalised name.
    fn parse_call_quality(&self, value: &Value) -> Result<Option<CallQuality>, VoiceError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => {
                let quality = match s.as_str() {
                    "Excellent" => CallQuality::Excellent,
                    "Great" => CallQuality::Great,
                    "Good" => CallQuality::Good,
                    "Fair" => CallQuality::Fair,
                    "Degraded" => CallQuality::Degraded,
                    _ => {
                        return Err(VoiceError::InvalidState(format!(
                            "Call quality invalid. Expected a string, found \"{s}\"."
                        )));
                    }
                };
                Ok(Some(quality))
            }
            other => Err(VoiceError::InvalidState(format!(
                "Call quality not of type \"string\". Found \"{other}\"."
            ))),
        }
    }

    fn parse_is_turn_required(&self, value: &Value) -> Result<Option<bool>, VoiceError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            other => Err(VoiceError::InvalidState(format!(
                "PreflightTest \"isTurnRequired\" not valid. Found \"{other}\"."
            ))),
        }
    }
}

/// Any platform other than Android and iOS.
pub struct UnsupportedPlatform {
    name: String,
}

impl PlatformProvider for UnsupportedPlatform {
    fn platform(&self) -> Platform {
        Platform::Other(self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use crate::test_support::harness_on;
    use serde_json::json;

    #[tokio::test]
    async fn route_picker_is_a_no_op_on_android() {
        let h = harness_on(Platform::Android);
        h.bridge.platform().show_av_route_picker_view(&h.bridge).await.unwrap();
        assert!(h.native.calls().is_empty());
    }

    #[tokio::test]
    async fn ios_only_methods_fail_on_android() {
        let h = harness_on(Platform::Android);
        let err = h.bridge.platform().initialize_push_registry(&h.bridge).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported platform \"android\". This method is only supported on iOS."
        );
        let err = h
            .bridge
            .platform()
            .set_call_kit_configuration(&h.bridge, CallKitConfiguration::default())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::PlatformUnsupported);
        assert!(h.native.calls().is_empty());
    }

    #[tokio::test]
    async fn android_only_methods_fail_on_ios() {
        let h = harness_on(Platform::Ios);
        let err = h
            .bridge
            .platform()
            .handle_firebase_message(&h.bridge, BTreeMap::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported platform \"ios\". This method is only supported on Android."
        );
    }

    #[tokio::test]
    async fn ios_connect_defaults_empty_contact_handle() {
        let h = harness_on(Platform::Ios);
        h.native.respond_value("voice_connect_ios", json!({ "uuid": "c1" }));
        let options = ConnectOptions {
            contact_handle: Some(String::new()),
            ..Default::default()
        };
        let info = h.bridge.platform().connect(&h.bridge, "tok".into(), options).await.unwrap();
        assert_eq!(info.uuid, "c1");
        assert_eq!(
            h.native.calls(),
            vec![NativeMethod::VoiceConnectIos {
                token: "tok".into(),
                params: BTreeMap::new(),
                contact_handle: "Default Contact".into(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_platform_cannot_connect() {
        let h = harness_on(Platform::Other("web".into()));
        let err = h
            .bridge
            .platform()
            .connect(&h.bridge, "tok".into(), ConnectOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported platform \"web\". Expected \"android\" or \"ios\"."
        );
    }

    #[test]
    fn call_quality_per_platform() {
        assert_eq!(IosPlatform.parse_call_quality(&json!(2)).unwrap(), Some(CallQuality::Good));
        assert!(IosPlatform.parse_call_quality(&json!(9)).is_err());
        assert!(IosPlatform.parse_call_quality(&json!("Good")).is_err());
        assert_eq!(
            AndroidPlatform.parse_call_quality(&json!("Degraded")).unwrap(),
            Some(CallQuality::Degraded)
        );
        assert_eq!(AndroidPlatform.parse_call_quality(&Value::Null).unwrap(), None);
    }

    #[test]
    fn turn_required_per_platform() {
        assert_eq!(IosPlatform.parse_is_turn_required(&json!("true")).unwrap(), Some(true));
        assert!(IosPlatform.parse_is_turn_required(&json!(true)).is_err());
        assert_eq!(AndroidPlatform.parse_is_turn_required(&json!(false)).unwrap(), Some(false));
        assert!(AndroidPlatform.parse_is_turn_required(&json!("false")).is_err());
    }
}
