use std::fmt;

use serde::Deserialize;

use crate::bridge::{NativeBridge, NativeMethod};
use crate::errors::VoiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioDeviceType {
    Earpiece,
    Speaker,
    Bluetooth,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NativeAudioDeviceInfo {
    pub uuid: String,
    #[serde(rename = "type")]
    pub device_type: AudioDeviceType,
    pub name: String,
}

/// An audio route the native layer can play through.
#[derive(Clone)]
pub struct AudioDevice {
    info: NativeAudioDeviceInfo,
    bridge: NativeBridge,
}

impl AudioDevice {
    pub(crate) fn new(bridge: &NativeBridge, info: NativeAudioDeviceInfo) -> Self {
        Self {
            info,
            bridge: bridge.clone(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.info.uuid
    }

    pub fn device_type(&self) -> AudioDeviceType {
        self.info.device_type
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Route call audio through this device.
    pub async fn select(&self) -> Result<(), VoiceError> {
        self.bridge
            .call_unit(NativeMethod::VoiceSelectAudioDevice { uuid: self.info.uuid.clone() })
            .await
    }
}

impl PartialEq for AudioDevice {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioDevice")
            .field("uuid", &self.info.uuid)
            .field("type", &self.info.device_type)
            .field("name", &self.info.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::harness;
    use serde_json::json;

    #[tokio::test]
    async fn select_forwards_uuid() {
        let h = harness();
        let info: NativeAudioDeviceInfo =
            serde_json::from_value(json!({ "uuid": "d1", "type": "bluetooth", "name": "Headset" })).unwrap();
        let device = AudioDevice::new(&h.bridge, info);

        device.select().await.unwrap();

        assert_eq!(device.device_type(), AudioDeviceType::Bluetooth);
        assert_eq!(h.native.calls(), vec![NativeMethod::VoiceSelectAudioDevice { uuid: "d1".into() }]);
    }

    #[test]
    fn unknown_device_type_is_rejected() {
        let parsed = serde_json::from_value::<NativeAudioDeviceInfo>(
            json!({ "uuid": "d1", "type": "hdmi", "name": "TV" }),
        );
        assert!(parsed.is_err());
    }
}
