//! WebRTC statistics returned by `Call::get_stats`.
//!
//! Native SDKs omit fields they do not track, so every metric is optional.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IceCandidatePairState {
    StateFailed,
    StateFrozen,
    StateInProgress,
    StateSucceeded,
    StateWaiting,
    #[serde(other)]
    StateUnknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IceCandidatePairStats {
    pub active_candidate_pair: Option<bool>,
    pub available_incoming_bitrate: Option<f64>,
    pub available_outgoing_bitrate: Option<f64>,
    pub bytes_received: Option<u64>,
    pub bytes_sent: Option<u64>,
    pub consent_requests_received: Option<u64>,
    pub consent_requests_sent: Option<u64>,
    pub consent_responses_received: Option<u64>,
    pub consent_responses_sent: Option<u64>,
    pub current_round_trip_time: Option<f64>,
    pub local_candidate_id: Option<String>,
    pub local_candidate_ip: Option<String>,
    pub nominated: Option<bool>,
    pub priority: Option<f64>,
    pub readable: Option<bool>,
    pub relay_protocol: Option<String>,
    pub remote_candidate_id: Option<String>,
    pub remote_candidate_ip: Option<String>,
    pub requests_received: Option<u64>,
    pub requests_sent: Option<u64>,
    pub responses_received: Option<u64>,
    pub responses_sent: Option<u64>,
    pub retransmissions_received: Option<u64>,
    pub retransmissions_sent: Option<u64>,
    pub state: Option<IceCandidatePairState>,
    pub total_round_trip_time: Option<f64>,
    pub transport_id: Option<String>,
    pub writeable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IceCandidateStats {
    pub candidate_type: Option<String>,
    pub deleted: Option<bool>,
    pub ip: Option<String>,
    pub is_remote: Option<bool>,
    pub port: Option<u32>,
    pub priority: Option<f64>,
    pub protocol: Option<String>,
    pub transport_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalAudioTrackStats {
    pub codec: Option<String>,
    pub packets_lost: Option<i64>,
    pub ssrc: Option<String>,
    pub timestamp: Option<f64>,
    pub track_id: Option<String>,
    pub bytes_sent: Option<u64>,
    pub packets_sent: Option<u64>,
    pub round_trip_time: Option<f64>,
    pub audio_level: Option<f64>,
    pub jitter: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteAudioTrackStats {
    pub codec: Option<String>,
    pub packets_lost: Option<i64>,
    pub ssrc: Option<String>,
    pub timestamp: Option<f64>,
    pub track_id: Option<String>,
    pub bytes_received: Option<u64>,
    pub packets_received: Option<u64>,
    pub audio_level: Option<f64>,
    pub jitter: Option<f64>,
    pub mos: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsReport {
    pub peer_connection_id: Option<String>,
    pub ice_candidate_pair_stats: Vec<IceCandidatePairStats>,
    pub ice_candidate_stats: Vec<IceCandidateStats>,
    pub local_audio_track_stats: Vec<LocalAudioTrackStats>,
    pub remote_audio_track_stats: Vec<RemoteAudioTrackStats>,
}
