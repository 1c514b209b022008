//! Realtime fan-out of patient list / patient detail snapshots
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{
    hospital::Hospital,
    patient::{ConditionHistory, Patient, PatientSnapshot, PatientSummary},
};

const CHANNEL_CAPACITY: usize = 100;

/// Outbound message, tagged by `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RealtimeEvent {
    PatientListUpdate {
        patients: Vec<PatientSummary>,
    },
    PatientDataUpdate {
        patient: Patient,
        history: Vec<ConditionHistory>,
        hospital: Hospital,
    },
}

impl RealtimeEvent {
    /// Same value as the `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::PatientListUpdate { .. } => "patient_list_update",
            RealtimeEvent::PatientDataUpdate { .. } => "patient_data_update",
        }
    }
}

impl From<PatientSnapshot> for RealtimeEvent {
    fn from(snapshot: PatientSnapshot) -> Self {
        RealtimeEvent::PatientDataUpdate {
            patient: snapshot.patient,
            history: snapshot.history,
            hospital: snapshot.hospital,
        }
    }
}

/// Inbound pull request from a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientRequest {
    RequestPatientList,
    RequestPatientData { patient_id: i64 },
}

/// Single topic; every subscriber gets every event.
pub struct Notifier {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Fire and forget. Having no subscribers is not an error.
    pub fn publish(&self, event: RealtimeEvent) {
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "realtime event published"),
            Err(_) => tracing::trace!("realtime event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
