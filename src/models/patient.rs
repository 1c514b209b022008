//! Patient models
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::hospital::Hospital;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Normal,
    Medium,
    High,
}

impl Priority {
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Self::Normal),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }

    pub fn level(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Medium => "Sedang",
            Self::High => "Tinggi",
        }
    }

    /// Parse a form field; blank means `Normal`.
    pub fn parse_field(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Self::Normal);
        }
        raw.parse::<i64>().ok().and_then(Self::from_level)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    // visitor credential; kept out of broadcasts and template dumps
    #[serde(skip_serializing, default)]
    pub access_key: String,
    /// Empty until the first condition update; empty patients stay off the public list.
    pub condition: String,
    pub family_member_name: String,
    pub phone_number: String,
    pub emergency_phone_number: String,
    pub id_card_number: String,
    pub address: String,
    pub room_responsible_person: String,
    pub room_responsible_phone: String,
    pub doctor_name: String,
    pub doctor_phone: String,
    pub priority: i64,
    pub last_updated: String,
}

impl Patient {
    pub fn priority(&self) -> Option<Priority> {
        Priority::from_level(self.priority)
    }
}

/// Row of the public active list.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub id: i64,
    pub name: String,
    pub condition: String,
    pub priority: i64,
    pub last_updated: String,
}

/// Row of the nurse dashboard table; unlike the public list it carries the access key.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DashboardRow {
    pub id: i64,
    pub name: String,
    pub access_key: String,
    pub condition: String,
    pub priority: i64,
    pub last_updated: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct ConditionHistory {
    pub id: i64,
    pub patient_id: i64,
    pub condition: String,
    pub timestamp: String,
}

/// Current record, full history and hospital info for one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub patient: Patient,
    pub history: Vec<ConditionHistory>,
    pub hospital: Hospital,
}

/// New-patient form. Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewPatientReq {
    pub patient_name: String,
    pub family_member_name: String,
    pub phone_number: String,
    pub emergency_phone_number: String,
    pub id_card_number: String,
    pub address: String,
    pub room_responsible_person: String,
    pub room_responsible_phone: String,
    pub doctor_name: String,
    pub doctor_phone: String,
    pub priority: String,
}

impl NewPatientReq {
    pub fn trimmed(self) -> Self {
        Self {
            patient_name: self.patient_name.trim().to_string(),
            family_member_name: self.family_member_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            emergency_phone_number: self.emergency_phone_number.trim().to_string(),
            id_card_number: self.id_card_number.trim().to_string(),
            address: self.address.trim().to_string(),
            room_responsible_person: self.room_responsible_person.trim().to_string(),
            room_responsible_phone: self.room_responsible_phone.trim().to_string(),
            doctor_name: self.doctor_name.trim().to_string(),
            doctor_phone: self.doctor_phone.trim().to_string(),
            priority: self.priority.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_labels_follow_fixed_table() {
        assert_eq!(Priority::from_level(0).map(Priority::label), Some("Normal"));
        assert_eq!(Priority::from_level(1).map(Priority::label), Some("Sedang"));
        assert_eq!(Priority::from_level(2).map(Priority::label), Some("Tinggi"));
        assert_eq!(Priority::from_level(3), None);
        assert_eq!(Priority::from_level(-1), None);
    }

    #[test]
    fn priority_field_parsing() {
        assert_eq!(Priority::parse_field(""), Some(Priority::Normal));
        assert_eq!(Priority::parse_field(" 2 "), Some(Priority::High));
        assert_eq!(Priority::parse_field("7"), None);
        assert_eq!(Priority::parse_field("high"), None);
    }

    #[test]
    fn access_key_is_not_serialized() {
        let patient = Patient {
            id: 1,
            name: "Budi".into(),
            access_key: "deadbeef".into(),
            condition: String::new(),
            family_member_name: String::new(),
            phone_number: String::new(),
            emergency_phone_number: String::new(),
            id_card_number: String::new(),
            address: String::new(),
            room_responsible_person: String::new(),
            room_responsible_phone: String::new(),
            doctor_name: String::new(),
            doctor_phone: String::new(),
            priority: 0,
            last_updated: String::new(),
        };
        let json = serde_json::to_string(&patient).unwrap();
        assert!(!json.contains("deadbeef"));
    }
}
