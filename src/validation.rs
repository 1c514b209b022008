// Form field validation
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};
use crate::models::patient::{NewPatientReq, Priority};

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{10,13}$").expect("valid regex"));
static ID_CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{16}$").expect("valid regex"));

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 100;

/// Empty is accepted: phone fields are optional.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.is_empty() || PHONE_RE.is_match(phone)
}

pub fn is_valid_id_card(id_card: &str) -> bool {
    id_card.is_empty() || ID_CARD_RE.is_match(id_card)
}

pub fn registration(username: &str, password: &str, confirm_password: &str) -> AppResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username dan password harus diisi!"));
    }
    if password != confirm_password {
        return Err(AppError::validation(
            "Password dan konfirmasi password tidak cocok!",
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password harus minimal 6 karakter!"));
    }
    Ok(())
}

/// Checks fields in form order and returns the parsed priority.
pub fn new_patient(req: &NewPatientReq) -> AppResult<Priority> {
    if req.patient_name.is_empty() {
        return Err(AppError::validation("Nama pasien harus diisi!"));
    }
    if req.patient_name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation("Nama pasien maksimal 100 karakter!"));
    }
    let phones = [
        (&req.phone_number, "Nomor telepon tidak valid! Harus berupa 10-13 digit."),
        (
            &req.emergency_phone_number,
            "Nomor telepon darurat tidak valid! Harus berupa 10-13 digit.",
        ),
        (
            &req.room_responsible_phone,
            "Nomor penanggung jawab ruangan tidak valid! Harus berupa 10-13 digit.",
        ),
        (&req.doctor_phone, "Nomor telepon dokter tidak valid! Harus berupa 10-13 digit."),
    ];
    for (phone, msg) in phones {
        if !is_valid_phone(phone) {
            return Err(AppError::validation(msg));
        }
    }
    if !is_valid_id_card(&req.id_card_number) {
        return Err(AppError::validation("Nomor KTP tidak valid! Harus berupa 16 digit."));
    }
    priority(&req.priority)
}

pub fn priority(raw: &str) -> AppResult<Priority> {
    Priority::parse_field(raw)
        .ok_or_else(|| AppError::validation("Prioritas harus bernilai 0, 1, atau 2!"))
}

pub fn hospital(address: &str, phone_number: &str) -> AppResult<()> {
    if address.is_empty() {
        return Err(AppError::validation("Alamat rumah sakit harus diisi!"));
    }
    if !is_valid_phone(phone_number) {
        return Err(AppError::validation(
            "Nomor telepon rumah sakit tidak valid! Harus berupa 10-13 digit.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_pattern() {
        assert!(is_valid_phone(""));
        assert!(is_valid_phone("08123456789"));
        assert!(is_valid_phone("+6281234567890"));
        assert!(!is_valid_phone("0812345"));
        assert!(!is_valid_phone("08123456789012345"));
        assert!(!is_valid_phone("0812-3456-789"));
    }

    #[test]
    fn id_card_pattern() {
        assert!(is_valid_id_card(""));
        assert!(is_valid_id_card("3171234567890001"));
        assert!(!is_valid_id_card("317123456789000"));
        assert!(!is_valid_id_card("31712345678900012"));
    }

    #[test]
    fn registration_rules() {
        assert!(registration("nurse1", "secret1", "secret1").is_ok());
        assert!(matches!(registration("", "secret1", "secret1"), Err(AppError::Validation(_))));
        assert!(matches!(registration("n", "secret1", "secret2"), Err(AppError::Validation(_))));
        assert!(matches!(registration("n", "abc", "abc"), Err(AppError::Validation(_))));
    }

    #[test]
    fn new_patient_reports_first_bad_field() {
        let req = NewPatientReq {
            patient_name: "Budi".into(),
            phone_number: "08123456789".into(),
            doctor_phone: "12".into(),
            id_card_number: "1".into(),
            ..Default::default()
        };
        match new_patient(&req) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("dokter")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn new_patient_caps_name_length() {
        let mut req = NewPatientReq {
            patient_name: "a".repeat(MAX_NAME_LEN),
            ..Default::default()
        };
        assert!(new_patient(&req).is_ok());
        req.patient_name.push('a');
        match new_patient(&req) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("maksimal")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn new_patient_requires_name() {
        let req = NewPatientReq::default();
        assert!(matches!(new_patient(&req), Err(AppError::Validation(_))));
    }
}
