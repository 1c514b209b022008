pub mod auth_service;
pub mod event_stream;
pub mod hospital_service;
pub mod patient_service;
pub mod registration_service;
pub mod report_service;
