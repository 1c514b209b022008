pub mod hospital;
pub mod nurse;
pub mod patient;
