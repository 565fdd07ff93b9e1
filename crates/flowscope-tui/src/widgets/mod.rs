pub mod details;
pub mod status;
