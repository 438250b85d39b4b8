pub mod humanize;
pub mod logger;

pub use humanize::{format_duration, format_eta, format_file_size};
pub use logger::init_session_log;
