//! User interface components for terminal output.
//!
//! - [`display`]: success and failure messages, template listings
//! - [`progress`]: file-count progress bar

pub mod display;
pub mod progress;

pub use display::{show_applied, show_created, show_error, show_info, show_templates, show_warning};
