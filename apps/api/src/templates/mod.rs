// Template gallery: static catalog plus read-only handlers.

pub mod catalog;
pub mod handlers;
