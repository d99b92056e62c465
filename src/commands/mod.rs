//! Command implementations for the lineup optimizer CLI

pub mod common;
pub mod late_swap;
pub mod optimize;
