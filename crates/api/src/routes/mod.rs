//! Route handlers

pub mod alerts;
pub mod source;
pub mod status;
