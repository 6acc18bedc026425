//! Domain utilities

pub mod json;
