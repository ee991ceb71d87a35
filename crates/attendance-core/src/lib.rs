//! Core types for the attendance tools.
//!
//! Data model, error taxonomy, academic rules, percentage maths, time and
//! formatting helpers, and CLI settings shared by every other crate.

pub mod academic;
pub mod calculations;
pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
