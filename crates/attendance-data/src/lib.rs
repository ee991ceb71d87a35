//! Data layer for the attendance tools.
//!
//! Loads the on-disk snapshot of users, classes and sessions, aggregates
//! per-student statistics, builds the class/student/faculty/admin reports
//! and parses roster CSV files for bulk import.

pub mod access;
pub mod aggregator;
pub mod csv_import;
pub mod reader;
pub mod report;

pub use attendance_core as core;
