//! Async runtime pieces for the attendance tools.
//!
//! Drives bulk account imports: the account-creation seam, retry
//! strategies, and the paced import runner that reports progress over a
//! channel.

pub mod accounts;
pub mod importer;
pub mod retry;

pub use attendance_core as core;
pub use attendance_data as data;
