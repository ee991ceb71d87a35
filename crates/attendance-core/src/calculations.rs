use serde::{Deserialize, Serialize};

use crate::models::{AttendanceSession, AttendanceStats};

/// Anything from which an attended/total ratio can be read.
pub trait Tally {
    /// Present plus late.
    fn attended(&self) -> u32;
    /// Denominator of the ratio.
    fn total(&self) -> u32;

    /// Rounded attendance percentage; 0 when [`Tally::total`] is 0.
    fn percentage(&self) -> u32 {
        ratio_percentage(u64::from(self.attended()), u64::from(self.total()))
    }
}

impl Tally for AttendanceStats {
    fn attended(&self) -> u32 {
        self.present_sessions + self.late_sessions
    }

    fn total(&self) -> u32 {
        self.total_sessions
    }
}

impl Tally for AttendanceSession {
    fn attended(&self) -> u32 {
        self.attended_count()
    }

    fn total(&self) -> u32 {
        self.total_students()
    }
}

// ── Percentages ───────────────────────────────────────────────────────────────

/// `round(100 × numerator / denominator)`, rounding halves up.
///
/// Returns 0 when `denominator` is 0 so that empty inputs never yield NaN.
pub fn ratio_percentage(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((200 * numerator + denominator) / (2 * denominator)) as u32
}

/// Attendance percentage with late counted as attended.
pub fn attendance_percentage(present: u32, late: u32, total: u32) -> u32 {
    ratio_percentage(u64::from(present) + u64::from(late), u64::from(total))
}

/// Unweighted mean of `values`, rounded half up; 0 for an empty slice.
pub fn mean_percentage(values: &[u32]) -> u32 {
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    let n = values.len() as u64;
    if n == 0 {
        return 0;
    }
    ((2 * sum + n) / (2 * n)) as u32
}

/// Session-weighted attendance over `sessions`: attended student-slots over
/// all student-slots.
pub fn session_weighted_percentage<'a, I>(sessions: I) -> u32
where
    I: IntoIterator<Item = &'a AttendanceSession>,
{
    let (attended, slots) = sessions.into_iter().fold((0u64, 0u64), |(a, t), s| {
        (a + u64::from(s.attended()), t + u64::from(s.total()))
    });
    ratio_percentage(attended, slots)
}

// ── Bands ─────────────────────────────────────────────────────────────────────

/// Qualitative band for an attendance percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    Excellent,
    Good,
    Average,
    Poor,
    Critical,
}

impl AttendanceBand {
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => AttendanceBand::Excellent,
            80..=89 => AttendanceBand::Good,
            70..=79 => AttendanceBand::Average,
            60..=69 => AttendanceBand::Poor,
            _ => AttendanceBand::Critical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttendanceBand::Excellent => "Excellent",
            AttendanceBand::Good => "Good",
            AttendanceBand::Average => "Average",
            AttendanceBand::Poor => "Poor",
            AttendanceBand::Critical => "Critical",
        }
    }
}

// ── Recovery ──────────────────────────────────────────────────────────────────

/// Number of consecutive attended sessions needed to lift `attended / total`
/// to at least `target` percent.
///
/// Returns `Some(0)` when the target is already met or there is no history,
/// and `None` when the target can never be reached (100% after an absence).
pub fn required_sessions(attended: u32, total: u32, target: u32) -> Option<u32> {
    if total == 0 {
        return Some(0);
    }
    let attended = u64::from(attended);
    let total = u64::from(total);
    let target = u64::from(target);

    if 100 * attended >= target * total {
        return Some(0);
    }
    if target >= 100 {
        return None;
    }

    // (attended + x) / (total + x) >= target / 100
    let numerator = target * total - 100 * attended;
    let denominator = 100 - target;
    Some(numerator.div_ceil(denominator) as u32)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
