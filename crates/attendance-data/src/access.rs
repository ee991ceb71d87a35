//! Permission checks for report entry points.
//!
//! Admins may read everything. Faculty may read their own classes and their
//! own faculty report. Students may read only their own student report.

use attendance_core::error::{AttendanceError, Result};
use attendance_core::models::{Actor, Class, Role};

pub fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(denied(actor, "this report is restricted to administrators"))
    }
}

/// Admins, or the faculty member assigned to `class`.
pub fn ensure_class_access(actor: &Actor, class: &Class) -> Result<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Faculty if class.faculty_id == actor.id => Ok(()),
        _ => Err(denied(actor, &format!("class {} is not assigned to you", class.id))),
    }
}

/// Admins, or a `role` user reading their own report.
pub fn ensure_self_or_admin(actor: &Actor, role: Role, subject_id: &str) -> Result<()> {
    if actor.is_admin() || (actor.role == role && actor.id == subject_id) {
        Ok(())
    } else {
        Err(denied(
            actor,
            &format!("cannot view the {} report of {}", role, subject_id),
        ))
    }
}

/// Faculty whose data a cross-class query may cover.
///
/// Admins get whatever they asked for (`None` means everyone). Faculty are
/// pinned to themselves and may not ask about anyone else. Students are
/// refused.
pub fn faculty_scope(actor: &Actor, requested: Option<&str>) -> Result<Option<String>> {
    match actor.role {
        Role::Admin => Ok(requested.map(str::to_string)),
        Role::Faculty => match requested {
            None => Ok(Some(actor.id.clone())),
            Some(id) if id == actor.id => Ok(Some(actor.id.clone())),
            Some(id) => Err(denied(actor, &format!("cannot view data of faculty {id}"))),
        },
        Role::Student => Err(denied(actor, "students may only view their own report")),
    }
}

fn denied(actor: &Actor, reason: &str) -> AttendanceError {
    AttendanceError::PermissionDenied(format!("{} {}: {}", actor.role, actor.id, reason))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::models::ClassKind;

    fn class_for(faculty: &str) -> Class {
        Class {
            id: "c1".to_string(),
            name: "DSA".to_string(),
            code: String::new(),
            kind: ClassKind::Division("5".to_string()),
            subject: "DSA".to_string(),
            department: String::new(),
            year: String::new(),
            semester: String::new(),
            faculty_id: faculty.to_string(),
            faculty_name: String::new(),
            students: Vec::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_admin_only() {
        assert!(ensure_admin(&Actor::admin("a")).is_ok());
        let err = ensure_admin(&Actor::faculty("f")).unwrap_err();
        assert!(matches!(err, AttendanceError::PermissionDenied(_)));
    }

    #[test]
    fn test_class_access() {
        let class = class_for("f1");
        assert!(ensure_class_access(&Actor::admin("a"), &class).is_ok());
        assert!(ensure_class_access(&Actor::faculty("f1"), &class).is_ok());
        assert!(ensure_class_access(&Actor::faculty("f2"), &class).is_err());
        assert!(ensure_class_access(&Actor::student("f1"), &class).is_err());
    }

    #[test]
    fn test_self_or_admin() {
        assert!(ensure_self_or_admin(&Actor::student("s1"), Role::Student, "s1").is_ok());
        assert!(ensure_self_or_admin(&Actor::student("s1"), Role::Student, "s2").is_err());
        assert!(ensure_self_or_admin(&Actor::faculty("s1"), Role::Student, "s1").is_err());
        assert!(ensure_self_or_admin(&Actor::admin("a"), Role::Faculty, "f9").is_ok());
    }

    #[test]
    fn test_faculty_scope() {
        assert_eq!(faculty_scope(&Actor::admin("a"), None).unwrap(), None);
        assert_eq!(
            faculty_scope(&Actor::admin("a"), Some("f2")).unwrap(),
            Some("f2".to_string())
        );
        assert_eq!(
            faculty_scope(&Actor::faculty("f1"), None).unwrap(),
            Some("f1".to_string())
        );
        assert!(faculty_scope(&Actor::faculty("f1"), Some("f2")).is_err());
        assert!(faculty_scope(&Actor::student("s1"), None).is_err());
    }
}
