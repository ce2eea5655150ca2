//! Reserved permission tokens, known groups and built-in roles

/// Grants every permission unconditionally
pub const UNIVERSAL: &str = "*";

/// Suffix marking a scoped wildcard (`prefix.*`)
pub const WILDCARD_SUFFIX: &str = ".*";

/// Path separator
pub const SEPARATOR: char = '.';

// Standard actions
pub const CREATE: &str = "create";
pub const READ: &str = "read";
pub const WRITE: &str = "write";

/// Actions every matrix row offers
pub const STANDARD_ACTIONS: &[&str] = &[CREATE, READ, WRITE];

/// Known groups in display order: (id, label).
/// Groups not listed here are still catalogued after these, sorted by id.
pub const KNOWN_GROUPS: &[(&str, &str)] = &[
    ("dashboard", "Dashboard"),
    ("patients", "Patients"),
    ("opd", "Outpatient (OPD)"),
    ("ipd", "Inpatient (IPD)"),
    ("clinical", "Clinical"),
    ("lab", "Laboratory"),
    ("radiology", "Radiology"),
    ("pharmacy", "Pharmacy"),
    ("billing", "Billing"),
    ("reports", "Reports"),
    ("settings", "Settings"),
];

/// Permissions that appear in no menu or module metadata but must be assignable
pub const EXTRA_PERMISSIONS: &[&str] = &[
    "settings.roles.read",
    "settings.roles.write",
    "settings.users.read",
    "settings.users.write",
    "reports.audit.read",
    "billing.refunds.write",
];

// Built-in system roles (bootstrap always creates these)
pub const SUPER_ADMIN_ROLE: &str = "super_admin";
pub const STAFF_ROLE: &str = "staff";

/// Look up the declared label of a known group
pub fn known_group_label(id: &str) -> Option<&'static str> {
    KNOWN_GROUPS.iter().find(|(g, _)| *g == id).map(|(_, l)| *l)
}

/// Position of a known group in display order
pub fn known_group_rank(id: &str) -> Option<usize> {
    KNOWN_GROUPS.iter().position(|(g, _)| *g == id)
}
