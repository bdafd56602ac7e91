//! Names of the hosted database functions SiteHub calls.

/// Allocates the next `VAR-nnn` number for a project.
pub const GENERATE_VARIATION_NUMBER: &str = "generate_variation_number";

/// Suggests a reason category for a variation description.
pub const SUGGEST_VARIATION_REASON: &str = "suggest_variation_reason";

/// Audit append function for a table.
pub fn audit_log_function(table: &str) -> String {
    format!("log_{}_change", singular(table))
}

/// Audit trail read function for a table.
pub fn audit_trail_function(table: &str) -> String {
    format!("get_{}_audit_trail", singular(table))
}

fn singular(table: &str) -> &str {
    match table {
        "qa_inspections" => "inspection",
        other => other.strip_suffix('s').unwrap_or(other),
    }
}
