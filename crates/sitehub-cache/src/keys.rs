//! Cache key builders for all SiteHub cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use uuid::Uuid;

/// Prefix applied to all SiteHub cache keys.
const PREFIX: &str = "sitehub";

/// Cache key for the rows of `table` within one scope.
pub fn scoped_rows(table: &str, scope_id: Uuid) -> String {
    format!("{PREFIX}:{table}:scope:{scope_id}")
}

/// Pattern matching every scope listing of `table`.
pub fn table_pattern(table: &str) -> String {
    format!("{PREFIX}:{table}:*")
}
