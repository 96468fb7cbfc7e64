// crates/ecfr-dashboard-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The example parses and validates against the current model; a test keeps
//! the two in sync.

/// Returns a canonical example `ecfr-dashboard.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:3000"
dashboard = true
expose_error_detail = false
allow_non_loopback = false

[server.audit]
enabled = true
# path = "ecfr-dashboard-audit.jsonl"

[store]
type = "sqlite"
path = "ecfr_analysis.db"
busy_timeout_ms = 5000

# [store]
# type = "postgres"
# connection = "postgres://ecfr@localhost/ecfr"  # or ECFR_DASHBOARD_DATABASE_URL
# max_connections = 16
# connect_timeout_ms = 5000
# statement_timeout_ms = 30000
"#,
    )
}
