// crates/ecfr-dashboard-config/src/lib.rs
// ============================================================================
// Module: eCFR Dashboard Config Library
// Description: Config model, validation, and canonical example.
// Purpose: Single source of truth for ecfr-dashboard.toml semantics.
// Dependencies: ecfr-dashboard-store-sqlite, ecfr-dashboard-store-postgres, serde, toml
// ============================================================================

//! ## Overview
//! `ecfr-dashboard-config` defines the configuration model for the dashboard
//! server and CLI. Validation is strict and fail-closed; the store sections
//! convert directly into the backend crates' connection settings.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
