//! Shared, version-pinned identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable I/O and in the rendered upgrade report.

pub const CHECK_NAME: &str = "CRD Upgrade Safety";

pub const CRD_API_VERSION: &str = "apiextensions.k8s.io/v1";
pub const CRD_KIND: &str = "CustomResourceDefinition";

pub const CHECK_REPORT_SCHEMA_VERSION: &str = "crdgate.check.report@0.1.0";
pub const RECORDED_RESULTS_SCHEMA_VERSION: &str = "crdgate.recorded-results@0.1.0";
