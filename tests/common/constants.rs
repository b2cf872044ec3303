//! Shared constants for end-to-end tests
//!
//! When the fixture catalogs change, update only this file.

/// `<DESCRIPTION>` of every VOTable the test server emits.
pub const TEST_SERVICE_DESCRIPTION: &str = "Test Cone Search";

// ============================================================================
// Catalog IDs
// ============================================================================

/// Catalog with full column metadata and named query parameters.
pub const STARS_CATALOG: &str = "stars";

/// Catalog without column metadata, using positional parameters.
pub const RAW_CATALOG: &str = "raw";

/// Catalog whose query references a table missing from the database.
pub const BROKEN_CATALOG: &str = "broken";

/// Maximum radius configured for every fixture catalog.
pub const CATALOG_MAX_RADIUS: f64 = 1.0;

// ============================================================================
// Sky positions
// ============================================================================

/// Center of the fixture cluster: three stars lie within 0.5 degrees.
pub const CLUSTER_RA: &str = "10";
pub const CLUSTER_DEC: &str = "20";
pub const CLUSTER_SIZE: usize = 3;

/// Names of the stars around the cluster center.
pub const CLUSTER_STARS: [&str; 3] = ["alpha", "beta", "gamma"];

/// An empty patch of sky.
pub const EMPTY_RA: &str = "100";
pub const EMPTY_DEC: &str = "-60";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for individual HTTP requests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
