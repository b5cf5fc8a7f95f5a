//! Constants used throughout the DEQM console core crate.
//!
//! Operation paths, fixed query values and configuration defaults live here so the
//! assemblers, the client and the binaries agree on them.

/// Default FHIR base URL of a locally running DEQM test server.
pub const DEFAULT_SERVER_BASE: &str = "http://localhost:3000/4_0_1";

/// Environment variable naming the FHIR server base URL.
pub const SERVER_URL_ENV: &str = "DEQM_SERVER_URL";

/// Path of the gaps-in-care operation, relative to the server base.
pub const CARE_GAPS_PATH: &str = "/Measure/$care-gaps";

/// Name of the instance-level evaluate-measure operation.
pub const EVALUATE_MEASURE_OPERATION: &str = "$evaluate-measure";

/// Status filter sent with every care-gaps request.
pub const OPEN_GAP_STATUS: &str = "open-gap";

/// Media type for FHIR JSON payloads.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Statuses treated as success by the measure operations.
pub const MEASURE_SUCCESS_STATUSES: &[u16] = &[200, 201];

/// Statuses treated as success by resource reads and writes.
pub const RESOURCE_SUCCESS_STATUSES: &[u16] = &[200, 201];

/// Statuses treated as success by resource deletes.
pub const DELETE_SUCCESS_STATUSES: &[u16] = &[200, 202, 204];

/// Date format for period parameters.
pub const PERIOD_DATE_FORMAT: &str = "%Y-%m-%d";
