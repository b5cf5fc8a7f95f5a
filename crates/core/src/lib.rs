//! # DEQM Core
//!
//! Request construction and result handling for the DEQM test server console.
//!
//! This crate contains the console's logic, independent of how it is presented:
//! - the gaps-in-care and evaluate-measure forms, their field projections and request paths
//! - the Calculate lifecycle and the projection of responses onto display state
//! - resource CRUD, type listing and transaction upload against a FHIR server
//!
//! **No presentation concerns**: argument parsing and HTTP endpoints belong in `deqm-cli` and
//! `api-rest`.

pub mod care_gaps;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluate_measure;
pub mod form;
pub mod invocation;
pub mod outcome;
pub mod query;
pub mod selection;

pub use care_gaps::{seed_form, CareGapsController};
pub use client::{
    FhirClient, FhirRequest, FhirResponse, FhirTransport, HttpTransport, Method, ResourceSummary,
};
pub use config::CoreConfig;
pub use error::{ConsoleError, ConsoleResult};
pub use evaluate_measure::{
    seed_evaluate_form, EvaluateMeasureController, EvaluateMeasureForm, ReportFields, ReportType,
};
pub use form::{FormState, SeedReferences};
pub use invocation::{MeasureController, MeasureRequest};
pub use outcome::{Display, InvocationResult, Notification, NotificationKind};
pub use selection::{FieldProjection, FieldState, SelectionMode};
