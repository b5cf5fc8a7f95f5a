//! Evaluate-measure request builder.
//!
//! Individual reports target one subject and require it; summary reports cover the whole
//! population and may be narrowed to a practitioner. Like the care-gaps form, switching report
//! type keeps the stored references and only changes which of them are sent.

use crate::client::{validate_resource_id, FhirClient, FhirTransport};
use crate::constants::EVALUATE_MEASURE_OPERATION;
use crate::form::default_period;
use crate::invocation::{MeasureController, MeasureRequest};
use crate::query::{encode_path_segment, format_date, QueryString};
use crate::selection::FieldState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    #[default]
    Individual,
    Summary,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Individual => "individual",
            ReportType::Summary => "summary",
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = crate::ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" | "subject" => Ok(ReportType::Individual),
            "summary" | "population" => Ok(ReportType::Summary),
            other => Err(crate::ConsoleError::InvalidInput(format!(
                "unknown report type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFields {
    pub subject: FieldState,
    pub practitioner: FieldState,
}

impl ReportFields {
    pub fn for_report_type(report_type: ReportType) -> Self {
        match report_type {
            ReportType::Individual => Self {
                subject: FieldState::REQUIRED,
                practitioner: FieldState::DISABLED,
            },
            ReportType::Summary => Self {
                subject: FieldState::DISABLED,
                practitioner: FieldState::OPTIONAL,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateMeasureForm {
    #[serde(default)]
    pub measure_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub subject_ref: String,
    #[serde(default)]
    pub practitioner_ref: String,
}

impl EvaluateMeasureForm {
    pub fn new(measure_id: impl Into<String>, today: NaiveDate) -> Self {
        let (period_start, period_end) = default_period(today);
        Self {
            measure_id: measure_id.into().trim().to_string(),
            period_start,
            period_end,
            report_type: ReportType::default(),
            subject_ref: String::new(),
            practitioner_ref: String::new(),
        }
    }

    pub fn fields(&self) -> ReportFields {
        ReportFields::for_report_type(self.report_type)
    }

    pub fn apply_measure_period(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        if let Some(start) = start {
            self.period_start = start;
        }
        if let Some(end) = end {
            self.period_end = end;
        }
    }
}

impl MeasureRequest for EvaluateMeasureForm {
    const OPERATION: &'static str = "Evaluate measure";

    fn valid_selection(&self) -> bool {
        if validate_resource_id(self.measure_id.trim()).is_err() {
            return false;
        }
        match self.report_type {
            ReportType::Individual => !self.subject_ref.trim().is_empty(),
            ReportType::Summary => true,
        }
    }

    /// `/Measure/<id>/$evaluate-measure?periodStart=..&periodEnd=..&reportType=..` followed by
    /// `subject` (individual) or `practitioner` (summary) when filled in.
    fn request_path(&self) -> String {
        let subject = self.subject_ref.trim();
        let practitioner = self.practitioner_ref.trim();

        QueryString::new(&format!(
            "/Measure/{}/{}",
            encode_path_segment(self.measure_id.trim()),
            EVALUATE_MEASURE_OPERATION
        ))
        .param("periodStart", &format_date(self.period_start))
        .param("periodEnd", &format_date(self.period_end))
        .param("reportType", self.report_type.as_str())
        .param_if(
            self.report_type == ReportType::Individual && !subject.is_empty(),
            "subject",
            subject,
        )
        .param_if(
            self.report_type == ReportType::Summary && !practitioner.is_empty(),
            "practitioner",
            practitioner,
        )
        .finish()
    }
}

pub type EvaluateMeasureController<T> = MeasureController<EvaluateMeasureForm, T>;

/// Initial evaluate-measure form with the Measure's effective period when it can be read.
pub async fn seed_evaluate_form<T: FhirTransport>(
    client: &FhirClient<T>,
    measure_id: &str,
    subject: Option<&str>,
    today: NaiveDate,
) -> EvaluateMeasureForm {
    let mut form = EvaluateMeasureForm::new(measure_id, today);
    if let Some(subject) = subject {
        form.subject_ref = subject.trim().to_string();
    }
    match client.measure_period(measure_id).await {
        Ok((start, end)) => form.apply_measure_period(start, end),
        Err(e) => tracing::warn!("could not load period for Measure/{}: {}", measure_id, e),
    }
    form
}
