//! Gaps-in-care form state.
//!
//! A [`FormState`] is created once per session, seeded from the inbound references and the
//! Measure's effective period, and then only changed through its setters. Everything a caller
//! displays (field projection, validity, request preview) is derived from it on demand.

use crate::query;
use crate::selection::{FieldProjection, SelectionMode};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// January 1 and December 31 of the year `today` falls in.
pub fn default_period(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let year = today.year();
    // Both dates exist in every year chrono can represent.
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today);
    (start, end)
}

/// References that may arrive pre-filled with the page (`?patient=..&organization=..`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReferences {
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub practitioner: Option<String>,
}

/// Input state of the gaps-in-care form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(default)]
    measure_id: String,
    period_start: NaiveDate,
    period_end: NaiveDate,
    #[serde(default)]
    mode: SelectionMode,
    #[serde(default)]
    patient_ref: String,
    #[serde(default)]
    organization_ref: String,
    #[serde(default)]
    practitioner_ref: String,
    #[serde(default)]
    program: String,
}

fn clean(value: impl Into<String>) -> String {
    value.into().trim().to_string()
}

impl FormState {
    /// Blank form for `measure_id` with the default period of `today`'s year.
    pub fn new(measure_id: impl Into<String>, today: NaiveDate) -> Self {
        let (period_start, period_end) = default_period(today);
        Self {
            measure_id: clean(measure_id),
            period_start,
            period_end,
            mode: SelectionMode::default(),
            patient_ref: String::new(),
            organization_ref: String::new(),
            practitioner_ref: String::new(),
            program: String::new(),
        }
    }

    /// Form seeded from the references that arrived with the page.
    pub fn seeded(measure_id: impl Into<String>, seed: &SeedReferences, today: NaiveDate) -> Self {
        let mut state = Self::new(measure_id, today);
        state.mode = SelectionMode::seed(
            seed.patient.as_deref(),
            seed.organization.as_deref(),
            seed.practitioner.as_deref(),
        );
        if let Some(patient) = &seed.patient {
            state.patient_ref = clean(patient.as_str());
        }
        if let Some(organization) = &seed.organization {
            state.organization_ref = clean(organization.as_str());
        }
        if let Some(practitioner) = &seed.practitioner {
            state.practitioner_ref = clean(practitioner.as_str());
        }
        state
    }

    /// Overwrite the period with the Measure's effective period, bound by bound.
    ///
    /// Missing bounds keep their current value.
    pub fn apply_measure_period(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        if let Some(start) = start {
            self.period_start = start;
        }
        if let Some(end) = end {
            self.period_end = end;
        }
    }

    pub fn measure_id(&self) -> &str {
        &self.measure_id
    }

    pub fn period_start(&self) -> NaiveDate {
        self.period_start
    }

    pub fn period_end(&self) -> NaiveDate {
        self.period_end
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn patient_ref(&self) -> &str {
        &self.patient_ref
    }

    pub fn organization_ref(&self) -> &str {
        &self.organization_ref
    }

    pub fn practitioner_ref(&self) -> &str {
        &self.practitioner_ref
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn set_period_start(&mut self, date: NaiveDate) {
        self.period_start = date;
    }

    pub fn set_period_end(&mut self, date: NaiveDate) {
        self.period_end = date;
    }

    /// Switch mode. Stored identifiers are kept as they are.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    pub fn set_patient_ref(&mut self, value: impl Into<String>) {
        self.patient_ref = clean(value);
    }

    pub fn set_organization_ref(&mut self, value: impl Into<String>) {
        self.organization_ref = clean(value);
    }

    pub fn set_practitioner_ref(&mut self, value: impl Into<String>) {
        self.practitioner_ref = clean(value);
    }

    pub fn set_program(&mut self, value: impl Into<String>) {
        self.program = clean(value);
    }

    pub fn projection(&self) -> FieldProjection {
        FieldProjection::for_mode(self.mode)
    }

    /// Whether the identifier required by the current mode is filled in.
    pub fn valid_selection(&self) -> bool {
        match self.mode {
            SelectionMode::Subject => !self.patient_ref.trim().is_empty(),
            SelectionMode::Organization => !self.organization_ref.trim().is_empty(),
        }
    }

    /// Request path this form would send.
    pub fn preview(&self) -> String {
        query::assemble_care_gaps(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_period_covers_calendar_year() {
        let (start, end) = default_period(date(2026, 10, 19));
        assert_eq!(start, date(2026, 1, 1));
        assert_eq!(end, date(2026, 12, 31));
    }

    #[test]
    fn default_period_on_new_years_eve() {
        let (start, end) = default_period(date(2025, 12, 31));
        assert_eq!(start, date(2025, 1, 1));
        assert_eq!(end, date(2025, 12, 31));
    }

    #[test]
    fn seeding_prefills_references_and_mode() {
        let seed = SeedReferences {
            patient: None,
            organization: Some("Organization/O1".into()),
            practitioner: Some(" Practitioner/Pr1 ".into()),
        };
        let form = FormState::seeded("M1", &seed, date(2026, 3, 1));
        assert_eq!(form.mode(), SelectionMode::Organization);
        assert_eq!(form.organization_ref(), "Organization/O1");
        assert_eq!(form.practitioner_ref(), "Practitioner/Pr1");
        assert!(form.valid_selection());
    }

    #[test]
    fn measure_period_overwrites_present_bounds_only() {
        let mut form = FormState::new("M1", date(2026, 6, 1));
        form.apply_measure_period(Some(date(2019, 1, 1)), None);
        assert_eq!(form.period_start(), date(2019, 1, 1));
        assert_eq!(form.period_end(), date(2026, 12, 31));

        form.apply_measure_period(None, Some(date(2019, 12, 31)));
        assert_eq!(form.period_end(), date(2019, 12, 31));
    }

    #[test]
    fn toggling_mode_keeps_stored_values() {
        let mut form = FormState::new("M1", date(2026, 1, 1));
        form.set_patient_ref("Patient/P1");
        form.set_mode(SelectionMode::Organization);
        assert_eq!(form.patient_ref(), "Patient/P1");
        assert!(!form.valid_selection());

        form.set_mode(SelectionMode::Subject);
        assert!(form.valid_selection());
    }

    #[test]
    fn valid_selection_for_every_combination() {
        for mode in [SelectionMode::Subject, SelectionMode::Organization] {
            for patient in ["", "Patient/P1"] {
                for organization in ["", "Organization/O1"] {
                    for practitioner in ["", "Practitioner/Pr1"] {
                        let mut form = FormState::new("M1", date(2026, 1, 1));
                        form.set_mode(mode);
                        form.set_patient_ref(patient);
                        form.set_organization_ref(organization);
                        form.set_practitioner_ref(practitioner);

                        let expected = match mode {
                            SelectionMode::Subject => !patient.is_empty(),
                            SelectionMode::Organization => !organization.is_empty(),
                        };
                        assert_eq!(
                            form.valid_selection(),
                            expected,
                            "mode={mode:?} patient={patient:?} org={organization:?} pr={practitioner:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn whitespace_only_reference_is_empty() {
        let mut form = FormState::new("M1", date(2026, 1, 1));
        form.set_patient_ref("   ");
        assert_eq!(form.patient_ref(), "");
        assert!(!form.valid_selection());
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let json = r#"{
            "measureId": "M1",
            "periodStart": "2018-02-02",
            "periodEnd": "2020-11-13",
            "mode": "organization",
            "organizationRef": "Organization/O1"
        }"#;
        let form: FormState = serde_json::from_str(json).expect("valid form");
        assert_eq!(form.mode(), SelectionMode::Organization);
        assert_eq!(form.patient_ref(), "");
        assert_eq!(form.period_start(), date(2018, 2, 2));
        assert!(form.valid_selection());
    }
}
