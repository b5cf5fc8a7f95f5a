//! Request path assembly for the measure operations.
//!
//! The assemblers are pure: the same form always yields the same string, and the string is
//! used verbatim both as the on-screen preview and as the request path.

use crate::constants::{CARE_GAPS_PATH, OPEN_GAP_STATUS, PERIOD_DATE_FORMAT};
use crate::form::FormState;
use crate::selection::SelectionMode;
use chrono::NaiveDate;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that would end or split a query value. `/` stays literal so `Type/id`
/// references read as they are typed.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?');

/// Query value characters plus `/`, for ids placed in a path segment.
const PATH_SEGMENT: &AsciiSet = &QUERY_VALUE.add(b'/');

pub(crate) fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Format a period bound as `YYYY-MM-DD` from its calendar value.
pub fn format_date(date: NaiveDate) -> String {
    date.format(PERIOD_DATE_FORMAT).to_string()
}

/// Ordered query string builder; parameters are emitted in the order they are added and
/// every value is percent-encoded with [`QUERY_VALUE`].
#[derive(Debug)]
pub(crate) struct QueryString {
    buf: String,
    has_params: bool,
}

impl QueryString {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            buf: path.to_string(),
            has_params: false,
        }
    }

    pub(crate) fn param(mut self, name: &str, value: &str) -> Self {
        self.buf.push(if self.has_params { '&' } else { '?' });
        self.buf.push_str(name);
        self.buf.push('=');
        self.buf.extend(utf8_percent_encode(value, QUERY_VALUE));
        self.has_params = true;
        self
    }

    pub(crate) fn param_if(self, emit: bool, name: &str, value: &str) -> Self {
        if emit {
            self.param(name, value)
        } else {
            self
        }
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

/// Build the `$care-gaps` request path for `form`.
///
/// Order: `measureId`, `periodStart`, `periodEnd`, `status`, then `subject` (subject mode) or
/// `organization` and `practitioner` (organization mode), then `program`. Empty values are
/// skipped, except `measureId` which is always present.
pub fn assemble_care_gaps(form: &FormState) -> String {
    let measure_id = form.measure_id().trim();
    let patient = form.patient_ref().trim();
    let organization = form.organization_ref().trim();
    let practitioner = form.practitioner_ref().trim();
    let program = form.program().trim();
    let organization_mode = form.mode() == SelectionMode::Organization;

    QueryString::new(CARE_GAPS_PATH)
        .param("measureId", measure_id)
        .param("periodStart", &format_date(form.period_start()))
        .param("periodEnd", &format_date(form.period_end()))
        .param("status", OPEN_GAP_STATUS)
        .param_if(
            form.mode() == SelectionMode::Subject && !patient.is_empty(),
            "subject",
            patient,
        )
        .param_if(
            organization_mode && !organization.is_empty(),
            "organization",
            organization,
        )
        .param_if(
            organization_mode && !practitioner.is_empty(),
            "practitioner",
            practitioner,
        )
        .param_if(!program.is_empty(), "program", program)
        .finish()
}
