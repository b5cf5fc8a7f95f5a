//! Subject/Organization selection for the gaps-in-care form.
//!
//! Exactly one [`SelectionMode`] is active. The mode decides which identifier fields can be
//! edited and which of them must be filled before a request may be sent. Switching mode never
//! clears a field; disabled values are kept and simply ignored.

use serde::{Deserialize, Serialize};

/// Which population a care-gaps request targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    /// A single patient.
    #[default]
    Subject,
    /// An organization, optionally narrowed to one practitioner.
    Organization,
}

impl SelectionMode {
    /// Pick the initial mode from references that arrived with the page.
    ///
    /// Organization or practitioner references win over a patient reference; with none of
    /// them present the form starts in subject mode.
    pub fn seed(
        patient: Option<&str>,
        organization: Option<&str>,
        practitioner: Option<&str>,
    ) -> Self {
        let present = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());

        if present(organization) || present(practitioner) {
            SelectionMode::Organization
        } else if present(patient) {
            SelectionMode::Subject
        } else {
            SelectionMode::default()
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMode::Subject => "subject",
            SelectionMode::Organization => "organization",
        }
    }
}

impl std::str::FromStr for SelectionMode {
    type Err = crate::ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject" | "patient" => Ok(SelectionMode::Subject),
            "organization" | "organisation" => Ok(SelectionMode::Organization),
            other => Err(crate::ConsoleError::InvalidInput(format!(
                "unknown selection mode: {other}"
            ))),
        }
    }
}

/// Editability of a single form field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub enabled: bool,
    pub required: bool,
}

impl FieldState {
    pub const DISABLED: FieldState = FieldState {
        enabled: false,
        required: false,
    };
    pub const OPTIONAL: FieldState = FieldState {
        enabled: true,
        required: false,
    };
    pub const REQUIRED: FieldState = FieldState {
        enabled: true,
        required: true,
    };
}

/// Field states for every identifier input of the care-gaps form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProjection {
    pub patient: FieldState,
    pub organization: FieldState,
    pub practitioner: FieldState,
    pub program: FieldState,
}

impl FieldProjection {
    /// Project a mode onto the identifier fields.
    ///
    /// | mode         | patient  | organization | practitioner | program  |
    /// |--------------|----------|--------------|--------------|----------|
    /// | Subject      | required | disabled     | disabled     | optional |
    /// | Organization | disabled | required     | optional     | optional |
    pub fn for_mode(mode: SelectionMode) -> Self {
        match mode {
            SelectionMode::Subject => Self {
                patient: FieldState::REQUIRED,
                organization: FieldState::DISABLED,
                practitioner: FieldState::DISABLED,
                program: FieldState::OPTIONAL,
            },
            SelectionMode::Organization => Self {
                patient: FieldState::DISABLED,
                organization: FieldState::REQUIRED,
                practitioner: FieldState::OPTIONAL,
                program: FieldState::OPTIONAL,
            },
        }
    }
}
