//! Gaps-in-care request builder wiring.

use crate::client::{FhirClient, FhirTransport};
use crate::form::{FormState, SeedReferences};
use crate::invocation::{MeasureController, MeasureRequest};
use chrono::NaiveDate;

pub type CareGapsController<T> = MeasureController<FormState, T>;

impl MeasureRequest for FormState {
    const OPERATION: &'static str = "Gaps in care";

    fn valid_selection(&self) -> bool {
        FormState::valid_selection(self)
    }

    fn request_path(&self) -> String {
        self.preview()
    }
}

/// Build the initial form: inbound references first, then the Measure's effective period.
///
/// A failed Measure lookup is logged and leaves the default period in place.
pub async fn seed_form<T: FhirTransport>(
    client: &FhirClient<T>,
    measure_id: &str,
    seed: &SeedReferences,
    today: NaiveDate,
) -> FormState {
    let mut form = FormState::seeded(measure_id, seed, today);
    match client.measure_period(measure_id).await {
        Ok((start, end)) => form.apply_measure_period(start, end),
        Err(e) => tracing::warn!("could not load period for Measure/{}: {}", measure_id, e),
    }
    form
}
