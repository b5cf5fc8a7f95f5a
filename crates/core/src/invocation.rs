//! Calculate-button lifecycle for the measure operations.
//!
//! A [`MeasureController`] owns one form and the result of its latest invocation. An
//! invocation is only started when the form's selection is valid and nothing is in flight;
//! its outcome replaces the previous result wholesale.

use crate::client::{FhirClient, FhirTransport};
use crate::outcome::{Display, InvocationResult};
use crate::ConsoleResult;
use serde_json::Value;

/// A form that can be turned into a measure operation request.
pub trait MeasureRequest {
    /// Name of the operation as shown to the user.
    const OPERATION: &'static str;

    /// Whether the inputs required for an invocation are present.
    fn valid_selection(&self) -> bool;

    /// Request path (relative to the server base) for the current inputs.
    fn request_path(&self) -> String;
}

pub struct MeasureController<F, T> {
    client: FhirClient<T>,
    form: F,
    result: InvocationResult,
}

impl<F: MeasureRequest, T: FhirTransport> MeasureController<F, T> {
    pub fn new(client: FhirClient<T>, form: F) -> Self {
        Self {
            client,
            form,
            result: InvocationResult::Idle,
        }
    }

    pub fn client(&self) -> &FhirClient<T> {
        &self.client
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    pub fn result(&self) -> &InvocationResult {
        &self.result
    }

    pub fn preview(&self) -> String {
        self.form.request_path()
    }

    /// Whether the Calculate control is enabled.
    pub fn can_calculate(&self) -> bool {
        self.form.valid_selection() && !self.result.is_loading()
    }

    /// Enter `Loading` and return the path to send, or `None` when Calculate is disabled.
    pub fn begin(&mut self) -> Option<String> {
        if !self.can_calculate() {
            return None;
        }
        self.result = InvocationResult::Loading;
        Some(self.form.request_path())
    }

    /// Record the outcome of the request started by [`begin`](Self::begin).
    pub fn complete(&mut self, outcome: ConsoleResult<Value>) -> Display {
        self.result = InvocationResult::from(outcome);
        match &self.result {
            InvocationResult::Success { .. } => {
                tracing::info!("{} succeeded", F::OPERATION)
            }
            InvocationResult::DomainError { status, detail, .. } => {
                tracing::warn!("{} rejected with {}: {}", F::OPERATION, status, detail)
            }
            InvocationResult::TransportError { message } => {
                tracing::warn!("{} failed: {}", F::OPERATION, message)
            }
            InvocationResult::Idle | InvocationResult::Loading => {}
        }
        self.result.display(F::OPERATION)
    }

    /// Run one Calculate action. Returns `None` without sending anything when disabled.
    pub async fn calculate(&mut self) -> Option<Display> {
        let path = self.begin()?;
        let outcome = self.client.invoke_measure_operation(&path).await;
        Some(self.complete(outcome))
    }
}
