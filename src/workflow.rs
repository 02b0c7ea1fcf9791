//! Submission workflow for one form
//!
//! Each submit runs `Idle -> Validating -> Submitting -> Idle`. A form that
//! fails validation goes straight back to `Idle` without touching the mail
//! service. Input and blur events re-validate the affected field after the
//! debounce delay.

use crate::debounce::Debouncer;
use crate::form::{Form, SubmitControl};
use crate::notify::{Notice, Notifier};
use crate::submitter::{Destination, SubmissionError, SubmissionOutcome, Submitter};
use crate::validation::Validator;
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Validating,
    Submitting,
}

pub struct SubmissionWorkflow {
    form: Arc<Mutex<Form>>,
    control: SubmitControl,
    validator: Arc<Validator>,
    submitter: Arc<Submitter>,
    notifier: Arc<dyn Notifier>,
    destination: Destination,
    debouncer: Debouncer,
    state: WorkflowState,
}

fn lock(form: &Mutex<Form>) -> MutexGuard<'_, Form> {
    form.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SubmissionWorkflow {
    pub fn new(
        form: Form,
        validator: Arc<Validator>,
        submitter: Arc<Submitter>,
        notifier: Arc<dyn Notifier>,
        destination: Destination,
        debounce: Duration,
    ) -> Self {
        let control = SubmitControl::for_form(form.kind());
        Self {
            form: Arc::new(Mutex::new(form)),
            control,
            validator,
            submitter,
            notifier,
            destination,
            debouncer: Debouncer::new(debounce),
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn control(&self) -> &SubmitControl {
        &self.control
    }

    pub fn form(&self) -> Arc<Mutex<Form>> {
        Arc::clone(&self.form)
    }

    /// Run `f` against the form while holding its lock
    pub fn with_form<R>(&self, f: impl FnOnce(&mut Form) -> R) -> R {
        f(&mut lock(&self.form))
    }

    /// Schedule a debounced validation of one field after an input event
    pub fn on_input(&self, field_id: &str) {
        let form = Arc::clone(&self.form);
        let validator = Arc::clone(&self.validator);
        let field_id = field_id.to_string();
        self.debouncer.schedule(async move {
            let mut form = lock(&form);
            match form.field_mut(&field_id) {
                Some(field) => {
                    validator.validate_field(field);
                }
                None => debug!("Ignoring input event for unknown field '{}'", field_id),
            }
        });
    }

    /// Blur events are handled like input events
    pub fn on_blur(&self, field_id: &str) {
        self.on_input(field_id);
    }

    /// Wait for a scheduled field validation to run
    pub async fn settle(&self) {
        self.debouncer.settle().await;
    }

    pub async fn submit(&mut self) -> SubmissionOutcome {
        self.debouncer.cancel();
        // Back to Idle however this ends, including when the future is dropped
        let mut state = scopeguard::guard(&mut self.state, |state| *state = WorkflowState::Idle);
        **state = WorkflowState::Validating;

        let (kind, payload) = {
            let mut form = lock(&self.form);
            let report = self.validator.validate_form(&mut form);
            if !report.is_valid() {
                let err = SubmissionError::Validation(report.issues);
                info!("{} form rejected: {}", form.kind(), err);
                drop(form);
                let message = err.user_message();
                self.notifier.notify(Notice::Error(message.clone()));
                return SubmissionOutcome::Failure(message);
            }
            (form.kind(), form.collect_payload())
        };

        **state = WorkflowState::Submitting;
        let outcome = self
            .submitter
            .submit(&mut self.control, &self.destination, &payload, kind.success_message())
            .await;

        match &outcome {
            SubmissionOutcome::Success(message) => {
                lock(&self.form).reset();
                self.notifier.notify(Notice::Info(message.clone()));
            }
            SubmissionOutcome::Failure(reason) => {
                self.notifier.notify(Notice::Error(reason.clone()));
            }
        }
        outcome
    }
}
