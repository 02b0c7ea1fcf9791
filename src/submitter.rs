//! Delivery of validated payloads to the mail service.
//
// A submission passes the session rate limiter, then is sent with a bounded
// number of retries. The submit control stays disabled for the whole
// attempt and is restored on every exit path.

use crate::form::{FormPayload, SubmitControl};
use crate::mail::{MailError, MailResponse, MailSender};
use crate::rate_limit::RateLimiter;
use crate::validation::ValidationIssue;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const SENDING_LABEL: &str = "Sending...";
pub const INVALID_FORM_MESSAGE: &str = "Please fill in all required fields correctly.";
pub const RATE_LIMITED_MESSAGE: &str = "Please wait a moment before submitting again.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "There was an error sending your request. Please try again later.";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "The mail service is currently unavailable. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success(String),
    Failure(String),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            SubmissionOutcome::Success(message) | SubmissionOutcome::Failure(message) => message,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{} field(s) failed validation", .0.len())]
    Validation(Vec<ValidationIssue>),
    #[error("Submitted too soon, {0:?} of cooldown left")]
    RateLimited(Duration),
    #[error("Mail delivery failed after {attempts} attempt(s): {source}")]
    Send {
        attempts: u32,
        #[source]
        source: MailError,
    },
    #[error("Mail service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl SubmissionError {
    /// Text suitable for the blocking notification
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Validation(_) => INVALID_FORM_MESSAGE.to_string(),
            SubmissionError::RateLimited(_) => RATE_LIMITED_MESSAGE.to_string(),
            SubmissionError::Send { source, .. } => {
                source.text.clone().unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
            }
            SubmissionError::ServiceUnavailable(_) => SERVICE_UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

/// Where a payload is delivered: the mail service plus one of its templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub service_id: String,
    pub template_id: String,
}

impl Destination {
    pub fn new(service_id: &str, template_id: &str) -> Self {
        Self { service_id: service_id.to_string(), template_id: template_id.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the given retry (1-based): base * 2^(retry - 1)
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

pub struct Submitter {
    sender: Option<Arc<dyn MailSender>>,
    unavailable_reason: String,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl Submitter {
    pub fn new(
        sender: Arc<dyn MailSender>,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
    ) -> Self {
        Self { sender: Some(sender), unavailable_reason: String::new(), limiter, policy }
    }

    /// A submitter whose mail client could not be set up. Every submission
    /// fails with [`SubmissionError::ServiceUnavailable`].
    pub fn unavailable(reason: impl Into<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            sender: None,
            unavailable_reason: reason.into(),
            limiter,
            policy: RetryPolicy::default(),
        }
    }

    /// Deliver a payload, honouring the cooldown and retry bound
    pub async fn deliver(
        &self,
        destination: &Destination,
        payload: &FormPayload,
    ) -> Result<MailResponse, SubmissionError> {
        self.limiter.try_acquire().map_err(SubmissionError::RateLimited)?;

        let sender = self.sender.as_ref().ok_or_else(|| {
            error!("Mail service unavailable: {}", self.unavailable_reason);
            SubmissionError::ServiceUnavailable(self.unavailable_reason.clone())
        })?;

        let submission_id = Uuid::new_v4();
        let max_attempts = self.policy.max_attempts();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.delay_before_retry(attempt - 1);
                debug!(
                    "[{}] Retrying in {:?} (attempt {}/{})",
                    submission_id, delay, attempt, max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            debug!(
                "[{}] Sending {} field(s) with template '{}'",
                submission_id,
                payload.len(),
                destination.template_id
            );
            match sender.send(&destination.service_id, &destination.template_id, payload).await {
                Ok(response) => {
                    info!("[{}] Delivered on attempt {}/{}", submission_id, attempt, max_attempts);
                    return Ok(response);
                }
                Err(e) => {
                    warn!("[{}] Attempt {}/{} failed: {}", submission_id, attempt, max_attempts, e);
                    last_error = Some(e);
                }
            }
        }

        Err(SubmissionError::Send {
            attempts: max_attempts,
            source: last_error.unwrap_or_else(|| MailError::new(None, None)),
        })
    }

    /// Deliver a payload while the submit control is disabled, and resolve
    /// to the outcome shown to the user
    pub async fn submit(
        &self,
        control: &mut SubmitControl,
        destination: &Destination,
        payload: &FormPayload,
        success_message: &str,
    ) -> SubmissionOutcome {
        let saved = control.begin(SENDING_LABEL);
        let _restore = scopeguard::guard(control, move |control| control.restore(saved));

        match self.deliver(destination, payload).await {
            Ok(_) => SubmissionOutcome::Success(success_message.to_string()),
            Err(e) => {
                error!("Submission failed: {}", e);
                SubmissionOutcome::Failure(e.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results, then succeeds
    struct ScriptedSender {
        script: Mutex<VecDeque<Result<MailResponse, MailError>>>,
        calls: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedSender {
        fn new(script: Vec<Result<MailResponse, MailError>>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(script.into()), calls: Mutex::new(Vec::new()) })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailSender for ScriptedSender {
        async fn send(
            &self,
            _service_id: &str,
            _template_id: &str,
            _payload: &FormPayload,
        ) -> Result<MailResponse, MailError> {
            self.calls.lock().unwrap().push(tokio::time::Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(MailResponse { status: 200, text: "OK".to_string() }))
        }
    }

    fn ok() -> Result<MailResponse, MailError> {
        Ok(MailResponse { status: 200, text: "OK".to_string() })
    }

    fn submitter(sender: Arc<ScriptedSender>) -> Submitter {
        Submitter::new(sender, Arc::new(RateLimiter::default()), RetryPolicy::default())
    }

    fn destination() -> Destination {
        Destination::new("service", "template")
    }

    #[test]
    fn test_retry_delays_grow_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_before_retry(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before_retry(3), Duration::from_secs(4));
    }

    #[test]
    fn test_max_attempts_saturates() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_attempts(), u32::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let sender = ScriptedSender::new(vec![
            Err(MailError::with_text("busy")),
            Err(MailError::with_text("still busy")),
            ok(),
        ]);
        let submitter = submitter(Arc::clone(&sender));

        let result = submitter.deliver(&destination(), &FormPayload::new()).await;
        assert!(result.is_ok());
        assert_eq!(sender.call_count(), 3);

        let calls = sender.calls.lock().unwrap().clone();
        assert_eq!(calls[1] - calls[0], Duration::from_secs(1));
        assert_eq!(calls[2] - calls[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error_text() {
        let sender = ScriptedSender::new(vec![
            Err(MailError::with_text("first")),
            Err(MailError::with_text("second")),
            Err(MailError::new(Some(400), Some("The service ID is invalid".to_string()))),
        ]);
        let submitter = submitter(Arc::clone(&sender));
        let mut control = SubmitControl::new("Book Now");

        let outcome =
            submitter.submit(&mut control, &destination(), &FormPayload::new(), "Sent!").await;
        assert_eq!(outcome, SubmissionOutcome::Failure("The service ID is invalid".to_string()));
        assert_eq!(sender.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_without_text_use_generic_message() {
        let failure = || Err(MailError::new(Some(500), None));
        let sender = ScriptedSender::new(vec![failure(), failure(), failure()]);
        let submitter = submitter(sender);
        let mut control = SubmitControl::new("Book Now");

        let outcome =
            submitter.submit(&mut control, &destination(), &FormPayload::new(), "Sent!").await;
        assert_eq!(outcome, SubmissionOutcome::Failure(GENERIC_FAILURE_MESSAGE.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_within_cooldown_makes_no_call() {
        let sender = ScriptedSender::new(vec![]);
        let submitter = submitter(Arc::clone(&sender));

        assert!(submitter.deliver(&destination(), &FormPayload::new()).await.is_ok());
        let err = submitter.deliver(&destination(), &FormPayload::new()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::RateLimited(_)));
        assert_eq!(err.user_message(), RATE_LIMITED_MESSAGE);
        assert_eq!(sender.call_count(), 1);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(submitter.deliver(&destination(), &FormPayload::new()).await.is_ok());
        assert_eq!(sender.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_service() {
        let submitter = Submitter::unavailable("client not configured", Arc::default());
        let mut control = SubmitControl::new("Send Message");

        let outcome =
            submitter.submit(&mut control, &destination(), &FormPayload::new(), "Sent!").await;
        assert_eq!(outcome, SubmissionOutcome::Failure(SERVICE_UNAVAILABLE_MESSAGE.to_string()));
        assert_eq!(control, SubmitControl::new("Send Message"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_restored_after_success() {
        let submitter = submitter(ScriptedSender::new(vec![]));
        let mut control = SubmitControl::new("Book Now");

        let outcome =
            submitter.submit(&mut control, &destination(), &FormPayload::new(), "Sent!").await;
        assert_eq!(outcome, SubmissionOutcome::Success("Sent!".to_string()));
        assert_eq!(control, SubmitControl::new("Book Now"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_restored_when_submission_dropped_midway() {
        let sender = ScriptedSender::new(vec![Err(MailError::with_text("busy"))]);
        let submitter = submitter(sender);
        let mut control = SubmitControl::new("Book Now");

        {
            let dest = destination();
            let payload = FormPayload::new();
            let submission = submitter.submit(&mut control, &dest, &payload, "Sent!");
            // Gives up while the submission sits in its first backoff sleep
            let timed_out =
                tokio::time::timeout(Duration::from_millis(500), submission).await.is_err();
            assert!(timed_out);
        }
        assert_eq!(control, SubmitControl::new("Book Now"));
    }
}
