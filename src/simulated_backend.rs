use crate::{
    backend::{BookingBackend, Clipboard, Clock, IssuedCode},
    error::ServiceFailure,
    random,
};
use chrono::Duration;
use std::sync::{Arc, Mutex};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Stand-in for the verification and email services: waits, then succeeds with the configured
/// probability. Nothing is actually delivered.
#[derive(Clone)]
pub struct SimulatedBackend {
    latency: std::time::Duration,
    success_rate: f64,
    code_expiry: Duration,
    clock: Arc<dyn Clock>,
}

impl SimulatedBackend {
    pub fn new(
        latency: std::time::Duration,
        success_rate: f64,
        code_expiry: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            latency,
            success_rate,
            code_expiry,
            clock,
        }
    }
}

impl BookingBackend for SimulatedBackend {
    async fn send_verification_code(&self, email: &str) -> Result<IssuedCode, ServiceFailure> {
        sleep(self.latency).await;

        if !random::chance(self.success_rate) {
            warn!(email, "Simulated verification code delivery failed");
            return Err(ServiceFailure::CodeDelivery);
        }

        let code = random::verification_code();
        debug!(email, %code, "Verification code sent");
        Ok(IssuedCode {
            code,
            expires_at: self.clock.now() + self.code_expiry,
        })
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceFailure> {
        sleep(self.latency).await;

        if !random::chance(self.success_rate) {
            warn!(to, subject, "Simulated email delivery failed");
            return Err(ServiceFailure::EmailDelivery);
        }
        info!(to, subject, length = body.len(), "Email sent");
        Ok(())
    }
}

/// Keeps the last copied text so the front end can pick it up.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    content: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn content(&self) -> Option<String> {
        self.content.lock().ok().and_then(|content| content.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> bool {
        match self.content.lock() {
            Ok(mut content) => {
                *content = Some(text.to_string());
                true
            }
            Err(err) => {
                warn!(?err, "Clipboard lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::ManualClock;

    fn backend(success_rate: f64, clock: ManualClock) -> SimulatedBackend {
        SimulatedBackend::new(
            std::time::Duration::ZERO,
            success_rate,
            Duration::minutes(15),
            Arc::new(clock),
        )
    }

    #[tokio::test]
    async fn test_send_code_success() {
        let clock = ManualClock::at(2024, 1, 15, 9, 0, 0);
        let backend = backend(1.0, clock.clone());

        let issued = backend
            .send_verification_code("contact@garage.fr")
            .await
            .unwrap();
        assert_eq!(issued.code.len(), 6);
        assert!(issued.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(issued.expires_at, clock.now() + Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_send_failures() {
        let backend = backend(0.0, ManualClock::at(2024, 1, 15, 9, 0, 0));

        assert_eq!(
            backend.send_verification_code("contact@garage.fr").await,
            Err(ServiceFailure::CodeDelivery)
        );
        assert_eq!(
            backend
                .send_email("contact@garage.fr", "Subject", "Body")
                .await,
            Err(ServiceFailure::EmailDelivery)
        );
    }

    #[test]
    fn test_memory_clipboard() {
        let clipboard = MemoryClipboard::default();
        assert_eq!(clipboard.content(), None);
        assert!(clipboard.copy("https://pay.example/1"));
        assert!(clipboard.clone().copy("https://pay.example/2"));
        assert_eq!(clipboard.content().as_deref(), Some("https://pay.example/2"));
    }
}
