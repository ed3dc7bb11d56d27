use crate::error::ServiceFailure;
use chrono::{DateTime, Local, NaiveDate};
use std::future::Future;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Local>,
}

/// Services the booking flow reaches out to. Both calls are slow and may fail.
pub trait BookingBackend: Clone + Send + Sync + 'static {
    fn send_verification_code(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<IssuedCode, ServiceFailure>> + Send;

    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), ServiceFailure>> + Send;
}

#[cfg_attr(test, automock)]
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
