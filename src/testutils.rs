use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Duration, Local, TimeZone};
use tokio::sync::Notify;

use crate::{
    backend::{BookingBackend, Clock, IssuedCode},
    error::ServiceFailure,
};

pub const ISSUED_CODE: &str = "482913";

#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Local>>>);

impl ManualClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let now = Local
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .earliest()
            .unwrap();
        Self(Arc::new(Mutex::new(now)))
    }

    pub fn advance(&self, duration: Duration) {
        *self.0.lock().unwrap() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

pub struct MockBookingBackendInner {
    pub success: AtomicBool,
    pub hold: AtomicBool,
    pub released: Notify,
    pub calls_to_send_verification_code: AtomicU64,
    pub calls_to_send_email: AtomicU64,
    pub code_validity: Mutex<Duration>,
    pub sent_emails: Mutex<Vec<(String, String, String)>>,
    clock: ManualClock,
}

#[derive(Clone)]
pub struct MockBookingBackend(pub Arc<MockBookingBackendInner>);

impl MockBookingBackendInner {
    fn new(clock: ManualClock) -> Self {
        Self {
            success: AtomicBool::new(true),
            hold: AtomicBool::new(false),
            released: Notify::new(),
            calls_to_send_verification_code: AtomicU64::default(),
            calls_to_send_email: AtomicU64::default(),
            code_validity: Mutex::new(Duration::minutes(15)),
            sent_emails: Mutex::default(),
            clock,
        }
    }
}

impl MockBookingBackend {
    pub fn new(clock: ManualClock) -> Self {
        Self(Arc::new(MockBookingBackendInner::new(clock)))
    }

    pub fn fail(&self, fail: bool) {
        self.0.success.store(!fail, Ordering::SeqCst);
    }

    /// While held, service calls wait for [`MockBookingBackend::release`] before answering.
    pub fn hold(&self, hold: bool) {
        self.0.hold.store(hold, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.0.hold.store(false, Ordering::SeqCst);
        self.0.released.notify_one();
    }

    async fn wait_if_held(&self) {
        if self.0.hold.load(Ordering::SeqCst) {
            self.0.released.notified().await;
        }
    }

    pub fn code_requests(&self) -> u64 {
        self.0.calls_to_send_verification_code.load(Ordering::SeqCst)
    }

    pub fn emails(&self) -> Vec<(String, String, String)> {
        self.0.sent_emails.lock().unwrap().clone()
    }
}

impl BookingBackend for MockBookingBackend {
    async fn send_verification_code(&self, _email: &str) -> Result<IssuedCode, ServiceFailure> {
        self.0
            .calls_to_send_verification_code
            .fetch_add(1, Ordering::SeqCst);
        self.wait_if_held().await;
        if !self.0.success.load(Ordering::SeqCst) {
            return Err(ServiceFailure::CodeDelivery);
        }
        let validity = *self.0.code_validity.lock().unwrap();
        Ok(IssuedCode {
            code: ISSUED_CODE.into(),
            expires_at: self.0.clock.now() + validity,
        })
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceFailure> {
        self.0.calls_to_send_email.fetch_add(1, Ordering::SeqCst);
        self.wait_if_held().await;
        if !self.0.success.load(Ordering::SeqCst) {
            return Err(ServiceFailure::EmailDelivery);
        }
        self.0
            .sent_emails
            .lock()
            .unwrap()
            .push((to.into(), subject.into(), body.into()));
        Ok(())
    }
}
