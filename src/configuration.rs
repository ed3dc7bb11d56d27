use crate::types::{Holiday, TimeSlot};
use chrono::Duration;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> String;
    fn holidays(&self) -> Vec<Holiday>;
    fn time_slots(&self) -> Vec<TimeSlot>;
    fn payment_link(&self) -> String;
    fn company_name(&self) -> String;
    fn verification_code_expiry(&self) -> Duration;
    fn resend_cooldown(&self) -> Duration;
    fn max_code_attempts(&self) -> u32;
    fn service_latency(&self) -> std::time::Duration;
    fn service_success_rate(&self) -> f64;
}
