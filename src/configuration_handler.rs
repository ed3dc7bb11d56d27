use crate::{
    configuration::Configuration,
    types::{Holiday, TimeSlot},
};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use tracing::{info, warn};

pub const DEFAULT_HOLIDAYS: [Holiday; 5] = [
    Holiday::new(0, 1),   // Nouvel An
    Holiday::new(4, 1),   // Fête du Travail
    Holiday::new(4, 8),   // Victoire 1945
    Holiday::new(6, 14),  // Fête Nationale
    Holiday::new(11, 25), // Noël
];

pub const DEFAULT_TIME_SLOTS: [&str; 5] = [
    "08:00 - 12:00",
    "09:00 - 13:00",
    "10:00 - 14:00",
    "13:00 - 17:00",
    "14:00 - 18:00",
];

#[derive(Clone, Debug, Parser)]
#[command(name = "garage_booking", about = "Booking wizard for garage service appointments")]
pub struct ConfigurationHandler {
    #[arg(long, env = "BOOKING_PORT", default_value = "3000")]
    port: String,

    /// Recurring holidays as MM-DD, comma separated
    #[arg(long, env = "BOOKING_HOLIDAYS", value_delimiter = ',', value_parser = parse_holiday)]
    holidays: Vec<Holiday>,

    /// Bookable time slots, comma separated
    #[arg(long = "time-slots", env = "BOOKING_TIME_SLOTS", value_delimiter = ',')]
    time_slots: Vec<String>,

    #[arg(
        long,
        env = "BOOKING_PAYMENT_LINK",
        default_value = "https://payment.automechpro.fr/pay/RDV-2023-05678"
    )]
    payment_link: String,

    #[arg(long, env = "BOOKING_COMPANY_NAME", default_value = "AutoMech Pro")]
    company_name: String,

    #[arg(
        long,
        env = "BOOKING_CODE_EXPIRY_MINUTES",
        default_value_t = 15,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    code_expiry_minutes: i64,

    #[arg(
        long,
        env = "BOOKING_RESEND_COOLDOWN_SECONDS",
        default_value_t = 60,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    resend_cooldown_seconds: i64,

    #[arg(
        long,
        env = "BOOKING_MAX_CODE_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_code_attempts: u32,

    /// Delay of the simulated email services
    #[arg(long, env = "BOOKING_SERVICE_LATENCY_MS", default_value_t = 1500)]
    service_latency_ms: u64,

    /// Probability that a simulated email service call succeeds
    #[arg(
        long,
        env = "BOOKING_SERVICE_SUCCESS_RATE",
        default_value_t = 0.8,
        value_parser = parse_probability
    )]
    service_success_rate: f64,
}

fn parse_holiday(value: &str) -> Result<Holiday, String> {
    let (month, day) = value
        .trim()
        .split_once('-')
        .ok_or_else(|| format!("Expected MM-DD, got {value}"))?;
    let month: u32 = month.parse().map_err(|_| format!("Invalid month in {value}"))?;
    let day: u32 = day.parse().map_err(|_| format!("Invalid day in {value}"))?;
    // 2024 is a leap year, so 02-29 is accepted
    NaiveDate::from_ymd_opt(2024, month, day).ok_or_else(|| format!("No such day: {value}"))?;
    Ok(Holiday::new(month - 1, day))
}

fn parse_probability(value: &str) -> Result<f64, String> {
    let probability: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Not a number: {value}"))?;
    match (0.0..=1.0).contains(&probability) {
        true => Ok(probability),
        false => Err(format!("Expected a value between 0 and 1, got {value}")),
    }
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!(?path, "Loaded environment file"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(%err, "Failed to load environment file"),
        }
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> String {
        self.port.clone()
    }

    fn holidays(&self) -> Vec<Holiday> {
        match self.holidays.is_empty() {
            true => DEFAULT_HOLIDAYS.to_vec(),
            false => self.holidays.clone(),
        }
    }

    fn time_slots(&self) -> Vec<TimeSlot> {
        let slots: Vec<TimeSlot> = self
            .time_slots
            .iter()
            .map(|slot| slot.trim())
            .filter(|slot| !slot.is_empty())
            .map(TimeSlot::from)
            .collect();
        match slots.is_empty() {
            true => DEFAULT_TIME_SLOTS.into_iter().map(TimeSlot::from).collect(),
            false => slots,
        }
    }

    fn payment_link(&self) -> String {
        self.payment_link.clone()
    }

    fn company_name(&self) -> String {
        self.company_name.clone()
    }

    fn verification_code_expiry(&self) -> Duration {
        Duration::minutes(self.code_expiry_minutes)
    }

    fn resend_cooldown(&self) -> Duration {
        Duration::seconds(self.resend_cooldown_seconds)
    }

    fn max_code_attempts(&self) -> u32 {
        self.max_code_attempts
    }

    fn service_latency(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.service_latency_ms)
    }

    fn service_success_rate(&self) -> f64 {
        self.service_success_rate
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let configuration = ConfigurationHandler::try_parse_from(["garage_booking"]).unwrap();
        assert_eq!(configuration.port(), "3000");
        assert_eq!(configuration.holidays(), DEFAULT_HOLIDAYS.to_vec());
        assert_eq!(configuration.time_slots().len(), 5);
        assert_eq!(configuration.time_slots()[0], TimeSlot::from("08:00 - 12:00"));
        assert_eq!(configuration.verification_code_expiry(), Duration::minutes(15));
        assert_eq!(configuration.resend_cooldown(), Duration::seconds(60));
        assert_eq!(configuration.max_code_attempts(), 3);
        assert_eq!(
            configuration.service_latency(),
            std::time::Duration::from_millis(1500)
        );
        assert_eq!(configuration.company_name(), "AutoMech Pro");
    }

    #[test]
    fn test_overrides() {
        let configuration = ConfigurationHandler::try_parse_from([
            "garage_booking",
            "--port",
            "8080",
            "--holidays",
            "12-25,12-26",
            "--time-slots",
            "07:00 - 15:00, 15:00 - 23:00",
            "--service-success-rate",
            "1",
        ])
        .unwrap();
        assert_eq!(configuration.port(), "8080");
        assert_eq!(
            configuration.holidays(),
            vec![Holiday::new(11, 25), Holiday::new(11, 26)]
        );
        assert_eq!(
            configuration.time_slots(),
            vec![
                TimeSlot::from("07:00 - 15:00"),
                TimeSlot::from("15:00 - 23:00")
            ]
        );
        assert_eq!(configuration.service_success_rate(), 1.0);
    }

    #[test_case("--code-expiry-minutes", "0")]
    #[test_case("--resend-cooldown-seconds", "-5")]
    #[test_case("--max-code-attempts", "0")]
    #[test_case("--service-success-rate", "1.5")]
    #[test_case("--service-success-rate", "often")]
    fn test_rejects_out_of_range(flag: &str, value: &str) {
        let argument = format!("{flag}={value}");
        assert!(ConfigurationHandler::try_parse_from(["garage_booking", argument.as_str()]).is_err());
    }

    #[test_case("02-29", Some(Holiday::new(1, 29)))]
    #[test_case("7-14", Some(Holiday::new(6, 14)))]
    #[test_case("13-01", None)]
    #[test_case("04-31", None)]
    #[test_case("0501", None)]
    fn test_parse_holiday(value: &str, expected: Option<Holiday>) {
        assert_eq!(parse_holiday(value).ok(), expected);
    }
}
