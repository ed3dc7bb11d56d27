//! Error taxonomy of the booking flow.
//!
//! Nothing here is fatal. Every operation that fails leaves the session exactly as it was, and
//! each error reports an [`ErrorKind`] so callers can decide how to surface it.

use crate::types::{CalendarDate, WizardStep};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, shown next to the field. Retry is not blocked.
    Validation,
    /// An external service failed or a precondition depending on one is unmet.
    ServiceFailure,
    /// Too many attempts or resend requested too early.
    RateLimited,
    /// A transition was attempted without its gate being satisfied.
    IntegrityViolation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFailure {
    #[error("Verification code could not be sent")]
    CodeDelivery,
    #[error("Email could not be sent")]
    EmailDelivery,
    #[error("Clipboard is not available")]
    Clipboard,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Verification code must contain 6 characters")]
    MalformedCode,
    #[error("Wrong verification code, {attempts_remaining} attempt(s) remaining")]
    WrongCode { attempts_remaining: u32 },
    #[error("Too many attempts, request a new code")]
    TooManyAttempts,
    #[error("Verification code expired, request a new code")]
    CodeExpired,
    #[error("No verification code was requested")]
    NoCodeIssued,
    #[error("Email address is already verified")]
    AlreadyVerified,
    #[error("A new code can be requested in {remaining_secs} seconds")]
    CooldownActive { remaining_secs: i64 },
    #[error("Verified email address can't be changed")]
    EmailLocked,
    #[error("Email address changed while the code was being sent")]
    RequestSuperseded,
    #[error(transparent)]
    Service(#[from] ServiceFailure),
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::InvalidEmail
            | VerificationError::MalformedCode
            | VerificationError::WrongCode { .. }
            | VerificationError::CodeExpired
            | VerificationError::EmailLocked => ErrorKind::Validation,
            VerificationError::TooManyAttempts | VerificationError::CooldownActive { .. } => {
                ErrorKind::RateLimited
            }
            VerificationError::NoCodeIssued
            | VerificationError::AlreadyVerified
            | VerificationError::RequestSuperseded => ErrorKind::IntegrityViolation,
            VerificationError::Service(_) => ErrorKind::ServiceFailure,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("Email address has not been verified")]
    EmailNotVerified,
    #[error("Invalid fields: {}", field_names(.0))]
    FormInvalid(Vec<FieldError>),
    #[error("Date {0} can't be booked")]
    DateUnavailable(CalendarDate),
    #[error("Unknown time slot {0}")]
    UnknownTimeSlot(String),
    #[error("Select a date before choosing a time slot")]
    NoDateSelected,
    #[error("Select at least one date and a time slot")]
    NoSelection,
    #[error("Terms and conditions must be accepted")]
    TermsNotAccepted,
    #[error("Operation belongs to step {expected} but the wizard is at step {actual}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },
    #[error("Already at the first step")]
    AtFirstStep,
    #[error("Booking was already confirmed")]
    AlreadyConfirmed,
    #[error("Booking has not been confirmed yet")]
    NotConfirmed,
}

fn field_names(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|field| field.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl WizardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WizardError::EmailNotVerified => ErrorKind::ServiceFailure,
            WizardError::FormInvalid(_)
            | WizardError::DateUnavailable(_)
            | WizardError::UnknownTimeSlot(_)
            | WizardError::NoDateSelected => ErrorKind::Validation,
            WizardError::NoSelection
            | WizardError::TermsNotAccepted
            | WizardError::WrongStep { .. }
            | WizardError::AtFirstStep
            | WizardError::AlreadyConfirmed
            | WizardError::NotConfirmed => ErrorKind::IntegrityViolation,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Service(#[from] ServiceFailure),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Verification(err) => err.kind(),
            BookingError::Wizard(err) => err.kind(),
            BookingError::Service(_) => ErrorKind::ServiceFailure,
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            BookingError::Wizard(WizardError::FormInvalid(fields)) => fields,
            _ => &[],
        }
    }
}
