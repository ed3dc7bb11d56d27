use crate::{
    backend::IssuedCode,
    error::{ServiceFailure, VerificationError},
    validation::{is_valid_email, is_well_formed_code},
};
use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Idle,
    CodeSent,
    Verified,
    Locked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationSession {
    pub email: Option<String>,
    pub code: Option<String>,
    pub issued_at: Option<DateTime<Local>>,
    pub expires_at: Option<DateTime<Local>>,
    pub attempts: u32,
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeSent {
    pub expires_at: DateTime<Local>,
    pub resend_available_at: DateTime<Local>,
}

/// A code request that passed every check and now waits for the verification service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    pub email: String,
    pub resend_available_at: DateTime<Local>,
}

/// Minimum wait before another code can be requested. Expires on its own.
#[derive(Debug, Clone, Default)]
pub struct ResendCooldown {
    deadline: Option<DateTime<Local>>,
}

impl ResendCooldown {
    pub fn start(&mut self, now: DateTime<Local>, duration: Duration) -> DateTime<Local> {
        let deadline = now + duration;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Drops the deadline once it has passed. Returns true if it elapsed with this call.
    pub fn poll(&mut self, now: DateTime<Local>) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self, now: DateTime<Local>) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }

    /// Whole seconds left, rounded up.
    pub fn remaining_secs(&self, now: DateTime<Local>) -> i64 {
        match self.deadline {
            Some(deadline) if now < deadline => {
                let millis = (deadline - now).num_milliseconds();
                (millis + 999) / 1000
            }
            _ => 0,
        }
    }
}

/// One-time code verification of the garage email address.
///
/// `Idle -> CodeSent -> Verified | Locked`. A failed attempt below the limit stays in
/// `CodeSent`; a new code leaves `Locked`. Editing the address before verification goes back to
/// `Idle`, after verification the address can't change anymore.
#[derive(Debug, Clone)]
pub struct EmailVerificationFlow {
    session: VerificationSession,
    cooldown: ResendCooldown,
    cooldown_duration: Duration,
    max_attempts: u32,
}

impl EmailVerificationFlow {
    pub fn new(cooldown_duration: Duration, max_attempts: u32) -> Self {
        Self {
            session: VerificationSession::default(),
            cooldown: ResendCooldown::default(),
            cooldown_duration,
            max_attempts,
        }
    }

    pub fn state(&self) -> VerificationState {
        if self.session.verified {
            VerificationState::Verified
        } else if self.session.attempts >= self.max_attempts {
            VerificationState::Locked
        } else if self.session.code.is_some() {
            VerificationState::CodeSent
        } else {
            VerificationState::Idle
        }
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    pub fn is_verified(&self) -> bool {
        self.session.verified
    }

    pub fn verified_email(&self) -> Option<&str> {
        match self.session.verified {
            true => self.session.email.as_deref(),
            false => None,
        }
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.session.attempts)
    }

    pub fn resend_available_in(&self, now: DateTime<Local>) -> i64 {
        self.cooldown.remaining_secs(now)
    }

    pub fn status_message(&self) -> &'static str {
        match self.state() {
            VerificationState::Idle => "",
            VerificationState::CodeSent => "Code envoyé à votre adresse email",
            VerificationState::Verified => "Email vérifié avec succès !",
            VerificationState::Locked => {
                "Trop de tentatives, veuillez demander un nouveau code"
            }
        }
    }

    /// Checks that a code may be requested for `email` and reserves the resend cooldown, so a
    /// second request is refused while the first one is in flight.
    pub fn prepare_request(
        &mut self,
        email: &str,
        now: DateTime<Local>,
    ) -> Result<PendingCode, VerificationError> {
        if self.session.verified {
            return Err(VerificationError::AlreadyVerified);
        }
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(VerificationError::InvalidEmail);
        }
        self.cooldown.poll(now);
        if self.cooldown.is_running(now) {
            return Err(VerificationError::CooldownActive {
                remaining_secs: self.cooldown.remaining_secs(now),
            });
        }
        Ok(PendingCode {
            email: email.to_string(),
            resend_available_at: self.cooldown.start(now, self.cooldown_duration),
        })
    }

    /// Applies the answer of the verification-code service. A failure releases the cooldown
    /// reserved by [`EmailVerificationFlow::prepare_request`] and leaves everything else as it
    /// was.
    pub fn complete_request(
        &mut self,
        pending: PendingCode,
        outcome: Result<IssuedCode, ServiceFailure>,
        now: DateTime<Local>,
    ) -> Result<CodeSent, VerificationError> {
        let PendingCode {
            email,
            resend_available_at,
        } = pending;
        if self.session.verified {
            return Err(VerificationError::AlreadyVerified);
        }
        let issued = match outcome {
            Ok(issued) => issued,
            Err(err) => {
                self.cooldown.cancel();
                warn!(%email, %err, "Verification code request failed");
                return Err(err.into());
            }
        };

        info!(%email, expires_at = %issued.expires_at, "Verification code issued");
        self.session = VerificationSession {
            email: Some(email),
            code: Some(issued.code),
            issued_at: Some(now),
            expires_at: Some(issued.expires_at),
            attempts: 0,
            verified: false,
        };
        Ok(CodeSent {
            expires_at: issued.expires_at,
            resend_available_at,
        })
    }

    pub fn submit_code(
        &mut self,
        candidate: &str,
        now: DateTime<Local>,
    ) -> Result<(), VerificationError> {
        if self.session.verified {
            return Err(VerificationError::AlreadyVerified);
        }
        let candidate = candidate.trim();
        if !is_well_formed_code(candidate) {
            return Err(VerificationError::MalformedCode);
        }
        if self.session.attempts >= self.max_attempts {
            return Err(VerificationError::TooManyAttempts);
        }
        let (Some(code), Some(expires_at)) = (&self.session.code, self.session.expires_at) else {
            return Err(VerificationError::NoCodeIssued);
        };
        if now >= expires_at {
            return Err(VerificationError::CodeExpired);
        }

        let matches = candidate == code.as_str();
        self.session.attempts += 1;
        if matches {
            self.session.verified = true;
            self.cooldown.cancel();
            info!(email = ?self.session.email, "Email address verified");
            return Ok(());
        }

        let attempts_remaining = self.attempts_remaining();
        warn!(
            attempts = self.session.attempts,
            attempts_remaining, "Wrong verification code"
        );
        Err(VerificationError::WrongCode { attempts_remaining })
    }

    /// The email field was edited.
    pub fn email_changed(&mut self, email: &str) -> Result<(), VerificationError> {
        let email = email.trim();
        if self.session.verified {
            return match self.session.email.as_deref() == Some(email) {
                true => Ok(()),
                false => Err(VerificationError::EmailLocked),
            };
        }
        if self.session.email.as_deref() != Some(email) {
            self.reset();
        }
        Ok(())
    }

    /// Forgets the issued code. Does nothing once verified. The resend cooldown keeps running.
    pub fn reset(&mut self) {
        if self.session.verified {
            return;
        }
        self.session = VerificationSession::default();
    }
}
