use crate::{
    backend::{BookingBackend, Clipboard, Clock, IssuedCode},
    calendar::CalendarEngine,
    configuration::Configuration,
    confirmation::{ConfirmationPresenter, Receipt},
    error::{BookingError, ServiceFailure, VerificationError, WizardError},
    types::{
        BookingSummary, CalendarCursor, CalendarDate, ConfirmationDetails, GarageInfo, Holiday,
        MonthGrid, TimeSlot, WizardStep,
    },
    validation::GarageForm,
    verification::{CodeSent, EmailVerificationFlow, PendingCode, VerificationState},
    wizard::BookingWizard,
};
use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub holidays: Vec<Holiday>,
    pub time_slots: Vec<TimeSlot>,
    pub payment_link: String,
    pub company_name: String,
    pub resend_cooldown: Duration,
    pub max_code_attempts: u32,
}

impl SessionSettings {
    pub fn from_configuration<C: Configuration>(configuration: &C) -> Self {
        Self {
            holidays: configuration.holidays(),
            time_slots: configuration.time_slots(),
            payment_link: configuration.payment_link(),
            company_name: configuration.company_name(),
            resend_cooldown: configuration.resend_cooldown(),
            max_code_attempts: configuration.max_code_attempts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSnapshot {
    pub draft: String,
    pub code_sent_to: Option<String>,
    pub state: VerificationState,
    pub status: &'static str,
    pub attempts: u32,
    pub attempts_remaining: u32,
    pub expires_at: Option<DateTime<Local>>,
    pub resend_available_in: i64,
}

/// Everything a front end needs to render the current booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub step: WizardStep,
    pub email: EmailSnapshot,
    pub garage_info: Option<GarageInfo>,
    pub cursor: CalendarCursor,
    pub time_slots: Vec<TimeSlot>,
    pub selected_dates: Vec<CalendarDate>,
    pub selected_time: Option<TimeSlot>,
    pub confirmation_details: Option<ConfirmationDetails>,
    pub terms_accepted: bool,
    pub receipt: Option<Receipt>,
    pub confirmation_email_sent: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmed {
    pub receipt: Receipt,
    pub confirmation_email_sent: bool,
}

/// A verification code request that passed every check. Owns what the service call needs, so
/// the session can be released while the code is on its way.
pub struct PendingCodeRequest<B> {
    pending: PendingCode,
    generation: u64,
    backend: B,
}

impl<B: BookingBackend> PendingCodeRequest<B> {
    pub async fn send(self) -> CodeDelivery {
        let outcome = self
            .backend
            .send_verification_code(&self.pending.email)
            .await;
        CodeDelivery {
            pending: self.pending,
            generation: self.generation,
            outcome,
        }
    }
}

pub struct CodeDelivery {
    pending: PendingCode,
    generation: u64,
    outcome: Result<IssuedCode, ServiceFailure>,
}

/// A confirmation email about to be sent for a confirmed booking.
pub struct PendingConfirmationEmail<B> {
    summary: BookingSummary,
    generation: u64,
    presenter: ConfirmationPresenter,
    backend: B,
}

impl<B: BookingBackend> PendingConfirmationEmail<B> {
    pub async fn send(self) -> ConfirmationEmailDelivery {
        let outcome = self
            .presenter
            .send_confirmation(&self.backend, &self.summary)
            .await;
        ConfirmationEmailDelivery {
            summary: self.summary,
            generation: self.generation,
            outcome,
        }
    }
}

pub struct ConfirmationEmailDelivery {
    summary: BookingSummary,
    generation: u64,
    outcome: Result<(), ServiceFailure>,
}

/// The single booking in progress, together with the services it talks to.
///
/// All operations go through here so every change ends up on the snapshot channel. Service
/// calls are split into a `begin_*` step, a `send` that borrows nothing from the session and a
/// `finish_*` step, so the session is never held while a service is slow. Answers that arrive
/// after a restart are dropped.
pub struct BookingSession<B: BookingBackend> {
    wizard: BookingWizard,
    generation: u64,
    email_draft: String,
    confirmation_email_sent: Option<bool>,
    settings: SessionSettings,
    presenter: ConfirmationPresenter,
    backend: B,
    clipboard: Arc<dyn Clipboard>,
    clock: Arc<dyn Clock>,
    sender: watch::Sender<SessionSnapshot>,
}

fn fresh_wizard(settings: &SessionSettings, clock: &dyn Clock) -> BookingWizard {
    BookingWizard::new(
        CalendarEngine::new(clock.today(), settings.holidays.clone()),
        EmailVerificationFlow::new(settings.resend_cooldown, settings.max_code_attempts),
    )
}

impl<B: BookingBackend> BookingSession<B> {
    pub fn new(
        settings: SessionSettings,
        backend: B,
        clipboard: Arc<dyn Clipboard>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let wizard = fresh_wizard(&settings, clock.as_ref());
        let presenter = ConfirmationPresenter::new(settings.company_name.clone());
        let (sender, _) = watch::channel(capture(
            &wizard,
            "",
            None,
            &settings,
            &presenter,
            clock.now(),
        ));
        Self {
            wizard,
            generation: 0,
            email_draft: String::new(),
            confirmation_email_sent: None,
            settings,
            presenter,
            backend,
            clipboard,
            clock,
            sender,
        }
    }

    pub fn wizard(&self) -> &BookingWizard {
        &self.wizard
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        capture(
            &self.wizard,
            &self.email_draft,
            self.confirmation_email_sent,
            &self.settings,
            &self.presenter,
            self.clock.now(),
        )
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.sender.send_if_modified(|current| match *current == snapshot {
            true => false,
            false => {
                *current = snapshot;
                true
            }
        });
    }

    fn publish_result<T, E: Into<BookingError>>(
        &self,
        result: Result<T, E>,
    ) -> Result<T, BookingError> {
        self.publish();
        result.map_err(Into::into)
    }

    pub fn month_grid(&self) -> MonthGrid {
        self.wizard.calendar().month_grid(self.clock.today())
    }

    pub fn update_email(&mut self, email: &str) -> Result<(), BookingError> {
        self.wizard.ensure_step(WizardStep::GarageInfo)?;
        self.wizard.verification_mut().email_changed(email)?;
        self.email_draft = email.trim().to_string();
        self.publish();
        Ok(())
    }

    /// Checks the address and the cooldown before anything changes, then records the address
    /// the code is going to.
    pub fn begin_code_request(
        &mut self,
        email: &str,
    ) -> Result<PendingCodeRequest<B>, BookingError> {
        self.wizard.ensure_step(WizardStep::GarageInfo)?;
        let now = self.clock.now();
        let verification = self.wizard.verification_mut();
        let pending = verification.prepare_request(email, now)?;
        verification.email_changed(&pending.email)?;
        self.email_draft = pending.email.clone();
        self.publish();
        Ok(PendingCodeRequest {
            pending,
            generation: self.generation,
            backend: self.backend.clone(),
        })
    }

    pub fn finish_code_request(&mut self, delivery: CodeDelivery) -> Result<CodeSent, BookingError> {
        let CodeDelivery {
            pending,
            generation,
            outcome,
        } = delivery;
        if generation != self.generation || pending.email != self.email_draft {
            warn!(email = %pending.email, "Dropping answer for an outdated code request");
            return Err(VerificationError::RequestSuperseded.into());
        }
        let now = self.clock.now();
        let result = self
            .wizard
            .verification_mut()
            .complete_request(pending, outcome, now);
        self.publish_result(result)
    }

    pub fn submit_code(&mut self, code: &str) -> Result<(), BookingError> {
        self.wizard.ensure_step(WizardStep::GarageInfo)?;
        let now = self.clock.now();
        let result = self.wizard.verification_mut().submit_code(code, now);
        self.publish_result(result)
    }

    pub fn submit_garage_info(&mut self, form: &GarageForm) -> Result<(), BookingError> {
        self.wizard.advance_from_step1(form)?;
        self.publish();
        Ok(())
    }

    pub fn previous_month(&mut self) -> Result<CalendarCursor, BookingError> {
        self.wizard.navigate_calendar(false)?;
        self.publish();
        Ok(self.wizard.calendar().cursor())
    }

    pub fn next_month(&mut self) -> Result<CalendarCursor, BookingError> {
        self.wizard.navigate_calendar(true)?;
        self.publish();
        Ok(self.wizard.calendar().cursor())
    }

    /// Selects or deselects `date`. Returns whether it is selected afterwards.
    pub fn toggle_date(&mut self, date: CalendarDate) -> Result<bool, BookingError> {
        let today = self.clock.today();
        let calendar = self.wizard.calendar_mut()?;
        // A selected date that became unavailable can still be removed
        if calendar.classify_day(date, today).is_disabled() && !calendar.is_selected(date) {
            return Err(WizardError::DateUnavailable(date).into());
        }
        calendar.toggle_date(date);
        let selected = calendar.is_selected(date);
        self.publish();
        Ok(selected)
    }

    pub fn select_time_slot(&mut self, slot: &str) -> Result<(), BookingError> {
        self.wizard.ensure_step(WizardStep::Schedule)?;
        let slot = self
            .settings
            .time_slots
            .iter()
            .find(|configured| configured.as_str() == slot.trim())
            .cloned()
            .ok_or_else(|| WizardError::UnknownTimeSlot(slot.to_string()))?;

        let calendar = self.wizard.calendar_mut()?;
        if calendar.selected_dates().is_empty() {
            return Err(WizardError::NoDateSelected.into());
        }
        calendar.select_time_slot(slot);
        self.publish();
        Ok(())
    }

    pub fn advance_from_step2(&mut self) -> Result<ConfirmationDetails, BookingError> {
        let details = self.wizard.advance_from_step2()?.clone();
        self.publish();
        Ok(details)
    }

    pub fn retreat(&mut self) -> Result<WizardStep, BookingError> {
        let step = self.wizard.retreat()?;
        self.publish();
        Ok(step)
    }

    pub fn set_terms_accepted(&mut self, accepted: bool) -> Result<(), BookingError> {
        self.wizard.set_terms_accepted(accepted)?;
        self.publish();
        Ok(())
    }

    /// Confirms the booking. The confirmation email is sent afterwards and a failed email does
    /// not undo the confirmation.
    pub fn begin_confirm(&mut self) -> Result<PendingConfirmationEmail<B>, BookingError> {
        let summary = self
            .wizard
            .confirm(self.clock.now(), &self.settings.payment_link)?;
        self.publish();
        Ok(self.confirmation_email(summary))
    }

    pub fn finish_confirm(&mut self, delivery: ConfirmationEmailDelivery) -> Confirmed {
        let sent = delivery.outcome.is_ok();
        if delivery.generation == self.generation {
            // a resend may have gone through in the meantime
            if self.confirmation_email_sent != Some(true) {
                self.confirmation_email_sent = Some(sent);
            }
            self.publish();
        }
        Confirmed {
            receipt: self.presenter.receipt(&delivery.summary),
            confirmation_email_sent: sent,
        }
    }

    pub fn begin_resend_confirmation_email(
        &self,
    ) -> Result<PendingConfirmationEmail<B>, BookingError> {
        let summary = self
            .wizard
            .summary()
            .cloned()
            .ok_or(WizardError::NotConfirmed)?;
        Ok(self.confirmation_email(summary))
    }

    pub fn finish_resend_confirmation_email(
        &mut self,
        delivery: ConfirmationEmailDelivery,
    ) -> Result<(), BookingError> {
        delivery.outcome?;
        if delivery.generation == self.generation {
            self.confirmation_email_sent = Some(true);
            self.publish();
        }
        Ok(())
    }

    fn confirmation_email(&self, summary: BookingSummary) -> PendingConfirmationEmail<B> {
        PendingConfirmationEmail {
            summary,
            generation: self.generation,
            presenter: self.presenter.clone(),
            backend: self.backend.clone(),
        }
    }

    /// Puts the payment link on the clipboard and returns it.
    pub fn copy_payment_link(&self) -> Result<String, BookingError> {
        let summary = self.wizard.summary().ok_or(WizardError::NotConfirmed)?;
        self.presenter
            .copy_payment_link(self.clipboard.as_ref(), summary)?;
        Ok(summary.payment_link.clone())
    }

    /// Drops the current booking and starts over on step 1.
    pub fn restart(&mut self) {
        if let Some(summary) = self.wizard.summary() {
            info!(reference = %summary.reference, "Starting a new booking");
        } else if self.wizard.step() != WizardStep::GarageInfo {
            warn!(step = %self.wizard.step(), "Abandoning unfinished booking");
        }
        self.wizard = fresh_wizard(&self.settings, self.clock.as_ref());
        self.generation += 1;
        self.email_draft.clear();
        self.confirmation_email_sent = None;
        self.publish();
    }
}

fn capture(
    wizard: &BookingWizard,
    email_draft: &str,
    confirmation_email_sent: Option<bool>,
    settings: &SessionSettings,
    presenter: &ConfirmationPresenter,
    now: DateTime<Local>,
) -> SessionSnapshot {
    let verification = wizard.verification();
    let session = verification.session();
    let calendar = wizard.calendar();

    SessionSnapshot {
        step: wizard.step(),
        email: EmailSnapshot {
            draft: email_draft.to_string(),
            code_sent_to: session.email.clone(),
            state: verification.state(),
            status: verification.status_message(),
            attempts: session.attempts,
            attempts_remaining: verification.attempts_remaining(),
            expires_at: session.expires_at,
            resend_available_in: verification.resend_available_in(now),
        },
        garage_info: wizard.garage_info().cloned(),
        cursor: calendar.cursor(),
        time_slots: settings.time_slots.clone(),
        selected_dates: calendar.selected_dates(),
        selected_time: calendar.selected_time(),
        confirmation_details: wizard.confirmation_details().cloned(),
        terms_accepted: wizard.terms_accepted(),
        receipt: wizard.summary().map(|summary| presenter.receipt(summary)),
        confirmation_email_sent,
    }
}
