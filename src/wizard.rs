use crate::{
    calendar::CalendarEngine,
    date_utils::{add_days, format_date},
    error::WizardError,
    random,
    types::{BookingSummary, ConfirmationDetails, GarageInfo, WizardStep},
    validation::GarageForm,
    verification::EmailVerificationFlow,
};
use chrono::{DateTime, Datelike, Local};
use tracing::info;

pub const SERVICE_LABEL: &str = "Forfait journée 7 heures";
pub const SERVICE_MINUTES: u32 = 7 * 60;
pub const PAYMENT_VALIDITY_DAYS: i64 = 7;

/// Three step booking: garage details, schedule, confirmation.
///
/// Forward moves are gated, backward moves are not. Nothing is reset when going back, so the
/// calendar selection and the verified address survive a round trip. Once confirmed, the wizard
/// accepts no further transition.
#[derive(Debug, Clone)]
pub struct BookingWizard {
    step: WizardStep,
    calendar: CalendarEngine,
    verification: EmailVerificationFlow,
    garage_info: Option<GarageInfo>,
    confirmation_details: Option<ConfirmationDetails>,
    terms_accepted: bool,
    summary: Option<BookingSummary>,
}

impl BookingWizard {
    pub fn new(calendar: CalendarEngine, verification: EmailVerificationFlow) -> Self {
        Self {
            step: WizardStep::GarageInfo,
            calendar,
            verification,
            garage_info: None,
            confirmation_details: None,
            terms_accepted: false,
            summary: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn calendar(&self) -> &CalendarEngine {
        &self.calendar
    }

    pub fn verification(&self) -> &EmailVerificationFlow {
        &self.verification
    }

    pub fn verification_mut(&mut self) -> &mut EmailVerificationFlow {
        &mut self.verification
    }

    pub fn garage_info(&self) -> Option<&GarageInfo> {
        self.garage_info.as_ref()
    }

    pub fn confirmation_details(&self) -> Option<&ConfirmationDetails> {
        self.confirmation_details.as_ref()
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn summary(&self) -> Option<&BookingSummary> {
        self.summary.as_ref()
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        match self.summary {
            Some(_) => Err(WizardError::AlreadyConfirmed),
            None => Ok(()),
        }
    }

    pub fn ensure_step(&self, expected: WizardStep) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.step != expected {
            return Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    /// Calendar access for the scheduling step only.
    pub fn calendar_mut(&mut self) -> Result<&mut CalendarEngine, WizardError> {
        self.ensure_step(WizardStep::Schedule)?;
        Ok(&mut self.calendar)
    }

    /// Month navigation doesn't touch the selection and is allowed until confirmation.
    pub fn navigate_calendar(&mut self, forward: bool) -> Result<(), WizardError> {
        self.ensure_open()?;
        match forward {
            true => self.calendar.go_to_next_month(),
            false => self.calendar.go_to_previous_month(),
        }
        Ok(())
    }

    pub fn advance_from_step1(&mut self, form: &GarageForm) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::GarageInfo)?;

        match self.verification.verified_email() {
            Some(verified) if verified == form.email.trim() => {}
            _ => return Err(WizardError::EmailNotVerified),
        }
        form.check().map_err(WizardError::FormInvalid)?;

        let garage_info = form.to_garage_info(true);
        info!(garage = %garage_info.name, "Garage information saved");
        self.garage_info = Some(garage_info);
        self.step = WizardStep::Schedule;
        Ok(())
    }

    pub fn advance_from_step2(&mut self) -> Result<&ConfirmationDetails, WizardError> {
        self.ensure_step(WizardStep::Schedule)?;

        if !self.calendar.has_selection() {
            return Err(WizardError::NoSelection);
        }
        let time = self.calendar.selected_time().ok_or(WizardError::NoSelection)?;
        let garage_info = self.garage_info.as_ref().ok_or(WizardError::WrongStep {
            expected: WizardStep::GarageInfo,
            actual: self.step,
        })?;

        let details = ConfirmationDetails {
            garage_name: garage_info.name.clone(),
            manager_name: garage_info.manager_name.clone(),
            dates: self
                .calendar
                .selected_dates()
                .into_iter()
                .map(format_date)
                .collect(),
            time,
            service: SERVICE_LABEL.to_string(),
        };
        info!(dates = details.dates.len(), time = %details.time, "Schedule chosen");
        self.step = WizardStep::Confirmation;
        Ok(self.confirmation_details.insert(details))
    }

    pub fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;
        let previous = self.step.previous().ok_or(WizardError::AtFirstStep)?;
        info!(from = %self.step, to = %previous, "Going back");
        self.step = previous;
        Ok(previous)
    }

    pub fn set_terms_accepted(&mut self, accepted: bool) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.terms_accepted = accepted;
        Ok(())
    }

    /// Finalizes the booking. Terminal: every later transition fails with `AlreadyConfirmed`.
    pub fn confirm(
        &mut self,
        now: DateTime<Local>,
        payment_link: &str,
    ) -> Result<BookingSummary, WizardError> {
        self.ensure_step(WizardStep::Confirmation)?;
        if !self.terms_accepted {
            return Err(WizardError::TermsNotAccepted);
        }
        let (Some(time), Some(garage_info)) =
            (self.calendar.selected_time(), self.garage_info.clone())
        else {
            return Err(WizardError::NoSelection);
        };

        let summary = BookingSummary {
            reference: random::booking_reference(now.year()),
            garage_info,
            dates: self.calendar.selected_dates(),
            time,
            confirmed_at: now,
            payment_link: payment_link.to_string(),
            payment_due: add_days(now.date_naive(), PAYMENT_VALIDITY_DAYS),
        };
        info!(reference = %summary.reference, "Booking confirmed");
        self.summary = Some(summary.clone());
        Ok(summary)
    }
}
