use crate::{
    backend::{BookingBackend, Clipboard},
    date_utils::{format_date, format_duration},
    error::ServiceFailure,
    types::{BookingSummary, CalendarDate, TimeSlot},
    wizard::{PAYMENT_VALIDITY_DAYS, SERVICE_LABEL, SERVICE_MINUTES},
};
use serde::Serialize;
use std::fmt::Write;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub reference: String,
    pub garage: String,
    pub dates: Vec<String>,
    pub time: TimeSlot,
    pub service: String,
    pub duration: String,
    pub email: String,
    pub payment_link: String,
    pub payment_validity: String,
    pub payment_due: CalendarDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Turns a confirmed booking into what the customer gets to see.
#[derive(Debug, Clone)]
pub struct ConfirmationPresenter {
    company_name: String,
}

impl ConfirmationPresenter {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }

    pub fn receipt(&self, summary: &BookingSummary) -> Receipt {
        Receipt {
            reference: summary.reference.clone(),
            garage: summary.garage_info.name.clone(),
            dates: summary.dates.iter().copied().map(format_date).collect(),
            time: summary.time.clone(),
            service: SERVICE_LABEL.to_string(),
            duration: format_duration(SERVICE_MINUTES),
            email: summary.garage_info.email.clone(),
            payment_link: summary.payment_link.clone(),
            payment_validity: format!("Valable {PAYMENT_VALIDITY_DAYS} jours"),
            payment_due: summary.payment_due,
        }
    }

    pub fn confirmation_email(&self, summary: &BookingSummary) -> EmailMessage {
        let company = &self.company_name;
        let mut dates = String::new();
        for date in &summary.dates {
            let _ = writeln!(dates, "- {}", format_date(*date));
        }

        let body = format!(
            "Bonjour {manager},\n\
             \n\
             Votre rendez-vous avec {company} a été confirmé avec succès.\n\
             \n\
             Détails du rendez-vous:\n\
             - Garage: {garage}\n\
             - Dates: \n\
             {dates}\
             - Horaire: {time}\n\
             - Référence: {reference}\n\
             \n\
             Pour effectuer le paiement, veuillez cliquer sur le lien suivant:\n\
             {link}\n\
             \n\
             Cordialement,\n\
             L'équipe {company}",
            manager = summary.garage_info.manager_name,
            garage = summary.garage_info.name,
            time = summary.time,
            reference = summary.reference,
            link = summary.payment_link,
        );

        EmailMessage {
            to: summary.garage_info.email.clone(),
            subject: format!("Confirmation de votre rendez-vous {company}"),
            body,
        }
    }

    pub async fn send_confirmation<B: BookingBackend>(
        &self,
        backend: &B,
        summary: &BookingSummary,
    ) -> Result<(), ServiceFailure> {
        let email = self.confirmation_email(summary);
        match backend
            .send_email(&email.to, &email.subject, &email.body)
            .await
        {
            Ok(()) => {
                info!(reference = %summary.reference, to = %email.to, "Confirmation email sent");
                Ok(())
            }
            Err(err) => {
                warn!(reference = %summary.reference, %err, "Confirmation email could not be sent");
                Err(err)
            }
        }
    }

    pub fn copy_payment_link(
        &self,
        clipboard: &dyn Clipboard,
        summary: &BookingSummary,
    ) -> Result<(), ServiceFailure> {
        match clipboard.copy(&summary.payment_link) {
            true => Ok(()),
            false => {
                warn!("Payment link could not be copied");
                Err(ServiceFailure::Clipboard)
            }
        }
    }
}
