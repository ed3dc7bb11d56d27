use std::sync::Arc;

use crate::{
    backend::{Clock, SystemClock},
    configuration::Configuration,
    configuration_handler::ConfigurationHandler,
    http::create_app,
    session::{BookingSession, SessionSettings},
    simulated_backend::{MemoryClipboard, SimulatedBackend},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod backend;
mod calendar;
mod configuration;
mod configuration_handler;
mod confirmation;
mod date_utils;
mod error;
mod http;
mod random;
mod session;
mod simulated_backend;
#[cfg(test)]
mod testutils;
mod types;
mod validation;
mod verification;
mod wizard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("##################");
    println!("# Garage Booking #");
    println!("##################");

    let configuration = ConfigurationHandler::parse_arguments();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = SimulatedBackend::new(
        configuration.service_latency(),
        configuration.service_success_rate(),
        configuration.verification_code_expiry(),
        clock.clone(),
    );
    let session = BookingSession::new(
        SessionSettings::from_configuration(&configuration),
        backend,
        Arc::new(MemoryClipboard::default()),
        clock,
    );
    info!(
        company = %configuration.company_name(),
        time_slots = configuration.time_slots().len(),
        "Booking session ready"
    );

    let address = format!("0.0.0.0:{}", configuration.port());
    println!("Listening on {address}");
    let listener = tokio::net::TcpListener::bind(address).await.unwrap();

    axum::serve(listener, create_app(session)).await.unwrap();
}
