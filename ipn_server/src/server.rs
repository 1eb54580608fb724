use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use ipn_engine::{
    events::{EventHandlers, EventProducers},
    LedgerDatabase,
    MemoryMissCounter,
    MissCounter,
    NotificationFlowApi,
    NotificationVerifier,
    PaypalVerifier,
    ReconciliationApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::{MissCounterBackend, ServerConfig},
    errors::ServerError,
    notifications::mail_hooks,
    routes::{health, PaypalIpnRoute},
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_miss_window(config.miss_window);
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let verifier = PaypalVerifier::new(config.verify_url.clone(), config.verify_timeout)
        .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    info!("🔐️ Notifications will be verified against {}", verifier.url());
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, mail_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    info!("🧮️ Keeping miss counters in the {}", config.miss_counter);
    let srv = match config.miss_counter {
        MissCounterBackend::Database => {
            let misses = db.clone();
            create_server_instance(config, db, misses, verifier, producers)?
        },
        MissCounterBackend::Memory => {
            let misses = MemoryMissCounter::new(config.miss_window);
            create_server_instance(config, db, misses, verifier, producers)?
        },
    };
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Builds the HTTP server. Every worker gets its own API objects, but they share the database pool, the miss
/// counters and the event channels through the clones handed to them here.
pub fn create_server_instance<B, C, V>(
    config: ServerConfig,
    db: B,
    misses: C,
    verifier: V,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: LedgerDatabase + Send + 'static,
    C: MissCounter + Send + 'static,
    V: NotificationVerifier + Clone + Send + 'static,
{
    let options = config.reconciliation_options();
    let server_options = config.server_options();
    let srv = HttpServer::new(move || {
        let reconciler = ReconciliationApi::new(db.clone(), misses.clone(), producers.clone(), options.clone());
        let ipn_api = NotificationFlowApi::new(verifier.clone(), reconciler);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ipn::access_log"))
            .app_data(web::Data::new(ipn_api))
            .app_data(web::Data::new(server_options.clone()))
            .service(health)
            .service(PaypalIpnRoute::<B, C, V>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
