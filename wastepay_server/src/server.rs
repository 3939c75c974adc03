use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use log::*;
use wastepay_engine::{
    dispatcher::{register_commands, Dispatcher, EngineContext},
    events::{EventHandlers, EventHooks, EventProducers},
    provider::SimulatedProvider,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    reconcile_worker::start_reconcile_worker,
    routes::{accept_order_payment, balance, create_wallet, estimate, health, payment, submit_order, transactions},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🗃️ Database migrations are up to date");
    }
    let handlers = EventHandlers::new(128, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let _worker = start_reconcile_worker(
        db.clone(),
        producers.clone(),
        config.reconcile_interval,
        config.unpaid_order_timeout,
    );
    let dispatcher = build_dispatcher(&config, db, producers)?;
    let srv = create_server_instance(config, dispatcher)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires every engine command to its handler. Fails if the handler registry is inconsistent.
pub fn build_dispatcher(
    config: &ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Dispatcher, ServerError> {
    let provider = Arc::new(SimulatedProvider::new(config.provider_latency));
    let context = EngineContext::new(db, provider, producers);
    let dispatcher = register_commands(Dispatcher::builder(), context).build()?;
    Ok(dispatcher)
}

/// Notifications to the users involved are delivered by the notification service. Until it subscribes, the events are
/// logged.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_cancelled(|ev| {
            Box::pin(async move {
                info!("📬️ Order #{} was cancelled. {} participants were refunded", ev.order.id, ev.refunds.len());
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_payment_completed(|ev| {
            Box::pin(async move {
                debug!("📬️ {} payment [{}] completed", ev.attempt.method, ev.attempt.idempotency_key);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    hooks
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Rejected request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}

/// Registers the routes. `/health` sits at the root, everything else under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/api")
            .service(balance)
            .service(transactions)
            .service(create_wallet)
            .service(estimate)
            .service(payment)
            .service(submit_order)
            .service(accept_order_payment),
    );
}

pub fn create_server_instance(config: ServerConfig, dispatcher: Dispatcher) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("wps::access_log"))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .configure(configure_routes)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
