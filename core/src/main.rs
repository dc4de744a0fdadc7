mod cors;

use std::{io, sync::Arc};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_subs::{PaymentGateway, PurchaseService, StripeGateway, SubscriptionService};
use api_usage::{ContentGenerator, HttpGenerator};
use common::env_config::Config;
use db::{EntitlementStore, PgStore};
use entitlements::{EntitlementEngine, OneOffPrice, PlanCatalog};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(is_production)
            .map_err(|e| io::Error::other(format!("Failed to set up logger: {}", e)))?;
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .map_err(|e| io::Error::other(format!("Failed to set up database: {}", e)))?;
    let store: Arc<dyn EntitlementStore> = Arc::new(PgStore::new(pool));

    // plans, quotas and the engine deciding on them
    let catalog = Arc::new(PlanCatalog::default());
    let engine = web::Data::new(EntitlementEngine::new(
        store.clone(),
        catalog.clone(),
        OneOffPrice {
            amount_minor_units: config.billing.one_off_download_price,
            currency: config.billing.default_currency.clone(),
        },
    ));

    // collaborators
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(StripeGateway::new(&config.billing.stripe_secret_key));
    let generator: Arc<dyn ContentGenerator> = Arc::new(
        HttpGenerator::new(&config.generation)
            .map_err(|e| io::Error::other(format!("Failed to build generation client: {}", e)))?,
    );

    let subs = web::Data::new(SubscriptionService::new(
        store.clone(),
        catalog,
        gateway.clone(),
        config.billing.optimistic_activation,
    ));
    let purchases = web::Data::new(PurchaseService::new(store, gateway));
    let generator = web::Data::from(generator);

    if config.billing.optimistic_activation {
        log::warn!("Optimistic activation is on: pending payments activate subscriptions");
    }
    log::info!(
        "Listening on {}:{} with {} workers",
        config.server_host,
        config.server_port,
        config.num_workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(engine.clone())
            .app_data(subs.clone())
            .app_data(purchases.clone())
            .app_data(generator.clone())
            .wrap(limiter::global_middleware(config_data.global_rate_limit)) // 4th
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 3rd
            .wrap(extractor::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_subs::mount_plans())
                    .service(api_subs::mount_webhook())
                    .service(
                        web::scope("/dashboard")
                            .wrap(extractor::auth_middleware())
                            .service(api_subs::mount_subs())
                            .service(api_subs::mount_purchase())
                            .service(api_usage::mount_usage())
                            .service(api_usage::mount_generate())
                            .service(api_usage::mount_resume()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
