use std::sync::Arc;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use prometheus::{Encoder, TextEncoder};
use raid_server::{
    defeat::LoggingNotifier,
    env::Settings,
    metrics,
    ranking::NoProfiles,
    server::end_point,
    store::MemoryStore,
    AppState, LoggerManager, RaidDeps,
};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 1. Load environment variables
    dotenv::dotenv().ok();

    // 2. Load configuration
    let settings = Settings::new().expect("Failed to load settings");

    // 3. Initialize logger
    let logger_manager = Arc::new(LoggerManager::setup(&settings));
    info!("Logger initialized");

    // 4. Shared state store
    //
    // The in-memory store satisfies the same per-key CAS contract a durable
    // backend would; swapping one in is a matter of implementing
    // DocumentStore and changing this line.
    let store = Arc::new(MemoryStore::new());
    info!("Document store initialized");

    // 5. Collaborators (notification delivery, profile lookup)
    let notifier = Arc::new(LoggingNotifier);
    let profiles = Arc::new(NoProfiles);

    // 6. Metrics
    let metrics_registry = prometheus::Registry::new();
    metrics::register_custom_metrics(&metrics_registry).expect("Failed to register custom metrics");
    info!("Metrics initialized and registered");

    // 7. Operation dependencies
    let deps = Arc::new(RaidDeps {
        store,
        raid: settings.raid.clone(),
        retry: settings.retry.clone(),
        notifier,
        profiles,
    });

    // 8. AppState
    let app_state = AppState {
        settings: settings.clone(),
        deps,
        logger_manager,
        metrics_registry: metrics_registry.clone(),
    };

    // 9. Start HTTP server
    let bind_address = format!("{}:{}", settings.server.bind_address, settings.server.port);
    info!("Starting HTTP server on {}", bind_address);

    let mut server = HttpServer::new(move || {
        // /metrics endpoint (optional auth)
        let metrics_route = |req: HttpRequest, state: web::Data<AppState>| async move {
            if let Some(expected_token) = &state.settings.server.metrics_auth_token {
                let auth_header = req.headers().get("Authorization");
                let provided_token = auth_header
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.strip_prefix("Bearer "));

                if provided_token != Some(expected_token.as_str()) {
                    return HttpResponse::Unauthorized()
                        .body("Unauthorized: Invalid or missing token");
                }
            }

            let metric_families = state.metrics_registry.gather();
            let mut buffer = Vec::new();
            let encoder = TextEncoder::new();

            if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                return HttpResponse::InternalServerError()
                    .body(format!("Metrics encode error: {}", e));
            }

            HttpResponse::Ok()
                .content_type(encoder.format_type())
                .body(buffer)
        };

        // Healthcheck endpoints
        let health_route = || async { HttpResponse::Ok().body("OK") };
        let ready_route = || async { HttpResponse::Ok().body("READY") };

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(end_point::current_boss_route)
            .service(end_point::contribution_route)
            .service(end_point::attack_route)
            .service(end_point::ranking_route)
            .route("/metrics", web::get().to(metrics_route))
            .route("/health", web::get().to(health_route))
            .route("/ready", web::get().to(ready_route))
    })
    .bind(&bind_address)?
    .run();

    info!("Raid Server is running on {}", bind_address);

    // 10. Wait for shutdown signal
    tokio::select! {
        res = &mut server => {
            error!("Server exited unexpectedly");
            return res;
        },

        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received. Initiating graceful shutdown...");
        },
    }

    server.await?;
    info!("System has shut down gracefully");

    Ok(())
}
