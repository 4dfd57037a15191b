use std::net::SocketAddr;
use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hotel_ops_backend::{
    config::Config,
    db,
    middleware::rate_limit::{create_global_governor, log_request},
    routes,
    services::{
        notify::ConnectionRegistry,
        payment::{PaymentGateway, RestPaymentGateway},
        sweep,
    },
    AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_ops_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    let gateway: Option<Arc<dyn PaymentGateway>> =
        match (&config.gateway_base_url, &config.gateway_secret_key) {
            (Some(url), Some(key)) => {
                tracing::info!("Payment gateway configured at {}", url);
                Some(Arc::new(RestPaymentGateway::new(url.clone(), key.clone())))
            }
            _ => {
                tracing::warn!("No payment gateway configured, card and bank transfer bookings will be rejected");
                None
            }
        };

    let state = AppState {
        db,
        config: config.clone(),
        gateway,
        notifier: Arc::new(ConnectionRegistry::new()),
    };

    // Background reconciliation of trips and room statuses
    sweep::spawn(state.db.clone(), state.notifier.clone(), config.clone());

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(create_global_governor());

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
