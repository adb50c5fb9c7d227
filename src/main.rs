use access_gateway::{AppConfig, AppState, Env, create_router};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, compiles the policy table and
/// serves the gateway. Any configuration problem stops startup.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid gateway configuration");

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for the gateway and info for tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "access_gateway=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);

    // 4. Engine and upstream client. Policy misconfiguration is fatal here.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::from_config(config).expect("FATAL: invalid route policy table");

    tracing::info!(
        policies = app_state.gateway.policy_count(),
        upstream = app_state.upstream.base_url(),
        health_check = app_state.gateway.health_check_path(),
        "Policy table compiled"
    );

    // 5. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: server terminated unexpectedly");
}
