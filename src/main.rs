use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use payment_reconciler::config::AppConfig;
use payment_reconciler::repo::cash_codes_repo::CashCodesRepo;
use payment_reconciler::repo::orders_repo::OrdersRepo;
use payment_reconciler::repo::webhook_events_repo::WebhookEventsRepo;
use payment_reconciler::service::cash_codes::CashCodeService;
use payment_reconciler::service::notifier::Notifier;
use payment_reconciler::service::reconciliation::ReconciliationService;
use payment_reconciler::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let events_repo = WebhookEventsRepo { pool: pool.clone() };
    let orders_repo = OrdersRepo { pool: pool.clone() };
    let cash_codes_repo = CashCodesRepo { pool: pool.clone() };

    let notifier = Notifier {
        client: reqwest::Client::new(),
        endpoint: cfg.notify_url.clone(),
    };

    let reconciliation = ReconciliationService {
        pool: pool.clone(),
        events_repo: events_repo.clone(),
        orders_repo: orders_repo.clone(),
        notifier: notifier.clone(),
        config: cfg.clone(),
    };

    let cash_codes = CashCodeService {
        pool: pool.clone(),
        cash_codes_repo,
        orders_repo,
        events_repo,
        notifier,
        ttl_minutes: cfg.cash_code_ttl_minutes,
    };

    tokio::spawn(cash_codes.clone().run_expiry_sweep());

    let state = AppState {
        reconciliation,
        cash_codes,
        config: cfg.clone(),
        pool,
    };

    let operator_routes = Router::new()
        .route(
            "/payments/cash/confirm",
            post(payment_reconciler::http::handlers::cash::confirm),
        )
        .route(
            "/payments/cash/codes",
            post(payment_reconciler::http::handlers::cash::generate),
        )
        .layer(from_fn_with_state(
            cfg.operator_api_key.clone(),
            payment_reconciler::http::middleware::operator_auth::require_operator_key,
        ));

    let app = Router::new()
        .route(
            "/webhooks/health",
            get(payment_reconciler::http::handlers::webhooks::health),
        )
        .route(
            "/webhooks/:gateway",
            post(payment_reconciler::http::handlers::webhooks::receive),
        )
        .route("/ops/readiness", get(payment_reconciler::http::handlers::ops::readiness))
        .route("/ops/liveness", get(payment_reconciler::http::handlers::ops::liveness))
        .merge(operator_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
