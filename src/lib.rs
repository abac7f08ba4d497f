pub mod config;
pub mod domain {
    pub mod cash_code;
    pub mod event;
    pub mod order;
    pub mod outcome;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod cash;
        pub mod ops;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod operator_auth;
    }
}
pub mod mapper;
pub mod repo {
    pub mod cash_codes_repo;
    pub mod orders_repo;
    pub mod webhook_events_repo;
}
pub mod service {
    pub mod cash_codes;
    pub mod notifier;
    pub mod reconciliation;
}

#[derive(Clone)]
pub struct AppState {
    pub reconciliation: service::reconciliation::ReconciliationService,
    pub cash_codes: service::cash_codes::CashCodeService,
    pub config: config::AppConfig,
    pub pool: sqlx::PgPool,
}
