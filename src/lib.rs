pub mod dashboard_views;
pub mod email_screening;
pub mod error;
pub mod order_aggregates;
pub mod order_filter;
pub mod order_loader;
pub mod order_record;
pub mod rules_store;
pub mod sample_data;
pub mod session;
pub mod settings;

pub use dashboard_views::{
    dashboard_query, filter_options_query, fraud_query, geographic_query, inspector_query,
    overview_query, performance_query, products_query, treemap_query, DashboardQueryRequest,
    ViewQuery,
};
pub use email_screening::{
    find_suspicious_emails, DisposableDomainRules, EmailRuleHits, SuspiciousOrder,
    SUSPICIOUS_EMAIL_REASON,
};
pub use error::{LoadError, PipelineError, QueryError, SettingsError};
pub use order_filter::{filter_orders, FilterOptions, FilterSelection, FilteredOrder, FilteredView};
pub use order_loader::{load_orders_from_bytes, load_orders_from_path, load_orders_from_reader};
pub use order_record::OrderRecord;
pub use session::DashboardSession;
pub use settings::DashboardSettings;
