use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use storefront_dashboard_lib::{
    dashboard_query, filter_options_query, fraud_query, geographic_query, inspector_query,
    load_orders_from_path, overview_query, performance_query, products_query, treemap_query,
    DashboardQueryRequest, DashboardSettings, QueryError, ViewQuery,
};

/// Answers one dashboard request read as JSON from stdin.
#[derive(Debug, Parser)]
#[command(name = "dashboard_adapter", version)]
struct Args {
    #[arg(long)]
    pretty: bool,
    #[arg(long)]
    verbose: bool,
    /// Settings JSON; falls back to $STOREFRONT_DASHBOARD_SETTINGS, then defaults.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct AdapterRequest {
    schema_version: u64,
    case: Option<AdapterCaseMeta>,
    endpoint: AdapterEndpoint,
    #[serde(default)]
    query: Value,
    dataset: AdapterDataset,
}

#[derive(Debug, Deserialize)]
struct AdapterCaseMeta {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdapterEndpoint {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdapterDataset {
    csv_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct AdapterErrorBody {
    category: String,
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum AdapterResponse {
    #[serde(rename = "success")]
    Success { payload: Value },
    #[serde(rename = "error")]
    Error { error: AdapterErrorBody },
}

/// Failure before or while answering; protocol problems never reach the library.
enum AdapterFailure {
    Protocol(String),
    UnsupportedEndpoint(String),
    Query(QueryError),
}

impl From<QueryError> for AdapterFailure {
    fn from(err: QueryError) -> Self {
        AdapterFailure::Query(err)
    }
}

fn error_response(
    category: impl Into<String>,
    message: impl Into<String>,
    error_type: impl Into<String>,
) -> AdapterResponse {
    AdapterResponse::Error {
        error: AdapterErrorBody {
            category: category.into(),
            message: message.into(),
            error_type: error_type.into(),
        },
    }
}

fn read_stdin_json() -> Result<Value, AdapterFailure> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| AdapterFailure::Protocol(format!("failed to read stdin: {e}")))?;
    if raw.trim().is_empty() {
        return Err(AdapterFailure::Protocol("empty stdin request".to_string()));
    }
    serde_json::from_str::<Value>(&raw)
        .map_err(|e| AdapterFailure::Protocol(format!("invalid JSON request: {e}")))
}

fn resolve_view(path: &str) -> Option<ViewQuery> {
    let view: ViewQuery = match path {
        "/api/dashboard" => dashboard_query,
        "/api/dashboard/filters" => filter_options_query,
        "/api/dashboard/overview" => overview_query,
        "/api/dashboard/performance" => performance_query,
        "/api/dashboard/products" => products_query,
        "/api/dashboard/geographic" => geographic_query,
        "/api/dashboard/fraud" => fraud_query,
        "/api/dashboard/treemap" => treemap_query,
        "/api/dashboard/inspector" => inspector_query,
        _ => return None,
    };
    Some(view)
}

fn dispatch(req: AdapterRequest, settings: &DashboardSettings) -> Result<Value, AdapterFailure> {
    if req.schema_version != 1 {
        return Err(AdapterFailure::Protocol(format!(
            "unsupported schema_version: {}",
            req.schema_version
        )));
    }

    let path = req
        .endpoint
        .path
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdapterFailure::Protocol("request.endpoint.path missing".to_string()))?;
    let view = resolve_view(path).ok_or_else(|| {
        AdapterFailure::UnsupportedEndpoint(format!("unsupported endpoint path: {path}"))
    })?;
    let csv_path = req
        .dataset
        .csv_path
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdapterFailure::Protocol("request.dataset.csv_path missing".to_string()))?;

    let query_req: DashboardQueryRequest = if req.query.is_null() {
        DashboardQueryRequest::default()
    } else {
        serde_json::from_value(req.query).map_err(|e| {
            AdapterFailure::Protocol(format!("request.query invalid for {path}: {e}"))
        })?
    };

    // One request per process, so there is no session to memoise into.
    let orders = load_orders_from_path(Path::new(csv_path)).map_err(QueryError::from)?;
    Ok(view(&orders, &query_req, settings)?)
}

fn load_settings(path: Option<&PathBuf>) -> Result<DashboardSettings, QueryError> {
    let settings = match path {
        Some(p) => DashboardSettings::from_json_file(p)?,
        None => DashboardSettings::from_env()?,
    };
    Ok(settings)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let resp = match load_settings(args.settings.as_ref())
        .map_err(AdapterFailure::from)
        .and_then(|settings| {
            let req = read_stdin_json().and_then(|v| {
                serde_json::from_value::<AdapterRequest>(v)
                    .map_err(|e| AdapterFailure::Protocol(format!("request root invalid: {e}")))
            })?;
            if args.verbose {
                if let Some(case_id) = req.case.as_ref().and_then(|c| c.id.as_deref()) {
                    log::info!("case={case_id}");
                }
                if let Some(path) = req.endpoint.path.as_deref() {
                    log::info!("endpoint={path}");
                }
                if let Some(csv_path) = req.dataset.csv_path.as_deref() {
                    log::info!("dataset={csv_path}");
                }
            }
            dispatch(req, &settings)
        }) {
        Ok(payload) => AdapterResponse::Success { payload },
        Err(AdapterFailure::Protocol(message)) => {
            error_response("ADAPTER_PROTOCOL_ERROR", message, "AdapterError")
        }
        Err(AdapterFailure::UnsupportedEndpoint(message)) => {
            error_response("UNSUPPORTED_ENDPOINT", message, "AdapterError")
        }
        Err(AdapterFailure::Query(err)) => {
            log::warn!("query failed: {err}");
            error_response(err.category(), err.to_string(), "QueryError")
        }
    };

    let out = if args.pretty {
        serde_json::to_string_pretty(&resp)
    } else {
        serde_json::to_string(&resp)
    }
    .unwrap_or_else(|e| {
        json!({
            "status": "error",
            "error": {
                "category": "ADAPTER_PROTOCOL_ERROR",
                "message": format!("serialize response failed: {e}"),
                "type": "SerializeError",
            }
        })
        .to_string()
    });

    print!("{out}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    const CSV: &str = "order_id,order_date,customer_name,customer_email,product_name,category,quantity,price_per_unit,total_price,total_discount,cost_price_per_unit,total_cost,profit,payment_method,state,is_fraud\n\
                       ORD1,2025-10-29,A,a@mailinator.com,Book,Books,1,10,10,0,6,6,4,UPI,CA,0\n";

    fn request(path: &str, csv_path: &Path) -> AdapterRequest {
        serde_json::from_value(json!({
            "schema_version": 1,
            "endpoint": { "path": path },
            "dataset": { "csv_path": csv_path.to_string_lossy() },
        }))
        .expect("adapter request")
    }

    #[test]
    fn dispatch_loads_the_dataset_and_answers_the_view() {
        let csv_path = std::env::temp_dir().join(format!(
            "storefront_adapter_test_{}_{}.csv",
            std::process::id(),
            Uuid::new_v4()
        ));
        fs::write(&csv_path, CSV).expect("write dataset");
        let settings = DashboardSettings::default();

        let payload = match dispatch(request("/api/dashboard/fraud", &csv_path), &settings) {
            Ok(payload) => payload,
            Err(_) => panic!("fraud view failed"),
        };
        assert_eq!(payload["suspicious_email_count"], 1);

        assert!(matches!(
            dispatch(request("/api/unknown", &csv_path), &settings),
            Err(AdapterFailure::UnsupportedEndpoint(_))
        ));
        let _ = fs::remove_file(&csv_path);

        match dispatch(request("/api/dashboard/overview", &csv_path), &settings) {
            Err(AdapterFailure::Query(err)) => assert_eq!(err.category(), "LOAD_ERROR"),
            _ => panic!("expected a load error for a removed dataset"),
        }
    }
}
