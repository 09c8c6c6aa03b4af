#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use costboard::api::{ApiTransport, QueryParams};
use costboard::error::FetchError;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
enum Scripted {
    Json(Value),
    Status(u16),
    Domain(String),
}

/// In-memory transport with per-path scripted responses.
///
/// Unscripted paths answer 404. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, Scripted>,
    requests: Mutex<Vec<(String, QueryParams)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `{ success: true, data }`.
    pub fn with_data(mut self, path: &str, data: Value) -> Self {
        self.responses
            .insert(path.to_string(), Scripted::Json(envelope(data)));
        self
    }

    /// Respond with a raw body.
    pub fn with_body(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Scripted::Json(body));
        self
    }

    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.responses
            .insert(path.to_string(), Scripted::Status(status));
        self
    }

    /// Respond with `{ success: false, message }`.
    pub fn with_domain_failure(mut self, path: &str, message: &str) -> Self {
        self.responses
            .insert(path.to_string(), Scripted::Domain(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<(String, QueryParams)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn requested_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.requests().into_iter().map(|(p, _)| p).collect();
        paths.sort();
        paths
    }

    pub fn params_for(&self, path: &str) -> Option<QueryParams> {
        self.requests()
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, params)| params)
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((path.to_string(), params.clone()));

        // Let sibling requests interleave like real I/O would.
        tokio::task::yield_now().await;

        match self.responses.get(path) {
            Some(Scripted::Json(body)) => Ok(body.clone()),
            Some(Scripted::Status(status)) => {
                Err(FetchError::status(path, *status, "scripted failure"))
            }
            Some(Scripted::Domain(message)) => Ok(json!({"success": false, "message": message})),
            None => Err(FetchError::status(path, 404, "not scripted")),
        }
    }
}

pub fn envelope(data: Value) -> Value {
    json!({"success": true, "data": data})
}

pub const FIXED_PATHS: [&str; 4] = [
    "/financial/remuneraciones/by-period",
    "/financial/factoring/by-period",
    "/financial/previsionales/by-period",
    "/financial/costos-fijos/by-period",
];

pub const ACCOUNT_CATEGORIES_PATH: &str = "/account-categories/by-period";

pub const DASHBOARD_PATHS: [&str; 8] = [
    "/incomes/dashboard/summary",
    "/incomes/dashboard/by-type",
    "/incomes/dashboard/by-category",
    "/incomes/dashboard/cash-flow",
    "/expenses/dashboard/summary",
    "/expenses/dashboard/by-type",
    "/expenses/dashboard/by-category",
    "/expenses/dashboard/cash-flow",
];

pub fn summary(total: &str, count: u64, trend: f64) -> Value {
    json!({
        "total_amount": total,
        "total_count": count,
        "average_amount": "0",
        "trend_percentage": trend
    })
}

/// A transport where all eight consolidated endpoints succeed.
pub fn dashboard_transport() -> MockTransport {
    MockTransport::new()
        .with_data("/incomes/dashboard/summary", summary("12000000", 18, 12.5))
        .with_data(
            "/incomes/dashboard/by-type",
            json!([{"type_id": 1, "type_name": "Estado de pago", "total_amount": "12000000", "count": 18, "percentage": 100}]),
        )
        .with_data(
            "/incomes/dashboard/by-category",
            json!([{"category_id": 3, "category_name": "Obras civiles", "total_amount": 12000000, "count": "18"}]),
        )
        .with_data(
            "/incomes/dashboard/cash-flow",
            json!([{"period": "2024-01", "total_amount": "5000000", "count": 7}, {"period": "2024-02", "total_amount": "7000000", "count": 11}]),
        )
        .with_data("/expenses/dashboard/summary", summary("9000000", 64, 4.0))
        .with_data(
            "/expenses/dashboard/by-type",
            json!([{"type_id": 2, "type_name": "Orden de compra", "total_amount": "9000000", "count": 64}]),
        )
        .with_data("/expenses/dashboard/by-category", json!([]))
        .with_data(
            "/expenses/dashboard/cash-flow",
            json!([{"period": "2024-01", "total_amount": "4000000", "count": 30}]),
        )
}
