mod support;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use costboard::api::{CostCenterScope, ReportFilters};
use costboard::cache::CachedDashboard;
use costboard::clock::ManualClock;
use costboard::config::CacheConfig;
use costboard::dashboard::{ConsolidatedDashboardService, OperationalMetrics};
use costboard::error::FailureKind;
use rust_decimal::Decimal;
use serde_json::json;
use support::{dashboard_transport, MockTransport, DASHBOARD_PATHS};

#[tokio::test]
async fn consolidated_snapshot_composes_both_flows() {
    let transport = Arc::new(dashboard_transport());
    let service = ConsolidatedDashboardService::new(transport.clone());

    let data = service.fetch_all_data(&ReportFilters::new()).await.unwrap();

    assert_eq!(data.income.summary.total_amount, Decimal::from(12_000_000));
    assert_eq!(data.income.by_type[0].type_name, "Estado de pago");
    assert_eq!(data.income.by_category[0].count, 18);
    assert_eq!(data.income.cash_flow.len(), 2);
    assert_eq!(data.expense.summary.total_count, 64);
    assert!(data.expense.by_category.is_empty());

    let mut expected: Vec<String> = DASHBOARD_PATHS.iter().map(|p| p.to_string()).collect();
    expected.sort();
    assert_eq!(transport.requested_paths(), expected);

    let kpis = service.calculate_kpis(&data);
    assert_eq!(kpis.net_cash_flow, Decimal::from(3_000_000));
    assert_eq!(kpis.profit_margin, Decimal::from(25));
    assert_eq!(kpis.cash_flow_growth, Decimal::from_str("8.5").unwrap());
    assert_eq!(kpis.income_count, 18);
    assert_eq!(kpis.expense_count, 64);
}

#[tokio::test]
async fn any_single_failure_fails_the_snapshot() {
    for failing in DASHBOARD_PATHS {
        let transport = dashboard_transport().with_status(failing, 503);
        let service = ConsolidatedDashboardService::new(Arc::new(transport));

        let err = service
            .fetch_all_data(&ReportFilters::new())
            .await
            .unwrap_err();
        assert_eq!(err.path(), failing);
        assert_eq!(err.kind(), FailureKind::Transport);
    }
}

#[tokio::test]
async fn domain_failure_fails_the_snapshot() {
    let transport = dashboard_transport()
        .with_domain_failure("/expenses/dashboard/cash-flow", "Error al obtener flujo de caja");
    let service = ConsolidatedDashboardService::new(Arc::new(transport));

    let err = service
        .fetch_all_data(&ReportFilters::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Domain);
    assert!(err.to_string().contains("Error al obtener flujo de caja"));
}

#[tokio::test]
async fn dashboard_queries_only_send_dates_and_cost_center() {
    let transport = Arc::new(dashboard_transport());
    let service = ConsolidatedDashboardService::new(transport.clone());
    let filters = ReportFilters::new()
        .with_cost_center(CostCenterScope::Id(3))
        .with_client("76.123.456-7")
        .with_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        );

    service.fetch_all_data(&filters).await.unwrap();

    let params = transport.params_for("/incomes/dashboard/summary").unwrap();
    assert_eq!(params.get("cost_center_id"), Some("3"));
    assert_eq!(params.get("date_from"), Some("2024-01-01"));
    assert_eq!(params.get("date_to"), Some("2024-03-31"));
    assert_eq!(params.get("client_id"), None);
}

#[tokio::test]
async fn top_transactions_fall_back_per_flow() {
    let transport = MockTransport::new()
        .with_data(
            "/incomes/dashboard/top-transactions",
            json!([
                {"id": 91, "name": "EP N°4 Edificio Alameda", "type_name": "Estado de pago", "category_name": "Obras civiles", "amount": "48000000", "date": "2024-03-28"},
                {"id": 87, "name": "EP N°3 Edificio Alameda", "amount": 31000000, "date": "2024-02-27T00:00:00.000Z"}
            ]),
        )
        .with_status("/expenses/dashboard/top-transactions", 500);
    let transport = Arc::new(transport);
    let service = ConsolidatedDashboardService::new(transport.clone());

    let top = service.top_transactions(5, &ReportFilters::new()).await;

    assert_eq!(top.income.len(), 2);
    assert_eq!(top.income[0].amount, Decimal::from(48_000_000));
    assert_eq!(top.income[1].date, NaiveDate::from_ymd_opt(2024, 2, 27));
    assert_eq!(top.income[1].type_name, "");
    assert!(top.expense.is_empty());

    let params = transport
        .params_for("/incomes/dashboard/top-transactions")
        .unwrap();
    assert_eq!(params.get("limit"), Some("5"));
}

fn catalog_transport() -> MockTransport {
    MockTransport::new()
        .with_data(
            "/income-types",
            json!([{"id": 1, "name": "Estado de pago"}, {"id": 2, "name": "Anticipo"}]),
        )
        .with_data(
            "/expense-types",
            json!([{"id": 1, "name": "Orden de compra"}, {"id": 2, "name": "Boleta de honorarios"}, {"id": 3, "name": "Factura"}]),
        )
        .with_data(
            "/cost-centers",
            json!([
                {"id": 1, "code": "OB-01", "name": "Edificio Alameda", "type": "obra", "is_active": true},
                {"id": 2, "code": "OB-02", "name": "Condominio Los Robles", "type": "obra", "is_active": false},
                {"id": 3, "code": "ADM", "name": "Oficina central", "type": "administrativo"}
            ]),
        )
}

#[tokio::test]
async fn operational_metrics_count_active_records() {
    let transport = Arc::new(catalog_transport());
    let service = ConsolidatedDashboardService::new(transport.clone());

    let metrics = service.operational_metrics(CostCenterScope::All).await;
    assert_eq!(
        metrics,
        OperationalMetrics {
            cost_centers_count: 2,
            income_types_count: 2,
            expense_types_count: 3,
        }
    );

    let params = transport.params_for("/income-types").unwrap();
    assert_eq!(params.get("only_active"), Some("true"));
}

#[tokio::test]
async fn operational_metrics_with_one_cost_center() {
    let service = ConsolidatedDashboardService::new(Arc::new(catalog_transport()));
    let metrics = service.operational_metrics(CostCenterScope::Id(2)).await;
    assert_eq!(metrics.cost_centers_count, 1);
    assert_eq!(metrics.expense_types_count, 3);
}

#[tokio::test]
async fn operational_metrics_fall_back_to_zero() {
    let transport = catalog_transport().with_status("/expense-types", 500);
    let service = ConsolidatedDashboardService::new(Arc::new(transport));

    let metrics = service.operational_metrics(CostCenterScope::All).await;
    assert_eq!(metrics, OperationalMetrics::default());
}

#[tokio::test]
async fn operational_metrics_count_each_source_on_its_own() {
    let transport = MockTransport::new()
        .with_body("/income-types", json!({"success": true, "data": null}))
        .with_data(
            "/expense-types",
            json!([{"name": "Orden de compra"}, {"id": "7", "name": "Factura"}]),
        )
        .with_data(
            "/cost-centers",
            json!([
                {"id": 1, "name": "Edificio Alameda"},
                {"id": null, "name": "Bodega", "is_active": true}
            ]),
        );
    let service = ConsolidatedDashboardService::new(Arc::new(transport));

    let metrics = service.operational_metrics(CostCenterScope::All).await;
    assert_eq!(
        metrics,
        OperationalMetrics {
            cost_centers_count: 2,
            income_types_count: 0,
            expense_types_count: 2,
        }
    );
}

#[tokio::test]
async fn operational_metrics_zero_on_unsuccessful_envelope() {
    let transport = catalog_transport()
        .with_domain_failure("/cost-centers", "Error al obtener centros de costo");
    let service = ConsolidatedDashboardService::new(Arc::new(transport));

    let metrics = service.operational_metrics(CostCenterScope::All).await;
    assert_eq!(metrics, OperationalMetrics::default());
}

#[tokio::test]
async fn cached_dashboard_reuses_fresh_snapshots() {
    let transport = Arc::new(dashboard_transport());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ));
    let config = CacheConfig {
        enabled: true,
        ttl: Duration::from_secs(300),
    };
    let dashboard = CachedDashboard::with_clock(
        ConsolidatedDashboardService::new(transport.clone()),
        &config,
        clock.clone(),
    );
    let filters = ReportFilters::new();

    let first = dashboard.fetch_all_data(&filters).await.unwrap();
    let second = dashboard.fetch_all_data(&filters).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.requests().len(), 8);

    // A different filter tuple is its own entry.
    let scoped = filters.clone().with_cost_center(CostCenterScope::Id(1));
    dashboard.fetch_all_data(&scoped).await.unwrap();
    assert_eq!(transport.requests().len(), 16);

    clock.advance(chrono::Duration::minutes(5));
    dashboard.fetch_all_data(&filters).await.unwrap();
    assert_eq!(transport.requests().len(), 24);
}

#[tokio::test]
async fn cached_dashboard_ignores_fields_dashboard_queries_skip() {
    let transport = Arc::new(dashboard_transport());
    let config = CacheConfig {
        enabled: true,
        ttl: Duration::from_secs(300),
    };
    let dashboard =
        CachedDashboard::new(ConsolidatedDashboardService::new(transport.clone()), &config);
    let base = ReportFilters::new().with_cost_center(CostCenterScope::Id(4));

    dashboard.fetch_all_data(&base).await.unwrap();
    dashboard
        .fetch_all_data(&base.clone().with_client("76.123.456-7"))
        .await
        .unwrap();
    dashboard
        .fetch_all_data(&base.clone().with_status("pagado").with_category("9"))
        .await
        .unwrap();
    assert_eq!(transport.requests().len(), 8);

    dashboard.invalidate(&base.clone().with_client("otro")).await;
    dashboard.fetch_all_data(&base).await.unwrap();
    assert_eq!(transport.requests().len(), 16);
}

#[tokio::test]
async fn disabled_cache_always_fetches() {
    let transport = Arc::new(dashboard_transport());
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let dashboard =
        CachedDashboard::new(ConsolidatedDashboardService::new(transport.clone()), &config);

    dashboard.fetch_all_data(&ReportFilters::new()).await.unwrap();
    dashboard.fetch_all_data(&ReportFilters::new()).await.unwrap();
    assert_eq!(transport.requests().len(), 16);
}
