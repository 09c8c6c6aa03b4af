use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use costboard::aggregation::{AggregationRequest, FinancialAggregationService};
use costboard::api::{ApiTransport, CostCenterScope, EnvTokenSource, HttpApiClient, ReportFilters};
use costboard::cache::CachedDashboard;
use costboard::categories::categories_by_type;
use costboard::clock::{Clock, SystemClock};
use costboard::config::{default_config_path, Config};
use costboard::dashboard::ConsolidatedDashboardService;
use costboard::fetchers::CatalogFetcher;
use costboard::periods::Granularity;
use costboard::report::{config_output, dashboard_output, PeriodTable};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "costboard")]
#[command(about = "Period aggregation and KPI rollups for construction finance dashboards")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show resolved configuration
    Config,

    /// Consolidated income/expense snapshot with KPIs
    Dashboard {
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,
        /// Cost center id, or "all"
        #[arg(long, default_value = "all")]
        cost_center: CostCenterScope,
    },

    /// Merged per-period category table
    Periods {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
        /// weekly, monthly, quarterly or annual
        #[arg(long)]
        period: Option<Granularity>,
        #[arg(long, default_value = "all")]
        cost_center: CostCenterScope,
        /// Print a text table instead of JSON
        #[arg(long)]
        table: bool,
    },

    /// Largest income and expense transactions
    Top {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,
    },

    /// Active cost center, income type and expense type counts
    Metrics {
        #[arg(long, default_value = "all")]
        cost_center: CostCenterScope,
    },

    /// Account category catalog grouped by type
    Categories,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .json(),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn transport(config: &Config) -> Result<Arc<dyn ApiTransport>> {
    let tokens = Arc::new(EnvTokenSource::new(config.api.token_env.clone()));
    let client = HttpApiClient::new(&config.api, tokens)?;
    debug!(base_url = client.base_url(), "api client ready");
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load costboard config: {}", cli.config.display()))?;
    config.apply_env_overrides()?;

    match cli.command {
        Command::Config => print_json(&config_output(&cli.config, &config))?,

        Command::Dashboard {
            from,
            to,
            cost_center,
        } => {
            let service = ConsolidatedDashboardService::new(transport(&config)?);
            let dashboard = CachedDashboard::new(service, &config.cache);
            let filters = ReportFilters::new()
                .with_date_range(from, to)
                .with_cost_center(cost_center);

            let data = dashboard
                .fetch_all_data(&filters)
                .await
                .context("Failed to load consolidated dashboard")?;
            let kpis = dashboard.service().calculate_kpis(&data);
            print_json(&dashboard_output(&data, &kpis, &config.display))?;
        }

        Command::Periods {
            year,
            period,
            cost_center,
            table,
        } => {
            let year = year.unwrap_or_else(|| SystemClock.current_year());
            let granularity = period.unwrap_or(config.dashboard.default_period_type);
            let transport = transport(&config)?;

            let request =
                AggregationRequest::for_year(year, granularity).with_cost_center(cost_center);
            let service = FinancialAggregationService::new(transport.clone());
            let catalog = CatalogFetcher::new(transport);

            let (data, known) =
                tokio::join!(service.all_financial_data(&request), catalog.account_categories());
            // Names still resolve from the observed rows when the catalog is down.
            let known = known.unwrap_or_else(|err| {
                warn!(error = %err, "account category catalog unavailable");
                data.dynamic_descriptors().to_vec()
            });

            let period_table = PeriodTable::build(&data, &request.periods, &known);
            if table {
                print!("{}", period_table.render(&config.display));
            } else {
                print_json(&serde_json::json!({
                    "year": year,
                    "period_type": granularity,
                    "periods": request.periods,
                    "data": data,
                    "table": period_table,
                }))?;
            }
        }

        Command::Top { limit, from, to } => {
            let service = ConsolidatedDashboardService::new(transport(&config)?);
            let limit = limit.unwrap_or(config.dashboard.top_transactions_limit);
            let filters = ReportFilters::new().with_date_range(from, to);
            print_json(&service.top_transactions(limit, &filters).await)?;
        }

        Command::Metrics { cost_center } => {
            let service = ConsolidatedDashboardService::new(transport(&config)?);
            print_json(&service.operational_metrics(cost_center).await)?;
        }

        Command::Categories => {
            let catalog = CatalogFetcher::new(transport(&config)?);
            let descriptors = catalog
                .account_categories()
                .await
                .context("Failed to load account categories")?;
            let grouped: serde_json::Map<String, serde_json::Value> =
                categories_by_type(&descriptors)
                    .into_iter()
                    .map(|(category_type, list)| -> Result<(String, serde_json::Value)> {
                        Ok((category_type.to_string(), serde_json::to_value(list)?))
                    })
                    .collect::<Result<_>>()?;
            print_json(&grouped)?;
        }
    }

    Ok(())
}
