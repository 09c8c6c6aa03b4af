use serde::{Deserialize, Serialize};

use super::{count_or_zero, fetch_data, fetch_list, string_or_empty, SharedTransport};
use crate::api::QueryParams;
use crate::categories::CategoryDescriptor;
use crate::error::FetchError;

/// An income or expense type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    #[serde(default, deserialize_with = "count_or_zero")]
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenter {
    #[serde(default, deserialize_with = "count_or_zero")]
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub code: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub center_type: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CostCenter {
    /// Centers without an explicit flag count as active.
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }
}

/// A value/label pair for a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CostFilterOptions {
    pub cost_centers: Vec<FilterOption>,
    pub categories: Vec<FilterOption>,
    pub statuses: Vec<FilterOption>,
}

/// Income filter dropdowns; client values are tax ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncomeFilterOptions {
    pub cost_centers: Vec<FilterOption>,
    pub clients: Vec<FilterOption>,
    pub statuses: Vec<FilterOption>,
}

#[derive(Debug, Deserialize)]
struct DimensionCenter {
    id: u64,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    name: String,
    #[serde(default, rename = "type")]
    center_type: Option<String>,
}

impl DimensionCenter {
    fn typed_label(&self) -> String {
        match self.center_type.as_deref().filter(|t| !t.is_empty()) {
            Some(kind) => format!("{} ({kind})", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DimensionCategory {
    id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    name: String,
    #[serde(default)]
    group_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DimensionStatus {
    value: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    label: String,
}

impl From<DimensionStatus> for FilterOption {
    fn from(status: DimensionStatus) -> Self {
        FilterOption {
            label: if status.label.is_empty() {
                status.value.clone()
            } else {
                status.label
            },
            value: status.value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DimensionClient {
    tax_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Dimensions {
    #[serde(default)]
    cost_centers: Vec<DimensionCenter>,
    #[serde(default)]
    categories: Vec<DimensionCategory>,
    #[serde(default)]
    statuses: Vec<DimensionStatus>,
}

impl From<Dimensions> for CostFilterOptions {
    fn from(dimensions: Dimensions) -> Self {
        let cost_centers = dimensions
            .cost_centers
            .into_iter()
            .map(|cc| FilterOption {
                value: cc.id.to_string(),
                label: cc.typed_label(),
            })
            .collect();
        let categories = dimensions
            .categories
            .into_iter()
            .map(|cat| FilterOption {
                value: cat.id.to_string(),
                label: match cat.group_name.filter(|g| !g.is_empty()) {
                    Some(group) => format!("{group}: {}", cat.name),
                    None => cat.name,
                },
            })
            .collect();
        Self {
            cost_centers,
            categories,
            statuses: dimensions.statuses.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IncomeDimensions {
    #[serde(default)]
    cost_centers: Vec<DimensionCenter>,
    #[serde(default)]
    clients: Vec<DimensionClient>,
    #[serde(default)]
    statuses: Vec<DimensionStatus>,
}

impl From<IncomeDimensions> for IncomeFilterOptions {
    fn from(dimensions: IncomeDimensions) -> Self {
        let cost_centers = dimensions
            .cost_centers
            .into_iter()
            .map(|cc| {
                let label = match cc.code.as_deref().filter(|c| !c.is_empty()) {
                    Some(code) => format!("{code} - {}", cc.typed_label()),
                    None => cc.typed_label(),
                };
                FilterOption {
                    value: cc.id.to_string(),
                    label,
                }
            })
            .collect();
        let clients = dimensions
            .clients
            .into_iter()
            .map(|client| FilterOption {
                label: format!("{} ({})", client.name, client.tax_id),
                value: client.tax_id,
            })
            .collect();

        Self {
            cost_centers,
            clients,
            statuses: dimensions.statuses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Reference data: types, cost centers, the account-category catalog and
/// the cost and income filter dimensions.
#[derive(Clone)]
pub struct CatalogFetcher {
    transport: SharedTransport,
}

impl CatalogFetcher {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    fn active_only() -> QueryParams {
        QueryParams::new().with("only_active", true)
    }

    /// The type and cost center lists treat a `null` or missing payload as empty.
    pub async fn income_types(&self) -> Result<Vec<TypeRecord>, FetchError> {
        fetch_list(&*self.transport, "/income-types", &Self::active_only()).await
    }

    pub async fn expense_types(&self) -> Result<Vec<TypeRecord>, FetchError> {
        fetch_list(&*self.transport, "/expense-types", &Self::active_only()).await
    }

    pub async fn cost_centers(&self) -> Result<Vec<CostCenter>, FetchError> {
        fetch_list(&*self.transport, "/cost-centers", &QueryParams::new()).await
    }

    pub async fn account_categories(&self) -> Result<Vec<CategoryDescriptor>, FetchError> {
        fetch_data(&*self.transport, "/account-categories", &QueryParams::new()).await
    }

    pub async fn cost_filter_options(&self) -> Result<CostFilterOptions, FetchError> {
        let dimensions: Dimensions =
            fetch_data(&*self.transport, "/costs/dimensions", &QueryParams::new()).await?;
        Ok(dimensions.into())
    }

    pub async fn income_filter_options(&self) -> Result<IncomeFilterOptions, FetchError> {
        let dimensions: IncomeDimensions =
            fetch_data(&*self.transport, "/ingresos/dimensions", &QueryParams::new()).await?;
        Ok(dimensions.into())
    }
}
