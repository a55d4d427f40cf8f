//! Enterprise usage report bodies and query options

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::common::{ApiQueryParams, Link};

pub const ENTITY_TYPE_ACCOUNT: &str = "account";
pub const ENTITY_TYPE_ACCOUNT_GROUP: &str = "account-group";
pub const ENTITY_TYPE_ENTERPRISE: &str = "enterprise";

/// One page of usage reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,
    #[serde(default)]
    pub reports: Vec<ResourceUsageReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsageReport {
    pub entity_id: String,
    pub entity_type: String,
    pub entity_crn: String,
    pub entity_name: String,
    pub billing_unit_id: String,
    pub billing_unit_crn: String,
    pub billing_unit_name: String,
    pub country_code: String,
    pub currency_code: String,
    pub month: String,
    pub billable_cost: f64,
    pub non_billable_cost: f64,
    pub billable_rated_cost: f64,
    pub non_billable_rated_cost: f64,
    #[serde(default)]
    pub resources: Vec<ResourceUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource_id: String,
    pub billable_cost: f64,
    pub billable_rated_cost: f64,
    pub non_billable_cost: f64,
    pub non_billable_rated_cost: f64,
    #[serde(default)]
    pub plans: Vec<PlanUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanUsage {
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_plan_id: Option<String>,
    pub billable: bool,
    pub cost: f64,
    pub rated_cost: f64,
    #[serde(default)]
    pub usage: Vec<MetricUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricUsage {
    pub metric: String,
    pub unit: String,
    pub quantity: f64,
    pub rateable_quantity: f64,
    pub cost: f64,
    pub rated_cost: f64,
    /// Pricing tiers, passed through as returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Vec<Map<String, Value>>>,
}

/// Filters for `GET /v1/resource-usage-reports`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetResourceUsageReportOptions {
    pub enterprise_id: Option<String>,
    pub account_group_id: Option<String>,
    pub account_id: Option<String>,
    pub children: Option<bool>,
    /// Billing month, `yyyy-mm`
    pub month: Option<String>,
    pub billing_unit_id: Option<String>,
    pub limit: Option<i64>,
    /// Opaque cursor taken from a previous page's `next.href`
    pub offset: Option<String>,
}

impl GetResourceUsageReportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enterprise_id(mut self, id: impl Into<String>) -> Self {
        self.enterprise_id = Some(id.into());
        self
    }

    pub fn account_group_id(mut self, id: impl Into<String>) -> Self {
        self.account_group_id = Some(id.into());
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = Some(id.into());
        self
    }

    pub fn children(mut self, children: bool) -> Self {
        self.children = Some(children);
        self
    }

    pub fn month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn billing_unit_id(mut self, id: impl Into<String>) -> Self {
        self.billing_unit_id = Some(id.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: impl Into<String>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_optional("enterprise_id", self.enterprise_id.as_deref())
            .add_optional("account_group_id", self.account_group_id.as_deref())
            .add_optional("account_id", self.account_id.as_deref())
            .add_optional("children", self.children)
            .add_optional("month", self.month.as_deref())
            .add_optional("billing_unit_id", self.billing_unit_id.as_deref())
            .add_optional("limit", self.limit)
            .add_optional("offset", self.offset.as_deref())
    }
}
