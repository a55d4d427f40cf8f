//! Enterprise Usage Reports API (v1)

pub mod models;
pub mod pager;

pub use models::*;
pub use pager::{GetResourceUsageReportPager, PagerError};

use tfplug::Context;

use crate::api::client::Client;
use crate::api::error::ApiError;

pub const DEFAULT_URL: &str = "https://enterprise.cloud.ibm.com";

const RESOURCE_USAGE_REPORTS_PATH: &str = "/v1/resource-usage-reports";

pub struct UsageReportsApi<'a> {
    client: &'a Client,
}

impl<'a> UsageReportsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// One page of usage reports for an enterprise, account group or account
    pub async fn get_resource_usage_report(
        &self,
        ctx: &Context,
        options: &GetResourceUsageReportOptions,
    ) -> Result<Reports, ApiError> {
        self.client
            .get_with_params(ctx, RESOURCE_USAGE_REPORTS_PATH, &options.to_query_params())
            .await
    }

    pub fn pager(
        &self,
        options: GetResourceUsageReportOptions,
    ) -> Result<GetResourceUsageReportPager, PagerError> {
        GetResourceUsageReportPager::new(self.client.clone(), options)
    }
}
