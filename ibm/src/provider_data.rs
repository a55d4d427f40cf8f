//! Provider data structure passed to resources and data sources

use std::any::Any;
use std::sync::Arc;

use tfplug::types::Diagnostic;

use crate::api::Client;

#[derive(Clone)]
pub struct IbmProviderData {
    /// Bound to the Tekton pipeline endpoint
    pub tekton: Client,
    /// Bound to the enterprise usage reports endpoint
    pub usage_reports: Client,
}

impl IbmProviderData {
    pub fn new(tekton: Client, usage_reports: Client) -> Self {
        Self {
            tekton,
            usage_reports,
        }
    }

    /// Recovers the provider data handed to a resource or data source
    pub fn from_provider_data(
        data: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Self, Diagnostic> {
        let data = data.ok_or_else(|| {
            Diagnostic::error("No provider data", "Provider data was not provided")
        })?;
        match data.downcast_ref::<IbmProviderData>() {
            Some(data) => Ok(data.clone()),
            None => {
                tracing::error!("Failed to downcast provider data to IbmProviderData");
                Err(Diagnostic::error(
                    "Invalid provider data",
                    "Expected IbmProviderData",
                ))
            }
        }
    }
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}
