pub mod api;
pub mod data_sources;
pub mod provider;
pub mod provider_data;
pub mod resources;
pub mod translate;

pub use provider::{IbmProvider, ProviderSettings};
pub use provider_data::IbmProviderData;
