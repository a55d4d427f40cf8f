//! Protocol buffer types for Terraform Plugin Protocol 6
//!
//! Generated at build time by tonic_build from `proto/tfplugin6.proto`.
//! Some protobuf types share names with framework types (`DynamicValue`,
//! `Diagnostic`, `Schema`); always refer to these through `proto::`.
//!
//! - RPC request/response types live in snake_case modules
//!   (e.g. `read_resource::Request`)
//! - Nested messages and enums live in sub-modules (e.g. `diagnostic::Severity`)

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
