//! Molde — declarative AWS Batch stack synthesis.
//!
//! Typed resource descriptors, fail-closed reference resolution,
//! CloudFormation JSON output. The emitted template is handed to the
//! provisioning engine; molde itself never calls a cloud API.

pub mod cli;
pub mod core;
pub mod resources;
