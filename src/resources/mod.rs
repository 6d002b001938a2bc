//! Resource descriptors — one module per resource family.
//!
//! Each descriptor is immutable once built and emits its CloudFormation
//! entries with symbolic references left for the synthesizer to resolve.

pub mod batch;
pub mod compute;
pub mod identity;
pub mod network;
pub mod registry;
