//! Registry descriptor — the ECR repository holding the job image.

use crate::core::graph::CfnResource;
use serde_json::json;

/// An ECR repository, known by name.
#[derive(Debug, Clone)]
pub struct Repository {
    logical_id: String,
    name: String,
}

impl Repository {
    pub fn new(logical_id: &str, name: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image URI for a tag in this repository, in the given environment.
    pub fn image_uri(&self, account: &str, region: &str, tag: &str) -> String {
        format!(
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
            account, region, self.name, tag
        )
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::ECR::Repository",
                "Properties": { "RepositoryName": self.name }
            }),
        )
    }
}
