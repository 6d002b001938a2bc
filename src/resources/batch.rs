//! Batch descriptors — the job queue and the job definition.

use crate::core::graph::{CfnResource, Reference};
use crate::core::types::JobConfig;
use serde_json::json;

/// Job queue routing work to compute environments by order.
#[derive(Debug, Clone)]
pub struct JobQueue {
    logical_id: String,
    priority: u32,
    environments: Vec<(Reference, u32)>,
}

impl JobQueue {
    pub fn new(logical_id: &str, priority: u32, environments: Vec<(Reference, u32)>) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            priority,
            environments,
        }
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::Batch::JobQueue",
                "Properties": {
                    "Priority": self.priority,
                    "ComputeEnvironmentOrder": self.environments
                        .iter()
                        .map(|(environment, order)| json!({
                            "ComputeEnvironment": environment.token(),
                            "Order": order,
                        }))
                        .collect::<Vec<_>>(),
                }
            }),
        )
    }
}

/// Container job definition: image, command, resource requirements.
///
/// Batch expects requirement values as strings, not numbers.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    logical_id: String,
    image: String,
    command: Vec<String>,
    vcpus: u32,
    memory_mib: u32,
}

impl JobDefinition {
    pub fn new(logical_id: &str, image: &str, job: &JobConfig) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            image: image.to_string(),
            command: job.command.clone(),
            vcpus: job.vcpus,
            memory_mib: job.memory_mib,
        }
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::Batch::JobDefinition",
                "Properties": {
                    "Type": "container",
                    "ContainerProperties": {
                        "Image": self.image,
                        "Command": self.command,
                        "ResourceRequirements": [
                            { "Type": "VCPU", "Value": self.vcpus.to_string() },
                            { "Type": "MEMORY", "Value": self.memory_mib.to_string() },
                        ],
                    }
                }
            }),
        )
    }
}
