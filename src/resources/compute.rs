//! Compute descriptors — launch template and the Batch compute environment.

use crate::core::graph::{CfnResource, Reference};
use crate::core::types::{AllocationStrategy, ComputeConfig};
use serde_json::json;

/// Device name instances mount their EBS data volume on.
const BLOCK_DEVICE_NAME: &str = "/dev/xvda";

/// ECS-optimized Amazon Linux 2, the image family Batch schedules onto.
const EC2_IMAGE_TYPE: &str = "ECS_AL2";

/// One block device mapping for the launch template.
#[derive(Debug, Clone)]
pub struct BlockDevice {
    device_name: String,
    volume_size_gib: u32,
}

impl BlockDevice {
    pub fn ebs(volume_size_gib: u32) -> Self {
        Self {
            device_name: BLOCK_DEVICE_NAME.to_string(),
            volume_size_gib,
        }
    }

    fn mapping(&self) -> serde_json::Value {
        json!({
            "DeviceName": self.device_name,
            "Ebs": { "VolumeSize": self.volume_size_gib },
        })
    }
}

/// Launch template with the instances' block devices.
#[derive(Debug, Clone)]
pub struct LaunchTemplate {
    logical_id: String,
    name: String,
    block_devices: Vec<BlockDevice>,
}

impl LaunchTemplate {
    pub fn new(logical_id: &str, name: &str, block_devices: Vec<BlockDevice>) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            name: name.to_string(),
            block_devices,
        }
    }

    pub fn template_ref(&self) -> Reference {
        Reference::id(&self.logical_id)
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::EC2::LaunchTemplate",
                "Properties": {
                    "LaunchTemplateName": self.name,
                    "LaunchTemplateData": {
                        "BlockDeviceMappings": self.block_devices
                            .iter()
                            .map(BlockDevice::mapping)
                            .collect::<Vec<_>>(),
                    }
                }
            }),
        )
    }
}

/// Managed, EC2-backed Batch compute environment.
///
/// Pulls together most of the graph built before it: private subnets, the
/// instance profile, the launch template, and the security group.
#[derive(Debug, Clone)]
pub struct ComputeEnvironment {
    logical_id: String,
    launch_template_name: String,
    max_vcpus: u32,
    instance_types: Vec<String>,
    allocation_strategy: AllocationStrategy,
    subnets: Vec<Reference>,
    instance_profile_arn: Reference,
    launch_template: Reference,
    security_group: Reference,
}

impl ComputeEnvironment {
    pub fn new(
        logical_id: &str,
        compute: &ComputeConfig,
        subnets: Vec<Reference>,
        instance_profile_arn: Reference,
        launch_template: Reference,
        security_group: Reference,
    ) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            launch_template_name: compute.launch_template_name.clone(),
            max_vcpus: compute.max_vcpus,
            instance_types: compute.instance_types.clone(),
            allocation_strategy: compute.allocation_strategy.clone(),
            subnets,
            instance_profile_arn,
            launch_template,
            security_group,
        }
    }

    pub fn environment_ref(&self) -> Reference {
        Reference::id(&self.logical_id)
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::Batch::ComputeEnvironment",
                "Properties": {
                    "Type": "MANAGED",
                    "ComputeResources": {
                        "Type": "EC2",
                        "MaxvCpus": self.max_vcpus,
                        "AllocationStrategy": self.allocation_strategy.as_cfn(),
                        "Subnets": self.subnets.iter().map(Reference::token).collect::<Vec<_>>(),
                        "InstanceRole": self.instance_profile_arn.token(),
                        "InstanceTypes": self.instance_types,
                        "Ec2Configuration": [{ "ImageType": EC2_IMAGE_TYPE }],
                        "LaunchTemplate": {
                            "LaunchTemplateId": self.launch_template.token(),
                            "LaunchTemplateName": self.launch_template_name,
                            "Version": "$Latest",
                        },
                        "SecurityGroupIds": [self.security_group.token()],
                    }
                }
            }),
        )
    }
}
