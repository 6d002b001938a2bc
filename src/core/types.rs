//! Configuration schema for one deployable environment.
//!
//! `StackConfig` is the YAML schema for `molde.yaml`: the target deployment
//! environment (account, region) plus every literal parameter the stack
//! needs. All fields default to the reference environment so an empty file
//! synthesizes a complete stack.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level molde.yaml
// ============================================================================

/// Root configuration — the desired stack for one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name, used in the template description
    #[serde(default = "default_stack_name")]
    pub stack_name: String,

    /// Target AWS account (12 digits)
    #[serde(default = "default_account")]
    pub account: String,

    /// Target AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// ECR repository name
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Image tag the job definition runs
    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    /// S3 object ARN (or pattern) the instance role may read/write
    #[serde(default = "default_bucket_arn")]
    pub bucket_arn: String,

    /// Secrets Manager ARN the instance role may read
    #[serde(default = "default_secret_arn")]
    pub secret_arn: String,

    /// Network layout
    #[serde(default)]
    pub network: NetworkConfig,

    /// Compute environment sizing
    #[serde(default)]
    pub compute: ComputeConfig,

    /// Job definition and queue parameters
    #[serde(default)]
    pub job: JobConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: default_stack_name(),
            account: default_account(),
            region: default_region(),
            repository: default_repository(),
            image_tag: default_image_tag(),
            bucket_arn: default_bucket_arn(),
            secret_arn: default_secret_arn(),
            network: NetworkConfig::default(),
            compute: ComputeConfig::default(),
            job: JobConfig::default(),
        }
    }
}

impl StackConfig {
    /// Container image URI for the job definition:
    /// `{account}.dkr.ecr.{region}.amazonaws.com/{repository}:{tag}`.
    pub fn image_uri(&self) -> String {
        format!(
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
            self.account, self.region, self.repository, self.image_tag
        )
    }
}

fn default_stack_name() -> String {
    "cloudformation-stack".to_string()
}

fn default_account() -> String {
    "123456789012".to_string()
}

fn default_region() -> String {
    "us-west-1".to_string()
}

fn default_repository() -> String {
    "my_ecr_repo".to_string()
}

fn default_image_tag() -> String {
    "hello-world-image".to_string()
}

fn default_bucket_arn() -> String {
    "arn:aws:s3:::my-s3-bucket/*".to_string()
}

fn default_secret_arn() -> String {
    "arn:aws:secretsmanager:us-east-1:123456789012:secret:my-secret-GH69Bf4".to_string()
}

// ============================================================================
// Network
// ============================================================================

/// VPC layout — address space and the public/private subnet partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// VPC address space; each subnet takes a /24 slice
    #[serde(default = "default_cidr")]
    pub cidr: String,

    /// Availability zones to spread subnets over (1–4)
    #[serde(default = "default_max_azs")]
    pub max_azs: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: default_cidr(),
            max_azs: default_max_azs(),
        }
    }
}

fn default_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_max_azs() -> u8 {
    2
}

// ============================================================================
// Compute environment
// ============================================================================

/// EC2-backed compute environment sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeConfig {
    /// Capacity ceiling in vCPUs
    #[serde(default = "default_max_vcpus")]
    pub max_vcpus: u32,

    /// Instance type shortlist, in preference order
    #[serde(default = "default_instance_types")]
    pub instance_types: Vec<String>,

    /// How the scheduler picks instance types as demand grows
    #[serde(default)]
    pub allocation_strategy: AllocationStrategy,

    /// EBS volume size for the instance block device, in GiB
    #[serde(default = "default_volume_size_gib")]
    pub volume_size_gib: u32,

    /// Launch template name
    #[serde(default = "default_launch_template_name")]
    pub launch_template_name: String,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            max_vcpus: default_max_vcpus(),
            instance_types: default_instance_types(),
            allocation_strategy: AllocationStrategy::default(),
            volume_size_gib: default_volume_size_gib(),
            launch_template_name: default_launch_template_name(),
        }
    }
}

fn default_max_vcpus() -> u32 {
    2
}

fn default_instance_types() -> Vec<String> {
    vec![
        "m5.xlarge".to_string(),
        "m5.2xlarge".to_string(),
        "m5.4xlarge".to_string(),
    ]
}

fn default_volume_size_gib() -> u32 {
    50
}

fn default_launch_template_name() -> String {
    "my-launch-template".to_string()
}

/// Allocation strategy for the managed compute environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    BestFit,
    #[default]
    BestFitProgressive,
    SpotCapacityOptimized,
}

impl AllocationStrategy {
    /// The value CloudFormation expects.
    pub fn as_cfn(&self) -> &'static str {
        match self {
            Self::BestFit => "BEST_FIT",
            Self::BestFitProgressive => "BEST_FIT_PROGRESSIVE",
            Self::SpotCapacityOptimized => "SPOT_CAPACITY_OPTIMIZED",
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cfn())
    }
}

// ============================================================================
// Job
// ============================================================================

/// Job definition command and resource requirements, plus queue priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Command line executed inside the container
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// vCPUs reserved for the job
    #[serde(default = "default_job_vcpus")]
    pub vcpus: u32,

    /// Memory reserved for the job, in MiB
    #[serde(default = "default_memory_mib")]
    pub memory_mib: u32,

    /// Job queue priority
    #[serde(default = "default_queue_priority")]
    pub queue_priority: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            vcpus: default_job_vcpus(),
            memory_mib: default_memory_mib(),
            queue_priority: default_queue_priority(),
        }
    }
}

fn default_command() -> Vec<String> {
    vec!["python".to_string(), "hello_world.py".to_string()]
}

fn default_job_vcpus() -> u32 {
    4
}

fn default_memory_mib() -> u32 {
    8192
}

fn default_queue_priority() -> u32 {
    1
}
