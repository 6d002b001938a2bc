//! Config loading and validation.
//!
//! Parses molde.yaml and validates every literal parameter before any graph
//! construction starts:
//! - account/region/repository formats
//! - bucket and secret ARNs must parse and belong to the expected service
//! - ARN account must agree with the declared deployment account
//! - sizing values must be positive, enums in range

use super::arn::Arn;
use super::types::StackConfig;
use crate::resources::network;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a molde.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<StackConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a molde.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<StackConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

fn account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{12}$").unwrap())
}

fn region_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d$").unwrap())
}

fn repository_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:[._/-][a-z0-9]+)*$").unwrap())
}

fn image_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*$").unwrap())
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &StackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError::new(message));

    if config.stack_name.is_empty() {
        push("stack_name must not be empty".to_string());
    }

    if !account_re().is_match(&config.account) {
        push(format!(
            "account must be a 12-digit ID, got \"{}\"",
            config.account
        ));
    }

    if !region_re().is_match(&config.region) {
        push(format!(
            "region \"{}\" does not look like an AWS region",
            config.region
        ));
    }

    if !repository_re().is_match(&config.repository) {
        push(format!(
            "repository \"{}\" is not a valid ECR repository name",
            config.repository
        ));
    }

    if !image_tag_re().is_match(&config.image_tag) {
        push(format!("image_tag \"{}\" is not a valid tag", config.image_tag));
    }

    match Arn::parse_service(&config.bucket_arn, "s3") {
        Ok(_) => {}
        Err(e) => push(format!("bucket_arn: {}", e)),
    }

    match Arn::parse_service(&config.secret_arn, "secretsmanager") {
        Ok(arn) => {
            // The secret may live in another region, but a secret owned by a
            // different account cannot be granted this way.
            if !arn.account.is_empty() && arn.account != config.account {
                push(format!(
                    "secret_arn account \"{}\" does not match deployment account \"{}\"",
                    arn.account, config.account
                ));
            }
        }
        Err(e) => push(format!("secret_arn: {}", e)),
    }

    if config.network.max_azs < 1 || config.network.max_azs > 4 {
        push(format!(
            "network.max_azs must be between 1 and 4, got {}",
            config.network.max_azs
        ));
    }

    match network::parse_cidr(&config.network.cidr) {
        Ok((base, prefix)) => {
            let azs_in_range = (1..=4).contains(&config.network.max_azs);
            if azs_in_range {
                if let Err(e) =
                    network::check_subnet_capacity(base, prefix, config.network.max_azs)
                {
                    push(format!("network.cidr: {}", e));
                }
            }
        }
        Err(e) => push(format!("network.cidr: {}", e)),
    }

    if config.compute.max_vcpus == 0 {
        push("compute.max_vcpus must be at least 1".to_string());
    }

    if config.compute.instance_types.is_empty() {
        push("compute.instance_types must not be empty".to_string());
    }
    for instance_type in &config.compute.instance_types {
        if instance_type.is_empty() {
            push("compute.instance_types contains an empty entry".to_string());
        }
    }

    if config.compute.volume_size_gib == 0 {
        push("compute.volume_size_gib must be at least 1".to_string());
    }

    if config.compute.launch_template_name.is_empty() {
        push("compute.launch_template_name must not be empty".to_string());
    }

    if config.job.command.is_empty() {
        push("job.command must not be empty".to_string());
    }

    if config.job.vcpus == 0 {
        push("job.vcpus must be at least 1".to_string());
    }

    // Batch rejects container jobs below 4 MiB.
    if config.job.memory_mib < 4 {
        push(format!(
            "job.memory_mib must be at least 4, got {}",
            config.job.memory_mib
        ));
    }

    if config.job.queue_priority == 0 {
        push("job.queue_priority must be at least 1".to_string());
    }

    errors
}
