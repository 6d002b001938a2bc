//! The stack definition — one deployable environment, built in strict
//! dependency order.
//!
//! Each step constructs descriptors that may only reference descriptors from
//! earlier steps; `StackGraph::add` enforces this, so a wiring mistake here
//! fails the build instead of producing a broken template.

use super::arn::Arn;
use super::graph::{BuildError, StackGraph};
use super::types::StackConfig;
use crate::resources::batch::{JobDefinition, JobQueue};
use crate::resources::compute::{BlockDevice, ComputeEnvironment, LaunchTemplate};
use crate::resources::identity::{InstanceProfile, PolicyStatement, Role};
use crate::resources::network::{SecurityGroup, Vpc};
use crate::resources::registry::Repository;

/// Build the complete resource graph for a config.
///
/// No side effects: the result is an in-memory graph, handed to the
/// synthesizer for reference resolution and serialization.
pub fn build_stack(config: &StackConfig) -> Result<StackGraph, BuildError> {
    let mut graph = StackGraph::new();

    // Network: VPC with public/private subnets and routing
    let vpc = Vpc::new("Vpc", &config.region, &config.network)?;
    graph.add_all(vpc.resources())?;
    log::debug!("stack: network built ({} resources)", graph.len());

    // Registry for the job's container images
    let repository = Repository::new("EcrRepo", &config.repository);
    graph.add(repository.resource())?;

    // Object read/write on one bucket, secret read on one secret
    let mut bucket_statement = PolicyStatement::allow(&["s3:GetObject", "s3:PutObject"]);
    bucket_statement.add_resource(
        Arn::parse_service(&config.bucket_arn, "s3").map_err(BuildError::MalformedArn)?,
    );

    let mut secret_statement = PolicyStatement::allow(&["secretsmanager:GetSecretValue"]);
    secret_statement.add_resource(
        Arn::parse_service(&config.secret_arn, "secretsmanager")
            .map_err(BuildError::MalformedArn)?,
    );

    // Role the EC2 instances assume
    let mut instance_role = Role::for_service("InstanceRole", "ec2.amazonaws.com")
        .with_managed_policy("service-role/AmazonEC2ContainerServiceforEC2Role");
    instance_role.add_to_policy(bucket_statement);
    instance_role.add_to_policy(secret_statement);
    graph.add(instance_role.resource())?;

    // Role the Batch service assumes. Emitted but not wired into the
    // compute environment, which relies on the service-linked default.
    let service_role = Role::for_service("ServiceRole", "batch.amazonaws.com")
        .with_managed_policy("service-role/AWSBatchServiceRole");
    graph.add(service_role.resource())?;

    let instance_profile = InstanceProfile::new("InstanceProfile", instance_role.role_ref());
    graph.add(instance_profile.resource())?;

    let security_group = SecurityGroup::new("SecurityGroup", vpc.vpc_ref());
    graph.add(security_group.resource())?;

    let launch_template = LaunchTemplate::new(
        "LaunchTemplate",
        &config.compute.launch_template_name,
        vec![BlockDevice::ebs(config.compute.volume_size_gib)],
    );
    graph.add(launch_template.resource())?;

    let environment = ComputeEnvironment::new(
        "ComputeEnvironment",
        &config.compute,
        vpc.private_subnet_refs(),
        instance_profile.arn_ref(),
        launch_template.template_ref(),
        security_group.group_ref(),
    );
    graph.add(environment.resource())?;

    let queue = JobQueue::new(
        "JobQueue",
        config.job.queue_priority,
        vec![(environment.environment_ref(), 1)],
    );
    graph.add(queue.resource())?;

    let definition = JobDefinition::new(
        "JobDefinition",
        &repository.image_uri(&config.account, &config.region, &config.image_tag),
        &config.job,
    );
    graph.add(definition.resource())?;

    log::debug!("stack: built {} resources", graph.len());
    Ok(graph)
}
