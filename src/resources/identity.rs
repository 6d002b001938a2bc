//! Identity descriptors — policy statements, roles, the instance profile.

use crate::core::arn::Arn;
use crate::core::graph::{CfnResource, Reference};
use serde_json::{json, Value};

/// Whether a statement grants or denies its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_cfn(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// One IAM policy statement: actions, effect, resource ARNs.
///
/// Resources are attached after construction, mirroring how statements are
/// assembled step by step before being handed to a role. Only parsed ARNs
/// are accepted, so a malformed literal never reaches the template.
#[derive(Debug, Clone)]
pub struct PolicyStatement {
    actions: Vec<String>,
    effect: Effect,
    resources: Vec<Arn>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str]) -> Self {
        Self {
            actions: actions.iter().map(|a| a.to_string()).collect(),
            effect: Effect::Allow,
            resources: Vec::new(),
        }
    }

    pub fn add_resource(&mut self, arn: Arn) {
        self.resources.push(arn);
    }

    /// The statement as it appears inside a policy document.
    pub fn document(&self) -> Value {
        json!({
            "Effect": self.effect.as_cfn(),
            "Action": self.actions,
            "Resource": self.resources.iter().map(Arn::to_string).collect::<Vec<_>>(),
        })
    }
}

/// An IAM role: trust principal, managed policies, inline statements.
#[derive(Debug, Clone)]
pub struct Role {
    logical_id: String,
    service_principal: String,
    managed_policy_arns: Vec<String>,
    inline_statements: Vec<PolicyStatement>,
}

impl Role {
    /// A role assumable by an AWS service principal
    /// (e.g. `ec2.amazonaws.com`, `batch.amazonaws.com`).
    pub fn for_service(logical_id: &str, service_principal: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            service_principal: service_principal.to_string(),
            managed_policy_arns: Vec::new(),
            inline_statements: Vec::new(),
        }
    }

    /// Attach a provider-managed policy by its path-qualified name.
    ///
    /// The name is an opaque external identifier; whether the bundle's
    /// permissions are minimal or even correct is the provider's contract,
    /// not something the stack can verify.
    pub fn with_managed_policy(mut self, name: &str) -> Self {
        self.managed_policy_arns
            .push(format!("arn:aws:iam::aws:policy/{}", name));
        self
    }

    /// Attach an inline policy statement.
    pub fn add_to_policy(&mut self, statement: PolicyStatement) {
        self.inline_statements.push(statement);
    }

    pub fn role_ref(&self) -> Reference {
        Reference::id(&self.logical_id)
    }

    pub fn resource(&self) -> CfnResource {
        let mut properties = json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": [self.service_principal] },
                    "Action": ["sts:AssumeRole"],
                }]
            },
            "Path": "/",
            "ManagedPolicyArns": self.managed_policy_arns,
        });

        if !self.inline_statements.is_empty() {
            properties["Policies"] = json!([{
                "PolicyName": format!("{}DefaultPolicy", self.logical_id),
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": self.inline_statements
                        .iter()
                        .map(PolicyStatement::document)
                        .collect::<Vec<_>>(),
                }
            }]);
        }

        CfnResource::new(
            &self.logical_id,
            json!({ "Type": "AWS::IAM::Role", "Properties": properties }),
        )
    }
}

/// Instance profile wrapping one role, so EC2 instances can assume it.
#[derive(Debug, Clone)]
pub struct InstanceProfile {
    logical_id: String,
    role: Reference,
}

impl InstanceProfile {
    pub fn new(logical_id: &str, role: Reference) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            role,
        }
    }

    /// The profile's ARN, for the compute environment's `InstanceRole` field.
    pub fn arn_ref(&self) -> Reference {
        Reference::attr(&self.logical_id, "Arn")
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::IAM::InstanceProfile",
                "Properties": { "Roles": [self.role.token()] }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_statement() -> PolicyStatement {
        let mut statement = PolicyStatement::allow(&["s3:GetObject", "s3:PutObject"]);
        statement.add_resource(Arn::parse("arn:aws:s3:::my-s3-bucket/*").unwrap());
        statement
    }

    #[test]
    fn test_statement_document_shape() {
        let doc = bucket_statement().document();
        assert_eq!(doc["Effect"], "Allow");
        assert_eq!(doc["Action"], json!(["s3:GetObject", "s3:PutObject"]));
        assert_eq!(doc["Resource"], json!(["arn:aws:s3:::my-s3-bucket/*"]));
    }

    #[test]
    fn test_role_trust_principal() {
        let role = Role::for_service("ServiceRole", "batch.amazonaws.com");
        let body = role.resource().body;
        assert_eq!(
            body["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            json!(["batch.amazonaws.com"])
        );
    }

    #[test]
    fn test_role_with_managed_and_inline_policies() {
        let mut role = Role::for_service("InstanceRole", "ec2.amazonaws.com")
            .with_managed_policy("service-role/AmazonEC2ContainerServiceforEC2Role");
        role.add_to_policy(bucket_statement());
        let mut secret = PolicyStatement::allow(&["secretsmanager:GetSecretValue"]);
        secret.add_resource(
            Arn::parse("arn:aws:secretsmanager:us-east-1:123456789012:secret:my-secret-GH69Bf4")
                .unwrap(),
        );
        role.add_to_policy(secret);

        let body = role.resource().body;
        let managed = body["Properties"]["ManagedPolicyArns"].as_array().unwrap();
        assert_eq!(managed.len(), 1);
        assert_eq!(
            managed[0],
            "arn:aws:iam::aws:policy/service-role/AmazonEC2ContainerServiceforEC2Role"
        );

        let statements = body["Properties"]["Policies"][0]["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1]["Action"], json!(["secretsmanager:GetSecretValue"]));
    }

    #[test]
    fn test_role_without_inline_statements_has_no_policies_key() {
        let role = Role::for_service("ServiceRole", "batch.amazonaws.com")
            .with_managed_policy("service-role/AWSBatchServiceRole");
        let body = role.resource().body;
        assert!(body["Properties"].get("Policies").is_none());
    }

    #[test]
    fn test_instance_profile_wraps_role() {
        let role = Role::for_service("InstanceRole", "ec2.amazonaws.com");
        let profile = InstanceProfile::new("InstanceProfile", role.role_ref());
        let body = profile.resource().body;
        assert_eq!(
            body["Properties"]["Roles"][0],
            Reference::id("InstanceRole").token()
        );
        assert_eq!(profile.arn_ref().target(), "InstanceProfile");
    }
}
