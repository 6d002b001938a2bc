//! The resource graph — logical IDs, symbolic references, fail-fast checks.
//!
//! Descriptors emit CloudFormation bodies containing marker objects
//! (`Molde::Ref`, `Molde::GetAtt`) instead of engine intrinsics. The graph
//! validates at insertion time that every marker and `DependsOn` entry points
//! at an already-constructed resource, so the graph is a DAG by construction
//! order. The synthesizer later rewrites markers into `Ref`/`Fn::GetAtt`.

use indexmap::IndexMap;
use serde_json::{json, Value};
use std::fmt;

/// Marker key for a logical-ID reference.
pub const REF_MARKER: &str = "Molde::Ref";

/// Marker key for an attribute lookup on another resource.
pub const GET_ATT_MARKER: &str = "Molde::GetAtt";

/// A build-time configuration error. Unrecoverable: the build aborts and no
/// template is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A logical ID was used twice.
    DuplicateId(String),
    /// A reference points at a resource not yet in the graph.
    UnknownReference { from: String, target: String },
    /// An ARN literal failed to parse.
    MalformedArn(String),
    /// A field holds a value outside its supported range or charset.
    InvalidValue { field: String, reason: String },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate logical ID '{}'", id),
            Self::UnknownReference { from, target } => write!(
                f,
                "resource '{}' references '{}', which is not (yet) in the graph",
                from, target
            ),
            Self::MalformedArn(detail) => write!(f, "{}", detail),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid value for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// A symbolic reference to another resource in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// The resource's own return value (`Ref` semantics).
    Id(String),
    /// An attribute of the resource (`Fn::GetAtt` semantics).
    Attr(String, String),
}

impl Reference {
    pub fn id(target: &str) -> Self {
        Self::Id(target.to_string())
    }

    pub fn attr(target: &str, attribute: &str) -> Self {
        Self::Attr(target.to_string(), attribute.to_string())
    }

    /// Logical ID this reference points at.
    pub fn target(&self) -> &str {
        match self {
            Self::Id(t) => t,
            Self::Attr(t, _) => t,
        }
    }

    /// Marker object embedded in a resource body, resolved at synthesis.
    pub fn token(&self) -> Value {
        match self {
            Self::Id(t) => json!({ REF_MARKER: t }),
            Self::Attr(t, a) => json!({ GET_ATT_MARKER: [t, a] }),
        }
    }

    /// The CloudFormation intrinsic this marker resolves to.
    pub fn intrinsic(&self) -> Value {
        match self {
            Self::Id(t) => json!({ "Ref": t }),
            Self::Attr(t, a) => json!({ "Fn::GetAtt": [t, a] }),
        }
    }

    /// Decode a marker object back into a reference, if `value` is one.
    pub fn from_marker(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        if let Some(target) = map.get(REF_MARKER) {
            return target.as_str().map(Self::id);
        }
        if let Some(pair) = map.get(GET_ATT_MARKER).and_then(Value::as_array) {
            if let [Value::String(target), Value::String(attribute)] = pair.as_slice() {
                return Some(Self::attr(target, attribute));
            }
        }
        None
    }
}

/// One CloudFormation resource entry: logical ID plus `Type`/`Properties`
/// body, possibly holding unresolved reference markers.
#[derive(Debug, Clone)]
pub struct CfnResource {
    pub logical_id: String,
    pub body: Value,
}

impl CfnResource {
    pub fn new(logical_id: &str, body: Value) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            body,
        }
    }
}

/// Collect every reference a resource body makes: marker objects anywhere in
/// the tree plus top-level `DependsOn` entries.
pub fn collect_references(body: &Value) -> Vec<Reference> {
    let mut found = Vec::new();

    if let Some(depends) = body.get("DependsOn") {
        match depends {
            Value::String(id) => found.push(Reference::id(id)),
            Value::Array(ids) => {
                for id in ids.iter().filter_map(Value::as_str) {
                    found.push(Reference::id(id));
                }
            }
            _ => {}
        }
    }

    walk(body, &mut found);
    found
}

fn walk(value: &Value, found: &mut Vec<Reference>) {
    if let Some(reference) = Reference::from_marker(value) {
        found.push(reference);
        return;
    }
    match value {
        Value::Object(map) => {
            for child in map.values() {
                walk(child, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, found);
            }
        }
        _ => {}
    }
}

/// The ordered set of resource descriptors for one stack.
///
/// Insertion order is construction order; `add` rejects duplicates and
/// forward references, so iteration always yields a valid topological order.
#[derive(Debug, Clone, Default)]
pub struct StackGraph {
    resources: IndexMap<String, Value>,
}

impl StackGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource, failing fast on a duplicate logical ID, a logical
    /// ID outside CloudFormation's alphanumeric charset, or a reference to a
    /// resource not constructed yet.
    pub fn add(&mut self, resource: CfnResource) -> Result<(), BuildError> {
        let CfnResource { logical_id, body } = resource;

        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BuildError::InvalidValue {
                field: "logical ID".to_string(),
                reason: format!("'{}' must be non-empty and alphanumeric", logical_id),
            });
        }
        if self.resources.contains_key(&logical_id) {
            return Err(BuildError::DuplicateId(logical_id));
        }
        for reference in collect_references(&body) {
            if !self.resources.contains_key(reference.target()) {
                return Err(BuildError::UnknownReference {
                    from: logical_id,
                    target: reference.target().to_string(),
                });
            }
        }

        log::debug!("graph: added {}", logical_id);
        self.resources.insert(logical_id, body);
        Ok(())
    }

    /// Insert a batch of resources in order.
    pub fn add_all(&mut self, resources: Vec<CfnResource>) -> Result<(), BuildError> {
        for resource in resources {
            self.add(resource)?;
        }
        Ok(())
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.resources.iter()
    }

    /// Construction order with each resource's reference targets, deduped.
    pub fn dependencies(&self) -> Vec<(String, Vec<String>)> {
        self.resources
            .iter()
            .map(|(id, body)| {
                let mut targets: Vec<String> = Vec::new();
                for reference in collect_references(body) {
                    let target = reference.target().to_string();
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
                (id.clone(), targets)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(id: &str) -> CfnResource {
        CfnResource::new(id, json!({"Type": "AWS::EC2::VPC", "Properties": {}}))
    }

    #[test]
    fn test_add_and_iterate_in_order() {
        let mut graph = StackGraph::new();
        graph.add(plain("Vpc")).unwrap();
        graph.add(plain("EcrRepo")).unwrap();
        let ids: Vec<&String> = graph.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["Vpc", "EcrRepo"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut graph = StackGraph::new();
        graph.add(plain("Vpc")).unwrap();
        let err = graph.add(plain("Vpc")).unwrap_err();
        assert_eq!(err, BuildError::DuplicateId("Vpc".to_string()));
    }

    #[test]
    fn test_non_alphanumeric_id_rejected() {
        let mut graph = StackGraph::new();
        let err = graph.add(plain("My-Vpc")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { .. }));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut graph = StackGraph::new();
        let body = json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": { "VpcId": Reference::id("Vpc").token() }
        });
        let err = graph.add(CfnResource::new("SecurityGroup", body)).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownReference {
                from: "SecurityGroup".to_string(),
                target: "Vpc".to_string(),
            }
        );
    }

    #[test]
    fn test_backward_reference_accepted() {
        let mut graph = StackGraph::new();
        graph.add(plain("Vpc")).unwrap();
        let body = json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": { "VpcId": Reference::id("Vpc").token() }
        });
        graph.add(CfnResource::new("SecurityGroup", body)).unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_depends_on_checked() {
        let mut graph = StackGraph::new();
        graph.add(plain("Vpc")).unwrap();
        let body = json!({
            "Type": "AWS::EC2::Route",
            "DependsOn": ["GatewayAttachment"],
            "Properties": {}
        });
        let err = graph.add(CfnResource::new("DefaultRoute", body)).unwrap_err();
        assert!(matches!(err, BuildError::UnknownReference { .. }));
    }

    #[test]
    fn test_get_att_marker_roundtrip() {
        let reference = Reference::attr("InstanceProfile", "Arn");
        let decoded = Reference::from_marker(&reference.token()).unwrap();
        assert_eq!(decoded, reference);
        assert_eq!(
            decoded.intrinsic(),
            json!({"Fn::GetAtt": ["InstanceProfile", "Arn"]})
        );
    }

    #[test]
    fn test_collect_references_nested() {
        let body = json!({
            "Type": "AWS::Batch::ComputeEnvironment",
            "Properties": {
                "ComputeResources": {
                    "Subnets": [
                        Reference::id("PrivateSubnet1").token(),
                        Reference::id("PrivateSubnet2").token(),
                    ],
                    "InstanceRole": Reference::attr("InstanceProfile", "Arn").token(),
                }
            }
        });
        let refs = collect_references(&body);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[2].target(), "InstanceProfile");
    }

    #[test]
    fn test_dependencies_deduped() {
        let mut graph = StackGraph::new();
        graph.add(plain("Vpc")).unwrap();
        let body = json!({
            "Type": "AWS::EC2::Subnet",
            "Properties": {
                "VpcId": Reference::id("Vpc").token(),
                "Extra": Reference::id("Vpc").token(),
            }
        });
        graph.add(CfnResource::new("Subnet", body)).unwrap();
        let deps = graph.dependencies();
        assert_eq!(deps[1].0, "Subnet");
        assert_eq!(deps[1].1, vec!["Vpc"]);
    }
}
