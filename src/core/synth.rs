//! Template synthesis — resolve symbolic references, assemble the template.
//!
//! Second phase of the build: every `Molde::Ref` / `Molde::GetAtt` marker is
//! rewritten into the engine's `Ref` / `Fn::GetAtt` intrinsic, checked
//! against the set of logical IDs actually in the graph. An unresolved
//! symbol aborts synthesis; a partially resolved template is never emitted.

use super::graph::{BuildError, Reference, StackGraph};
use super::stack;
use super::types::StackConfig;
use serde_json::{json, Map, Value};

/// A fully resolved CloudFormation template plus its content digest.
#[derive(Debug, Clone)]
pub struct Template {
    body: Value,
    digest: String,
}

impl Template {
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// `blake3:{hex}` digest of the serialized template.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn resource_count(&self) -> usize {
        self.body["Resources"].as_object().map_or(0, Map::len)
    }

    pub fn to_json_pretty(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.body).map_err(|e| format!("serialize error: {}", e))
    }
}

/// Build the graph for a config and synthesize its template.
pub fn synthesize(config: &StackConfig) -> Result<Template, BuildError> {
    let graph = stack::build_stack(config)?;
    synthesize_graph(&graph, &format!("{} ({})", config.stack_name, config.region))
}

/// Resolve a graph's references and assemble the template document.
pub fn synthesize_graph(graph: &StackGraph, description: &str) -> Result<Template, BuildError> {
    let ids: Vec<&str> = graph.iter().map(|(id, _)| id.as_str()).collect();

    let mut resources = Map::new();
    for (id, body) in graph.iter() {
        let resolved = resolve_value(id, body, &ids)?;
        resources.insert(id.clone(), resolved);
    }

    let body = json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Description": description,
        "Resources": resources,
    });

    let serialized =
        serde_json::to_string(&body).map_err(|e| BuildError::InvalidValue {
            field: "template".to_string(),
            reason: e.to_string(),
        })?;
    let digest = format!("blake3:{}", blake3::hash(serialized.as_bytes()).to_hex());

    log::info!(
        "synthesized {} resources, digest {}",
        resources.len(),
        digest
    );
    Ok(Template { body, digest })
}

/// Rewrite one value tree, replacing markers with intrinsics. Fails closed
/// on a marker whose target is not a known logical ID.
fn resolve_value(from: &str, value: &Value, ids: &[&str]) -> Result<Value, BuildError> {
    if let Some(reference) = Reference::from_marker(value) {
        if !ids.contains(&reference.target()) {
            return Err(BuildError::UnknownReference {
                from: from.to_string(),
                target: reference.target().to_string(),
            });
        }
        return Ok(reference.intrinsic());
    }

    match value {
        Value::Object(map) => {
            let mut resolved = Map::new();
            for (key, child) in map {
                resolved.insert(key.clone(), resolve_value(from, child, ids)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for child in items {
                resolved.push(resolve_value(from, child, ids)?);
            }
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}
