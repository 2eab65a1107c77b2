//! Dependency specification loading
//!
//! Parses the declarative cross-stack specification into typed entities in
//! one pass. The document has two sections keyed by stack name:
//! `stack_outputs` (what each stack publishes) and `dependencies` (what each
//! stack consumes), plus an optional informational `layers` section.
//!
//! JSON is the primary encoding; YAML is accepted as well. Contract errors
//! that need no remote state (duplicate stacks, references to outputs the
//! target never declares) are caught here, before any backend call.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use anyhow::Context;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::domain::{Edge, OutputDecl, StackNode};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("failed to parse dependency specification: {0}")]
    Parse(String),

    #[error("duplicate stack: {0}")]
    DuplicateStack(String),

    #[error("stack '{stack}' references output '{output}' that '{target}' never declares")]
    UndeclaredOutput {
        stack: String,
        target: String,
        output: String,
    },

    #[error("stack '{0}' declares an output with an empty name")]
    EmptyOutputName(String),

    #[error("stack '{0}' declares a dependency on itself")]
    SelfDependency(String),
}

/// One dependency declaration: the target stack and the outputs consumed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyDecl {
    /// The stack whose outputs are consumed
    #[serde(alias = "stack_name")]
    pub target_stack: String,

    /// Outputs that must be present
    #[serde(default)]
    pub required_outputs: Vec<String>,

    /// Outputs whose absence is tolerated
    #[serde(default)]
    pub optional_outputs: Vec<String>,
}

/// The parsed dependency specification document
///
/// Section entries keep their document order and may contain duplicate
/// keys at this point; [`SpecDocument::resolve`] rejects duplicates with a
/// typed error instead of serde's silent last-wins behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecDocument {
    /// Stack name -> outputs the stack declares it may publish
    #[serde(default, deserialize_with = "map_entries")]
    stack_outputs: Vec<(String, Vec<OutputDecl>)>,

    /// Stack name -> dependency declarations
    #[serde(default, deserialize_with = "map_entries")]
    dependencies: Vec<(String, Vec<DependencyDecl>)>,

    /// Stack name -> free-form layer tag, informational only
    #[serde(default)]
    layers: BTreeMap<String, String>,
}

impl SpecDocument {
    /// Parses a JSON specification
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parses a YAML specification
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a specification file, choosing the parser by extension
    /// (`.yaml`/`.yml` for YAML, JSON otherwise)
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read specification: {}", path.display()))?;

        let doc = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        };

        doc.with_context(|| format!("Failed to parse specification: {}", path.display()))
    }

    /// Registers the outputs a stack declares (programmatic construction)
    pub fn declare_outputs(
        &mut self,
        stack: impl Into<String>,
        outputs: Vec<OutputDecl>,
    ) -> &mut Self {
        self.stack_outputs.push((stack.into(), outputs));
        self
    }

    /// Registers a dependency declaration (programmatic construction)
    pub fn declare_dependency(&mut self, stack: impl Into<String>, decl: DependencyDecl) -> &mut Self {
        let stack = stack.into();
        if let Some((_, decls)) = self.dependencies.iter_mut().find(|(name, _)| *name == stack) {
            decls.push(decl);
        } else {
            self.dependencies.push((stack, vec![decl]));
        }
        self
    }

    /// Tags a stack with a layer (programmatic construction)
    pub fn set_layer(&mut self, stack: impl Into<String>, layer: impl Into<String>) -> &mut Self {
        self.layers.insert(stack.into(), layer.into());
        self
    }

    /// Resolves the document into graph entities
    ///
    /// A stack mentioned in either section becomes a node; stacks that only
    /// appear as dependency *targets* do not, so the graph builder can
    /// report them as unresolvable references.
    pub fn resolve(&self) -> Result<(Vec<StackNode>, Vec<Edge>), ConfigError> {
        let mut nodes: Vec<StackNode> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for (name, outputs) in &self.stack_outputs {
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateStack(name.clone()));
            }
            for output in outputs {
                if output.name.is_empty() {
                    return Err(ConfigError::EmptyOutputName(name.clone()));
                }
            }
            nodes.push(StackNode {
                name: name.clone(),
                layer: self.layers.get(name).cloned(),
                outputs: outputs.clone(),
            });
        }

        let mut dep_keys: HashSet<&str> = HashSet::new();
        for (name, _) in &self.dependencies {
            if !dep_keys.insert(name) {
                return Err(ConfigError::DuplicateStack(name.clone()));
            }
            if !seen.contains(name.as_str()) {
                nodes.push(StackNode {
                    name: name.clone(),
                    layer: self.layers.get(name).cloned(),
                    outputs: Vec::new(),
                });
                seen.insert(name);
            }
        }

        let declared: BTreeMap<&str, &StackNode> =
            nodes.iter().map(|n| (n.name.as_str(), n)).collect();

        let mut edges: BTreeMap<(String, String), Edge> = BTreeMap::new();
        for (stack, decls) in &self.dependencies {
            for decl in decls {
                if decl.target_stack == *stack {
                    return Err(ConfigError::SelfDependency(stack.clone()));
                }

                // The output contract is checkable only against a stack the
                // document itself declares; a completely unknown target is
                // the graph builder's (more severe) error class.
                if let Some(target) = declared.get(decl.target_stack.as_str()) {
                    for output in decl
                        .required_outputs
                        .iter()
                        .chain(decl.optional_outputs.iter())
                    {
                        if !target.declares_output(output) {
                            return Err(ConfigError::UndeclaredOutput {
                                stack: stack.clone(),
                                target: decl.target_stack.clone(),
                                output: output.clone(),
                            });
                        }
                    }
                }

                let edge = edges
                    .entry((stack.clone(), decl.target_stack.clone()))
                    .or_insert_with(|| Edge::new(stack.clone(), decl.target_stack.clone()));
                edge.required_outputs
                    .extend(decl.required_outputs.iter().cloned());
                edge.optional_outputs
                    .extend(decl.optional_outputs.iter().cloned());
            }
        }

        Ok((nodes, edges.into_values().collect()))
    }
}

/// Deserializes a map as an ordered entry list, preserving duplicate keys
/// so the caller can reject them with a typed error
fn map_entries<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct EntriesVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map keyed by stack name")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}
