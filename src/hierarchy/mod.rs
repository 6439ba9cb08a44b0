//! Hierarchy reader: flattens a model's dimension trees into one table.
//!
//! The endpoint may answer with any of these shapes, and they can be mixed:
//! - a flat member list, `{"data": [{"dimension", "name", "parent", ...}]}`
//! - members nested under `children`, parents implied by nesting
//! - dimension groups, `{"dimensions": [{"name": "Department", "members": [...]}]}`
//!
//! Every member becomes one [`HierarchyNode`]. An explicit `parent` field
//! takes precedence over the enclosing member. Operators are passed through
//! as text without interpretation.

use serde_json::{Map, Value};
use tracing::info;

use crate::client::VenaClient;
use crate::error::VenaError;
use crate::job::Clock;
use crate::table::{Scalar, Table};
use crate::transport::Transport;

/// Column names of the flattened hierarchy table.
pub const HIERARCHY_COLUMNS: [&str; 5] = ["dimension", "name", "alias", "parent", "operator"];

/// One member of a dimension hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchyNode {
    pub dimension: String,
    pub name: String,
    pub alias: Option<String>,
    /// `None` for roots.
    pub parent: Option<String>,
    /// Aggregation sign towards the parent, e.g. `+` or `-`.
    pub operator: Option<String>,
}

/// All members of all dimensions, in response order (parents before children).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    /// Flattens a hierarchy response body.
    pub fn from_json(body: &Value) -> Result<Self, String> {
        let entries = match body {
            Value::Array(entries) => entries,
            Value::Object(root) => ["data", "dimensions", "members"]
                .iter()
                .find_map(|key| root.get(*key).and_then(Value::as_array))
                .ok_or("expected a 'data', 'dimensions' or 'members' array")?,
            _ => return Err("hierarchy is neither an array nor an object".to_string()),
        };

        let mut nodes = Vec::new();
        for entry in entries {
            flatten(entry, None, None, &mut nodes)?;
        }
        Ok(Self { nodes })
    }

    /// Flattens a hierarchy response from raw bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, String> {
        let body: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        Self::from_json(&body)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distinct dimension names in first-seen order.
    pub fn dimensions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if !seen.contains(&node.dimension.as_str()) {
                seen.push(&node.dimension);
            }
        }
        seen
    }

    /// Members of one dimension.
    pub fn members<'a>(&'a self, dimension: &'a str) -> impl Iterator<Item = &'a HierarchyNode> {
        self.nodes.iter().filter(move |n| n.dimension == dimension)
    }

    /// One row per node with [`HIERARCHY_COLUMNS`].
    pub fn to_table(&self) -> Table {
        let text = |value: &Option<String>| Scalar::from(value.clone());
        let mut columns: [Vec<Scalar>; 5] = Default::default();
        for node in &self.nodes {
            columns[0].push(Scalar::from(node.dimension.as_str()));
            columns[1].push(Scalar::from(node.name.as_str()));
            columns[2].push(text(&node.alias));
            columns[3].push(text(&node.parent));
            columns[4].push(text(&node.operator));
        }
        let [dimension, name, alias, parent, operator] = columns;
        // Fixed, distinct names and equal-length columns: construction cannot fail.
        Table::new(
            HIERARCHY_COLUMNS
                .into_iter()
                .zip([dimension, name, alias, parent, operator])
                .collect(),
        )
        .unwrap_or_default()
    }
}

fn flatten(
    entry: &Value,
    dimension: Option<&str>,
    parent: Option<&str>,
    out: &mut Vec<HierarchyNode>,
) -> Result<(), String> {
    let object = entry
        .as_object()
        .ok_or_else(|| format!("hierarchy entry is not an object: {entry}"))?;

    if let Some(Value::Array(members)) = object.get("members") {
        let group = text_field(object, "dimension")
            .or_else(|| text_field(object, "name"))
            .or_else(|| dimension.map(str::to_string))
            .ok_or("dimension group has no name")?;
        for member in members {
            flatten(member, Some(&group), None, out)?;
        }
        return Ok(());
    }

    let name = text_field(object, "name").ok_or_else(|| format!("member has no name: {entry}"))?;
    let own_dimension = text_field(object, "dimension")
        .or_else(|| dimension.map(str::to_string))
        .ok_or_else(|| format!("member '{name}' has no dimension"))?;
    let own_parent = text_field(object, "parent").or_else(|| parent.map(str::to_string));

    out.push(HierarchyNode {
        dimension: own_dimension.clone(),
        name: name.clone(),
        alias: text_field(object, "alias"),
        parent: own_parent,
        operator: text_field(object, "operator"),
    });

    if let Some(Value::Array(children)) = object.get("children") {
        for child in children {
            flatten(child, Some(&own_dimension), Some(&name), out)?;
        }
    }
    Ok(())
}

/// A non-empty scalar field rendered as text.
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<T: Transport, C: Clock> VenaClient<T, C> {
    /// Fetches and flattens the dimension hierarchies of the configured model.
    ///
    /// Every call re-fetches; nothing is cached.
    pub fn dimension_hierarchy(&self) -> Result<Hierarchy, VenaError> {
        let model_id = self
            .config()
            .require_model_id("get dimension hierarchies")?;
        let url = self.endpoint(&["models", model_id, "hierarchy"])?;
        let body = self.get_json(&url)?;
        let hierarchy = Hierarchy::from_json(&body)
            .map_err(|message| VenaError::UnexpectedResponse { url, message })?;

        info!(
            members = hierarchy.len(),
            dimensions = ?hierarchy.dimensions(),
            "retrieved dimension hierarchy"
        );
        Ok(hierarchy)
    }

    /// [`dimension_hierarchy`](Self::dimension_hierarchy) as a flat table with
    /// columns `dimension, name, alias, parent, operator`.
    pub fn get_dimension_hierarchy(&self) -> Result<Table, VenaError> {
        Ok(self.dimension_hierarchy()?.to_table())
    }
}
