//! Broker Registry - Load parameter tables from JSON
//!
//! This module loads the broker parameter tables (field paths, defaults,
//! creation-only fields) from an embedded JSON file and provides lookup
//! functions for the rest of the engine. The tables never change after the
//! first access.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Embedded broker parameter tables (compiled into the binary)
const BROKER_TABLES: &str = include_str!("../resources/broker.json");

/// Separator between nesting levels in a path specification
const PATH_SEPARATOR: char = '/';

/// Location of a flat parameter inside the nested request body,
/// outermost key first
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FieldPath(Vec<String>);

impl TryFrom<String> for FieldPath {
    type Error = String;

    fn try_from(spec: String) -> Result<Self, Self::Error> {
        let segments: Vec<String> = spec.split(PATH_SEPARATOR).map(String::from).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(format!("Invalid field path '{}'", spec));
        }
        Ok(Self(segments))
    }
}

impl FieldPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Top-level key of the request body this path writes under
    pub fn root(&self) -> &str {
        &self.0[0]
    }

    /// Write `value` at this path, creating missing intermediate objects.
    /// An existing leaf is overwritten, siblings are left alone.
    pub fn write(&self, body: &mut Map<String, Value>, value: Value) {
        let Some((leaf, parents)) = self.0.split_last() else {
            return;
        };

        let mut current = body;
        for segment in parents {
            let entry = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            current = next;
        }

        current.insert(leaf.clone(), value);
    }

    /// Read the value stored at this path
    pub fn read<'a>(&self, body: &'a Map<String, Value>) -> Option<&'a Value> {
        let (leaf, parents) = self.0.split_last()?;

        let mut current = body;
        for segment in parents {
            current = current.get(segment)?.as_object()?;
        }

        current.get(leaf)
    }
}

/// Root structure of resources/broker.json
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerTables {
    /// Flat parameter name -> request body path
    pub field_paths: BTreeMap<String, FieldPath>,
    /// Values seeded into creation requests
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
    /// Parameters that can only be set when the broker is created
    #[serde(default)]
    pub create_only: BTreeSet<String>,
    #[serde(default)]
    pub unsupported_auth_strategies: Vec<String>,
    /// Principal synthesized when a creation request carries no users
    pub default_user: Value,
}

/// Global tables loaded from JSON
static REGISTRY: OnceLock<BrokerTables> = OnceLock::new();

/// Get the broker tables (loads from embedded JSON on first access)
pub fn get_registry() -> &'static BrokerTables {
    REGISTRY.get_or_init(|| {
        serde_json::from_str(BROKER_TABLES)
            .unwrap_or_else(|e| panic!("Failed to parse embedded broker tables: {}", e))
    })
}

/// Get the request body path of a flat parameter
pub fn field_path(key: &str) -> Option<&'static FieldPath> {
    get_registry().field_paths.get(key)
}

/// Whether a parameter may only be supplied on creation
pub fn is_create_only(key: &str) -> bool {
    get_registry().create_only.contains(key)
}
