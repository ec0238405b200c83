//! The entity store: an indexed, read-only view over the entity hierarchy.
//!
//! Two JSON input schemas load into the same model: the compact
//! `uid`/`parents`/`attrs` form, and the verbose form with
//! `EntityId`/`Identifier` objects (`{EntityType, EntityId}` pairs) plus
//! `Parents` and typed `Attributes`. `in` semantics are the reflexive
//! transitive closure of `parents`, computed with a worklist so cyclic
//! hierarchies terminate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;

use serde::Deserialize;

use crate::error::PolicyError;
use crate::types::AttrValue;

/// A single entity: canonical id, direct parents, typed attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub uid: String,
    pub parents: Vec<String>,
    pub attrs: BTreeMap<String, AttrValue>,
}

#[derive(Deserialize)]
struct RawEntityName {
    #[serde(rename = "EntityType")]
    entity_type: String,
    #[serde(rename = "EntityId")]
    entity_id: String,
}

#[derive(Deserialize, Default)]
struct RawAttribute {
    #[serde(rename = "String", default)]
    string: Option<String>,
    #[serde(rename = "Long", default)]
    long: Option<i64>,
    #[serde(rename = "Boolean", default)]
    boolean: Option<bool>,
}

#[derive(Deserialize)]
struct RawEntity {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    parents: Option<Vec<String>>,
    #[serde(default)]
    attrs: Option<BTreeMap<String, AttrValue>>,
    #[serde(rename = "EntityId", default)]
    entity_id: Option<RawEntityName>,
    #[serde(rename = "Identifier", default)]
    identifier: Option<RawEntityName>,
    #[serde(rename = "Parents", default)]
    complex_parents: Option<Vec<RawEntityName>>,
    #[serde(rename = "Attributes", default)]
    complex_attrs: Option<BTreeMap<String, RawAttribute>>,
}

fn canonical_ref(name: &RawEntityName) -> Result<String, PolicyError> {
    let quoted = serde_json::to_string(&name.entity_id)?;
    Ok(format!("{}::{}", name.entity_type, quoted))
}

/// The complete set of known entities, indexed by canonical id, with a
/// reverse parent index for descendant expansion.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: HashMap<String, Entity>,
    children: HashMap<String, Vec<String>>,
}

impl EntityStore {
    /// Load a store from the JSON array format.
    pub fn from_str(json: &str) -> Result<Self, PolicyError> {
        let raw: Vec<RawEntity> = serde_json::from_str(json)?;

        let mut entities: HashMap<String, Entity> = HashMap::with_capacity(raw.len());
        for item in raw {
            let entity = if let Some(uid) = item.uid {
                Entity {
                    uid,
                    parents: item.parents.unwrap_or_default(),
                    attrs: item.attrs.unwrap_or_default(),
                }
            } else if let Some(name) = item.entity_id.or(item.identifier) {
                let uid = canonical_ref(&name)?;
                let parents = item
                    .complex_parents
                    .unwrap_or_default()
                    .iter()
                    .map(canonical_ref)
                    .collect::<Result<Vec<_>, _>>()?;
                let mut attrs = BTreeMap::new();
                for (attr_name, attr) in item.complex_attrs.unwrap_or_default() {
                    let value = if let Some(s) = attr.string {
                        AttrValue::String(s)
                    } else if let Some(n) = attr.long {
                        AttrValue::Long(n)
                    } else if let Some(b) = attr.boolean {
                        AttrValue::Bool(b)
                    } else {
                        return Err(PolicyError::InvalidFormat(format!(
                            "no value found in attribute block for \"{attr_name}\""
                        )));
                    };
                    attrs.insert(attr_name, value);
                }
                Entity { uid, parents, attrs }
            } else {
                return Err(PolicyError::EntityError(
                    "no entity identifier found in entity list item".into(),
                ));
            };

            if entities.contains_key(&entity.uid) {
                return Err(PolicyError::EntityError(format!(
                    "duplicate entity id: {}",
                    entity.uid
                )));
            }
            entities.insert(entity.uid.clone(), entity);
        }

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for entity in entities.values() {
            for parent in &entity.parents {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(entity.uid.clone());
            }
        }

        Ok(EntityStore { entities, children })
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, PolicyError> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_str(&json)
    }

    /// All entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, uid: &str) -> Option<&Entity> {
        self.entities.get(uid)
    }

    /// Every stored entity whose transitive parent chain includes one of
    /// `roots`, plus the roots themselves where present in the store. The
    /// expansion is a worklist with a visited set, so cycles terminate.
    pub fn descendants(&self, roots: &[String]) -> HashSet<String> {
        let mut queue: Vec<&str> = roots.iter().map(String::as_str).collect();
        let mut seen: HashSet<&str> = queue.iter().copied().collect();
        let mut found: HashSet<String> = HashSet::new();

        while let Some(id) = queue.pop() {
            if self.entities.contains_key(id) {
                found.insert(id.to_string());
            }
            if let Some(children) = self.children.get(id) {
                for child in children {
                    if seen.insert(child.as_str()) {
                        queue.push(child.as_str());
                    }
                }
            }
        }

        found
    }

    /// Typed attribute lookup; `None` covers both an unknown entity and a
    /// missing attribute.
    pub fn attribute(&self, uid: &str, name: &str) -> Option<&AttrValue> {
        self.entities.get(uid)?.attrs.get(name)
    }

    pub fn has_attribute(&self, uid: &str, name: &str) -> bool {
        self.attribute(uid, name).is_some()
    }
}
