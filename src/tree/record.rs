//! Flat and nested record envelopes.

use crate::error::BulkError;
use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

pub const ID_KEY: &str = "id";
pub const TYPENAME_KEY: &str = "__typename";
pub const PARENT_ID_KEY: &str = "__parentId";

/// Deepest tree that converts to JSON; serde_json writes and drops values recursively
pub const MAX_JSON_DEPTH: usize = 512;

/// One JSONL line of a bulk query result.
///
/// The reserved keys are lifted out of the object when they hold strings; everything else
/// stays in `fields` untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatRecord {
    pub id: Option<String>,
    pub typename: Option<String>,
    pub parent_id: Option<String>,
    pub fields: Map<String, Value>,
}

impl FlatRecord {
    pub fn new(id: impl Into<String>, typename: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            typename: Some(typename.into()),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Parse one JSONL line
    pub fn parse_line(line: &str) -> Result<Self, BulkError> {
        let value: Value = serde_json::from_str(line)?;
        Self::try_from(value)
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(id) = &self.id {
            object.insert(ID_KEY.to_string(), Value::String(id.clone()));
        }
        if let Some(typename) = &self.typename {
            object.insert(TYPENAME_KEY.to_string(), Value::String(typename.clone()));
        }
        if let Some(parent_id) = &self.parent_id {
            object.insert(PARENT_ID_KEY.to_string(), Value::String(parent_id.clone()));
        }
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl TryFrom<Value> for FlatRecord {
    type Error = BulkError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = value else {
            return Err(BulkError::Json(format!(
                "expected a JSON object record, got {}",
                value
            )));
        };

        Ok(Self {
            id: take_string(&mut fields, ID_KEY),
            typename: take_string(&mut fields, TYPENAME_KEY),
            parent_id: take_string(&mut fields, PARENT_ID_KEY),
            fields,
        })
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.shift_remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

/// A record with its children nested under pluralized type keys
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeRecord {
    pub id: Option<String>,
    pub typename: Option<String>,
    pub fields: Map<String, Value>,
    /// Child collections in first-seen key order
    pub children: Vec<(String, Vec<TreeRecord>)>,
}

impl TreeRecord {
    /// Copy of a flat record without its parent reference
    pub fn from_flat(record: &FlatRecord) -> Self {
        Self {
            id: record.id.clone(),
            typename: record.typename.clone(),
            fields: record.fields.clone(),
            children: Vec::new(),
        }
    }

    /// Children filed under `key`
    pub fn collection(&self, key: &str) -> Option<&[TreeRecord]> {
        self.children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
    }

    pub(crate) fn push_child(&mut self, key: &str, child: TreeRecord) {
        match self.children.iter_mut().find(|(k, _)| k == key) {
            Some((_, records)) => records.push(child),
            None => self.children.push((key.to_string(), vec![child])),
        }
    }

    /// Levels from this record down to its deepest descendant, counting itself
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((record, level)) = stack.pop() {
            deepest = deepest.max(level);
            for (_, records) in &record.children {
                stack.extend(records.iter().map(|child| (child, level + 1)));
            }
        }
        deepest
    }

    /// JSON form; a child collection replaces a plain field of the same name
    pub fn to_value(&self) -> Value {
        let mut stack = vec![ValueFrame::enter(self)];

        while let Some(frame) = stack.last_mut() {
            let record = frame.record;
            let built = frame.items.len();
            match record.children.get(frame.next_key) {
                Some((_, records)) if built < records.len() => {
                    stack.push(ValueFrame::enter(&records[built]));
                }
                Some((key, _)) => {
                    let items = std::mem::take(&mut frame.items);
                    frame.object.insert(key.clone(), Value::Array(items));
                    frame.next_key += 1;
                }
                None => {
                    let Some(done) = stack.pop() else { break };
                    let value = Value::Object(done.object);
                    match stack.last_mut() {
                        Some(parent) => parent.items.push(value),
                        None => return value,
                    }
                }
            }
        }
        Value::Null
    }
}

/// A record whose object is being filled, one child collection at a time
struct ValueFrame<'a> {
    record: &'a TreeRecord,
    object: Map<String, Value>,
    next_key: usize,
    /// Finished values of the collection at `next_key`
    items: Vec<Value>,
}

impl<'a> ValueFrame<'a> {
    fn enter(record: &'a TreeRecord) -> Self {
        let mut object = Map::new();
        if let Some(id) = &record.id {
            object.insert(ID_KEY.to_string(), Value::String(id.clone()));
        }
        if let Some(typename) = &record.typename {
            object.insert(TYPENAME_KEY.to_string(), Value::String(typename.clone()));
        }
        for (key, value) in &record.fields {
            object.insert(key.clone(), value.clone());
        }
        Self {
            record,
            object,
            next_key: 0,
            items: Vec::new(),
        }
    }
}

impl Drop for TreeRecord {
    // Unlinks descendants onto a heap stack so long chains drop without recursing
    fn drop(&mut self) {
        let mut pending: Vec<TreeRecord> = Vec::new();
        for (_, records) in self.children.drain(..) {
            pending.extend(records);
        }
        while let Some(mut record) = pending.pop() {
            for (_, records) in record.children.drain(..) {
                pending.extend(records);
            }
        }
    }
}

impl Serialize for TreeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let depth = self.depth();
        if depth > MAX_JSON_DEPTH {
            return Err(S::Error::custom(format!(
                "record nests {} levels deep, JSON output allows {}",
                depth, MAX_JSON_DEPTH
            )));
        }
        let Value::Object(object) = self.to_value() else {
            return serializer.serialize_none();
        };
        let mut map = serializer.serialize_map(Some(object.len()))?;
        for (key, value) in &object {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// JSON form of a whole forest, refusing trees too deep to write out
pub fn forest_to_values(forest: &[TreeRecord]) -> Result<Vec<Value>, BulkError> {
    forest
        .iter()
        .map(|record| {
            let depth = record.depth();
            if depth > MAX_JSON_DEPTH {
                return Err(BulkError::Json(format!(
                    "record {} nests {} levels deep, JSON output allows {}",
                    record.id.as_deref().unwrap_or("<no id>"),
                    depth,
                    MAX_JSON_DEPTH
                )));
            }
            Ok(record.to_value())
        })
        .collect()
}
