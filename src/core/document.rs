use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A schemaless document stored in an index.
///
/// Field mapping (annotations, codecs, typed accessors) is the concern of
/// the layers above this crate; the core only needs a stable id and a bag
/// of JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field value, builder style.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A single write operation against an index.
///
/// Applying an op reports how many documents it affected: an insert always
/// counts 1, an update or delete counts 1 only when the id existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WriteOp {
    Insert(Document),
    Update(Document),
    Delete(String),
}

impl WriteOp {
    pub fn doc_id(&self) -> &str {
        match self {
            WriteOp::Insert(doc) | WriteOp::Update(doc) => &doc.id,
            WriteOp::Delete(id) => id,
        }
    }
}
