use std::collections::{BTreeMap, HashMap};

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{Condition, Filter, ListValue, Range, ScoredPoint, Struct, Value};

use super::VectorDbError;
use crate::constants::{PAYLOAD_CONTENT_FIELD, PAYLOAD_ID_FIELD, PAYLOAD_METADATA_FIELD};
use crate::passage::{Metadata, MetadataFilter, MetadataValue, Passage};

/// A passage and its embedding, ready to upsert.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub passage: Passage,
}

impl VectorPoint {
    /// Builds a point whose numeric id is derived from the passage id.
    pub fn new(vector: Vec<f32>, passage: Passage) -> Self {
        Self {
            id: point_id_for(&passage.id),
            vector,
            passage,
        }
    }

    pub fn payload(&self) -> HashMap<String, Value> {
        passage_payload(&self.passage)
    }
}

/// One semantic hit, best first.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub score: f32,
    pub passage: Passage,
}

impl SearchResult {
    /// Converts a Qdrant hit; `rank` feeds the content-hash id fallback.
    ///
    /// Returns `None` when the payload has no text content.
    pub fn from_scored_point(point: ScoredPoint, rank: usize) -> Option<Self> {
        let mut payload = point.payload;

        let content = match payload.remove(PAYLOAD_CONTENT_FIELD)?.kind? {
            Kind::StringValue(content) => content,
            _ => return None,
        };

        let metadata = match payload.remove(PAYLOAD_METADATA_FIELD) {
            Some(Value {
                kind: Some(Kind::StructValue(fields)),
            }) => fields
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), metadata_from_value(value)))
                .collect(),
            _ => Metadata::new(),
        };

        let explicit_id = match payload.remove(PAYLOAD_ID_FIELD).and_then(|v| v.kind) {
            Some(Kind::StringValue(id)) => Some(id),
            Some(Kind::IntegerValue(id)) => Some(id.to_string()),
            _ => None,
        }
        .or_else(|| match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            Some(PointIdOptions::Uuid(uuid)) => Some(uuid),
            None => None,
        });

        Some(Self {
            score: point.score,
            passage: Passage::from_parts(explicit_id.as_deref(), content, metadata, rank),
        })
    }
}

/// Payload layout: `passage_id`, `page_content` and a nested `metadata` struct.
pub fn passage_payload(passage: &Passage) -> HashMap<String, Value> {
    let metadata: HashMap<String, Value> = passage
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), metadata_to_value(value)))
        .collect();

    HashMap::from([
        (PAYLOAD_ID_FIELD.to_string(), Value::from(passage.id.clone())),
        (
            PAYLOAD_CONTENT_FIELD.to_string(),
            Value::from(passage.content.clone()),
        ),
        (
            PAYLOAD_METADATA_FIELD.to_string(),
            Value {
                kind: Some(Kind::StructValue(Struct { fields: metadata })),
            },
        ),
    ])
}

pub fn metadata_from_value(value: &Value) -> MetadataValue {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => MetadataValue::Null,
        Some(Kind::BoolValue(b)) => MetadataValue::Bool(*b),
        Some(Kind::IntegerValue(i)) => MetadataValue::Integer(*i),
        Some(Kind::DoubleValue(f)) => MetadataValue::Float(*f),
        Some(Kind::StringValue(s)) => MetadataValue::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            MetadataValue::List(list.values.iter().map(metadata_from_value).collect())
        }
        Some(Kind::StructValue(fields)) => MetadataValue::Map(
            fields
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), metadata_from_value(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

pub fn metadata_to_value(value: &MetadataValue) -> Value {
    let kind = match value {
        MetadataValue::Null => Kind::NullValue(0),
        MetadataValue::Bool(b) => Kind::BoolValue(*b),
        MetadataValue::Integer(i) => Kind::IntegerValue(*i),
        MetadataValue::Float(f) => Kind::DoubleValue(*f),
        MetadataValue::String(s) => Kind::StringValue(s.clone()),
        MetadataValue::List(items) => Kind::ListValue(ListValue {
            values: items.iter().map(metadata_to_value).collect(),
        }),
        MetadataValue::Map(fields) => Kind::StructValue(Struct {
            fields: fields
                .iter()
                .map(|(k, v)| (k.clone(), metadata_to_value(v)))
                .collect(),
        }),
    };
    Value { kind: Some(kind) }
}

/// Translates equality constraints into `must` conditions on `metadata.<key>`.
///
/// Returns `Ok(None)` for an empty filter.
pub fn filter_conditions(filter: &MetadataFilter) -> Result<Option<Filter>, VectorDbError> {
    if filter.is_empty() {
        return Ok(None);
    }

    let conditions = filter
        .conditions()
        .map(|(key, value)| {
            let field = format!("{PAYLOAD_METADATA_FIELD}.{key}");
            let unsupported = |reason: &str| VectorDbError::UnsupportedFilter {
                key: key.clone(),
                reason: reason.to_string(),
            };
            match value {
                MetadataValue::String(s) => Ok(Condition::matches(field, s.clone())),
                MetadataValue::Integer(i) => Ok(Condition::matches(field, *i)),
                MetadataValue::Bool(b) => Ok(Condition::matches(field, *b)),
                MetadataValue::Float(f) => Ok(Condition::range(
                    field,
                    Range {
                        gte: Some(*f),
                        lte: Some(*f),
                        ..Default::default()
                    },
                )),
                MetadataValue::List(_) | MetadataValue::Map(_) => {
                    Err(unsupported("only scalar values can be matched"))
                }
                MetadataValue::Null => Err(unsupported("null cannot be matched")),
            }
        })
        .collect::<Result<Vec<Condition>, VectorDbError>>()?;

    Ok(Some(Filter::must(conditions)))
}

/// Stable numeric point id for a passage id (first 8 bytes of its BLAKE3 hash).
pub fn point_id_for(passage_id: &str) -> u64 {
    let hash = blake3::hash(passage_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
