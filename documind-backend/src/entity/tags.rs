use sea_orm::sea_query::{ArrayType, ColumnType, Nullable, Value, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, QueryResult, TryGetError, TryGetable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ordered list of tags on a document. On the wire this is a plain JSON
/// array; in the database it is stored as a JSON-encoded text column. The
/// encoding is internal to the persistence layer - callers only ever see
/// `Vec<String>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TagList(pub Vec<String>);

impl TagList {
    pub fn empty() -> Self {
        TagList(Vec::new())
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        TagList(tags)
    }
}

/// Serialize tags for storage. A `Vec<String>` always serializes cleanly,
/// so the fallback is unreachable in practice.
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Decode the stored form back to an ordered list. Absent or empty values
/// decode to an empty list.
pub fn decode_tags(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(value) if !value.is_empty() => serde_json::from_str(value).unwrap_or_default(),
        _ => Vec::new(),
    }
}

impl From<TagList> for Value {
    fn from(tags: TagList) -> Self {
        Value::String(Some(Box::new(encode_tags(&tags.0))))
    }
}

impl TryGetable for TagList {
    fn try_get_by<I: ColIdx>(res: &QueryResult, idx: I) -> Result<Self, TryGetError> {
        let raw: Option<String> = res.try_get_by(idx)?;
        Ok(TagList(decode_tags(raw.as_deref())))
    }
}

impl ValueType for TagList {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(value)) => Ok(TagList(decode_tags(Some(&value)))),
            Value::String(None) => Ok(TagList::empty()),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "TagList".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl Nullable for TagList {
    fn null() -> Value {
        Value::String(None)
    }
}
