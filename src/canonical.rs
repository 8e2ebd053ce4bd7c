use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use unicode_normalization::UnicodeNormalization;

/// The maximum nesting depth accepted when encoding content.
pub const MAX_CONTENT_DEPTH: usize = 64;

/// A piece of structured content.
///
/// Content is a tree of objects, arrays and scalars. There is no `null`: anything that can't be
/// represented here can't be committed to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "serde_json::Value")]
pub enum Content {
    /// An object, keyed by attribute name.
    Object(BTreeMap<String, Content>),

    /// An array of values.
    Array(Vec<Content>),

    /// A string.
    String(String),

    /// A finite number.
    Number(serde_json::Number),

    /// A boolean.
    Bool(bool),
}

impl Content {
    /// Construct an object out of a sequence of key/value pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Content>,
    {
        Self::Object(entries.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }

    /// Get this content as an object, if it is one.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Content>> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Encode this content canonically.
    pub fn encode(&self) -> Result<String, EncodingError> {
        encode(self)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
        }
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Content {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Content {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Content {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Content {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl<T: Into<Content>> From<Vec<T>> for Content {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<f64> for Content {
    type Error = EncodingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        serde_json::Number::from_f64(value).map(Self::Number).ok_or(EncodingError::UnsupportedValue("non-finite number"))
    }
}

impl TryFrom<serde_json::Value> for Content {
    type Error = EncodingError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        from_json(value, 0)
    }
}

impl From<Content> for serde_json::Value {
    fn from(content: Content) -> Self {
        match content {
            Content::Object(entries) => {
                serde_json::Value::Object(entries.into_iter().map(|(key, value)| (key, value.into())).collect())
            }
            Content::Array(values) => serde_json::Value::Array(values.into_iter().map(Into::into).collect()),
            Content::String(value) => serde_json::Value::String(value),
            Content::Number(value) => serde_json::Value::Number(value),
            Content::Bool(value) => serde_json::Value::Bool(value),
        }
    }
}

fn from_json(value: serde_json::Value, depth: usize) -> Result<Content, EncodingError> {
    use serde_json::Value;
    if depth > MAX_CONTENT_DEPTH {
        return Err(EncodingError::TooDeep(MAX_CONTENT_DEPTH));
    }
    let content = match value {
        Value::Null => return Err(EncodingError::UnsupportedValue("null")),
        Value::Bool(value) => Content::Bool(value),
        Value::Number(value) => Content::Number(value),
        Value::String(value) => Content::String(value),
        Value::Array(values) => {
            Content::Array(values.into_iter().map(|value| from_json(value, depth + 1)).collect::<Result<_, _>>()?)
        }
        Value::Object(entries) => {
            let mut output = BTreeMap::new();
            for (key, value) in entries {
                output.insert(key, from_json(value, depth + 1)?);
            }
            Content::Object(output)
        }
    };
    Ok(content)
}

/// Encode content into its canonical string form.
///
/// Objects are emitted as JSON with their keys sorted, recursively. Top level strings are emitted
/// as is, numbers and booleans using their textual representation. The output is always NFC
/// normalized.
pub fn encode(content: &Content) -> Result<String, EncodingError> {
    let normalized = normalize(content, 0)?;
    let output = match normalized {
        Content::String(value) => value,
        Content::Number(value) => value.to_string(),
        Content::Bool(value) => value.to_string(),
        value @ (Content::Object(_) | Content::Array(_)) => serde_json::to_string(&value)?,
    };
    Ok(output.nfc().collect())
}

// Rebuilds the tree with NFC normalized keys so key ordering doesn't depend on how a string
// happened to be composed.
fn normalize(content: &Content, depth: usize) -> Result<Content, EncodingError> {
    if depth > MAX_CONTENT_DEPTH {
        return Err(EncodingError::TooDeep(MAX_CONTENT_DEPTH));
    }
    let output = match content {
        Content::Object(entries) => {
            let mut output = BTreeMap::new();
            for (key, value) in entries {
                let key: String = key.nfc().collect();
                match output.entry(key) {
                    Entry::Vacant(entry) => {
                        entry.insert(normalize(value, depth + 1)?);
                    }
                    Entry::Occupied(entry) => return Err(EncodingError::DuplicateKey(entry.key().clone())),
                }
            }
            Content::Object(output)
        }
        Content::Array(values) => {
            Content::Array(values.iter().map(|value| normalize(value, depth + 1)).collect::<Result<_, _>>()?)
        }
        Content::Number(value) if value.as_f64().is_some_and(|n| !n.is_finite()) => {
            return Err(EncodingError::UnsupportedValue(content.kind()));
        }
        other => other.clone(),
    };
    Ok(output)
}

/// An error when encoding content.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("unsupported value: {0}")]
    UnsupportedValue(&'static str),

    #[error("content is nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("duplicate key after normalization: {0}")]
    DuplicateKey(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
