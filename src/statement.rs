use crate::canonical::{encode, Content, EncodingError, MAX_CONTENT_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// The separator used to join nested attribute paths.
pub const PATH_SEPARATOR: char = '.';

/// How content is split into statements.
///
/// Issuers and verifiers must agree on this: the same content decomposed with different rules
/// produces different statements and therefore different hashes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decomposition {
    /// One statement per top level attribute.
    #[default]
    TopLevel,

    /// One statement per nested leaf value.
    Leaf,
}

/// An atomic, independently revealable fact about some content.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    /// The name of the attribute this statement is about.
    pub attribute: String,

    /// The attribute's value.
    pub value: Content,

    /// The canonical encoding of `{attribute: value}`.
    pub encoded: String,
}

impl Statement {
    /// Construct a statement for an attribute.
    pub fn new(attribute: impl Into<String>, value: Content) -> Result<Self, EncodingError> {
        let attribute = attribute.into();
        let encoded = encode_statement(&attribute, &value)?;
        Ok(Self { attribute, value, encoded })
    }
}

/// Encode the statement for an attribute.
pub fn encode_statement(attribute: &str, value: &Content) -> Result<String, EncodingError> {
    let entry = Content::Object(BTreeMap::from([(attribute.to_string(), value.clone())]));
    encode(&entry)
}

/// Split content into statements, sorted by attribute name.
///
/// Attribute names are NFC normalized, so keys that only differ in their Unicode composition
/// collide and are rejected.
pub fn decompose(content: &Content, decomposition: Decomposition) -> Result<Vec<Statement>, DecompositionError> {
    let Content::Object(entries) = content else {
        return Err(DecompositionError::NotAnObject);
    };
    let mut leaves = BTreeMap::new();
    for (key, value) in entries {
        let key = key.nfc().collect();
        match decomposition {
            Decomposition::TopLevel => insert_leaf(&mut leaves, key, value)?,
            Decomposition::Leaf => collect_leaves(&mut leaves, key, value, 1)?,
        }
    }
    if leaves.is_empty() {
        return Err(DecompositionError::NoStatements);
    }
    let statements = leaves
        .into_iter()
        .map(|(attribute, value)| Statement::new(attribute, value.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(statements = statements.len(), ?decomposition, "decomposed content");
    Ok(statements)
}

fn collect_leaves<'a>(
    leaves: &mut BTreeMap<String, &'a Content>,
    path: String,
    value: &'a Content,
    depth: usize,
) -> Result<(), DecompositionError> {
    if depth > MAX_CONTENT_DEPTH {
        return Err(EncodingError::TooDeep(MAX_CONTENT_DEPTH).into());
    }
    match value {
        Content::Object(entries) if !entries.is_empty() => {
            for (key, value) in entries {
                let key: String = key.nfc().collect();
                collect_leaves(leaves, format!("{path}{PATH_SEPARATOR}{key}"), value, depth + 1)?;
            }
            Ok(())
        }
        Content::Array(values) if !values.is_empty() => {
            for (index, value) in values.iter().enumerate() {
                collect_leaves(leaves, format!("{path}{PATH_SEPARATOR}{index}"), value, depth + 1)?;
            }
            Ok(())
        }
        _ => insert_leaf(leaves, path, value),
    }
}

fn insert_leaf<'a>(
    leaves: &mut BTreeMap<String, &'a Content>,
    attribute: String,
    value: &'a Content,
) -> Result<(), DecompositionError> {
    match leaves.entry(attribute) {
        Entry::Occupied(entry) => Err(DecompositionError::DuplicateStatement(entry.key().clone())),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

/// An error when decomposing content into statements.
#[derive(Debug, thiserror::Error)]
pub enum DecompositionError {
    #[error("content must be an object")]
    NotAnObject,

    #[error("content yields no statements")]
    NoStatements,

    #[error("more than one statement for attribute '{0}'")]
    DuplicateStatement(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
