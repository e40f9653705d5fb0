//! Attribute matcher
//!
//! Finds the single record whose attributes are a superset of an image
//! descriptor. Ambiguity is a configuration error: descriptors are expected to
//! be unambiguous by construction of the QC specification.

use crate::records::{Attributes, RawRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Partial attribute map selecting one image role within a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageDescriptor(pub Attributes);

impl ImageDescriptor {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Every descriptor key is present in `record` with an equal value
    pub fn matches(&self, record: &RawRecord) -> bool {
        self.0
            .iter()
            .all(|(k, v)| record.attributes.get(k) == Some(v))
    }
}

impl fmt::Display for ImageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (k, v)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// No record satisfies the descriptor
    #[error("no record matches descriptor {0}")]
    NoMatch(String),

    /// Two or more records satisfy the descriptor
    #[error("{} records match descriptor {descriptor}", .paths.len())]
    Ambiguous { descriptor: String, paths: Vec<String> },
}

/// Return the single record in `records` matching `descriptor`
pub fn find_match<'a, I>(records: I, descriptor: &ImageDescriptor) -> Result<&'a RawRecord, MatchError>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut matches = records.into_iter().filter(|r| descriptor.matches(r));

    let first = matches
        .next()
        .ok_or_else(|| MatchError::NoMatch(descriptor.to_string()))?;

    let rest: Vec<&RawRecord> = matches.collect();
    if rest.is_empty() {
        return Ok(first);
    }

    let paths: Vec<String> = std::iter::once(first)
        .chain(rest)
        .map(|r| r.path.clone())
        .collect();

    tracing::error!(
        descriptor = %descriptor,
        count = paths.len(),
        "Descriptor matched more than one image, expected 1:\n{}",
        paths.join("\n")
    );

    Err(MatchError::Ambiguous {
        descriptor: descriptor.to_string(),
        paths,
    })
}
