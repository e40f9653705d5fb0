//! QC entity builder
//!
//! Turns an unordered pool of records into one draft per group of records
//! sharing the component's grouping-key values. Templates are carried through
//! unrendered and substituted on demand.

use crate::error::{IndexError, IndexResult};
use crate::matcher::{find_match, MatchError};
use crate::qc_spec::ComponentSpec;
use crate::records::{Attributes, RawRecord};
use crate::template::{render, TemplateError};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Grouped, matched but not yet persisted QC entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QcEntityDraft {
    /// Matched image paths in descriptor order
    pub images: Vec<String>,
    /// First matched record's attributes restricted to the grouping keys
    pub attributes: Attributes,
    /// First matched record's attributes restricted to the row keys
    pub row_attributes: Attributes,
    pub label_template: String,
    pub column_template: String,
    pub row_template: String,
}

/// Draft with every template substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntity {
    pub name: String,
    pub row: String,
    pub column: String,
    pub images: Vec<String>,
}

impl QcEntityDraft {
    pub fn name(&self) -> Result<String, TemplateError> {
        render(&self.label_template, &self.attributes)
    }

    pub fn column_name(&self) -> Result<String, TemplateError> {
        render(&self.column_template, &self.attributes)
    }

    pub fn row_name(&self) -> Result<String, TemplateError> {
        render(&self.row_template, &self.row_attributes)
    }

    pub fn render(&self) -> Result<RenderedEntity, TemplateError> {
        Ok(RenderedEntity {
            name: self.name()?,
            row: self.row_name()?,
            column: self.column_name()?,
            images: self.images.clone(),
        })
    }
}

/// Group that produced no draft because a descriptor had no match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGroup {
    pub key: Vec<String>,
    pub descriptor: String,
}

/// Builder output for one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftSet {
    pub drafts: Vec<QcEntityDraft>,
    pub skipped: Vec<SkippedGroup>,
}

/// Partition records containing every key in `keys` by their values for `keys`
///
/// Groups are keyed by the value tuple in `keys` order; the ordered map makes
/// iteration independent of the input order.
pub fn group_records<'a>(
    records: &'a [RawRecord],
    keys: &[String],
) -> BTreeMap<Vec<String>, Vec<&'a RawRecord>> {
    let mut groups: BTreeMap<Vec<String>, Vec<&RawRecord>> = BTreeMap::new();

    for record in records.iter().filter(|r| r.has_all(keys)) {
        let key: Vec<String> = keys
            .iter()
            .filter_map(|k| record.attributes.get(k).cloned())
            .collect();
        groups.entry(key).or_default().push(record);
    }

    groups
}

impl ComponentSpec {
    /// Build one draft per group whose descriptors all match exactly once
    ///
    /// A descriptor without a match skips its group (coverage gap, logged);
    /// an ambiguous descriptor fails the whole build.
    pub fn build_drafts(&self, records: &[RawRecord]) -> IndexResult<DraftSet> {
        if self.descriptors.is_empty() {
            return Err(IndexError::NoDescriptors(self.name.clone()));
        }

        let mut set = DraftSet::default();

        'groups: for (key, group) in group_records(records, &self.grouping_keys) {
            let mut matched: Vec<&RawRecord> = Vec::with_capacity(self.descriptors.len());

            for descriptor in &self.descriptors {
                match find_match(group.iter().copied(), descriptor) {
                    Ok(record) => matched.push(record),
                    Err(MatchError::NoMatch(descriptor)) => {
                        warn!(
                            component = %self.name,
                            group = ?key,
                            descriptor = %descriptor,
                            "No image found for descriptor, skipping group"
                        );
                        set.skipped.push(SkippedGroup { key, descriptor });
                        continue 'groups;
                    }
                    Err(MatchError::Ambiguous { descriptor, paths }) => {
                        return Err(IndexError::AmbiguousMatch {
                            component: self.name.clone(),
                            group: key,
                            descriptor,
                            paths,
                        });
                    }
                }
            }

            let first = matched[0];
            set.drafts.push(QcEntityDraft {
                images: matched.iter().map(|r| r.path.clone()).collect(),
                attributes: first.restricted_to(&self.grouping_keys),
                row_attributes: first.restricted_to(&self.row.entities),
                label_template: self.label_template.clone(),
                column_template: self.column_template.clone(),
                row_template: self.row.name.clone(),
            });
        }

        debug!(
            component = %self.name,
            drafts = set.drafts.len(),
            skipped = set.skipped.len(),
            "Built QC entity drafts"
        );

        Ok(set)
    }
}
