//! Labeled file records and the attribute extraction collaborator
//!
//! A [`RawRecord`] is a path plus its attribute map. Records come from an
//! [`AttributeSource`]; [`BidsFileSource`] walks a dataset root and parses
//! BIDS-style filenames (`sub-01_ses-02_desc-axial_T1w.png`).

use crate::error::IndexResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Attribute key → value map (ordered so rendering and grouping are reproducible)
pub type Attributes = BTreeMap<String, String>;

/// One labeled file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub path: String,
    pub attributes: Attributes,
}

impl RawRecord {
    pub fn new<I, K, V>(path: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            path: path.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// True when every key in `keys` is present
    pub fn has_all(&self, keys: &[String]) -> bool {
        keys.iter().all(|k| self.attributes.contains_key(k))
    }

    /// Copy of the attributes restricted to `keys` (absent keys are skipped)
    pub fn restricted_to(&self, keys: &[String]) -> Attributes {
        keys.iter()
            .filter_map(|k| self.attributes.get_key_value(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Produces the pool of records to index
///
/// Implementations must return stable attribute maps for identical inputs.
pub trait AttributeSource {
    fn records(&self) -> IndexResult<Vec<RawRecord>>;
}

impl AttributeSource for Vec<RawRecord> {
    fn records(&self) -> IndexResult<Vec<RawRecord>> {
        Ok(self.clone())
    }
}

/// Filename-entity source for BIDS-organized QC directories
pub struct BidsFileSource {
    root: PathBuf,
    extensions: Vec<String>,
}

/// Short BIDS entity labels and the attribute names they map to
const ENTITY_ALIASES: [(&str, &str); 7] = [
    ("sub", "subject"),
    ("ses", "session"),
    ("acq", "acquisition"),
    ("rec", "reconstruction"),
    ("ce", "ceagent"),
    ("dir", "direction"),
    ("mod", "modality"),
];

/// Directory names recognised as the BIDS `datatype` attribute
const DATATYPES: [&str; 8] = ["anat", "func", "dwi", "fmap", "perf", "meg", "eeg", "figures"];

impl BidsFileSource {
    /// `extensions` are matched case-insensitively against the end of the filename (".png", ".svg")
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.into_iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.extensions.is_empty() || self.extensions.iter().any(|ext| lower.ends_with(ext))
    }
}

impl AttributeSource for BidsFileSource {
    fn records(&self) -> IndexResult<Vec<RawRecord>> {
        if !self.root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset root {} is not a directory", self.root.display()),
            )
            .into());
        }

        let mut records = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file_name) = entry.file_name().to_str() else {
                tracing::warn!("Skipping non UTF-8 filename: {}", entry.path().display());
                continue;
            };

            if !self.accepts(file_name) {
                continue;
            }

            if let Some(record) = parse_bids_path(entry.path()) {
                records.push(record);
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            count = records.len(),
            "Extracted attribute records"
        );

        Ok(records)
    }
}

/// Parse BIDS filename entities from `path`
///
/// Returns `None` for filenames without any `key-value` entity.
pub fn parse_bids_path(path: &Path) -> Option<RawRecord> {
    let file_name = path.file_name()?.to_str()?;
    let (stem, extension) = match file_name.find('.') {
        Some(dot) => (&file_name[..dot], &file_name[dot..]),
        None => (file_name, ""),
    };

    let mut attributes = Attributes::new();
    let parts: Vec<&str> = stem.split('_').collect();

    for (idx, part) in parts.iter().enumerate() {
        match part.split_once('-') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                let key = ENTITY_ALIASES
                    .iter()
                    .find(|(short, _)| *short == key)
                    .map(|(_, long)| *long)
                    .unwrap_or(key);
                attributes.insert(key.to_string(), value.to_string());
            }
            _ if idx == parts.len() - 1 && !part.is_empty() => {
                attributes.insert("suffix".to_string(), part.to_string());
            }
            _ => {}
        }
    }

    if attributes.keys().all(|k| k == "suffix") {
        return None;
    }

    if !extension.is_empty() {
        attributes.insert("extension".to_string(), extension.to_string());
    }

    if let Some(datatype) = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|n| DATATYPES.contains(n))
    {
        attributes.insert("datatype".to_string(), datatype.to_string());
    }

    Some(RawRecord {
        path: path.to_string_lossy().into_owned(),
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_bids_filename() {
        let record =
            parse_bids_path(Path::new("/qc/sub-A/ses-01/anat/sub-A_ses-01_desc-x_T1w.nii.gz"))
                .unwrap();

        assert_eq!(record.get("subject"), Some("A"));
        assert_eq!(record.get("session"), Some("01"));
        assert_eq!(record.get("desc"), Some("x"));
        assert_eq!(record.get("suffix"), Some("T1w"));
        assert_eq!(record.get("extension"), Some(".nii.gz"));
        assert_eq!(record.get("datatype"), Some("anat"));
    }

    #[test]
    fn test_parse_rejects_plain_filenames() {
        assert!(parse_bids_path(Path::new("/qc/README.md")).is_none());
        assert!(parse_bids_path(Path::new("/qc/T1w.png")).is_none());
    }

    #[test]
    fn test_restricted_to_skips_absent_keys() {
        let record = RawRecord::new("a.png", [("subject", "A"), ("desc", "x")]);
        let keys = vec!["subject".to_string(), "session".to_string()];

        let restricted = record.restricted_to(&keys);

        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.get("subject").map(String::as_str), Some("A"));
        assert!(!record.has_all(&keys));
    }

    #[test]
    fn test_bids_source_filters_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let anat = temp_dir.path().join("sub-A").join("anat");
        std::fs::create_dir_all(&anat).unwrap();
        std::fs::write(anat.join("sub-A_desc-x_T1w.png"), b"").unwrap();
        std::fs::write(anat.join("sub-A_desc-y_T1w.PNG"), b"").unwrap();
        std::fs::write(anat.join("sub-A_desc-x_T1w.json"), b"{}").unwrap();

        let source = BidsFileSource::new(temp_dir.path(), vec![".png".to_string()]);
        let records = source.records().unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.get("subject") == Some("A")));
        assert_eq!(records[0].get("desc"), Some("x"));
        assert_eq!(records[1].get("desc"), Some("y"));
    }

    #[test]
    fn test_bids_source_missing_root() {
        let source = BidsFileSource::new("/definitely/not/here", vec![]);
        assert!(source.records().is_err());
    }
}
