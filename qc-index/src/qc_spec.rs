//! QC specification loading
//!
//! The specification file is TOML:
//!
//! ```toml
//! image_extensions = [".png", ".svg"]
//! ratings = ["Pass", "Fail", "Uncertain"]
//!
//! [row_description]
//! entities = ["subject", "session"]
//! name = "sub-${subject}_ses-${session}"
//!
//! [[component]]
//! name = "anat"
//! entities = ["subject", "session"]
//! label = "sub-${subject}_ses-${session} T1w"
//! column = "T1w"
//! annotations = ["Motion", "Ringing"]
//! images = [{ desc = "axial" }, { desc = "sagittal" }]
//! ```

use crate::error::{IndexError, IndexResult};
use crate::matcher::ImageDescriptor;
use crate::template::placeholders;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Global row naming, shared by every component
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowDescription {
    /// Attribute keys the row template may reference
    pub entities: Vec<String>,
    /// Row name template
    pub name: String,
}

/// One `[[component]]` table as written in the file
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    pub entities: Vec<String>,
    pub label: String,
    pub column: String,
    pub images: Vec<ImageDescriptor>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

/// Parsed QC specification
#[derive(Debug, Clone, Deserialize)]
pub struct QcSpecification {
    pub row_description: RowDescription,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Rating enumeration; `None` → built-in defaults
    #[serde(default)]
    pub ratings: Option<Vec<String>>,

    #[serde(default, rename = "component")]
    pub components: Vec<ComponentConfig>,
}

fn default_image_extensions() -> Vec<String> {
    vec![".png".to_string(), ".svg".to_string()]
}

/// Everything the builder and reconciler need for one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    pub name: String,
    pub grouping_keys: Vec<String>,
    pub label_template: String,
    pub column_template: String,
    pub row: RowDescription,
    pub descriptors: Vec<ImageDescriptor>,
    pub annotations: Vec<String>,
}

impl QcSpecification {
    /// Read, parse and check a specification file
    pub fn load(path: &Path) -> IndexResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let spec = Self::from_toml_str(&content)
            .map_err(|e| match e {
                IndexError::Spec(msg) => IndexError::Spec(format!("{}: {}", path.display(), msg)),
                other => other,
            })?;

        tracing::info!(
            "Loaded QC specification {} ({} components)",
            path.display(),
            spec.components.len()
        );
        Ok(spec)
    }

    pub fn from_toml_str(content: &str) -> IndexResult<Self> {
        let spec: Self = toml::from_str(content).map_err(|e| IndexError::Spec(e.to_string()))?;
        spec.check()?;
        Ok(spec)
    }

    /// One [`ComponentSpec`] per configured component, in file order
    pub fn components(&self) -> Vec<ComponentSpec> {
        self.components
            .iter()
            .map(|c| ComponentSpec {
                name: c.name.clone(),
                grouping_keys: c.entities.clone(),
                label_template: c.label.clone(),
                column_template: c.column.clone(),
                row: self.row_description.clone(),
                descriptors: c.images.clone(),
                annotations: c.annotations.clone(),
            })
            .collect()
    }

    /// Global rating enumeration
    pub fn ratings(&self) -> Vec<String> {
        self.ratings
            .clone()
            .unwrap_or_else(qc_common::db::default_ratings)
    }

    /// Cross-field consistency: unique component names, descriptors present,
    /// templates only referencing keys they will be rendered with.
    fn check(&self) -> IndexResult<()> {
        check_template_keys(
            "row_description.name",
            &self.row_description.name,
            &self.row_description.entities,
        )?;

        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.name.as_str()) {
                return Err(IndexError::Spec(format!(
                    "component '{}' is declared twice",
                    component.name
                )));
            }

            if component.images.is_empty() {
                return Err(IndexError::NoDescriptors(component.name.clone()));
            }

            check_template_keys(
                &format!("{}.label", component.name),
                &component.label,
                &component.entities,
            )?;
            check_template_keys(
                &format!("{}.column", component.name),
                &component.column,
                &component.entities,
            )?;
        }

        Ok(())
    }
}

fn check_template_keys(field: &str, template: &str, allowed: &[String]) -> IndexResult<()> {
    for key in placeholders(template)? {
        if !allowed.contains(&key) {
            return Err(IndexError::Spec(format!(
                "{} references '{}' which is not one of {:?}",
                field, key, allowed
            )));
        }
    }
    Ok(())
}
