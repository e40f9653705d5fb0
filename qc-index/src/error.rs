//! Error types for qc-index
//!
//! Configuration-correctness problems (ambiguous matches, bad templates,
//! cross-component annotations, shared image paths) are surfaced with enough
//! context to fix the QC specification. They are never repaired silently.

use crate::template::TemplateError;
use thiserror::Error;

/// Index construction / reconciliation error
#[derive(Debug, Error)]
pub enum IndexError {
    /// More than one record satisfied an image descriptor within a group
    #[error("Component '{component}': descriptor {descriptor} matched {} images in group {group:?}: {paths:?}", .paths.len())]
    AmbiguousMatch {
        component: String,
        group: Vec<String>,
        descriptor: String,
        paths: Vec<String>,
    },

    /// Component configured without any image descriptor
    #[error("Component '{0}' declares no image descriptors")]
    NoDescriptors(String),

    /// Name/row/column template could not be rendered
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// QC specification is inconsistent
    #[error("Specification error: {0}")]
    Spec(String),

    /// Reviewer tried to assign an annotation owned by another component
    #[error("Annotation {annotation_id} belongs to component {annotation_component}, entity {entity_id} belongs to component {entity_component}")]
    AnnotationComponentMismatch {
        entity_id: i64,
        entity_component: i64,
        annotation_id: i64,
        annotation_component: i64,
    },

    /// Image path already attached to another entity
    #[error("Image {path} is already attached to entity {owner}, cannot attach it to entity {entity}")]
    ImageConflict { path: String, owner: i64, entity: i64 },

    /// Cell already holds an entity of a different component
    #[error("Cell belongs to component '{owner}'")]
    CellOwnedByComponent { owner: String },

    /// Row/column dimension not created before entity creation
    #[error("{kind} '{name}' missing during reconciliation")]
    DimensionMissing { kind: &'static str, name: String },

    /// Entity id does not exist
    #[error("Entity {0} not found")]
    EntityNotFound(i64),

    /// Rating id does not exist
    #[error("Rating {0} not found")]
    UnknownRating(i64),

    /// Annotation id does not exist
    #[error("Annotation {0} not found")]
    UnknownAnnotation(i64),

    /// Failure while reconciling one QC cell
    #[error("Component '{component}' failed at cell (row '{row}', column '{column}'): {source}")]
    AtCell {
        component: String,
        row: String,
        column: String,
        #[source]
        source: Box<IndexError>,
    },

    /// Shared store/config error
    #[error(transparent)]
    Common(#[from] qc_common::Error),

    /// Database error raised directly by a query
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Dataset traversal error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Export record could not be written
    #[error("Export error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
