//! qc-index library
//!
//! Builds a QC review index over a directory of figure images: records are
//! grouped into reviewable entities, reconciled into SQLite and read back as a
//! denormalized view or a tabular export.

pub mod builder;
pub mod db;
pub mod error;
pub mod export;
pub mod matcher;
pub mod qc_spec;
pub mod records;
pub mod reconcile;
pub mod review;
pub mod template;
pub mod view;

pub use crate::builder::{DraftSet, QcEntityDraft};
pub use crate::error::{IndexError, IndexResult};
pub use crate::export::ExportTable;
pub use crate::qc_spec::{ComponentSpec, QcSpecification};
pub use crate::records::{AttributeSource, BidsFileSource, RawRecord};
pub use crate::reconcile::{ReconcileOptions, ReconcileReport, Reconciler, RunSummary};
pub use crate::review::{apply_update, EntityUpdate};
pub use crate::view::{EntityView, ReadView, Summary};
