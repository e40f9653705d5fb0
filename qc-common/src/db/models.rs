//! Persisted row models
//!
//! One struct per table. Foreign keys are kept as raw ids; resolving them is
//! the read view's job.

use serde::{Deserialize, Serialize};

/// A configured QC component; owns its annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Component {
    pub id: i64,
    pub name: String,
}

/// Component-scoped label a reviewer may assign to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Annotation {
    pub id: i64,
    pub name: String,
    pub component_id: i64,
}

/// Global rating (Pass/Fail/Uncertain, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TableRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TableColumn {
    pub id: i64,
    pub name: String,
}

/// Review status derived from an entity's rating/annotation references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    /// Neither rating nor annotation set
    Unreviewed,
    /// Rating and/or annotation set by a reviewer
    Reviewed,
}

/// Single reviewable cell of the QC matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub component_id: i64,
    pub row_id: i64,
    pub column_id: i64,
    pub comment: String,
    pub rating_id: Option<i64>,
    pub annotation_id: Option<i64>,
}

impl Entity {
    pub fn review_state(&self) -> ReviewState {
        if self.rating_id.is_none() && self.annotation_id.is_none() {
            ReviewState::Unreviewed
        } else {
            ReviewState::Reviewed
        }
    }
}

/// Image attached to an entity; `position` is the display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: i64,
    pub path: String,
    pub entity_id: i64,
    pub position: i64,
}
