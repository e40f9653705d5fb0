//! Reviewer updates
//!
//! Typed partial update of an entity's rating, annotation and comment. Absent
//! fields are left untouched; nothing here can return an entity to the
//! unreviewed state.

use crate::db::{find_annotation, find_entity, find_rating, set_annotation, set_comment, set_rating};
use crate::error::{IndexError, IndexResult};
use qc_common::db::Entity;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntityUpdate {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub annotation: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl EntityUpdate {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.annotation.is_none() && self.comment.is_none()
    }
}

/// Apply `update` to entity `entity_id` in one transaction
pub async fn apply_update(pool: &SqlitePool, entity_id: i64, update: &EntityUpdate) -> IndexResult<Entity> {
    let mut tx = pool.begin().await?;

    let entity = find_entity(&mut tx, entity_id)
        .await?
        .ok_or(IndexError::EntityNotFound(entity_id))?;

    if let Some(rating_id) = update.rating {
        find_rating(&mut tx, rating_id)
            .await?
            .ok_or(IndexError::UnknownRating(rating_id))?;
        set_rating(&mut tx, entity_id, rating_id).await?;
    }

    if let Some(annotation_id) = update.annotation {
        let annotation = find_annotation(&mut tx, annotation_id)
            .await?
            .ok_or(IndexError::UnknownAnnotation(annotation_id))?;
        if annotation.component_id != entity.component_id {
            return Err(IndexError::AnnotationComponentMismatch {
                entity_id,
                entity_component: entity.component_id,
                annotation_id,
                annotation_component: annotation.component_id,
            });
        }
        set_annotation(&mut tx, entity_id, annotation_id).await?;
    }

    if let Some(comment) = &update.comment {
        let trimmed = comment.trim_matches(|c: char| c == '\n' || c == '\r' || c == ' ');
        set_comment(&mut tx, entity_id, trimmed).await?;
    }

    let updated = find_entity(&mut tx, entity_id)
        .await?
        .ok_or(IndexError::EntityNotFound(entity_id))?;

    tx.commit().await?;

    info!(
        entity_id,
        rating = ?updated.rating_id,
        annotation = ?updated.annotation_id,
        "Applied reviewer update"
    );

    Ok(updated)
}
