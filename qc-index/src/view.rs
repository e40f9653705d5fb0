//! Denormalized read view
//!
//! Entities come back with every reference resolved: one joined query for the
//! entities and one batched query for all their images, stitched together in
//! memory.

use crate::error::IndexResult;
use crate::export::{build_export, ExportTable};
use qc_common::db::{Annotation, Rating};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Id + display name of a referenced row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: i64,
    pub name: String,
    pub component: NamedRef,
    pub row: String,
    pub column: String,
    pub comment: String,
    pub rating: Option<NamedRef>,
    pub annotation: Option<NamedRef>,
    /// Ordered by image position
    pub image_paths: Vec<String>,
}

/// Entity plus the annotations a reviewer may pick for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReview {
    pub entity: EntityView,
    pub available_annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: i64,
    pub rated: i64,
    pub unrated: i64,
    pub rows: i64,
    pub columns: i64,
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    id: i64,
    name: String,
    comment: String,
    component_id: i64,
    component_name: String,
    row_name: String,
    column_name: String,
    rating_id: Option<i64>,
    rating_name: Option<String>,
    annotation_id: Option<i64>,
    annotation_name: Option<String>,
}

impl EntityRow {
    fn into_view(self, image_paths: Vec<String>) -> EntityView {
        let named = |id: Option<i64>, name: Option<String>| match (id, name) {
            (Some(id), Some(name)) => Some(NamedRef { id, name }),
            _ => None,
        };

        EntityView {
            id: self.id,
            name: self.name,
            component: NamedRef {
                id: self.component_id,
                name: self.component_name,
            },
            row: self.row_name,
            column: self.column_name,
            comment: self.comment,
            rating: named(self.rating_id, self.rating_name),
            annotation: named(self.annotation_id, self.annotation_name),
            image_paths,
        }
    }
}

const ENTITY_VIEW_SELECT: &str = r#"
    SELECT
        e.id AS id,
        e.name AS name,
        e.comment AS comment,
        c.id AS component_id,
        c.name AS component_name,
        r.name AS row_name,
        col.name AS column_name,
        rt.id AS rating_id,
        rt.name AS rating_name,
        a.id AS annotation_id,
        a.name AS annotation_name
    FROM entities e
    JOIN components c ON c.id = e.component_id
    JOIN table_rows r ON r.id = e.row_id
    JOIN table_columns col ON col.id = e.column_id
    LEFT JOIN ratings rt ON rt.id = e.rating_id
    LEFT JOIN annotations a ON a.id = e.annotation_id
"#;

pub struct ReadView {
    pool: SqlitePool,
}

impl ReadView {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every entity, ordered by row then column name
    pub async fn entities(&self) -> IndexResult<Vec<EntityView>> {
        let rows = sqlx::query_as::<_, EntityRow>(&format!(
            "{} ORDER BY r.name, col.name",
            ENTITY_VIEW_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        let images: Vec<(i64, String)> =
            sqlx::query_as("SELECT entity_id, path FROM images ORDER BY entity_id, position")
                .fetch_all(&self.pool)
                .await?;

        let mut by_entity: HashMap<i64, Vec<String>> = HashMap::new();
        for (entity_id, path) in images {
            by_entity.entry(entity_id).or_default().push(path);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let paths = by_entity.remove(&row.id).unwrap_or_default();
                row.into_view(paths)
            })
            .collect())
    }

    pub async fn entity(&self, id: i64) -> IndexResult<Option<EntityView>> {
        let row = sqlx::query_as::<_, EntityRow>(&format!("{} WHERE e.id = ?", ENTITY_VIEW_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let paths: Vec<String> =
            sqlx::query_scalar("SELECT path FROM images WHERE entity_id = ? ORDER BY position")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(row.into_view(paths)))
    }

    pub async fn entity_review(&self, id: i64) -> IndexResult<Option<EntityReview>> {
        let Some(entity) = self.entity(id).await? else {
            return Ok(None);
        };
        let available_annotations = self.annotations(entity.component.id).await?;

        Ok(Some(EntityReview {
            entity,
            available_annotations,
        }))
    }

    /// Entity and dimension counts in a single statement
    pub async fn summary(&self) -> IndexResult<Summary> {
        let (total, rated, rows, columns): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(rating_id),
                (SELECT COUNT(*) FROM table_rows) AS n_rows,
                (SELECT COUNT(*) FROM table_columns) AS n_columns
            FROM entities
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Summary {
            total,
            rated,
            unrated: total - rated,
            rows,
            columns,
        })
    }

    pub async fn ratings(&self) -> IndexResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>("SELECT id, name FROM ratings ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ratings)
    }

    pub async fn annotations(&self, component_id: i64) -> IndexResult<Vec<Annotation>> {
        let annotations = sqlx::query_as::<_, Annotation>(
            "SELECT id, name, component_id FROM annotations WHERE component_id = ? ORDER BY id",
        )
        .bind(component_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(annotations)
    }

    pub async fn row_names(&self) -> IndexResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM table_rows ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    pub async fn column_names(&self) -> IndexResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM table_columns ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    /// Row × column export of the whole index
    pub async fn export(&self) -> IndexResult<ExportTable> {
        let rows = self.row_names().await?;
        let columns = self.column_names().await?;
        let entities = self.entities().await?;
        Ok(build_export(&rows, &columns, &entities))
    }
}
