//! QC entity persistence

use crate::error::IndexResult;
use qc_common::db::Entity;
use sqlx::SqliteConnection;

const ENTITY_COLUMNS: &str = "e.id AS id, e.name AS name, e.component_id AS component_id, \
     e.row_id AS row_id, e.column_id AS column_id, e.comment AS comment, \
     e.rating_id AS rating_id, e.annotation_id AS annotation_id";

/// Values for a freshly created, unreviewed entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub name: String,
    pub component_id: i64,
    pub row_id: i64,
    pub column_id: i64,
}

/// Look up the entity occupying the (row, column) cell
pub async fn find_entity_by_cell(
    conn: &mut SqliteConnection,
    row_name: &str,
    column_name: &str,
) -> IndexResult<Option<Entity>> {
    let entity = sqlx::query_as::<_, Entity>(&format!(
        r#"
        SELECT {}
        FROM entities e
        JOIN table_rows r ON r.id = e.row_id
        JOIN table_columns c ON c.id = e.column_id
        WHERE r.name = ? AND c.name = ?
        "#,
        ENTITY_COLUMNS
    ))
    .bind(row_name)
    .bind(column_name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(entity)
}

pub async fn find_entity(conn: &mut SqliteConnection, id: i64) -> IndexResult<Option<Entity>> {
    let entity = sqlx::query_as::<_, Entity>(&format!(
        "SELECT {} FROM entities e WHERE e.id = ?",
        ENTITY_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(entity)
}

/// Insert an unreviewed entity
///
/// A second entity for an occupied cell violates `UNIQUE(row_id, column_id)`
/// and the database error is returned as is.
pub async fn create_entity(conn: &mut SqliteConnection, new: &NewEntity) -> IndexResult<Entity> {
    let result = sqlx::query(
        "INSERT INTO entities (name, component_id, row_id, column_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(new.component_id)
    .bind(new.row_id)
    .bind(new.column_id)
    .execute(&mut *conn)
    .await?;

    Ok(Entity {
        id: result.last_insert_rowid(),
        name: new.name.clone(),
        component_id: new.component_id,
        row_id: new.row_id,
        column_id: new.column_id,
        comment: String::new(),
        rating_id: None,
        annotation_id: None,
    })
}

pub async fn rename_entity(conn: &mut SqliteConnection, id: i64, name: &str) -> IndexResult<()> {
    sqlx::query("UPDATE entities SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Return an entity to the unreviewed state (comment is kept)
pub async fn clear_review(conn: &mut SqliteConnection, id: i64) -> IndexResult<()> {
    sqlx::query("UPDATE entities SET rating_id = NULL, annotation_id = NULL WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_rating(conn: &mut SqliteConnection, id: i64, rating_id: i64) -> IndexResult<()> {
    sqlx::query("UPDATE entities SET rating_id = ? WHERE id = ?")
        .bind(rating_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_annotation(conn: &mut SqliteConnection, id: i64, annotation_id: i64) -> IndexResult<()> {
    sqlx::query("UPDATE entities SET annotation_id = ? WHERE id = ?")
        .bind(annotation_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_comment(conn: &mut SqliteConnection, id: i64, comment: &str) -> IndexResult<()> {
    sqlx::query("UPDATE entities SET comment = ? WHERE id = ?")
        .bind(comment)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
