//! Image attachment
//!
//! An image path belongs to at most one entity (`images.path` is unique).

use crate::error::{IndexError, IndexResult};
use qc_common::db::Image;
use sqlx::SqliteConnection;
use tracing::warn;

/// Replace the images of `entity_id` with `paths`, in order
///
/// A path already attached to another entity is a configuration conflict and
/// fails with [`IndexError::ImageConflict`]; the caller's transaction then
/// rolls back. A path repeated within `paths` is attached once.
pub async fn set_images(conn: &mut SqliteConnection, entity_id: i64, paths: &[String]) -> IndexResult<()> {
    sqlx::query("DELETE FROM images WHERE entity_id = ?")
        .bind(entity_id)
        .execute(&mut *conn)
        .await?;

    for (position, path) in paths.iter().enumerate() {
        let owner: Option<i64> = sqlx::query_scalar("SELECT entity_id FROM images WHERE path = ?")
            .bind(path)
            .fetch_optional(&mut *conn)
            .await?;

        match owner {
            Some(owner) if owner == entity_id => {
                warn!(entity_id, path = %path, "Image listed twice for entity, keeping first");
            }
            Some(owner) => {
                return Err(IndexError::ImageConflict {
                    path: path.clone(),
                    owner,
                    entity: entity_id,
                });
            }
            None => {
                sqlx::query("INSERT INTO images (path, entity_id, position) VALUES (?, ?, ?)")
                    .bind(path)
                    .bind(entity_id)
                    .bind(position as i64)
                    .execute(&mut *conn)
                    .await?;
            }
        }
    }

    Ok(())
}

pub async fn images_for_entity(conn: &mut SqliteConnection, entity_id: i64) -> IndexResult<Vec<Image>> {
    let images = sqlx::query_as::<_, Image>(
        "SELECT id, path, entity_id, position FROM images WHERE entity_id = ? ORDER BY position",
    )
    .bind(entity_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(images)
}
