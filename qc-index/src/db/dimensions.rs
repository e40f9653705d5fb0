//! Get-or-create for the named dimensions
//!
//! Components, ratings, rows and columns are idempotent by unique name;
//! annotations by (name, component). A conflicting insert returns the existing
//! row rather than an error.

use crate::error::IndexResult;
use qc_common::db::{Annotation, Component, Rating, TableColumn, TableRow};
use sqlx::SqliteConnection;
use tracing::debug;

/// Tables holding a unique `name` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamedTable {
    Components,
    Ratings,
    Rows,
    Columns,
}

impl NamedTable {
    fn table(self) -> &'static str {
        match self {
            NamedTable::Components => "components",
            NamedTable::Ratings => "ratings",
            NamedTable::Rows => "table_rows",
            NamedTable::Columns => "table_columns",
        }
    }
}

async fn get_or_create_named(
    conn: &mut SqliteConnection,
    kind: NamedTable,
    name: &str,
) -> IndexResult<i64> {
    let table = kind.table();

    let inserted = sqlx::query(&format!(
        "INSERT INTO {} (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
        table
    ))
    .bind(name)
    .execute(&mut *conn)
    .await?;

    let id: i64 = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE name = ?", table))
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    if inserted.rows_affected() > 0 {
        debug!(table, name, id, "Created");
    }

    Ok(id)
}

pub async fn get_or_create_component(conn: &mut SqliteConnection, name: &str) -> IndexResult<Component> {
    let id = get_or_create_named(conn, NamedTable::Components, name).await?;
    Ok(Component {
        id,
        name: name.to_string(),
    })
}

pub async fn get_or_create_rating(conn: &mut SqliteConnection, name: &str) -> IndexResult<Rating> {
    let id = get_or_create_named(conn, NamedTable::Ratings, name).await?;
    Ok(Rating {
        id,
        name: name.to_string(),
    })
}

pub async fn get_or_create_row(conn: &mut SqliteConnection, name: &str) -> IndexResult<TableRow> {
    let id = get_or_create_named(conn, NamedTable::Rows, name).await?;
    Ok(TableRow {
        id,
        name: name.to_string(),
    })
}

pub async fn get_or_create_column(conn: &mut SqliteConnection, name: &str) -> IndexResult<TableColumn> {
    let id = get_or_create_named(conn, NamedTable::Columns, name).await?;
    Ok(TableColumn {
        id,
        name: name.to_string(),
    })
}

/// Add `name` to `component`'s annotations, or return the existing one
pub async fn add_annotation(
    conn: &mut SqliteConnection,
    component: &Component,
    name: &str,
) -> IndexResult<Annotation> {
    let inserted = sqlx::query(
        "INSERT INTO annotations (name, component_id) VALUES (?, ?) ON CONFLICT(name, component_id) DO NOTHING",
    )
    .bind(name)
    .bind(component.id)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 0 {
        debug!(
            component = %component.name,
            annotation = name,
            "Annotation already exists, keeping existing row"
        );
    }

    let annotation = sqlx::query_as::<_, Annotation>(
        "SELECT id, name, component_id FROM annotations WHERE name = ? AND component_id = ?",
    )
    .bind(name)
    .bind(component.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(annotation)
}

pub async fn find_component(conn: &mut SqliteConnection, id: i64) -> IndexResult<Option<Component>> {
    let component = sqlx::query_as::<_, Component>("SELECT id, name FROM components WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(component)
}

pub async fn find_rating(conn: &mut SqliteConnection, id: i64) -> IndexResult<Option<Rating>> {
    let rating = sqlx::query_as::<_, Rating>("SELECT id, name FROM ratings WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rating)
}

pub async fn find_annotation(conn: &mut SqliteConnection, id: i64) -> IndexResult<Option<Annotation>> {
    let annotation = sqlx::query_as::<_, Annotation>(
        "SELECT id, name, component_id FROM annotations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_common::db::{default_ratings, initialize_index, open_memory_database};
    use sqlx::SqlitePool;
    use std::path::Path;

    async fn setup_test_db() -> SqlitePool {
        let pool = open_memory_database().await.unwrap();
        initialize_index(&pool, Path::new(":memory:"), &default_ratings())
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent_by_name() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create_row(&mut conn, "sub-A").await.unwrap();
        let second = get_or_create_row(&mut conn, "sub-A").await.unwrap();
        let other = get_or_create_row(&mut conn, "sub-B").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first.id, other.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM table_rows")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_rating_get_or_create_returns_seeded_row() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let pass = get_or_create_rating(&mut conn, "Pass").await.unwrap();

        assert_eq!(pass.id, 1);
        assert_eq!(find_rating(&mut conn, pass.id).await.unwrap(), Some(pass));
        assert_eq!(find_rating(&mut conn, 999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_annotation_returns_existing_on_conflict() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let component = get_or_create_component(&mut conn, "TEST").await.unwrap();

        let first = add_annotation(&mut conn, &component, "12345").await.unwrap();
        let second = add_annotation(&mut conn, &component, "12345").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.component_id, component.id);
    }

    #[tokio::test]
    async fn test_same_annotation_name_in_two_components() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let anat = get_or_create_component(&mut conn, "anat").await.unwrap();
        let func = get_or_create_component(&mut conn, "func").await.unwrap();

        let a = add_annotation(&mut conn, &anat, "Motion").await.unwrap();
        let b = add_annotation(&mut conn, &func, "Motion").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(find_annotation(&mut conn, b.id).await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_find_component_by_id() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let anat = get_or_create_component(&mut conn, "anat").await.unwrap();

        assert_eq!(find_component(&mut conn, anat.id).await.unwrap(), Some(anat));
        assert_eq!(find_component(&mut conn, 999).await.unwrap(), None);
    }
}
