//! Shared fixtures for qc-index integration tests

#![allow(dead_code)]

use anyhow::Result;
use qc_common::db::{default_ratings, initialize_index, open_memory_database};
use qc_index::matcher::ImageDescriptor;
use qc_index::qc_spec::{ComponentSpec, RowDescription};
use qc_index::RawRecord;
use sqlx::SqlitePool;
use std::path::Path;

/// Fresh in-memory index with the default ratings seeded
pub async fn create_test_index() -> Result<SqlitePool> {
    let pool = open_memory_database().await?;
    initialize_index(&pool, Path::new(":memory:"), &default_ratings()).await?;
    Ok(pool)
}

/// Record for `sub-<subject>_desc-<desc>_<suffix>.png`
pub fn figure(subject: &str, desc: &str, suffix: &str) -> RawRecord {
    RawRecord::new(
        format!("sub-{subject}/figures/sub-{subject}_desc-{desc}_{suffix}.png"),
        [("subject", subject), ("desc", desc), ("suffix", suffix)],
    )
}

/// Component grouped by subject, one row per subject, a fixed column
pub fn component(name: &str, column: &str, descriptors: &[&[(&str, &str)]]) -> ComponentSpec {
    ComponentSpec {
        name: name.to_string(),
        grouping_keys: vec!["subject".to_string()],
        label_template: format!("${{subject}} {name}"),
        column_template: column.to_string(),
        row: RowDescription {
            entities: vec!["subject".to_string()],
            name: "sub-${subject}".to_string(),
        },
        descriptors: descriptors
            .iter()
            .map(|pairs| ImageDescriptor::new(pairs.iter().copied()))
            .collect(),
        annotations: vec!["Motion".to_string(), "Ringing".to_string()],
    }
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn image_paths(pool: &SqlitePool, entity_id: i64) -> Vec<String> {
    sqlx::query_scalar("SELECT path FROM images WHERE entity_id = ? ORDER BY position")
        .bind(entity_id)
        .fetch_all(pool)
        .await
        .unwrap()
}
