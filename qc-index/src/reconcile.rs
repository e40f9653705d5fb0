//! Reconciliation engine
//!
//! Upserts builder drafts into the relational model. Each component is applied
//! in its own transaction: any failure rolls that component back and leaves
//! every other component's outcome intact.

use crate::builder::{QcEntityDraft, RenderedEntity};
use crate::db::{
    add_annotation, clear_review, create_entity, find_component, find_entity_by_cell,
    get_or_create_column, get_or_create_component, get_or_create_row, rename_entity, set_images,
    NewEntity,
};
use crate::error::{IndexError, IndexResult};
use crate::qc_spec::ComponentSpec;
use crate::records::RawRecord;
use qc_common::db::{Component, ReviewState};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info};

/// How existing entities are treated when their cell is encountered again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Replace images and name of entities that already exist
    pub update_existing: bool,
    /// When updating, return the entity to the unreviewed state
    pub reset_on_update: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            update_existing: false,
            reset_on_update: true,
        }
    }
}

/// Counts for one committed component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub component: String,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Updated entities whose rating/annotation were cleared
    pub reset: usize,
}

/// Component that was rolled back
#[derive(Debug)]
pub struct ComponentFailure {
    pub component: String,
    /// (row, column) being reconciled when the failure occurred
    pub cell: Option<(String, String)>,
    pub error: IndexError,
}

/// Outcome of a full indexing run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<ReconcileReport>,
    pub failures: Vec<ComponentFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellOutcome {
    Created,
    Skipped,
    Updated { reset: bool },
}

pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply `drafts` for one component inside a single transaction
    pub async fn reconcile(
        &self,
        spec: &ComponentSpec,
        drafts: &[QcEntityDraft],
        options: ReconcileOptions,
    ) -> IndexResult<ReconcileReport> {
        // Template errors surface before anything is written
        let rendered = drafts
            .iter()
            .map(QcEntityDraft::render)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;

        let component = get_or_create_component(&mut tx, &spec.name).await?;
        for annotation in &spec.annotations {
            add_annotation(&mut tx, &component, annotation).await?;
        }

        let row_names: BTreeSet<&str> = rendered.iter().map(|e| e.row.as_str()).collect();
        let column_names: BTreeSet<&str> = rendered.iter().map(|e| e.column.as_str()).collect();

        let mut rows = HashMap::with_capacity(row_names.len());
        for name in row_names {
            let row = get_or_create_row(&mut tx, name).await?;
            rows.insert(row.name, row.id);
        }
        let mut columns = HashMap::with_capacity(column_names.len());
        for name in column_names {
            let column = get_or_create_column(&mut tx, name).await?;
            columns.insert(column.name, column.id);
        }

        let mut report = ReconcileReport {
            component: component.name.clone(),
            ..Default::default()
        };

        for entity in &rendered {
            let outcome = reconcile_cell(&mut tx, &component, entity, &rows, &columns, options)
                .await
                .map_err(|e| IndexError::AtCell {
                    component: component.name.clone(),
                    row: entity.row.clone(),
                    column: entity.column.clone(),
                    source: Box::new(e),
                })?;

            match outcome {
                CellOutcome::Created => report.created += 1,
                CellOutcome::Skipped => report.skipped += 1,
                CellOutcome::Updated { reset } => {
                    report.updated += 1;
                    if reset {
                        report.reset += 1;
                    }
                }
            }
        }

        tx.commit().await?;

        info!(
            component = %report.component,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            reset = report.reset,
            "Reconciled component"
        );

        Ok(report)
    }

    /// Build and reconcile every component against `records`
    ///
    /// Components run sequentially; a failed component is recorded and the
    /// run continues with the next one.
    pub async fn reconcile_all(
        &self,
        specs: &[ComponentSpec],
        records: &[RawRecord],
        options: ReconcileOptions,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for spec in specs {
            let result = match spec.build_drafts(records) {
                Ok(set) => self.reconcile(spec, &set.drafts, options).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(component = %spec.name, "Component rolled back: {}", e);
                    let cell = match &e {
                        IndexError::AtCell { row, column, .. } => Some((row.clone(), column.clone())),
                        _ => None,
                    };
                    summary.failures.push(ComponentFailure {
                        component: spec.name.clone(),
                        cell,
                        error: e,
                    });
                }
            }
        }

        summary
    }
}

async fn reconcile_cell(
    conn: &mut SqliteConnection,
    component: &Component,
    entity: &RenderedEntity,
    rows: &HashMap<String, i64>,
    columns: &HashMap<String, i64>,
    options: ReconcileOptions,
) -> IndexResult<CellOutcome> {
    match find_entity_by_cell(conn, &entity.row, &entity.column).await? {
        None => {
            let row_id = *rows.get(&entity.row).ok_or_else(|| IndexError::DimensionMissing {
                kind: "row",
                name: entity.row.clone(),
            })?;
            let column_id = *columns.get(&entity.column).ok_or_else(|| IndexError::DimensionMissing {
                kind: "column",
                name: entity.column.clone(),
            })?;

            let created = create_entity(
                conn,
                &NewEntity {
                    name: entity.name.clone(),
                    component_id: component.id,
                    row_id,
                    column_id,
                },
            )
            .await?;
            set_images(conn, created.id, &entity.images).await?;

            debug!(entity_id = created.id, name = %entity.name, "Created entity");
            Ok(CellOutcome::Created)
        }
        Some(existing) if existing.component_id != component.id => {
            let owner = find_component(conn, existing.component_id)
                .await?
                .map(|c| c.name)
                .unwrap_or_else(|| existing.component_id.to_string());
            Err(IndexError::CellOwnedByComponent { owner })
        }
        Some(existing) if !options.update_existing => {
            debug!(entity_id = existing.id, "Entity exists, skipping");
            Ok(CellOutcome::Skipped)
        }
        Some(existing) => {
            set_images(conn, existing.id, &entity.images).await?;
            rename_entity(conn, existing.id, &entity.name).await?;

            let reset = options.reset_on_update && existing.review_state() == ReviewState::Reviewed;
            if options.reset_on_update {
                clear_review(conn, existing.id).await?;
            }

            debug!(entity_id = existing.id, reset, "Updated entity");
            Ok(CellOutcome::Updated { reset })
        }
    }
}
