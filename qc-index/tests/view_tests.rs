//! Read view, reviewer update and export tests

mod helpers;

use helpers::{component, create_test_index, figure};
use qc_index::{apply_update, EntityUpdate, IndexError, ReadView, ReconcileOptions, Reconciler};
use sqlx::SqlitePool;

/// anat (T1w column, two images) and func (bold column) for subjects A and B
async fn populated_index() -> SqlitePool {
    let pool = create_test_index().await.unwrap();
    let specs = vec![
        component("anat", "T1w", &[&[("desc", "y")], &[("desc", "x")]]),
        component("func", "bold", &[&[("suffix", "bold")]]),
    ];
    let records = vec![
        figure("A", "x", "T1w"),
        figure("A", "y", "T1w"),
        figure("B", "x", "T1w"),
        figure("B", "y", "T1w"),
        figure("A", "z", "bold"),
    ];

    let summary = Reconciler::new(pool.clone())
        .reconcile_all(&specs, &records, ReconcileOptions::default())
        .await;
    assert!(summary.is_success());
    pool
}

async fn annotation_id(pool: &SqlitePool, component: &str, name: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT a.id FROM annotations a JOIN components c ON c.id = a.component_id WHERE c.name = ? AND a.name = ?",
    )
    .bind(component)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_entities_resolved_with_ordered_images() {
    let pool = populated_index().await;
    let view = ReadView::new(pool.clone());

    let entities = view.entities().await.unwrap();

    let cells: Vec<(&str, &str)> = entities
        .iter()
        .map(|e| (e.row.as_str(), e.column.as_str()))
        .collect();
    assert_eq!(
        cells,
        vec![("sub-A", "T1w"), ("sub-A", "bold"), ("sub-B", "T1w")]
    );

    let a_t1w = &entities[0];
    assert_eq!(a_t1w.name, "A anat");
    assert_eq!(a_t1w.component.name, "anat");
    assert_eq!(a_t1w.rating, None);
    assert_eq!(a_t1w.annotation, None);
    assert_eq!(
        a_t1w.image_paths,
        vec![
            "sub-A/figures/sub-A_desc-y_T1w.png",
            "sub-A/figures/sub-A_desc-x_T1w.png",
        ]
    );
    assert_eq!(entities[1].image_paths.len(), 1);

    let single = view.entity(a_t1w.id).await.unwrap();
    assert_eq!(single.as_ref(), Some(a_t1w));
    assert_eq!(view.entity(9999).await.unwrap(), None);
}

#[tokio::test]
async fn test_summary_counts() {
    let pool = populated_index().await;
    let view = ReadView::new(pool.clone());
    let first = view.entities().await.unwrap()[0].id;

    apply_update(
        &pool,
        first,
        &EntityUpdate {
            rating: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let summary = view.summary().await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.rated, 1);
    assert_eq!(summary.unrated, 2);
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.columns, 2);
}

#[tokio::test]
async fn test_review_resolves_rating_annotation_and_trims_comment() {
    let pool = populated_index().await;
    let view = ReadView::new(pool.clone());
    let entity = view.entities().await.unwrap()[0].clone();
    let motion = annotation_id(&pool, "anat", "Motion").await;

    let updated = apply_update(
        &pool,
        entity.id,
        &EntityUpdate {
            rating: Some(2),
            annotation: Some(motion),
            comment: Some("\n  ghosting on axial slices \n".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.comment, "ghosting on axial slices");
    let resolved = view.entity(entity.id).await.unwrap().unwrap();
    assert_eq!(resolved.rating.map(|r| r.name), Some("Fail".to_string()));
    assert_eq!(resolved.annotation.map(|a| a.name), Some("Motion".to_string()));
}

#[tokio::test]
async fn test_annotation_of_other_component_rejected() {
    let pool = populated_index().await;
    let view = ReadView::new(pool.clone());
    let anat_entity = view.entities().await.unwrap()[0].id;
    let func_motion = annotation_id(&pool, "func", "Motion").await;

    let result = apply_update(
        &pool,
        anat_entity,
        &EntityUpdate {
            rating: Some(1),
            annotation: Some(func_motion),
            comment: None,
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(IndexError::AnnotationComponentMismatch { annotation_id, .. }) if annotation_id == func_motion
    ));
    // The rating set earlier in the same update is rolled back
    let after = view.entity(anat_entity).await.unwrap().unwrap();
    assert_eq!(after.rating, None);
}

#[tokio::test]
async fn test_update_lookup_failures() {
    let pool = populated_index().await;
    let first = ReadView::new(pool.clone()).entities().await.unwrap()[0].id;

    let missing_entity = apply_update(&pool, 9999, &EntityUpdate::default()).await;
    assert!(matches!(missing_entity, Err(IndexError::EntityNotFound(9999))));

    let unknown_rating = apply_update(
        &pool,
        first,
        &EntityUpdate {
            rating: Some(42),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(unknown_rating, Err(IndexError::UnknownRating(42))));

    let unknown_annotation = apply_update(
        &pool,
        first,
        &EntityUpdate {
            annotation: Some(42),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(unknown_annotation, Err(IndexError::UnknownAnnotation(42))));
}

#[tokio::test]
async fn test_entity_review_lists_component_annotations() {
    let pool = populated_index().await;
    let view = ReadView::new(pool.clone());
    let entity = view.entities().await.unwrap()[1].clone();

    let review = view.entity_review(entity.id).await.unwrap().unwrap();

    assert_eq!(review.entity.component.name, "func");
    let names: Vec<&str> = review
        .available_annotations
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, vec!["Motion", "Ringing"]);
    assert!(review
        .available_annotations
        .iter()
        .all(|a| a.component_id == entity.component.id));
    assert_eq!(view.ratings().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_export_fills_missing_cells() {
    let pool = populated_index().await;
    let view = ReadView::new(pool.clone());
    let a_t1w = view.entities().await.unwrap()[0].id;
    apply_update(
        &pool,
        a_t1w,
        &EntityUpdate {
            rating: Some(1),
            comment: Some("line one\nline two".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let table = view.export().await.unwrap();

    assert_eq!(
        table.header,
        vec!["subjects", "T1w", "T1w_passfail", "T1w_comment", "bold", "bold_passfail", "bold_comment"]
    );
    assert_eq!(
        table.rows[0],
        vec!["sub-A", "", "Pass", "line one\nline two", "", "", ""]
    );
    // sub-B has no bold entity
    assert_eq!(table.rows[1], vec!["sub-B", "", "", "", "", "", ""]);

    let tsv = table.to_tsv().unwrap();
    let records: Vec<csv::StringRecord> = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(tsv.as_bytes())
        .records()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][3], "line one\nline two");
}

#[tokio::test]
async fn test_ratings_listed_in_seed_order() {
    let pool = populated_index().await;

    let ratings = ReadView::new(pool.clone()).ratings().await.unwrap();

    let listed: Vec<(i64, &str)> = ratings.iter().map(|r| (r.id, r.name.as_str())).collect();
    assert_eq!(listed, vec![(1, "Pass"), (2, "Fail"), (3, "Uncertain")]);
}
