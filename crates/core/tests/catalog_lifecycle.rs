//! Catalog operation integration tests.
//!
//! These tests drive the catalog operation against a temporary library:
//! - Canonical renames and catalog entries
//! - Skips for unparseable, duplicate and unreachable items
//! - Dry-run simulation, confirmation and decline

mod common;

use common::{snapshot, TestHarness};
use marquee_core::{
    catalog::AssetKind,
    external_catalog::ExternalCatalogError,
    testing::fixtures,
    MovieId, RunStatus, SkipCategory,
};

#[tokio::test]
async fn test_matrix_is_renamed_and_catalogued() {
    let harness = TestHarness::new();
    let source = harness.add_video("The.Matrix.1999.1080p.BluRay.mkv");
    harness
        .catalog
        .add_search_results("The Matrix", vec![fixtures::movie(603, "The Matrix", 1999)])
        .await;

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Executed);
    assert!(report.skips.is_empty());
    let canonical = harness
        .root()
        .join("The Matrix (1999)/The Matrix (1999).mkv");
    assert!(!source.exists());
    assert!(canonical.exists());

    let store = harness.library_store();
    let entry = store.find(MovieId(603)).expect("entry should be persisted");
    assert_eq!(entry.title, "The Matrix");
    assert_eq!(entry.year, 1999);
    assert_eq!(
        entry.path,
        std::path::PathBuf::from("The Matrix (1999)/The Matrix (1999).mkv")
    );
}

#[tokio::test]
async fn test_randomfile_is_unparseable() {
    let harness = TestHarness::new();
    let source = harness.add_video("randomfile.mkv");

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::NothingToDo);
    assert_eq!(report.skipped(SkipCategory::Unparseable), 1);
    assert!(source.exists());
    assert!(harness.catalog.recorded_searches().await.is_empty());
    assert!(harness.library_store().is_empty());
}

#[tokio::test]
async fn test_same_movie_twice_is_catalogued_once() {
    let harness = TestHarness::new();
    harness.add_video("Up.2009.mkv");
    harness.add_video("Up (2009) Directors Cut.mkv");
    harness
        .catalog
        .add_search_results("Up", vec![fixtures::movie(14160, "Up", 2009)])
        .await;

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();

    assert_eq!(report.skipped(SkipCategory::Duplicate), 1);
    assert_eq!(harness.library_store().len(), 1);
    assert!(harness.root().join("Up (2009)/Up (2009).mkv").exists());

    // ' ' sorts before '.', so the Directors Cut is enumerated first and kept.
    assert!(!harness.root().join("Up (2009) Directors Cut.mkv").exists());
    assert!(harness.root().join("Up.2009.mkv").exists());
    let duplicate = report
        .skips
        .iter()
        .find(|r| r.category == SkipCategory::Duplicate)
        .unwrap();
    assert_eq!(duplicate.path, harness.root().join("Up.2009.mkv"));
    assert!(duplicate
        .detail
        .as_deref()
        .unwrap()
        .contains("Up (2009) Directors Cut.mkv, which sorts first"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_folder_is_reported_as_permission_error() {
    use std::os::unix::fs::PermissionsExt;

    let harness = TestHarness::new();
    harness.add_video("Heat (1995)/Heat (1995).mkv");
    let locked = harness.root().join("Heat (1995)");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::read_dir(&locked).is_ok() {
        // Mode bits do not bind root.
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.status, RunStatus::NothingToDo);
    assert_eq!(report.skipped(SkipCategory::PermissionError), 1);
    assert_eq!(report.skips[0].path, locked);
    assert!(harness.library_store().is_empty());
}

#[tokio::test]
async fn test_declined_dry_run_changes_nothing() {
    let harness = TestHarness::new();
    harness.add_video("The.Matrix.1999.1080p.BluRay.mkv");
    harness.add_video("randomfile.mkv");
    harness
        .catalog
        .add_search_results("The Matrix", vec![fixtures::movie(603, "The Matrix", 1999)])
        .await;
    let before = snapshot(harness.root());

    let report = harness
        .reconciler(false)
        .catalog(&harness.options(true))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.simulation.total(), 1);
    assert!(report.simulation.lines[0].starts_with("[0] MOVE "));
    assert_eq!(snapshot(harness.root()), before);
}

#[tokio::test]
async fn test_confirmed_dry_run_executes() {
    let harness = TestHarness::new();
    harness.add_video("The.Matrix.1999.1080p.BluRay.mkv");
    harness
        .catalog
        .add_search_results("The Matrix", vec![fixtures::movie(603, "The Matrix", 1999)])
        .await;

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(true))
        .await
        .unwrap();

    assert!(report.is_executed());
    assert!(harness
        .root()
        .join("The Matrix (1999)/The Matrix (1999).mkv")
        .exists());
    assert!(harness.library_store().contains(MovieId(603)));
}

#[tokio::test]
async fn test_second_run_skips_catalogued_files() {
    let harness = TestHarness::new();
    harness.add_video("The.Matrix.1999.1080p.BluRay.mkv");
    harness
        .catalog
        .add_search_results("The Matrix", vec![fixtures::movie(603, "The Matrix", 1999)])
        .await;

    let reconciler = harness.reconciler(true);
    reconciler.catalog(&harness.options(false)).await.unwrap();
    let searches = harness.catalog.recorded_searches().await.len();

    let report = reconciler.catalog(&harness.options(false)).await.unwrap();
    assert_eq!(report.status, RunStatus::NothingToDo);
    assert_eq!(harness.catalog.recorded_searches().await.len(), searches);
    assert_eq!(harness.library_store().len(), 1);
}

#[tokio::test]
async fn test_canonical_file_is_recorded_with_its_trailer() {
    let harness = TestHarness::new();
    harness.add_video("Heat (1995)/Heat (1995).mkv");
    harness.add_video("Heat (1995)/Heat (1995)-trailer.mp4");
    harness
        .catalog
        .add_search_results("Heat", vec![fixtures::movie(949, "Heat", 1995)])
        .await;

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();

    assert!(report.is_executed());
    assert_eq!(report.simulation.total(), 0);
    assert!(report.simulation.lines[0].starts_with("NOTE RECORD Heat (1995)"));

    let entry = harness.library_store().find(MovieId(949)).unwrap();
    assert_eq!(
        entry.asset(AssetKind::Trailer),
        Some(std::path::Path::new("Heat (1995)/Heat (1995)-trailer.mp4"))
    );
}

#[tokio::test]
async fn test_unreachable_service_is_reported_not_fatal() {
    let harness = TestHarness::new();
    let source = harness.add_video("The.Matrix.1999.mkv");
    harness
        .catalog
        .fail_next_searches(2, || ExternalCatalogError::RateLimitExceeded)
        .await;

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();

    assert_eq!(report.skipped(SkipCategory::TransientNetwork), 1);
    assert_eq!(harness.catalog.recorded_searches().await.len(), 2);
    assert!(source.exists());
}

#[tokio::test]
async fn test_ambiguous_and_unmatched_are_skipped() {
    let harness = TestHarness::new();
    harness.add_video("Dune.2021.mkv");
    harness.add_video("Nothing.Here.2003.mkv");
    harness
        .catalog
        .add_search_results(
            "Dune",
            vec![
                fixtures::movie(438631, "Dune", 2021),
                fixtures::movie(999001, "Dune", 2021),
            ],
        )
        .await;

    let report = harness
        .reconciler(true)
        .catalog(&harness.options(false))
        .await
        .unwrap();

    assert_eq!(report.skipped(SkipCategory::Ambiguous), 1);
    assert_eq!(report.skipped(SkipCategory::Unmatched), 1);
    assert!(harness.root().join("Dune.2021.mkv").exists());
    assert!(harness.library_store().is_empty());
}
