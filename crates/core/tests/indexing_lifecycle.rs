use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use mdrecall_core::manifest::ManifestDb;
use mdrecall_core::store::{
    HashingEmbedder, InMemoryCollection, InMemoryProvider,
};
use mdrecall_core::{SearchConfig, SearchFilters, ServiceError, VaultService};

fn service_over(
    root: &Path,
    manifest: ManifestDb,
    collection: InMemoryCollection,
) -> VaultService {
    VaultService::new(
        root.to_path_buf(),
        Vec::new(),
        manifest,
        Arc::new(InMemoryProvider::new(collection)),
        Arc::new(HashingEmbedder::default()),
        None,
        SearchConfig::default(),
    )
    .unwrap()
}

fn service(root: &Path) -> VaultService {
    service_over(
        root,
        ManifestDb::open_in_memory().unwrap(),
        InMemoryCollection::new(),
    )
}

#[test]
fn incremental_pass_is_idempotent() {
    let vault = tempdir().unwrap();
    fs::write(vault.path().join("a.md"), "# A\n\nalpha body").unwrap();
    fs::write(vault.path().join("b.md"), "# B\n\nbeta body").unwrap();

    let svc = service(vault.path());
    let first = svc.index(false).unwrap();
    assert_eq!((first.added, first.updated, first.deleted), (2, 0, 0));

    let second = svc.index(false).unwrap();
    assert_eq!((second.added, second.updated, second.deleted), (0, 0, 0));
    assert_eq!(second.skipped, 2);
}

#[test]
fn only_the_edited_document_is_reindexed() {
    let vault = tempdir().unwrap();
    fs::write(vault.path().join("a.md"), "# A\n\none").unwrap();
    fs::write(vault.path().join("b.md"), "# B\n\ntwo").unwrap();

    let svc = service(vault.path());
    svc.index(false).unwrap();

    fs::write(vault.path().join("a.md"), "# A\n\nchanged").unwrap();
    let report = svc.index(false).unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn touch_without_content_change_is_skipped() {
    let vault = tempdir().unwrap();
    let path = vault.path().join("a.md");
    fs::write(&path, "# A\n\nsame content").unwrap();

    let svc = service(vault.path());
    svc.index(false).unwrap();

    // Rewrite identical bytes; only the mtime moves.
    fs::write(&path, "# A\n\nsame content").unwrap();
    let report = svc.index(false).unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 1);
}

#[test]
fn deleted_file_disappears_from_every_structure() {
    let vault = tempdir().unwrap();
    fs::write(vault.path().join("a.md"), "# A\n\n[[B]]").unwrap();
    fs::write(vault.path().join("b.md"), "# B\n\ntarget body").unwrap();

    let svc = service(vault.path());
    svc.index(false).unwrap();
    assert_eq!(svc.backlinks("B").unwrap(), vec!["a.md".to_string()]);

    fs::remove_file(vault.path().join("a.md")).unwrap();
    let report = svc.index(false).unwrap();
    assert_eq!(report.deleted, 1);

    assert!(svc.backlinks("B").unwrap().is_empty());
    assert!(svc
        .search("target body", 5, &SearchFilters::default())
        .unwrap()
        .iter()
        .all(|h| h.path != "a.md"));
}

#[test]
fn moved_document_keeps_title_resolution() {
    let vault = tempdir().unwrap();
    fs::write(vault.path().join("old.md"), "# Widget\n\nspecs here").unwrap();
    fs::write(vault.path().join("ref.md"), "# Ref\n\nSee [[Widget]].").unwrap();

    let svc = service(vault.path());
    svc.index(false).unwrap();

    fs::rename(vault.path().join("old.md"), vault.path().join("new.md"))
        .unwrap();
    let report = svc.index(false).unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.added, 1);

    assert!(matches!(svc.read("old.md"), Err(ServiceError::NotFound(_))));
    assert_eq!(svc.read("new.md").unwrap().title, "Widget");
    assert_eq!(svc.backlinks("Widget").unwrap(), vec!["ref.md".to_string()]);
}

#[test]
fn restart_resumes_from_the_manifest() {
    let vault = tempdir().unwrap();
    let state = tempdir().unwrap();
    let db_path = state.path().join("index.db");
    fs::write(vault.path().join("a.md"), "# A\n\nalpha [[b]]").unwrap();
    fs::write(vault.path().join("b.md"), "# B\n\nbeta").unwrap();

    let collection = InMemoryCollection::new();

    {
        let svc = service_over(
            vault.path(),
            ManifestDb::open(&db_path).unwrap(),
            collection.clone(),
        );
        assert_eq!(svc.index(false).unwrap().added, 2);
    }

    // New process: fresh in-memory state, same manifest and collection.
    let svc = service_over(
        vault.path(),
        ManifestDb::open(&db_path).unwrap(),
        collection,
    );
    let report = svc.index(false).unwrap();
    assert_eq!((report.added, report.updated), (0, 0));
    assert_eq!(report.skipped, 2);

    // Hydrated structures answer queries without re-embedding.
    assert_eq!(svc.backlinks("b").unwrap(), vec!["a.md".to_string()]);
    assert!(!svc
        .search("alpha", 5, &SearchFilters::default())
        .unwrap()
        .is_empty());
}

#[test]
fn full_rebuild_reindexes_unchanged_documents() {
    let vault = tempdir().unwrap();
    fs::write(vault.path().join("a.md"), "# A\n\nbody").unwrap();

    let svc = service(vault.path());
    svc.index(false).unwrap();

    let report = svc.index(true).unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 0);
}

#[test]
fn excluded_folders_are_never_indexed() {
    let vault = tempdir().unwrap();
    fs::create_dir(vault.path().join("templates")).unwrap();
    fs::write(vault.path().join("note.md"), "# Note\n\nkeep").unwrap();
    fs::write(
        vault.path().join("templates/daily.md"),
        "# Daily\n\ntemplate text",
    )
    .unwrap();

    let svc = VaultService::new(
        vault.path().to_path_buf(),
        vec!["templates".into()],
        ManifestDb::open_in_memory().unwrap(),
        Arc::new(InMemoryProvider::new(InMemoryCollection::new())),
        Arc::new(HashingEmbedder::default()),
        None,
        SearchConfig::default(),
    )
    .unwrap();

    let report = svc.index(false).unwrap();
    assert_eq!(report.added, 1);
    assert!(matches!(
        svc.read("note.md"),
        Ok(doc) if doc.title == "Note"
    ));
}
