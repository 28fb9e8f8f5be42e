mod common;

use assert2::check;
use common::{TestService, empty_service, seeded_service, write_manifest};
use rstest::rstest;
use rust_docs_search::tools::Status;
use rust_docs_search::tools::generate::{GenerateDocsRequest, generate_crate_docs};
use rust_docs_search::tools::search::{SearchDocsRequest, search_rust_docs};
use serde_json::json;

fn request(crate_path: &std::path::Path) -> GenerateDocsRequest {
    GenerateDocsRequest {
        crate_path: crate_path.display().to_string(),
        include_dependencies: true,
        timeout_secs: None,
    }
}

fn demo_manifest() -> serde_json::Value {
    json!({
        "name": "demo",
        "version": "0.1.0",
        "dependencies": [],
        "items": [
            {
                "path": "demo::engine::start",
                "kind": "function",
                "crate_name": "demo",
                "summary": "Starts the demo engine"
            },
            {
                "path": "demo::engine::Engine",
                "kind": "struct",
                "crate_name": "demo",
                "summary": "The demo engine"
            }
        ]
    })
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generated_docs_become_searchable(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(crate_dir.path(), &demo_manifest());

    let response = generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();
    check!(response.status == Status::Success, "{:?}", response);
    check!(response.doc_count == 2);

    let found = search_rust_docs(
        &empty_service.service,
        SearchDocsRequest {
            query: "engine".to_string(),
            crate_name: Some("demo".to_string()),
            max_results: 5,
            include_std: true,
        },
    )
    .await
    .unwrap();
    check!(!found.results.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dependencies_are_ingested_when_requested(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(
        crate_dir.path(),
        &json!({
            "name": "app",
            "version": "1.0.0",
            "dependencies": ["fast-helper"],
            "items": [
                {"path": "app::run", "kind": "function", "crate_name": "app"}
            ]
        }),
    );
    std::fs::create_dir(crate_dir.path().join("deps")).unwrap();
    std::fs::write(
        crate_dir.path().join("deps/fast_helper.json"),
        serde_json::to_string(&json!({
            "name": "fast-helper",
            "version": "0.2.0",
            "items": [
                {"path": "fast-helper::assist", "kind": "function", "crate_name": "fast-helper"}
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let response = generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();
    check!(response.status == Status::Success, "{:?}", response);
    check!(response.doc_count == 2);
    check!(empty_service.service.get_item("fast-helper::assist").await.is_ok());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dependencies_are_skipped_when_not_requested(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(
        crate_dir.path(),
        &json!({
            "name": "app",
            "version": "1.0.0",
            "dependencies": ["fast-helper"],
            "items": [
                {"path": "app::run", "kind": "function", "crate_name": "app"}
            ]
        }),
    );
    std::fs::create_dir(crate_dir.path().join("deps")).unwrap();
    std::fs::write(
        crate_dir.path().join("deps/fast_helper.json"),
        serde_json::to_string(&json!({
            "name": "fast-helper",
            "items": [
                {"path": "fast-helper::assist", "kind": "function", "crate_name": "fast-helper"}
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let mut req = request(crate_dir.path());
    req.include_dependencies = false;
    let response = generate_crate_docs(&empty_service.service, req).await.unwrap();

    check!(response.doc_count == 1);
    check!(empty_service.service.get_item("fast-helper::assist").await.is_err());
    // The dependency is still recorded by name on the primary crate.
    let app = empty_service.service.store().get_crate("app").await.unwrap();
    check!(app.dependencies == vec!["fast-helper".to_string()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_manifest_reports_error_and_stores_nothing(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();

    let response = generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();

    check!(response.status == Status::Error);
    check!(response.doc_count == 0);
    check!(empty_service.service.store().crate_names().await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_generation_keeps_the_previous_snapshot(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(crate_dir.path(), &demo_manifest());
    generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();

    // Second manifest is malformed: item path claims a different crate.
    write_manifest(
        crate_dir.path(),
        &json!({
            "name": "demo",
            "version": "0.2.0",
            "items": [
                {"path": "other::thing", "kind": "function", "crate_name": "other"}
            ]
        }),
    );
    let response = generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();
    check!(response.status == Status::Error);

    // The first generation still serves.
    check!(empty_service.service.get_item("demo::engine::start").await.is_ok());
    let demo = empty_service.service.store().get_crate("demo").await.unwrap();
    check!(demo.version == "0.1.0");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generation_invalidates_cached_searches(seeded_service: TestService) {
    let stale = search_rust_docs(
        &seeded_service.service,
        SearchDocsRequest {
            query: "engine".to_string(),
            crate_name: None,
            max_results: 5,
            include_std: true,
        },
    )
    .await
    .unwrap();
    check!(stale.results.is_empty());
    check!(seeded_service.service.cache().entry_count() == 1);

    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(crate_dir.path(), &demo_manifest());
    generate_crate_docs(&seeded_service.service, request(crate_dir.path()))
        .await
        .unwrap();

    // The unfiltered search entry spans the whole corpus, so the write
    // dropped it; a fresh search sees the new items.
    let fresh = search_rust_docs(
        &seeded_service.service,
        SearchDocsRequest {
            query: "engine".to_string(),
            crate_name: None,
            max_results: 5,
            include_std: true,
        },
    )
    .await
    .unwrap();
    check!(!fresh.results.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_commit_rolls_back_disk_records(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(
        crate_dir.path(),
        &json!({
            "name": "app",
            "version": "1.0.0",
            "dependencies": ["helper"],
            "items": [
                {"path": "app::run", "kind": "function", "crate_name": "app"}
            ]
        }),
    );
    std::fs::create_dir(crate_dir.path().join("deps")).unwrap();
    std::fs::write(
        crate_dir.path().join("deps/helper.json"),
        serde_json::to_string(&json!({
            "name": "helper",
            "items": [
                {"path": "helper::assist", "kind": "function", "crate_name": "helper"}
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    // Occupy helper's record path with a non-empty directory so its persist
    // fails at commit time, after app has already been committed.
    let blocker = empty_service.db_path().join("helper.json");
    std::fs::create_dir_all(blocker.join("occupied")).unwrap();

    let response = generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();
    check!(response.status == Status::Error);

    // Nothing is served, and nothing durable remains: app's record must not
    // survive for a restarted service to load.
    check!(empty_service.service.store().crate_names().await.is_empty());
    check!(!empty_service.db_path().join("app.json").exists());

    let reopened = rust_docs_search::CorpusStore::open(empty_service.db_path())
        .await
        .unwrap();
    let loaded = reopened.load_persisted(&["app".to_string()]).await;
    check!(loaded.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_commit_restores_the_previous_record_on_disk(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(crate_dir.path(), &demo_manifest());
    generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();

    // Regenerate at a new version with a dependency whose record path is
    // obstructed: demo v0.2.0 commits (and persists) first, then the
    // dependency's persist fails and the batch rolls back.
    write_manifest(
        crate_dir.path(),
        &json!({
            "name": "demo",
            "version": "0.2.0",
            "dependencies": ["blocked"],
            "items": [
                {"path": "demo::engine::stop", "kind": "function", "crate_name": "demo"}
            ]
        }),
    );
    std::fs::create_dir(crate_dir.path().join("deps")).unwrap();
    std::fs::write(
        crate_dir.path().join("deps/blocked.json"),
        serde_json::to_string(&json!({
            "name": "blocked",
            "items": [
                {"path": "blocked::thing", "kind": "function", "crate_name": "blocked"}
            ]
        }))
        .unwrap(),
    )
    .unwrap();
    let blocker = empty_service.db_path().join("blocked.json");
    std::fs::create_dir_all(blocker.join("occupied")).unwrap();

    let response = generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();
    check!(response.status == Status::Error);

    // Served state rolled back to v0.1.0.
    let demo = empty_service.service.store().get_crate("demo").await.unwrap();
    check!(demo.version == "0.1.0");
    check!(empty_service.service.get_item("demo::engine::start").await.is_ok());

    // And so did the durable record: a restart sees v0.1.0 too.
    let reopened = rust_docs_search::CorpusStore::open(empty_service.db_path())
        .await
        .unwrap();
    reopened.load_persisted(&["demo".to_string()]).await;
    let on_disk = reopened.get_crate("demo").await.unwrap();
    check!(on_disk.version == "0.1.0");
    check!(on_disk.get("demo::engine::start").is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_generations_sharing_a_dependency_keep_memory_and_disk_aligned(
    empty_service: TestService,
) {
    // Two primaries both ship a manifest for the same dependency, at
    // different versions. Whichever order the generations land in, the
    // served snapshot and the persisted record must agree.
    for round in 0..4 {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        for (dir, primary, common_version) in [
            (&dir_a, "app-a", format!("{round}.0.0-a")),
            (&dir_b, "app-b", format!("{round}.0.0-b")),
        ] {
            write_manifest(
                dir.path(),
                &json!({
                    "name": primary,
                    "version": "1.0.0",
                    "dependencies": ["common"],
                    "items": [
                        {"path": format!("{primary}::run"), "kind": "function",
                         "crate_name": primary}
                    ]
                }),
            );
            std::fs::create_dir(dir.path().join("deps")).unwrap();
            std::fs::write(
                dir.path().join("deps/common.json"),
                serde_json::to_string(&json!({
                    "name": "common",
                    "version": common_version,
                    "items": [
                        {"path": "common::shared", "kind": "function", "crate_name": "common"}
                    ]
                }))
                .unwrap(),
            )
            .unwrap();
        }

        let service_a = empty_service.service.clone();
        let service_b = empty_service.service.clone();
        let req_a = request(dir_a.path());
        let req_b = request(dir_b.path());
        let (a, b) = tokio::join!(
            tokio::spawn(async move { generate_crate_docs(&service_a, req_a).await.unwrap() }),
            tokio::spawn(async move { generate_crate_docs(&service_b, req_b).await.unwrap() }),
        );
        check!(a.unwrap().status == Status::Success);
        check!(b.unwrap().status == Status::Success);

        let served = empty_service
            .service
            .store()
            .get_crate("common")
            .await
            .unwrap();
        let text = std::fs::read_to_string(empty_service.db_path().join("common.json")).unwrap();
        let on_disk: rust_docs_search::CrateDocs = serde_json::from_str(&text).unwrap();
        check!(
            served.version == on_disk.version,
            "round {round}: served {} but disk holds {}",
            served.version,
            on_disk.version
        );
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generous_timeout_does_not_interfere(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(crate_dir.path(), &demo_manifest());

    let mut req = request(crate_dir.path());
    req.timeout_secs = Some(60);
    let response = generate_crate_docs(&empty_service.service, req).await.unwrap();
    check!(response.status == Status::Success);
    check!(response.doc_count == 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn regeneration_replaces_the_crate_atomically(empty_service: TestService) {
    let crate_dir = tempfile::tempdir().unwrap();
    write_manifest(crate_dir.path(), &demo_manifest());
    generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();

    write_manifest(
        crate_dir.path(),
        &json!({
            "name": "demo",
            "version": "0.2.0",
            "items": [
                {"path": "demo::engine::stop", "kind": "function", "crate_name": "demo",
                 "summary": "Stops the demo engine"}
            ]
        }),
    );
    generate_crate_docs(&empty_service.service, request(crate_dir.path()))
        .await
        .unwrap();

    // Old items are gone, new ones are live.
    check!(empty_service.service.get_item("demo::engine::start").await.is_err());
    check!(empty_service.service.get_item("demo::engine::stop").await.is_ok());
    let demo = empty_service.service.store().get_crate("demo").await.unwrap();
    check!(demo.version == "0.2.0");
}
