//! End-to-end pipeline runs over in-memory collaborators.

use crate::{Context, FileRewrite, GitResult, PublishOptions, SyncOptions};
use quire_assets::MockStore;
use quire_cache::{CacheEntry, Mapping, UploadCache};
use quire_storage::StorageBackend;
use quire_storage::backend::MockBackend;
use quire_vcs::MockVcs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    cache: UploadCache,
    content: Arc<MockBackend>,
    media: Arc<MockBackend>,
    store: Arc<MockStore>,
    vcs: Arc<MockVcs>,
    ctx: Context,
}

fn fixture(documents: &[(&str, &str)], media: &[(&str, &str)], vcs: MockVcs) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cache = UploadCache::new(dir.path().join(".quire").join("media-cache.json"));
    let content = Arc::new(MockBackend::with_files(documents.iter().copied()));
    let media = Arc::new(MockBackend::with_files(media.iter().copied()));
    let store = Arc::new(MockStore::default());
    let vcs = Arc::new(vcs);
    let ctx = Context::builder(content.clone(), media.clone(), cache.clone())
        .store(store.clone())
        .vcs(vcs.clone())
        .build();
    Fixture { _dir: dir, cache, content, media, store, vcs, ctx }
}

const SYNC: SyncOptions = SyncOptions { dry_run: false, force: false };
const DRY_SYNC: SyncOptions = SyncOptions { dry_run: true, force: false };

#[tokio::test]
async fn test_sync_is_idempotent() {
    let f = fixture(&[("posts/a.md", "![x](/media/a.jpg) ![y](/media/b.png)")], &[("a.jpg", "a"), ("b.png", "b")], MockVcs::new());

    let first = f.ctx.sync_media(SYNC).await.unwrap();
    assert_eq!((first.scanned, first.uploaded, first.skipped, first.failed), (2, 2, 0, 0));

    let second = f.ctx.sync_media(SYNC).await.unwrap();
    assert_eq!((second.scanned, second.uploaded, second.skipped, second.failed), (2, 0, 2, 0));
    assert_eq!(f.store.upload_count(), 2);
    assert!(second.uploads.is_empty());
}

#[tokio::test]
async fn test_changed_bytes_are_uploaded_again() {
    let f = fixture(&[("posts/a.md", "![x](/media/a.jpg)")], &[("a.jpg", "old")], MockVcs::new());
    f.ctx.sync_media(SYNC).await.unwrap();

    f.media.write(Path::new("a.jpg"), b"new").await.unwrap();
    let result = f.ctx.sync_media(SYNC).await.unwrap();
    assert_eq!(result.uploaded, 1);
    assert_eq!(f.store.upload_count(), 2);
    let mapping = f.cache.load().await;
    assert_eq!(mapping.get("a.jpg").map(|e| e.hash.clone()), Some(quire_cache::hash(b"new")));
}

#[tokio::test]
async fn test_force_uploads_unchanged_files() {
    let f = fixture(&[("posts/a.md", "![x](/media/a.jpg)")], &[("a.jpg", "a")], MockVcs::new());
    f.ctx.sync_media(SYNC).await.unwrap();
    let result = f.ctx.sync_media(SyncOptions { dry_run: false, force: true }).await.unwrap();
    assert_eq!((result.uploaded, result.skipped), (1, 0));
    assert_eq!(f.store.upload_count(), 2);
}

#[tokio::test]
async fn test_dry_run_sync_changes_nothing() {
    let f = fixture(&[("posts/a.md", "![x](/media/a.jpg)\n![y](/media/gone.jpg)")], &[("a.jpg", "a")], MockVcs::new());

    let dry = f.ctx.sync_media(DRY_SYNC).await.unwrap();
    assert!(dry.dry_run);
    assert_eq!((dry.uploaded, dry.failed), (1, 1));
    assert_eq!(f.store.upload_count(), 0);
    assert!(!f.cache.path().exists());

    let real = f.ctx.sync_media(SYNC).await.unwrap();
    assert_eq!((real.uploaded, real.failed), (dry.uploaded, dry.failed));
}

#[tokio::test]
async fn test_dry_run_rewrite_counts_but_does_not_write() {
    let original = "![x](/media/a.jpg) and again ![x](../media/a.jpg)";
    let f = fixture(&[("posts/a.md", original)], &[("a.jpg", "a")], MockVcs::new());
    f.ctx.sync_media(SYNC).await.unwrap();

    let dry = f.ctx.rewrite_urls(true).await.unwrap();
    assert_eq!((dry.files_modified, dry.urls_replaced), (1, 2));
    assert_eq!(f.content.writes(), 0);
    assert_eq!(f.content.text("posts/a.md").await.as_deref(), Some(original));

    let real = f.ctx.rewrite_urls(false).await.unwrap();
    assert_eq!(real.urls_replaced, dry.urls_replaced);
    assert_eq!(real.files, dry.files);
    assert_eq!(f.content.writes(), 1);
}

#[tokio::test]
async fn test_every_reference_shape_is_found_once() {
    let document = "---\ntitle: Trip\nimage: /media/trip/beach.jpg\n---\n\
        ![a](/media/trip/beach.jpg)\n\
        ![b](../media/trip/beach.jpg)\n\
        <img src=\"/media/trip/beach.jpg\" alt=\"\">\n";
    let f = fixture(&[("posts/trip.md", document)], &[], MockVcs::new());
    assert_eq!(f.ctx.scan_references().await.unwrap(), ["trip/beach.jpg"]);
}

#[tokio::test]
async fn test_rewrite_replaces_exactly_the_cached_reference() {
    let f = fixture(
        &[
            ("posts/a.md", "![one](/media/foo/bar.jpg)\n\n<img src=\"/media/foo/bar.jpg\">\n"),
            ("notes/b.md", "No media in here. ![other](/media/other.jpg)\n"),
        ],
        &[],
        MockVcs::new(),
    );
    let mapping: Mapping = [("foo/bar.jpg".to_string(), CacheEntry::new("h", "https://cdn/x.jpg", "quire/foo/bar"))]
        .into_iter()
        .collect();
    f.cache.save(&mapping).await.unwrap();

    let result = f.ctx.rewrite_urls(false).await.unwrap();
    assert_eq!(result.files_scanned, 2);
    assert_eq!(result.files_modified, 1);
    assert_eq!(result.urls_replaced, 2);
    assert_eq!(result.files, [FileRewrite { path: "posts/a.md".to_string(), replacements: 2 }]);
    assert_eq!(
        f.content.text("posts/a.md").await.as_deref(),
        Some("![one](https://cdn/x.jpg)\n\n<img src=\"https://cdn/x.jpg\">\n")
    );
    assert_eq!(f.content.writes(), 1);
}

#[tokio::test]
async fn test_non_canonical_reference_is_neither_uploaded_nor_cached() {
    let original = "![a](/media/./a.jpg) ![b](/media/b.jpg)";
    let f = fixture(&[("posts/a.md", original)], &[("a.jpg", "a"), ("b.jpg", "b")], MockVcs::new());

    let sync = f.ctx.sync_media(SYNC).await.unwrap();
    assert_eq!((sync.scanned, sync.uploaded), (1, 1));
    assert!(f.cache.load().await.get("a.jpg").is_none());
    let rewrite = f.ctx.rewrite_urls(false).await.unwrap();
    assert_eq!(rewrite.urls_replaced, 1);
    let text = f.content.text("posts/a.md").await.unwrap();
    assert!(text.starts_with("![a](/media/./a.jpg) "));
}

#[tokio::test]
async fn test_failed_upload_keeps_other_results() {
    let f = fixture(
        &[("posts/a.md", "![a](/media/a.jpg) ![b](/media/b.jpg) ![c](/media/c.jpg)")],
        &[("a.jpg", "a"), ("b.jpg", "b"), ("c.jpg", "c")],
        MockVcs::new(),
    );
    f.store.fail_on("quire/b").await;

    let result = f.ctx.sync_media(SYNC).await.unwrap();
    assert_eq!((result.uploaded, result.failed), (2, 1));
    assert!(result.errors[0].contains("b.jpg"));
    let mapping = f.cache.load().await;
    assert!(mapping.get("a.jpg").is_some() && mapping.get("c.jpg").is_some());
    assert!(mapping.get("b.jpg").is_none());
}

#[tokio::test]
async fn test_publish_continues_past_a_missing_file() {
    let f = fixture(
        &[("posts/a.md", "![a](/media/a.jpg)\n![m](/media/missing.jpg)\n![b](/media/b.jpg)\n")],
        &[("a.jpg", "a"), ("b.jpg", "b")],
        MockVcs::new().with_upstream(0, 0).with_changes(["posts/a.md"]),
    );

    let outcome = f.ctx.publish(PublishOptions { message: Some("Publish".to_string()), dry_run: false }).await.unwrap();
    assert_eq!((outcome.sync.uploaded, outcome.sync.failed), (2, 1));
    assert!(outcome.sync.errors[0].contains("missing.jpg"));
    assert_eq!(outcome.rewrite.urls_replaced, 2);
    let text = f.content.text("posts/a.md").await.unwrap();
    assert!(text.contains("/media/missing.jpg"));
    assert!(text.contains(&MockStore::url_for("quire/a")));
    assert_eq!(outcome.git_result, Some(GitResult::Success));
    assert_eq!(outcome.branch.as_deref(), Some("main"));
    assert_eq!(f.vcs.commits().await, ["Publish"]);
    assert!(!outcome.is_complete());
}

#[tokio::test]
async fn test_publish_with_nothing_to_commit() {
    let f = fixture(&[("posts/a.md", "text only")], &[], MockVcs::new().with_upstream(0, 0));
    let outcome = f.ctx.publish(PublishOptions::default()).await.unwrap();
    assert_eq!(outcome.git_result, Some(GitResult::NoChanges));
    assert_eq!(outcome.git_error, None);
    assert_eq!(f.vcs.pushes().await, 0);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_publish_pushes_earlier_commits() {
    let f = fixture(&[("posts/a.md", "text only")], &[], MockVcs::new().with_upstream(3, 0));
    let outcome = f.ctx.publish(PublishOptions::default()).await.unwrap();
    assert_eq!(outcome.git_result, Some(GitResult::Success));
    assert!(f.vcs.commits().await.is_empty());
    assert_eq!(f.vcs.pushes().await, 1);
}

#[tokio::test]
async fn test_publish_uses_dated_default_message() {
    let f = fixture(&[("posts/a.md", "text")], &[], MockVcs::new().with_upstream(0, 0).with_changes(["posts/a.md"]));
    f.ctx.publish(PublishOptions::default()).await.unwrap();
    let commits = f.vcs.commits().await;
    assert_eq!(commits.len(), 1);
    assert!(commits[0].starts_with("Publish content "));
}

#[tokio::test]
async fn test_publish_reports_push_failure() {
    let f = fixture(
        &[("posts/a.md", "text")],
        &[],
        MockVcs::new().with_upstream(0, 0).with_changes(["posts/a.md"]).failing_push("remote rejected"),
    );
    let outcome = f.ctx.publish(PublishOptions::default()).await.unwrap();
    assert_eq!(outcome.git_result, Some(GitResult::Error));
    assert_eq!(outcome.git_error.as_deref(), Some("remote rejected"));
}

#[tokio::test]
async fn test_dry_run_publish_never_touches_version_control() {
    let f = fixture(
        &[("posts/a.md", "![a](/media/a.jpg)")],
        &[("a.jpg", "a")],
        MockVcs::new().with_upstream(0, 0).with_changes(["posts/a.md"]),
    );
    let outcome = f.ctx.publish(PublishOptions { message: None, dry_run: true }).await.unwrap();
    assert_eq!(outcome.git_result, None);
    assert!(f.vcs.calls().await.is_empty());
    assert_eq!(f.store.upload_count(), 0);
    assert_eq!(f.content.writes(), 0);
}

#[tokio::test]
async fn test_publish_without_repository_reports_git_error() {
    let content = Arc::new(MockBackend::with_files([("posts/a.md", "text")]));
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::builder(content, Arc::new(MockBackend::default()), UploadCache::new(dir.path().join("c.json")))
        .store(Arc::new(MockStore::default()))
        .build();
    let outcome = ctx.publish(PublishOptions::default()).await.unwrap();
    assert_eq!(outcome.git_result, Some(GitResult::Error));
    assert!(outcome.git_error.is_some_and(|e| e.contains("version control unavailable")));
}

#[tokio::test]
async fn test_missing_store_fails_only_uploads() {
    let content = Arc::new(MockBackend::with_files([("posts/a.md", "![a](/media/a.jpg) ![b](/media/b.jpg)")]));
    let media = Arc::new(MockBackend::with_files([("a.jpg", "a"), ("b.jpg", "b")]));
    let dir = tempfile::tempdir().unwrap();
    let cache = UploadCache::new(dir.path().join("c.json"));
    let mapping: Mapping =
        [("a.jpg".to_string(), CacheEntry::new(quire_cache::hash(b"a"), "https://cdn/a.jpg", "quire/a"))].into_iter().collect();
    cache.save(&mapping).await.unwrap();
    let ctx = Context::builder(content, media, cache.clone()).build();

    assert_eq!(ctx.sync_media(DRY_SYNC).await.unwrap().uploaded, 1);
    let result = ctx.sync_media(SYNC).await.unwrap();
    assert_eq!((result.skipped, result.uploaded, result.failed), (1, 0, 1));
    assert!(result.errors[0].contains("b.jpg") && result.errors[0].contains("asset store unavailable"));
    assert!(cache.load().await.get("a.jpg").is_some());
}

#[tokio::test]
async fn test_publish_without_store_still_commits_cached_corpus() {
    let content = Arc::new(MockBackend::with_files([("posts/a.md", "Edited text. ![a](/media/a.jpg)")]));
    let media = Arc::new(MockBackend::with_files([("a.jpg", "a")]));
    let dir = tempfile::tempdir().unwrap();
    let cache = UploadCache::new(dir.path().join("c.json"));
    let mapping: Mapping =
        [("a.jpg".to_string(), CacheEntry::new(quire_cache::hash(b"a"), "https://cdn/a.jpg", "quire/a"))].into_iter().collect();
    cache.save(&mapping).await.unwrap();
    let vcs = Arc::new(MockVcs::new().with_upstream(0, 0).with_changes(["posts/a.md"]));
    let ctx = Context::builder(content.clone(), media, cache).vcs(vcs.clone()).build();

    let outcome = ctx.publish(PublishOptions { message: Some("Edit".to_string()), dry_run: false }).await.unwrap();
    assert_eq!((outcome.sync.skipped, outcome.sync.failed), (1, 0));
    assert_eq!(outcome.rewrite.urls_replaced, 1);
    assert_eq!(content.text("posts/a.md").await.as_deref(), Some("Edited text. ![a](https://cdn/a.jpg)"));
    assert_eq!(outcome.git_result, Some(GitResult::Success));
    assert_eq!(vcs.commits().await, ["Edit"]);
    assert!(outcome.is_complete());
}
