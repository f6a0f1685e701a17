//! Integration tests: path resolution, mkdir -p, mutations, and cache
//! coherence against the in-memory transport. Real crypto end to end —
//! the backend only ever sees envelopes.

use std::sync::Arc;
use std::time::Duration;

use filen_client::api::ChunkUploadParams;
use filen_client::{DriveTransport, MemoryTransport, UploadDoneRequest};
use filen_core::{DriveItem, FilenError, Identity, ItemKind};
use filen_crypto::envelope::{encrypt_envelope, FileMetadata};
use filen_crypto::{generate_file_key, generate_upload_key, generate_uuid};
use sha2::{Digest, Sha512};

const MASTER_KEY: &str = "test-master-key-0001";
const ROOT: &str = "root-folder-uuid";

fn identity() -> Identity {
    Identity {
        email: "tester@example.com".into(),
        api_key: "test-api-key".into(),
        master_keys: vec![MASTER_KEY.to_string()],
        base_folder_uuid: ROOT.into(),
        user_id: 7,
    }
}

fn drive_over(mem: Arc<MemoryTransport>) -> filen_drive::Drive {
    filen_drive::Drive::new(mem, identity(), Duration::from_secs(600))
}

/// Plant a finalized file under `parent` straight through the transport,
/// the way the upload engine would.
async fn seed_file(
    drive: &filen_drive::Drive,
    parent: &str,
    name: &str,
    content: &[u8],
) -> String {
    let file_uuid = generate_uuid();
    let upload_key = generate_upload_key();
    let file_key = generate_file_key();

    let body = filen_crypto::encrypt_chunk(&file_key, content).unwrap();
    let hash = hex::encode(Sha512::digest(&body));
    drive
        .transport()
        .upload_chunk(
            &ChunkUploadParams {
                file_uuid: file_uuid.clone(),
                index: 0,
                parent: parent.to_string(),
                upload_key: upload_key.clone(),
                hash,
            },
            body,
        )
        .await
        .unwrap();

    let metadata = FileMetadata {
        name: name.to_string(),
        size: content.len() as u64,
        mime: "application/octet-stream".into(),
        key: file_key.clone(),
        hash: hex::encode(Sha512::digest(content)),
        last_modified: 1_700_000_000_000,
    };
    drive
        .transport()
        .upload_done(&UploadDoneRequest {
            uuid: file_uuid.clone(),
            name: encrypt_envelope(name, &file_key).unwrap(),
            name_hashed: drive.hash_name(name),
            size: encrypt_envelope(&content.len().to_string(), &file_key).unwrap(),
            chunks: 1,
            mime: encrypt_envelope("application/octet-stream", &file_key).unwrap(),
            rm: filen_crypto::random_string(32),
            metadata: metadata.encode(MASTER_KEY).unwrap(),
            version: 2,
            upload_key,
        })
        .await
        .unwrap();
    file_uuid
}

#[tokio::test]
async fn mkdir_p_creates_nested_and_reruns_are_noops() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem.clone());

    let c1 = drive.mkdir_p("/a/b/c", None, None).await.unwrap();
    let c2 = drive.mkdir_p("/a/b/c", None, None).await.unwrap();
    assert_eq!(c1, c2, "re-running mkdir -p must adopt the existing folders");

    let a = drive.resolve_folder("/a").await.unwrap();
    let b = drive.resolve_folder("/a/b").await.unwrap();
    assert_eq!(a.parent.as_deref(), Some(ROOT));
    assert_eq!(b.parent.as_deref(), Some(a.uuid.as_str()));
}

#[tokio::test]
async fn resolve_reports_partial_path() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/a", None, None).await.unwrap();

    match drive.resolve("/a/missing/deeper").await {
        Err(FilenError::PathNotFound(partial)) => assert_eq!(partial, "/a/missing"),
        other => panic!("expected PathNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn folder_wins_name_tie_at_terminal() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/both", None, None).await.unwrap();
    seed_file(&drive, ROOT, "both", b"file content").await;
    drive.invalidate(ROOT);

    let resolved = drive.resolve("/both").await.unwrap();
    assert_eq!(resolved.kind(), ItemKind::Folder);
}

#[tokio::test]
async fn matching_is_case_sensitive() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/Docs", None, None).await.unwrap();

    assert!(drive.resolve("/Docs").await.is_ok());
    assert!(matches!(
        drive.resolve("/docs").await,
        Err(FilenError::PathNotFound(_))
    ));
}

#[tokio::test]
async fn mutations_invalidate_the_parent_listing() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);

    // Prime the cache, then mutate the same parent.
    assert!(drive.list(ROOT).await.unwrap().is_empty());
    drive.mkdir_p("/fresh", None, None).await.unwrap();

    let listing = drive.list(ROOT).await.unwrap();
    assert_eq!(listing.len(), 1, "listing must reflect the mutation");
    assert_eq!(listing[0].name(), "fresh");
}

#[tokio::test]
async fn stale_cache_hides_out_of_band_changes_until_invalidated() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem.clone());
    assert!(drive.list(ROOT).await.unwrap().is_empty());

    // Create a folder behind the cache's back.
    let other = drive_over(mem);
    other.mkdir_p("/sneaky", None, None).await.unwrap();

    assert!(
        drive.list(ROOT).await.unwrap().is_empty(),
        "cached listing must be served within the TTL"
    );
    drive.invalidate(ROOT);
    assert_eq!(drive.list(ROOT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn move_invalidates_both_parents() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/src", None, None).await.unwrap();
    drive.mkdir_p("/dst", None, None).await.unwrap();
    seed_file(
        &drive,
        &drive.resolve_folder("/src").await.unwrap().uuid,
        "doc.txt",
        b"hello",
    )
    .await;
    drive.invalidate(&drive.resolve_folder("/src").await.unwrap().uuid);

    // Prime both listings.
    assert_eq!(drive.list(&drive.resolve_folder("/src").await.unwrap().uuid).await.unwrap().len(), 1);
    assert!(drive.list(&drive.resolve_folder("/dst").await.unwrap().uuid).await.unwrap().is_empty());

    drive.move_item("/src/doc.txt", "/dst").await.unwrap();

    assert!(drive.resolve("/src/doc.txt").await.is_err());
    let moved = drive.resolve_file("/dst/doc.txt").await.unwrap();
    assert_eq!(moved.name, "doc.txt");
}

#[tokio::test]
async fn move_to_same_parent_is_noop() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/a", None, None).await.unwrap();
    seed_file(&drive, ROOT, "f.txt", b"x").await;
    drive.invalidate(ROOT);

    drive.move_item("/f.txt", "/").await.unwrap();
    assert!(drive.resolve_file("/f.txt").await.is_ok());
}

#[tokio::test]
async fn rename_file_reencrypts_metadata() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    seed_file(&drive, ROOT, "old.txt", b"content").await;
    drive.invalidate(ROOT);

    drive.rename("/old.txt", "new.txt").await.unwrap();

    assert!(drive.resolve("/old.txt").await.is_err());
    let renamed = drive.resolve_file("/new.txt").await.unwrap();
    assert_eq!(renamed.name, "new.txt");
    assert_eq!(renamed.size, 7, "metadata must survive the rename");
    assert!(!renamed.file_key.is_empty());
}

#[tokio::test]
async fn rename_folder_keeps_children() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/photos/2024", None, None).await.unwrap();

    drive.rename("/photos", "pictures").await.unwrap();
    assert!(drive.resolve_folder("/pictures/2024").await.is_ok());
}

#[tokio::test]
async fn trash_restore_cycle() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    seed_file(&drive, ROOT, "doomed.txt", b"bits").await;
    drive.invalidate(ROOT);

    drive.trash("/doomed.txt").await.unwrap();
    assert!(drive.resolve("/doomed.txt").await.is_err());

    let trash = drive.list_trash().await.unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].name(), "doomed.txt");

    drive.restore_from_trash("doomed.txt").await.unwrap();
    assert!(drive.resolve_file("/doomed.txt").await.is_ok());
    assert!(drive.list_trash().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_permanent_removes_record() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem.clone());
    seed_file(&drive, ROOT, "gone.txt", b"bits").await;
    drive.invalidate(ROOT);

    drive.delete_permanent("/gone.txt").await.unwrap();
    assert!(drive.resolve("/gone.txt").await.is_err());
    assert_eq!(mem.file_count(), 0);
}

#[tokio::test]
async fn listing_order_folders_first_case_insensitive() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/zeta", None, None).await.unwrap();
    drive.mkdir_p("/Alpha", None, None).await.unwrap();
    seed_file(&drive, ROOT, "beta.txt", b"1").await;
    seed_file(&drive, ROOT, "Aardvark.txt", b"2").await;
    drive.invalidate(ROOT);

    let names: Vec<String> = drive
        .list(ROOT)
        .await
        .unwrap()
        .iter()
        .map(|i| i.name().to_string())
        .collect();
    assert_eq!(names, vec!["Alpha", "zeta", "Aardvark.txt", "beta.txt"]);
}

#[tokio::test]
async fn find_matches_files_case_insensitively() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/photos/nested", None, None).await.unwrap();
    let photos = drive.resolve_folder("/photos").await.unwrap().uuid;
    let nested = drive.resolve_folder("/photos/nested").await.unwrap().uuid;
    seed_file(&drive, &photos, "Holiday.JPG", b"1").await;
    seed_file(&drive, &nested, "beach.jpg", b"2").await;
    seed_file(&drive, &photos, "notes.txt", b"3").await;
    drive.invalidate(&photos);
    drive.invalidate(&nested);

    let hits = drive.find("/photos", "*.jpg", -1).await.unwrap();
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(paths, vec!["/photos/Holiday.JPG", "/photos/nested/beach.jpg"]);
}

#[tokio::test]
async fn find_honors_max_depth() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/top/deep", None, None).await.unwrap();
    let top = drive.resolve_folder("/top").await.unwrap().uuid;
    let deep = drive.resolve_folder("/top/deep").await.unwrap().uuid;
    seed_file(&drive, &top, "shallow.txt", b"1").await;
    seed_file(&drive, &deep, "buried.txt", b"2").await;
    drive.invalidate(&top);
    drive.invalidate(&deep);

    let hits = drive.find("/top", "*.txt", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/top/shallow.txt");

    assert!(drive.find("/top", "*.txt", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_is_find_from_root() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/a/b", None, None).await.unwrap();
    let b = drive.resolve_folder("/a/b").await.unwrap().uuid;
    seed_file(&drive, &b, "quarterly-report.pdf", b"1").await;
    drive.invalidate(&b);

    let hits = drive.search("report", -1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/a/b/quarterly-report.pdf");
}

#[tokio::test]
async fn tree_renders_box_drawing() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/docs", None, None).await.unwrap();
    let docs = drive.resolve_folder("/docs").await.unwrap().uuid;
    seed_file(&drive, &docs, "a.txt", b"1").await;
    seed_file(&drive, ROOT, "root.txt", b"2").await;
    drive.invalidate(ROOT);
    drive.invalidate(&docs);

    let rendered = drive.tree("/", -1).await.unwrap();
    let expected = "/\n\
                    ├── docs/\n\
                    │   └── a.txt\n\
                    └── root.txt\n";
    assert_eq!(rendered, expected);
}

#[tokio::test]
async fn tree_respects_depth_bound() {
    let mem = Arc::new(MemoryTransport::new());
    let drive = drive_over(mem);
    drive.mkdir_p("/a/b/c", None, None).await.unwrap();

    let rendered = drive.tree("/", 2).await.unwrap();
    assert!(rendered.contains("a/"));
    assert!(rendered.contains("b/"));
    assert!(!rendered.contains("c/"), "depth 2 must stop before c:\n{rendered}");
}
