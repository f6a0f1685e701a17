//! Batch controller integration: durable state, chunk-level resume after a
//! simulated crash, conflict policies, and recursive download batches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use filen_client::MemoryTransport;
use filen_core::Identity;
use filen_drive::Drive;
use filen_transfer::codec::hash_local_file;
use filen_transfer::state::{batch_id, BatchOperation, BatchStore, TaskStatus};
use filen_transfer::{
    upload_file, BatchController, BatchOptions, ConflictPolicy, UploadRequest,
};

const MASTER_KEY: &str = "batch-master-key";
const ROOT: &str = "root-uuid";

fn identity() -> Identity {
    Identity {
        email: "batch@example.com".into(),
        api_key: "api".into(),
        master_keys: vec![MASTER_KEY.to_string()],
        base_folder_uuid: ROOT.into(),
        user_id: 1,
    }
}

fn new_drive() -> (Arc<MemoryTransport>, Drive) {
    let mem = Arc::new(MemoryTransport::new());
    let drive = Drive::new(mem.clone(), identity(), Duration::from_secs(600));
    (mem, drive)
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write test file");
    path
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 17 + i / 503) % 249) as u8).collect()
}

async fn seed_remote(drive: &Drive, parent_path: &str, name: &str, content: &[u8], mtime: i64) {
    let tmp = tempfile::tempdir().unwrap();
    let local = write_file(tmp.path(), name, content);
    let parent_uuid = drive.mkdir_p(parent_path, None, None).await.unwrap();
    upload_file(
        drive,
        UploadRequest {
            local_path: &local,
            parent_uuid: &parent_uuid,
            remote_name: name,
            resume: None,
            created_ms: None,
            modified_ms: Some(mtime),
        },
        None,
        None,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn interrupted_upload_resumes_into_a_single_complete_file() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (mem, drive) = new_drive();

    let data = patterned(3_500_000);
    let local = write_file(work.path(), "big.bin", &data);
    let (expected_hash, _) = hash_local_file(&local).await.unwrap();
    let sources = vec![local.to_string_lossy().into_owned()];

    // First run dies at chunk 2.
    mem.fail_chunk_uploads_at(Some(2));
    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions::default(),
    );
    let summary = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(summary.interrupted, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.exit_code(), 0, "interrupted is resumable, not an error");

    // The state file survived and carries the resume triple.
    let id = batch_id(BatchOperation::Upload, &sources, "/");
    let store = BatchStore::new(states.path(), &id);
    let state = store.load().unwrap().expect("state file must survive");
    let task = &state.tasks[0];
    assert_eq!(task.status, TaskStatus::Interrupted);
    assert_eq!(task.last_chunk, 1, "chunks 0 and 1 made it");
    assert!(task.file_uuid.is_some());
    assert!(task.upload_key.is_some());
    assert!(task.file_key.is_some());

    // No finalized file yet.
    assert_eq!(mem.file_count(), 0);

    // Second run with the fault cleared resumes and finishes.
    mem.fail_chunk_uploads_at(None);
    let summary = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.interrupted, 0);

    assert!(!store.exists(), "state file is deleted on clean completion");
    assert_eq!(mem.file_count(), 1, "resume must not create a second file");

    let remote = drive.resolve_file("/big.bin").await.unwrap();
    assert_eq!(remote.chunks, 4);
    assert_eq!(
        remote.total_hash, expected_hash,
        "total hash must cover the whole plaintext across the interruption"
    );
}

#[tokio::test]
async fn completed_batch_rerun_is_a_noop() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (mem, drive) = new_drive();

    let local = write_file(work.path(), "one.txt", b"only once");
    let sources = vec![local.to_string_lossy().into_owned()];
    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            conflict: ConflictPolicy::Skip,
            ..Default::default()
        },
    );

    let first = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(first.completed, 1);
    assert_eq!(mem.file_count(), 1);

    // Re-running the same command: the destination now exists, skip policy
    // leaves it alone and nothing is mutated.
    let second = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(second.completed, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.exit_code(), 0);
    assert_eq!(mem.file_count(), 1);
}

#[tokio::test]
async fn conflict_newer_uploads_only_strictly_newer_local() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (_, drive) = new_drive();

    // Remote copy stamped far in the past: local file (mtime = now) wins.
    seed_remote(&drive, "/a", "x.txt", b"old remote", 1_000_000_000_000).await;
    let local = write_file(work.path(), "x.txt", b"newer local");
    let sources = vec![local.to_string_lossy().into_owned()];

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            conflict: ConflictPolicy::Newer,
            preserve_timestamps: true,
            ..Default::default()
        },
    );
    let summary = controller.run_upload(&sources, "/a").await.unwrap();
    assert_eq!(summary.completed, 1, "strictly newer local must upload");

    // Remote copy stamped far in the future: local loses.
    seed_remote(&drive, "/b", "y.txt", b"future remote", 9_999_999_999_999).await;
    let local2 = write_file(work.path(), "y.txt", b"older local");
    let sources2 = vec![local2.to_string_lossy().into_owned()];
    let summary = controller.run_upload(&sources2, "/b").await.unwrap();
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn ask_policy_without_prompt_declines() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (mem, drive) = new_drive();

    seed_remote(&drive, "/", "q.txt", b"existing", 1_700_000_000_000).await;
    let local = write_file(work.path(), "q.txt", b"challenger");
    let sources = vec![local.to_string_lossy().into_owned()];

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            conflict: ConflictPolicy::Ask,
            ..Default::default()
        },
    );
    let summary = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(summary.skipped, 1, "no prompt handler means default No");
    assert_eq!(mem.file_count(), 1);
}

#[tokio::test]
async fn ask_policy_prompt_yes_proceeds() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (mem, drive) = new_drive();

    seed_remote(&drive, "/", "q.txt", b"existing", 1_700_000_000_000).await;
    let local = write_file(work.path(), "q.txt", b"challenger");
    let sources = vec![local.to_string_lossy().into_owned()];

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            conflict: ConflictPolicy::Ask,
            ..Default::default()
        },
    )
    .with_prompt(Arc::new(|_q| true));
    let summary = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(mem.file_count(), 2, "the server happily keeps both copies");
}

#[tokio::test]
async fn directory_upload_respects_filters_and_trailing_slash() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (_, drive) = new_drive();

    let src = work.path().join("project");
    std::fs::create_dir_all(src.join("logs")).unwrap();
    std::fs::write(src.join("readme.txt"), b"keep").unwrap();
    std::fs::write(src.join("logs/debug.log"), b"drop").unwrap();
    std::fs::write(src.join("notes.txt"), b"keep too").unwrap();

    // Trailing slash: spill contents directly into /dest.
    let sources = vec![format!("{}/", src.display())];
    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            recursive: true,
            exclude: vec!["*.log".into()],
            ..Default::default()
        },
    );
    let summary = controller.run_upload(&sources, "/dest").await.unwrap();
    assert_eq!(summary.completed, 2);
    assert!(drive.resolve_file("/dest/readme.txt").await.is_ok());
    assert!(drive.resolve_file("/dest/notes.txt").await.is_ok());
    assert!(drive.resolve("/dest/logs/debug.log").await.is_err());

    // No trailing slash: the directory lands inside the target by name.
    let sources2 = vec![src.display().to_string()];
    let summary = controller.run_upload(&sources2, "/dest2").await.unwrap();
    assert_eq!(summary.completed, 2);
    assert!(drive.resolve_file("/dest2/project/readme.txt").await.is_ok());
}

#[tokio::test]
async fn recursive_download_lands_files_and_rerun_is_noop() {
    let out = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (_, drive) = new_drive();

    seed_remote(&drive, "/photos", "a.jpg", b"aaa", 1_700_000_000_000).await;
    seed_remote(&drive, "/photos", "b.jpg", b"bbb", 1_700_000_000_000).await;
    seed_remote(&drive, "/photos/nested", "c.jpg", b"ccc", 1_700_000_000_000).await;

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            recursive: true,
            ..Default::default()
        },
    );
    let dest = out.path().join("out");
    let summary = controller.run_download("/photos", &dest).await.unwrap();
    assert_eq!(summary.completed, 3);
    assert_eq!(std::fs::read(dest.join("a.jpg")).unwrap(), b"aaa");
    assert_eq!(std::fs::read(dest.join("b.jpg")).unwrap(), b"bbb");
    assert_eq!(std::fs::read(dest.join("nested/c.jpg")).unwrap(), b"ccc");

    // The state file is gone; a re-run with skip policy touches nothing.
    let id = batch_id(
        BatchOperation::Download,
        &["/photos".to_string()],
        &dest.display().to_string(),
    );
    assert!(!BatchStore::new(states.path(), &id).exists());

    let again = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            recursive: true,
            conflict: ConflictPolicy::Skip,
            ..Default::default()
        },
    );
    let summary = again.run_download("/photos", &dest).await.unwrap();
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn download_single_file_into_directory_keeps_name() {
    let out = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (_, drive) = new_drive();
    seed_remote(&drive, "/", "doc.txt", b"contents", 1_700_000_000_000).await;

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions::default(),
    );
    let summary = controller
        .run_download("/doc.txt", out.path())
        .await
        .unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(std::fs::read(out.path().join("doc.txt")).unwrap(), b"contents");
}

#[tokio::test]
async fn download_conflict_newer_prefers_newer_remote() {
    let out = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (_, drive) = new_drive();

    // Remote stamped in the far future beats the freshly-written local.
    seed_remote(&drive, "/", "n.txt", b"remote wins", 9_999_999_999_999).await;
    let dest = out.path().join("n.txt");
    std::fs::write(&dest, b"local copy").unwrap();

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions {
            conflict: ConflictPolicy::Newer,
            ..Default::default()
        },
    );
    let summary = controller.run_download("/n.txt", &dest).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"remote wins");

    // Remote stamped in the past loses to the local mtime.
    seed_remote(&drive, "/", "o.txt", b"stale remote", 1_000_000_000_000).await;
    let dest2 = out.path().join("o.txt");
    std::fs::write(&dest2, b"local stays").unwrap();
    let summary = controller.run_download("/o.txt", &dest2).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(std::fs::read(&dest2).unwrap(), b"local stays");
}

#[tokio::test]
async fn per_task_errors_do_not_abort_the_batch() {
    let work = tempfile::tempdir().unwrap();
    let states = tempfile::tempdir().unwrap();
    let (_, drive) = new_drive();

    let a = write_file(work.path(), "a.txt", b"fine");
    let missing = work.path().join("b.txt");
    let sources = vec![
        a.to_string_lossy().into_owned(),
        missing.to_string_lossy().into_owned(),
    ];

    // Pre-seed the batch state with a task whose local file vanished after
    // enumeration — the error must surface at execution, not abort the run.
    let id = batch_id(BatchOperation::Upload, &sources, "/");
    let store = BatchStore::new(states.path(), &id);
    store
        .save(&filen_transfer::BatchState {
            operation_type: BatchOperation::Upload,
            target_remote_path: "/".into(),
            local_destination: None,
            tasks: vec![
                filen_transfer::BatchTask::new_upload(a.clone(), "/a.txt".into()),
                filen_transfer::BatchTask::new_upload(missing.clone(), "/b.txt".into()),
            ],
        })
        .unwrap();

    let controller = BatchController::new(
        &drive,
        states.path().to_path_buf(),
        BatchOptions::default(),
    );
    let summary = controller.run_upload(&sources, "/").await.unwrap();
    assert_eq!(summary.completed, 1, "the healthy task still runs");
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.exit_code(), 1, "exit 1 iff any task errored");
    assert!(drive.resolve_file("/a.txt").await.is_ok());
    assert!(store.exists(), "errored batches keep their state file");
}
