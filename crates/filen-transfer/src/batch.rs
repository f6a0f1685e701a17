//! The batch controller: durable, resumable, strictly sequential.
//!
//! A batch is one upload or download invocation. Tasks are enumerated
//! deterministically, executed one at a time in order, and every status
//! transition is persisted. Chunk failures leave the task `Interrupted`
//! with its resume triple; re-running the same command loads the same
//! state file and picks up at `last_chunk + 1`. Per-task failures never
//! abort the batch; the summary carries the counts and the exit code.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use glob::Pattern;
use tracing::{debug, info, warn};

use filen_core::{paths, FileHandle, FilenError, Result};
use filen_drive::{Drive, ResolvedItem};

use crate::download;
use crate::state::{
    batch_id, BatchOperation, BatchState, BatchStore, BatchTask, SaveThrottle, TaskStatus,
};
use crate::upload::{self, ProgressFn, ResumePoint, UploadRequest};

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Leave the destination alone (the default).
    #[default]
    Skip,
    /// Replace it.
    Overwrite,
    /// Replace only when the would-replace side is strictly newer.
    Newer,
    /// Prompt y/N per conflict; no prompt handler means decline.
    Ask,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub recursive: bool,
    /// Any-match permit filters (glob); empty = include everything.
    pub include: Vec<String>,
    /// Any-match deny filters (glob).
    pub exclude: Vec<String>,
    pub conflict: ConflictPolicy,
    /// Implies `Overwrite` and suppresses interactive prompts.
    pub force: bool,
    /// Carry local ctime/mtime into the remote metadata.
    pub preserve_timestamps: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSummary {
    pub completed: usize,
    pub skipped: usize,
    pub interrupted: usize,
    pub errors: usize,
    pub bytes: u64,
}

impl BatchSummary {
    /// Process exit code: 1 iff any task ended in `Error`.
    pub fn exit_code(&self) -> i32 {
        if self.errors > 0 {
            1
        } else {
            0
        }
    }
}

pub type PromptFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type SharedProgressFn = Arc<dyn Fn(u32, u32, u64, u64) + Send + Sync>;
pub type TaskHookFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

pub struct BatchController<'a> {
    drive: &'a Drive,
    state_dir: PathBuf,
    opts: BatchOptions,
    prompt: Option<PromptFn>,
    progress: Option<SharedProgressFn>,
    task_hook: Option<TaskHookFn>,
    save_chunk_interval: u32,
    save_interval: Duration,
}

impl<'a> BatchController<'a> {
    pub fn new(drive: &'a Drive, state_dir: PathBuf, opts: BatchOptions) -> Self {
        Self {
            drive,
            state_dir,
            opts,
            prompt: None,
            progress: None,
            task_hook: None,
            save_chunk_interval: 10,
            save_interval: Duration::from_secs(5),
        }
    }

    /// Interactive conflict prompt (y/N). Only consulted under
    /// [`ConflictPolicy::Ask`] and never when `force` is set.
    pub fn with_prompt(mut self, prompt: PromptFn) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Chunk-level progress relay.
    pub fn with_progress(mut self, progress: SharedProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Called once per task with (index, total, label) before it runs.
    pub fn with_task_hook(mut self, hook: TaskHookFn) -> Self {
        self.task_hook = Some(hook);
        self
    }

    pub fn with_save_policy(mut self, chunk_interval: u32, interval: Duration) -> Self {
        self.save_chunk_interval = chunk_interval;
        self.save_interval = interval;
        self
    }

    fn effective_policy(&self) -> ConflictPolicy {
        if self.opts.force {
            ConflictPolicy::Overwrite
        } else {
            self.opts.conflict
        }
    }

    // ── Upload ────────────────────────────────────────────────────────────────

    pub async fn run_upload(&self, sources: &[String], target: &str) -> Result<BatchSummary> {
        let id = batch_id(BatchOperation::Upload, sources, target);
        let store = BatchStore::new(&self.state_dir, &id);
        let state = match store.load()? {
            Some(existing) => {
                info!(batch = %id, "resuming upload batch");
                existing
            }
            None => self.build_upload_state(sources, target)?,
        };
        if state.tasks.is_empty() {
            return Err(anyhow::anyhow!("no local files matched the given sources").into());
        }
        store.save(&state)?;

        // Create every remote parent up-front so a long batch fails fast on
        // an unwritable target rather than at task 900.
        let parents: BTreeSet<String> = state
            .tasks
            .iter()
            .filter(|t| !t.status.is_settled())
            .filter_map(|t| t.remote_path.as_deref())
            .map(|p| paths::parent_and_name(p).0)
            .collect();
        for parent in parents {
            if let Err(e) = self.drive.mkdir_p(&parent, None, None).await {
                warn!(parent = %parent, "pre-creating remote folder failed: {e}");
            }
        }

        let total = state.tasks.len();
        let state = Arc::new(Mutex::new(state));
        let mut summary = BatchSummary::default();

        for idx in 0..total {
            let (status, label) = {
                let s = state.lock().unwrap();
                let t = &s.tasks[idx];
                (t.status.clone(), t.remote_path.clone().unwrap_or_default())
            };
            match status {
                TaskStatus::Completed => {
                    summary.completed += 1;
                    continue;
                }
                TaskStatus::Skipped(_) => {
                    summary.skipped += 1;
                    continue;
                }
                _ => {}
            }
            if let Some(hook) = &self.task_hook {
                hook(idx, total, &label);
            }
            self.run_upload_task(&store, &state, idx, &mut summary).await;
        }

        let final_state = state.lock().unwrap();
        if final_state.is_complete() {
            store.delete()?;
            debug!(batch = %id, "batch complete, state removed");
        } else {
            store.save_best_effort(&final_state);
        }
        Ok(summary)
    }

    fn build_upload_state(&self, sources: &[String], target: &str) -> Result<BatchState> {
        let filters = Filters::new(&self.opts)?;
        let target_norm = paths::normalize(target);
        let mut tasks = Vec::new();

        for source in sources {
            let spill_contents =
                source.ends_with('/') || source.ends_with(std::path::MAIN_SEPARATOR);
            let matches = expand_source(source);
            if matches.is_empty() {
                warn!(source = %source, "source matched nothing");
            }
            for path in matches {
                if path.is_file() {
                    let name = file_name_of(&path);
                    tasks.push(BatchTask::new_upload(
                        path.clone(),
                        paths::join(&target_norm, &name),
                    ));
                } else if path.is_dir() {
                    if !self.opts.recursive {
                        warn!(path = %path.display(), "skipping directory (no --recursive)");
                        continue;
                    }
                    // Trailing slash spills the contents into the target;
                    // otherwise the directory lands inside it by name.
                    let base = if spill_contents {
                        target_norm.clone()
                    } else {
                        paths::join(&target_norm, &file_name_of(&path))
                    };
                    for file in walk_local(&path)? {
                        let rel = file
                            .strip_prefix(&path)
                            .unwrap_or(&file)
                            .to_string_lossy()
                            .replace(std::path::MAIN_SEPARATOR, "/");
                        let name = file_name_of(&file);
                        if !filters.passes(&name, &rel) {
                            continue;
                        }
                        let remote = format!("{}/{rel}", base.trim_end_matches('/'));
                        tasks.push(BatchTask::new_upload(file, paths::normalize(&remote)));
                    }
                }
            }
        }

        Ok(BatchState {
            operation_type: BatchOperation::Upload,
            target_remote_path: target_norm,
            local_destination: None,
            tasks,
        })
    }

    async fn run_upload_task(
        &self,
        store: &BatchStore,
        state: &Arc<Mutex<BatchState>>,
        idx: usize,
        summary: &mut BatchSummary,
    ) {
        let (local_path, remote_path, resume) = {
            let s = state.lock().unwrap();
            let t = &s.tasks[idx];
            // A task loaded as `Uploading` means the process died mid-file
            // after the resume triple was persisted; treat it like
            // `Interrupted`. Re-sending the chunks past the last persisted
            // save point is harmless; the server overwrites staged chunks.
            let resumable = matches!(t.status, TaskStatus::Interrupted | TaskStatus::Uploading);
            let resume = if resumable {
                match (&t.file_uuid, &t.upload_key, &t.file_key) {
                    (Some(file_uuid), Some(upload_key), Some(file_key)) => Some(ResumePoint {
                        file_uuid: file_uuid.clone(),
                        upload_key: upload_key.clone(),
                        file_key: file_key.clone(),
                        last_chunk: t.last_chunk,
                    }),
                    _ => None,
                }
            } else {
                None
            };
            (
                t.local_path.clone(),
                t.remote_path.clone().unwrap_or_default(),
                resume,
            )
        };

        let (parent_path, name) = paths::parent_and_name(&remote_path);
        let Some(name) = name else {
            self.settle(store, state, idx, TaskStatus::Error("target".into()));
            summary.errors += 1;
            return;
        };

        let parent_uuid = match self.drive.mkdir_p(&parent_path, None, None).await {
            Ok(uuid) => uuid,
            Err(e) => {
                warn!(remote = %remote_path, "resolving remote parent failed: {e}");
                self.settle(store, state, idx, TaskStatus::Error("parent".into()));
                summary.errors += 1;
                return;
            }
        };

        // Conflicts are decided once, before the first chunk; an interrupted
        // task already passed this gate.
        if resume.is_none() {
            match self
                .upload_conflict_decision(&parent_uuid, &name, &local_path)
                .await
            {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    debug!(remote = %remote_path, reason = %reason, "skipping");
                    self.settle(store, state, idx, TaskStatus::Skipped(reason));
                    summary.skipped += 1;
                    return;
                }
                Err(e) => {
                    warn!(remote = %remote_path, "conflict check failed: {e}");
                    self.settle(store, state, idx, TaskStatus::Error("conflict".into()));
                    summary.errors += 1;
                    return;
                }
            }
        }

        let (created_ms, modified_ms) = if self.opts.preserve_timestamps {
            local_timestamps(&local_path)
        } else {
            (None, None)
        };

        if resume.is_some() {
            let mut s = state.lock().unwrap();
            s.tasks[idx].status = TaskStatus::Uploading;
            store.save_best_effort(&s);
        }

        // Throttled mid-file persistence rides on the progress callback.
        let throttle = Arc::new(Mutex::new(SaveThrottle::new(
            self.save_chunk_interval,
            self.save_interval,
        )));
        let progress_state = Arc::clone(state);
        let progress_store = store.clone();
        let user_progress = self.progress.clone();
        let progress: ProgressFn = Box::new(move |done, chunks, bytes, size| {
            let last_chunk = done as i64 - 1;
            {
                let mut s = progress_state.lock().unwrap();
                s.tasks[idx].last_chunk = last_chunk;
                if throttle.lock().unwrap().should_save(last_chunk) {
                    progress_store.save_best_effort(&s);
                }
            }
            if let Some(cb) = &user_progress {
                cb(done, chunks, bytes, size);
            }
        });

        // Persist the resume triple before the first chunk ships.
        let start_state = Arc::clone(state);
        let start_store = store.clone();
        let mut on_start = move |point: &ResumePoint| {
            let mut s = start_state.lock().unwrap();
            let t = &mut s.tasks[idx];
            t.status = TaskStatus::Uploading;
            t.file_uuid = Some(point.file_uuid.clone());
            t.upload_key = Some(point.upload_key.clone());
            t.file_key = Some(point.file_key.clone());
            t.last_chunk = -1;
            start_store.save_best_effort(&s);
        };

        let result = upload::upload_file(
            self.drive,
            UploadRequest {
                local_path: &local_path,
                parent_uuid: &parent_uuid,
                remote_name: &name,
                resume,
                created_ms,
                modified_ms,
            },
            Some(&progress),
            Some(&mut on_start),
        )
        .await;

        match result {
            Ok(outcome) => {
                summary.completed += 1;
                summary.bytes += outcome.size;
                self.settle(store, state, idx, TaskStatus::Completed);
            }
            Err(FilenError::ChunkUploadFailed {
                file_uuid,
                upload_key,
                file_key,
                last_chunk,
                source,
            }) => {
                warn!(remote = %remote_path, last_chunk, "upload interrupted: {source}");
                let mut s = state.lock().unwrap();
                let t = &mut s.tasks[idx];
                t.status = TaskStatus::Interrupted;
                t.file_uuid = Some(file_uuid);
                t.upload_key = Some(upload_key);
                t.file_key = Some(file_key);
                t.last_chunk = last_chunk;
                store.save_best_effort(&s);
                summary.interrupted += 1;
            }
            Err(e) => {
                warn!(remote = %remote_path, "upload failed: {e}");
                self.settle(store, state, idx, TaskStatus::Error("upload".into()));
                summary.errors += 1;
            }
        }
    }

    async fn upload_conflict_decision(
        &self,
        parent_uuid: &str,
        name: &str,
        local_path: &Path,
    ) -> Result<Option<String>> {
        let files = self.drive.files_under(parent_uuid).await?;
        let Some(remote) = files.into_iter().find(|f| f.name == name) else {
            return Ok(None);
        };

        match self.effective_policy() {
            ConflictPolicy::Overwrite => Ok(None),
            ConflictPolicy::Skip => Ok(Some("conflict".into())),
            ConflictPolicy::Newer => {
                let local_ms = std::fs::metadata(local_path)
                    .ok()
                    .and_then(|m| mtime_ms(&m));
                let remote_ms = (remote.last_modified_ms > 0).then_some(remote.last_modified_ms);
                match (local_ms, remote_ms) {
                    (Some(local), Some(remote)) if local > remote => Ok(None),
                    (Some(_), Some(_)) => Ok(Some("newer".into())),
                    _ => Ok(Some("no_timestamp".into())),
                }
            }
            ConflictPolicy::Ask => match &self.prompt {
                Some(prompt) if prompt(&format!("overwrite remote file '{name}'?")) => Ok(None),
                _ => Ok(Some("declined".into())),
            },
        }
    }

    // ── Download ──────────────────────────────────────────────────────────────

    pub async fn run_download(&self, remote: &str, dest: &Path) -> Result<BatchSummary> {
        let remote_norm = paths::normalize(remote);
        let id = batch_id(
            BatchOperation::Download,
            &[remote_norm.clone()],
            &dest.display().to_string(),
        );
        let store = BatchStore::new(&self.state_dir, &id);
        let state = match store.load()? {
            Some(existing) => {
                info!(batch = %id, "resuming download batch");
                existing
            }
            None => self.build_download_state(&remote_norm, dest).await?,
        };
        if state.tasks.is_empty() {
            return Err(anyhow::anyhow!("no remote files matched {remote_norm}").into());
        }
        store.save(&state)?;

        for task in state.tasks.iter().filter(|t| !t.status.is_settled()) {
            if let Some(parent) = task.local_path.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        warn!(dir = %parent.display(), "pre-creating local folder failed: {e}");
                    }
                }
            }
        }

        let total = state.tasks.len();
        let state = Arc::new(Mutex::new(state));
        let mut summary = BatchSummary::default();

        for idx in 0..total {
            let (status, label) = {
                let s = state.lock().unwrap();
                let t = &s.tasks[idx];
                (t.status.clone(), t.remote_path.clone().unwrap_or_default())
            };
            match status {
                TaskStatus::Completed => {
                    summary.completed += 1;
                    continue;
                }
                TaskStatus::Skipped(_) => {
                    summary.skipped += 1;
                    continue;
                }
                _ => {}
            }
            if let Some(hook) = &self.task_hook {
                hook(idx, total, &label);
            }
            self.run_download_task(&store, &state, idx, &mut summary).await;
        }

        let final_state = state.lock().unwrap();
        if final_state.is_complete() {
            store.delete()?;
            debug!(batch = %id, "batch complete, state removed");
        } else {
            store.save_best_effort(&final_state);
        }
        Ok(summary)
    }

    async fn build_download_state(&self, remote: &str, dest: &Path) -> Result<BatchState> {
        let filters = Filters::new(&self.opts)?;
        let mut tasks = Vec::new();

        match self.drive.resolve(remote).await? {
            ResolvedItem::File(file) => {
                let local = if dest.is_dir() {
                    dest.join(&file.name)
                } else {
                    dest.to_path_buf()
                };
                tasks.push(BatchTask::new_download(
                    local,
                    remote.to_string(),
                    file.uuid.clone(),
                    (file.last_modified_ms > 0).then_some(file.last_modified_ms),
                ));
            }
            ResolvedItem::Folder(folder) => {
                if !self.opts.recursive {
                    return Err(anyhow::anyhow!(
                        "{remote} is a folder (pass --recursive to download it)"
                    )
                    .into());
                }
                for (rel, file) in self.walk_remote(&folder.uuid).await? {
                    if !filters.passes(&file.name, &rel) {
                        continue;
                    }
                    let local = rel.split('/').fold(dest.to_path_buf(), |p, c| p.join(c));
                    tasks.push(BatchTask::new_download(
                        local,
                        paths::join(remote, &rel),
                        file.uuid.clone(),
                        (file.last_modified_ms > 0).then_some(file.last_modified_ms),
                    ));
                }
            }
        }

        Ok(BatchState {
            operation_type: BatchOperation::Download,
            target_remote_path: remote.to_string(),
            local_destination: Some(dest.to_path_buf()),
            tasks,
        })
    }

    /// Depth-first remote walk via the listing cache, name-ordered.
    async fn walk_remote(&self, root: &str) -> Result<Vec<(String, FileHandle)>> {
        let mut out = Vec::new();
        let mut stack = vec![(root.to_string(), String::new())];
        while let Some((uuid, prefix)) = stack.pop() {
            let mut files = self.drive.files_under(&uuid).await?;
            files.sort_by(|a, b| a.name.cmp(&b.name));
            for file in files {
                let rel = if prefix.is_empty() {
                    file.name.clone()
                } else {
                    format!("{prefix}/{}", file.name)
                };
                out.push((rel, file));
            }
            let mut folders = self.drive.folders_under(&uuid).await?;
            folders.sort_by(|a, b| a.name.cmp(&b.name));
            for folder in folders.into_iter().rev() {
                let child_prefix = if prefix.is_empty() {
                    folder.name.clone()
                } else {
                    format!("{prefix}/{}", folder.name)
                };
                stack.push((folder.uuid, child_prefix));
            }
        }
        Ok(out)
    }

    async fn run_download_task(
        &self,
        store: &BatchStore,
        state: &Arc<Mutex<BatchState>>,
        idx: usize,
        summary: &mut BatchSummary,
    ) {
        let (local_path, remote_uuid, remote_ms) = {
            let s = state.lock().unwrap();
            let t = &s.tasks[idx];
            (
                t.local_path.clone(),
                t.remote_uuid.clone(),
                t.remote_modification_time,
            )
        };
        let Some(remote_uuid) = remote_uuid else {
            self.settle(store, state, idx, TaskStatus::Error("task".into()));
            summary.errors += 1;
            return;
        };

        if local_path.exists() {
            match self.effective_policy() {
                ConflictPolicy::Overwrite => {}
                ConflictPolicy::Skip => {
                    self.settle(store, state, idx, TaskStatus::Skipped("conflict".into()));
                    summary.skipped += 1;
                    return;
                }
                ConflictPolicy::Newer => {
                    let local_ms = std::fs::metadata(&local_path)
                        .ok()
                        .and_then(|m| mtime_ms(&m));
                    match (remote_ms, local_ms) {
                        (Some(remote), Some(local)) if remote > local => {}
                        (Some(_), Some(_)) => {
                            self.settle(store, state, idx, TaskStatus::Skipped("newer".into()));
                            summary.skipped += 1;
                            return;
                        }
                        _ => {
                            self.settle(
                                store,
                                state,
                                idx,
                                TaskStatus::Skipped("no_timestamp".into()),
                            );
                            summary.skipped += 1;
                            return;
                        }
                    }
                }
                ConflictPolicy::Ask => {
                    let overwrite = self
                        .prompt
                        .as_ref()
                        .map(|p| p(&format!("overwrite local file {}?", local_path.display())))
                        .unwrap_or(false);
                    if !overwrite {
                        self.settle(store, state, idx, TaskStatus::Skipped("declined".into()));
                        summary.skipped += 1;
                        return;
                    }
                }
            }
        }

        let file = match self.drive.fetch_file(&remote_uuid).await {
            Ok(file) => file,
            Err(e) => {
                warn!(uuid = %remote_uuid, "fetching file record failed: {e}");
                self.settle(store, state, idx, TaskStatus::Error("metadata".into()));
                summary.errors += 1;
                return;
            }
        };

        let user_progress = self.progress.clone();
        let progress: ProgressFn = Box::new(move |done, chunks, bytes, size| {
            if let Some(cb) = &user_progress {
                cb(done, chunks, bytes, size);
            }
        });

        match download::download_file(self.drive, &file, &local_path, Some(&progress)).await {
            Ok(outcome) => {
                summary.completed += 1;
                summary.bytes += outcome.bytes_written;
                self.settle(store, state, idx, TaskStatus::Completed);
            }
            Err(e) => {
                warn!(dest = %local_path.display(), "download failed: {e}");
                self.settle(store, state, idx, TaskStatus::Error("download".into()));
                summary.errors += 1;
            }
        }
    }

    /// Apply a terminal status, clear resume fields per the state
    /// invariant, and persist.
    fn settle(
        &self,
        store: &BatchStore,
        state: &Arc<Mutex<BatchState>>,
        idx: usize,
        status: TaskStatus,
    ) {
        let mut s = state.lock().unwrap();
        let t = &mut s.tasks[idx];
        t.status = status;
        t.clear_resume();
        store.save_best_effort(&s);
    }
}

// ── Local filesystem helpers ────────────────────────────────────────────────

struct Filters {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Filters {
    fn new(opts: &BatchOptions) -> Result<Self> {
        let parse = |patterns: &[String]| -> Result<Vec<Pattern>> {
            patterns
                .iter()
                .map(|p| {
                    Pattern::new(p).map_err(|e| anyhow::anyhow!("invalid pattern {p:?}: {e}").into())
                })
                .collect()
        };
        Ok(Self {
            include: parse(&opts.include)?,
            exclude: parse(&opts.exclude)?,
        })
    }

    fn passes(&self, name: &str, rel: &str) -> bool {
        if self
            .exclude
            .iter()
            .any(|p| p.matches(name) || p.matches(rel))
        {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        self.include
            .iter()
            .any(|p| p.matches(name) || p.matches(rel))
    }
}

/// Glob-expand one source argument; a literal path that exists always
/// matches itself.
fn expand_source(source: &str) -> Vec<PathBuf> {
    let literal = Path::new(source);
    match glob::glob(source) {
        Ok(matches) => {
            let found: Vec<PathBuf> = matches.filter_map(|m| m.ok()).collect();
            if found.is_empty() && literal.exists() {
                vec![literal.to_path_buf()]
            } else {
                found
            }
        }
        Err(_) if literal.exists() => vec![literal.to_path_buf()],
        Err(_) => Vec::new(),
    }
}

/// Depth-first local walk, deterministic order.
fn walk_local(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_local_inner(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_local_inner(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        let path = entry.path();
        if meta.is_dir() {
            walk_local_inner(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn mtime_ms(meta: &std::fs::Metadata) -> Option<i64> {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
}

fn local_timestamps(path: &Path) -> (Option<i64>, Option<i64>) {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let created = meta
                .created()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64);
            (created, mtime_ms(&meta))
        }
        Err(_) => (None, None),
    }
}
