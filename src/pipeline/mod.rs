use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::api::{PanoptoApi, Session};
use crate::archive::{archive_file_name, ArchiveBuilder};
use crate::captions::CaptionFetcher;
use crate::cli::Mode;
use crate::config::Config;
use crate::sessions::SessionEnumerator;
use crate::Result;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Enumerating,
    Fetching,
    Finalizing,
    Done,
    Aborted,
}

/// Why a run produced no archive
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error("No folder ID found. Expected a folder GUID or a folder URL containing #folderID=\"GUID\"")]
    MissingFolderId,

    #[error("Could not list sessions: {0}")]
    EnumerationFailed(String),

    #[error("No sessions found in this folder. (Archived sessions are not returned by the REST endpoint.)")]
    NoSessions,

    #[error("No caption files available to download in this folder.")]
    NoCaptions,

    #[error("Run cancelled")]
    Cancelled,
}

/// A session whose caption download failed
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub session_id: String,
    pub session_name: String,
    pub error: String,
}

/// A finished run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Sessions written to the archive
    pub archived: usize,

    /// Sessions without captions
    pub skipped: usize,

    /// Sessions whose captions could not be downloaded
    pub failures: Vec<FetchFailure>,

    /// Suggested archive file name
    pub file_name: String,

    /// Zip archive bytes
    pub archive: Vec<u8>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Done(RunResult),
    Aborted(AbortReason),
}

/// Receives the finished archive
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    async fn save(&self, file_name: &str, archive: &[u8]) -> Result<()>;
}

/// Writes archives into a directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

#[async_trait]
impl ArchiveSink for DirectorySink {
    async fn save(&self, file_name: &str, archive: &[u8]) -> Result<()> {
        fs_err::create_dir_all(&self.dir)?;
        let path = self.path_for(file_name);
        tracing::info!("Writing archive to: {}", path.display());
        fs_err::write(&path, archive)?;
        Ok(())
    }
}

/// Tunables for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub page_size: usize,
    pub max_concurrent_fetches: usize,
    pub file_prefix: String,
    pub max_folder_name_len: usize,
    pub show_progress: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.api.page_size,
            max_concurrent_fetches: config.app.max_concurrent_fetches,
            file_prefix: config.app.file_prefix.clone(),
            max_folder_name_len: config.app.max_folder_name_len,
            show_progress: true,
        }
    }
}

/// Result of processing one session
enum SessionOutcome {
    Fetched(String),
    NoCaption,
    Failed(anyhow::Error),
}

#[derive(Default)]
struct FetchTally {
    archive: ArchiveBuilder,
    skipped: usize,
    failures: Vec<FetchFailure>,
}

impl FetchTally {
    fn record(mut self, session: Session, outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Fetched(text) => {
                let entry = self.archive.add(&session, text);
                tracing::info!("Archived session {} as {}", session.id, entry.file_name());
            }
            SessionOutcome::NoCaption => {
                tracing::debug!("No captions for session {} ({})", session.id, session.name);
                self.skipped += 1;
            }
            SessionOutcome::Failed(error) => {
                tracing::warn!("Skipping session {} ({}): {:#}", session.id, session.name, error);
                self.failures.push(FetchFailure {
                    session_id: session.id,
                    session_name: session.name,
                    error: format!("{:#}", error),
                });
            }
        }
        self
    }
}

/// Folder to zip archive orchestration
pub struct Pipeline<A: PanoptoApi, S: ArchiveSink> {
    api: A,
    sink: S,
    options: PipelineOptions,
    state: PipelineState,
    cancel: CancellationToken,
}

impl<A: PanoptoApi, S: ArchiveSink> Pipeline<A, S> {
    pub fn new(api: A, sink: S, options: PipelineOptions) -> Self {
        Self {
            api,
            sink,
            options,
            state: PipelineState::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Token that aborts the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Use an externally owned token, e.g. one shared with a Ctrl-C handler
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Archive every caption in a folder and hand the archive to the sink.
    ///
    /// Fatal conditions come back as [`RunOutcome::Aborted`]; `Err` is reserved for failures
    /// building or saving the archive itself. Cancellation is honoured up to the point the
    /// archive is built; once saving starts it runs to completion.
    pub async fn run(&mut self, folder_id: &str, mode: Mode) -> Result<RunOutcome> {
        self.transition(PipelineState::Idle);

        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.execute(folder_id.trim(), mode) => Some(outcome),
        };

        let result = match outcome {
            Some(Ok(RunOutcome::Done(result))) => result,
            Some(Ok(aborted)) => return Ok(aborted),
            Some(Err(e)) => {
                self.transition(PipelineState::Aborted);
                return Err(e);
            }
            None => return Ok(self.abort(AbortReason::Cancelled)),
        };

        if let Err(e) = self.sink.save(&result.file_name, &result.archive).await {
            self.transition(PipelineState::Aborted);
            return Err(e.context(format!("Failed to save archive {}", result.file_name)));
        }

        tracing::info!(
            "Archived {} session(s) into {} ({} without captions, {} failed)",
            result.archived,
            result.file_name,
            result.skipped,
            result.failures.len()
        );
        self.transition(PipelineState::Done);

        Ok(RunOutcome::Done(result))
    }

    /// Everything up to a built archive; stops in `Finalizing` with the archive unsaved
    async fn execute(&mut self, folder_id: &str, mode: Mode) -> Result<RunOutcome> {
        if folder_id.is_empty() {
            return Ok(self.abort(AbortReason::MissingFolderId));
        }

        self.transition(PipelineState::Enumerating);
        let listing = SessionEnumerator::new(&self.api, self.options.page_size)
            .list_all(folder_id)
            .await;
        let listing = match listing {
            Ok(listing) => listing,
            Err(e) => return Ok(self.abort(AbortReason::EnumerationFailed(format!("{:#}", e)))),
        };

        if listing.sessions.is_empty() {
            return Ok(self.abort(AbortReason::NoSessions));
        }

        let folder_name = listing.folder.map(|folder| folder.name).unwrap_or_default();

        self.transition(PipelineState::Fetching);
        let tally = self.fetch_all(listing.sessions, mode).await;

        self.transition(PipelineState::Finalizing);
        if tally.archive.is_empty() {
            return Ok(self.abort(AbortReason::NoCaptions));
        }

        let archived = tally.archive.len();
        let file_name = archive_file_name(
            &self.options.file_prefix,
            mode,
            &folder_name,
            self.options.max_folder_name_len,
            Utc::now(),
        );
        let archive = tally.archive.finish()?;

        Ok(RunOutcome::Done(RunResult {
            archived,
            skipped: tally.skipped,
            failures: tally.failures,
            file_name,
            archive,
        }))
    }

    /// Download every session's captions, at most `max_concurrent_fetches` at a time,
    /// keeping results in enumeration order
    async fn fetch_all(&self, sessions: Vec<Session>, mode: Mode) -> FetchTally {
        let progress = self.progress_bar(sessions.len() as u64);
        let fetcher = CaptionFetcher::new(&self.api);

        let outcomes: Vec<(Session, SessionOutcome)> = stream::iter(sessions)
            .map(|session| {
                let fetcher = &fetcher;
                let progress = &progress;
                async move {
                    progress.set_message(session.name.clone());
                    let outcome = match fetcher.fetch(&session).await {
                        Ok(Some(document)) => SessionOutcome::Fetched(match mode {
                            Mode::Captions => document.text,
                            Mode::Transcripts => document.into_transcript(),
                        }),
                        Ok(None) => SessionOutcome::NoCaption,
                        Err(e) => SessionOutcome::Failed(e),
                    };
                    progress.inc(1);
                    (session, outcome)
                }
            })
            .buffered(self.options.max_concurrent_fetches.max(1))
            .collect()
            .await;

        progress.finish_and_clear();

        outcomes
            .into_iter()
            .fold(FetchTally::default(), |tally, (session, outcome)| {
                tally.record(session, outcome)
            })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress
    }

    fn abort(&mut self, reason: AbortReason) -> RunOutcome {
        tracing::warn!("Run aborted: {}", reason);
        self.transition(PipelineState::Aborted);
        RunOutcome::Aborted(reason)
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!("Pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
