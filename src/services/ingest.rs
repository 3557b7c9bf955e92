//! Ingestion pipeline
//!
//! The single code path from an upload event to a catalog record: channel
//! guard, dedup gate, filename parse, metadata resolution, link building,
//! insert, and uploader feedback. Stages run strictly in order; every
//! failure ends the run after exactly one failure edit, and nothing is
//! retried.

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{CatalogStore, CreateMovie, DownloadLink};
use crate::services::filename_parser::parse_release;
use crate::services::metadata::{MovieMetadata, ResolvedMovie};
use crate::services::notify::StatusNotifier;

/// One post in the monitored channel carrying a named attachment
#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub chat_id: i64,
    pub message_id: i64,
    pub file_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Document,
}

/// Why a run ended without a record. Each variant maps to exactly one
/// failure edit of the status message.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Could not parse a title and year from `{0}`.")]
    Parse(String),

    #[error("Could not find details for `{0}`.")]
    Resolution(String),

    #[error("DB Error: {0}")]
    Persistence(String),
}

/// Terminal state of one pipeline run
#[derive(Debug)]
pub enum IngestOutcome {
    /// Wrong channel or unusable attachment; dropped silently
    Ignored,
    /// Filename already catalogued; no record, no notification edit
    Duplicate,
    /// Run aborted after a failure edit was sent
    Failed(IngestError),
    /// Record created and success edit sent
    Created(Uuid),
}

/// Orchestrates one upload event end to end
pub struct IngestPipeline {
    store: Arc<dyn CatalogStore>,
    metadata: Arc<dyn MovieMetadata>,
    notifier: Arc<dyn StatusNotifier>,
    allowed_channel_id: i64,
    public_base_url: String,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        metadata: Arc<dyn MovieMetadata>,
        notifier: Arc<dyn StatusNotifier>,
        allowed_channel_id: i64,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            metadata,
            notifier,
            allowed_channel_id,
            public_base_url,
        }
    }

    /// Run the pipeline for one event.
    ///
    /// Err covers infrastructure failures around the run itself (store
    /// lookup, sending the initial message); everything the uploader is
    /// told about comes back as Ok(Failed(..)).
    pub async fn run(&self, event: UploadEvent) -> Result<IngestOutcome> {
        if event.chat_id != self.allowed_channel_id {
            debug!(chat_id = event.chat_id, "Dropping event from unallowed chat");
            return Ok(IngestOutcome::Ignored);
        }
        if event.file_name.is_empty() {
            debug!("Dropping event without a filename");
            return Ok(IngestOutcome::Ignored);
        }

        info!(
            filename = %event.file_name,
            message_id = event.message_id,
            kind = ?event.kind,
            size = event.file_size,
            "Processing upload event"
        );

        // Dedup gate, ahead of any network work or notification.
        if self
            .store
            .find_by_original_filename(&event.file_name)
            .await?
            .is_some()
        {
            info!(filename = %event.file_name, "Skipping already-catalogued file");
            return Ok(IngestOutcome::Duplicate);
        }

        let status = self
            .notifier
            .processing(event.chat_id, &event.file_name)
            .await?;

        let Some(parsed) = parse_release(&event.file_name) else {
            let err = IngestError::Parse(event.file_name.clone());
            self.notifier.failed(&status, &err.to_string()).await?;
            return Ok(IngestOutcome::Failed(err));
        };

        let resolved = match self
            .metadata
            .resolve(&parsed.title, Some(&parsed.year))
            .await
        {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                let err = IngestError::Resolution(event.file_name.clone());
                self.notifier.failed(&status, &err.to_string()).await?;
                return Ok(IngestOutcome::Failed(err));
            }
            Err(e) => {
                warn!(filename = %event.file_name, error = %e, "Metadata lookup failed");
                let err = IngestError::Resolution(event.file_name.clone());
                self.notifier.failed(&status, &err.to_string()).await?;
                return Ok(IngestOutcome::Failed(err));
            }
        };

        let movie = self.build_record(&event, resolved);
        let title = movie.title.clone();

        match self.store.insert(movie).await {
            Ok(Some(id)) => {
                let record_url = format!("{}/movie/{}", self.public_base_url, id);
                self.notifier.succeeded(&status, &title, &record_url).await?;
                info!(filename = %event.file_name, title = %title, id = %id, "Catalogued movie");
                Ok(IngestOutcome::Created(id))
            }
            // Insert conflict: a concurrent run for the same filename won
            // the race. Same silent treatment as the dedup gate.
            Ok(None) => {
                info!(filename = %event.file_name, "Lost insert race, record already exists");
                Ok(IngestOutcome::Duplicate)
            }
            Err(e) => {
                let err = IngestError::Persistence(format!("{e:#}"));
                self.notifier.failed(&status, &err.to_string()).await?;
                Ok(IngestOutcome::Failed(err))
            }
        }
    }

    fn build_record(&self, event: &UploadEvent, resolved: ResolvedMovie) -> CreateMovie {
        let watch_link = format!("{}/stream/{}", self.public_base_url, event.file_id);
        let download_link = format!("{}/download/{}", self.public_base_url, event.file_id);
        let size = format!("{:.2} MB", event.file_size as f64 / (1024.0 * 1024.0));

        CreateMovie {
            title: resolved.title,
            media_type: "movie".to_string(),
            tmdb_id: Some(resolved.tmdb_id),
            overview: resolved.overview,
            poster_url: resolved.poster_url,
            release_date: resolved.release_date,
            rating: resolved.rating,
            genres: resolved.genres,
            watch_link,
            download_links: vec![DownloadLink {
                quality: "Source".to_string(),
                url: download_link,
                size,
            }],
            is_trending: false,
            is_coming_soon: false,
            poster_badge: String::new(),
            original_filename: event.file_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::MovieRecord;
    use crate::services::notify::StatusMessage;

    const CHANNEL: i64 = -100123;
    const BASE: &str = "https://vault.example.com";

    /// In-memory store with the same conflict-as-dedup contract as Postgres
    #[derive(Default)]
    struct MemStore {
        records: Mutex<Vec<(Uuid, CreateMovie)>>,
        fail_inserts: bool,
    }

    #[async_trait]
    impl CatalogStore for MemStore {
        async fn insert(&self, movie: CreateMovie) -> Result<Option<Uuid>> {
            if self.fail_inserts {
                anyhow::bail!("connection refused");
            }
            let mut records = self.records.lock().unwrap();
            if records
                .iter()
                .any(|(_, m)| m.original_filename == movie.original_filename)
            {
                return Ok(None);
            }
            let id = Uuid::new_v4();
            records.push((id, movie));
            Ok(Some(id))
        }

        async fn find_by_original_filename(&self, name: &str) -> Result<Option<MovieRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().find(|(_, m)| m.original_filename == name).map(
                |(id, m)| MovieRecord {
                    id: *id,
                    title: m.title.clone(),
                    media_type: m.media_type.clone(),
                    tmdb_id: m.tmdb_id,
                    overview: m.overview.clone(),
                    poster_url: m.poster_url.clone(),
                    release_date: m.release_date.clone(),
                    rating: m.rating,
                    genres: m.genres.clone(),
                    watch_link: m.watch_link.clone(),
                    download_links: sqlx::types::Json(m.download_links.clone()),
                    is_trending: m.is_trending,
                    is_coming_soon: m.is_coming_soon,
                    poster_badge: m.poster_badge.clone(),
                    original_filename: m.original_filename.clone(),
                    created_at: chrono::Utc::now(),
                },
            ))
        }
    }

    /// Resolver fake that counts calls and replays a fixed answer
    struct FakeResolver {
        answer: Option<ResolvedMovie>,
        calls: AtomicUsize,
    }

    impl FakeResolver {
        fn with_match(answer: ResolvedMovie) -> Self {
            Self {
                answer: Some(answer),
                calls: AtomicUsize::new(0),
            }
        }

        fn no_match() -> Self {
            Self {
                answer: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MovieMetadata for FakeResolver {
        async fn resolve(&self, _title: &str, _year: Option<&str>) -> Result<Option<ResolvedMovie>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    /// Records every notification so tests can assert the exact sequence
    #[derive(Default)]
    struct RecordingNotifier {
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatusNotifier for RecordingNotifier {
        async fn processing(&self, chat_id: i64, filename: &str) -> Result<StatusMessage> {
            self.log.lock().unwrap().push(format!("processing:{filename}"));
            Ok(StatusMessage {
                chat_id,
                message_id: 1,
            })
        }

        async fn succeeded(&self, _: &StatusMessage, title: &str, url: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("success:{title}:{url}"));
            Ok(())
        }

        async fn failed(&self, _: &StatusMessage, reason: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("failure:{reason}"));
            Ok(())
        }
    }

    fn inception() -> ResolvedMovie {
        ResolvedMovie {
            title: "Inception".to_string(),
            tmdb_id: 27205,
            overview: Some("A thief who steals corporate secrets.".to_string()),
            poster_url: "https://image.tmdb.org/t/p/w500/inception.jpg".to_string(),
            release_date: Some("2010-07-16".to_string()),
            rating: Some(8.4),
            genres: vec!["Action".to_string(), "Science Fiction".to_string()],
        }
    }

    fn event(file_name: &str) -> UploadEvent {
        UploadEvent {
            chat_id: CHANNEL,
            message_id: 10,
            file_id: "file-abc".to_string(),
            file_name: file_name.to_string(),
            file_size: 734_003_200,
            kind: MediaKind::Video,
        }
    }

    fn pipeline(
        store: Arc<MemStore>,
        resolver: Arc<FakeResolver>,
        notifier: Arc<RecordingNotifier>,
    ) -> IngestPipeline {
        IngestPipeline::new(store, resolver, notifier, CHANNEL, BASE.to_string())
    }

    #[tokio::test]
    async fn test_successful_ingestion_creates_record_with_links() {
        let store = Arc::new(MemStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline(store.clone(), Arc::new(FakeResolver::with_match(inception())), notifier.clone());

        let outcome = p.run(event("Inception.2010.mkv")).await.unwrap();
        let id = match outcome {
            IngestOutcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        };

        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let movie = &records[0].1;
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.media_type, "movie");
        assert_eq!(movie.original_filename, "Inception.2010.mkv");
        assert_eq!(movie.watch_link, format!("{BASE}/stream/file-abc"));
        assert_eq!(movie.release_date.as_deref(), Some("2010-07-16"));
        assert_eq!(movie.download_links.len(), 1);
        assert_eq!(movie.download_links[0].quality, "Source");
        assert_eq!(movie.download_links[0].url, format!("{BASE}/download/file-abc"));
        assert_eq!(movie.download_links[0].size, "700.00 MB");
        drop(records);

        let log = notifier.log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], "processing:Inception.2010.mkv");
        assert_eq!(log[1], format!("success:Inception:{BASE}/movie/{id}"));
    }

    #[tokio::test]
    async fn test_wrong_channel_is_dropped_silently() {
        let store = Arc::new(MemStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = Arc::new(FakeResolver::with_match(inception()));
        let p = pipeline(store.clone(), resolver.clone(), notifier.clone());

        let mut ev = event("Inception.2010.mkv");
        ev.chat_id = -999;
        let outcome = p.run(ev).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Ignored));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(notifier.log.lock().unwrap().is_empty());
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_filename_skips_before_any_work() {
        let store = Arc::new(MemStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = Arc::new(FakeResolver::with_match(inception()));
        let p = pipeline(store.clone(), resolver.clone(), notifier.clone());

        let first = p.run(event("Inception.2010.mkv")).await.unwrap();
        assert!(matches!(first, IngestOutcome::Created(_)));

        let second = p.run(event("Inception.2010.mkv")).await.unwrap();
        assert!(matches!(second, IngestOutcome::Duplicate));

        // One record, one resolve, no second notification.
        assert_eq!(store.records.lock().unwrap().len(), 1);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_filename_notifies_and_stops() {
        let store = Arc::new(MemStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = Arc::new(FakeResolver::with_match(inception()));
        let p = pipeline(store.clone(), resolver.clone(), notifier.clone());

        let outcome = p.run(event("RandomClip.mkv")).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Failed(IngestError::Parse(_))));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(store.records.lock().unwrap().is_empty());

        let log = notifier.log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], "processing:RandomClip.mkv");
        assert_eq!(log[1], "failure:Could not parse a title and year from `RandomClip.mkv`.");
    }

    #[tokio::test]
    async fn test_no_metadata_match_notifies_and_stops() {
        let store = Arc::new(MemStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline(store.clone(), Arc::new(FakeResolver::no_match()), notifier.clone());

        let outcome = p.run(event("Obscure.Film.2003.mkv")).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Failed(IngestError::Resolution(_))));
        assert!(store.records.lock().unwrap().is_empty());

        let log = notifier.log.lock().unwrap();
        assert_eq!(log[1], "failure:Could not find details for `Obscure.Film.2003.mkv`.");
    }

    #[tokio::test]
    async fn test_insert_failure_notifies_with_detail() {
        let store = Arc::new(MemStore {
            fail_inserts: true,
            ..Default::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline(store, Arc::new(FakeResolver::with_match(inception())), notifier.clone());

        let outcome = p.run(event("Inception.2010.mkv")).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Failed(IngestError::Persistence(_))));
        let log = notifier.log.lock().unwrap();
        assert!(log[1].starts_with("failure:DB Error:"));
        assert!(log[1].contains("connection refused"));
    }

    /// Store whose gate lookup never sees the record, simulating two runs
    /// that both pass the gate before either inserts
    struct RacyStore(MemStore);

    #[async_trait]
    impl CatalogStore for RacyStore {
        async fn insert(&self, movie: CreateMovie) -> Result<Option<Uuid>> {
            self.0.insert(movie).await
        }

        async fn find_by_original_filename(&self, _name: &str) -> Result<Option<MovieRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_treated_as_duplicate() {
        let store = Arc::new(RacyStore(MemStore::default()));
        let notifier = Arc::new(RecordingNotifier::default());
        let p = pipeline_with(store.clone(), Arc::new(FakeResolver::with_match(inception())), notifier.clone());

        let first = p.run(event("Inception.2010.mkv")).await.unwrap();
        assert!(matches!(first, IngestOutcome::Created(_)));

        // Second run passes the (blind) gate but its insert conflicts.
        let second = p.run(event("Inception.2010.mkv")).await.unwrap();
        assert!(matches!(second, IngestOutcome::Duplicate));

        assert_eq!(store.0.records.lock().unwrap().len(), 1);
        // Two processing messages, but only one success edit; the loser's
        // message is left unedited.
        let log = notifier.log.lock().unwrap();
        assert_eq!(log.iter().filter(|l| l.starts_with("processing:")).count(), 2);
        assert_eq!(log.iter().filter(|l| l.starts_with("success:")).count(), 1);
        assert_eq!(log.iter().filter(|l| l.starts_with("failure:")).count(), 0);
    }

    fn pipeline_with(
        store: Arc<dyn CatalogStore>,
        resolver: Arc<FakeResolver>,
        notifier: Arc<RecordingNotifier>,
    ) -> IngestPipeline {
        IngestPipeline::new(store, resolver, notifier, CHANNEL, BASE.to_string())
    }
}
