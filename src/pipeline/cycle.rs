// src/pipeline/cycle.rs

//! One discovery cycle: load → fetch → diff → persist → notify.
//!
//! Every phase is always reached. Source, checkpoint and delivery failures
//! degrade to empty or `false` values and are logged; nothing escapes
//! [`Orchestrator::run_cycle`].

use chrono::Utc;

use crate::error::Result;
use crate::models::{CompetitionRecord, Config};
use crate::pipeline::{new_records, prune};
use crate::services::{CompetitionSource, DaconSource, KaggleSource, Notifier, SlackSink};
use crate::storage::{CheckpointStore, LocalStorage};
use crate::utils::http;

/// Phases of a cycle, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Loading,
    Fetching,
    Diffing,
    Persisting,
    Notifying,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records in the checkpoint after retention
    pub previous: usize,
    /// Records fetched across all sources
    pub fetched: usize,
    /// Records not present in the checkpoint
    pub new: usize,
    /// Messages the sink accepted (including the "nothing new" message)
    pub delivered: usize,
    /// Messages the sink rejected
    pub failed: usize,
    /// Whether the new checkpoint was written
    pub persisted: bool,
}

/// Owns the sources, checkpoint and notifier for the lifetime of the process.
pub struct Orchestrator {
    sources: Vec<Box<dyn CompetitionSource>>,
    store: Box<dyn CheckpointStore>,
    notifier: Notifier,
}

impl Orchestrator {
    pub fn new(
        sources: Vec<Box<dyn CompetitionSource>>,
        store: Box<dyn CheckpointStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            sources,
            store,
            notifier,
        }
    }

    /// Wire up the enabled sources, the local checkpoint and Slack from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http::create_async_client(&config.http)?;

        let mut sources: Vec<Box<dyn CompetitionSource>> = Vec::new();
        if config.kaggle.enabled {
            sources.push(Box::new(KaggleSource::new(config, client.clone())));
        }
        if config.dacon.enabled {
            sources.push(Box::new(DaconSource::new(config, client.clone())));
        }

        let store = Box::new(LocalStorage::new(&config.storage.checkpoint_path));
        let notifier = Notifier::new(Box::new(SlackSink::new(&config.slack, client)))
            .with_team_form(config.slack.team_form_url.clone());

        Ok(Self::new(sources, store, notifier))
    }

    fn enter(&self, phase: CyclePhase) {
        log::debug!("Cycle phase: {phase:?}");
    }

    /// Load the checkpoint and drop expired entries. Unreadable ⇒ empty.
    async fn load_checkpoint(&self) -> Vec<CompetitionRecord> {
        match self.store.load().await {
            Ok(records) => {
                let total = records.len();
                let kept = prune(records, Utc::now());
                if kept.len() < total {
                    log::info!("Retention: dropped {} expired competitions", total - kept.len());
                }
                kept
            }
            Err(e) => {
                log::error!(
                    "Checkpoint {} unreadable, treating every competition as new: {}",
                    self.store.location(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Run every source in turn; a failing source contributes nothing.
    async fn fetch_all(&self) -> Vec<CompetitionRecord> {
        let mut current = Vec::new();
        for source in &self.sources {
            current.extend(source.fetch_or_empty().await);
        }
        current
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        log::info!("Checking for new competitions...");
        let mut report = CycleReport::default();

        self.enter(CyclePhase::Loading);
        let previous = self.load_checkpoint().await;
        report.previous = previous.len();

        self.enter(CyclePhase::Fetching);
        let current = self.fetch_all().await;
        report.fetched = current.len();
        if current.is_empty() {
            log::warn!("No competitions fetched from any source");
        }

        self.enter(CyclePhase::Diffing);
        let fresh = new_records(&current, &previous);
        report.new = fresh.len();

        self.enter(CyclePhase::Persisting);
        match self.store.save(&current).await {
            Ok(()) => report.persisted = true,
            Err(e) => log::error!(
                "Checkpoint not saved, the next cycle may repeat these notifications: {e}"
            ),
        }

        self.enter(CyclePhase::Notifying);
        if fresh.is_empty() {
            log::info!("No new competitions found");
            self.tally(&mut report, self.notifier.notify_nothing_new().await);
        } else {
            log::info!("Found {} new competitions", fresh.len());
            for record in &fresh {
                self.tally(&mut report, self.notifier.notify(record).await);
            }
        }

        self.enter(CyclePhase::Idle);
        log::info!(
            "Cycle done: {} fetched, {} new, {} delivered, {} failed",
            report.fetched,
            report.new,
            report.delivered,
            report.failed
        );
        report
    }

    fn tally(&self, report: &mut CycleReport, delivered: bool) {
        if delivered {
            report.delivered += 1;
        } else {
            report.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Duration;
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::models::Platform;
    use crate::services::{MessageSink, NOTHING_NEW_TEXT, SlackMessage};

    struct StaticSource {
        platform: Platform,
        records: Vec<CompetitionRecord>,
    }

    #[async_trait]
    impl CompetitionSource for StaticSource {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch(&self) -> Result<Vec<CompetitionRecord>> {
            Ok(self.records.clone())
        }
    }

    struct DownSource(Platform);

    #[async_trait]
    impl CompetitionSource for DownSource {
        fn platform(&self) -> Platform {
            self.0
        }

        async fn fetch(&self) -> Result<Vec<CompetitionRecord>> {
            Err(AppError::source_unavailable(self.0.name(), "network unreachable"))
        }
    }

    struct ReadOnlyStore(Vec<CompetitionRecord>);

    #[async_trait]
    impl CheckpointStore for ReadOnlyStore {
        async fn load(&self) -> Result<Vec<CompetitionRecord>> {
            Ok(self.0.clone())
        }

        async fn save(&self, _records: &[CompetitionRecord]) -> Result<()> {
            Err(AppError::persistence("disk full"))
        }

        fn location(&self) -> String {
            "read-only".to_string()
        }
    }

    #[derive(Default, Clone)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<SlackMessage>>>,
        reject_containing: Option<&'static str>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn deliver(&self, message: &SlackMessage) -> Result<()> {
            if let Some(needle) = self.reject_containing {
                if message.text.contains(needle) {
                    return Err(AppError::delivery("invalid_blocks"));
                }
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    impl RecordingSink {
        fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
        }
    }

    fn record(url: &str, title: &str) -> CompetitionRecord {
        CompetitionRecord::new(Platform::Dacon, url, title)
    }

    fn source(records: Vec<CompetitionRecord>) -> Box<dyn CompetitionSource> {
        Box::new(StaticSource {
            platform: Platform::Dacon,
            records,
        })
    }

    fn orchestrator(
        sources: Vec<Box<dyn CompetitionSource>>,
        store: Box<dyn CheckpointStore>,
        sink: &RecordingSink,
    ) -> Orchestrator {
        Orchestrator::new(sources, store, Notifier::new(Box::new(sink.clone())))
    }

    #[tokio::test]
    async fn test_only_new_identity_is_announced() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path().join("competition_data.json"));
        store.save(&[record("https://x/a", "A")]).await.unwrap();

        let sink = RecordingSink::default();
        let orch = orchestrator(
            vec![source(vec![record("https://x/a", "A"), record("https://x/b", "B")])],
            Box::new(store.clone()),
            &sink,
        );

        let report = orch.run_cycle().await;

        assert_eq!(sink.texts(), vec!["New competition: B"]);
        assert_eq!(report.new, 1);
        assert!(report.persisted);

        let saved: Vec<_> = store.load().await.unwrap().into_iter().map(|r| r.identity).collect();
        assert_eq!(saved, vec!["https://x/a", "https://x/b"]);
    }

    #[tokio::test]
    async fn test_all_sources_down() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path().join("competition_data.json"));
        store.save(&[record("https://x/a", "A")]).await.unwrap();

        let sink = RecordingSink::default();
        let orch = orchestrator(
            vec![
                Box::new(DownSource(Platform::Kaggle)),
                Box::new(DownSource(Platform::Dacon)),
            ],
            Box::new(store.clone()),
            &sink,
        );

        let report = orch.run_cycle().await;

        assert_eq!(sink.texts(), vec![NOTHING_NEW_TEXT]);
        assert_eq!(report.fetched, 0);
        assert!(report.persisted);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path().join("competition_data.json"));

        let sink = RecordingSink::default();
        let orch = orchestrator(
            vec![source(vec![record("https://x/a", "A"), record("https://x/b", "B")])],
            Box::new(store),
            &sink,
        );

        let first = orch.run_cycle().await;
        let second = orch.run_cycle().await;

        assert_eq!(first.new, 2);
        assert_eq!(second.new, 0);
        assert_eq!(
            sink.texts(),
            vec!["New competition: A", "New competition: B", NOTHING_NEW_TEXT]
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_the_rest() {
        let tmp = TempDir::new().unwrap();
        let sink = RecordingSink {
            reject_containing: Some("Broken"),
            ..RecordingSink::default()
        };
        let orch = orchestrator(
            vec![source(vec![
                record("https://x/1", "Broken"),
                record("https://x/2", "Fine"),
            ])],
            Box::new(LocalStorage::new(tmp.path().join("c.json"))),
            &sink,
        );

        let report = orch.run_cycle().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(sink.texts(), vec!["New competition: Fine"]);
    }

    #[tokio::test]
    async fn test_save_failure_still_notifies() {
        let sink = RecordingSink::default();
        let orch = orchestrator(
            vec![source(vec![record("https://x/a", "A"), record("https://x/b", "B")])],
            Box::new(ReadOnlyStore(vec![record("https://x/a", "A")])),
            &sink,
        );

        let report = orch.run_cycle().await;

        assert!(!report.persisted);
        assert_eq!(sink.texts(), vec!["New competition: B"]);
    }

    #[tokio::test]
    async fn test_unreadable_checkpoint_treats_all_as_new() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("competition_data.json");
        std::fs::write(&path, "not json at all").unwrap();

        let sink = RecordingSink::default();
        let orch = orchestrator(
            vec![source(vec![record("https://x/a", "A")])],
            Box::new(LocalStorage::new(&path)),
            &sink,
        );

        let report = orch.run_cycle().await;

        assert_eq!(report.new, 1);
        assert!(report.persisted);
        assert_eq!(LocalStorage::new(&path).load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_checkpoint_entries_are_pruned_before_diff() {
        let now = Utc::now();
        let expired = CompetitionRecord {
            deadline: Some(now - Duration::hours(1)),
            ..CompetitionRecord::new(Platform::Kaggle, "https://x/k", "Reopened")
        };
        let reopened = CompetitionRecord {
            deadline: Some(now + Duration::days(7)),
            ..expired.clone()
        };

        let sink = RecordingSink::default();
        let orch = orchestrator(
            vec![Box::new(StaticSource {
                platform: Platform::Kaggle,
                records: vec![reopened],
            })],
            Box::new(ReadOnlyStore(vec![expired])),
            &sink,
        );

        let report = orch.run_cycle().await;

        assert_eq!(report.previous, 0);
        assert_eq!(sink.texts(), vec!["New competition: Reopened"]);
    }
}
