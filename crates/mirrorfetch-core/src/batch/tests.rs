use super::*;
use crate::error::FallbackError;
use crate::fetch::{ByteSink, FetchError};
use crate::mirror::MirrorRule;
use crate::settings::{PreferencePolicy, StaticSettings};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted fetcher: fails or holds selected tasks and records every call.
#[derive(Default)]
struct FakeFetcher {
    always_fail: HashSet<PathBuf>,
    fail_once: Mutex<HashSet<PathBuf>>,
    fail_url_prefix: Option<String>,
    /// Tasks whose transfer only ends through cancellation.
    hold: HashSet<PathBuf>,
    /// Tasks whose fetch reports cancellation on its own.
    cancels_itself: HashSet<PathBuf>,
    /// Tasks every source answers with 404.
    missing: HashSet<PathBuf>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    succeeded: Mutex<HashSet<PathBuf>>,
    failed: Mutex<HashSet<PathBuf>>,
}

impl FakeFetcher {
    async fn attempt(
        &self,
        url: &str,
        task: &DownloadTask,
        on_bytes: &ByteSink,
        cancel: &CancellationToken,
    ) -> Result<u64, FetchError> {
        let wait = if self.hold.contains(&task.target_path) {
            Duration::from_secs(3600)
        } else {
            self.delay
        };
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
        if self.cancels_itself.contains(&task.target_path) {
            return Err(FetchError::Cancelled);
        }
        if self.missing.contains(&task.target_path) {
            return Err(FetchError::NotFound {
                url: url.to_string(),
                code: 404,
            });
        }
        on_bytes(10);
        let fail = self.always_fail.contains(&task.target_path)
            || self
                .fail_url_prefix
                .as_deref()
                .is_some_and(|p| url.starts_with(p))
            || self.fail_once.lock().unwrap().remove(&task.target_path);
        if fail {
            return Err(FetchError::Http {
                url: url.to_string(),
                code: 503,
            });
        }
        Ok(10)
    }
}

#[async_trait]
impl VerifiedFetch for FakeFetcher {
    async fn fetch(
        &self,
        url: &str,
        task: &DownloadTask,
        on_bytes: ByteSink,
        cancel: CancellationToken,
    ) -> Result<u64, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let result = self.attempt(url, task, &on_bytes, &cancel).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        match &result {
            Ok(_) => {
                self.succeeded
                    .lock()
                    .unwrap()
                    .insert(task.target_path.clone());
            }
            Err(FetchError::Cancelled) => {}
            Err(_) => {
                self.failed.lock().unwrap().insert(task.target_path.clone());
            }
        }
        result
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<ProgressUpdate>>);

impl ProgressSink for RecordingSink {
    fn update(&self, update: ProgressUpdate) {
        self.0.lock().unwrap().push(update);
    }
}

impl RecordingSink {
    fn running(&self) -> Vec<ProgressStats> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                ProgressUpdate::Running(s) => Some(s.clone()),
                ProgressUpdate::Complete { .. } => None,
            })
            .collect()
    }

    fn last(&self) -> Option<ProgressUpdate> {
        self.0.lock().unwrap().last().cloned()
    }
}

fn path(i: usize) -> PathBuf {
    PathBuf::from(format!("/game/objects/file{i}"))
}

fn tasks(n: usize) -> Vec<DownloadTask> {
    (0..n)
        .map(|i| DownloadTask::new(path(i), format!("https://official.example/file{i}")))
        .collect()
}

fn mirror_table(bulk: bool) -> MirrorTable {
    let rule = MirrorRule::new("m", "https://official.example", "https://mirror.example");
    MirrorTable::new(vec![if bulk { rule.bulk() } else { rule }])
}

fn downloader(
    fetcher: &Arc<FakeFetcher>,
    table: MirrorTable,
    policy: PreferencePolicy,
    sink: &Arc<RecordingSink>,
) -> BatchDownloader {
    BatchDownloader::new(
        Arc::clone(fetcher) as Arc<dyn VerifiedFetch>,
        table,
        Arc::new(StaticSettings::new(policy, false)),
    )
    .with_source_delays(SourceDelays::none())
    .with_report_interval(Duration::from_millis(2))
    .with_progress(Arc::clone(sink) as Arc<dyn ProgressSink>)
}

#[tokio::test]
async fn persistent_failures_survive_retry_and_are_reported() {
    let fetcher = Arc::new(FakeFetcher {
        always_fail: [path(2), path(5)].into_iter().collect(),
        delay: Duration::from_millis(3),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let err = d
        .run(tasks(10), 3, &CancellationToken::new())
        .await
        .unwrap_err();
    let failed = match err {
        BatchError::Failed { tasks } => tasks,
        other => panic!("unexpected error: {other}"),
    };
    let failed_paths: Vec<PathBuf> = failed.into_iter().map(|t| t.target_path).collect();
    assert_eq!(failed_paths, vec![path(2), path(5)]);

    assert!(fetcher.max_running.load(Ordering::SeqCst) <= 3);
    assert_eq!(fetcher.calls.lock().unwrap().len(), 12);

    let stats = sink.running();
    let transitions = stats.windows(2).filter(|w| w[0].phase != w[1].phase).count();
    assert_eq!(transitions, 1, "counters reset exactly once");

    let initial: Vec<&ProgressStats> = stats.iter().filter(|s| s.phase == Phase::Initial).collect();
    assert!(initial.windows(2).all(|w| w[0].completed <= w[1].completed));
    assert_eq!(initial.last().unwrap().completed, 8);
    assert!(initial.iter().all(|s| s.total == 10));

    let retry: Vec<&ProgressStats> = stats.iter().filter(|s| s.phase == Phase::Retry).collect();
    assert_eq!(retry[0].completed, 0);
    assert_eq!(retry[0].bytes_done, 0);
    assert!(retry.iter().all(|s| s.total == 2 && s.completed <= 2));
    assert!(!matches!(sink.last(), Some(ProgressUpdate::Complete { .. })));
}

#[tokio::test]
async fn transient_failures_recover_in_retry_pass() {
    let fetcher = Arc::new(FakeFetcher {
        fail_once: Mutex::new([path(1), path(4)].into_iter().collect()),
        delay: Duration::from_millis(1),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let summary = d.run(tasks(10), 4, &CancellationToken::new()).await.unwrap();
    assert_eq!(summary.files, 10);
    assert_eq!(summary.retried, 2);
    assert_eq!(summary.bytes, 100);
    assert_eq!(
        sink.last(),
        Some(ProgressUpdate::Complete {
            files: 10,
            bytes: 100
        })
    );
}

#[tokio::test]
async fn official_failure_falls_back_to_mirror() {
    let fetcher = Arc::new(FakeFetcher {
        fail_url_prefix: Some("https://official.example".to_string()),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, mirror_table(false), PreferencePolicy::OfficialFirst, &sink);

    d.run(tasks(1), 1, &CancellationToken::new()).await.unwrap();
    assert_eq!(
        *fetcher.calls.lock().unwrap(),
        vec![
            "https://official.example/file0".to_string(),
            "https://mirror.example/file0".to_string(),
        ]
    );
}

#[tokio::test]
async fn mirror_first_tries_mirror_before_official() {
    let fetcher = Arc::new(FakeFetcher::default());
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, mirror_table(false), PreferencePolicy::MirrorFirst, &sink);

    d.run(tasks(1), 1, &CancellationToken::new()).await.unwrap();
    assert_eq!(
        *fetcher.calls.lock().unwrap(),
        vec!["https://mirror.example/file0".to_string()]
    );
}

#[tokio::test]
async fn bulk_content_ignores_mirror_first() {
    let fetcher = Arc::new(FakeFetcher::default());
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, mirror_table(true), PreferencePolicy::MirrorFirst, &sink);

    d.run(tasks(1), 1, &CancellationToken::new()).await.unwrap();
    assert_eq!(
        *fetcher.calls.lock().unwrap(),
        vec!["https://official.example/file0".to_string()]
    );
}

#[tokio::test]
async fn cancellation_mid_flight_records_no_failures() {
    let fetcher = Arc::new(FakeFetcher {
        hold: [path(3), path(4), path(5)].into_iter().collect(),
        delay: Duration::from_millis(1),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = d.run(tasks(6), 6, &cancel).await.unwrap_err();
    assert!(matches!(err, BatchError::Cancelled), "{err}");

    let succeeded = fetcher.succeeded.lock().unwrap().clone();
    let failed = fetcher.failed.lock().unwrap().clone();
    assert!(failed.is_empty());
    assert!(succeeded.is_disjoint(&failed));
    for held in [path(3), path(4), path(5)] {
        assert!(!succeeded.contains(&held));
    }
    assert!(!matches!(sink.last(), Some(ProgressUpdate::Complete { .. })));
}

#[tokio::test]
async fn unit_cancelling_itself_cancels_the_batch() {
    let fetcher = Arc::new(FakeFetcher {
        cancels_itself: [path(1)].into_iter().collect(),
        delay: Duration::from_millis(1),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let cancel = CancellationToken::new();
    let err = d.run(tasks(3), 2, &cancel).await.unwrap_err();
    assert!(matches!(err, BatchError::Cancelled), "{err}");
    assert!(!cancel.is_cancelled());
    assert!(!fetcher.succeeded.lock().unwrap().contains(&path(1)));
    assert!(!matches!(sink.last(), Some(ProgressUpdate::Complete { .. })));
}

#[tokio::test]
async fn missing_local_only_task_ends_batch_without_retry() {
    let fetcher = Arc::new(FakeFetcher {
        missing: [path(2)].into_iter().collect(),
        delay: Duration::from_millis(1),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, mirror_table(false), PreferencePolicy::OfficialFirst, &sink);

    let mut batch = tasks(4);
    batch[2] = batch[2].clone().not_downloadable();
    let err = d
        .run(batch, 1, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        BatchError::NotFound { task, source } => {
            assert_eq!(task.target_path, path(2));
            assert!(matches!(source, FallbackError::NoSourceSucceeded { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    let calls = fetcher.calls.lock().unwrap();
    let file2: Vec<&String> = calls.iter().filter(|u| u.ends_with("/file2")).collect();
    assert_eq!(file2.len(), 2, "official and mirror once each: {file2:?}");
    assert!(!matches!(sink.last(), Some(ProgressUpdate::Complete { .. })));
}

#[tokio::test]
async fn missing_downloadable_task_is_an_ordinary_failure() {
    let fetcher = Arc::new(FakeFetcher {
        missing: [path(0)].into_iter().collect(),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let err = d
        .run(tasks(2), 2, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        BatchError::Failed { tasks } => assert_eq!(tasks[0].target_path, path(0)),
        other => panic!("unexpected error: {other}"),
    }
    // Once per phase.
    assert_eq!(fetcher.calls.lock().unwrap().iter().filter(|u| u.ends_with("/file0")).count(), 2);
}

#[tokio::test]
async fn already_cancelled_batch_never_fetches() {
    let fetcher = Arc::new(FakeFetcher::default());
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = d.run(tasks(4), 2, &cancel).await.unwrap_err();
    assert!(matches!(err, BatchError::Cancelled));
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_limit_runs_one_at_a_time() {
    let fetcher = Arc::new(FakeFetcher {
        delay: Duration::from_millis(2),
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let summary = d.run(tasks(5), 0, &CancellationToken::new()).await.unwrap();
    assert_eq!(summary.files, 5);
    assert_eq!(fetcher.max_running.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_batch_completes_immediately() {
    let fetcher = Arc::new(FakeFetcher::default());
    let sink = Arc::new(RecordingSink::default());
    let d = downloader(&fetcher, MirrorTable::empty(), PreferencePolicy::OfficialFirst, &sink);

    let summary = d
        .run(Vec::new(), DEFAULT_CONCURRENCY, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.files, 0);
    assert_eq!(summary.retried, 0);
    assert_eq!(sink.last(), Some(ProgressUpdate::Complete { files: 0, bytes: 0 }));
}
