//! Test doubles for the sync seams.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use nodesync::db::StoreError;
use nodesync::node::{Node, NodePath, NodeStatusSink, Yml, YmlStatus};
use nodesync::sync::{CloneError, CloneProgress, ProgressSender, RepositorySource};

type Hook = Box<dyn Fn() + Send + Sync>;

/// Emits a fixed list of events, runs an optional hook, then returns the
/// scripted result. With `wait_for_stop` it blocks until cancelled and then
/// emits `events_after_stop`, like a git process still flushing stderr.
pub struct ScriptedSource {
    events: Vec<CloneProgress>,
    events_after_stop: Vec<CloneProgress>,
    result: Mutex<Option<Result<String, CloneError>>>,
    before_return: Option<Hook>,
    wait_for_stop: bool,
    pub calls: Mutex<u32>,
}

impl ScriptedSource {
    pub fn succeeding(content: &str) -> Self {
        Self::new(Ok(content.to_string()))
    }

    pub fn failing(error: CloneError) -> Self {
        Self::new(Err(error))
    }

    /// Never finishes on its own; returns `Cancelled` once stopped.
    pub fn blocking() -> Self {
        let mut source = Self::new(Err(CloneError::Cancelled));
        source.wait_for_stop = true;
        source
    }

    fn new(result: Result<String, CloneError>) -> Self {
        Self {
            events: Vec::new(),
            events_after_stop: Vec::new(),
            result: Mutex::new(Some(result)),
            before_return: None,
            wait_for_stop: false,
            calls: Mutex::new(0),
        }
    }

    pub fn with_events(mut self, events: Vec<CloneProgress>) -> Self {
        self.events = events;
        self
    }

    pub fn with_events_after_stop(mut self, events: Vec<CloneProgress>) -> Self {
        self.events_after_stop = events;
        self
    }

    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_return = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl RepositorySource for ScriptedSource {
    async fn clone_file(
        &self,
        _node: &Node,
        _file_name: &str,
        progress: ProgressSender,
        stop: CancellationToken,
    ) -> Result<String, CloneError> {
        *self.calls.lock().unwrap() += 1;

        for event in &self.events {
            progress.send(event.clone());
        }

        if self.wait_for_stop {
            stop.cancelled().await;
            for event in &self.events_after_stop {
                progress.send(event.clone());
            }
            return Err(CloneError::Cancelled);
        }

        // Let the task's event loop run before returning.
        tokio::time::sleep(Duration::from_millis(5)).await;

        if let Some(hook) = &self.before_return {
            hook();
        }

        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(CloneError::Git("called twice".to_string())))
    }
}

/// Wraps a status sink and records every write.
pub struct RecordingStatusSink<S> {
    inner: Arc<S>,
    pub writes: Mutex<Vec<(YmlStatus, Option<String>)>>,
}

impl<S: NodeStatusSink> RecordingStatusSink<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn statuses(&self) -> Vec<YmlStatus> {
        self.writes.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }
}

impl<S: NodeStatusSink> NodeStatusSink for RecordingStatusSink<S> {
    fn yml_status(&self, path: &NodePath) -> Result<YmlStatus, StoreError> {
        self.inner.yml_status(path)
    }

    fn update_yml_status(
        &self,
        path: &NodePath,
        status: YmlStatus,
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.writes
            .lock()
            .unwrap()
            .push((status, message.map(str::to_string)));
        self.inner.update_yml_status(path, status, message)
    }
}

/// Collects callback invocations.
#[derive(Clone, Default)]
pub struct CallbackProbe {
    pub calls: Arc<Mutex<Vec<Yml>>>,
}

impl CallbackProbe {
    pub fn callback(&self) -> nodesync::sync::SyncCallback {
        let calls = Arc::clone(&self.calls);
        Box::new(move |yml| calls.lock().unwrap().push(yml))
    }

    pub fn calls(&self) -> Vec<Yml> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn tick(current: u64, total: u64) -> CloneProgress {
    CloneProgress::Progress {
        task: "Receiving objects".to_string(),
        total,
        current,
    }
}
