//! Scripted relay and in-memory report sink for stage tests.
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ota_observe::Console;
use ota_relay::{Connection, Connector, RelayConfig, RelayError, Target, WsError};
use serde_json::{Value, json};

use crate::{
    config::CampaignConfig,
    report::{ReportError, ReportSink},
    stage::StageContext,
};

/// One scripted reaction of a fake connection, delivered after `delay`.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Frame(Duration, String),
    Close(Duration),
    Fail(Duration),
    /// Panics inside `recv`, simulating a bug in the worker path.
    Panic(Duration, &'static str),
}

impl Step {
    pub(crate) fn frame(delay: Duration, body: Value) -> Self {
        Step::Frame(delay, body.to_string())
    }

    pub(crate) fn raw(delay: Duration, body: &str) -> Self {
        Step::Frame(delay, body.to_string())
    }

    pub(crate) fn close(delay: Duration) -> Self {
        Step::Close(delay)
    }

    pub(crate) fn fail(delay: Duration) -> Self {
        Step::Fail(delay)
    }

    pub(crate) fn panic(delay: Duration, reason: &'static str) -> Self {
        Step::Panic(delay, reason)
    }
}

type Sent = Arc<Mutex<Vec<(String, Value)>>>;

/// Connector whose connections replay per-uid scripts.
///
/// Each `connect` for a uid consumes the next script queued for it; a connection with no
/// script left (or past its last step) stays silent forever.
#[derive(Default)]
pub(crate) struct FakeConnector {
    scripts: Mutex<HashMap<String, VecDeque<Vec<Step>>>>,
    refused: HashSet<String>,
    targets: Mutex<Vec<Target>>,
    sent: Sent,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, uid: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(uid.to_string())
            .or_default()
            .push_back(steps);
        self
    }

    pub(crate) fn refuse(mut self, uid: &str) -> Self {
        self.refused.insert(uid.to_string());
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn targets(&self) -> Vec<Target> {
        self.targets.lock().unwrap().clone()
    }

    /// Every message sent on any connection, tagged with the connection uid.
    pub(crate) fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self, uid: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|(u, _)| u == uid)
            .map(|(_, v)| v)
            .collect()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, RelayError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());
        if self.refused.contains(&target.uid) {
            return Err(RelayError::Handshake(Box::new(WsError::ConnectionClosed)));
        }
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&target.uid)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        Ok(Box::new(FakeConnection {
            uid: target.uid.clone(),
            steps: steps.into(),
            sent: Arc::clone(&self.sent),
        }))
    }
}

struct FakeConnection {
    uid: String,
    steps: VecDeque<Step>,
    sent: Sent,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send(&mut self, message: &Value) -> Result<(), RelayError> {
        self.sent
            .lock()
            .unwrap()
            .push((self.uid.clone(), message.clone()));
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, RelayError> {
        match self.steps.pop_front() {
            Some(Step::Frame(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(body))
            }
            Some(Step::Close(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(None)
            }
            Some(Step::Fail(delay)) => {
                tokio::time::sleep(delay).await;
                Err(RelayError::Receive(Box::new(WsError::ConnectionClosed)))
            }
            Some(Step::Panic(delay, reason)) => {
                tokio::time::sleep(delay).await;
                panic!("{reason}");
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), RelayError> {
        Ok(())
    }
}

/// Report sink keeping everything in memory.
#[derive(Default)]
pub(crate) struct MemorySink {
    records: Mutex<Vec<(String, Value)>>,
    details: Mutex<Vec<(String, String, String)>>,
}

impl MemorySink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Last record persisted under `name`.
    pub(crate) fn record(&self, name: &str) -> Option<Value> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub(crate) fn details(&self, stage: &str, uid: &str) -> Vec<String> {
        self.details
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, u, _)| s == stage && u == uid)
            .map(|(_, _, line)| line.clone())
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn persist(&self, name: &str, record: &Value) -> Result<(), ReportError> {
        self.records
            .lock()
            .unwrap()
            .push((name.to_string(), record.clone()));
        Ok(())
    }

    fn append_detail(&self, stage: &str, uid: &str, line: &str) -> Result<(), ReportError> {
        self.details
            .lock()
            .unwrap()
            .push((stage.to_string(), uid.to_string(), line.to_string()));
        Ok(())
    }
}

/// Builds a stage context around the fakes; tests keep their own handles for assertions.
pub(crate) fn context(
    connector: &Arc<FakeConnector>,
    sink: &Arc<MemorySink>,
    config: CampaignConfig,
) -> StageContext {
    let connector: Arc<dyn Connector> = connector.clone();
    let sink: Arc<dyn ReportSink> = sink.clone();
    StageContext::new(connector, sink, Console::plain(), config)
}

pub(crate) fn config() -> CampaignConfig {
    CampaignConfig::new(
        RelayConfig::new("wss://relay.test", "admin", "secret"),
        "https://files.test/build.tar",
        "tkn",
    )
}

pub(crate) fn roster_frame(entries: &[(&str, &str)]) -> Value {
    let controllers: Vec<Value> = entries
        .iter()
        .map(|(uid, status)| json!({"uid": uid, "status": status}))
        .collect();
    json!({"action": "get_all_controllers", "controllers": controllers})
}

pub(crate) fn versions_frame(uid: &str) -> Value {
    json!({
        "action": "updater_feedback",
        "feedback_type": "all_software_versions",
        "uid": uid,
        "versions": {"firmware": "1.2.3"}
    })
}

pub(crate) fn progress_frame(uid: &str, percent: u32) -> Value {
    json!({
        "action": "updater_feedback",
        "feedback_type": "update_progress",
        "uid": uid,
        "percent": percent
    })
}

pub(crate) fn error_frame(uid: &str, reason: &str) -> Value {
    json!({
        "action": "updater_feedback",
        "feedback_type": "error",
        "uid": uid,
        "message": reason
    })
}
