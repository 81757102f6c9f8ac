#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tonegate::TransportError;
use tonegate::admission::{AdmissionController, AdmissionPolicy};
use tonegate::clock::ManualClock;
use tonegate::identity::ClientIdentity;
use tonegate::llm::{AiBackend, AudioClip, BackendFuture};
use tonegate::session::{Orchestrator, OrchestratorSettings};
use tonegate::store::{MemoryStateStore, StateStore};

pub const NUMBERED_REPORT: &str = "\
**1. Overall Sentiment:** Positive
*Confidence Level:* 82%

**2. Executive Summary:**
The writer is enthusiastic about the launch and wants quick alignment.

**3. Emotional Profile:**
- Joy (High): \"so excited to share\"
- Anticipation (Moderate): \"can't wait\"

**4. Mindset & Bias:**
Optimism bias about the timeline.

**5. Style & Delivery:**
Informal, direct call to action.

**6. Strategy & Fit:**
Builds rapport before the ask.

**7. Language Notes:**
\"Over the moon\" is an idiom for very happy.

**8. Reliability:**
Few hedges; claims are stated with certainty.
";

/// One scripted `complete` reply, optionally delayed.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<String, TransportError>,
}

impl Reply {
    pub fn ok(text: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(text.to_string()),
        }
    }

    pub fn err(error: TransportError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Backend that replays scripted replies in order and records each user
/// message it was sent.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            messages: Mutex::default(),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl AiBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(&'a self, _system: &'a str, message: &'a str) -> BackendFuture<'a> {
        self.messages.lock().unwrap().push(message.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::ok("Generated text."));
        Box::pin(async move {
            tokio::time::sleep(reply.delay).await;
            reply.result
        })
    }

    fn transcribe<'a>(&'a self, _clip: &'a AudioClip) -> BackendFuture<'a> {
        Box::pin(async { Ok("transcribed speech".to_string()) })
    }
}

pub fn throttled() -> TransportError {
    TransportError::Throttled {
        backend: "scripted".into(),
        retry_after_secs: None,
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
    ))
}

pub fn admission(store: Arc<dyn StateStore>, clock: Arc<ManualClock>) -> Arc<AdmissionController> {
    Arc::new(AdmissionController::new(
        ClientIdentity::from("integration-client"),
        AdmissionPolicy::default(),
        store,
        clock,
    ))
}

pub fn orchestrator(backend: Arc<ScriptedBackend>) -> (Orchestrator, Arc<ManualClock>) {
    let clock = manual_clock();
    let admission = admission(Arc::new(MemoryStateStore::new()), clock.clone());
    let settings = OrchestratorSettings {
        queue_spacing: Duration::from_secs(1),
        ..OrchestratorSettings::default()
    };
    (Orchestrator::new(admission, backend, settings), clock)
}
