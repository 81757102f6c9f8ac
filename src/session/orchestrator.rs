//! Drives base analyses and tone variants through admission, the request
//! queue and the transport, and publishes a [`SessionSnapshot`] after every
//! transition.
//!
//! Results of tasks that belong to a superseded base analysis are dropped:
//! every base analysis bumps an epoch and each queued task carries the epoch
//! it was created under.

use super::email::{EmailDraft, check_proofread_length, word_count};
use super::prompts;
use super::safety::{ContentFilter, screen_input};
use super::state::{Phase, SessionSnapshot, ToneVariantCounter};
use super::{InteractionMode, Tone};
use crate::admission::{AdmissionController, QuotaStatus, RequestKind};
use crate::error::{GateError, Rejection, TransportError};
use crate::extraction::StructuredReport;
use crate::identity::ClientIdentity;
use crate::llm::{AiBackend, AudioClip};
use crate::queue::RequestQueue;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub max_input_words: usize,
    pub max_variants: u32,
    pub max_audio_bytes: usize,
    /// Gap the queue keeps between consecutive provider calls.
    pub queue_spacing: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_input_words: 500,
            max_variants: ToneVariantCounter::DEFAULT_MAX,
            max_audio_bytes: 10 * 1024 * 1024,
            queue_spacing: Duration::from_secs(1),
        }
    }
}

/// Handle to queued work. Resolves when the work, including any chained
/// default variant, has finished.
#[derive(Debug)]
pub struct Ticket<T = ()> {
    pub task_id: Uuid,
    done: oneshot::Receiver<Result<T, GateError>>,
}

impl<T> Ticket<T> {
    pub async fn wait(self) -> Result<T, GateError> {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("queued task {} was abandoned", self.task_id).into()),
        }
    }
}

type Completion<T> = oneshot::Sender<Result<T, GateError>>;

#[derive(Debug, Default)]
struct SessionState {
    phase: Phase,
    mode: InteractionMode,
    epoch: u64,
    original: Option<Arc<str>>,
    report: Option<Arc<StructuredReport>>,
    variant: Option<EmailDraft>,
    active_tone: Option<Tone>,
    variants_in_flight: usize,
    counter: ToneVariantCounter,
    notice: Option<String>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            mode: self.mode,
            report: self.report.clone(),
            variant: self.variant.clone(),
            active_tone: self.active_tone,
            variants_remaining: self.counter.remaining(),
            notice: self.notice.clone(),
        }
    }

    fn finish_variant(&mut self) {
        self.variants_in_flight = self.variants_in_flight.saturating_sub(1);
        if self.variants_in_flight == 0 && self.phase == Phase::GeneratingVariant {
            self.phase = Phase::Extracted;
        }
    }
}

/// Everything a queued task needs once it runs.
struct Shared {
    admission: Arc<AdmissionController>,
    backend: Arc<dyn AiBackend>,
    filter: ContentFilter,
    queue: RequestQueue,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
}

/// What a variant task needs to know about the request that created it.
#[derive(Debug, Clone, Copy)]
struct VariantJob {
    epoch: u64,
    tone: Tone,
    /// Tone to restore if generation fails.
    previous_tone: Option<Tone>,
    /// The automatic first variant does not use a counter slot.
    counted: bool,
}

pub struct Orchestrator {
    shared: Arc<Shared>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Must be called inside a tokio runtime; the queue worker starts here.
    pub fn new(
        admission: Arc<AdmissionController>,
        backend: Arc<dyn AiBackend>,
        settings: OrchestratorSettings,
    ) -> Self {
        let state = SessionState {
            counter: ToneVariantCounter::new(settings.max_variants),
            ..SessionState::default()
        };
        let (snapshots, _) = watch::channel(state.snapshot());
        let shared = Arc::new(Shared {
            admission,
            backend,
            filter: ContentFilter,
            queue: RequestQueue::new(settings.queue_spacing),
            state: Mutex::new(state),
            snapshots,
        });
        Self { shared, settings }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn mode(&self) -> InteractionMode {
        self.shared.lock().mode
    }

    pub fn set_mode(&self, mode: InteractionMode) {
        let mut state = self.shared.lock();
        if state.mode != mode {
            tracing::debug!(from = %state.mode, to = %mode, "Interaction mode changed");
            state.mode = mode;
            self.shared.publish(&state);
        }
    }

    pub fn remaining_quota(&self, client: &ClientIdentity) -> Result<QuotaStatus, GateError> {
        self.shared.admission.remaining_quota(client)
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.shared.admission
    }

    /// Tasks queued or running.
    pub fn pending(&self) -> usize {
        self.shared.queue.pending()
    }

    /// Validate, admit and queue a base analysis of `text` in the current mode.
    ///
    /// Starting an analysis discards the retained report and resets the tone
    /// counter. In draft and respond modes the mode's default tone variant
    /// is generated automatically and does not count against the cap.
    pub fn run_analysis(&self, text: &str) -> Result<Ticket, GateError> {
        let text = text.trim();
        if let Err(rejection) = self.validate_text(text) {
            return Err(self.shared.reject(rejection.into()));
        }
        self.shared
            .admission
            .admit(RequestKind::Text)
            .map_err(|err| self.shared.reject(err))?;

        let (epoch, mode) = {
            let mut state = self.shared.lock();
            state.epoch += 1;
            state.counter.reset();
            state.original = Some(Arc::from(text));
            state.report = None;
            state.variant = None;
            state.active_tone = None;
            state.variants_in_flight = 0;
            state.notice = None;
            state.phase = Phase::Submitting;
            self.shared.publish(&state);
            (state.epoch, state.mode)
        };

        let (tx, done) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let text = text.to_string();
        let task_id = self.shared.queue.enqueue("analysis", async move {
            shared.complete_analysis(epoch, mode, text, tx).await;
            Ok(())
        });
        tracing::info!(%task_id, epoch, %mode, "Base analysis queued");
        Ok(Ticket { task_id, done })
    }

    /// Queue a tone variant of the retained analysis.
    ///
    /// Returns `Ok(None)` when `tone` is already the active tone.
    pub fn run_variant(&self, tone: Tone) -> Result<Option<Ticket>, GateError> {
        let job = {
            let mut state = self.shared.lock();
            if !state.phase.has_report() || state.report.is_none() {
                return Err(self.shared.reject_locked(&mut state, Rejection::NotReady.into()));
            }
            if !state.mode.supports(tone) {
                let rejection = Rejection::ToneUnavailable {
                    tone,
                    mode: state.mode,
                };
                return Err(self.shared.reject_locked(&mut state, rejection.into()));
            }
            if state.active_tone == Some(tone) {
                tracing::debug!(%tone, "Tone already active; nothing to do");
                return Ok(None);
            }
            if let Err(rejection) = state.counter.try_reserve() {
                return Err(self.shared.reject_locked(&mut state, rejection.into()));
            }
            self.shared.begin_variant(&mut state, tone, true)
        };

        let (tx, done) = oneshot::channel();
        let task_id = self.shared.queue_variant(job, tx);
        Ok(Some(Ticket { task_id, done }))
    }

    /// Admit and queue a transcription of `clip`.
    pub fn submit_audio(&self, clip: AudioClip) -> Result<Ticket<String>, GateError> {
        if clip.is_empty() {
            return Err(self
                .shared
                .reject(Rejection::InputRejected("audio clip is empty".into()).into()));
        }
        if clip.len() > self.settings.max_audio_bytes {
            let rejection = Rejection::InputRejected(format!(
                "audio clip is {} bytes; the limit is {} bytes",
                clip.len(),
                self.settings.max_audio_bytes
            ));
            return Err(self.shared.reject(rejection.into()));
        }
        self.shared
            .admission
            .admit(RequestKind::Audio)
            .map_err(|err| self.shared.reject(err))?;

        let bytes = clip.len();
        let (tx, done) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task_id = self.shared.queue.enqueue("transcription", async move {
            let result = shared.transcribe(&clip).await;
            let _ = tx.send(result);
            Ok(())
        });
        tracing::info!(%task_id, bytes, "Transcription queued");
        Ok(Ticket { task_id, done })
    }

    fn validate_text(&self, text: &str) -> Result<(), Rejection> {
        if text.is_empty() {
            return Err(Rejection::InputRejected("please enter some text".into()));
        }
        let words = word_count(text);
        if words > self.settings.max_input_words {
            return Err(Rejection::InputRejected(format!(
                "text has {words} words; the limit is {}",
                self.settings.max_input_words
            )));
        }
        screen_input(text).map_err(Rejection::InputRejected)
    }
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Record a synchronous rejection as the visible notice and hand it back.
    fn reject(&self, err: GateError) -> GateError {
        let mut state = self.lock();
        self.reject_locked(&mut state, err)
    }

    fn reject_locked(&self, state: &mut SessionState, err: GateError) -> GateError {
        state.notice = Some(notice_for(&err));
        self.publish(state);
        err
    }

    fn begin_variant(&self, state: &mut SessionState, tone: Tone, counted: bool) -> VariantJob {
        let job = VariantJob {
            epoch: state.epoch,
            tone,
            previous_tone: state.active_tone,
            counted,
        };
        state.active_tone = Some(tone);
        state.variants_in_flight += 1;
        state.phase = Phase::GeneratingVariant;
        state.notice = None;
        self.publish(state);
        job
    }

    fn queue_variant(self: &Arc<Self>, job: VariantJob, tx: Completion<()>) -> Uuid {
        let shared = Arc::clone(self);
        let task_id = self.queue.enqueue("variant", async move {
            shared.complete_variant(job, tx).await;
            Ok(())
        });
        tracing::info!(%task_id, tone = %job.tone, counted = job.counted, "Tone variant queued");
        task_id
    }

    async fn complete_analysis(
        self: Arc<Self>,
        epoch: u64,
        mode: InteractionMode,
        text: String,
        tx: Completion<()>,
    ) {
        let prompt = prompts::analysis(&text);
        let result = self.backend.complete(&prompt.system, &prompt.user).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::debug!(epoch, current = state.epoch, "Dropping superseded analysis result");
            let _ = tx.send(Ok(()));
            return;
        }

        match result {
            Ok(raw) => {
                let report = StructuredReport::extract(&raw);
                if report.is_degraded() {
                    tracing::debug!(
                        defaulted = report.defaulted.len(),
                        "Analysis response missing sections; defaults used"
                    );
                }
                state.report = Some(Arc::new(report));
                state.phase = Phase::Extracted;
                self.publish(&state);

                match mode.default_tone() {
                    Some(tone) => {
                        let job = self.begin_variant(&mut state, tone, false);
                        drop(state);
                        self.queue_variant(job, tx);
                    }
                    None => {
                        let _ = tx.send(Ok(()));
                    }
                }
            }
            Err(err) => {
                drop(state);
                let notice = self.transport_notice(&err);
                let mut state = self.lock();
                if state.epoch == epoch {
                    state.phase = Phase::Idle;
                    state.original = None;
                    state.notice = Some(notice);
                    self.publish(&state);
                }
                let _ = tx.send(Err(err.into()));
            }
        }
    }

    async fn complete_variant(self: Arc<Self>, job: VariantJob, tx: Completion<()>) {
        let inputs = {
            let state = self.lock();
            if state.epoch == job.epoch {
                state
                    .original
                    .clone()
                    .zip(state.report.clone())
                    .map(|(original, report)| (state.mode, original, report))
            } else {
                None
            }
        };
        let Some((mode, original, report)) = inputs else {
            tracing::debug!(tone = %job.tone, "Variant belongs to a superseded analysis; skipped");
            let _ = tx.send(Ok(()));
            return;
        };

        let prompt = prompts::variant(mode, job.tone, &original, &report);
        let result = self.backend.complete(&prompt.system, &prompt.user).await;

        match result {
            Ok(generated) => {
                let generated = generated.trim();
                if job.tone == Tone::Proofread {
                    check_proofread_length(&original, generated);
                }
                let shown = self.filter.check(generated).into_display_text();
                let draft = EmailDraft::from_generated(job.tone, &shown);

                let mut state = self.lock();
                if state.epoch == job.epoch {
                    state.variant = Some(draft);
                    state.finish_variant();
                    self.publish(&state);
                }
                let _ = tx.send(Ok(()));
            }
            Err(err) => {
                let notice = self.transport_notice(&err);
                let mut state = self.lock();
                if state.epoch == job.epoch {
                    if job.counted {
                        state.counter.release();
                    }
                    if state.active_tone == Some(job.tone) {
                        state.active_tone = job.previous_tone;
                    }
                    state.finish_variant();
                    state.notice = Some(notice);
                    self.publish(&state);
                }
                let _ = tx.send(Err(err.into()));
            }
        }
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, GateError> {
        match self.backend.transcribe(clip).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(err) => {
                let notice = if err.is_throttled() {
                    self.escalate(RequestKind::Audio)
                } else {
                    tracing::warn!("Transcription failed: {err}");
                    "Audio transcription failed. Please try again.".to_string()
                };
                let mut state = self.lock();
                state.notice = Some(notice);
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    /// Log a failed text call and return the notice to show for it.
    fn transport_notice(&self, err: &TransportError) -> String {
        if err.is_throttled() {
            self.escalate(RequestKind::Text)
        } else {
            tracing::warn!("Provider call failed: {err}");
            GENERIC_FAILURE.to_string()
        }
    }

    fn escalate(&self, kind: RequestKind) -> String {
        match self.admission.on_throttled(kind) {
            Ok(cooldown) => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                cooldown.seconds_remaining
            ),
            Err(e) => {
                tracing::warn!(%kind, "Failed to record throttle cooldown: {e}");
                "Too many requests. Please wait a moment before trying again.".to_string()
            }
        }
    }
}

fn notice_for(err: &GateError) -> String {
    match err {
        GateError::Rejected(rejection) => capitalize(&rejection.to_string()),
        other => {
            tracing::warn!("Request could not be admitted: {other}");
            GENERIC_FAILURE.to_string()
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
