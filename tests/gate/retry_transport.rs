use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tonegate::admission::RequestKind;
use tonegate::llm::{AiBackend, RetryPolicy, RetryingTransport};
use tonegate::session::{Orchestrator, OrchestratorSettings, Phase};
use tonegate::store::MemoryStateStore;
use tonegate::{GateError, TransportError};

use super::backend::{NUMBERED_REPORT, Reply, ScriptedBackend, admission, manual_clock, throttled};

#[tokio::test(start_paused = true)]
async fn throttle_backoff_doubles_between_attempts() {
    let backend = ScriptedBackend::new(vec![
        Reply::err(throttled()),
        Reply::err(throttled()),
        Reply::ok("third time lucky"),
    ]);
    let transport = RetryingTransport::new(backend.clone(), RetryPolicy::default());

    let started = Instant::now();
    let text = transport.complete("system", "hello").await.unwrap();
    assert_eq!(text, "third time lucky");
    // 5s after the first throttle, 10s after the second.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
    assert_eq!(backend.messages().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_and_is_retried() {
    let backend = ScriptedBackend::new(vec![
        Reply::ok("too late").after(Duration::from_secs(45)),
        Reply::ok("on time"),
    ]);
    let transport = RetryingTransport::new(backend, RetryPolicy::default());
    assert_eq!(transport.complete("system", "hello").await.unwrap(), "on time");
}

#[tokio::test(start_paused = true)]
async fn exhausted_throttling_escalates_the_text_cooldown() {
    let backend = ScriptedBackend::new(vec![
        Reply::err(throttled()),
        Reply::err(throttled()),
        Reply::err(throttled()),
    ]);
    let transport = Arc::new(RetryingTransport::new(backend, RetryPolicy::default()));
    let clock = manual_clock();
    let admission = admission(Arc::new(MemoryStateStore::new()), clock);
    let orchestrator = Orchestrator::new(admission, transport, OrchestratorSettings::default());

    let err = orchestrator
        .run_analysis("Please review the attached plan.")
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::Transport(TransportError::Exhausted { attempts: 3, .. })
    ));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.notice.unwrap().starts_with("Too many requests"));
    let cooldown = orchestrator.admission().cooldown(RequestKind::Text).unwrap();
    assert!((20..=30).contains(&cooldown.seconds_remaining));
}

#[tokio::test(start_paused = true)]
async fn successful_retry_leaves_no_notice() {
    let backend = ScriptedBackend::new(vec![Reply::err(throttled()), Reply::ok(NUMBERED_REPORT)]);
    let transport = Arc::new(RetryingTransport::new(backend, RetryPolicy::default()));
    let admission = admission(Arc::new(MemoryStateStore::new()), manual_clock());
    let orchestrator = Orchestrator::new(admission, transport, OrchestratorSettings::default());

    orchestrator.run_analysis("Great news!").unwrap().wait().await.unwrap();
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Extracted);
    assert!(snapshot.notice.is_none());
    // Only the base cooldown from admission, no throttle escalation.
    let cooldown = orchestrator.admission().cooldown(RequestKind::Text).unwrap();
    assert!(cooldown.seconds_remaining <= 5);
}
