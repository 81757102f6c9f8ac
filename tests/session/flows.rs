use std::time::Duration;

use tokio::time::Instant;
use tonegate::admission::RequestKind;
use tonegate::llm::AudioClip;
use tonegate::session::{InteractionMode, Phase, Tone};
use tonegate::{GateError, Rejection};

use super::backend::{NUMBERED_REPORT, Reply, ScriptedBackend, orchestrator};

#[tokio::test(start_paused = true)]
async fn draft_mode_proofreads_automatically_after_spacing() {
    let backend = ScriptedBackend::new(vec![
        Reply::ok(NUMBERED_REPORT),
        Reply::ok("I'm so excited to share the launch plan."),
    ]);
    let (orchestrator, _) = orchestrator(backend.clone());
    orchestrator.set_mode(InteractionMode::Draft);

    let started = Instant::now();
    orchestrator
        .run_analysis("im so excited to share teh launch plan")
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));

    let messages = backend.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("Proofread the following EXACTLY"));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Extracted);
    assert_eq!(snapshot.active_tone, Some(Tone::Proofread));
    assert_eq!(snapshot.variants_remaining, 5);
    assert_eq!(
        snapshot.variant.unwrap().body,
        "I'm so excited to share the launch plan."
    );
}

#[tokio::test(start_paused = true)]
async fn respond_mode_embeds_the_report_in_the_reply_prompt() {
    let backend = ScriptedBackend::new(vec![
        Reply::ok(NUMBERED_REPORT),
        Reply::ok("Suggested Subject: Re: Launch\n\nHi,\nThanks for the update.\nYOUR NAME HERE"),
    ]);
    let (orchestrator, _) = orchestrator(backend.clone());
    orchestrator.set_mode(InteractionMode::Respond);
    orchestrator
        .run_analysis("We launch Monday, can't wait!")
        .unwrap()
        .wait()
        .await
        .unwrap();

    let reply_prompt = &backend.messages()[1];
    assert!(reply_prompt.contains("Overall Sentiment: Positive"));
    assert!(reply_prompt.contains("Confidence Level: 82%"));
    assert!(reply_prompt.contains("Optimism bias"));

    let draft = orchestrator.snapshot().variant.unwrap();
    assert_eq!(draft.tone, Tone::Professional);
    assert_eq!(draft.subject.as_deref(), Some("Re: Launch"));
    assert!(draft.body.ends_with("YOUR NAME HERE"));
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_published_on_transitions() {
    let backend = ScriptedBackend::new(vec![Reply::ok(NUMBERED_REPORT)]);
    let (orchestrator, _) = orchestrator(backend);
    let mut updates = orchestrator.subscribe();

    let ticket = orchestrator.run_analysis("Hello team").unwrap();
    assert_eq!(updates.borrow_and_update().phase, Phase::Submitting);

    ticket.wait().await.unwrap();
    assert!(updates.has_changed().unwrap());
    let latest = updates.borrow_and_update().clone();
    assert_eq!(latest.phase, Phase::Extracted);
    assert_eq!(latest.report.unwrap().confidence, 82);
}

#[tokio::test(start_paused = true)]
async fn variant_of_a_superseded_analysis_is_dropped() {
    let backend = ScriptedBackend::new(vec![
        Reply::ok(NUMBERED_REPORT),
        Reply::ok(NUMBERED_REPORT),
    ]);
    let (orchestrator, clock) = orchestrator(backend.clone());
    orchestrator.run_analysis("first").unwrap().wait().await.unwrap();

    let stale = orchestrator.run_variant(Tone::Formal).unwrap().unwrap();
    clock.advance_secs(6);
    let fresh = orchestrator.run_analysis("second").unwrap();

    stale.wait().await.unwrap();
    fresh.wait().await.unwrap();

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.variant.is_none());
    assert_eq!(snapshot.active_tone, None);
    assert_eq!(snapshot.variants_remaining, 5);
    // Only the two base analyses reached the backend.
    assert_eq!(backend.messages().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn queued_tasks_run_in_submission_order() {
    let backend = ScriptedBackend::new(vec![
        Reply::ok(NUMBERED_REPORT),
        Reply::ok("formal text").after(Duration::from_secs(3)),
        Reply::ok("casual text"),
    ]);
    let (orchestrator, _) = orchestrator(backend.clone());
    orchestrator.run_analysis("base").unwrap().wait().await.unwrap();

    let formal = orchestrator.run_variant(Tone::Formal).unwrap().unwrap();
    let casual = orchestrator.run_variant(Tone::Casual).unwrap().unwrap();
    assert_eq!(orchestrator.snapshot().phase, Phase::GeneratingVariant);
    formal.wait().await.unwrap();
    casual.wait().await.unwrap();

    let messages = backend.messages();
    assert!(messages[1].contains("formal tone"));
    assert!(messages[2].contains("casual tone"));
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Extracted);
    assert_eq!(snapshot.variant.unwrap().body, "casual text");
    assert_eq!(snapshot.variants_remaining, 3);
}

#[tokio::test(start_paused = true)]
async fn audio_cooldown_is_independent_of_text() {
    let backend = ScriptedBackend::new(vec![Reply::ok(NUMBERED_REPORT)]);
    let (orchestrator, _) = orchestrator(backend);
    let clip = || AudioClip::new("memo.webm", "audio/webm", vec![7; 64]);

    let transcript = orchestrator.submit_audio(clip()).unwrap().wait().await.unwrap();
    assert_eq!(transcript, "transcribed speech");
    orchestrator.run_analysis(&transcript).unwrap().wait().await.unwrap();

    match orchestrator.submit_audio(clip()) {
        Err(GateError::Rejected(Rejection::Cooldown {
            kind,
            seconds_remaining,
        })) => {
            assert_eq!(kind, RequestKind::Audio);
            assert_eq!(seconds_remaining, 5);
        }
        other => panic!("expected audio cooldown, got {other:?}"),
    }
}
