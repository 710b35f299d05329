mod common;

use autotype_bridge::{
    BridgeEvent, BridgeHandle, Completion, FailureKind, HumanizeOptions, Operation,
    PlagiarismReport, PlagiarismSource, TonePreset, ToneOptions, Topic, WindowInfo,
    WindowSelection, WorkerExit,
};
use autotype_core::SessionState;
use autotype_logging::initialize_for_tests;
use common::{drain, Script, ScriptedLauncher};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn plagiarism_result_is_returned_verbatim() {
    initialize_for_tests();
    let payload = json!({
        "similarityScore": 0.42,
        "sources": [{"url": "example.com", "similarity": 0.42}],
        "highlightedText": "<mark>...</mark>"
    });
    let launcher = ScriptedLauncher::new();
    launcher.script(
        Operation::CheckPlagiarism,
        Script::new().result(payload.clone()),
    );
    let bridge = BridgeHandle::with_launcher(launcher);
    let mut events = bridge.subscribe(&[Topic::PlagiarismResults]);

    let report = bridge.check_plagiarism("some essay").await.unwrap();

    assert_eq!(
        report,
        PlagiarismReport {
            similarity_score: 0.42,
            sources: vec![PlagiarismSource {
                url: "example.com".to_string(),
                similarity: 0.42,
                matched_text: None,
            }],
            highlighted_text: "<mark>...</mark>".to_string(),
        }
    );
    assert_eq!(serde_json::to_value(&report).unwrap(), payload);
    assert_eq!(
        drain(&mut events),
        vec![BridgeEvent::PlagiarismResults(Completion {
            success: true,
            error: None
        })]
    );
}

#[tokio::test]
async fn missing_results_fall_back_to_defaults() {
    initialize_for_tests();
    let bridge = BridgeHandle::with_launcher(ScriptedLauncher::new());

    assert_eq!(bridge.get_available_windows().await.unwrap(), Vec::<WindowInfo>::new());
    assert_eq!(
        bridge
            .humanize_text("", &HumanizeOptions::default())
            .await
            .unwrap(),
        ""
    );
    assert_eq!(
        bridge.adjust_tone("", &ToneOptions::default()).await.unwrap(),
        ""
    );
    assert_eq!(
        bridge.check_plagiarism("").await.unwrap(),
        PlagiarismReport {
            similarity_score: 0.0,
            sources: Vec::new(),
            highlighted_text: String::new(),
        }
    );
    assert_eq!(
        bridge.select_window("3").await.unwrap(),
        WindowSelection::default()
    );
    assert_eq!(bridge.get_tone_presets().await.unwrap(), Vec::<TonePreset>::new());
}

#[tokio::test]
async fn enveloped_results_are_unwrapped() {
    initialize_for_tests();
    let launcher = ScriptedLauncher::new();
    launcher.script(
        Operation::GetWindows,
        Script::new().result(json!({
            "success": true,
            "data": [
                {"id": "1", "title": "Notepad", "processName": "notepad.exe"},
                {"id": 2, "title": "Microsoft Word"}
            ]
        })),
    );
    launcher.script(
        Operation::SelectWindow,
        Script::new().result(json!({"success": true, "data": {"id": "2", "selected": true}})),
    );
    launcher.script(
        Operation::GetTonePresets,
        Script::new().result(json!({
            "success": true,
            "data": [{"id": "casual", "name": "Casual/Conversational", "description": "Relaxed"}]
        })),
    );
    let bridge = BridgeHandle::with_launcher(launcher.clone());

    assert_eq!(
        bridge.get_available_windows().await.unwrap(),
        vec![
            WindowInfo {
                id: "1".to_string(),
                title: "Notepad".to_string(),
                process_name: Some("notepad.exe".to_string()),
            },
            WindowInfo {
                id: "2".to_string(),
                title: "Microsoft Word".to_string(),
                process_name: None,
            },
        ]
    );
    assert_eq!(
        bridge.select_window("2").await.unwrap(),
        WindowSelection {
            id: "2".to_string(),
            selected: true,
        }
    );
    assert_eq!(
        bridge.get_tone_presets().await.unwrap(),
        vec![TonePreset {
            id: "casual".to_string(),
            name: "Casual/Conversational".to_string(),
            description: "Relaxed".to_string(),
        }]
    );
    assert_eq!(
        launcher.launches(),
        vec![
            Operation::GetWindows,
            Operation::SelectWindow,
            Operation::GetTonePresets
        ]
    );
}

#[tokio::test]
async fn text_operations_emit_completion_events() {
    initialize_for_tests();
    let launcher = ScriptedLauncher::new();
    launcher.script(
        Operation::HumanizeText,
        Script::new().result(json!({"success": true, "data": {"humanizedText": "Well, hi."}})),
    );
    launcher.script(
        Operation::AdjustTone,
        Script::new()
            .line(r#"{"type":"error","data":"Adjust tone error: unknown preset"}"#)
            .exit(WorkerExit::code(1)),
    );
    let bridge = BridgeHandle::with_launcher(launcher);
    let mut events = bridge.subscribe(&[
        Topic::HumanizationComplete,
        Topic::ToneAdjustmentComplete,
    ]);

    let humanized = bridge
        .humanize_text("hi", &HumanizeOptions::default())
        .await
        .unwrap();
    let toned = bridge
        .adjust_tone(
            "hi",
            &ToneOptions {
                preset: "pirate".to_string(),
                ..ToneOptions::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(humanized, "Well, hi.");
    assert_eq!(toned.kind, FailureKind::Reported);
    assert_eq!(
        drain(&mut events),
        vec![
            BridgeEvent::HumanizationComplete(Completion {
                success: true,
                error: None
            }),
            BridgeEvent::ToneAdjustmentComplete(Completion {
                success: false,
                error: Some("Adjust tone error: unknown preset".to_string())
            }),
        ]
    );
}

#[tokio::test]
async fn humanize_abnormal_exit_reports_failed_completion() {
    initialize_for_tests();
    let launcher = ScriptedLauncher::new();
    launcher.script(Operation::HumanizeText, Script::new().exit(WorkerExit::code(1)));
    let bridge = BridgeHandle::with_launcher(launcher);
    let mut events = bridge.subscribe(&[Topic::HumanizationComplete]);

    let err = bridge
        .humanize_text("text", &HumanizeOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::AbnormalExit { code: Some(1) });
    assert_eq!(
        drain(&mut events),
        vec![BridgeEvent::HumanizationComplete(Completion {
            success: false,
            error: Some("humanize_text worker exited with code 1".to_string())
        })]
    );
}

#[tokio::test]
async fn stateless_operations_leave_the_session_alone() {
    initialize_for_tests();
    let launcher = ScriptedLauncher::new();
    launcher.script(
        Operation::HumanizeText,
        Script::new().result(json!("first")),
    );
    launcher.script(
        Operation::CheckPlagiarism,
        Script::new().result(json!({"similarityScore": 0.1})),
    );
    let bridge = BridgeHandle::with_launcher(launcher);

    let options = HumanizeOptions::default();
    let (humanized, report) = tokio::join!(
        bridge.humanize_text("a", &options),
        bridge.check_plagiarism("b"),
    );

    assert_eq!(humanized.unwrap(), "first");
    assert_eq!(report.unwrap().similarity_score, 0.1);
    assert_eq!(bridge.session_state(), SessionState::Idle);
}
