use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use smartexam_lib::{
    bank::builtin_bank,
    exam::{
        Direction, ExamController, ExamError, ExamEvent, ExamResult, ExamStatus, SubmitTrigger,
    },
    results::{CsvResultLog, ResultBatch, ResultStore},
    settings::ExamSettings,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Default)]
struct MemoryStore {
    batches: Mutex<Vec<ResultBatch>>,
}

impl MemoryStore {
    fn count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

impl ResultStore for MemoryStore {
    fn append(&self, batch: &ResultBatch) -> ExamResult<()> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".into()
    }
}

fn sections(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn controller_with(
    store: Arc<dyn ResultStore>,
    settings: &ExamSettings,
) -> (ExamController, UnboundedReceiver<ExamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = ExamController::new(Arc::new(builtin_bank()), store, settings, tx);
    (controller, rx)
}

fn drain(events: &mut UnboundedReceiver<ExamEvent>) -> Vec<ExamEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

fn temp_csv() -> PathBuf {
    std::env::temp_dir().join(format!("smartexam-flow-{}.csv", uuid::Uuid::new_v4()))
}

#[tokio::test(start_paused = true)]
async fn candidate_scenario_writes_three_rows() {
    let path = temp_csv();
    let store = Arc::new(CsvResultLog::new(&path));
    let (controller, _events) = controller_with(store, &ExamSettings::default());

    let snapshot = controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude", "Coding"]))
        .await
        .unwrap();
    assert_eq!(snapshot.remaining_secs, 1800);
    assert_eq!(snapshot.active_section, "Aptitude");

    controller.choose(Some(1)).await.unwrap();
    controller.navigate(Direction::Next).await.unwrap();
    assert!(controller.toggle_flag("Aptitude", 2).await.unwrap());

    controller.switch_section("Coding").await.unwrap();
    for (idx, answer) in [2, 1, 0, 1, 1].into_iter().enumerate() {
        if idx > 0 {
            controller.navigate(Direction::Next).await.unwrap();
        }
        controller.choose(Some(answer)).await.unwrap();
    }

    let flagged = controller.flagged_questions().await.unwrap();
    let labels: Vec<String> = flagged.iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["Aptitude - Q3"]);

    tokio::time::sleep(Duration::from_secs(95)).await;
    let outcome = controller.submit().await.unwrap().expect("first submit");
    assert_eq!(outcome.trigger, SubmitTrigger::Manual);
    assert_eq!(outcome.report.overall_score, 6);
    assert_eq!(outcome.report.overall_total, 10);
    assert_eq!(outcome.report.percentage(), 60);
    assert_eq!(outcome.elapsed_secs, 95);
    assert!(outcome.persistence_warning.is_none());

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "Timestamp,Name,Roll,Section,Score,TotalQuestions,TimeTakenSeconds"
    );
    let rows: Vec<Vec<&str>> = lines[1..].iter().map(|l| l.split(',').collect()).collect();
    assert_eq!(rows[0][1..], ["Asha Rao", "R102", "Aptitude", "1", "5", "95"]);
    assert_eq!(rows[1][1..], ["Asha Rao", "R102", "Coding", "5", "5", "95"]);
    assert_eq!(rows[2][1..], ["Asha Rao", "R102", "Overall", "6", "10", "95"]);
    assert!(rows.iter().all(|r| r[0] == rows[0][0]));
    assert_eq!(rows[0][0].len(), "2026-01-01 00:00:00".len());

    fs::remove_file(&path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn second_submit_is_a_silent_no_op() {
    let store = Arc::new(MemoryStore::default());
    let (controller, _events) = controller_with(store.clone(), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Reasoning"]))
        .await
        .unwrap();

    assert!(controller.submit().await.unwrap().is_some());
    assert!(controller.submit().await.unwrap().is_none());
    assert_eq!(store.count(), 1);

    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.status, ExamStatus::Submitted);
    assert!(matches!(
        controller.choose(Some(0)).await,
        Err(ExamError::SessionClosed)
    ));
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_submits_exactly_once() {
    let store = Arc::new(MemoryStore::default());
    let (controller, mut events) = controller_with(store.clone(), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude", "Coding"]))
        .await
        .unwrap();
    controller.choose(Some(1)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_799_500)).await;
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.remaining_secs, 0);
    assert_eq!(snapshot.status, ExamStatus::Running);
    assert!(snapshot.low_time);
    assert_eq!(store.count(), 0);

    let outcome = loop {
        match events.recv().await.expect("event channel open") {
            ExamEvent::TimeExpired { outcome } => break outcome,
            _ => continue,
        }
    };
    assert_eq!(outcome.trigger, SubmitTrigger::TimeExpired);
    assert_eq!(outcome.elapsed_secs, 1800);
    assert_eq!(outcome.report.overall_score, 1);
    assert_eq!(store.count(), 1);

    assert!(controller.submit().await.unwrap().is_none());
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(store.count(), 1);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, ExamEvent::TimeExpired { .. })));
}

#[tokio::test(start_paused = true)]
async fn manual_submit_cancels_the_timer() {
    let store = Arc::new(MemoryStore::default());
    let (controller, mut events) = controller_with(store.clone(), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Coding"]))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let outcome = controller.submit().await.unwrap().unwrap();
    assert_eq!(outcome.elapsed_secs, 10);
    let remaining = controller.snapshot().await.unwrap().remaining_secs;

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(store.count(), 1);
    assert_eq!(controller.snapshot().await.unwrap().remaining_secs, remaining);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, ExamEvent::TimeExpired { .. })));
}

#[tokio::test(start_paused = true)]
async fn low_time_is_announced_once() {
    let settings = ExamSettings {
        duration_minutes: 1,
        warning_threshold_secs: 30,
        ..ExamSettings::default()
    };
    let store = Arc::new(MemoryStore::default());
    let (controller, mut events) = controller_with(store.clone(), &settings);
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude"]))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20_500)).await;
    assert!(!controller.snapshot().await.unwrap().low_time);

    tokio::time::sleep(Duration::from_secs(50)).await;
    let seen = drain(&mut events);
    let low_time: Vec<u64> = seen
        .iter()
        .filter_map(|e| match e {
            ExamEvent::LowTime { remaining_secs } => Some(*remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(low_time, vec![30]);
    assert_eq!(
        seen.iter()
            .filter(|e| matches!(e, ExamEvent::TimeExpired { .. }))
            .count(),
        1
    );
    assert_eq!(store.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_still_returns_scores() {
    let path = std::env::temp_dir()
        .join(format!("smartexam-missing-{}", uuid::Uuid::new_v4()))
        .join("results.csv");
    let (controller, _events) =
        controller_with(Arc::new(CsvResultLog::new(&path)), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude"]))
        .await
        .unwrap();
    controller.record_answer(Some(1)).await.unwrap();

    let outcome = controller.submit().await.unwrap().unwrap();
    assert!(outcome.persistence_warning.is_some());
    assert_eq!(outcome.report.overall_score, 1);
    assert_eq!(
        controller.snapshot().await.unwrap().status,
        ExamStatus::Submitted
    );
    assert!(controller.submit().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn invalid_start_creates_no_session() {
    let (controller, _events) =
        controller_with(Arc::new(MemoryStore::default()), &ExamSettings::default());

    assert!(matches!(
        controller.start_exam("", "R102", &sections(&["Aptitude"])).await,
        Err(ExamError::Validation(_))
    ));
    assert!(matches!(
        controller.start_exam("Asha Rao", "R102", &[]).await,
        Err(ExamError::Validation(_))
    ));
    assert!(controller.snapshot().await.is_none());
    assert!(matches!(
        controller.navigate(Direction::Next).await,
        Err(ExamError::NoActiveSession)
    ));
    assert!(matches!(
        controller.submit().await,
        Err(ExamError::NoActiveSession)
    ));
}

#[tokio::test(start_paused = true)]
async fn jump_out_of_range_is_rejected() {
    let (controller, _events) =
        controller_with(Arc::new(MemoryStore::default()), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude", "Coding"]))
        .await
        .unwrap();
    controller.navigate(Direction::Next).await.unwrap();
    let before = controller.snapshot().await.unwrap();

    assert!(matches!(
        controller.jump_to("Coding", 5).await,
        Err(ExamError::OutOfRange { index: 5, .. })
    ));
    assert!(matches!(
        controller.jump_to("Reasoning", 0).await,
        Err(ExamError::OutOfRange { .. })
    ));

    let after = controller.snapshot().await.unwrap();
    assert_eq!(after.active_section, before.active_section);
    assert_eq!(after.question_index, 1);

    let jumped = controller.jump_to("Coding", 4).await.unwrap();
    assert_eq!(jumped.active_section, "Coding");
    assert_eq!(jumped.question_index, 4);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_session_and_clock() {
    let store = Arc::new(MemoryStore::default());
    let (controller, _events) = controller_with(store.clone(), &ExamSettings::default());
    let first = controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude"]))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    controller.submit().await.unwrap();
    controller.reset().await;
    assert!(controller.snapshot().await.is_none());

    let second = controller
        .start_exam("Ravi Kumar", "R103", &sections(&["Coding", "Reasoning"]))
        .await
        .unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(second.active_section, "Coding");

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.remaining_secs, 1800 - 11);
    assert_eq!(snapshot.sections.len(), 2);
    assert!(snapshot.sections.iter().all(|s| s.answered == 0));
    assert_eq!(store.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn review_is_available_after_submission() {
    let (controller, _events) =
        controller_with(Arc::new(MemoryStore::default()), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Reasoning"]))
        .await
        .unwrap();
    controller.choose(Some(2)).await.unwrap();

    assert!(matches!(
        controller.review().await,
        Err(ExamError::Validation(_))
    ));

    controller.submit().await.unwrap();
    let reviews = controller.review().await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].section, "Reasoning");
    assert_eq!(reviews[0].items[0].answer, Some(2));
    assert_eq!(reviews[0].items.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn section_switch_commits_the_pending_choice() {
    let (controller, _events) =
        controller_with(Arc::new(MemoryStore::default()), &ExamSettings::default());
    controller
        .start_exam("Asha Rao", "R102", &sections(&["Aptitude", "Coding"]))
        .await
        .unwrap();
    controller.choose(Some(1)).await.unwrap();

    let (switched, snapshot) = controller.switch_section("Coding").await.unwrap();
    assert!(switched);
    assert_eq!(snapshot.sections[0].answered, 1);

    let scores = controller.scores().await.unwrap();
    assert_eq!(scores.sections[0].section, "Aptitude");
    assert_eq!(scores.sections[0].score, 1);
    assert_eq!(scores.overall_score, 1);

    let outcome = controller.submit().await.unwrap().unwrap();
    assert_eq!(outcome.report.overall_score, 1);
}
