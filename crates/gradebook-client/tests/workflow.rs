//! End-to-end authoring and grading flows against the in-memory backend.

use std::sync::Arc;

use gradebook_client::InMemoryBackend;
use gradebook_core::assembly::{AuthoringState, QuizAssembly};
use gradebook_core::error::{PersistError, SaveError};
use gradebook_core::grading::{Exam, GradeRecord, RowField, Student};
use gradebook_core::question::QuestionKind;
use gradebook_core::reconcile::RosterReconciler;
use gradebook_core::saver::{GradeBulkSaver, SaveOutcome};
use gradebook_core::session::{GradingController, GradingPhase, LoadOutcome};

fn roster(n: usize) -> Vec<Student> {
    (1..=n)
        .map(|i| Student {
            id: format!("s{i}"),
            name: format!("Student {i}"),
            email: Some(format!("s{i}@school.test")),
        })
        .collect()
}

fn exam(subject: Option<&str>) -> Exam {
    Exam {
        id: "e1".into(),
        name: "Term test".into(),
        subject_id: subject.map(String::from),
        total_marks: Some(40.0),
        class_id: Some("c1".into()),
        report_period_id: Some("p1".into()),
    }
}

fn controller(backend: &Arc<InMemoryBackend>) -> GradingController {
    GradingController::new(
        RosterReconciler::new(backend.clone(), backend.clone()),
        GradeBulkSaver::new(backend.clone()),
    )
}

#[tokio::test]
async fn grade_a_class_twice() {
    let existing: Vec<GradeRecord> = (1..=28)
        .map(|i| GradeRecord {
            id: Some(format!("old-{i}")),
            student_id: format!("s{i}"),
            value: Some(30.0),
            max_value: None,
            notes: None,
        })
        .collect();
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_students("c1", roster(30))
            .with_grades("e1", "c1", existing),
    );
    let controller = controller(&backend);

    controller.select("c1", "p1", exam(Some("math"))).await;
    assert_eq!(controller.load().await.unwrap(), LoadOutcome::Applied);

    let rows = controller.rows().await;
    assert_eq!(rows.len(), 30);
    assert_eq!(rows.iter().filter(|r| r.value.is_empty()).count(), 2);
    assert!(rows.iter().all(|r| r.max_value == 40.0));

    controller.stage_edit("s29", RowField::Value, "35").await;
    controller.stage_edit("s30", RowField::Value, "12.5").await;
    controller.stage_edit("s1", RowField::Notes, "re-marked").await;

    let SaveOutcome::Saved(receipt) = controller.commit().await.unwrap() else {
        panic!("expected a save");
    };
    assert_eq!((receipt.created, receipt.updated), (2, 28));
    assert_eq!(controller.phase().await, GradingPhase::Saved);

    let batch = backend.last_batch().unwrap();
    assert_eq!(batch.len(), 30);
    assert!(batch.iter().all(|g| g.subject_id == "math" && g.report_period_id == "p1"));
    assert_eq!(backend.stored_grades("e1", "c1").len(), 30);

    // Reload: every student now has a record.
    controller.load().await.unwrap();
    let rows = controller.rows().await;
    assert!(rows.iter().all(|r| r.grade_record_id.is_some()));
    assert_eq!(rows[0].notes, "re-marked");

    let SaveOutcome::Saved(receipt) = controller.commit().await.unwrap() else {
        panic!("expected a save");
    };
    assert_eq!((receipt.created, receipt.updated), (0, 30));
}

#[tokio::test]
async fn failed_save_keeps_edits_and_can_be_retried() {
    let backend = Arc::new(InMemoryBackend::new().with_students("c1", roster(3)));
    let controller = controller(&backend);
    controller.select("c1", "p1", exam(Some("math"))).await;
    controller.load().await.unwrap();
    controller.stage_edit("s2", RowField::Value, "19").await;

    backend.set_offline(true);
    let err = controller.commit().await.unwrap_err();
    assert!(matches!(err, SaveError::Rejected(_)));
    assert_eq!(controller.phase().await, GradingPhase::Failed);
    assert_eq!(controller.rows().await[1].value, "19");

    backend.set_offline(false);
    let outcome = controller.commit().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(ref r) if r.created == 1));
    assert_eq!(backend.upsert_calls(), 2);
}

#[tokio::test]
async fn empty_sheet_and_missing_subject_send_nothing() {
    let backend = Arc::new(InMemoryBackend::new().with_students("c1", roster(4)));
    let controller = controller(&backend);

    controller.select("c1", "p1", exam(None)).await;
    controller.load().await.unwrap();
    assert_eq!(controller.commit().await.unwrap(), SaveOutcome::NothingToSave);

    controller.stage_edit("s1", RowField::Value, "10").await;
    let err = controller.commit().await.unwrap_err();
    assert!(matches!(err, SaveError::MissingSubject { .. }));
    assert_eq!(backend.upsert_calls(), 0);
}

#[tokio::test]
async fn clearing_a_value_keeps_the_stored_record() {
    let existing = vec![
        GradeRecord {
            id: Some("g1".into()),
            student_id: "s1".into(),
            value: Some(14.0),
            max_value: Some(40.0),
            notes: None,
        },
        GradeRecord {
            id: Some("g2".into()),
            student_id: "s2".into(),
            value: Some(5.0),
            max_value: Some(40.0),
            notes: None,
        },
    ];
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_students("c1", roster(2))
            .with_grades("e1", "c1", existing),
    );
    let controller = controller(&backend);
    controller.select("c1", "p1", exam(Some("math"))).await;
    controller.load().await.unwrap();

    controller.stage_edit("s1", RowField::Value, "").await;
    controller.stage_edit("s2", RowField::Value, "7").await;
    let SaveOutcome::Saved(receipt) = controller.commit().await.unwrap() else {
        panic!("expected a save");
    };
    assert_eq!((receipt.created, receipt.updated), (0, 1));

    let batch = backend.last_batch().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id.as_deref(), Some("g2"));

    let stored = backend.stored_grades("e1", "c1");
    assert_eq!(stored.len(), 2);
    let first = stored.iter().find(|g| g.student_id == "s1").unwrap();
    assert_eq!(first.id.as_deref(), Some("g1"));
    assert_eq!(first.value, Some(14.0));
}

#[tokio::test]
async fn roster_fetch_failure_produces_no_rows() {
    let backend = Arc::new(InMemoryBackend::new().with_students("c1", roster(2)));
    backend.set_offline(true);
    let controller = controller(&backend);

    controller.select("c1", "p1", exam(Some("math"))).await;
    assert!(controller.load().await.is_err());
    assert!(controller.rows().await.is_empty());
}

#[tokio::test]
async fn author_and_publish_a_quiz() {
    let backend = InMemoryBackend::new();
    let mut assembly = QuizAssembly::new();

    let multi = assembly.add_question(QuestionKind::MultiChoice);
    multi.set_prompt("Pick the primes");
    let ids: Vec<String> = multi.options().iter().map(|o| o.id.clone()).collect();
    for (id, text) in ids.iter().zip(["2", "4", "5", "9"]) {
        multi.update_option(id, text);
    }
    multi.set_correctness(&ids[0]);
    multi.set_correctness(&ids[2]);
    multi.set_correctness(&ids[0]);
    let correct: Vec<bool> = multi.options().iter().map(|o| o.is_correct).collect();
    assert_eq!(correct, vec![false, false, true, false]);

    let err = assembly.persist(&backend).await.unwrap_err();
    let PersistError::Invalid(issues) = err else {
        panic!("expected validation errors");
    };
    let fields: Vec<String> = issues.iter().map(|i| i.field()).collect();
    assert_eq!(fields, vec!["title", "classRef"]);
    assert_eq!(backend.quiz_calls(), 0);

    assembly.set_title("Primes");
    assembly.set_class(Some("c1".into()));
    let id = assembly.persist(&backend).await.unwrap();
    assert_eq!(assembly.state(), &AuthoringState::Persisted(id.clone()));

    let stored = backend.quiz(&id).unwrap();
    assert_eq!(stored.total_points(), 1);
    assert_eq!(stored.questions[0].correct_count(), 1);

    assembly.settings_mut().set_duration("15");
    assert_eq!(assembly.persist(&backend).await.unwrap(), id);
    assert_eq!(backend.quiz(&id).unwrap().settings.duration_minutes, 15);
}
