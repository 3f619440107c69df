use chrono::Duration;
use planner_core::model::{
    Goal, GoalId, GoalType, RecoveryCode, SessionId, StudySession, Subject, SubjectId, User,
    UserId,
};
use planner_core::time::fixed_now;
use storage::repository::{
    GoalRepository, SessionRepository, StorageError, SubjectRepository, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_user(id: u64) -> User {
    User::new(
        UserId::new(id),
        "Ana",
        format!("ana{id}@example.com"),
        "argon2-hash",
    )
    .unwrap()
}

fn build_subject(id: u64, user: u64) -> Subject {
    Subject::new(
        SubjectId::new(id),
        "Math",
        "#2d6cdf",
        vec!["Algebra".to_string(), "Geometry".to_string()],
        UserId::new(user),
    )
    .unwrap()
}

fn build_session(
    id: u64,
    user: u64,
    subject: u64,
    minutes: u32,
    matters: Vec<&str>,
) -> StudySession {
    StudySession::new(
        SessionId::new(id),
        format!("Session {id}"),
        Some("evening drill".to_string()),
        fixed_now() - Duration::hours(id as i64),
        minutes,
        true,
        Some(20),
        Some(15),
        SubjectId::new(subject),
        matters.into_iter().map(str::to_string).collect(),
        UserId::new(user),
    )
    .unwrap()
}

#[tokio::test]
async fn user_roundtrip_with_recovery_state() {
    let repo = connect("memdb_users").await;

    let mut user = build_user(1);
    repo.upsert_user(&user).await.unwrap();

    user.set_recovery(RecoveryCode::new(
        "048213".to_string(),
        fixed_now() + Duration::minutes(15),
    ));
    repo.upsert_user(&user).await.unwrap();

    let fetched = repo
        .find_user_by_email("ana1@example.com")
        .await
        .unwrap()
        .expect("user");
    let rc = fetched.recovery().expect("recovery state");
    assert_eq!(rc.code(), "048213");
    assert_eq!(rc.expires_at(), fixed_now() + Duration::minutes(15));

    // clearing persists as NULL/NULL
    user.clear_recovery();
    repo.upsert_user(&user).await.unwrap();
    let cleared = repo.get_user(UserId::new(1)).await.unwrap().unwrap();
    assert!(cleared.recovery().is_none());
}

#[tokio::test]
async fn goal_roundtrip_preserves_optional_fields() {
    let repo = connect("memdb_goals").await;
    repo.upsert_user(&build_user(1)).await.unwrap();
    repo.upsert_subject(&build_subject(3, 1)).await.unwrap();

    let goal = Goal::new(
        GoalId::new(1),
        "Master algebra",
        GoalType::Monthly,
        Some(12.5),
        Some(300),
        chrono::NaiveDate::from_ymd_opt(2023, 11, 1),
        chrono::NaiveDate::from_ymd_opt(2023, 11, 30),
        true,
        Some(SubjectId::new(3)),
        Some("  Algebra ".to_string()),
        UserId::new(1),
    )
    .unwrap();
    repo.upsert_goal(&goal).await.unwrap();

    let fetched = repo.get_goal(GoalId::new(1)).await.unwrap().expect("goal");
    assert_eq!(fetched.target_hours(), Some(12.5));
    assert_eq!(fetched.target_questions(), Some(300));
    assert_eq!(fetched.matter(), Some("Algebra"));
    assert_eq!(fetched.goal_type(), GoalType::Monthly);

    let active = repo.list_active_goals(UserId::new(1)).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(repo.count_active_goals(UserId::new(1)).await.unwrap(), 1);
}

#[tokio::test]
async fn subject_matters_roundtrip_in_order() {
    let repo = connect("memdb_subjects").await;
    repo.upsert_user(&build_user(1)).await.unwrap();
    repo.upsert_subject(&build_subject(3, 1)).await.unwrap();

    let fetched = repo
        .get_subject(SubjectId::new(3))
        .await
        .unwrap()
        .expect("subject");
    assert_eq!(fetched.matters(), ["Algebra", "Geometry"]);

    let listed = repo.list_subjects(UserId::new(1)).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn session_sums_filter_by_matter_subject_and_range() {
    let repo = connect("memdb_sums").await;
    repo.upsert_user(&build_user(1)).await.unwrap();
    repo.upsert_subject(&build_subject(3, 1)).await.unwrap();
    repo.upsert_subject(&build_subject(4, 1)).await.unwrap();

    repo.upsert_session(&build_session(1, 1, 3, 60, vec!["Algebra"]))
        .await
        .unwrap();
    repo.upsert_session(&build_session(2, 1, 3, 45, vec!["Geometry"]))
        .await
        .unwrap();
    repo.upsert_session(&build_session(3, 1, 4, 30, vec!["Algebra"]))
        .await
        .unwrap();

    let user = UserId::new(1);
    let subject = SubjectId::new(3);

    assert_eq!(
        repo.sum_minutes_by_matter(user, subject, "Algebra")
            .await
            .unwrap(),
        60
    );
    assert_eq!(repo.sum_minutes_by_subject(user, subject).await.unwrap(), 105);
    assert_eq!(repo.total_minutes(user).await.unwrap(), 135);
    assert_eq!(
        repo.sum_questions_by_matter(user, subject, "Algebra")
            .await
            .unwrap(),
        20
    );
    assert_eq!(repo.count_completed_sessions(user).await.unwrap(), 3);

    // range covering only the two most recent sessions
    let since = fixed_now() - Duration::hours(2);
    assert_eq!(
        repo.sum_minutes_in_range(user, since, fixed_now()).await.unwrap(),
        105
    );
    let recent = repo.list_sessions_since(user, since).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id(), SessionId::new(1));
}

#[tokio::test]
async fn sums_coalesce_to_zero_for_unknown_user() {
    let repo = connect("memdb_empty").await;
    let nobody = UserId::new(42);
    assert_eq!(repo.total_minutes(nobody).await.unwrap(), 0);
    assert_eq!(
        repo.sum_minutes_by_subject(nobody, SubjectId::new(1))
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        repo.sum_questions_in_range(nobody, fixed_now() - Duration::days(7), fixed_now())
            .await
            .unwrap(),
        0
    );
    assert_eq!(repo.count_completed_sessions(nobody).await.unwrap(), 0);
}

#[tokio::test]
async fn session_update_replaces_matter_tags() {
    let repo = connect("memdb_matters").await;
    repo.upsert_user(&build_user(1)).await.unwrap();
    repo.upsert_subject(&build_subject(3, 1)).await.unwrap();

    repo.upsert_session(&build_session(1, 1, 3, 60, vec!["Algebra", "Geometry"]))
        .await
        .unwrap();
    repo.upsert_session(&build_session(1, 1, 3, 60, vec!["Trigonometry"]))
        .await
        .unwrap();

    let fetched = repo
        .get_session(SessionId::new(1))
        .await
        .unwrap()
        .expect("session");
    assert_eq!(fetched.matters(), ["Trigonometry"]);
    assert_eq!(
        repo.sum_minutes_by_matter(UserId::new(1), SubjectId::new(3), "Algebra")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn delete_session_reports_not_found_when_missing() {
    let repo = connect("memdb_delete").await;
    assert!(matches!(
        repo.delete_session(SessionId::new(404)).await.unwrap_err(),
        StorageError::NotFound
    ));
}
