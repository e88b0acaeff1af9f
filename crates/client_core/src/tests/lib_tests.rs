use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use shared::{
    domain::{GameKind, LessonId, LevelId, SignId, UserId},
    error::{ApiException, ErrorCode},
    protocol::{
        AuthSession, AuthUser, HeartRefresh, LessonDetail, PracticeLevel, PracticeReceipt,
        PracticeReport, ProgressReceipt, ProgressSnapshot, ProgressUpdate, SignSummary,
        UserStatus,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::{
    practice::{GameOutcome, PracticeRound},
    progress::Phase,
    LessonSession, SessionMode, SessionOutcome,
};

#[derive(Default)]
struct TestBackend {
    auth_headers: Mutex<Vec<String>>,
    progress_updates: Mutex<Vec<ProgressUpdate>>,
    practice_reports: Mutex<Vec<PracticeReport>>,
}

type Backend = Arc<TestBackend>;

fn sample_lesson() -> LessonDetail {
    LessonDetail {
        lesson_id: LessonId(5),
        title: "First signs".to_string(),
        description: None,
        signs: vec![SignSummary {
            sign_id: SignId(1),
            text: "hello".to_string(),
            video_url: "https://cdn.example/hello.mp4".to_string(),
            thumbnail_url: None,
            difficulty_level: None,
        }],
        rubies_reward: 10,
        video_url: None,
    }
}

async fn handle_login(State(_): State<Backend>) -> Json<AuthSession> {
    Json(AuthSession {
        access_token: "test-token-abc".to_string(),
        token_type: "bearer".to_string(),
        user: AuthUser {
            id: UserId(7),
            name: Some("alice".to_string()),
            role: Some("user".to_string()),
        },
    })
}

async fn handle_lesson(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(lesson_id): Path<i64>,
) -> Response {
    if let Some(value) = headers.get("authorization") {
        backend
            .auth_headers
            .lock()
            .await
            .push(value.to_str().unwrap_or_default().to_string());
    }
    if lesson_id == 99 {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "detail": "lesson is locked" })),
        )
            .into_response();
    }
    Json(sample_lesson()).into_response()
}

async fn handle_lesson_progress(
    State(_): State<Backend>,
    Path((_user_id, _lesson_id)): Path<(i64, i64)>,
) -> Json<ProgressSnapshot> {
    Json(ProgressSnapshot {
        progress: 0,
        completed: false,
    })
}

async fn handle_update_progress(
    State(backend): State<Backend>,
    Path((_user_id, _lesson_id)): Path<(i64, i64)>,
    Json(update): Json<ProgressUpdate>,
) -> Json<ProgressReceipt> {
    backend.progress_updates.lock().await.push(update);
    Json(ProgressReceipt {
        progress: update.progress,
        completed: update.progress == 100,
        hearts_remaining: 5,
        rubies_earned: if update.progress == 100 { 25 } else { 0 },
        next_lesson_unlocked: update.progress == 100,
    })
}

async fn handle_status(State(_): State<Backend>, Path(user_id): Path<i64>) -> Json<UserStatus> {
    Json(UserStatus {
        user_id: UserId(user_id),
        rubies: 40,
        hearts: 5,
        streak: 2,
        certificate: false,
        progress: serde_json::Value::Null,
        updated_at: None,
    })
}

async fn handle_refresh_hearts(
    State(_): State<Backend>,
    Path(_user_id): Path<i64>,
) -> Json<HeartRefresh> {
    Json(HeartRefresh { hearts: 5 })
}

async fn handle_practice_signs(
    State(_): State<Backend>,
    Path((_user_id, _difficulty)): Path<(i64, String)>,
) -> Json<Vec<SignSummary>> {
    let signs = (0..10)
        .map(|i| SignSummary {
            sign_id: SignId(i),
            text: format!("sign-{i}"),
            video_url: format!("https://cdn.example/{i}.mp4"),
            thumbnail_url: None,
            difficulty_level: None,
        })
        .collect();
    Json(signs)
}

async fn handle_practice_wallet(
    State(_): State<Backend>,
    Path(_user_id): Path<i64>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "hearts": 5,
        "rubies": 12,
        "highScores": { "3_speed": 90 }
    }))
}

async fn handle_practice_report(
    State(backend): State<Backend>,
    Path(_user_id): Path<i64>,
    Json(report): Json<PracticeReport>,
) -> Json<PracticeReceipt> {
    backend.practice_reports.lock().await.push(report);
    Json(PracticeReceipt {
        rubies_earned: Some(8),
        total_rubies: Some(20),
        hearts: Some(5),
        game_high_score: Some(120),
    })
}

async fn spawn_backend() -> (String, Backend) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend: Backend = Arc::new(TestBackend::default());
    let app = Router::new()
        .route("/api/auth/login", post(handle_login))
        .route("/api/lessons/:lesson_id", get(handle_lesson))
        .route(
            "/api/lessons/lesson-progress/:user_id/:lesson_id",
            get(handle_lesson_progress),
        )
        .route(
            "/api/lessons/update-progress/:user_id/:lesson_id",
            patch(handle_update_progress),
        )
        .route("/api/status/:user_id", get(handle_status))
        .route(
            "/api/lessons/refresh-hearts/:user_id",
            post(handle_refresh_hearts),
        )
        .route(
            "/api/practice/signs/:user_id/:difficulty",
            get(handle_practice_signs),
        )
        .route("/api/practice/hearts/:user_id", get(handle_practice_wallet))
        .route(
            "/api/practice/update-progress/:user_id",
            post(handle_practice_report),
        )
        .with_state(Arc::clone(&backend));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), backend)
}

#[tokio::test]
async fn login_attaches_bearer_token_to_subsequent_requests() {
    let (server_url, backend) = spawn_backend().await;
    let api = HttpApi::new(&server_url).expect("api");

    let session = api.login("alice@example.com", "hunter2-long").await.expect("login");
    assert_eq!(session.user.id, UserId(7));
    assert_eq!(api.user_id().await, Some(UserId(7)));

    let lesson = api.fetch_lesson(LessonId(5)).await.expect("lesson");
    assert_eq!(lesson.lesson_id, LessonId(5));

    let headers = backend.auth_headers.lock().await.clone();
    assert_eq!(headers, vec!["Bearer test-token-abc".to_string()]);
}

#[tokio::test]
async fn backend_refusals_surface_the_detail_message() {
    let (server_url, _backend) = spawn_backend().await;
    let api = HttpApi::new(&server_url).expect("api");
    api.login("alice@example.com", "hunter2-long")
        .await
        .expect("login");

    let err = api.fetch_lesson(LessonId(99)).await.expect_err("locked");
    let exception = err
        .downcast_ref::<ApiException>()
        .expect("typed api exception");
    assert_eq!(exception.code, ErrorCode::Forbidden);
    assert!(exception.message.contains("locked"));
}

#[tokio::test]
async fn requests_before_login_fail_fast() {
    let (server_url, _backend) = spawn_backend().await;
    let api = HttpApi::new(&server_url).expect("api");

    let err = api.fetch_lesson(LessonId(5)).await.expect_err("must fail");
    assert!(err.to_string().contains("not logged in"));
}

#[tokio::test]
async fn progress_updates_reach_the_update_endpoint() {
    let (server_url, backend) = spawn_backend().await;
    let api = HttpApi::new(&server_url).expect("api");
    api.login("alice@example.com", "hunter2-long").await.expect("login");

    let receipt = api
        .persist_progress(
            LessonId(5),
            ProgressUpdate {
                progress: 33,
                is_correct: false,
                current_question: 0,
                hearts_used: 1,
            },
        )
        .await
        .expect("persist");
    assert_eq!(receipt.hearts_remaining, 5);

    let updates = backend.progress_updates.lock().await.clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].progress, 33);
    assert!(!updates[0].is_correct);
    assert_eq!(updates[0].hearts_used, 1);
}

#[tokio::test]
async fn a_single_sign_lesson_plays_end_to_end_over_http() {
    let (server_url, backend) = spawn_backend().await;
    let api = Arc::new(HttpApi::new(&server_url).expect("api"));
    api.login("alice@example.com", "hunter2-long").await.expect("login");

    let session = LessonSession::open_with_rng(
        Arc::clone(&api) as Arc<dyn LessonCatalog>,
        Arc::clone(&api) as Arc<dyn ProgressStore>,
        Arc::clone(&api) as Arc<dyn AccountGateway>,
        LessonId(5),
        SessionMode::Lesson,
        StdRng::seed_from_u64(4),
    )
    .await
    .expect("open");

    assert_eq!(session.snapshot().await.phase, Phase::Video);
    session.video_ended().await.expect("video");
    session.continue_from_reveal().await.expect("reveal");

    // One sign in the lesson: the distractor is the fixed fallback.
    let snapshot = session.snapshot().await;
    let options = snapshot.quiz_options.expect("options");
    assert!(options.contains(&"hello".to_string()));
    assert!(options.contains(&crate::quiz::FALLBACK_DISTRACTOR.to_string()));

    let correct = options
        .iter()
        .position(|option| option == "hello")
        .expect("correct option");
    session.select_option(correct).await.expect("answer");
    let outcome = session
        .advance_after_feedback()
        .await
        .expect("advance")
        .expect("completion");
    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            rubies_earned: 25,
            streak: 2
        }
    );

    let updates = backend.progress_updates.lock().await.clone();
    assert!(updates.iter().any(|update| update.progress == 100));
}

#[tokio::test]
async fn practice_rounds_report_multiplied_scores() {
    let (server_url, backend) = spawn_backend().await;
    let api = Arc::new(HttpApi::new(&server_url).expect("api"));
    api.login("alice@example.com", "hunter2-long").await.expect("login");

    let level = PracticeLevel {
        level_id: LevelId(3),
        name: "Intermediate practice".to_string(),
        description: None,
        required_progress: 0,
        games: Vec::new(),
        unlocked: true,
        progress: 0,
    };
    let round = PracticeRound::begin_with_rng(
        Arc::clone(&api) as Arc<dyn PracticeGateway>,
        &level,
        GameKind::Speed,
        StdRng::seed_from_u64(9),
    )
    .await
    .expect("round");
    assert_eq!(round.high_score(), 90);

    let receipt = round
        .finish(GameOutcome::Success { score: 40 })
        .await
        .expect("report");
    assert_eq!(receipt.game_high_score, Some(120));

    let reports = backend.practice_reports.lock().await.clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].level_id, LevelId(3));
    assert_eq!(reports[0].game_id, GameKind::Speed);
    // Intermediate levels double the raw score.
    assert_eq!(reports[0].score, 80);
    assert_eq!(reports[0].hearts_lost, 0);
}
