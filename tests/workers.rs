//! Background Worker Tests
//!
//! Uploads go through the HTTP API; the queued jobs are then processed by
//! workers bound to the same database.

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use files_manager::queue::{JobStatus, RunOutcome, ThumbnailJob};
use files_manager::web::handlers::AppState;
use files_manager::web::router::create_router;
use files_manager::{
    Config, ContentStore, Database, JobHandler, LogSink, MemoryStore, QueueName,
    ThumbnailHandler, WelcomeHandler, Worker,
};
use image::{ImageOutputFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    state: Arc<AppState>,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.files.folder_path = dir.path().to_string_lossy().to_string();

        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let state = Arc::new(AppState::new(db, Arc::new(MemoryStore::new()), &config));
        let server = TestServer::new(create_router(state.clone(), &[]))
            .expect("Failed to create test server");

        Self {
            server,
            state,
            _dir: dir,
        }
    }

    fn worker(&self, handler: Arc<dyn JobHandler>) -> Worker {
        Worker::new(self.state.queue.clone(), handler, Duration::from_millis(10))
    }

    fn thumbnail_worker(&self) -> Worker {
        self.worker(Arc::new(ThumbnailHandler::new(
            self.state.db.clone(),
            self.state.content.clone(),
        )))
    }

    async fn create_user(&self, email: &str) -> String {
        self.server
            .post("/users")
            .json(&json!({ "email": email, "password": "secret" }))
            .await
            .assert_status(StatusCode::CREATED);

        let credentials = STANDARD.encode(format!("{email}:secret"));
        self.server
            .get("/connect")
            .add_header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Basic {credentials}")).unwrap(),
            )
            .await
            .json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn user_id(&self, token: &str) -> i64 {
        self.server
            .get("/users/me")
            .add_header(
                HeaderName::from_static("x-token"),
                HeaderValue::from_str(token).unwrap(),
            )
            .await
            .json::<Value>()["id"]
            .as_i64()
            .unwrap()
    }

    async fn last_error(&self, job_id: i64) -> Option<String> {
        let job = self.state.queue.get(job_id).await.unwrap().unwrap();
        job.last_error
    }

    async fn upload_image(&self, token: &str, bytes: &[u8]) -> Value {
        let response = self
            .server
            .post("/files")
            .add_header(
                HeaderName::from_static("x-token"),
                HeaderValue::from_str(token).unwrap(),
            )
            .json(&json!({
                "name": "picture.png",
                "type": "image",
                "data": STANDARD.encode(bytes),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_thumbnails_generated_for_uploaded_image() {
    let app = TestApp::new().await;
    let token = app.create_user("bob@dylan.com").await;
    let file = app.upload_image(&token, &png(800, 400)).await;
    let local_path = file["localPath"].as_str().unwrap().to_string();

    let outcome = app.thumbnail_worker().run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    for (width, height) in [(500, 250), (250, 125), (100, 50)] {
        let path = ContentStore::variant_path(&local_path, width);
        assert!(Path::new(&path).exists(), "missing {path}");
        let thumb = image::open(&path).unwrap();
        assert_eq!(thumb.width(), width);
        assert_eq!(thumb.height(), height);
    }

    let response = app
        .server
        .get(&format!("/files/{}/data", file["id"]))
        .add_query_param("size", 100)
        .add_header(
            HeaderName::from_static("x-token"),
            HeaderValue::from_str(&token).unwrap(),
        )
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "image/png"
    );

    // Nothing left to do.
    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Idle
    );
}

#[tokio::test]
async fn test_thumbnail_not_yet_generated() {
    let app = TestApp::new().await;
    let token = app.create_user("bob@dylan.com").await;
    let file = app.upload_image(&token, &png(64, 64)).await;

    let response = app
        .server
        .get(&format!("/files/{}/data", file["id"]))
        .add_query_param("size", 250)
        .add_header(
            HeaderName::from_static("x-token"),
            HeaderValue::from_str(&token).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_undecodable_image_fails_permanently() {
    let app = TestApp::new().await;
    let token = app.create_user("bob@dylan.com").await;
    app.upload_image(&token, b"definitely not an image").await;

    let outcome = app.thumbnail_worker().run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Failed);

    let failed = app
        .state
        .queue
        .count_by_status(QueueName::Thumbnail, JobStatus::Failed)
        .await
        .unwrap();
    assert_eq!(failed, 1);
}

#[tokio::test]
async fn test_thumbnail_job_for_missing_file() {
    let app = TestApp::new().await;
    let job_id = app
        .state
        .queue
        .submit(QueueName::Thumbnail, &ThumbnailJob::new(1, 4242))
        .await
        .unwrap();

    let outcome = app.thumbnail_worker().run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Failed);

    let job = app.state.queue.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Failed));
    assert_eq!(job.last_error.as_deref(), Some("File not found"));
}

#[tokio::test]
async fn test_welcome_job_processed_after_registration() {
    let app = TestApp::new().await;
    app.create_user("bob@dylan.com").await;

    let worker = app.worker(Arc::new(WelcomeHandler::new(
        app.state.db.clone(),
        Arc::new(LogSink),
    )));

    assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Completed);
    assert_eq!(worker.run_once().await.unwrap(), RunOutcome::Idle);

    let completed = app
        .state
        .queue
        .count_by_status(QueueName::Welcome, JobStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn test_thumbnail_payload_missing_fields_fails_permanently() {
    let app = TestApp::new().await;
    let queue = &app.state.queue;

    let no_user = queue
        .submit(QueueName::Thumbnail, &json!({ "fileId": 1 }))
        .await
        .unwrap();
    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Failed
    );
    assert_eq!(app.last_error(no_user).await.as_deref(), Some("Missing userId"));

    let no_file = queue
        .submit(QueueName::Thumbnail, &json!({ "userId": 1 }))
        .await
        .unwrap();
    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Failed
    );
    assert_eq!(app.last_error(no_file).await.as_deref(), Some("Missing fileId"));

    // Permanent failures are not requeued.
    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Idle
    );
}

#[tokio::test]
async fn test_thumbnail_job_for_file_of_another_user() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice@example.com").await;
    let bob = app.create_user("bob@example.com").await;
    let bob_id = app.user_id(&bob).await;
    let file = app.upload_image(&alice, &png(64, 32)).await;
    let file_id = file["id"].as_i64().unwrap();
    let local_path = file["localPath"].as_str().unwrap().to_string();

    // Drop the job queued by the upload so only the forged one remains.
    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Completed
    );
    for width in [500, 250, 100] {
        std::fs::remove_file(ContentStore::variant_path(&local_path, width)).unwrap();
    }

    let job_id = app
        .state
        .queue
        .submit(QueueName::Thumbnail, &ThumbnailJob::new(bob_id, file_id))
        .await
        .unwrap();

    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Failed
    );
    assert_eq!(app.last_error(job_id).await.as_deref(), Some("File not found"));
    for width in [500, 250, 100] {
        assert!(!Path::new(&ContentStore::variant_path(&local_path, width)).exists());
    }
}

#[tokio::test]
async fn test_thumbnail_write_failure_keeps_other_sizes_and_retries() {
    let app = TestApp::new().await;
    let token = app.create_user("bob@dylan.com").await;
    let file = app.upload_image(&token, &png(600, 300)).await;
    let local_path = file["localPath"].as_str().unwrap().to_string();

    // A directory in the way makes the 250 write fail.
    std::fs::create_dir(ContentStore::variant_path(&local_path, 250)).unwrap();

    let outcome = app.thumbnail_worker().run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Retried);

    assert!(Path::new(&ContentStore::variant_path(&local_path, 500)).is_file());
    assert!(Path::new(&ContentStore::variant_path(&local_path, 100)).is_file());
    assert!(Path::new(&ContentStore::variant_path(&local_path, 250)).is_dir());

    let waiting = app
        .state
        .queue
        .count_by_status(QueueName::Thumbnail, JobStatus::Waiting)
        .await
        .unwrap();
    assert_eq!(waiting, 1);
}

#[tokio::test]
async fn test_thumbnail_redelivery_overwrites_variants() {
    let app = TestApp::new().await;
    let token = app.create_user("bob@dylan.com").await;
    let user_id = app.user_id(&token).await;
    let file = app.upload_image(&token, &png(400, 200)).await;
    let file_id = file["id"].as_i64().unwrap();
    let local_path = file["localPath"].as_str().unwrap().to_string();

    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Completed
    );
    let first: Vec<Vec<u8>> = [500, 250, 100]
        .iter()
        .map(|&w| std::fs::read(ContentStore::variant_path(&local_path, w)).unwrap())
        .collect();

    // Same job delivered again.
    app.state
        .queue
        .submit(QueueName::Thumbnail, &ThumbnailJob::new(user_id, file_id))
        .await
        .unwrap();
    assert_eq!(
        app.thumbnail_worker().run_once().await.unwrap(),
        RunOutcome::Completed
    );

    let second: Vec<Vec<u8>> = [500, 250, 100]
        .iter()
        .map(|&w| std::fs::read(ContentStore::variant_path(&local_path, w)).unwrap())
        .collect();
    assert_eq!(first, second);

    let completed = app
        .state
        .queue
        .count_by_status(QueueName::Thumbnail, JobStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed, 2);
}

#[tokio::test]
async fn test_extreme_aspect_ratio_fails_permanently() {
    let app = TestApp::new().await;
    let token = app.create_user("bob@dylan.com").await;
    let file = app.upload_image(&token, &png(1, 20_000)).await;
    let local_path = file["localPath"].as_str().unwrap().to_string();

    let outcome = app.thumbnail_worker().run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Failed);

    for width in [500, 250, 100] {
        assert!(!Path::new(&ContentStore::variant_path(&local_path, width)).exists());
    }
}
