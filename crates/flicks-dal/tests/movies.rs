use std::time::Duration;

use flicks_dal::{
    movie::{CreateMovie, MovieRepository, MovieRepositoryImpl, UpdateMovie},
    Error, PoolConfig,
};
use flicks_types::Runtime;
use futures::TryStreamExt as _;
use sqlx::Executor;
use tracing_test::traced_test;

const TEST_DATA: &str = r#"
INSERT INTO movies (id, created_at, title, year, runtime, genres, version)
VALUES (7, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), 'Old', 1999, 120, '["drama","crime"]', 3);
INSERT INTO movies (id, created_at, title, year, runtime, genres, version)
VALUES (8, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), 'Moana', 2016, NULL, '["animation"]', 1);
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    flicks_dal::migrate(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

fn new_movie(title: &str) -> CreateMovie {
    CreateMovie {
        title: title.to_string(),
        year: 2010,
        runtime: Some(Runtime::from_minutes(148)),
        genres: vec!["sci-fi".to_string(), "thriller".to_string()],
    }
}

#[tokio::test]
async fn test_movie_create() {
    let conn = init_db().await;
    let repo = MovieRepository::new(conn);

    let movie = repo.create(new_movie("Inception")).await.unwrap();
    assert!(movie.id > 8);
    assert_eq!(movie.version, 1);

    let stored = repo.get(movie.id).await.unwrap();
    assert_eq!(stored.title, "Inception");
    assert_eq!(stored.runtime, Some(Runtime::from_minutes(148)));
    assert_eq!(stored.genres, vec!["sci-fi", "thriller"]);
    assert_eq!(stored.version, 1);
    assert_eq!(stored.created_at.unix_timestamp(), movie.created_at.unix_timestamp());
}

#[tokio::test]
async fn test_movie_get() {
    let conn = init_db().await;
    let repo = MovieRepository::new(conn);

    let movie = repo.get(7).await.unwrap();
    assert_eq!(movie.title, "Old");
    assert_eq!(movie.year, 1999);
    assert_eq!(movie.runtime, Some(Runtime::from_minutes(120)));
    assert_eq!(movie.genres, vec!["drama", "crime"]);
    assert_eq!(movie.version, 3);

    let movie = repo.get(8).await.unwrap();
    assert_eq!(movie.runtime, None);

    for id in [0, -1, 999] {
        let err = repo.get(id).await.unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)), "{id}: {err}");
    }
}

#[tokio::test]
async fn test_movie_update_increments_version() {
    let conn = init_db().await;
    let repo = MovieRepository::new(conn);

    let mut movie = repo.get(7).await.unwrap();
    for expected in 4..=6 {
        movie.title = format!("Title v{expected}");
        let new_version = repo.update(&movie).await.unwrap();
        assert_eq!(new_version, movie.version + 1);
        assert_eq!(new_version, expected);
        movie.version = new_version;
    }

    let stored = repo.get(7).await.unwrap();
    assert_eq!(stored.version, 6);
    assert_eq!(stored.title, "Title v6");
    assert_eq!(stored.year, 1999);
}

#[tokio::test]
#[traced_test]
async fn test_movie_update_conflict() {
    let conn = init_db().await;
    let repo = MovieRepository::new(conn);

    let mut first = repo.get(7).await.unwrap();
    let mut second = repo.get(7).await.unwrap();

    UpdateMovie {
        title: Some("Second writer".to_string()),
        ..Default::default()
    }
    .apply_to(&mut second);
    let v = repo.update(&second).await.unwrap();
    assert_eq!(v, 4);

    UpdateMovie {
        year: Some(2001),
        ..Default::default()
    }
    .apply_to(&mut first);
    let err = repo.update(&first).await.unwrap_err();
    assert!(
        matches!(err, Error::EditConflict { id: 7, version: 3 }),
        "unexpected {err}"
    );

    let stored = repo.get(7).await.unwrap();
    assert_eq!(stored.title, "Second writer");
    assert_eq!(stored.year, 1999);
    assert_eq!(stored.version, 4);
}

#[tokio::test]
async fn test_movie_update_deleted() {
    let conn = init_db().await;
    let repo = MovieRepository::new(conn);

    let movie = repo.get(8).await.unwrap();
    repo.delete(8).await.unwrap();
    let err = repo.update(&movie).await.unwrap_err();
    assert!(matches!(err, Error::EditConflict { id: 8, .. }));
}

#[tokio::test]
async fn test_movie_delete() {
    let conn = init_db().await;
    let repo = MovieRepository::new(conn);

    repo.delete(7).await.unwrap();
    assert!(matches!(
        repo.get(7).await.unwrap_err(),
        Error::RecordNotFound(_)
    ));
    assert!(matches!(
        repo.delete(7).await.unwrap_err(),
        Error::RecordNotFound(_)
    ));
    assert!(matches!(
        repo.delete(0).await.unwrap_err(),
        Error::RecordNotFound(_)
    ));
}

#[tokio::test]
async fn test_movie_deadline() {
    let conn = init_db().await;
    // Hold the only connection so the repository cannot acquire one.
    let _busy = conn.acquire().await.unwrap();
    let repo = MovieRepositoryImpl::with_deadline(conn.clone(), Duration::from_millis(50));

    let err = repo.get(7).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)));
}

/// File database with a second connection that can hold the write lock.
async fn init_file_db(dir: &tempfile::TempDir) -> flicks_dal::Pool {
    let url = format!("sqlite://{}", dir.path().join("movies.db").display());
    let config = PoolConfig {
        max_connections: 2,
        ..Default::default()
    };
    let pool = flicks_dal::new_pool(&url, &config).await.unwrap();
    flicks_dal::migrate(&pool).await.unwrap();
    pool.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    pool
}

#[tokio::test]
#[traced_test]
async fn test_movie_update_timeout_is_not_applied() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_file_db(&dir).await;
    let repo = MovieRepositoryImpl::with_deadline(pool.clone(), Duration::from_millis(200));

    let mut movie = repo.get(7).await.unwrap();
    movie.title = "New".to_string();

    let mut blocker = pool.acquire().await.unwrap();
    blocker.execute("BEGIN IMMEDIATE").await.unwrap();

    let err = repo.update(&movie).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(200)), "{err}");

    blocker.execute("COMMIT").await.unwrap();
    drop(blocker);
    // let the cut off statement get the lock and finish
    tokio::time::sleep(Duration::from_millis(500)).await;

    let repo = MovieRepository::new(pool);
    let stored = repo.get(7).await.unwrap();
    assert_eq!(stored.title, "Old");
    assert_eq!(stored.version, 3);

    // the record is still writable at its old version
    let new_version = repo.update(&movie).await.unwrap();
    assert_eq!(new_version, 4);
}

#[tokio::test]
async fn test_movie_create_and_delete_timeout_are_not_applied() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_file_db(&dir).await;
    let repo = MovieRepositoryImpl::with_deadline(pool.clone(), Duration::from_millis(200));

    let mut blocker = pool.acquire().await.unwrap();
    blocker.execute("BEGIN IMMEDIATE").await.unwrap();

    let err = repo.create(new_movie("Inception")).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "{err}");

    blocker.execute("COMMIT").await.unwrap();
    blocker.execute("BEGIN IMMEDIATE").await.unwrap();

    let err = repo.delete(8).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "{err}");

    blocker.execute("COMMIT").await.unwrap();
    drop(blocker);
    tokio::time::sleep(Duration::from_millis(500)).await;

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM movies")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
    let repo = MovieRepository::new(pool);
    assert_eq!(repo.get(8).await.unwrap().title, "Moana");
}
