use std::{collections::HashSet, future::Future, time::Duration};

use flicks_types::Runtime;
use garde::Validate;
use serde::{ser::SerializeStruct as _, Deserialize, Serialize, Serializer};
use sqlx::{Acquire as _, Row as _};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    error::{Error, Result},
    ChosenDB, ChosenRow,
};

pub const MIN_YEAR: i32 = 1888;
pub const MAX_GENRES: usize = 5;

/// Default deadline for a single repository operation.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(3);

fn validate_year(year: &i32, _ctx: &()) -> garde::Result {
    if *year == 0 {
        return Err(garde::Error::new("must be provided"));
    }
    if *year < MIN_YEAR {
        return Err(garde::Error::new(format!(
            "must not be earlier than {MIN_YEAR}"
        )));
    }
    if *year > OffsetDateTime::now_utc().year() {
        return Err(garde::Error::new("must not be in the future"));
    }
    Ok(())
}

fn validate_runtime(runtime: &Option<Runtime>, _ctx: &()) -> garde::Result {
    match runtime {
        Some(runtime) if runtime.is_zero() => Err(garde::Error::new("must be a positive integer")),
        _ => Ok(()),
    }
}

fn validate_genres(genres: &[String], _ctx: &()) -> garde::Result {
    if genres.is_empty() {
        return Err(garde::Error::new("must contain at least 1 genre"));
    }
    if genres.len() > MAX_GENRES {
        return Err(garde::Error::new(format!(
            "must not contain more than {MAX_GENRES} genres"
        )));
    }
    let mut seen = HashSet::with_capacity(genres.len());
    if !genres.iter().all(|g| seen.insert(g.as_str())) {
        return Err(garde::Error::new("must not contain duplicate values"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct Movie {
    #[garde(skip)]
    pub id: i64,
    #[garde(skip)]
    pub created_at: OffsetDateTime,
    #[garde(length(min = 1, max = 500))]
    pub title: String,
    #[garde(custom(validate_year))]
    pub year: i32,
    #[garde(custom(validate_runtime))]
    pub runtime: Option<Runtime>,
    #[garde(custom(validate_genres), inner(length(min = 1, max = 50)))]
    pub genres: Vec<String>,
    #[garde(skip)]
    pub version: i64,
}

impl Serialize for Movie {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let runtime = self.runtime.filter(|r| !r.is_zero());
        let len = 3
            + usize::from(self.year != 0)
            + usize::from(runtime.is_some())
            + usize::from(!self.genres.is_empty());

        let mut s = serializer.serialize_struct("Movie", len)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("title", &self.title)?;
        if self.year != 0 {
            s.serialize_field("year", &self.year)?;
        } else {
            s.skip_field("year")?;
        }
        match runtime {
            Some(runtime) => s.serialize_field("runtime", &runtime)?,
            None => s.skip_field("runtime")?,
        }
        if !self.genres.is_empty() {
            s.serialize_field("genres", &self.genres)?;
        } else {
            s.skip_field("genres")?;
        }
        s.serialize_field("version", &self.version)?;
        s.end()
    }
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> std::result::Result<Self, sqlx::Error> {
        let runtime = row
            .try_get::<Option<i64>, _>("runtime")?
            .map(|minutes| u32::try_from(minutes).map(Runtime::from_minutes))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "runtime".to_string(),
                source: Box::new(e),
            })?;
        let genres: String = row.try_get("genres")?;
        let genres = serde_json::from_str(&genres).map_err(|e| sqlx::Error::ColumnDecode {
            index: "genres".to_string(),
            source: Box::new(e),
        })?;
        Ok(Movie {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            runtime,
            genres,
            version: row.try_get("version")?,
        })
    }
}

/// Input for a new record. Missing fields default to empty values and are
/// then caught by validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateMovie {
    #[serde(default)]
    #[garde(length(min = 1, max = 500))]
    pub title: String,
    #[serde(default)]
    #[garde(custom(validate_year))]
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(custom(validate_runtime))]
    pub runtime: Option<Runtime>,
    #[serde(default)]
    #[garde(custom(validate_genres), inner(length(min = 1, max = 50)))]
    pub genres: Vec<String>,
}

/// Sparse patch: `None` leaves the stored value alone, `Some` replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovie {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

impl UpdateMovie {
    pub fn apply_to(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = Some(runtime);
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
    }
}

const SELECT_ONE: &str =
    "SELECT id, created_at, title, year, runtime, genres, version FROM movies WHERE id = ?";
const INSERT: &str = "INSERT INTO movies (created_at, title, year, runtime, genres, version) \
    VALUES (?, ?, ?, ?, ?, 1) RETURNING id, version";
const UPDATE: &str = "UPDATE movies SET title = ?, year = ?, runtime = ?, genres = ?, \
    version = version + 1 WHERE id = ? AND version = ? RETURNING version";
const DELETE: &str = "DELETE FROM movies WHERE id = ?";

fn not_found(id: i64) -> Error {
    Error::RecordNotFound(format!("Movie {id}"))
}

pub type MovieRepository = MovieRepositoryImpl<crate::Pool>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
    deadline: Duration,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = ChosenDB> + sqlx::Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self::with_deadline(executor, DEFAULT_DEADLINE)
    }

    pub fn with_deadline(executor: E, deadline: Duration) -> Self {
        Self { executor, deadline }
    }

    /// Runs `operation` under the repository deadline.
    async fn bounded<T, X, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, X>>,
        Error: From<X>,
    {
        match tokio::time::timeout(self.deadline, operation).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout(self.deadline)),
        }
    }

    /// Writes run inside a transaction and only the statement is bounded by the
    /// deadline. The commit is issued only when the statement finished in time;
    /// on expiry the transaction is dropped and its rollback discards whatever
    /// the cut off statement still does.
    pub async fn create(&self, payload: CreateMovie) -> Result<Movie> {
        let created_at = OffsetDateTime::now_utc();
        let genres = serde_json::to_string(&payload.genres)?;
        let runtime = payload.runtime.map(|r| i64::from(r.minutes()));
        let (tx, (id, version)) = self
            .bounded(async {
                let mut tx = self.executor.begin().await?;
                let row: (i64, i64) = sqlx::query_as(INSERT)
                    .bind(created_at)
                    .bind(&payload.title)
                    .bind(payload.year)
                    .bind(runtime)
                    .bind(&genres)
                    .fetch_one(&mut *tx)
                    .await?;
                Ok::<_, sqlx::Error>((tx, row))
            })
            .await?;
        tx.commit().await?;

        Ok(Movie {
            id,
            created_at,
            title: payload.title,
            year: payload.year,
            runtime: payload.runtime,
            genres: payload.genres,
            version,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(not_found(id));
        }
        let record = self
            .bounded(
                sqlx::query_as::<_, Movie>(SELECT_ONE)
                    .bind(id)
                    .fetch_optional(&self.executor),
            )
            .await?;
        record.ok_or_else(|| not_found(id))
    }

    /// Writes all mutable fields, but only if the stored version still equals
    /// `movie.version`. Returns the new version.
    pub async fn update(&self, movie: &Movie) -> Result<i64> {
        let genres = serde_json::to_string(&movie.genres)?;
        let runtime = movie.runtime.map(|r| i64::from(r.minutes()));
        let (tx, new_version) = self
            .bounded(async {
                let mut tx = self.executor.begin().await?;
                let new_version: Option<i64> = sqlx::query_scalar(UPDATE)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(runtime)
                    .bind(&genres)
                    .bind(movie.id)
                    .bind(movie.version)
                    .fetch_optional(&mut *tx)
                    .await?;
                Ok::<_, sqlx::Error>((tx, new_version))
            })
            .await?;

        match new_version {
            Some(version) => {
                tx.commit().await?;
                Ok(version)
            }
            None => {
                tx.rollback().await?;
                debug!(
                    "Update of movie {} at version {} matched no row",
                    movie.id, movie.version
                );
                Err(Error::EditConflict {
                    id: movie.id,
                    version: movie.version,
                })
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(not_found(id));
        }
        let (tx, res) = self
            .bounded(async {
                let mut tx = self.executor.begin().await?;
                let res = sqlx::query(DELETE).bind(id).execute(&mut *tx).await?;
                Ok::<_, sqlx::Error>((tx, res))
            })
            .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            Err(not_found(id))
        } else {
            tx.commit().await?;
            Ok(())
        }
    }
}
