//! # Quiz Storage
//!
//! SQLite persistence for extracted quizzes and user attempts, via `sqlx`.
//! The quiz identifier (short code or full start parameter) is the natural key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::types::Quiz;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("stored quiz data is not valid JSON")]
    Corrupt(#[from] serde_json::Error),

    #[error("quiz '{0}' not found")]
    QuizNotFound(String),
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizRecord {
    pub id: i64,
    pub quiz_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub question_count: i64,
    pub raw_data: Option<String>,
    pub formatted_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: i64,
}

impl QuizRecord {
    /// The structured quiz kept in `raw_data`, if any.
    pub fn quiz(&self) -> Result<Option<Quiz>, StoreError> {
        match self.raw_data.as_deref() {
            Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(raw)?)),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: Option<String>,
    pub score: i64,
    pub max_score: i64,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS quiz (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quiz_id TEXT NOT NULL UNIQUE,
        title TEXT,
        author TEXT,
        description TEXT,
        question_count INTEGER NOT NULL DEFAULT 0,
        raw_data TEXT,
        formatted_data TEXT,
        created_at TEXT NOT NULL,
        last_accessed TEXT NOT NULL,
        access_count INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quiz_attempt (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quiz_id INTEGER NOT NULL REFERENCES quiz(id) ON DELETE CASCADE,
        user_id TEXT,
        score INTEGER NOT NULL DEFAULT 0,
        max_score INTEGER NOT NULL DEFAULT 0,
        completed BOOLEAN NOT NULL DEFAULT 0,
        started_at TEXT NOT NULL,
        completed_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_quiz_last_accessed ON quiz(last_accessed)",
];

const QUIZ_COLUMNS: &str = "id, quiz_id, title, author, description, question_count, raw_data, \
                            formatted_data, created_at, last_accessed, access_count";

const ATTEMPT_COLUMNS: &str =
    "id, quiz_id, user_id, score, max_score, completed, started_at, completed_at";

#[derive(Clone)]
pub struct QuizStore {
    pool: SqlitePool,
}

impl QuizStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("Connected to quiz database at {}", url);
        Ok(store)
    }

    /// A private in-memory database; a single connection keeps it alive and shared.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get_quiz(&self, quiz_id: &str) -> Result<Option<QuizRecord>, StoreError> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quiz WHERE quiz_id = ?");
        Ok(sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Inserts a new quiz or refreshes an existing one. Refreshing counts as an access.
    pub async fn save_quiz(
        &self,
        quiz_id: &str,
        quiz: &Quiz,
        formatted: &str,
    ) -> Result<QuizRecord, StoreError> {
        let raw = serde_json::to_string(quiz)?;
        let now = Utc::now();

        let existing = self.get_quiz(quiz_id).await?;
        if existing.is_some() {
            tracing::info!("Updating existing quiz: {}", quiz_id);
            sqlx::query(
                "UPDATE quiz SET title = ?, author = ?, description = ?, question_count = ?, \
                 raw_data = ?, formatted_data = ?, last_accessed = ?, \
                 access_count = access_count + 1 WHERE quiz_id = ?",
            )
            .bind(&quiz.title)
            .bind(&quiz.author)
            .bind(&quiz.description)
            .bind(quiz.question_count() as i64)
            .bind(&raw)
            .bind(formatted)
            .bind(now)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        } else {
            tracing::info!("Creating new quiz: {}", quiz_id);
            sqlx::query(
                "INSERT INTO quiz (quiz_id, title, author, description, question_count, \
                 raw_data, formatted_data, created_at, last_accessed, access_count) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            )
            .bind(quiz_id)
            .bind(&quiz.title)
            .bind(&quiz.author)
            .bind(&quiz.description)
            .bind(quiz.question_count() as i64)
            .bind(&raw)
            .bind(formatted)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }

        self.get_quiz(quiz_id)
            .await?
            .ok_or_else(|| StoreError::QuizNotFound(quiz_id.to_string()))
    }

    /// Bumps the access counter and timestamp.
    pub async fn touch(&self, quiz_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE quiz SET access_count = access_count + 1, last_accessed = ? WHERE quiz_id = ?",
        )
        .bind(Utc::now())
        .bind(quiz_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::QuizNotFound(quiz_id.to_string()));
        }
        Ok(())
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<QuizRecord>, StoreError> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quiz ORDER BY last_accessed DESC, id DESC LIMIT ?"
        );
        Ok(sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn popular(&self, limit: i64) -> Result<Vec<QuizRecord>, StoreError> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quiz ORDER BY access_count DESC, id ASC LIMIT ?"
        );
        Ok(sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Case-insensitive substring match over title and stored content.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<QuizRecord>, StoreError> {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quiz \
             WHERE title LIKE ?1 OR raw_data LIKE ?1 OR formatted_data LIKE ?1 \
             ORDER BY last_accessed DESC LIMIT ?2"
        );
        Ok(sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Returns whether a quiz was deleted.
    pub async fn delete_quiz(&self, quiz_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM quiz WHERE quiz_id = ?")
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_attempt(
        &self,
        quiz_id: &str,
        user_id: Option<&str>,
    ) -> Result<QuizAttempt, StoreError> {
        let quiz = self
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| StoreError::QuizNotFound(quiz_id.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO quiz_attempt (quiz_id, user_id, score, max_score, completed, started_at) \
             VALUES (?, ?, 0, ?, 0, ?)",
        )
        .bind(quiz.id)
        .bind(user_id)
        .bind(quiz.question_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_attempt(id)
            .await?
            .ok_or_else(|| StoreError::QuizNotFound(quiz_id.to_string()))
    }

    pub async fn get_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, StoreError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempt WHERE id = ?");
        Ok(sqlx::query_as::<_, QuizAttempt>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Updates score and/or completion. Completing stamps `completed_at`.
    pub async fn update_attempt(
        &self,
        id: i64,
        score: Option<i64>,
        completed: Option<bool>,
    ) -> Result<Option<QuizAttempt>, StoreError> {
        if self.get_attempt(id).await?.is_none() {
            return Ok(None);
        }

        if let Some(score) = score {
            sqlx::query("UPDATE quiz_attempt SET score = ? WHERE id = ?")
                .bind(score)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        if let Some(completed) = completed {
            let completed_at = completed.then(Utc::now);
            sqlx::query("UPDATE quiz_attempt SET completed = ?, completed_at = ? WHERE id = ?")
                .bind(completed)
                .bind(completed_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        self.get_attempt(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Question, QuizOption};

    fn quiz(title: &str, questions: usize) -> Quiz {
        let mut quiz = Quiz::new(title);
        for i in 0..questions {
            quiz.questions.push(Question {
                text: format!("Question {i}"),
                options: vec![QuizOption::correct("yes"), QuizOption::new("no")],
            });
        }
        quiz
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = QuizStore::in_memory().await.unwrap();
        let saved = store.save_quiz("abc", &quiz("Capitals", 2), "text").await.unwrap();
        assert_eq!(saved.quiz_id, "abc");
        assert_eq!(saved.title.as_deref(), Some("Capitals"));
        assert_eq!(saved.question_count, 2);
        assert_eq!(saved.access_count, 0);

        let loaded = store.get_quiz("abc").await.unwrap().unwrap();
        assert_eq!(loaded.quiz().unwrap().unwrap(), quiz("Capitals", 2));
        assert!(store.get_quiz("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resave_updates_and_counts_access() {
        let store = QuizStore::in_memory().await.unwrap();
        store.save_quiz("abc", &quiz("Old", 1), "old").await.unwrap();
        let updated = store.save_quiz("abc", &quiz("New", 3), "new").await.unwrap();

        assert_eq!(updated.title.as_deref(), Some("New"));
        assert_eq!(updated.question_count, 3);
        assert_eq!(updated.formatted_data.as_deref(), Some("new"));
        assert_eq!(updated.access_count, 1);
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_touch_and_popular() {
        let store = QuizStore::in_memory().await.unwrap();
        store.save_quiz("a", &quiz("A", 1), "").await.unwrap();
        store.save_quiz("b", &quiz("B", 1), "").await.unwrap();
        store.touch("b").await.unwrap();
        store.touch("b").await.unwrap();

        let popular = store.popular(10).await.unwrap();
        assert_eq!(popular[0].quiz_id, "b");
        assert_eq!(popular[0].access_count, 2);
        assert!(matches!(
            store.touch("zzz").await,
            Err(StoreError::QuizNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = QuizStore::in_memory().await.unwrap();
        store.save_quiz("a", &quiz("World Capitals", 1), "").await.unwrap();
        store.save_quiz("b", &quiz("Rivers", 1), "mentions capitals").await.unwrap();
        store.save_quiz("c", &quiz("Mountains", 1), "").await.unwrap();

        let hits = store.search("CAPITALS", 10).await.unwrap();
        let mut ids: Vec<_> = hits.iter().map(|r| r.quiz_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_attempts() {
        let store = QuizStore::in_memory().await.unwrap();
        store.save_quiz("abc", &quiz("T", 1), "").await.unwrap();
        let attempt = store.create_attempt("abc", Some("user-1")).await.unwrap();

        assert!(store.delete_quiz("abc").await.unwrap());
        assert!(!store.delete_quiz("abc").await.unwrap());
        assert!(store.get_attempt(attempt.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attempt_lifecycle() {
        let store = QuizStore::in_memory().await.unwrap();
        store.save_quiz("abc", &quiz("T", 4), "").await.unwrap();

        let attempt = store.create_attempt("abc", None).await.unwrap();
        assert_eq!(attempt.max_score, 4);
        assert_eq!(attempt.score, 0);
        assert!(!attempt.completed);
        assert!(attempt.completed_at.is_none());

        let updated = store
            .update_attempt(attempt.id, Some(3), Some(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.score, 3);
        assert!(updated.completed);
        assert!(updated.completed_at.is_some());

        assert!(store.update_attempt(999, Some(1), None).await.unwrap().is_none());
        assert!(matches!(
            store.create_attempt("missing", None).await,
            Err(StoreError::QuizNotFound(_))
        ));
    }
}
