//! SQLite record store implementation

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use tracing::{debug, info};

use super::traits::{History, Person, PersonFace, RecordStore, UnrecognizedFace};
use crate::engine::Embedding;

const HISTORY_KIND: &str = "history";

/// SQLite-based record store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.initialize().await?;

        Ok(store)
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persons (
                name TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One row per assigned face; seq keeps assignment order
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS person_faces (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                person_name TEXT NOT NULL,
                face_id TEXT NOT NULL,
                blob_id TEXT NOT NULL,
                embedding BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_person_faces_person ON person_faces(person_name)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS unrecognized_faces (
                face_id TEXT PRIMARY KEY,
                blob_id TEXT NOT NULL,
                embedding BLOB NOT NULL,
                recognized INTEGER NOT NULL DEFAULT 0,
                person_name TEXT,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                kind TEXT PRIMARY KEY,
                body TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("SQLite database initialized");
        Ok(())
    }

    fn person_face_from_row(row: &SqliteRow) -> Result<PersonFace> {
        let embedding: Vec<u8> = row.get("embedding");
        Ok(PersonFace {
            face_id: row.get("face_id"),
            blob_id: row.get("blob_id"),
            embedding: Embedding::from_bytes(&embedding)?,
        })
    }

    fn unrecognized_from_row(row: &SqliteRow) -> Result<UnrecognizedFace> {
        let embedding: Vec<u8> = row.get("embedding");
        Ok(UnrecognizedFace {
            face_id: row.get("face_id"),
            blob_id: row.get("blob_id"),
            embedding: Embedding::from_bytes(&embedding)?,
            recognized: row.get("recognized"),
            person_name: row.get("person_name"),
            timestamp: row.get("timestamp"),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_person(&self, name: &str) -> Result<Option<Person>> {
        let row = sqlx::query("SELECT name, created_at FROM persons WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let face_rows = sqlx::query(
            r#"
            SELECT face_id, blob_id, embedding
            FROM person_faces
            WHERE person_name = ?
            ORDER BY seq
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let faces = face_rows
            .iter()
            .map(Self::person_face_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Person {
            name: row.get("name"),
            faces,
            created_at: row.get("created_at"),
        }))
    }

    async fn list_persons(&self) -> Result<Vec<Person>> {
        let rows = sqlx::query("SELECT name, created_at FROM persons ORDER BY created_at, rowid")
            .fetch_all(&self.pool)
            .await?;

        let mut persons: Vec<Person> = rows
            .into_iter()
            .map(|row| Person {
                name: row.get("name"),
                faces: Vec::new(),
                created_at: row.get("created_at"),
            })
            .collect();

        let face_rows = sqlx::query(
            r#"
            SELECT person_name, face_id, blob_id, embedding
            FROM person_faces
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for row in &face_rows {
            let owner: String = row.get("person_name");
            if let Some(person) = persons.iter_mut().find(|p| p.name == owner) {
                person.faces.push(Self::person_face_from_row(row)?);
            }
        }

        Ok(persons)
    }

    async fn append_person_face(&self, name: &str, face: &PersonFace, created_at: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO persons (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO person_faces (person_name, face_id, blob_id, embedding)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(&face.face_id)
        .bind(&face.blob_id)
        .bind(face.embedding.to_bytes())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Added face {} to person {}", face.face_id, name);
        Ok(())
    }

    async fn remove_person_face(&self, name: &str, face_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM person_faces WHERE person_name = ? AND face_id = ?")
            .bind(name)
            .bind(face_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_person(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM person_faces WHERE person_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM persons WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_persons(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM person_faces").execute(&mut *tx).await?;
        let result = sqlx::query("DELETE FROM persons").execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn insert_unrecognized(&self, face: &UnrecognizedFace) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO unrecognized_faces (face_id, blob_id, embedding, recognized, person_name, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&face.face_id)
        .bind(&face.blob_id)
        .bind(face.embedding.to_bytes())
        .bind(face.recognized)
        .bind(&face.person_name)
        .bind(face.timestamp)
        .execute(&self.pool)
        .await?;

        debug!("Saved unrecognized face: {}", face.face_id);
        Ok(())
    }

    async fn get_unrecognized(&self, face_id: &str) -> Result<Option<UnrecognizedFace>> {
        let row = sqlx::query(
            r#"
            SELECT face_id, blob_id, embedding, recognized, person_name, timestamp
            FROM unrecognized_faces
            WHERE face_id = ?
            "#,
        )
        .bind(face_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::unrecognized_from_row).transpose()
    }

    async fn list_unrecognized(&self, recognized: bool) -> Result<Vec<UnrecognizedFace>> {
        let rows = sqlx::query(
            r#"
            SELECT face_id, blob_id, embedding, recognized, person_name, timestamp
            FROM unrecognized_faces
            WHERE recognized = ?
            ORDER BY timestamp, rowid
            "#,
        )
        .bind(recognized)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::unrecognized_from_row).collect()
    }

    async fn mark_recognized(&self, face_id: &str, person_name: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE unrecognized_faces SET recognized = 1, person_name = ? WHERE face_id = ?",
        )
        .bind(person_name)
        .bind(face_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unclaim_person_faces(&self, person_name: &str, face_ids: &[String]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut released = 0;

        for face_id in face_ids {
            let result = sqlx::query(
                r#"
                UPDATE unrecognized_faces SET recognized = 0, person_name = NULL
                WHERE face_id = ? AND person_name = ?
                "#,
            )
            .bind(face_id)
            .bind(person_name)
            .execute(&mut *tx)
            .await?;
            released += result.rows_affected();
        }

        tx.commit().await?;
        Ok(released)
    }

    async fn unclaim_all_faces(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE unrecognized_faces SET recognized = 0, person_name = NULL WHERE recognized = 1",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_unrecognized(&self, face_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM unrecognized_faces WHERE face_id = ? AND recognized = 0")
            .bind(face_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_unrecognized(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM unrecognized_faces WHERE recognized = 0")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn load_history(&self) -> Result<Option<History>> {
        let row = sqlx::query("SELECT body FROM history WHERE kind = ?")
            .bind(HISTORY_KIND)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                let history = serde_json::from_str(&body).context("Corrupt history document")?;
                Ok(Some(history))
            }
            None => Ok(None),
        }
    }

    async fn store_history(&self, history: &History) -> Result<()> {
        let body = serde_json::to_string(history)?;
        sqlx::query(
            r#"
            INSERT INTO history (kind, body) VALUES (?, ?)
            ON CONFLICT(kind) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(HISTORY_KIND)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_history(&self) -> Result<bool> {
        let result = sqlx::query("DELETE FROM history WHERE kind = ?")
            .bind(HISTORY_KIND)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn person_face(face_id: &str, blob_id: &str, values: Vec<f32>) -> PersonFace {
        PersonFace {
            face_id: face_id.to_string(),
            blob_id: blob_id.to_string(),
            embedding: Embedding(values),
        }
    }

    fn unrecognized(face_id: &str, timestamp: i64) -> UnrecognizedFace {
        UnrecognizedFace {
            face_id: face_id.to_string(),
            blob_id: format!("blob-{}", face_id),
            embedding: Embedding(vec![0.25, -0.5]),
            recognized: false,
            person_name: None,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_person_faces_keep_order() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("test.db")).await.unwrap();

        store.append_person_face("alice", &person_face("f1", "b1", vec![1.0, 2.0]), 10).await.unwrap();
        store.append_person_face("alice", &person_face("f2", "b2", vec![3.0, 4.0]), 20).await.unwrap();
        store.append_person_face("bob", &person_face("f3", "b3", vec![5.0, 6.0]), 15).await.unwrap();

        let alice = store.get_person("alice").await.unwrap().unwrap();
        assert_eq!(alice.created_at, 10);
        assert_eq!(alice.faces, vec![
            person_face("f1", "b1", vec![1.0, 2.0]),
            person_face("f2", "b2", vec![3.0, 4.0]),
        ]);

        let names: Vec<String> = store.list_persons().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_remove_face_leaves_empty_person() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("test.db")).await.unwrap();

        store.append_person_face("alice", &person_face("f1", "b1", vec![1.0]), 1).await.unwrap();
        assert!(store.remove_person_face("alice", "f1").await.unwrap());
        assert!(!store.remove_person_face("alice", "f1").await.unwrap());

        let alice = store.get_person("alice").await.unwrap().unwrap();
        assert!(alice.faces.is_empty());

        assert!(store.delete_person("alice").await.unwrap());
        assert!(store.get_person("alice").await.unwrap().is_none());
        assert!(!store.delete_person("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_unrecognized_claim_cycle() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("test.db")).await.unwrap();

        store.insert_unrecognized(&unrecognized("u1", 1)).await.unwrap();
        store.insert_unrecognized(&unrecognized("u2", 2)).await.unwrap();

        assert!(store.mark_recognized("u1", "alice").await.unwrap());
        let u1 = store.get_unrecognized("u1").await.unwrap().unwrap();
        assert!(u1.recognized);
        assert_eq!(u1.person_name.as_deref(), Some("alice"));
        assert_eq!(u1.embedding, Embedding(vec![0.25, -0.5]));

        let open: Vec<String> = store.list_unrecognized(false).await.unwrap().into_iter().map(|f| f.face_id).collect();
        assert_eq!(open, vec!["u2"]);

        // Claimed rows are not deletable as unrecognized
        assert!(!store.delete_unrecognized("u1").await.unwrap());

        // Only listed faces still claimed by alice are released
        let ids = vec!["u1".to_string(), "u2".to_string()];
        assert_eq!(store.unclaim_person_faces("bob", &ids).await.unwrap(), 0);
        assert_eq!(store.unclaim_person_faces("alice", &ids[1..]).await.unwrap(), 0);
        assert_eq!(store.unclaim_person_faces("alice", &ids).await.unwrap(), 1);
        let u1 = store.get_unrecognized("u1").await.unwrap().unwrap();
        assert!(!u1.recognized);
        assert!(u1.person_name.is_none());

        assert_eq!(store.delete_all_unrecognized().await.unwrap(), 2);
        assert!(store.get_unrecognized("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_overwrite() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("test.db")).await.unwrap();

        assert!(store.load_history().await.unwrap().is_none());

        let first = History {
            image_history: vec![serde_json::json!({"id": 1})],
            recognized_persons: vec![serde_json::json!("alice")],
            unrecognized_persons: vec![],
        };
        store.store_history(&first).await.unwrap();

        let second = History {
            image_history: vec![],
            recognized_persons: vec![],
            unrecognized_persons: vec![serde_json::json!({"id": "u1"})],
        };
        store.store_history(&second).await.unwrap();
        assert_eq!(store.load_history().await.unwrap(), Some(second));

        assert!(store.remove_history().await.unwrap());
        assert!(!store.remove_history().await.unwrap());
    }
}
