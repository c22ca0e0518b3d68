//! SQLite-backed document store
//!
//! Holds the three persisted collections in a single database file.
//! Embeddings are stored as little-endian f32 BLOBs. The skills-gate
//! aggregation runs in SQL so the cap applies before rows cross the
//! boundary.

use super::{ChunkRecord, DocumentStore, ExperienceEntry, ProfileRecord, SkillMatch};
use crate::error::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

const CREATE_TABLES: &str = r#"
-- Per-candidate canonical skills with extraction confidence
CREATE TABLE IF NOT EXISTS resume_skills (
    resume_id TEXT NOT NULL,
    skill_canonical TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    PRIMARY KEY (resume_id, skill_canonical)
);

CREATE INDEX IF NOT EXISTS idx_resume_skills_skill
    ON resume_skills(skill_canonical);

-- Resume text chunks with optional embeddings
CREATE TABLE IF NOT EXISTS resume_chunks (
    chunk_id TEXT PRIMARY KEY,
    resume_id TEXT NOT NULL,
    section_type TEXT NOT NULL DEFAULT '',
    section_ordinal INTEGER NOT NULL DEFAULT 0,
    chunk_text TEXT NOT NULL,
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_resume_chunks_resume
    ON resume_chunks(resume_id);

-- Core profile data for enrichment
CREATE TABLE IF NOT EXISTS resumes_core (
    resume_id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    total_yoe INTEGER NOT NULL DEFAULT 0,
    location_country TEXT NOT NULL DEFAULT '',
    location_city TEXT NOT NULL DEFAULT '',
    experience TEXT NOT NULL DEFAULT '[]'
);
"#;

/// SQLite store handle, shareable across requests
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (tests and fixtures)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(CREATE_TABLES)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-statement; propagating the
        // panic is the only sound option.
        self.conn.lock().expect("sqlite store lock poisoned")
    }

    /// Upsert one skill row
    pub fn insert_skill(&self, resume_id: &str, skill_canonical: &str, confidence: f64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO resume_skills (resume_id, skill_canonical, confidence)
             VALUES (?1, ?2, ?3)",
            params![resume_id, skill_canonical, confidence],
        )?;
        Ok(())
    }

    /// Upsert one chunk row
    pub fn insert_chunk(&self, chunk: &ChunkRecord) -> Result<()> {
        let conn = self.lock();
        let embedding_bytes = chunk.embedding.as_deref().map(embedding_to_bytes);
        conn.execute(
            "INSERT OR REPLACE INTO resume_chunks
                 (chunk_id, resume_id, section_type, section_ordinal, chunk_text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.chunk_id,
                chunk.candidate_id,
                chunk.section_type,
                chunk.section_ordinal,
                chunk.chunk_text,
                embedding_bytes,
            ],
        )?;
        Ok(())
    }

    /// Upsert one core profile row
    pub fn insert_profile(
        &self,
        resume_id: &str,
        name: &str,
        summary: &str,
        total_yoe: u32,
        location_country: &str,
        location_city: &str,
        experience: &[ExperienceEntry],
    ) -> Result<()> {
        let conn = self.lock();
        let experience_json = serde_json::to_string(experience)?;
        conn.execute(
            "INSERT OR REPLACE INTO resumes_core
                 (resume_id, name, summary, total_yoe, location_country, location_city, experience)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                resume_id,
                name,
                summary,
                total_yoe,
                location_country,
                location_city,
                experience_json,
            ],
        )?;
        Ok(())
    }

    /// Number of stored chunks (status reporting)
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resume_chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn search_skills(
        &self,
        skills: &[String],
        min_match: usize,
        limit: usize,
    ) -> Result<Vec<SkillMatch>> {
        if skills.is_empty() {
            return Ok(vec![]);
        }

        let placeholders = (1..=skills.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT resume_id,
                    GROUP_CONCAT(skill_canonical, char(31)) AS matched,
                    COUNT(*) AS matched_count,
                    AVG(confidence) AS avg_confidence
             FROM resume_skills
             WHERE skill_canonical IN ({placeholders})
             GROUP BY resume_id
             HAVING matched_count >= ?{min_param}
             ORDER BY matched_count DESC, avg_confidence DESC
             LIMIT ?{limit_param}",
            min_param = skills.len() + 1,
            limit_param = skills.len() + 2,
        );

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = skills
            .iter()
            .map(|s| Box::new(s.clone()) as Box<dyn rusqlite::ToSql>)
            .collect();
        params_vec.push(Box::new(min_match.max(1) as i64));
        params_vec.push(Box::new(limit as i64));

        let matches = stmt
            .query_map(
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| {
                    let matched: String = row.get(1)?;
                    let matched_count: i64 = row.get(2)?;
                    Ok(SkillMatch {
                        candidate_id: row.get(0)?,
                        matched_skills: matched
                            .split('\u{1f}')
                            .filter(|s| !s.is_empty())
                            .map(|s| s.to_string())
                            .collect(),
                        matched_count: matched_count as usize,
                        avg_confidence: row.get(3)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(matches)
    }

    async fn fetch_chunks(
        &self,
        candidate_ids: Option<&[String]>,
        with_embeddings: bool,
    ) -> Result<Vec<ChunkRecord>> {
        let columns = if with_embeddings {
            "chunk_id, resume_id, section_type, section_ordinal, chunk_text, embedding"
        } else {
            "chunk_id, resume_id, section_type, section_ordinal, chunk_text, NULL"
        };

        let mut sql = format!("SELECT {columns} FROM resume_chunks");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ids) = candidate_ids {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            let placeholders = (1..=ids.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE resume_id IN ({placeholders})"));
            params_vec.extend(
                ids.iter()
                    .map(|id| Box::new(id.clone()) as Box<dyn rusqlite::ToSql>),
            );
        }

        // Natural storage order; lexical ties are broken by this order
        sql.push_str(" ORDER BY rowid");

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| {
                    let embedding_bytes: Option<Vec<u8>> = row.get(5)?;
                    Ok(ChunkRecord {
                        chunk_id: row.get(0)?,
                        candidate_id: row.get(1)?,
                        section_type: row.get(2)?,
                        section_ordinal: row.get::<_, i64>(3)? as u32,
                        chunk_text: row.get(4)?,
                        embedding: embedding_bytes.as_deref().map(bytes_to_embedding),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(chunks)
    }

    async fn fetch_profiles(&self, candidate_ids: &[String]) -> Result<Vec<ProfileRecord>> {
        if candidate_ids.is_empty() {
            return Ok(vec![]);
        }

        let placeholders = (1..=candidate_ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT resume_id, name, summary, total_yoe, location_country, location_city, experience
             FROM resumes_core
             WHERE resume_id IN ({placeholders})"
        );

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let profiles = stmt
            .query_map(
                rusqlite::params_from_iter(candidate_ids.iter()),
                |row| {
                    let experience_json: String = row.get(6)?;
                    Ok((
                        ProfileRecord {
                            candidate_id: row.get(0)?,
                            name: row.get(1)?,
                            summary: row.get(2)?,
                            total_yoe: row.get::<_, i64>(3)? as u32,
                            location_country: row.get(4)?,
                            location_city: row.get(5)?,
                            headline: String::new(),
                        },
                        experience_json,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(profiles
            .into_iter()
            .map(|(mut profile, experience_json)| {
                let experience: Vec<ExperienceEntry> =
                    serde_json::from_str(&experience_json).unwrap_or_default();
                profile.headline = super::make_headline(&experience);
                profile
            })
            .collect())
    }
}

/// Encode an embedding as little-endian f32 bytes
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back to an embedding
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, candidate: &str, text: &str, embedding: Option<Vec<f32>>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: id.into(),
            candidate_id: candidate.into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: text.into(),
            embedding,
        }
    }

    #[test]
    fn test_embedding_roundtrip() {
        let embedding = vec![0.25_f32, -1.5, 3.125];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&embedding)), embedding);
    }

    #[tokio::test]
    async fn test_skills_gate_ordering_and_threshold() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_skill("c1", "python", 0.9).unwrap();
        store.insert_skill("c2", "python", 0.8).unwrap();
        store.insert_skill("c2", "django", 0.7).unwrap();
        store.insert_skill("c3", "rust", 0.99).unwrap();

        let skills = vec!["python".to_string(), "django".to_string()];
        let matches = store.search_skills(&skills, 1, 10).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].candidate_id, "c2");
        assert_eq!(matches[0].matched_count, 2);
        assert!(matches[0].matched_skills.contains(&"django".to_string()));
        assert_eq!(matches[1].candidate_id, "c1");

        // min_match 2 drops the single-skill candidate
        let strict = store.search_skills(&skills, 2, 10).await.unwrap();
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].candidate_id, "c2");
    }

    #[tokio::test]
    async fn test_fetch_chunks_filter_and_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_chunk(&chunk("k1", "c1", "python developer", None)).unwrap();
        store
            .insert_chunk(&chunk("k2", "c2", "marketing lead", Some(vec![1.0, 0.0])))
            .unwrap();
        store.insert_chunk(&chunk("k3", "c1", "built APIs", None)).unwrap();

        let all = store.fetch_chunks(None, false).await.unwrap();
        assert_eq!(
            all.iter().map(|c| c.chunk_id.as_str()).collect::<Vec<_>>(),
            vec!["k1", "k2", "k3"]
        );
        assert!(all.iter().all(|c| c.embedding.is_none()));

        let gated = store
            .fetch_chunks(Some(&["c2".to_string()]), true)
            .await
            .unwrap();
        assert_eq!(gated.len(), 1);
        assert_eq!(gated[0].embedding, Some(vec![1.0, 0.0]));

        let empty_gate = store.fetch_chunks(Some(&[]), true).await.unwrap();
        assert!(empty_gate.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_profiles_headline() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_profile(
                "c1",
                "Dana",
                "Marketer with SEO background",
                6,
                "NL",
                "Amsterdam",
                &[ExperienceEntry {
                    title: "SEO Specialist".into(),
                    company: "Acme".into(),
                }],
            )
            .unwrap();

        let profiles = store.fetch_profiles(&["c1".to_string()]).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].headline, "SEO Specialist at Acme");
        assert_eq!(profiles[0].total_yoe, 6);
    }
}
