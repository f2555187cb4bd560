//! Agent and project persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

use engram_types::{Agent, Project};

use crate::error::{Result, StoreError};

use super::MemoryStore;

impl MemoryStore {
    /// Save or update an agent (idempotent upsert by id).
    pub fn save_agent(&self, agent: &Agent) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO agents (id, name, definition_path, signing_key, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition_path = excluded.definition_path,
                signing_key = excluded.signing_key
            "#,
            params![
                agent.id,
                agent.name,
                agent.definition_path.as_ref().map(|p| p.display().to_string()),
                agent.signing_key,
                agent.created_at.unwrap_or_else(Utc::now).to_rfc3339(),
            ],
        )?;

        debug!("Saved agent {}", agent.id);
        Ok(())
    }

    /// Get an agent by id.
    pub fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, name, definition_path, signing_key, created_at FROM agents WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![agent_id])?;

        if let Some(row) = rows.next()? {
            let definition_path: Option<String> = row.get(2)?;
            Ok(Some(Agent {
                id: row.get(0)?,
                name: row.get(1)?,
                definition_path: definition_path.map(PathBuf::from),
                signing_key: row.get(3)?,
                created_at: Some(parse_timestamp(&row.get::<_, String>(4)?)?),
            }))
        } else {
            Ok(None)
        }
    }

    /// Save or update a project.
    ///
    /// Project paths are unique independent of the id. If the path already
    /// belongs to a different project id, the write reconciles to the
    /// existing id and updates only the name — it never fails on the
    /// conflict. This covers the case where a caller re-derives a project id
    /// from a folder name that differs from the originally registered one.
    pub fn save_project(&self, project: &Project) -> Result<()> {
        if let Some(existing) = self.get_project_by_path(&project.path)? {
            if existing.id != project.id {
                let conn = self.conn.lock().unwrap();
                conn.execute(
                    "UPDATE projects SET name = ?2 WHERE id = ?1",
                    params![existing.id, project.name],
                )?;
                debug!(
                    "Project path {:?} already registered as '{}', updated name only",
                    project.path, existing.id
                );
                return Ok(());
            }
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO projects (id, name, path, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                path = excluded.path
            "#,
            params![
                project.id,
                project.name,
                project.path.display().to_string(),
                project.created_at.unwrap_or_else(Utc::now).to_rfc3339(),
            ],
        )?;

        debug!("Saved project {}", project.id);
        Ok(())
    }

    /// Get a project by id.
    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT id, name, path, created_at FROM projects WHERE id = ?1")?;
        let mut rows = stmt.query(params![project_id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_project(row)?))
        } else {
            Ok(None)
        }
    }

    /// Get a project by its filesystem path.
    pub fn get_project_by_path(&self, path: &Path) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT id, name, path, created_at FROM projects WHERE path = ?1")?;
        let mut rows = stmt.query(params![path.display().to_string()])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_project(row)?))
        } else {
            Ok(None)
        }
    }

    fn row_to_project(row: &rusqlite::Row) -> Result<Project> {
        let path: String = row.get(2)?;
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            path: PathBuf::from(path),
            created_at: Some(parse_timestamp(&row.get::<_, String>(3)?)?),
        })
    }
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> MemoryStore {
        MemoryStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_agent_upsert_and_get() {
        let store = create_test_store();

        assert!(store.get_agent("anima").unwrap().is_none());

        let agent = Agent::new("anima", "Anima").with_signing_key("secret");
        store.save_agent(&agent).unwrap();

        let fetched = store.get_agent("anima").unwrap().unwrap();
        assert_eq!(fetched.name, "Anima");
        assert_eq!(fetched.signing_key.as_deref(), Some("secret"));
        assert!(fetched.created_at.is_some());

        // Upsert with new name is idempotent by id
        let renamed = Agent::new("anima", "Anima II");
        store.save_agent(&renamed).unwrap();

        let fetched = store.get_agent("anima").unwrap().unwrap();
        assert_eq!(fetched.name, "Anima II");
        assert!(fetched.signing_key.is_none());
    }

    #[test]
    fn test_project_upsert_and_get() {
        let store = create_test_store();

        let project = Project::new("Engram", "/src/engram");
        store.save_project(&project).unwrap();

        let fetched = store.get_project("engram").unwrap().unwrap();
        assert_eq!(fetched.name, "Engram");
        assert_eq!(fetched.path, PathBuf::from("/src/engram"));

        let by_path = store
            .get_project_by_path(Path::new("/src/engram"))
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, "engram");
    }

    #[test]
    fn test_project_path_reconciliation() {
        let store = create_test_store();

        let first = Project {
            id: "ltm".to_string(),
            name: "LTM".to_string(),
            path: PathBuf::from("/some/project/path"),
            created_at: None,
        };
        store.save_project(&first).unwrap();

        // Same path, different candidate id (e.g. re-slugged folder name)
        let second = Project {
            id: "project-path".to_string(),
            name: "Project Path".to_string(),
            path: PathBuf::from("/some/project/path"),
            created_at: None,
        };
        store.save_project(&second).unwrap();

        let by_path = store
            .get_project_by_path(Path::new("/some/project/path"))
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, "ltm"); // keeps the original id
        assert_eq!(by_path.name, "Project Path"); // takes the newer name

        assert!(store.get_project("project-path").unwrap().is_none());
    }
}
