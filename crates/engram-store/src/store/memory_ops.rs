//! Memory CRUD, supersession, and counting.

use chrono::Utc;
use rusqlite::{ToSql, params};
use tracing::debug;

use engram_types::{Memory, MemoryId, MemoryKind, Region};

use crate::backend::MemoryFilter;
use crate::error::{Result, StoreError};
use crate::limits::LimitScope;

use super::MemoryStore;
use super::agent_ops::parse_timestamp;

/// Column list shared by every memory SELECT. Order matches
/// [`MemoryStore::row_to_memory`].
pub(crate) const MEMORY_COLUMNS: &str = "id, agent_id, region, project_id, kind, \
     content, original_content, impact, confidence, \
     created_at, last_accessed, previous_memory_id, \
     version, superseded_by, signature, token_count";

impl MemoryStore {
    /// Save or update a memory (upsert by id).
    ///
    /// For a new id, the configured ceilings are checked first; a violation
    /// yields [`StoreError::LimitExceeded`] and nothing is written. Updates
    /// to an existing id never count against limits.
    ///
    /// Only the mutable fields are rewritten on conflict: content,
    /// confidence, last_accessed, version, superseded_by, signature, and
    /// token_count. Identity, taxonomy, and `original_content` stay as
    /// created.
    pub fn save_memory(&self, memory: &Memory) -> Result<()> {
        self.check_limits(memory)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO memories (
                id, agent_id, region, project_id, kind,
                content, original_content, impact, confidence,
                created_at, last_accessed, previous_memory_id,
                version, superseded_by, signature, token_count
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                confidence = excluded.confidence,
                last_accessed = excluded.last_accessed,
                version = excluded.version,
                superseded_by = excluded.superseded_by,
                signature = excluded.signature,
                token_count = excluded.token_count
            "#,
            params![
                memory.id.to_string(),
                memory.agent_id,
                memory.region.as_str(),
                memory.project_id,
                memory.kind.as_str(),
                memory.content,
                memory.original_content,
                memory.impact.as_str(),
                memory.confidence,
                memory.created_at.to_rfc3339(),
                memory.last_accessed.to_rfc3339(),
                memory.previous_memory_id.map(|id| id.to_string()),
                memory.version,
                memory.superseded_by.map(|id| id.to_string()),
                memory.signature,
                memory.token_count,
            ],
        )?;

        debug!("Saved memory {}", memory.id);
        Ok(())
    }

    /// Check ceilings before creating a new memory. Updates are exempt.
    fn check_limits(&self, memory: &Memory) -> Result<()> {
        let limits = self.limits;
        if limits == crate::MemoryLimits::UNLIMITED {
            return Ok(());
        }

        if self.get_memory(memory.id)?.is_some() {
            return Ok(());
        }

        if let Some(limit) = limits.max_per_agent {
            let current = self.count_memories(&memory.agent_id, None)?;
            if current >= limit {
                return Err(StoreError::LimitExceeded {
                    scope: LimitScope::Agent,
                    current,
                    limit,
                });
            }
        }

        if let (Some(limit), Some(project_id)) = (limits.max_per_project, &memory.project_id) {
            let current = self.count_memories(&memory.agent_id, Some(project_id))?;
            if current >= limit {
                return Err(StoreError::LimitExceeded {
                    scope: LimitScope::Project(project_id.clone()),
                    current,
                    limit,
                });
            }
        }

        if let Some(limit) = limits.max_per_kind {
            let current = self.count_memories_by_kind(
                &memory.agent_id,
                memory.kind,
                memory.project_id.as_deref(),
            )?;
            if current >= limit {
                return Err(StoreError::LimitExceeded {
                    scope: LimitScope::Kind(memory.kind),
                    current,
                    limit,
                });
            }
        }

        Ok(())
    }

    /// Get a memory by id.
    pub fn get_memory(&self, id: MemoryId) -> Result<Option<Memory>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![id.to_string()])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_memory(row)?))
        } else {
            Ok(None)
        }
    }

    /// Get memories for an agent, filtered, ordered newest-created-first.
    ///
    /// When the filter names a project, AGENT-region memories are included
    /// alongside the project-scoped ones: cross-project memories must appear
    /// in every project view.
    pub fn get_memories_for_agent(
        &self,
        agent_id: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<Memory>> {
        let mut sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE agent_id = ?");
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(agent_id.to_string())];

        if let Some(region) = filter.region {
            sql.push_str(" AND region = ?");
            params_vec.push(Box::new(region.as_str().to_string()));
        }

        if let Some(project_id) = &filter.project_id {
            // Agent-wide memories are always visible in a project view
            sql.push_str(" AND (project_id = ? OR region = 'AGENT')");
            params_vec.push(Box::new(project_id.clone()));
        }

        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            params_vec.push(Box::new(kind.as_str().to_string()));
        }

        if !filter.include_superseded {
            sql.push_str(" AND superseded_by IS NULL");
        }

        sql.push_str(" ORDER BY created_at DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(limit as i64));
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let mut rows = stmt.query(params_refs.as_slice())?;

        let mut memories = Vec::new();
        while let Some(row) = rows.next()? {
            memories.push(Self::row_to_memory(row)?);
        }

        Ok(memories)
    }

    /// Most recent active memory of a kind, for threading the
    /// `previous_memory_id` chain at creation time.
    pub fn get_latest_memory_of_kind(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        region: Region,
        project_id: Option<&str>,
    ) -> Result<Option<Memory>> {
        let mut sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memories \
             WHERE agent_id = ? AND kind = ? AND region = ? AND superseded_by IS NULL"
        );
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![
            Box::new(agent_id.to_string()),
            Box::new(kind.as_str().to_string()),
            Box::new(region.as_str().to_string()),
        ];

        if let Some(project_id) = project_id {
            sql.push_str(" AND project_id = ?");
            params_vec.push(Box::new(project_id.to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC LIMIT 1");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let mut rows = stmt.query(params_refs.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_memory(row)?))
        } else {
            Ok(None)
        }
    }

    /// Mark a memory as superseded by another. The new memory is untouched.
    pub fn supersede_memory(&self, old_id: MemoryId, new_id: MemoryId) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE memories SET superseded_by = ?2 WHERE id = ?1",
            params![old_id.to_string(), new_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Memory {old_id}")));
        }

        debug!("Superseded memory {} by {}", old_id, new_id);
        Ok(())
    }

    /// Directly set a memory's confidence score.
    pub fn update_confidence(&self, id: MemoryId, confidence: f64) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE memories SET confidence = ?2 WHERE id = ?1",
            params![id.to_string(), confidence],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Memory {id}")));
        }

        Ok(())
    }

    /// Update `last_accessed` to now (called when a memory is injected).
    pub fn touch_memory(&self, id: MemoryId) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE memories SET last_accessed = ?2 WHERE id = ?1",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Memory {id}")));
        }

        Ok(())
    }

    /// Hard delete a memory. Reserved for superseded husks; superseding is
    /// the normal correction path.
    pub fn delete_memory(&self, id: MemoryId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "DELETE FROM memories WHERE id = ?1",
            params![id.to_string()],
        )?;

        if rows_affected > 0 {
            debug!("Deleted memory {}", id);
        }

        Ok(rows_affected > 0)
    }

    /// Count active (non-superseded) memories for an agent.
    pub fn count_memories(&self, agent_id: &str, project_id: Option<&str>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = if let Some(project_id) = project_id {
            conn.query_row(
                "SELECT COUNT(*) FROM memories \
                 WHERE agent_id = ?1 AND superseded_by IS NULL \
                 AND (project_id = ?2 OR region = 'AGENT')",
                params![agent_id, project_id],
                |row| row.get(0),
            )?
        } else {
            conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE agent_id = ?1 AND superseded_by IS NULL",
                params![agent_id],
                |row| row.get(0),
            )?
        };

        Ok(count as usize)
    }

    /// Count active memories of one kind for an agent.
    pub fn count_memories_by_kind(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        project_id: Option<&str>,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = if let Some(project_id) = project_id {
            conn.query_row(
                "SELECT COUNT(*) FROM memories \
                 WHERE agent_id = ?1 AND kind = ?2 AND superseded_by IS NULL \
                 AND (project_id = ?3 OR region = 'AGENT')",
                params![agent_id, kind.as_str(), project_id],
                |row| row.get(0),
            )?
        } else {
            conn.query_row(
                "SELECT COUNT(*) FROM memories \
                 WHERE agent_id = ?1 AND kind = ?2 AND superseded_by IS NULL",
                params![agent_id, kind.as_str()],
                |row| row.get(0),
            )?
        };

        Ok(count as usize)
    }

    /// Convert a database row to a [`Memory`].
    ///
    /// Expected column order is [`MEMORY_COLUMNS`].
    pub(crate) fn row_to_memory(row: &rusqlite::Row) -> Result<Memory> {
        let id_str: String = row.get(0)?;
        let region_str: String = row.get(2)?;
        let kind_str: String = row.get(4)?;
        let impact_str: String = row.get(7)?;
        let created_at_str: String = row.get(9)?;
        let last_accessed_str: String = row.get(10)?;
        let previous_str: Option<String> = row.get(11)?;
        let superseded_str: Option<String> = row.get(13)?;
        let token_count: Option<i64> = row.get(15)?;

        Ok(Memory {
            id: MemoryId::parse(&id_str)?,
            agent_id: row.get(1)?,
            region: region_str.parse()?,
            project_id: row.get(3)?,
            kind: kind_str.parse()?,
            content: row.get(5)?,
            original_content: row.get(6)?,
            impact: impact_str.parse()?,
            confidence: row.get(8)?,
            created_at: parse_timestamp(&created_at_str)?,
            last_accessed: parse_timestamp(&last_accessed_str)?,
            previous_memory_id: previous_str.as_deref().map(MemoryId::parse).transpose()?,
            version: row.get(12)?,
            superseded_by: superseded_str.as_deref().map(MemoryId::parse).transpose()?,
            signature: row.get(14)?,
            signature_valid: None,
            token_count: token_count.map(|n| n as u32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::MemoryLimits;
    use engram_types::ImpactLevel;

    fn create_test_store() -> MemoryStore {
        MemoryStore::open_in_memory().unwrap()
    }

    fn learning(agent_id: &str, content: &str) -> Memory {
        Memory::new(agent_id, MemoryKind::Learnings, ImpactLevel::Medium, content)
    }

    #[test]
    fn test_memory_round_trip() {
        let store = create_test_store();

        let mut memory = learning("anima", "Use tracing for debugging")
            .in_project("engram")
            .with_confidence(0.9);
        memory.token_count = Some(12);
        store.save_memory(&memory).unwrap();

        let fetched = store.get_memory(memory.id).unwrap().unwrap();
        assert_eq!(fetched.agent_id, "anima");
        assert_eq!(fetched.region, Region::Project);
        assert_eq!(fetched.project_id.as_deref(), Some("engram"));
        assert_eq!(fetched.kind, MemoryKind::Learnings);
        assert_eq!(fetched.content, memory.content);
        assert_eq!(fetched.original_content, memory.original_content);
        assert_eq!(fetched.confidence, 0.9);
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.token_count, Some(12));
        assert!(fetched.superseded_by.is_none());
        assert!(fetched.signature_valid.is_none());
    }

    #[test]
    fn test_update_preserves_original_content() {
        let store = create_test_store();

        let mut memory = learning("anima", "A long observation about the build system");
        store.save_memory(&memory).unwrap();

        memory.content = "Shortened".to_string();
        memory.version += 1;
        store.save_memory(&memory).unwrap();

        let fetched = store.get_memory(memory.id).unwrap().unwrap();
        assert_eq!(fetched.content, "Shortened");
        assert_eq!(
            fetched.original_content,
            "A long observation about the build system"
        );
        assert_eq!(fetched.version, 2);
    }

    #[test]
    fn test_visibility_rule() {
        let store = create_test_store();

        let agent_wide = learning("anima", "agent-wide");
        let in_p = learning("anima", "in project p").in_project("p");
        let in_q = learning("anima", "in project q").in_project("q");
        let other_agent = learning("orin", "someone else's");
        for m in [&agent_wide, &in_p, &in_q, &other_agent] {
            store.save_memory(m).unwrap();
        }

        let visible = store
            .get_memories_for_agent("anima", &MemoryFilter::default().project("p"))
            .unwrap();
        let ids: Vec<MemoryId> = visible.iter().map(|m| m.id).collect();
        assert!(ids.contains(&agent_wide.id));
        assert!(ids.contains(&in_p.id));
        assert!(!ids.contains(&in_q.id));
        assert!(!ids.contains(&other_agent.id));
    }

    #[test]
    fn test_filter_by_region_and_kind() {
        let store = create_test_store();

        store.save_memory(&learning("anima", "a learning")).unwrap();
        store
            .save_memory(&Memory::new(
                "anima",
                MemoryKind::Emotional,
                ImpactLevel::High,
                "prefers terse answers",
            ))
            .unwrap();
        store
            .save_memory(&learning("anima", "project learning").in_project("p"))
            .unwrap();

        let agent_region = store
            .get_memories_for_agent("anima", &MemoryFilter::default().region(Region::Agent))
            .unwrap();
        assert_eq!(agent_region.len(), 2);

        let emotional = store
            .get_memories_for_agent(
                "anima",
                &MemoryFilter::default().kind(MemoryKind::Emotional),
            )
            .unwrap();
        assert_eq!(emotional.len(), 1);
        assert_eq!(emotional[0].content, "prefers terse answers");
    }

    #[test]
    fn test_ordering_newest_first_and_limit() {
        let store = create_test_store();

        for i in 0..5 {
            let mut m = learning("anima", &format!("memory {i}"));
            // Distinct timestamps without sleeping
            m.created_at += chrono::Duration::seconds(i);
            store.save_memory(&m).unwrap();
        }

        let all = store
            .get_memories_for_agent("anima", &MemoryFilter::default())
            .unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "memory 4");
        assert_eq!(all[4].content, "memory 0");

        let limited = store
            .get_memories_for_agent("anima", &MemoryFilter::default().limit(2))
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].content, "memory 4");
    }

    #[test]
    fn test_supersession_scenario() {
        let store = create_test_store();

        let m1 = learning("anima", "Use print for debugging");
        store.save_memory(&m1).unwrap();

        let mut m2 = learning("anima", "Use tracing for debugging").with_previous(m1.id);
        m2.created_at += chrono::Duration::seconds(1);
        store.save_memory(&m2).unwrap();

        store.supersede_memory(m1.id, m2.id).unwrap();

        let active = store
            .get_memories_for_agent("anima", &MemoryFilter::default())
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, m2.id);
        assert_eq!(active[0].previous_memory_id, Some(m1.id));

        let all = store
            .get_memories_for_agent("anima", &MemoryFilter::default().include_superseded())
            .unwrap();
        assert_eq!(all.len(), 2);

        // Superseded memory remains retrievable by id
        let old = store.get_memory(m1.id).unwrap().unwrap();
        assert_eq!(old.superseded_by, Some(m2.id));
    }

    #[test]
    fn test_supersede_not_found() {
        let store = create_test_store();
        let err = store
            .supersede_memory(MemoryId::new(), MemoryId::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_latest_memory_of_kind() {
        let store = create_test_store();

        assert!(
            store
                .get_latest_memory_of_kind("anima", MemoryKind::Learnings, Region::Agent, None)
                .unwrap()
                .is_none()
        );

        let m1 = learning("anima", "first");
        let mut m2 = learning("anima", "second");
        m2.created_at += chrono::Duration::seconds(1);
        store.save_memory(&m1).unwrap();
        store.save_memory(&m2).unwrap();

        let latest = store
            .get_latest_memory_of_kind("anima", MemoryKind::Learnings, Region::Agent, None)
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, m2.id);

        // Superseded memories are skipped
        store.supersede_memory(m2.id, m1.id).unwrap();
        let latest = store
            .get_latest_memory_of_kind("anima", MemoryKind::Learnings, Region::Agent, None)
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, m1.id);
    }

    #[test]
    fn test_update_confidence_and_touch() {
        let store = create_test_store();

        let m = learning("anima", "confident at first");
        store.save_memory(&m).unwrap();

        store.update_confidence(m.id, 0.3).unwrap();
        let fetched = store.get_memory(m.id).unwrap().unwrap();
        assert_eq!(fetched.confidence, 0.3);
        assert!(fetched.is_low_confidence());

        std::thread::sleep(std::time::Duration::from_millis(5));
        store.touch_memory(m.id).unwrap();
        let touched = store.get_memory(m.id).unwrap().unwrap();
        assert!(touched.last_accessed > fetched.last_accessed);

        assert!(store.update_confidence(MemoryId::new(), 0.5).is_err());
        assert!(store.touch_memory(MemoryId::new()).is_err());
    }

    #[test]
    fn test_delete_memory() {
        let store = create_test_store();

        let m = learning("anima", "ephemeral");
        store.save_memory(&m).unwrap();

        assert!(store.delete_memory(m.id).unwrap());
        assert!(store.get_memory(m.id).unwrap().is_none());
        assert!(!store.delete_memory(m.id).unwrap());
    }

    #[test]
    fn test_counts() {
        let store = create_test_store();

        store.save_memory(&learning("anima", "one")).unwrap();
        store
            .save_memory(&learning("anima", "two").in_project("p"))
            .unwrap();
        store
            .save_memory(&Memory::new(
                "anima",
                MemoryKind::Achievements,
                ImpactLevel::Low,
                "shipped",
            ))
            .unwrap();

        assert_eq!(store.count_memories("anima", None).unwrap(), 3);
        // Project view counts project rows plus agent-wide rows
        assert_eq!(store.count_memories("anima", Some("p")).unwrap(), 3);
        assert_eq!(store.count_memories("anima", Some("q")).unwrap(), 2);
        assert_eq!(
            store
                .count_memories_by_kind("anima", MemoryKind::Learnings, None)
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count_memories_by_kind("anima", MemoryKind::Achievements, None)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_agent_limit_enforced() {
        let limits = MemoryLimits {
            max_per_agent: Some(2),
            max_per_project: None,
            max_per_kind: None,
        };
        let store = MemoryStore::open_in_memory_with_limits(limits).unwrap();

        store.save_memory(&learning("anima", "one")).unwrap();
        store.save_memory(&learning("anima", "two")).unwrap();

        let err = store.save_memory(&learning("anima", "three")).unwrap_err();
        match err {
            StoreError::LimitExceeded {
                scope,
                current,
                limit,
            } => {
                assert_eq!(scope, LimitScope::Agent);
                assert_eq!(current, 2);
                assert_eq!(limit, 2);
            }
            other => panic!("expected LimitExceeded, got {other:?}"),
        }

        // Other agents are unaffected
        store.save_memory(&learning("orin", "fine")).unwrap();
    }

    #[test]
    fn test_project_and_kind_limits_enforced() {
        let limits = MemoryLimits {
            max_per_agent: None,
            max_per_project: Some(1),
            max_per_kind: None,
        };
        let store = MemoryStore::open_in_memory_with_limits(limits).unwrap();

        store
            .save_memory(&learning("anima", "one").in_project("p"))
            .unwrap();
        let err = store
            .save_memory(&learning("anima", "two").in_project("p"))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::LimitExceeded {
                scope: LimitScope::Project(_),
                ..
            }
        ));

        let limits = MemoryLimits {
            max_per_agent: None,
            max_per_project: None,
            max_per_kind: Some(1),
        };
        let store = MemoryStore::open_in_memory_with_limits(limits).unwrap();

        store.save_memory(&learning("anima", "one")).unwrap();
        let err = store.save_memory(&learning("anima", "two")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::LimitExceeded {
                scope: LimitScope::Kind(MemoryKind::Learnings),
                ..
            }
        ));

        // A different kind still fits
        store
            .save_memory(&Memory::new(
                "anima",
                MemoryKind::Emotional,
                ImpactLevel::Medium,
                "ok",
            ))
            .unwrap();
    }

    #[test]
    fn test_update_at_ceiling_succeeds() {
        let limits = MemoryLimits {
            max_per_agent: Some(1),
            max_per_project: None,
            max_per_kind: None,
        };
        let store = MemoryStore::open_in_memory_with_limits(limits).unwrap();

        let mut m = learning("anima", "only one allowed");
        store.save_memory(&m).unwrap();

        // Updating the existing id at the ceiling must not raise
        m.content = "still the only one".to_string();
        m.version += 1;
        store.save_memory(&m).unwrap();

        let fetched = store.get_memory(m.id).unwrap().unwrap();
        assert_eq!(fetched.content, "still the only one");
    }
}
