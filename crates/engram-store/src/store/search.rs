//! Literal substring search over memory content.
//!
//! This is deliberately not semantic search: the caller interprets meaning,
//! the store only matches text.

use rusqlite::ToSql;

use engram_types::Memory;

use crate::error::Result;

use super::MemoryStore;
use super::memory_ops::MEMORY_COLUMNS;

/// Escape LIKE metacharacters so user input matches literally.
///
/// Without this, a query containing `%` or `_` would behave as a wildcard.
pub(crate) fn escape_like_pattern(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl MemoryStore {
    /// Case-insensitive substring search over `content` and
    /// `original_content` for active memories.
    ///
    /// The project visibility rule applies: with a `project_id`, AGENT-region
    /// memories are searched too. Results are ordered newest-created-first.
    pub fn search_memories(
        &self,
        agent_id: &str,
        query: &str,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Memory>> {
        let pattern = format!("%{}%", escape_like_pattern(query));

        let mut sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memories \
             WHERE agent_id = ? \
             AND (content LIKE ? ESCAPE '\\' OR original_content LIKE ? ESCAPE '\\') \
             AND superseded_by IS NULL"
        );
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![
            Box::new(agent_id.to_string()),
            Box::new(pattern.clone()),
            Box::new(pattern),
        ];

        if let Some(project_id) = project_id {
            sql.push_str(" AND (project_id = ? OR region = 'AGENT')");
            params_vec.push(Box::new(project_id.to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC LIMIT ?");
        params_vec.push(Box::new(limit as i64));

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
}
