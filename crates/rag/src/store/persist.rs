//! SQLite persistence for the graph store.
//!
//! The in-memory state is authoritative at runtime; the database is a
//! durable mirror, written inside the store's exclusive sections and
//! replayed in insertion order on open. Vectors are stored as
//! little-endian f32 blobs, metadata as JSON.

use super::{EntryMetadata, IndexState, StoredEntry};
use docgraph_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

pub(super) fn open_db(path: &Path) -> AppResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)
        .map_err(|e| AppError::Storage(format!("failed to open database: {e}")))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS indexes (
            name      TEXT PRIMARY KEY,
            dimension INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS entries (
            index_name   TEXT NOT NULL,
            id           TEXT NOT NULL,
            vector       BLOB NOT NULL,
            metadata     TEXT NOT NULL,
            insert_order INTEGER NOT NULL,
            PRIMARY KEY (index_name, id)
        );
        CREATE INDEX IF NOT EXISTS idx_entries_order
            ON entries (index_name, insert_order);",
    )
    .map_err(|e| AppError::Storage(format!("failed to initialize schema: {e}")))?;

    Ok(conn)
}

/// Load every index and its entries, preserving insertion order.
pub(super) fn load_all(conn: &Connection) -> AppResult<HashMap<String, IndexState>> {
    let mut states: HashMap<String, IndexState> = HashMap::new();

    let mut stmt = conn
        .prepare("SELECT name, dimension FROM indexes")
        .map_err(storage_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(storage_err)?;
    for row in rows {
        let (name, dimension) = row.map_err(storage_err)?;
        states.insert(
            name.clone(),
            IndexState::new(name, dimension as usize),
        );
    }

    let mut stmt = conn
        .prepare(
            "SELECT index_name, id, vector, metadata FROM entries
             ORDER BY index_name, insert_order",
        )
        .map_err(storage_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(storage_err)?;

    for row in rows {
        let (index_name, id, blob, metadata_json) = row.map_err(storage_err)?;
        let state = states.get_mut(&index_name).ok_or_else(|| {
            AppError::Storage(format!("entry references unknown index '{index_name}'"))
        })?;
        let vector = blob_to_vector(&blob)?;
        let metadata: EntryMetadata = serde_json::from_str(&metadata_json)?;
        state.insert(StoredEntry { id, vector, metadata });
    }

    Ok(states)
}

pub(super) fn save_index(conn: &Connection, name: &str, dimension: usize) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO indexes (name, dimension) VALUES (?1, ?2)",
        params![name, dimension as i64],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// Write a batch of entries. Replacing an id keeps its original
/// insertion order.
pub(super) fn save_entries(
    conn: &mut Connection,
    index_name: &str,
    entries: &[(StoredEntry, usize)],
) -> AppResult<()> {
    let tx = conn.transaction().map_err(storage_err)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO entries (index_name, id, vector, metadata, insert_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (index_name, id) DO UPDATE SET
                     vector = excluded.vector,
                     metadata = excluded.metadata",
            )
            .map_err(storage_err)?;
        for (entry, order) in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;
            stmt.execute(params![
                index_name,
                entry.id,
                vector_to_blob(&entry.vector),
                metadata_json,
                *order as i64,
            ])
            .map_err(storage_err)?;
        }
    }
    tx.commit().map_err(storage_err)?;
    Ok(())
}

pub(super) fn delete_index(conn: &Connection, name: &str) -> AppResult<()> {
    conn.execute("DELETE FROM entries WHERE index_name = ?1", params![name])
        .map_err(storage_err)?;
    conn.execute("DELETE FROM indexes WHERE name = ?1", params![name])
        .map_err(storage_err)?;
    Ok(())
}

fn storage_err(e: rusqlite::Error) -> AppError {
    AppError::Storage(e.to_string())
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

fn blob_to_vector(blob: &[u8]) -> AppResult<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(AppError::Storage(format!(
            "corrupt vector blob of {} bytes",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_blob_round_trip() {
        let v = vec![0.1f32, -2.5, 3.75, 0.0];
        assert_eq!(blob_to_vector(&vector_to_blob(&v)).unwrap(), v);
    }

    #[test]
    fn test_corrupt_blob_rejected() {
        assert!(blob_to_vector(&[0u8, 1, 2]).is_err());
    }
}
