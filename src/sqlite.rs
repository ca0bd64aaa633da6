//! SQLite-backed catalog.
//!
//! Reads a `tracks` table and serves it both page by page (for snapshots) and
//! through title/artist search (for tiered resolution).
//!
//! ```sql
//! CREATE TABLE tracks (
//!     id           TEXT PRIMARY KEY,
//!     title        TEXT NOT NULL,
//!     artist       TEXT NOT NULL,
//!     album        TEXT,
//!     duration_sec INTEGER,
//!     isrc         TEXT
//! );
//! ```

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::debug;

use crate::models::{CatalogEntry, Provenance, Tier};
use crate::search::{CatalogSearch, SearchQuery};
use crate::snapshot::PageSource;

const SELECT_COLUMNS: &str = "SELECT id, title, artist, album, duration_sec, isrc FROM tracks";

pub struct SqliteCatalog {
    conn: Connection,
    tier: Tier,
}

impl SqliteCatalog {
    /// Open an existing catalog database read-only.
    pub fn open(path: &Path, tier: Tier) -> rusqlite::Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self::from_connection(conn, tier))
    }

    pub fn from_connection(conn: Connection, tier: Tier) -> Self {
        Self { conn, tier }
    }

    pub fn count(&self) -> rusqlite::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    fn entry_from_row(&self, row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
        let id: String = row.get(0)?;
        let duration: Option<i64> = row.get(4)?;
        Ok(CatalogEntry {
            provenance: Provenance::for_tier(self.tier, id.clone()),
            id,
            title: row.get(1)?,
            artist: row.get(2)?,
            album: row.get(3)?,
            duration_seconds: duration.and_then(|d| u32::try_from(d).ok()),
            isrc: row.get(5)?,
        })
    }
}

/// Wrap user text in `%...%`, escaping LIKE wildcards with `\`.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl PageSource for SqliteCatalog {
    type Error = rusqlite::Error;

    fn fetch_page(&self, offset: usize, limit: usize) -> rusqlite::Result<Vec<CatalogEntry>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{} ORDER BY id LIMIT ?1 OFFSET ?2", SELECT_COLUMNS))?;
        let entries = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                self.entry_from_row(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

impl CatalogSearch for SqliteCatalog {
    type Error = rusqlite::Error;

    /// Case-insensitive title substring search; rows whose artist also
    /// matches sort first.
    fn search(&self, query: &SearchQuery<'_>, limit: usize) -> rusqlite::Result<Vec<CatalogEntry>> {
        if !query.is_searchable() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare_cached(&format!(
            "{} WHERE title LIKE ?1 ESCAPE '\\'
             ORDER BY (artist LIKE ?2 ESCAPE '\\') DESC, id
             LIMIT ?3",
            SELECT_COLUMNS
        ))?;
        let entries = stmt
            .query_map(
                params![
                    like_pattern(query.title),
                    like_pattern(query.artist),
                    limit as i64
                ],
                |row| self.entry_from_row(row),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(
            title = query.title,
            tier = ?self.tier,
            results = entries.len(),
            "sqlite catalog search"
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::snapshot::SnapshotPaginator;

    fn seeded(tier: Tier) -> SqliteCatalog {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tracks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                album TEXT,
                duration_sec INTEGER,
                isrc TEXT
            );
            INSERT INTO tracks VALUES ('t1', 'Yellow', 'Coldplay', 'Parachutes', 266, 'GBAYE0000351');
            INSERT INTO tracks VALUES ('t2', 'Yellow Submarine', 'The Beatles', NULL, 158, NULL);
            INSERT INTO tracks VALUES ('t3', 'Clocks', 'Coldplay', NULL, NULL, NULL);
            INSERT INTO tracks VALUES ('t4', '100% Pure', 'Someone', NULL, -3, NULL);
            INSERT INTO tracks VALUES ('t5', 'Mellow Yellow', 'Donovan', NULL, 222, NULL);",
        )
        .unwrap();
        SqliteCatalog::from_connection(conn, tier)
    }

    #[test]
    fn test_fetch_page_orders_by_id() {
        let catalog = seeded(Tier::Local);
        let page = catalog.fetch_page(1, 2).unwrap();
        let ids: Vec<&str> = page.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3"]);
    }

    #[test]
    fn test_row_mapping() {
        let catalog = seeded(Tier::Broader);
        let page = catalog.fetch_page(0, 10).unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].album.as_deref(), Some("Parachutes"));
        assert_eq!(page[0].duration_seconds, Some(266));
        assert_eq!(page[0].isrc.as_deref(), Some("GBAYE0000351"));
        assert_eq!(page[0].provenance.broader_id.as_deref(), Some("t1"));
        // negative durations are dropped, not errors
        assert_eq!(page[3].duration_seconds, None);
    }

    #[test]
    fn test_paginator_drains_catalog() {
        let catalog = seeded(Tier::Local);
        let mut progress = Vec::new();
        let entries = SnapshotPaginator::new(2)
            .fetch_all(&catalog, &CancellationToken::new(), |n| progress.push(n))
            .unwrap()
            .finished()
            .unwrap();
        assert_eq!(entries.len(), catalog.count().unwrap());
        assert_eq!(progress, vec![2, 4, 5]);
    }

    #[test]
    fn test_search_prefers_artist_match() {
        let catalog = seeded(Tier::Local);
        let query = SearchQuery {
            title: "yellow",
            artist: "Donovan",
            album: None,
        };
        let results = catalog.search(&query, 10).unwrap();
        let ids: Vec<&str> = results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["t5", "t1", "t2"]);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let catalog = seeded(Tier::Local);
        let query = SearchQuery {
            title: "100%",
            artist: "",
            album: None,
        };
        let results = catalog.search(&query, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "t4");

        let query = SearchQuery {
            title: "_",
            artist: "",
            album: None,
        };
        assert!(catalog.search(&query, 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_title_does_not_query() {
        // No tracks table: any real query would fail
        let catalog =
            SqliteCatalog::from_connection(Connection::open_in_memory().unwrap(), Tier::Local);
        let empty = SearchQuery {
            title: "",
            artist: "Coldplay",
            album: None,
        };
        assert!(catalog.search(&empty, 5).unwrap().is_empty());

        let real = SearchQuery {
            title: "Yellow",
            artist: "Coldplay",
            album: None,
        };
        assert!(catalog.search(&real, 5).is_err());
    }
}
