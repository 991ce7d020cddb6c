use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::settings;

const SEARCH_LIMIT: usize = 12;
const TOP_ITEMS_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub(crate) struct NewEntry<'a> {
    pub(crate) title: &'a str,
    pub(crate) kind: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) author: Option<&'a str>,
    pub(crate) genre: Option<&'a str>,
    pub(crate) body: &'a str,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) title: String,
    pub(crate) kind: String,
    pub(crate) description: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) genre: Option<String>,
    pub(crate) body: String,
}

#[derive(Debug, Clone)]
pub(crate) struct EntrySummary {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) kind: String,
}

pub(crate) struct EntryStore {
    conn: Connection,
}

impl EntryStore {
    pub(crate) fn open_default() -> Result<Self> {
        let path = store_file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create journal dir {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("open journal db {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().context("open in-memory journal db")?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              title TEXT NOT NULL,
              kind TEXT NOT NULL,
              description TEXT,
              author TEXT,
              genre TEXT,
              body TEXT NOT NULL,
              created_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts
              USING fts5(title, body, tokenize='unicode61');
            ",
        )
        .context("init journal schema")?;
        Ok(Self { conn })
    }

    pub(crate) fn add_entry(&self, entry: &NewEntry<'_>) -> Result<i64> {
        let title = entry.title.trim();
        let body = entry.body.trim_end();
        self.conn
            .execute(
                "INSERT INTO entries(title, kind, description, author, genre, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    title,
                    entry.kind.trim(),
                    none_if_blank(entry.description),
                    none_if_blank(entry.author),
                    none_if_blank(entry.genre),
                    body,
                ],
            )
            .context("insert entry")?;

        let entry_id = self.conn.last_insert_rowid();
        self.conn
            .execute(
                "INSERT INTO entries_fts(rowid, title, body) VALUES (?1, ?2, ?3)",
                params![entry_id, title, body],
            )
            .context("insert fts row")?;
        Ok(entry_id)
    }

    pub(crate) fn list(&self) -> Result<Vec<EntrySummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, kind FROM entries ORDER BY id")
            .context("prepare entry list")?;
        let mut rows = stmt.query([]).context("query entry list")?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan entry row")? {
            out.push(EntrySummary {
                id: row.get(0).context("entry.id")?,
                title: row.get(1).context("entry.title")?,
                kind: row.get(2).context("entry.kind")?,
            });
        }
        Ok(out)
    }

    pub(crate) fn get(&self, id: i64) -> Result<Option<Entry>> {
        self.conn
            .query_row(
                "SELECT title, kind, description, author, genre, body
                 FROM entries WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Entry {
                        title: row.get(0)?,
                        kind: row.get(1)?,
                        description: row.get(2)?,
                        author: row.get(3)?,
                        genre: row.get(4)?,
                        body: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("fetch entry")
    }

    pub(crate) fn update_body(&self, id: i64, body: &str) -> Result<()> {
        let body = body.trim_end();
        self.conn
            .execute(
                "UPDATE entries SET body = ?2 WHERE id = ?1",
                params![id, body],
            )
            .context("update entry body")?;
        self.conn
            .execute(
                "UPDATE entries_fts SET body = ?2 WHERE rowid = ?1",
                params![id, body],
            )
            .context("update fts body")?;
        Ok(())
    }

    pub(crate) fn delete(&self, ids: &[i64]) -> Result<usize> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin delete tx")?;
        let mut removed = 0usize;
        for &id in ids {
            tx.execute("DELETE FROM entries_fts WHERE rowid = ?1", params![id])
                .context("delete fts row")?;
            removed += tx
                .execute("DELETE FROM entries WHERE id = ?1", params![id])
                .context("delete entry row")?;
        }
        tx.commit().context("commit delete tx")?;
        Ok(removed)
    }

    pub(crate) fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .context("count entries")?;
        Ok(count as usize)
    }

    pub(crate) fn search(&self, query: &str) -> Result<Vec<EntrySummary>> {
        let Some(normalized) = normalize_query(query) else {
            return Ok(Vec::new());
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.id, e.title, e.kind
                 FROM entries_fts f
                 JOIN entries e ON e.id = f.rowid
                 WHERE entries_fts MATCH ?1
                 ORDER BY bm25(entries_fts), e.id DESC
                 LIMIT ?2",
            )
            .context("prepare entry search")?;
        let mut rows = stmt
            .query(params![normalized, SEARCH_LIMIT as i64])
            .context("query entry search")?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan search row")? {
            out.push(EntrySummary {
                id: row.get(0).context("search.id")?,
                title: row.get(1).context("search.title")?,
                kind: row.get(2).context("search.kind")?,
            });
        }
        Ok(out)
    }

    pub(crate) fn top_genres(&self) -> Result<Vec<(String, usize)>> {
        self.top_grouped("SELECT genre, COUNT(*) FROM entries WHERE genre IS NOT NULL AND genre != '' GROUP BY genre COLLATE NOCASE ORDER BY COUNT(*) DESC, genre LIMIT ?1")
    }

    pub(crate) fn top_authors(&self) -> Result<Vec<(String, usize)>> {
        self.top_grouped("SELECT author, COUNT(*) FROM entries WHERE author IS NOT NULL AND author != '' GROUP BY author COLLATE NOCASE ORDER BY COUNT(*) DESC, author LIMIT ?1")
    }

    fn top_grouped(&self, sql: &str) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(sql).context("prepare top-items query")?;
        let mut rows = stmt
            .query(params![TOP_ITEMS_LIMIT as i64])
            .context("query top items")?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan top-items row")? {
            let name: String = row.get(0).context("top.name")?;
            let count: i64 = row.get(1).context("top.count")?;
            out.push((name, count as usize));
        }
        Ok(out)
    }
}

fn store_file_path() -> PathBuf {
    settings::data_dir().join("journal.db")
}

fn none_if_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Turns free-form user input into an FTS OR-query of distinct terms.
fn normalize_query(input: &str) -> Option<String> {
    let mut terms = Vec::new();
    for t in input
        .split(|c: char| !c.is_alphanumeric())
        .map(|s| s.trim().to_lowercase())
    {
        if t.len() < 2 {
            continue;
        }
        if terms.contains(&t) {
            continue;
        }
        terms.push(t);
        if terms.len() >= 8 {
            break;
        }
    }

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry<'a>() -> NewEntry<'a> {
        NewEntry {
            title: "Dune",
            kind: "Novel",
            description: Some("Desert planet epic"),
            author: Some("Frank Herbert"),
            genre: Some("Science Fiction"),
            body: "A sweeping story of spice and sand.",
        }
    }

    #[test]
    fn add_then_get_round_trips_fields() {
        let store = EntryStore::open_in_memory().expect("open store");
        let id = store.add_entry(&sample_entry()).expect("add entry");

        let entry = store.get(id).expect("get entry").expect("entry exists");
        assert_eq!(entry.title, "Dune");
        assert_eq!(entry.kind, "Novel");
        assert_eq!(entry.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(entry.body, "A sweeping story of spice and sand.");
    }

    #[test]
    fn blank_optional_fields_are_stored_as_null() {
        let store = EntryStore::open_in_memory().expect("open store");
        let id = store
            .add_entry(&NewEntry {
                title: "Untitled",
                kind: "Essay",
                description: Some("   "),
                author: None,
                genre: Some(""),
                body: "text",
            })
            .expect("add entry");

        let entry = store.get(id).expect("get entry").expect("entry exists");
        assert_eq!(entry.description, None);
        assert_eq!(entry.genre, None);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = EntryStore::open_in_memory().expect("open store");
        for title in ["first", "second", "third"] {
            store
                .add_entry(&NewEntry {
                    title,
                    kind: "Book",
                    description: None,
                    author: None,
                    genre: None,
                    body: "body",
                })
                .expect("add entry");
        }

        let titles: Vec<String> = store
            .list()
            .expect("list entries")
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn delete_removes_rows_and_reports_count() {
        let store = EntryStore::open_in_memory().expect("open store");
        let a = store.add_entry(&sample_entry()).expect("add");
        let b = store.add_entry(&sample_entry()).expect("add");

        let removed = store.delete(&[a, b, 999]).expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn update_body_changes_stored_text() {
        let store = EntryStore::open_in_memory().expect("open store");
        let id = store.add_entry(&sample_entry()).expect("add");

        store.update_body(id, "rewritten body\n").expect("update");
        let entry = store.get(id).expect("get").expect("entry exists");
        assert_eq!(entry.body, "rewritten body");
    }

    #[test]
    fn search_matches_title_and_body_terms() {
        let store = EntryStore::open_in_memory().expect("open store");
        store.add_entry(&sample_entry()).expect("add");
        store
            .add_entry(&NewEntry {
                title: "Cooking at home",
                kind: "Journal",
                description: None,
                author: None,
                genre: None,
                body: "bread and butter notes",
            })
            .expect("add");

        let hits = store.search("spice").expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dune");

        let hits = store.search("bread").expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Cooking at home");
    }

    #[test]
    fn search_with_no_usable_terms_returns_empty() {
        let store = EntryStore::open_in_memory().expect("open store");
        store.add_entry(&sample_entry()).expect("add");
        assert!(store.search(" . ! ").expect("search").is_empty());
    }

    #[test]
    fn top_genres_orders_by_frequency() {
        let store = EntryStore::open_in_memory().expect("open store");
        for genre in ["Fantasy", "Fantasy", "Horror"] {
            store
                .add_entry(&NewEntry {
                    title: "t",
                    kind: "Book",
                    description: None,
                    author: None,
                    genre: Some(genre),
                    body: "b",
                })
                .expect("add");
        }

        let top = store.top_genres().expect("top genres");
        assert_eq!(top[0], ("Fantasy".to_string(), 2));
        assert_eq!(top[1], ("Horror".to_string(), 1));
    }
}
