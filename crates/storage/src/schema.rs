use rusqlite::Connection;

use statute_core::NodeType;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Quoted table name for a node type. `set` is an SQL keyword.
pub fn table_name(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Statute => "statute",
        NodeType::Part => "part",
        NodeType::SchPart => "sch_part",
        NodeType::Chapter => "chapter",
        NodeType::SchChapter => "sch_chapter",
        NodeType::Set => "\"set\"",
        NodeType::SchSet => "sch_set",
        NodeType::Section => "section",
        NodeType::SchSection => "sch_section",
        NodeType::Subsection => "subsection",
        NodeType::SchSubsection => "sch_subsection",
    }
}

// Every node table takes its ids from `node_ids`, so ids are unique across
// the whole hierarchy and a tree can be navigated by id alone.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS node_ids (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS statute (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK (length(name) BETWEEN 1 AND 255),
    act_no TEXT UNIQUE CHECK (act_no IS NULL OR length(act_no) <= 100),
    date TEXT,
    preface TEXT,
    created_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER)),
    updated_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER))
);

CREATE TABLE IF NOT EXISTS part (
    id INTEGER PRIMARY KEY,
    statute_id INTEGER NOT NULL REFERENCES statute(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    part_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (statute_id, order_no)
);

CREATE TABLE IF NOT EXISTS sch_part (
    id INTEGER PRIMARY KEY,
    statute_id INTEGER NOT NULL REFERENCES statute(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    part_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (statute_id, order_no)
);

CREATE TABLE IF NOT EXISTS chapter (
    id INTEGER PRIMARY KEY,
    part_id INTEGER NOT NULL REFERENCES part(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    chapter_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (part_id, order_no)
);

CREATE TABLE IF NOT EXISTS sch_chapter (
    id INTEGER PRIMARY KEY,
    sch_part_id INTEGER NOT NULL REFERENCES sch_part(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    chapter_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (sch_part_id, order_no)
);

CREATE TABLE IF NOT EXISTS \"set\" (
    id INTEGER PRIMARY KEY,
    chapter_id INTEGER NOT NULL REFERENCES chapter(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    set_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (chapter_id, order_no)
);

CREATE TABLE IF NOT EXISTS sch_set (
    id INTEGER PRIMARY KEY,
    sch_chapter_id INTEGER NOT NULL REFERENCES sch_chapter(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    set_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (sch_chapter_id, order_no)
);

CREATE TABLE IF NOT EXISTS section (
    id INTEGER PRIMARY KEY,
    set_id INTEGER NOT NULL REFERENCES \"set\"(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    section_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (set_id, order_no)
);

CREATE TABLE IF NOT EXISTS sch_section (
    id INTEGER PRIMARY KEY,
    sch_set_id INTEGER NOT NULL REFERENCES sch_set(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    section_no TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (sch_set_id, order_no)
);

CREATE TABLE IF NOT EXISTS subsection (
    id INTEGER PRIMARY KEY,
    section_id INTEGER NOT NULL REFERENCES section(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    subsection_no TEXT,
    content TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (section_id, order_no)
);

CREATE TABLE IF NOT EXISTS sch_subsection (
    id INTEGER PRIMARY KEY,
    sch_section_id INTEGER NOT NULL REFERENCES sch_section(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    subsection_no TEXT,
    content TEXT,
    order_no INTEGER NOT NULL,
    UNIQUE (sch_section_id, order_no)
);

CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    save_id BLOB CHECK (save_id IS NULL OR length(save_id) = 16),
    table_name TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    action TEXT NOT NULL,
    at_ms INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER))
);
CREATE INDEX IF NOT EXISTS idx_activity_at ON activity_log (at_ms DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_activity_save ON activity_log (save_id);

CREATE TABLE IF NOT EXISTS drafts (
    statute_id INTEGER PRIMARY KEY,
    payload BLOB NOT NULL,
    checksum BLOB NOT NULL CHECK (length(checksum) = 32),
    saved_at_ms INTEGER NOT NULL
);
";
