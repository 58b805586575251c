//! v001 -- Document table.
//!
//! Every document two levels below the root (`items/{id}`,
//! `category-items/{categoryId}`, ...) is one row holding its JSON body.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,               -- first path segment
    key        TEXT NOT NULL,               -- second path segment
    body       TEXT NOT NULL,               -- JSON subtree below collection/key
    PRIMARY KEY (collection, key)
) WITHOUT ROWID;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
