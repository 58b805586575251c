//! v002 -- Expression index backing the `transactions` by `itemId` query.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_documents_item_id
    ON documents(collection, json_extract(body, '$.itemId'));
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
