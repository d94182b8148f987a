pub const SCHEMA: &str = r#"
-- urls table: one row per discovered URL within a niche
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT UNIQUE,
    title TEXT,
    niche TEXT,
    processed INTEGER DEFAULT 0,
    content_written INTEGER DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_urls_processed ON urls(processed);
CREATE INDEX IF NOT EXISTS idx_urls_content_written ON urls(content_written);
"#;
