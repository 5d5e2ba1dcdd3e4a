//! SQL toolkit over a SQLite database.
//!
//! Four tools in the usual order of use: list the tables, read the schema of
//! the relevant ones, have the model double check a query, then run it.

use super::{required_str, Tool, ToolBox};
use crate::config::{Prompts, SqlSettings};
use crate::error::{AgentGraphError, Result};
use crate::message::Message;
use crate::model::ChatModel;
use async_trait::async_trait;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, info, instrument};

/// Whether `query` starts with a statement kind that only reads.
pub fn is_read_only_statement(query: &str) -> bool {
    static READ: OnceLock<Regex> = OnceLock::new();
    let re = READ.get_or_init(|| {
        Regex::new(r"(?is)^\s*(SELECT|WITH|PRAGMA|EXPLAIN)\b").expect("Invalid regex")
    });

    let body = query.trim().trim_end_matches(';');
    re.is_match(body) && !has_second_statement(body)
}

/// Whether a `;` outside quoted text is followed by anything but whitespace.
fn has_second_statement(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for (i, c) in sql.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, ';') => {
                let rest = sql[i + 1..].trim_matches(|r: char| r == ';' || r.is_whitespace());
                return !rest.is_empty();
            }
            (None, _) => {}
        }
    }
    false
}

/// A SQLite connection with the toolkit's formatting rules.
pub struct SqlDatabase {
    conn: Mutex<Connection>,
    read_only: bool,
    sample_rows: usize,
}

impl SqlDatabase {
    /// Open the database file.
    ///
    /// A read-only database must already exist; a writable one is created
    /// when missing.
    #[instrument(skip_all)]
    pub fn open(path: &Path, read_only: bool, sample_rows: usize) -> Result<Self> {
        let conn = if read_only {
            if !path.is_file() {
                return Err(AgentGraphError::Sql(format!(
                    "database file not found: {}",
                    path.display()
                )));
            }
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.execute_batch("PRAGMA query_only = ON;")?;
            conn
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        };

        info!("Opened SQL database at {:?} (read_only: {})", path, read_only);
        Ok(Self {
            conn: Mutex::new(conn),
            read_only,
            sample_rows,
        })
    }

    pub fn from_settings(path: &Path, settings: &SqlSettings) -> Result<Self> {
        Self::open(path, settings.read_only, settings.sample_rows)
    }

    pub fn dialect(&self) -> &'static str {
        "sqlite"
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AgentGraphError::Sql(format!("Failed to acquire lock: {}", e)))
    }

    /// User tables, sorted by name.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// `CREATE` statements plus a few sample rows for each named table.
    pub fn table_info(&self, tables: &[&str]) -> Result<String> {
        let known = self.list_tables()?;
        let conn = self.lock()?;
        let mut sections = Vec::new();

        for table in tables {
            if !known.iter().any(|k| k == table) {
                return Err(AgentGraphError::Sql(format!(
                    "table_names {{'{}'}} not found in database. Available tables: {}",
                    table,
                    known.join(", ")
                )));
            }

            let create: String = conn.query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [*table],
                |row| row.get(0),
            )?;

            let mut section = create.trim().to_string();
            if self.sample_rows > 0 {
                let (columns, rows) = select_rows(
                    &conn,
                    &format!("SELECT * FROM {} LIMIT {}", quote_ident(table), self.sample_rows),
                )?;
                section.push_str(&format!(
                    "\n\n/*\n{} rows from {} table:\n{}\n",
                    self.sample_rows,
                    table,
                    columns.join("\t")
                ));
                for row in rows {
                    section.push_str(&row.join("\t"));
                    section.push('\n');
                }
                section.push_str("*/");
            }
            sections.push(section);
        }

        Ok(sections.join("\n\n"))
    }

    /// Run a statement and render the rows as a list of tuples.
    #[instrument(skip(self))]
    pub fn run(&self, query: &str) -> Result<String> {
        if self.read_only && !is_read_only_statement(query) {
            return Err(AgentGraphError::Sql(
                "only SELECT, WITH, PRAGMA and EXPLAIN statements are allowed".to_string(),
            ));
        }

        let conn = self.lock()?;
        let column_count = conn.prepare(query)?.column_count();
        if column_count == 0 {
            let changed = conn.execute(query, [])?;
            return Ok(format!("{} rows affected", changed));
        }

        let (_, rows) = select_rows(&conn, query)?;
        debug!("Query returned {} rows", rows.len());

        if rows.is_empty() {
            return Ok(String::new());
        }

        let tuples = rows
            .iter()
            .map(|r| {
                if r.len() == 1 {
                    format!("({},)", r[0])
                } else {
                    format!("({})", r.join(", "))
                }
            })
            .collect::<Vec<_>>();
        Ok(format!("[{}]", tuples.join(", ")))
    }
}

fn select_rows(conn: &Connection, query: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let count = columns.len();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            values.push(format_value(row.get_ref(i)?));
        }
        out.push(values);
    }
    Ok((columns, out))
}

fn format_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => format!("'{}'", String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub struct SqlListTablesTool {
    db: Arc<SqlDatabase>,
}

#[async_trait]
impl Tool for SqlListTablesTool {
    fn name(&self) -> &str {
        "sql_db_list_tables"
    }

    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: Value) -> Result<String> {
        Ok(self.db.list_tables()?.join(", "))
    }
}

pub struct SqlSchemaTool {
    db: Arc<SqlDatabase>,
}

#[async_trait]
impl Tool for SqlSchemaTool {
    fn name(&self) -> &str {
        "sql_db_schema"
    }

    fn description(&self) -> &str {
        "Input to this tool is a comma-separated list of tables, output is the schema and sample rows \
         for those tables. Be sure that the tables actually exist by calling sql_db_list_tables first! \
         Example Input: table1, table2, table3"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table_names": {
                    "type": "string",
                    "description": "Comma-separated list of table names"
                }
            },
            "required": ["table_names"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let tables: Vec<&str> = required_str(&args, "table_names")?
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        self.db.table_info(&tables)
    }
}

pub struct SqlQueryTool {
    db: Arc<SqlDatabase>,
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        "sql_db_query"
    }

    fn description(&self) -> &str {
        "Input to this tool is a detailed and correct SQL query, output is a result from the database. \
         If the query is not correct, an error message will be returned. If an error is returned, \
         rewrite the query, check the query, and try again."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A detailed and correct SQL query"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        self.db.run(required_str(&args, "query")?)
    }
}

/// Asks the model to review a query before it is executed.
pub struct SqlQueryCheckerTool {
    db: Arc<SqlDatabase>,
    model: Arc<dyn ChatModel>,
    template: String,
}

#[async_trait]
impl Tool for SqlQueryCheckerTool {
    fn name(&self) -> &str {
        "sql_db_query_checker"
    }

    fn description(&self) -> &str {
        "Use this tool to double check if your query is correct before executing it. \
         Always use this tool before executing a query with sql_db_query!"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to check"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = required_str(&args, "query")?;
        let vars = HashMap::from([("dialect".to_string(), self.db.dialect().to_string())]);
        // The query goes in last so its own text is never treated as a placeholder.
        let prompt = Prompts::render(&self.template, &vars).replace("{{query}}", query);

        let reply = self.model.invoke(&[Message::human(prompt)], &[]).await?;
        Ok(reply.content)
    }
}

/// The four SQL tools bound to one database.
pub fn sql_toolkit(db: Arc<SqlDatabase>, model: Arc<dyn ChatModel>, checker_template: &str) -> ToolBox {
    ToolBox::new()
        .with(SqlListTablesTool { db: db.clone() })
        .with(SqlSchemaTool { db: db.clone() })
        .with(SqlQueryCheckerTool {
            db: db.clone(),
            model,
            template: checker_template.to_string(),
        })
        .with(SqlQueryTool { db })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqlPrompts;
    use crate::message::ToolCall;
    use crate::model::ScriptedModel;

    fn fixture(dir: &Path, read_only: bool) -> SqlDatabase {
        let path = dir.join("shop.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, country TEXT);
             INSERT INTO customers (name, country) VALUES ('Ada', 'UK'), ('Linus', 'FI'), ('Grace', NULL);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL);
             INSERT INTO orders (customer_id, total) VALUES (1, 9.5), (1, 20.0);",
        )
        .unwrap();
        drop(conn);
        SqlDatabase::open(&path, read_only, 2).unwrap()
    }

    #[test]
    fn test_read_only_statement_filter() {
        assert!(is_read_only_statement("select * from t"));
        assert!(is_read_only_statement("  WITH x AS (SELECT 1) SELECT * FROM x;"));
        assert!(is_read_only_statement("PRAGMA table_info(t)"));
        assert!(is_read_only_statement("explain query plan select 1"));
        assert!(!is_read_only_statement("DELETE FROM t"));
        assert!(!is_read_only_statement("SELECT 1; DROP TABLE t"));
        assert!(!is_read_only_statement("selectivity"));
    }

    #[test]
    fn test_semicolons_inside_literals_are_not_statement_breaks() {
        assert!(is_read_only_statement("SELECT name FROM t WHERE name = 'a;b'"));
        assert!(is_read_only_statement("SELECT \"x;y\" FROM t;;  "));
        assert!(is_read_only_statement("SELECT 'it''s; fine' FROM t;"));
        assert!(!is_read_only_statement("SELECT 'a;b'; DELETE FROM t"));
    }

    #[test]
    fn test_read_only_open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo.db");

        let err = SqlDatabase::open(&missing, true, 3).err().unwrap();
        assert!(err.to_string().contains("database file not found"));
        assert!(!missing.exists());

        assert!(SqlDatabase::open(&missing, false, 3).is_ok());
        assert!(missing.exists());
    }

    #[test]
    fn test_list_tables_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = fixture(dir.path(), true);

        assert_eq!(db.list_tables().unwrap(), vec!["customers", "orders"]);

        let info = db.table_info(&["customers"]).unwrap();
        assert!(info.starts_with("CREATE TABLE customers"));
        assert!(info.contains("2 rows from customers table:\nid\tname\tcountry\n1\t'Ada'\t'UK'\n"));
        assert!(info.contains("'Linus'"));
        assert!(!info.contains("Grace"));

        assert!(db.table_info(&["nope"]).is_err());
    }

    #[test]
    fn test_run_formats_tuples() {
        let dir = tempfile::tempdir().unwrap();
        let db = fixture(dir.path(), true);

        assert_eq!(
            db.run("SELECT name, country FROM customers ORDER BY id").unwrap(),
            "[('Ada', 'UK'), ('Linus', 'FI'), ('Grace', None)]"
        );
        assert_eq!(db.run("SELECT COUNT(*) FROM orders").unwrap(), "[(2,)]");
        assert_eq!(db.run("SELECT * FROM orders WHERE total > 100").unwrap(), "");
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = fixture(dir.path(), true);

        assert!(db.run("DELETE FROM orders").is_err());
        assert_eq!(db.run("SELECT COUNT(*) FROM orders").unwrap(), "[(2,)]");
    }

    #[test]
    fn test_writes_allowed_when_not_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = fixture(dir.path(), false);

        assert_eq!(db.run("DELETE FROM orders WHERE total < 10").unwrap(), "1 rows affected");
    }

    #[tokio::test]
    async fn test_toolkit_through_toolbox() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(fixture(dir.path(), true));
        let model = Arc::new(ScriptedModel::new(vec![Message::ai("SELECT name FROM customers LIMIT 1")]));
        let tools = sql_toolkit(db, model.clone(), &SqlPrompts::default().query_checker);

        assert_eq!(
            tools.names(),
            vec!["sql_db_list_tables", "sql_db_schema", "sql_db_query_checker", "sql_db_query"]
        );

        let listed = tools.execute(&ToolCall::new("1", "sql_db_list_tables", "")).await;
        assert_eq!(listed.content, "customers, orders");

        let checked = tools
            .execute(&ToolCall::new("2", "sql_db_query_checker", r#"{"query": "SELECT name FROM customers LIMIT 1"}"#))
            .await;
        assert_eq!(checked.content, "SELECT name FROM customers LIMIT 1");
        let prompt = &model.requests()[0][0].content;
        assert!(prompt.starts_with("SELECT name FROM customers LIMIT 1\nDouble check the sqlite query"));

        let failed = tools
            .execute(&ToolCall::new("3", "sql_db_query", r#"{"query": "SELECT * FROM missing"}"#))
            .await;
        assert!(failed.content.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_checker_keeps_placeholder_text_in_query() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(fixture(dir.path(), true));
        let model = Arc::new(ScriptedModel::new(vec![Message::ai("ok")]));
        let checker = SqlQueryCheckerTool {
            db,
            model: model.clone(),
            template: "{{query}} -- {{dialect}}".to_string(),
        };

        checker
            .call(json!({ "query": "SELECT '{{dialect}}' FROM customers" }))
            .await
            .unwrap();
        assert_eq!(
            model.requests()[0][0].content,
            "SELECT '{{dialect}}' FROM customers -- sqlite"
        );
    }
}
