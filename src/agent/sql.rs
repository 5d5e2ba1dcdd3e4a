//! Agent that answers questions from a SQL database.

use super::react::create_react_agent;
use crate::config::Prompts;
use crate::error::Result;
use crate::graph::CompiledGraph;
use crate::message::MessagesState;
use crate::model::ChatModel;
use crate::tools::{sql_toolkit, SqlDatabase};
use std::collections::HashMap;
use std::sync::Arc;

/// System prompt with the dialect and row cap filled in.
pub fn sql_system_prompt(prompts: &Prompts, dialect: &str, top_k: usize) -> String {
    let vars = HashMap::from([
        ("dialect".to_string(), dialect.to_string()),
        ("top_k".to_string(), top_k.to_string()),
    ]);
    prompts.render_with_custom(&prompts.sql.system, &vars)
}

/// React agent bound to the SQL toolkit.
pub fn create_sql_agent(
    model: Arc<dyn ChatModel>,
    db: Arc<SqlDatabase>,
    prompts: &Prompts,
    top_k: usize,
) -> Result<CompiledGraph<MessagesState>> {
    let prompt = sql_system_prompt(prompts, db.dialect(), top_k);
    let tools = sql_toolkit(db, model.clone(), &prompts.sql.query_checker);
    create_react_agent(model, tools, Some(prompt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RunConfig;
    use crate::message::{Message, ToolCall};
    use crate::model::ScriptedModel;

    #[test]
    fn test_prompt_names_dialect_and_limit() {
        let prompt = sql_system_prompt(&Prompts::default(), "sqlite", 7);
        assert!(prompt.contains("syntactically correct sqlite query"));
        assert!(prompt.contains("at most 7 results"));
    }

    #[tokio::test]
    async fn test_agent_lists_then_queries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music.db");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT);
                 INSERT INTO artists (name) VALUES ('AC/DC'), ('Accept'), ('Aerosmith');",
            )
            .unwrap();
        let db = Arc::new(SqlDatabase::open(&path, true, 3).unwrap());

        let model = Arc::new(ScriptedModel::new(vec![
            Message::ai_with_tool_calls("", vec![ToolCall::new("t1", "sql_db_list_tables", "{}")]),
            Message::ai_with_tool_calls(
                "",
                vec![ToolCall::new("t2", "sql_db_query", r#"{"query": "SELECT COUNT(*) FROM artists"}"#)],
            ),
            Message::ai("There are 3 artists."),
        ]));
        let agent = create_sql_agent(model, db, &Prompts::default(), 10).unwrap();

        let out = agent
            .invoke(MessagesState::from_human("How many artists are there?"), &RunConfig::default())
            .await
            .unwrap();

        assert_eq!(out.messages[2].content, "artists");
        assert_eq!(out.messages[4].content, "[(3,)]");
        assert_eq!(out.last_content(), "There are 3 artists.");
    }
}
