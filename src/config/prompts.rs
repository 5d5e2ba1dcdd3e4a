//! Prompt templates for the built-in agents.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub react: ReactPrompts,
    pub developer: DeveloperPrompts,
    pub collaboration: CollaborationPrompts,
    pub sql: SqlPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the single reasoning/acting agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactPrompts {
    pub system: String,
    /// Question used when `react` is run without one.
    pub default_question: String,
    /// System prompt of the plain model call (`ask`).
    pub assistant: String,
    /// System prompt of the web research agent.
    pub research: String,
}

impl Default for ReactPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful assistant that can answer questions and help with tasks.".to_string(),
            default_question: "Get the data from the database and use that number as input to the triple_number tool to get the result.".to_string(),
            assistant: "You are a helpful assistant.".to_string(),
            research: r#"You are a helpful assistant that can search the web for current information.
Keep search queries simple and avoid date parameters. Today's date is {{today}}.
Summarize what you found and mention the sources you relied on."#
                .to_string(),
        }
    }
}

/// Prompts for the Python developer agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeveloperPrompts {
    pub system: String,
}

impl Default for DeveloperPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert Python code generator and problem solver. Your role is to:

1. Understand requirements: analyze the request and break complex problems into small steps.
2. Generate clean code: meaningful names, comments for tricky logic, PEP 8 style, error handling where needed.
3. Execute and validate: run your code with the python_repl tool, test it with sample inputs, fix errors and iterate.
4. Explain your approach: the logic of the solution, algorithms used and key assumptions.
5. Handle edge cases.
6. Create visualizations with matplotlib when appropriate:
   - use the non-GUI backend: matplotlib.use('Agg')
   - save plots with plt.savefig() instead of plt.show()
   - use descriptive file names

Always use the python_repl tool to execute and verify your code.

When creating plots or charts, execute the code so the files actually exist. In your FINAL ANSWER describe
what was accomplished and where the files were saved. Do not include the full code unless asked.

When you have completed all tasks and verified the solution works, respond with FINAL ANSWER."#
                .to_string(),
        }
    }
}

/// Prompts for the researcher / chart generator pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationPrompts {
    pub researcher: String,
    pub chart_generator: String,
    /// Task used when `collaborate` is run without one.
    pub default_task: String,
}

impl Default for CollaborationPrompts {
    fn default() -> Self {
        Self {
            researcher: "You can only do research. You are working with a chart generator colleague. \
                Use simple search queries without date parameters. \
                After gathering data, pass it to your colleague and do NOT create charts yourself. \
                Never use 'FINAL ANSWER'; let the chart generator finish the task."
                .to_string(),
            chart_generator: "You can only generate charts using Python/matplotlib. You are working with a researcher colleague. \
                When you receive data, create a proper visual chart. Once the chart is complete and saved, \
                use 'FINAL ANSWER' to indicate the task is finished."
                .to_string(),
            default_task: "First, get the UK's GDP over the past 5 years, then make a line chart of it. \
                Once you make the chart, finish."
                .to_string(),
        }
    }
}

/// Prompts for the SQL agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlPrompts {
    pub system: String,
    pub query_checker: String,
}

impl Default for SqlPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an agent designed to interact with a SQL database.
Given an input question, create a syntactically correct {{dialect}} query to run, then look at the results of the query and return the answer.
Unless the user asks for a specific number of examples, always limit your query to at most {{top_k}} results.
You can order the results by a relevant column to return the most interesting examples in the database.
Never query for all the columns of a table, only ask for the columns relevant to the question.

Start by listing the tables in the database, then query the schema of the most relevant tables.
Double check every query with sql_db_query_checker before running it with sql_db_query.
If a query fails, rewrite it and try again.

Do NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.
If the question does not seem related to the database, just answer that you don't know."#
                .to_string(),
            query_checker: r#"{{query}}
Double check the {{dialect}} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, just reproduce the original query.

Output the final SQL query only."#
                .to_string(),
        }
    }
}

/// Shared prefix for collaborating agents; the role-specific text goes after it.
pub fn make_system_prompt(suffix: &str) -> String {
    format!(
        "You are a helpful AI assistant, collaborating with other assistants. \
         Use the provided tools to progress towards answering the question. \
         If you are unable to fully answer, that's OK, another assistant with different tools \
         will help where you left off. Execute what you can to make progress. \
         If you or any of the other assistants have the final answer or deliverable, \
         prefix your response with FINAL ANSWER so the team knows to stop.\n{}",
        suffix
    )
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let react_path = custom_path.join("react.toml");
            if react_path.exists() {
                let content = std::fs::read_to_string(&react_path)?;
                prompts.react = toml::from_str(&content)?;
            }

            let developer_path = custom_path.join("developer.toml");
            if developer_path.exists() {
                let content = std::fs::read_to_string(&developer_path)?;
                prompts.developer = toml::from_str(&content)?;
            }

            let collaboration_path = custom_path.join("collaboration.toml");
            if collaboration_path.exists() {
                let content = std::fs::read_to_string(&collaboration_path)?;
                prompts.collaboration = toml::from_str(&content)?;
            }

            let sql_path = custom_path.join("sql.toml");
            if sql_path.exists() {
                let content = std::fs::read_to_string(&sql_path)?;
                prompts.sql = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
