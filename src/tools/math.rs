//! The two toy tools used by the react demo.

use super::{required_number, Tool};
use crate::error::{AgentGraphError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Triple a number.
pub fn triple_number(number: i64) -> Result<i64> {
    number
        .checked_mul(3)
        .ok_or_else(|| AgentGraphError::Tool(format!("{} * 3 overflows", number)))
}

/// Stand-in for a database lookup; always 15.
pub fn db_connect() -> i64 {
    15
}

pub struct TripleNumberTool;

#[async_trait]
impl Tool for TripleNumberTool {
    fn name(&self) -> &str {
        "triple_number"
    }

    fn description(&self) -> &str {
        "Triple a number."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "number": {
                    "type": "integer",
                    "description": "The number to triple"
                }
            },
            "required": ["number"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let number = required_number(&args, "number")?;
        Ok(triple_number(number)?.to_string())
    }
}

pub struct DbConnectTool;

#[async_trait]
impl Tool for DbConnectTool {
    fn name(&self) -> &str {
        "db_connect"
    }

    fn description(&self) -> &str {
        "Connect to the database and return the stored number."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: Value) -> Result<String> {
        Ok(db_connect().to_string())
    }
}
