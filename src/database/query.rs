use crate::database::traits::Query;
use rusqlite::types::Value;

/// Plain SQL text with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    sql: String,
    parameters: Vec<Value>,
}

impl RawQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Append the next positional parameter
    pub fn with_parameter(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }
}

impl Query for RawQuery {
    fn command_text(&self) -> &str {
        &self.sql
    }

    fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

impl From<&str> for RawQuery {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}
