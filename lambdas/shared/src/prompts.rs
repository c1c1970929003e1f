//! System prompt templates
//!
//! Templates use `{name}` placeholders. Both can be replaced through the
//! `PROMPT_SELECT_TABLE` and `PROMPT_CREATE_QUERY` environment variables.

pub const DEFAULT_SELECT_TABLE_PROMPT: &str = "\
You route incoming messages to database tables.
The available tables are: {tables}.
Read the message and answer with the name of the single table it belongs to.
Respond with only the table name, without quotes or explanation.";

pub const DEFAULT_CREATE_QUERY_PROMPT: &str = "\
You translate incoming messages into Amazon DynamoDB PartiQL.
Write one statement that applies the message to the table \"{table_name}\".
Use single quotes for string literals and double quotes around the table name.
Respond with a single PartiQL statement and nothing else.";

/// Replace every `{key}` in `template` with its value
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}
