// crates/core/src/llm/prompt.rs
//! Prompt construction and answer cleanup for SQL translation.

use super::types::TranslationRequest;

/// System prompt for translating one object.
pub fn build_system_prompt(request: &TranslationRequest) -> String {
    let source = request.source_dialect.display_name();
    format!(
        r#"You are an expert SQL translator specializing in migrating SQL from {source} to Databricks SQL.

Your task is to:
1. Analyze the input SQL from {source}
2. Convert it to valid Databricks SQL syntax
3. Handle dialect-specific functions, data types, and syntax differences
4. Preserve the original logic and intent

Target catalog: {catalog}
Target schema: {schema}

Only output the converted SQL, no explanations. If there are important conversion notes, add them as SQL comments."#,
        catalog = request.target_catalog,
        schema = request.target_schema,
    )
}

/// User prompt carrying the source SQL.
pub fn build_user_prompt(request: &TranslationRequest) -> String {
    format!(
        "Translate the following {} SQL to Databricks SQL:\n\n```sql\n{}\n```",
        request.source_dialect.display_name(),
        request.source_sql.trim()
    )
}

/// Strip Markdown code fences and surrounding whitespace from a model answer.
pub fn clean_sql(raw: &str) -> String {
    let mut sql = raw.trim();

    if let Some(rest) = sql.strip_prefix("```") {
        // Drop the info string (e.g. "sql") up to the first newline.
        sql = match rest.find('\n') {
            Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[idx + 1..],
            _ => rest.strip_prefix("sql").unwrap_or(rest),
        };
    }
    if let Some(rest) = sql.trim_end().strip_suffix("```") {
        sql = rest;
    }

    sql.trim().to_string()
}
