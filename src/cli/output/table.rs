//! Table rendering with comfy-table.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};

/// One row of the `backends` listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackendRow {
    pub backend: String,
    pub storage: String,
    pub naming_key: Option<String>,
    pub credential_env: Option<String>,
    pub defaults: serde_json::Value,
}

fn render_defaults(defaults: &serde_json::Value) -> String {
    match defaults.as_object() {
        Some(map) if !map.is_empty() => map
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{key}={s}"),
                other => format!("{key}={other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "-".to_string(),
    }
}

pub fn format_backends_table(rows: &[BackendRow]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Backend").add_attribute(Attribute::Bold),
        Cell::new("Storage").add_attribute(Attribute::Bold),
        Cell::new("Naming key").add_attribute(Attribute::Bold),
        Cell::new("Credential").add_attribute(Attribute::Bold),
        Cell::new("Defaults").add_attribute(Attribute::Bold),
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.backend),
            Cell::new(&row.storage),
            Cell::new(row.naming_key.as_deref().unwrap_or("-")),
            Cell::new(row.credential_env.as_deref().unwrap_or("-")),
            Cell::new(render_defaults(&row.defaults)),
        ]);
    }

    table.to_string()
}
