//! CLI presentation: JSONL formatters for command output.

use crate::error::BulkError;
use crate::executor::OutputItem;
use serde_json::Value;

/// One JSON document per line
pub fn format_json_lines<'a>(
    values: impl IntoIterator<Item = &'a Value>,
    pretty: bool,
) -> Result<String, BulkError> {
    let rendered = values
        .into_iter()
        .map(|v| {
            if pretty {
                serde_json::to_string_pretty(v)
            } else {
                serde_json::to_string(v)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join("\n"))
}

/// Executor outputs as JSONL; `with_index` emits `{"item": n, "json": ...}` envelopes
pub fn format_output_items(items: &[OutputItem], with_index: bool) -> Result<String, BulkError> {
    if with_index {
        let lines = items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    } else {
        format_json_lines(items.iter().map(|item| &item.json), false)
    }
}
