//! Code generation tools

use super::{GenerateCodeArgs, WebFileArgs};
use crate::analyzer::ProjectInfo;
use crate::generator::{CodeGenerator, DEFAULT_APP_NAME, DEFAULT_UNIQUE_ID};
use buddy_agent::ToolError;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

pub fn code(project: &ProjectInfo, args: &GenerateCodeArgs) -> Result<String, ToolError> {
    info!(kind = %args.kind, name = %args.name, "generating code");

    let generated = CodeGenerator::new(project)
        .generate(&args.kind, &args.name, &args.description, args.spec.as_deref())
        .map_err(|e| ToolError::execution(format!("code generation failed: {}", e)))?;

    Ok(format!(
        "Generated {} code for '{}':\n\nSuggested filename: {}\n\nCode:\n```\n{}\n```",
        args.kind,
        args.name,
        generated.filename,
        generated.code.trim_end()
    ))
}

fn web_options(raw: Option<&str>) -> Map<String, Value> {
    let mut options = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match serde_json::from_str::<Map<String, Value>>(raw) {
            Ok(options) => options,
            Err(e) => {
                warn!("Failed to parse web file options, using defaults: {}", e);
                Map::new()
            }
        },
        None => Map::new(),
    };
    options
        .entry("appName")
        .or_insert_with(|| Value::String(DEFAULT_APP_NAME.into()));
    options
        .entry("uniqueId")
        .or_insert_with(|| Value::String(DEFAULT_UNIQUE_ID.into()));
    options
}

/// Render a web template and write it to `path`
pub async fn web_file(
    project: &ProjectInfo,
    path: &Path,
    args: &WebFileArgs,
) -> Result<String, ToolError> {
    info!(kind = %args.file_type, filename = %args.filename, "generating web file");

    let options = web_options(args.options.as_deref());
    let content = CodeGenerator::new(project)
        .web_file(&args.file_type, &options)
        .map_err(|e| ToolError::execution(format!("web file generation failed: {}", e)))?;

    super::files::create(path, &content).await?;
    Ok(format!(
        "Generated {} file '{}' successfully.",
        args.file_type.to_lowercase(),
        args.filename
    ))
}
