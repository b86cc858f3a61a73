//! Project analysis and the package manager, test and build command lines

use crate::analyzer::{self, Language, PackageManager, ProjectInfo};
use buddy_agent::ToolError;
use std::path::PathBuf;

/// Analyze `path` on the blocking pool so the turn deadline can still fire
pub async fn analyze(path: PathBuf) -> Result<ProjectInfo, ToolError> {
    tokio::task::spawn_blocking(move || analyzer::analyze(&path))
        .await
        .map_err(|e| ToolError::execution(format!("project analysis failed: {}", e)))?
        .map_err(|e| ToolError::execution(format!("project analysis failed: {}", e)))
}

pub fn format_analysis(info: &ProjectInfo) -> Result<String, ToolError> {
    let json = serde_json::to_string_pretty(info).map_err(|e| {
        ToolError::execution(format!("failed to format analysis result: {}", e))
    })?;
    Ok(format!("Project Analysis Results:\n{}", json))
}

fn with_args(base: &str, args: Option<&str>) -> String {
    match args {
        Some(args) => format!("{} {}", base, args),
        None => base.to_string(),
    }
}

/// Dependency install command for the project's package manager
pub fn install_command(info: &ProjectInfo, packages: Option<&str>) -> Result<String, ToolError> {
    let Some(pm) = info.package_manager else {
        return Err(ToolError::execution("unknown package manager"));
    };

    let command = match (pm, packages) {
        (PackageManager::Npm, _) => with_args("npm install", packages),
        (PackageManager::Yarn, Some(p)) => format!("yarn add {}", p),
        (PackageManager::Yarn, None) => "yarn install".to_string(),
        (PackageManager::Pnpm, Some(p)) => format!("pnpm add {}", p),
        (PackageManager::Pnpm, None) => "pnpm install".to_string(),
        (PackageManager::Go, Some(p)) => format!("go get {}", p),
        (PackageManager::Go, None) => "go mod tidy".to_string(),
        (PackageManager::Pip, Some(p)) => format!("pip install {}", p),
        (PackageManager::Pip, None) => "pip install -r requirements.txt".to_string(),
        (PackageManager::Cargo, Some(p)) => format!("cargo add {}", p),
        (PackageManager::Cargo, None) => "cargo build".to_string(),
    };
    Ok(command)
}

fn node_pm(info: &ProjectInfo) -> &'static str {
    info.package_manager
        .map(|pm| pm.as_str())
        .unwrap_or(PackageManager::Npm.as_str())
}

/// Test command for the project's language and test framework
pub fn test_command(info: &ProjectInfo, pattern: Option<&str>) -> Result<String, ToolError> {
    let command = match info.language {
        Language::Go => format!("go test {}", pattern.unwrap_or("./...")),
        Language::JavaScript | Language::TypeScript => {
            let base = format!("{} test", node_pm(info));
            if info.test_framework.as_deref() == Some("Jest") {
                with_args(&base, pattern)
            } else {
                base
            }
        }
        Language::Python => {
            if info.test_framework.as_deref() == Some("pytest") {
                with_args("pytest", pattern)
            } else {
                "python -m unittest discover".to_string()
            }
        }
        Language::Rust => with_args("cargo test", pattern),
        Language::Unknown => {
            return Err(ToolError::execution(format!(
                "testing not supported for language: {}",
                info.language
            )));
        }
    };
    Ok(command)
}

/// Build command for the project's language and build tool
pub fn build_command(info: &ProjectInfo, target: Option<&str>) -> Result<String, ToolError> {
    let command = match info.language {
        Language::Go => match target {
            Some(t) => format!("go build -o {} .", t),
            None => "go build .".to_string(),
        },
        Language::JavaScript | Language::TypeScript => {
            if !info.scripts.contains_key("build") {
                return Err(ToolError::execution("no build script found in package.json"));
            }
            format!("{} run build", node_pm(info))
        }
        Language::Python => {
            if info.build_tool.as_deref() == Some("poetry") {
                "poetry build".to_string()
            } else {
                "python setup.py build".to_string()
            }
        }
        Language::Rust => match target {
            Some(t) => format!("cargo build --bin {}", t),
            None => "cargo build".to_string(),
        },
        Language::Unknown => {
            return Err(ToolError::execution(format!(
                "building not supported for language: {}",
                info.language
            )));
        }
    };
    Ok(command)
}
