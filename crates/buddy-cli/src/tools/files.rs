//! File system tools

use buddy_agent::ToolError;
use std::path::Path;
use tokio::fs;

fn io_error(action: &str, path: &Path, e: std::io::Error) -> ToolError {
    ToolError::execution(format!("failed to {} {}: {}", action, path.display(), e))
}

/// Write `content` to `path`, creating parent directories
pub async fn create(path: &Path, content: &str) -> Result<(), ToolError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("create directory", parent, e))?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| io_error("write", path, e))
}

pub async fn read(path: &Path) -> Result<String, ToolError> {
    fs::read_to_string(path)
        .await
        .map_err(|e| io_error("read", path, e))
}

/// Overwrite an existing file
pub async fn update(path: &Path, content: &str) -> Result<(), ToolError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(ToolError::execution(format!(
            "file {} does not exist",
            path.display()
        )));
    }
    fs::write(path, content)
        .await
        .map_err(|e| io_error("write", path, e))
}

pub async fn delete(path: &Path) -> Result<(), ToolError> {
    fs::remove_file(path)
        .await
        .map_err(|e| io_error("delete", path, e))
}

/// Sorted entry names of a directory, one per line
pub async fn list(path: &Path) -> Result<String, ToolError> {
    let mut dir = fs::read_dir(path)
        .await
        .map_err(|e| io_error("list", path, e))?;

    let mut names = Vec::new();
    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| io_error("list", path, e))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_update_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        let err = update(&path, "x").await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(list(dir.path()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_list_includes_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        assert_eq!(list(dir.path()).await.unwrap(), "Cargo.toml\nsrc");
    }

    #[tokio::test]
    async fn test_delete_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = delete(&dir.path().join("gone")).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to delete"));
    }
}
