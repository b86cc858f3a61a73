//! Session persistence

use crate::analyzer::ProjectInfo;
use buddy_agent::ConversationTurn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything kept between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub project_info: Option<ProjectInfo>,
    #[serde(default)]
    pub conversations: Vec<ConversationTurn>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub humor_level: u8,
}

impl SessionData {
    fn empty(humor_level: u8) -> Self {
        Self {
            project_info: None,
            conversations: Vec::new(),
            last_updated: Utc::now(),
            total_sessions: 0,
            humor_level,
        }
    }
}

/// Files written before sessions carried metadata: a bare list of
/// alternating user and model texts
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Session(SessionData),
    Legacy(Vec<String>),
}

/// Load the session at `path`. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<SessionData>, HistoryError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(HistoryError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let stored: StoredSession =
        serde_json::from_str(&content).map_err(|source| HistoryError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(Some(match stored {
        StoredSession::Session(data) => data,
        StoredSession::Legacy(texts) => {
            debug!(path = %path.display(), "converting legacy history");
            let mut data = SessionData::empty(0);
            data.total_sessions = 1;
            data.conversations = texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    if i % 2 == 0 {
                        ConversationTurn::user(text)
                    } else {
                        ConversationTurn::model(text)
                    }
                })
                .collect();
            data
        }
    }))
}

/// Save `history` into the session at `path`.
///
/// Existing metadata is kept: `project_info` replaces the stored one only when
/// given and `humor_level` only when non-zero. Every save counts as a session.
pub fn save(
    path: &Path,
    history: &[ConversationTurn],
    project_info: Option<&ProjectInfo>,
    humor_level: u8,
) -> Result<SessionData, HistoryError> {
    let mut data = match load(path) {
        Ok(Some(data)) => data,
        Ok(None) => SessionData::empty(humor_level),
        Err(e) => {
            warn!("Replacing unreadable session file: {}", e);
            SessionData::empty(humor_level)
        }
    };

    data.conversations = history.to_vec();
    data.last_updated = Utc::now();
    data.total_sessions += 1;
    if let Some(info) = project_info {
        data.project_info = Some(info.clone());
    }
    if humor_level > 0 {
        data.humor_level = humor_level;
    }

    let json = serde_json::to_string_pretty(&data)?;
    write_atomic(path, json.as_bytes())?;
    debug!(
        path = %path.display(),
        turns = data.conversations.len(),
        sessions = data.total_sessions,
        "session saved"
    );
    Ok(data)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HistoryError> {
    let io_err = |source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Language;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn project() -> ProjectInfo {
        ProjectInfo {
            root_path: PathBuf::from("/work"),
            language: Language::Rust,
            framework: None,
            package_manager: None,
            build_tool: Some("cargo".into()),
            test_framework: None,
            dependencies: vec!["serde".into()],
            scripts: BTreeMap::new(),
            files: vec!["Cargo.toml".into()],
        }
    }

    fn turns(texts: &[&str]) -> Vec<ConversationTurn> {
        let mut history = Vec::new();
        for pair in texts.chunks(2) {
            buddy_agent::conversation::commit_turn(&mut history, pair[0], pair[1]);
        }
        history
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("CB.hist")).unwrap().is_none());
    }

    #[test]
    fn test_round_trip_counts_sessions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CB.hist");

        save(&path, &turns(&["hi", "hello"]), Some(&project()), 20).unwrap();
        let second = save(&path, &turns(&["hi", "hello", "more", "sure"]), None, 0).unwrap();
        assert_eq!(second.total_sessions, 2);

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded, second);
        assert_eq!(loaded.conversations.len(), 4);
        assert_eq!(loaded.project_info, Some(project()));
        assert_eq!(loaded.humor_level, 20);
        assert!(!dir.path().join("CB.hist.tmp").exists());
    }

    #[test]
    fn test_humor_level_updates_when_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CB.hist");
        save(&path, &[], None, 10).unwrap();
        let data = save(&path, &[], None, 70).unwrap();
        assert_eq!(data.humor_level, 70);
    }

    #[test]
    fn test_undecodable_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CB.hist");
        fs::write(&path, "\u{0}\u{1}binary").unwrap();
        assert!(matches!(load(&path), Err(HistoryError::Decode { .. })));

        // Saving over it starts a fresh session
        let data = save(&path, &[], None, 0).unwrap();
        assert_eq!(data.total_sessions, 1);
    }

    #[test]
    fn test_legacy_string_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CB.hist");
        fs::write(&path, r#"["question", "answer", "follow up"]"#).unwrap();

        let data = load(&path).unwrap().unwrap();
        assert_eq!(data.total_sessions, 1);
        assert_eq!(
            data.conversations,
            vec![
                ConversationTurn::user("question"),
                ConversationTurn::model("answer"),
                ConversationTurn::user("follow up"),
            ]
        );
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("CB.hist");
        save(&path, &turns(&["a", "b"]), None, 0).unwrap();
        assert!(path.exists());
    }
}
