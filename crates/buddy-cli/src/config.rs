//! Configuration file and environment overrides

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_HISTORY_FILE: &str = "CB.hist";

/// Commands the shell tool may start, matched against the first word
const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    // Languages and runtimes
    "go", "gofmt", "goimports", "python", "python3", "py", "node", "java", "javac", "ruby",
    "perl", "php", "rustc", "cargo", "dotnet", "lua",
    // Package managers
    "npm", "npx", "yarn", "pnpm", "pip", "pip3", "gem", "composer", "bundle", "poetry",
    "pipenv", "maven", "mvn", "gradle", "nuget",
    // Version control
    "git", "gitk", "svn", "hg",
    // Build tools and compilers
    "make", "cmake", "nmake", "msbuild", "ant", "webpack", "vite", "rollup", "gcc", "g++",
    "clang", "clang++", "cl", "nvcc", "tsc", "babel",
    // Test runners
    "jest", "mocha", "pytest", "phpunit", "junit", "karma", "cypress",
    // Linters and formatters
    "eslint", "prettier", "pylint", "black", "flake8", "rubocop", "phpstan", "golint",
    "rustfmt", "stylelint",
    // Databases
    "mysql", "psql", "sqlite3", "mongo", "mongosh", "redis-cli",
    // Containers and cloud
    "docker", "docker-compose", "kubectl", "podman", "vagrant", "aws", "az", "gcloud",
    "firebase", "heroku", "vercel", "netlify",
    // Windows shell
    "dir", "type", "copy", "xcopy", "move", "del", "mkdir", "rmdir", "cd", "cls", "echo",
    "find", "findstr", "where", "tree", "attrib", "systeminfo", "ipconfig", "netstat", "ping",
    "tracert", "nslookup", "tasklist",
    // Unix shell
    "ls", "cat", "grep", "cp", "mv", "rm", "pwd", "touch", "chmod", "head", "tail", "wc",
    "sort", "uniq", "diff", "sed", "awk", "curl", "wget", "ssh", "scp", "rsync",
    // Editors
    "vim", "nvim", "nano", "emacs", "code", "notepad",
    // Archives
    "tar", "zip", "unzip", "7z", "gzip", "gunzip", "bzip2",
    // System utilities
    "env", "printenv", "which", "whoami", "hostname", "date", "time", "clear", "history",
    "man", "help", "choco", "scoop", "brew", "apt", "apt-get", "yum", "dnf",
    // Misc
    "jq", "base64", "openssl", "gpg", "nc", "telnet",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration for console-buddy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini model id
    pub model: String,
    /// API key; the environment is usually the better place for it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// 0-100, passed to the model as a tone hint
    pub humor_level: u8,
    /// Session file, relative paths resolve against the working directory
    pub history_file: PathBuf,
    pub allowed_commands: Vec<String>,
    /// Default tracing filter directive
    pub log_level: String,
    /// Analyze the working directory on startup when no project is cached
    pub auto_analyze: bool,
    pub max_stream_advances: usize,
    pub turn_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let mut allowed_commands: Vec<String> = Vec::new();
        for cmd in DEFAULT_ALLOWED_COMMANDS {
            if !allowed_commands.iter().any(|c| c == cmd) {
                allowed_commands.push(cmd.to_string());
            }
        }

        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            humor_level: 0,
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
            allowed_commands,
            log_level: "info".to_string(),
            auto_analyze: true,
            max_stream_advances: buddy_agent::engine::DEFAULT_MAX_STREAM_ADVANCES,
            turn_timeout_secs: buddy_agent::engine::DEFAULT_TURN_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("console-buddy")
    }

    /// Get the config file path, honoring `BUDDY_CONFIG_PATH`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BUDDY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Directory for the log file
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("console-buddy")
    }

    /// Read a config file. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content)?;
        config.humor_level = config.humor_level.min(100);
        Ok(config)
    }

    /// Load the config file and apply environment overrides.
    ///
    /// Runs before logging is up, so problems go to stderr.
    pub fn load() -> Self {
        let path = Self::config_path();
        let mut config = match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}; using defaults", e);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from `lookup` (the process environment in practice).
    /// Empty and unparsable values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = get("BUDDY_MODEL") {
            self.model = model.trim().to_string();
        }
        if let Some(humor) = get("BUDDY_HUMOR_LEVEL").and_then(|v| v.trim().parse::<u8>().ok()) {
            self.humor_level = humor.min(100);
        }
        if let Some(level) = get("BUDDY_LOG_LEVEL") {
            self.log_level = level.trim().to_lowercase();
        }
        if let Some(commands) = get("BUDDY_ALLOWED_COMMANDS") {
            self.allowed_commands = commands
                .split(',')
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if let Some(auto) = get("BUDDY_AUTO_ANALYZE").and_then(|v| parse_bool(&v)) {
            self.auto_analyze = auto;
        }
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    /// History file resolved against `cwd`
    pub fn history_path(&self, cwd: &Path) -> PathBuf {
        if self.history_file.is_absolute() {
            self.history_file.clone()
        } else {
            cwd.join(&self.history_file)
        }
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# console-buddy configuration
# Place at ~/.config/console-buddy/config.toml or point BUDDY_CONFIG_PATH at it

# Gemini model
model = "gemini-2.5-flash"

# API key (GEMINI_API_KEY or GOOGLE_API_KEY in the environment also work)
# api_key = "..."

# 0-100
humor_level = 0

# Session file, relative to the working directory
history_file = "CB.hist"

# tracing filter, e.g. "info" or "buddy=debug"
log_level = "info"

# Analyze the project on startup
auto_analyze = true

# Bounds for a single turn
max_stream_advances = 15
turn_timeout_secs = 120

# Commands the shell tool may run (first word, case-insensitive)
# allowed_commands = ["git", "cargo", "ls"]
"#
}
