//! Project structure detection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse package.json: {0}")]
    PackageJson(#[from] serde_json::Error),

    #[error("failed to parse Cargo.toml: {0}")]
    CargoToml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Go,
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "Go",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Python => "Python",
            Self::Rust => "Rust",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Self::JavaScript | Self::TypeScript)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Go,
    Npm,
    Yarn,
    Pnpm,
    Pip,
    Cargo,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Pip => "pip",
            Self::Cargo => "cargo",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the analyzer learned about a project directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub root_path: PathBuf,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManager>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_framework: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,
    /// Relevant files relative to the root, sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl ProjectInfo {
    fn unknown(root: &Path) -> Self {
        Self {
            root_path: root.to_path_buf(),
            language: Language::Unknown,
            framework: None,
            package_manager: None,
            build_tool: None,
            test_framework: None,
            dependencies: Vec::new(),
            scripts: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    /// `Language (Framework)` for the status bar
    pub fn label(&self) -> String {
        match &self.framework {
            Some(framework) => format!("{} ({})", self.language, framework),
            None => self.language.to_string(),
        }
    }

    /// Short description for the system instruction
    pub fn summary(&self) -> String {
        let mut out = String::from("**Current Project Context:**\n");
        out.push_str(&format!("- Language: {}\n", self.language));
        if let Some(framework) = &self.framework {
            out.push_str(&format!("- Framework: {}\n", framework));
        }
        if let Some(pm) = &self.package_manager {
            out.push_str(&format!("- Package Manager: {}\n", pm));
        }
        if let Some(build) = &self.build_tool {
            out.push_str(&format!("- Build Tool: {}\n", build));
        }
        if let Some(test) = &self.test_framework {
            out.push_str(&format!("- Test Framework: {}\n", test));
        }
        if !self.dependencies.is_empty() {
            out.push_str(&format!("- Dependencies: {}\n", self.dependencies.len()));
        }
        if !self.scripts.is_empty() {
            let names: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
            out.push_str(&format!("- Scripts: {}\n", names.join(", ")));
        }
        out.push_str(&format!("- Files: {}\n", self.files.len()));
        out
    }
}

/// Detect language, tooling and relevant files under `root`
pub fn analyze(root: &Path) -> Result<ProjectInfo, AnalyzeError> {
    if !root.is_dir() {
        return Err(AnalyzeError::NotADirectory(root.to_path_buf()));
    }

    let mut info = ProjectInfo::unknown(root);
    let exists = |name: &str| root.join(name).exists();

    if exists("go.mod") {
        info.language = Language::Go;
        info.package_manager = Some(PackageManager::Go);
        info.build_tool = Some("go".into());
        analyze_go(root, &mut info)?;
    } else if exists("package.json") {
        info.language = Language::JavaScript;
        info.package_manager = Some(if exists("yarn.lock") {
            PackageManager::Yarn
        } else if exists("pnpm-lock.yaml") {
            PackageManager::Pnpm
        } else {
            PackageManager::Npm
        });
        analyze_node(root, &mut info)?;
        if exists("tsconfig.json") {
            info.language = Language::TypeScript;
        }
    } else if exists("requirements.txt") || exists("pyproject.toml") || exists("setup.py") {
        info.language = Language::Python;
        info.package_manager = Some(PackageManager::Pip);
        if exists("pyproject.toml") {
            info.build_tool = Some("poetry".into());
        }
        analyze_python(root, &mut info)?;
    } else if exists("Cargo.toml") {
        info.language = Language::Rust;
        info.package_manager = Some(PackageManager::Cargo);
        info.build_tool = Some("cargo".into());
        analyze_rust(root, &mut info)?;
    }

    let mut files = Vec::new();
    scan_files(root, root, &mut files);
    files.sort();
    info.files = files;

    debug!(
        root = %root.display(),
        language = %info.language,
        files = info.files.len(),
        "project analyzed"
    );
    Ok(info)
}

fn read(path: PathBuf) -> Result<String, AnalyzeError> {
    fs::read_to_string(&path).map_err(|source| AnalyzeError::Read { path, source })
}

fn analyze_go(root: &Path, info: &mut ProjectInfo) -> Result<(), AnalyzeError> {
    let content = read(root.join("go.mod"))?;
    let mut in_block = false;

    for line in content.lines().map(str::trim) {
        if line.starts_with("require (") {
            in_block = true;
            continue;
        }
        if in_block && line == ")" {
            in_block = false;
            continue;
        }

        let spec = if in_block {
            Some(line)
        } else {
            line.strip_prefix("require ")
        };
        let Some(spec) = spec else { continue };
        let mut fields = spec.split_whitespace();
        if let (Some(module), Some(_version)) = (fields.next(), fields.next()) {
            if !module.starts_with("//") {
                info.dependencies.push(module.to_string());
            }
        }
    }

    if go_sources_mention(root, "github.com/stretchr/testify") {
        info.test_framework = Some("testify".into());
    }
    Ok(())
}

fn go_sources_mention(dir: &Path, needle: &str) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if !is_skipped_dir(&entry.file_name().to_string_lossy())
                && go_sources_mention(&path, needle)
            {
                return true;
            }
        } else if path.extension().is_some_and(|e| e == "go")
            && fs::read_to_string(&path).is_ok_and(|c| c.contains(needle))
        {
            return true;
        }
    }
    false
}

#[derive(Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

fn analyze_node(root: &Path, info: &mut ProjectInfo) -> Result<(), AnalyzeError> {
    let pkg: PackageJson = serde_json::from_str(&read(root.join("package.json"))?)?;

    info.dependencies = pkg
        .dependencies
        .keys()
        .chain(pkg.dev_dependencies.keys())
        .cloned()
        .collect();
    info.scripts = pkg.scripts;

    info.framework = [
        ("react", "React"),
        ("vue", "Vue"),
        ("angular", "Angular"),
        ("express", "Express"),
    ]
    .iter()
    .find(|(dep, _)| pkg.dependencies.contains_key(*dep))
    .map(|(_, name)| name.to_string());

    info.test_framework = [("jest", "Jest"), ("mocha", "Mocha")]
        .iter()
        .find(|(dep, _)| pkg.dev_dependencies.contains_key(*dep))
        .map(|(_, name)| name.to_string());

    if pkg.dependencies.contains_key("typescript") || pkg.dev_dependencies.contains_key("typescript")
    {
        info.language = Language::TypeScript;
    }
    Ok(())
}

fn analyze_python(root: &Path, info: &mut ProjectInfo) -> Result<(), AnalyzeError> {
    let requirements = root.join("requirements.txt");
    if requirements.exists() {
        for line in read(requirements)?.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let name = line
                .split(['=', '>', '<', '!'])
                .next()
                .map(str::trim)
                .unwrap_or_default();
            if !name.is_empty() {
                info.dependencies.push(name.to_string());
            }
        }
    }

    let mentions = |dep: &str| {
        info.dependencies
            .iter()
            .any(|d| d.to_lowercase().contains(dep))
    };
    info.test_framework = if mentions("pytest") {
        Some("pytest".into())
    } else if mentions("unittest") {
        Some("unittest".into())
    } else {
        None
    };
    Ok(())
}

fn analyze_rust(root: &Path, info: &mut ProjectInfo) -> Result<(), AnalyzeError> {
    let manifest: toml::Table = toml::from_str(&read(root.join("Cargo.toml"))?)?;
    if let Some(deps) = manifest.get("dependencies").and_then(|d| d.as_table()) {
        info.dependencies = deps.keys().cloned().collect();
    }
    Ok(())
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || matches!(name, "node_modules" | "vendor" | "target")
}

const RELEVANT_EXTENSIONS: &[&str] = &[
    "go", "js", "ts", "jsx", "tsx", "py", "rs", "java", "c", "cpp", "h", "hpp", "json", "yaml",
    "yml", "toml", "xml", "md", "txt", "cfg", "conf", "ini",
];

const RELEVANT_NAMES: &[&str] = &[
    "readme",
    "license",
    "dockerfile",
    "makefile",
    "gitignore",
    "gitattributes",
];

fn is_relevant(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if RELEVANT_EXTENSIONS.contains(&ext.as_str()) {
        return true;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    RELEVANT_NAMES.iter().any(|n| name.contains(n))
}

/// Unreadable entries are skipped
fn scan_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !is_skipped_dir(&entry.file_name().to_string_lossy()) {
                scan_files(root, &path, out);
            }
        } else if is_relevant(&path) {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
}
