//! Code and file templates driven by the analyzed project

use crate::analyzer::{Language, ProjectInfo};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_APP_NAME: &str = "Console Buddy";
pub const DEFAULT_UNIQUE_ID: &str = "cb-app";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GenerateError {
    #[error("unsupported code type: {0}")]
    UnsupportedKind(String),

    #[error("no {kind} template for {language}")]
    NoTemplate { kind: String, language: Language },

    #[error("unsupported config type: {0}")]
    UnsupportedConfig(String),

    #[error("unsupported web file type: {0}")]
    UnsupportedWebFile(String),
}

/// A struct or class field
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: String,
    #[serde(default)]
    pub description: String,
    /// Go struct tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Generated code with the filename it should live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub code: String,
    pub filename: String,
}

#[derive(Deserialize, Default)]
struct FunctionSpec {
    #[serde(default)]
    params: Vec<String>,
    #[serde(default)]
    returns: Vec<String>,
}

#[derive(Deserialize, Default)]
struct ClassSpec {
    #[serde(default)]
    fields: Vec<Field>,
}

/// Parse an optional JSON spec, falling back to defaults on bad input
fn parse_spec<T: for<'de> Deserialize<'de> + Default>(spec: Option<&str>) -> T {
    match spec.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Ignoring malformed generator spec: {}", e);
            T::default()
        }),
        None => T::default(),
    }
}

fn opt_str<'a>(options: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn to_snake(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// Templates specialized for one project
pub struct CodeGenerator<'a> {
    project: &'a ProjectInfo,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(project: &'a ProjectInfo) -> Self {
        Self { project }
    }

    fn language(&self) -> Language {
        self.project.language
    }

    fn no_template(&self, kind: &str) -> GenerateError {
        GenerateError::NoTemplate {
            kind: kind.to_string(),
            language: self.language(),
        }
    }

    pub fn function(
        &self,
        name: &str,
        description: &str,
        params: &[String],
        returns: &[String],
    ) -> Result<String, GenerateError> {
        let args = params.join(", ");
        let code = match self.language() {
            Language::Go => {
                let ret = match returns.len() {
                    0 => String::new(),
                    1 => format!(" {}", returns[0]),
                    _ => format!(" ({})", returns.join(", ")),
                };
                format!(
                    "// {name} {description}\nfunc {name}({args}){ret} {{\n\tpanic(\"not implemented\")\n}}\n"
                )
            }
            Language::JavaScript => {
                let mut doc = format!("/**\n * {description}\n");
                for p in params {
                    doc.push_str(&format!(" * @param {{*}} {p}\n"));
                }
                if !returns.is_empty() {
                    doc.push_str(" * @returns {*}\n");
                }
                doc.push_str(" */\n");
                format!(
                    "{doc}function {name}({args}) {{\n  throw new Error('{name} is not implemented');\n}}\n"
                )
            }
            Language::TypeScript => {
                let typed: Vec<String> = params
                    .iter()
                    .map(|p| {
                        if p.contains(':') {
                            p.clone()
                        } else {
                            format!("{p}: unknown")
                        }
                    })
                    .collect();
                let ret = match returns.len() {
                    0 => "void".to_string(),
                    1 => returns[0].clone(),
                    _ => format!("[{}]", returns.join(", ")),
                };
                format!(
                    "/**\n * {description}\n */\nexport function {name}({}): {ret} {{\n  throw new Error('{name} is not implemented');\n}}\n",
                    typed.join(", ")
                )
            }
            Language::Python => {
                let mut doc = format!("    \"\"\"{description}\n");
                if !params.is_empty() {
                    doc.push_str("\n    Args:\n");
                    for p in params {
                        doc.push_str(&format!("        {p}:\n"));
                    }
                }
                if !returns.is_empty() {
                    doc.push_str(&format!("\n    Returns:\n        {}\n", returns.join(", ")));
                }
                doc.push_str("    \"\"\"\n");
                format!(
                    "def {}({args}):\n{doc}    raise NotImplementedError\n",
                    to_snake(name)
                )
            }
            Language::Rust => {
                let ret = match returns.len() {
                    0 => String::new(),
                    1 => format!(" -> {}", returns[0]),
                    _ => format!(" -> ({})", returns.join(", ")),
                };
                format!(
                    "/// {description}\npub fn {}({args}){ret} {{\n    todo!()\n}}\n",
                    to_snake(name)
                )
            }
            Language::Unknown => return Err(self.no_template("function")),
        };
        Ok(code)
    }

    pub fn class(
        &self,
        name: &str,
        description: &str,
        fields: &[Field],
    ) -> Result<String, GenerateError> {
        let code = match self.language() {
            Language::Go => {
                let mut out = format!("// {name} {description}\ntype {name} struct {{\n");
                for f in fields {
                    out.push_str(&format!("\t{} {}", f.name, f.ty));
                    if !f.tags.is_empty() {
                        let tags: Vec<String> = f
                            .tags
                            .iter()
                            .map(|(k, v)| format!("{k}:\"{v}\""))
                            .collect();
                        out.push_str(&format!(" `{}`", tags.join(" ")));
                    }
                    if !f.description.is_empty() {
                        out.push_str(&format!(" // {}", f.description));
                    }
                    out.push('\n');
                }
                out.push_str(&format!(
                    "}}\n\n// New{name} creates a new {name}\nfunc New{name}() *{name} {{\n\treturn &{name}{{}}\n}}\n"
                ));
                out
            }
            Language::JavaScript => {
                let mut out = format!("/**\n * {description}\n */\nclass {name} {{\n  constructor() {{\n");
                for f in fields {
                    out.push_str(&format!("    this.{} = null;", f.name));
                    if !f.description.is_empty() {
                        out.push_str(&format!(" // {}", f.description));
                    }
                    out.push('\n');
                }
                out.push_str("  }\n}\n");
                out
            }
            Language::TypeScript => {
                let mut out = format!("/**\n * {description}\n */\nexport class {name} {{\n");
                for f in fields {
                    let ty = if f.ty.is_empty() { "unknown" } else { &f.ty };
                    out.push_str(&format!("  {}?: {};", f.name, ty));
                    if !f.description.is_empty() {
                        out.push_str(&format!(" // {}", f.description));
                    }
                    out.push('\n');
                }
                out.push_str("}\n");
                out
            }
            Language::Python => {
                let mut out =
                    format!("class {name}:\n    \"\"\"{description}\"\"\"\n\n    def __init__(self):\n");
                if fields.is_empty() {
                    out.push_str("        pass\n");
                }
                for f in fields {
                    out.push_str(&format!("        self.{} = None", f.name));
                    if !f.description.is_empty() {
                        out.push_str(&format!("  # {}", f.description));
                    }
                    out.push('\n');
                }
                out
            }
            Language::Rust => {
                let mut out =
                    format!("/// {description}\n#[derive(Debug, Clone, Default)]\npub struct {name} {{\n");
                for f in fields {
                    if !f.description.is_empty() {
                        out.push_str(&format!("    /// {}\n", f.description));
                    }
                    out.push_str(&format!("    pub {}: {},\n", to_snake(&f.name), f.ty));
                }
                out.push_str("}\n");
                out
            }
            Language::Unknown => return Err(self.no_template("class")),
        };
        Ok(code)
    }

    /// Test skeleton for `target`, using the detected test framework
    pub fn test(&self, target: &str) -> Result<String, GenerateError> {
        let framework = self
            .project
            .test_framework
            .as_deref()
            .map(str::to_lowercase);
        let snake = to_snake(target);

        let code = match self.language() {
            Language::Go if framework.as_deref() == Some("testify") => format!(
                "package main\n\nimport (\n\t\"testing\"\n\n\t\"github.com/stretchr/testify/assert\"\n)\n\nfunc Test{target}(t *testing.T) {{\n\tassert.Fail(t, \"test for {target} not implemented\")\n}}\n"
            ),
            Language::Go => format!(
                "package main\n\nimport \"testing\"\n\nfunc Test{target}(t *testing.T) {{\n\tt.Skip(\"test for {target} not implemented\")\n}}\n"
            ),
            Language::JavaScript | Language::TypeScript => format!(
                "describe('{target}', () => {{\n  test('works', () => {{\n    expect(true).toBe(false);\n  }});\n}});\n"
            ),
            Language::Python if framework.as_deref() == Some("pytest") => format!(
                "import pytest\n\n\ndef test_{snake}():\n    \"\"\"Test {target}\"\"\"\n    pytest.fail(\"test for {target} not implemented\")\n"
            ),
            Language::Python => format!(
                "import unittest\n\n\nclass Test{target}(unittest.TestCase):\n    def test_{snake}(self):\n        \"\"\"Test {target}\"\"\"\n        self.fail(\"test for {target} not implemented\")\n\n\nif __name__ == '__main__':\n    unittest.main()\n"
            ),
            Language::Rust => format!(
                "#[cfg(test)]\nmod tests {{\n    use super::*;\n\n    #[test]\n    fn test_{snake}() {{\n        todo!(\"test for {target}\");\n    }}\n}}\n"
            ),
            Language::Unknown => return Err(self.no_template("test")),
        };
        Ok(code)
    }

    /// `dockerfile`, `gitignore` or `makefile`
    pub fn config(&self, kind: &str, options: &Map<String, Value>) -> Result<String, GenerateError> {
        match kind.to_lowercase().as_str() {
            "dockerfile" => Ok(self.dockerfile(options)),
            "gitignore" | ".gitignore" => Ok(self.gitignore()),
            "makefile" => self.makefile(),
            other => Err(GenerateError::UnsupportedConfig(other.to_string())),
        }
    }

    fn dockerfile(&self, options: &Map<String, Value>) -> String {
        let mut out = format!(
            "FROM {}\n\nWORKDIR /app\n\n",
            opt_str(options, "baseImage").unwrap_or("alpine:latest")
        );

        if let Some(commands) = options.get("installCommands").and_then(Value::as_array) {
            for cmd in commands.iter().filter_map(Value::as_str) {
                out.push_str(&format!("RUN {cmd}\n"));
            }
            if !commands.is_empty() {
                out.push('\n');
            }
        }
        out.push_str("COPY . .\n\n");
        if let Some(build) = opt_str(options, "buildCommand") {
            out.push_str(&format!("RUN {build}\n\n"));
        }
        match options.get("port") {
            Some(Value::Number(port)) => out.push_str(&format!("EXPOSE {port}\n\n")),
            Some(Value::String(port)) if !port.is_empty() => {
                out.push_str(&format!("EXPOSE {port}\n\n"))
            }
            _ => {}
        }

        let cmd: Vec<String> = match opt_str(options, "startCommand") {
            Some(start) => start.split_whitespace().map(String::from).collect(),
            None => vec!["echo".into(), "Hello World".into()],
        };
        out.push_str(&format!(
            "CMD {}\n",
            serde_json::to_string(&cmd).unwrap_or_else(|_| "[]".into())
        ));
        out
    }

    fn gitignore(&self) -> String {
        let deps = match self.language() {
            Language::Go => "vendor/\n",
            Language::JavaScript | Language::TypeScript => {
                "node_modules/\nnpm-debug.log*\nyarn-debug.log*\nyarn-error.log*\n"
            }
            Language::Python => "__pycache__/\n*.py[cod]\n*$py.class\nvenv/\nenv/\n",
            Language::Rust => "target/\n",
            Language::Unknown => "",
        };
        format!(
            "# Dependencies\n{deps}\n# IDE\n.vscode/\n.idea/\n*.swp\n*.swo\n\n# OS\n.DS_Store\nThumbs.db\n\n# Build outputs\ndist/\nbuild/\n*.exe\n*.dll\n*.so\n*.dylib\n\n# Logs\n*.log\n\n# Environment variables\n.env\n.env.local\n\n# Temporary files\n*.tmp\n*.temp\n\n# Console Buddy history\nCB.hist\n"
        )
    }

    fn project_name(&self) -> String {
        self.project
            .root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "app".into())
    }

    fn makefile(&self) -> Result<String, GenerateError> {
        let name = self.project_name();
        let pm = self
            .project
            .package_manager
            .map(|p| p.as_str())
            .unwrap_or("npm");
        let code = match self.language() {
            Language::Go => format!(
                ".PHONY: build test clean run install\n\nbuild:\n\tgo build -o bin/{name} .\n\ntest:\n\tgo test ./...\n\nclean:\n\trm -rf bin/\n\nrun: build\n\t./bin/{name}\n\ninstall:\n\tgo mod download\n\tgo mod tidy\n"
            ),
            Language::JavaScript | Language::TypeScript => format!(
                ".PHONY: install build test clean dev\n\ninstall:\n\t{pm} install\n\nbuild:\n\t{pm} run build\n\ntest:\n\t{pm} test\n\nclean:\n\trm -rf node_modules dist build\n\ndev:\n\t{pm} run dev\n"
            ),
            Language::Python => {
                let test = if self.project.test_framework.as_deref() == Some("pytest") {
                    "pytest"
                } else {
                    "python -m unittest discover"
                };
                format!(
                    ".PHONY: install test clean dev\n\ninstall:\n\tpip install -r requirements.txt\n\ntest:\n\t{test}\n\nclean:\n\tfind . -type f -name \"*.pyc\" -delete\n\tfind . -type d -name \"__pycache__\" -delete\n\ndev:\n\tpython -m pip install -e .\n"
                )
            }
            Language::Rust => ".PHONY: build test clean run lint\n\nbuild:\n\tcargo build\n\ntest:\n\tcargo test\n\nclean:\n\tcargo clean\n\nrun:\n\tcargo run\n\nlint:\n\tcargo clippy -- -D warnings\n".to_string(),
            Language::Unknown => return Err(self.no_template("makefile")),
        };
        Ok(code)
    }

    /// Standalone `html`, `css` or `js` file.
    ///
    /// Uses the `appName` and `uniqueId` options.
    pub fn web_file(&self, kind: &str, options: &Map<String, Value>) -> Result<String, GenerateError> {
        let app = opt_str(options, "appName").unwrap_or(DEFAULT_APP_NAME);
        let id = opt_str(options, "uniqueId").unwrap_or(DEFAULT_UNIQUE_ID);

        let code = match kind.to_lowercase().as_str() {
            "html" => format!(
                r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{app}</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  <div id="{id}" class="{id}-shell">
    <header class="{id}-header">
      <h1>{app}</h1>
    </header>
    <main class="{id}-main">
      <section class="{id}-panel" id="{id}-content"></section>
    </main>
    <footer class="{id}-footer">
      <small>{app}</small>
    </footer>
  </div>
  <script src="script.js"></script>
</body>
</html>
"#
            ),
            "css" => format!(
                r#"/* {app} styles */
:root {{
  --{id}-bg: #10141a;
  --{id}-fg: #e6e9ef;
  --{id}-accent: #4fb3bf;
}}

.{id}-shell {{
  min-height: 100vh;
  display: flex;
  flex-direction: column;
  background: var(--{id}-bg);
  color: var(--{id}-fg);
  font-family: system-ui, sans-serif;
}}

.{id}-header,
.{id}-footer {{
  padding: 1rem 2rem;
}}

.{id}-header h1 {{
  margin: 0;
  color: var(--{id}-accent);
}}

.{id}-main {{
  flex: 1;
  padding: 2rem;
}}

.{id}-panel {{
  border: 1px solid var(--{id}-accent);
  border-radius: 8px;
  padding: 1rem;
}}
"#
            ),
            "js" | "javascript" => format!(
                r#"// {app} script
(function () {{
  'use strict';

  const root = document.getElementById('{id}');
  const content = document.getElementById('{id}-content');

  function render(message) {{
    if (!content) return;
    const item = document.createElement('p');
    item.className = '{id}-item';
    item.textContent = message;
    content.appendChild(item);
  }}

  document.addEventListener('DOMContentLoaded', function () {{
    if (!root) return;
    render('{app} is ready.');
  }});
}})();
"#
            ),
            other => return Err(GenerateError::UnsupportedWebFile(other.to_string())),
        };
        Ok(code)
    }

    pub fn suggested_filename(&self, name: &str) -> String {
        match self.language() {
            Language::Go => format!("{}.go", name.to_lowercase()),
            Language::JavaScript => format!("{name}.js"),
            Language::TypeScript => format!("{name}.ts"),
            Language::Python => format!("{}.py", to_snake(name)),
            Language::Rust => format!("{}.rs", to_snake(name)),
            Language::Unknown => format!("{name}.txt"),
        }
    }

    pub fn suggested_test_filename(&self, name: &str) -> String {
        match self.language() {
            Language::Go => format!("{}_test.go", name.to_lowercase()),
            Language::JavaScript => format!("{name}.test.js"),
            Language::TypeScript => format!("{name}.test.ts"),
            Language::Python => format!("test_{}.py", to_snake(name)),
            Language::Rust => format!("{}_test.rs", to_snake(name)),
            Language::Unknown => format!("{name}_test.txt"),
        }
    }

    /// Generate `kind` (function, class/struct, test or config).
    ///
    /// `spec` is optional JSON: `{params, returns}` for functions,
    /// `{fields}` for classes, an options object for config files.
    pub fn generate(
        &self,
        kind: &str,
        name: &str,
        description: &str,
        spec: Option<&str>,
    ) -> Result<Generated, GenerateError> {
        match kind.to_lowercase().as_str() {
            "function" => {
                let spec: FunctionSpec = parse_spec(spec);
                Ok(Generated {
                    code: self.function(name, description, &spec.params, &spec.returns)?,
                    filename: self.suggested_filename(name),
                })
            }
            "class" | "struct" => {
                let spec: ClassSpec = parse_spec(spec);
                Ok(Generated {
                    code: self.class(name, description, &spec.fields)?,
                    filename: self.suggested_filename(name),
                })
            }
            "test" => Ok(Generated {
                code: self.test(name)?,
                filename: self.suggested_test_filename(name),
            }),
            "config" => {
                let options: Map<String, Value> = parse_spec(spec);
                Ok(Generated {
                    code: self.config(name, &options)?,
                    filename: name.to_string(),
                })
            }
            other => Err(GenerateError::UnsupportedKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::PackageManager;
    use serde_json::json;
    use std::path::PathBuf;

    fn project(language: Language) -> ProjectInfo {
        ProjectInfo {
            root_path: PathBuf::from("/work/demo"),
            language,
            framework: None,
            package_manager: None,
            build_tool: None,
            test_framework: None,
            dependencies: Vec::new(),
            scripts: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_go_function_from_spec() {
        let info = project(Language::Go);
        let generated = CodeGenerator::new(&info)
            .generate(
                "function",
                "Add",
                "adds two numbers",
                Some(r#"{"params": ["a int", "b int"], "returns": ["int"]}"#),
            )
            .unwrap();
        assert_eq!(generated.filename, "add.go");
        assert!(generated.code.contains("func Add(a int, b int) int {"));
    }

    #[test]
    fn test_rust_struct_fields() {
        let info = project(Language::Rust);
        let generated = CodeGenerator::new(&info)
            .generate(
                "struct",
                "UserRecord",
                "A stored user",
                Some(r#"{"fields": [{"name": "displayName", "type": "String", "description": "Shown in the UI"}]}"#),
            )
            .unwrap();
        assert_eq!(generated.filename, "user_record.rs");
        assert!(generated.code.contains("pub struct UserRecord {"));
        assert!(generated.code.contains("    /// Shown in the UI\n    pub display_name: String,"));
    }

    #[test]
    fn test_malformed_spec_falls_back_to_defaults() {
        let info = project(Language::Python);
        let generated = CodeGenerator::new(&info)
            .generate("function", "load", "loads data", Some("{oops"))
            .unwrap();
        assert!(generated.code.starts_with("def load():"));
        assert_eq!(generated.filename, "load.py");
    }

    #[test]
    fn test_test_templates_follow_framework() {
        let mut info = project(Language::Python);
        info.test_framework = Some("pytest".into());
        let generated = CodeGenerator::new(&info)
            .generate("test", "Parser", "", None)
            .unwrap();
        assert_eq!(generated.filename, "test_parser.py");
        assert!(generated.code.contains("def test_parser():"));

        info.test_framework = None;
        let code = CodeGenerator::new(&info).test("Parser").unwrap();
        assert!(code.contains("class TestParser(unittest.TestCase):"));
    }

    #[test]
    fn test_typescript_filenames() {
        let info = project(Language::TypeScript);
        let generator = CodeGenerator::new(&info);
        assert_eq!(generator.suggested_filename("Widget"), "Widget.ts");
        assert_eq!(generator.suggested_test_filename("Widget"), "Widget.test.ts");
    }

    #[test]
    fn test_unknown_language_has_no_code_templates() {
        let info = project(Language::Unknown);
        let err = CodeGenerator::new(&info)
            .generate("function", "f", "", None)
            .unwrap_err();
        assert_eq!(
            err,
            GenerateError::NoTemplate {
                kind: "function".into(),
                language: Language::Unknown
            }
        );
    }

    #[test]
    fn test_unsupported_kind() {
        let info = project(Language::Go);
        let err = CodeGenerator::new(&info)
            .generate("interface", "X", "", None)
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported code type: interface");
    }

    #[test]
    fn test_config_files() {
        let mut info = project(Language::JavaScript);
        info.package_manager = Some(PackageManager::Yarn);
        let generator = CodeGenerator::new(&info);

        let makefile = generator.generate("config", "makefile", "", None).unwrap();
        assert_eq!(makefile.filename, "makefile");
        assert!(makefile.code.contains("install:\n\tyarn install"));

        let gitignore = generator.config("gitignore", &Map::new()).unwrap();
        assert!(gitignore.contains("node_modules/"));
        assert!(gitignore.ends_with("CB.hist\n"));

        let dockerfile = generator
            .config(
                "dockerfile",
                &options(json!({
                    "baseImage": "node:20",
                    "installCommands": ["npm ci"],
                    "port": 3000,
                    "startCommand": "npm start"
                })),
            )
            .unwrap();
        assert!(dockerfile.starts_with("FROM node:20\n"));
        assert!(dockerfile.contains("RUN npm ci\n"));
        assert!(dockerfile.contains("EXPOSE 3000\n"));
        assert!(dockerfile.ends_with("CMD [\"npm\",\"start\"]\n"));

        assert_eq!(
            generator.config("nginx", &Map::new()).unwrap_err(),
            GenerateError::UnsupportedConfig("nginx".into())
        );
    }

    #[test]
    fn test_web_files_use_options_and_defaults() {
        let info = project(Language::Unknown);
        let generator = CodeGenerator::new(&info);

        let html = generator.web_file("html", &Map::new()).unwrap();
        assert!(html.contains("<title>Console Buddy</title>"));
        assert!(html.contains("id=\"cb-app\""));

        let css = generator
            .web_file("css", &options(json!({"uniqueId": "todo"})))
            .unwrap();
        assert!(css.contains(".todo-shell {"));

        let js = generator
            .web_file("js", &options(json!({"appName": "Tasks"})))
            .unwrap();
        assert!(js.contains("render('Tasks is ready.');"));

        assert!(matches!(
            generator.web_file("svg", &Map::new()),
            Err(GenerateError::UnsupportedWebFile(_))
        ));
    }

    #[test]
    fn test_to_snake() {
        assert_eq!(to_snake("UserRecord"), "user_record");
        assert_eq!(to_snake("parse-args"), "parse_args");
        assert_eq!(to_snake("load"), "load");
    }
}
