//! Local tools the model can call

mod files;
mod generate;
mod project;

use crate::analyzer::ProjectInfo;
use async_trait::async_trait;
use buddy_agent::{ArgumentValidator, ToolDispatcher, ToolError};
use buddy_ai::FunctionDeclaration;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Object schema whose properties are all strings
fn string_schema(properties: &[(&str, &str)], required: &[&str]) -> Value {
    let props: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "string", "description": description }),
            )
        })
        .collect();
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

fn declaration(name: &str, description: &str, parameters: Value) -> FunctionDeclaration {
    FunctionDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// Every tool the dispatcher knows, in the order shown to the model
pub fn declarations() -> Vec<FunctionDeclaration> {
    vec![
        declaration(
            "execute_shell_command",
            "Runs a shell command in the project directory, for example 'go run main.go' or 'npm install'. Only allow-listed programs can be started. Use the file tools for file changes.",
            string_schema(&[("command", "The command line to run.")], &["command"]),
        ),
        declaration(
            "create_file",
            "Creates a file with the given content, creating parent directories as needed.",
            string_schema(
                &[
                    ("path", "Path of the file to create."),
                    ("content", "Content to write."),
                ],
                &["path", "content"],
            ),
        ),
        declaration(
            "read_file",
            "Returns the full content of a file.",
            string_schema(&[("path", "Path of the file to read.")], &["path"]),
        ),
        declaration(
            "update_file",
            "Replaces the entire content of an existing file.",
            string_schema(
                &[
                    ("path", "Path of the file to update."),
                    ("content", "New content of the file."),
                ],
                &["path", "content"],
            ),
        ),
        declaration(
            "delete_file",
            "Deletes a file.",
            string_schema(&[("path", "Path of the file to delete.")], &["path"]),
        ),
        declaration(
            "list_files",
            "Lists the files and directories in a directory. Use '.' for the project directory.",
            string_schema(&[("path", "Directory to list.")], &["path"]),
        ),
        declaration(
            "analyze_project",
            "Detects the project's language, framework, package manager, dependencies and relevant files.",
            string_schema(
                &[("path", "Root of the project to analyze. Use '.' for the project directory.")],
                &["path"],
            ),
        ),
        declaration(
            "generate_code",
            "Generates a function, class, test or config file (dockerfile, gitignore, makefile) that fits the project's language.",
            string_schema(
                &[
                    ("type", "What to generate: 'function', 'class', 'test' or 'config'."),
                    ("name", "Name of the item, or the config file kind for 'config'."),
                    ("description", "What the code should do."),
                    (
                        "spec",
                        "Optional JSON: {\"params\": [], \"returns\": []} for functions, {\"fields\": [{\"name\", \"type\", \"description\"}]} for classes, an options object for config files.",
                    ),
                ],
                &["type", "name", "description"],
            ),
        ),
        declaration(
            "install_dependencies",
            "Installs dependencies with the project's package manager.",
            string_schema(
                &[("packages", "Space-separated packages to add (optional).")],
                &[],
            ),
        ),
        declaration(
            "run_tests",
            "Runs the project's tests with its test framework.",
            string_schema(
                &[("pattern", "Test name, pattern or file to run (optional).")],
                &[],
            ),
        ),
        declaration(
            "build_project",
            "Builds the project with its build tool.",
            string_schema(&[("target", "Build target or binary name (optional).")], &[]),
        ),
        declaration(
            "generate_web_file",
            "Writes a starter HTML, CSS or JavaScript file. Prefer this over create_file for new web files.",
            string_schema(
                &[
                    ("file_type", "One of 'html', 'css' or 'js'."),
                    ("filename", "File to create, e.g. 'index.html'."),
                    (
                        "options",
                        "Optional JSON object, e.g. {\"appName\": \"Todo\", \"uniqueId\": \"todo\"}.",
                    ),
                ],
                &["file_type", "filename"],
            ),
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandArgs {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateCodeArgs {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub spec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstallArgs {
    #[serde(default)]
    pub packages: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestArgs {
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildArgs {
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebFileArgs {
    pub file_type: String,
    pub filename: String,
    #[serde(default)]
    pub options: Option<String>,
}

/// A validated tool call with typed arguments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "snake_case")]
pub enum ToolCall {
    ExecuteShellCommand(CommandArgs),
    CreateFile(WriteArgs),
    ReadFile(PathArgs),
    UpdateFile(WriteArgs),
    DeleteFile(PathArgs),
    ListFiles(PathArgs),
    AnalyzeProject(PathArgs),
    GenerateCode(GenerateCodeArgs),
    InstallDependencies(InstallArgs),
    RunTests(TestArgs),
    BuildProject(BuildArgs),
    GenerateWebFile(WebFileArgs),
}

impl ToolCall {
    /// Decode the arguments of tool `name`
    pub fn parse(name: &str, args: Value) -> Result<Self, ToolError> {
        serde_json::from_value(json!({ "name": name, "args": args }))
            .map_err(|e| ToolError::invalid(name, e.to_string()))
    }
}

/// Blank optional arguments count as absent
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Tool registry bound to one working directory
pub struct Dispatcher {
    root: PathBuf,
    allowed_commands: Vec<String>,
    declarations: Vec<FunctionDeclaration>,
    validator: ArgumentValidator,
    project: Mutex<Option<ProjectInfo>>,
}

impl Dispatcher {
    /// `project` seeds the project cache, e.g. from a restored session
    pub fn new(
        root: impl Into<PathBuf>,
        allowed_commands: Vec<String>,
        project: Option<ProjectInfo>,
    ) -> Self {
        let declarations = declarations();
        let validator = ArgumentValidator::new(&declarations);
        Self {
            root: root.into(),
            allowed_commands,
            declarations,
            validator,
            project: Mutex::new(project),
        }
    }

    /// Resolve a tool path against the working directory
    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path.trim());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Cached project info, analyzing the working directory on first use
    pub async fn project_info(&self) -> Result<ProjectInfo, ToolError> {
        if let Some(info) = self.cached_project() {
            return Ok(info);
        }
        let info = project::analyze(self.root.clone()).await?;
        *self.project.lock() = Some(info.clone());
        Ok(info)
    }

    /// Latest analysis, if any, without triggering one
    pub fn cached_project(&self) -> Option<ProjectInfo> {
        self.project.lock().clone()
    }

    async fn run_command(&self, command: &str) -> Result<String, ToolError> {
        info!(%command, "running command");
        crate::commander::run_command(command, &self.allowed_commands, &self.root)
            .await
            .map_err(|e| ToolError::execution(e.to_string()))
    }

    async fn run(&self, call: ToolCall) -> Result<String, ToolError> {
        match call {
            ToolCall::ExecuteShellCommand(args) => self.run_command(&args.command).await,
            ToolCall::CreateFile(args) => {
                files::create(&self.resolve(&args.path), &args.content).await?;
                Ok(format!("File '{}' was created successfully.", args.path))
            }
            ToolCall::ReadFile(args) => files::read(&self.resolve(&args.path)).await,
            ToolCall::UpdateFile(args) => {
                files::update(&self.resolve(&args.path), &args.content).await?;
                Ok(format!("File '{}' was updated successfully.", args.path))
            }
            ToolCall::DeleteFile(args) => {
                files::delete(&self.resolve(&args.path)).await?;
                Ok("File deleted successfully.".to_string())
            }
            ToolCall::ListFiles(args) => files::list(&self.resolve(&args.path)).await,
            ToolCall::AnalyzeProject(args) => {
                let info = project::analyze(self.resolve(&args.path)).await?;
                *self.project.lock() = Some(info.clone());
                project::format_analysis(&info)
            }
            ToolCall::GenerateCode(args) => {
                let info = self.project_info().await?;
                generate::code(&info, &args)
            }
            ToolCall::InstallDependencies(args) => {
                let info = self.project_info().await?;
                let command = project::install_command(&info, non_empty(&args.packages))?;
                self.run_command(&command).await
            }
            ToolCall::RunTests(args) => {
                let info = self.project_info().await?;
                let command = project::test_command(&info, non_empty(&args.pattern))?;
                self.run_command(&command).await
            }
            ToolCall::BuildProject(args) => {
                let info = self.project_info().await?;
                let command = project::build_command(&info, non_empty(&args.target))?;
                self.run_command(&command).await
            }
            ToolCall::GenerateWebFile(args) => {
                let info = self.project_info().await?;
                generate::web_file(&info, &self.resolve(&args.filename), &args).await
            }
        }
    }
}

#[async_trait]
impl ToolDispatcher for Dispatcher {
    fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.declarations.clone()
    }

    async fn execute(&self, name: &str, args: Value) -> Result<String, ToolError> {
        if !self.declarations.iter().any(|d| d.name == name) {
            return Err(ToolError::UnknownTool {
                name: name.to_string(),
            });
        }

        let args = if args.is_null() { json!({}) } else { args };
        self.validator.validate(name, &args)?;
        let call = ToolCall::parse(name, args)?;

        debug!(tool = name, ?call, "dispatching tool call");
        self.run(call).await
    }
}
