//! System instruction assembly

use crate::analyzer::ProjectInfo;
use buddy_ai::FunctionDeclaration;

const BASE_PROMPT: &str = "You are Buddy, a coding assistant running in the user's terminal with direct access to their local development environment. Help the user get their task done by using the tools below carefully.

**Core Directives:**

1. **Safety First**: Before running anything that changes files or system state (for example `git`, `go` or `npm` commands), tell the user exactly what you intend to run and wait for their approval.
2. **Be Brief**: Explain clearly and get to the point. When a task is finished, summarize what you did.
3. **One Step at a Time**: Run one tool, look at the result, then decide on the next step. Do not assume outcomes.
4. **Prefer File Tools**: Use `create_file`, `read_file` and `update_file` instead of shell redirection when working with files.
5. **No Loops**: If a tool fails, do not repeat the same call. Read the error, change your approach, and ask the user for guidance if you are stuck.";

/// Build the instruction sent once at the start of a session
pub fn system_instruction(
    declarations: &[FunctionDeclaration],
    project: Option<&ProjectInfo>,
    humor_level: u8,
) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    prompt.push_str("\n\n**Available Tools:**\n\n");
    for decl in declarations {
        prompt.push_str(&format!("- **{}**: {}\n", decl.name, decl.description));
    }

    if let Some(info) = project {
        prompt.push('\n');
        prompt.push_str(&info.summary());
    }

    prompt.push_str(&format!("\n\nHumor Level: {}%", humor_level.min(100)));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Language;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[test]
    fn test_sections_in_order() {
        let decls = vec![
            FunctionDeclaration {
                name: "read_file".into(),
                description: "Read a file".into(),
                parameters: json!({"type": "object"}),
            },
            FunctionDeclaration {
                name: "list_files".into(),
                description: "List a directory".into(),
                parameters: json!({"type": "object"}),
            },
        ];
        let project = ProjectInfo {
            root_path: PathBuf::from("/work"),
            language: Language::Go,
            framework: None,
            package_manager: None,
            build_tool: None,
            test_framework: None,
            dependencies: Vec::new(),
            scripts: BTreeMap::new(),
            files: Vec::new(),
        };

        let prompt = system_instruction(&decls, Some(&project), 35);
        let tools = prompt.find("**Available Tools:**").unwrap();
        let read = prompt.find("- **read_file**: Read a file\n").unwrap();
        let list = prompt.find("- **list_files**: List a directory\n").unwrap();
        let context = prompt.find("- Language: Go").unwrap();
        assert!(tools < read && read < list && list < context);
        assert!(prompt.ends_with("\n\nHumor Level: 35%"));
    }

    #[test]
    fn test_without_project() {
        let prompt = system_instruction(&[], None, 0);
        assert!(!prompt.contains("Current Project Context"));
        assert!(prompt.ends_with("Humor Level: 0%"));
    }
}
