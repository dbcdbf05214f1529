use crate::domain::catalog::ToolSignature;

/// A builder for rendering prompts with context.
pub struct PromptRenderer<'a> {
    template: &'a str,
    replacements: Vec<(&'a str, String)>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            replacements: Vec::new(),
        }
    }

    pub fn set(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.replacements.push((key, value.into()));
        self
    }

    pub fn render(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.replacements {
            result = result.replace(key, &value);
        }

        if let Some(start) = result.find("{{")
            && let Some(end) = result[start..].find("}}")
        {
            tracing::error!(
                "[PROMPT RENDER ERROR] Unreplaced placeholder found in output: {}",
                &result[start..start + end + 2]
            );
        }

        result
    }
}

pub const SYSTEM_TEMPLATE: &str = "\
You are a helpful AI coding agent.

When a user asks a question or makes a request, make a function call plan. \
You can perform the following operations:

{{TOOLS}}

All paths you provide should be relative to the working directory. \
You do not need to specify the working directory in your function calls \
as it is automatically injected for security reasons.

When you have gathered enough information, answer the user directly \
without calling any more functions.";

/// Built-in system prompt listing the available operations.
pub fn system_prompt(tools: &[ToolSignature]) -> String {
    let listing = tools
        .iter()
        .map(|tool| format!("- {}: {}", tool.name, tool.description))
        .collect::<Vec<_>>()
        .join("\n");

    PromptRenderer::new(SYSTEM_TEMPLATE)
        .set("{{TOOLS}}", listing)
        .render()
}
