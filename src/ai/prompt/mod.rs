//! Prompts for the AI collaborator.
//!
//! Every item kind uses the same layout: role, numbered objectives,
//! caller context, then the payload as a JSON code block. The output
//! schema travels separately as the provider's structured-output schema.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::{Value, json};

use super::{AiRequest, ItemKind};
use crate::constants::ai as ai_constants;
use crate::types::truncate_chars;

#[derive(Debug, Clone, PartialEq)]
pub enum PromptSection {
    Role { expertise: String, task: String },
    Objectives(Vec<String>),
    /// Rendered in key order
    Context(BTreeMap<String, String>),
    Titled { title: String, body: String },
    Code { language: String, body: String },
}

impl PromptSection {
    fn render(&self, out: &mut String) {
        let _ = match self {
            Self::Role { expertise, task } => writeln!(
                out,
                "<ROLE>\nYou are an expert {} specializing in {}.\n</ROLE>",
                expertise, task
            ),
            Self::Objectives(goals) => {
                out.push_str("<OBJECTIVES>\n");
                for (n, goal) in goals.iter().enumerate() {
                    let _ = writeln!(out, "{}. {}", n + 1, goal);
                }
                writeln!(out, "</OBJECTIVES>")
            }
            Self::Context(entries) => {
                out.push_str("# Context\n\n");
                for (key, value) in entries {
                    let _ = writeln!(out, "**{}**: {}", key, value);
                }
                Ok(())
            }
            Self::Titled { title, body } => writeln!(out, "# {}\n\n{}", title, body),
            Self::Code { language, body } => writeln!(out, "```{}\n{}\n```", language, body),
        };
    }
}

/// Assembles a prompt from ordered sections
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(self, expertise: &str, task: &str) -> Self {
        self.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        })
    }

    pub fn objectives(self, goals: &[&str]) -> Self {
        self.push(PromptSection::Objectives(
            goals.iter().map(|g| g.to_string()).collect(),
        ))
    }

    /// Context entries share one section, wherever the first was added
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let existing = self.sections.iter_mut().find_map(|s| match s {
            PromptSection::Context(entries) => Some(entries),
            _ => None,
        });
        match existing {
            Some(entries) => {
                entries.insert(key.to_string(), value.to_string());
                self
            }
            None => self.push(PromptSection::Context(BTreeMap::from([(
                key.to_string(),
                value.to_string(),
            )]))),
        }
    }

    pub fn section(self, title: &str, body: &str) -> Self {
        self.push(PromptSection::Titled {
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    pub fn code(self, language: &str, body: &str) -> Self {
        self.push(PromptSection::Code {
            language: language.to_string(),
            body: body.to_string(),
        })
    }

    pub fn build(self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            section.render(&mut out);
            out.push('\n');
        }
        out.truncate(out.trim_end().len());
        out
    }

    fn push(mut self, section: PromptSection) -> Self {
        self.sections.push(section);
        self
    }
}

// =============================================================================
// Per-kind Templates
// =============================================================================

/// Prompt and output schema for each item kind
pub struct PromptTemplates;

impl PromptTemplates {
    /// Build the prompt and the JSON schema the provider must satisfy
    pub fn for_request(request: &AiRequest) -> (String, Value) {
        let builder = match request.kind {
            ItemKind::Summarize => PromptBuilder::new()
                .role("API technical writer", "concise endpoint summaries")
                .objectives(&[
                    "Summarize what the endpoint does in one sentence",
                    "Use the imperative mood, no trailing period",
                    "Stay under 80 characters",
                ]),
            ItemKind::Enhance => PromptBuilder::new()
                .role("API technical writer", "reference documentation")
                .objectives(&[
                    "Write a clear description of the endpoint for API consumers",
                    "Explain required parameters and the request body",
                    "Describe the success response and notable error responses",
                    "Only state facts present in the payload",
                ]),
            ItemKind::Validate => PromptBuilder::new()
                .role("API reviewer", "documentation quality review")
                .objectives(&[
                    "Check the endpoint documentation for missing or contradictory information",
                    "Report each problem as one short issue",
                    "Mark the documentation valid when no issue is found",
                ]),
        };

        let builder = match &request.context {
            Some(Value::Object(map)) => map.iter().fold(builder, |b, (key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                b.context_item(key, &rendered)
            }),
            Some(Value::Null) | None => builder,
            Some(other) => builder.section("Context", &other.to_string()),
        };

        let payload = serde_json::to_string_pretty(&request.payload)
            .unwrap_or_else(|_| request.payload.to_string());
        let payload = truncate_chars(&payload, ai_constants::MAX_PAYLOAD_CHARS);

        let prompt = builder.code("json", payload).build();
        (prompt, Self::schema(request.kind))
    }

    /// JSON schema of the structured output for `kind`
    pub fn schema(kind: ItemKind) -> Value {
        match kind {
            ItemKind::Summarize => json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string"},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1}
                },
                "required": ["summary"]
            }),
            ItemKind::Enhance => json!({
                "type": "object",
                "properties": {
                    "description": {"type": "string"},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1}
                },
                "required": ["description"]
            }),
            ItemKind::Validate => json!({
                "type": "object",
                "properties": {
                    "valid": {"type": "boolean"},
                    "issues": {"type": "array", "items": {"type": "string"}},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1}
                },
                "required": ["valid", "issues"]
            }),
        }
    }

    /// Name of the field that must be present in a usable response
    pub fn required_field(kind: ItemKind) -> &'static str {
        match kind {
            ItemKind::Summarize => "summary",
            ItemKind::Enhance => "description",
            ItemKind::Validate => "valid",
        }
    }
}
