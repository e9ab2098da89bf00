/// Slash command types.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Status,
    Report,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Number,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandArg {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    pub required: bool,
}

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

/// A slash command entry in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key (e.g. "inactive", "setgrace").
    pub key: String,
    /// Name advertised in the Telegram command menu, if any.
    pub native_name: Option<String>,
    pub description: String,
    pub category: CommandCategory,
    /// Slash aliases (must start with '/'). The first one is shown in help.
    pub text_aliases: Vec<String>,
    pub args: Vec<CommandArg>,
    /// Caller must be an administrator or the owner of the channel.
    pub admin_only: bool,
}

impl CommandDef {
    /// Primary alias (first in list), or key if none.
    pub fn primary_alias(&self) -> &str {
        self.text_aliases
            .first()
            .map(|s| s.as_str())
            .unwrap_or(&self.key)
    }

    /// Usage line such as `/setgrace <days>`.
    pub fn usage(&self) -> String {
        let mut usage = self.primary_alias().to_string();
        for arg in &self.args {
            if arg.required {
                usage.push_str(&format!(" <{}>", arg.name));
            } else {
                usage.push_str(&format!(" [{}]", arg.name));
            }
        }
        usage
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A detected and parsed slash-command invocation.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub key: String,
    pub raw_alias: String,
    /// Whitespace-separated arguments after the command name.
    pub args: Vec<String>,
    /// Full remaining text after the command name.
    pub raw_args: String,
}
