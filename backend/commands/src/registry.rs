/// Slash command registry.
use crate::types::{ArgType, CommandArg, CommandCategory, CommandDef};

fn days_arg(description: &str) -> CommandArg {
    CommandArg {
        name: "days".to_string(),
        description: description.to_string(),
        arg_type: ArgType::Number,
        required: true,
    }
}

fn command(
    key: &str,
    description: &str,
    category: CommandCategory,
    aliases: &[&str],
    args: Vec<CommandArg>,
    admin_only: bool,
) -> CommandDef {
    CommandDef {
        key: key.into(),
        native_name: Some(key.into()),
        description: description.into(),
        category,
        text_aliases: aliases.iter().map(|a| a.to_string()).collect(),
        args,
        admin_only,
    }
}

/// Build the built-in command registry.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        command(
            "help",
            "Show available commands.",
            CommandCategory::Status,
            &["/help", "/start"],
            vec![],
            false,
        ),
        command(
            "inactive",
            "List members past the inactivity threshold.",
            CommandCategory::Report,
            &["/inactive", "/inactivos"],
            vec![],
            true,
        ),
        command(
            "setinactivity",
            "Set the inactivity threshold for this group.",
            CommandCategory::Configuration,
            &["/setinactivity"],
            vec![days_arg("Days of silence before a warning")],
            true,
        ),
        command(
            "setgrace",
            "Set the grace period for new members.",
            CommandCategory::Configuration,
            &["/setgrace"],
            vec![days_arg("Days after joining with no warnings")],
            true,
        ),
        command(
            "inactivityconfig",
            "Show the thresholds in force and the last scan.",
            CommandCategory::Status,
            &["/inactivityconfig"],
            vec![],
            false,
        ),
        command(
            "scannow",
            "Run an inactivity scan for this group now.",
            CommandCategory::Report,
            &["/scannow"],
            vec![],
            true,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: builtin_commands(),
        }
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Find a command by slash-text alias (e.g. "/inactive").
    pub fn find_by_alias(&self, alias: &str) -> Option<&CommandDef> {
        let lower = alias.to_lowercase();
        self.commands
            .iter()
            .find(|c| c.text_aliases.iter().any(|a| a.to_lowercase() == lower))
    }

    /// Find a command by its key.
    pub fn find_by_key(&self, key: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|c| c.key == key)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_are_unique_and_slashed() {
        let registry = CommandRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for def in registry.all() {
            for alias in &def.text_aliases {
                assert!(alias.starts_with('/'), "{alias}");
                assert!(seen.insert(alias.to_lowercase()), "duplicate {alias}");
            }
        }
    }

    #[test]
    fn test_find_by_alias_is_case_insensitive() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.find_by_alias("/INACTIVOS").unwrap().key, "inactive");
        assert!(registry.find_by_alias("/nope").is_none());
        assert_eq!(registry.find_by_key("setgrace").unwrap().usage(), "/setgrace <days>");
    }
}
