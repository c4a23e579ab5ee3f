/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home"],
    description: "Values, statuses and messages",
  },
  Command {
    name: "selector",
    aliases: &["s", "select", "status"],
    description: "Pick a module and read its status",
  },
  Command {
    name: "modules",
    aliases: &["m", "running"],
    description: "Running modules",
  },
  Command {
    name: "panel",
    aliases: &["p", "values", "set"],
    description: "Simulated sensor values",
  },
  Command {
    name: "messages",
    aliases: &["msg", "terminal", "log"],
    description: "Message terminal",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit robodash",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input_lower).map(|rank| (cmd, rank)))
    .collect();

  // Stable, so equal ranks keep declaration order
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` means no match at all.
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("panel");
    assert_eq!(suggestions[0].name, "panel");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("m");
    assert_eq!(suggestions[0].name, "modules");
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "msg" is an alias of messages even though nothing starts with it
    let suggestions = get_suggestions("msg");
    assert_eq!(suggestions[0].name, "messages");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("sel");
    assert_eq!(suggestions[0].name, "selector");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("board");
    assert_eq!(suggestions[0].name, "dashboard");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("xyz").is_empty());
  }
}
