/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text or `:go TOPIC`: open the article for this topic.
    Search(String),
    /// A bare number: activate link `n` (1-based) of the current article.
    Follow(usize),
    Random,
    Home,
    History,
    /// `:h N`: open entry `n` (1-based) of the recent-history list.
    OpenHistory(usize),
    Retry,
    Resume,
    Sources,
    Help,
    Quit,
    /// Empty line: close any panel and redraw.
    Refresh,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Refresh;
    }
    if let Ok(index) = line.parse::<usize>() {
        return Command::Follow(index);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Search(line.to_string());
    };

    let (name, argument) = match rest.trim_start().split_once(char::is_whitespace) {
        Some((name, argument)) => (name, Some(argument.trim())),
        None => (rest.trim_start(), None),
    };
    match (name.to_ascii_lowercase().as_str(), argument) {
        ("go", Some(topic)) => Command::Search(topic.to_string()),
        ("random" | "r", None) => Command::Random,
        ("home", None) => Command::Home,
        ("history", None) => Command::History,
        ("h" | "history", Some(n)) => match n.parse() {
            Ok(index) => Command::OpenHistory(index),
            Err(_) => Command::Unknown(line.to_string()),
        },
        ("h", None) => Command::History,
        ("retry", None) => Command::Retry,
        ("resume", None) => Command::Resume,
        ("sources" | "s", None) => Command::Sources,
        ("help" | "?", None) => Command::Help,
        ("quit" | "q" | "exit", None) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}
