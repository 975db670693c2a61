use crate::notify::format::escape_html;

pub const HELP_TEXT: &str = "Available commands:\n/start - Start the bot\n/help - Show this help message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

/// Recognise `/start` and `/help`, with or without a `@botname` suffix and
/// trailing arguments. Anything else is not a command for us.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        _ => None,
    }
}

pub fn greeting(full_name: &str) -> String {
    format!(
        "Hello, <b>{}</b>!\n\nI am Opinio - your analytical companion for Opinion.trade.\nYou've been subscribed to new market notifications!",
        escape_html(full_name)
    )
}
