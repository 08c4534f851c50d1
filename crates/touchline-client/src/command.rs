//! Line commands of the watcher.
//!
//! Lines starting with `/` are commands; anything else is chat text for the
//! focused chat view, sent verbatim.

use std::str::FromStr;

use thiserror::Error;
use touchline_core::{BoardFilter, FilterParseError};

/// Help text listing every command.
pub const HELP: &str = "\
/board                  open the match board
/match <id>             open a match
/chat <room>            open a chat room and focus it
/focus <view>           focus a chat view
/filter <view> <name>   filter a board (all, live, upcoming, finished)
/close <view>           close a view
/name <username>        change your display name
/views                  redraw every view
/connect                reconnect after giving up
/disconnect             drop the connection
/quit                   leave
<text>                  say something in the focused chat";

/// Parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Open the match board
    Board,
    /// Open a match detail view
    Match(String),
    /// Open a chat view
    Chat(String),
    /// Focus a chat view
    Focus(u64),
    /// Change a board's filter
    Filter {
        /// Board view number
        view: u64,
        /// New filter
        filter: BoardFilter,
    },
    /// Close a view
    Close(u64),
    /// Change the display name
    Name(String),
    /// Redraw
    Views,
    /// Connect explicitly
    Connect,
    /// Disconnect explicitly
    Disconnect,
    /// Show help
    Help,
    /// Quit
    Quit,
    /// Chat text for the focused view
    Say(String),
}

/// Input line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unknown `/command`
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    /// Required argument missing
    #[error("/{command} needs a {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Missing argument
        argument: &'static str,
    },

    /// View number is not a number
    #[error("invalid view number {0:?}")]
    InvalidView(String),

    /// Board filter not recognized
    #[error(transparent)]
    Filter(#[from] FilterParseError),
}

impl FromStr for UserCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some(command) = line.trim_start().strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let mut arg = |command: &'static str, argument: &'static str| {
            words.next().map(str::to_string).ok_or(CommandError::MissingArgument { command, argument })
        };

        match name {
            "board" => Ok(Self::Board),
            "match" => Ok(Self::Match(arg("match", "match id")?)),
            "chat" => Ok(Self::Chat(arg("chat", "room id")?)),
            "focus" => Ok(Self::Focus(view_number(&arg("focus", "view number")?)?)),
            "close" => Ok(Self::Close(view_number(&arg("close", "view number")?)?)),
            "filter" => {
                let view = view_number(&arg("filter", "view number")?)?;
                let filter = arg("filter", "filter name")?.parse()?;
                Ok(Self::Filter { view, filter })
            },
            "name" => {
                let rest = command.trim_start().strip_prefix("name").unwrap_or_default().trim();
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument { command: "name", argument: "username" });
                }
                Ok(Self::Name(rest.to_string()))
            },
            "views" => Ok(Self::Views),
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Accepts `3` or `#3`.
fn view_number(word: &str) -> Result<u64, CommandError> {
    word.trim_start_matches('#').parse().map_err(|_| CommandError::InvalidView(word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said_verbatim() {
        assert_eq!("  what a goal ".parse(), Ok(UserCommand::Say("  what a goal ".into())));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!("/match match_001".parse(), Ok(UserCommand::Match("match_001".into())));
        assert_eq!("/chat lobby".parse(), Ok(UserCommand::Chat("lobby".into())));
        assert_eq!("/close #2".parse(), Ok(UserCommand::Close(2)));
        assert_eq!(
            "/filter 0 Live".parse(),
            Ok(UserCommand::Filter { view: 0, filter: BoardFilter::Live })
        );
    }

    #[test]
    fn name_keeps_spaces() {
        assert_eq!("/name  Big Sam ".parse(), Ok(UserCommand::Name("Big Sam".into())));
    }

    #[test]
    fn missing_and_bad_arguments() {
        assert!(matches!(
            "/match".parse::<UserCommand>(),
            Err(CommandError::MissingArgument { command: "match", .. })
        ));
        assert!(matches!("/close x".parse::<UserCommand>(), Err(CommandError::InvalidView(_))));
        assert!(matches!("/filter 1 today".parse::<UserCommand>(), Err(CommandError::Filter(_))));
        assert!(matches!("/dance".parse::<UserCommand>(), Err(CommandError::Unknown(_))));
    }
}
