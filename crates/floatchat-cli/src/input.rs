// ABOUTME: Parses lines typed at the chat prompt into widget actions.
// ABOUTME: Slash commands control the widget; anything else is message text.

use floatchat_core::DefaultOption;
use std::path::PathBuf;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Free text to send
    Text(String),
    /// Send whatever is staged with no text: /send
    SendStaged,
    /// Start a quick-start branch: /policy, /claim, /submit-claim, /products
    Option(DefaultOption),
    /// Choose a pending segment or product by label, code, or 1-based number
    Pick(String),
    /// Stage a file: /attach <path>
    Attach(PathBuf),
    /// Unstage by 1-based number: /remove <n>
    Remove(usize),
    /// List staged files: /staged
    Staged,
    Open,
    Close,
    Clear,
    Help,
    Quit,
    /// Blank line
    Nothing,
    /// Unrecognised or malformed command
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Input {
        let line = line.trim();
        if line.is_empty() {
            return Input::Nothing;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Input::Text(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "send" => Input::SendStaged,
            "policy" => Input::Option(DefaultOption::PolicyInfo),
            "claim" => Input::Option(DefaultOption::ClaimInfo),
            "submit-claim" => Input::Option(DefaultOption::SubmitClaim),
            "products" => Input::Option(DefaultOption::ProductInfo),
            "pick" if !arg.is_empty() => Input::Pick(arg.to_string()),
            "pick" => Input::Unknown("pick (requires a choice, e.g. /pick 2)".to_string()),
            "attach" if !arg.is_empty() => Input::Attach(PathBuf::from(arg)),
            "attach" => Input::Unknown("attach (requires a file path)".to_string()),
            "remove" => match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Input::Remove(n),
                _ => Input::Unknown("remove (requires a staged file number)".to_string()),
            },
            "staged" => Input::Staged,
            "open" => Input::Open,
            "close" => Input::Close,
            "clear" => Input::Clear,
            "help" => Input::Help,
            "quit" | "exit" => Input::Quit,
            other => Input::Unknown(other.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /policy /claim /submit-claim /products   start a quick option
  /pick <choice>     choose a listed segment or product (label, code, or number)
  /attach <path>     stage a file (when the assistant asks for documents)
  /remove <n>        unstage file n
  /staged            list staged files
  /send              send staged files without text
  /open /close       show or hide the widget
  /clear             reset the conversation
  /quit              leave
Anything else is sent as a message.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            Input::parse("  what is covered?  "),
            Input::Text("what is covered?".to_string())
        );
        assert_eq!(Input::parse("   "), Input::Nothing);
    }

    #[test]
    fn test_options() {
        assert_eq!(
            Input::parse("/claim"),
            Input::Option(DefaultOption::ClaimInfo)
        );
        assert_eq!(
            Input::parse("/submit-claim"),
            Input::Option(DefaultOption::SubmitClaim)
        );
        assert_eq!(
            Input::parse("/products"),
            Input::Option(DefaultOption::ProductInfo)
        );
    }

    #[test]
    fn test_pick_keeps_spaces() {
        assert_eq!(
            Input::parse("/pick  Senior Care "),
            Input::Pick("Senior Care".to_string())
        );
        assert!(matches!(Input::parse("/pick"), Input::Unknown(_)));
    }

    #[test]
    fn test_attach_and_remove() {
        assert_eq!(
            Input::parse("/attach ./bills/x-ray.png"),
            Input::Attach(PathBuf::from("./bills/x-ray.png"))
        );
        assert_eq!(Input::parse("/remove 2"), Input::Remove(2));
        assert!(matches!(Input::parse("/remove 0"), Input::Unknown(_)));
        assert!(matches!(Input::parse("/remove two"), Input::Unknown(_)));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Input::parse("/weather"),
            Input::Unknown("weather".to_string())
        );
        assert_eq!(Input::parse("/exit"), Input::Quit);
    }
}
