//! Text commands read from the spot channel: `!help`, `!sked` and `!!deleteall`.

use rbnbot_relay::Sked;

pub const HELP_USAGE: &str = "Command: *!sked*, followed by **freq** **call** **wpm**";
pub const HELP_EXAMPLE: &str = "example: *!sked* 28050.0 IV3ZZZ 15";
pub const REPLY_OK: &str = "OK!";
pub const REPLY_ERROR: &str = "Error!";

/// Upper bound on messages removed by one `!!deleteall`.
pub const PURGE_LIMIT: u8 = 100;

/// Notice posted while a purge runs; deleted once it is done.
pub fn purge_notice(count: usize) -> String {
    format!("MAINTENANCE: deleting {count} old messages...")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Sked(Sked),
    /// `!sked` with missing or malformed arguments.
    InvalidSked,
    /// `!!deleteall`: clear the channel history.
    Purge,
}

/// Parse a chat message. Anything that is not a known command yields `None`.
pub fn parse_command(content: &str) -> Option<ChatCommand> {
    let content = content.trim();
    if content.starts_with("!!deleteall") {
        return Some(ChatCommand::Purge);
    }
    if content.starts_with("!help") {
        return Some(ChatCommand::Help);
    }
    if !content.starts_with("!sked") {
        return None;
    }

    let tokens: Vec<&str> = content.split_whitespace().collect();
    let [cmd, freq, call, wpm] = tokens.as_slice() else {
        return Some(ChatCommand::InvalidSked);
    };
    if *cmd != "!sked" {
        return Some(ChatCommand::InvalidSked);
    }

    let call = call.to_uppercase();
    let valid = is_number(freq)
        && is_number(wpm)
        && !call.is_empty()
        && call.chars().all(char::is_alphanumeric);
    if !valid {
        return Some(ChatCommand::InvalidSked);
    }

    Some(ChatCommand::Sked(Sked {
        frequency_khz: (*freq).to_string(),
        call,
        wpm: (*wpm).to_string(),
    }))
}

fn is_number(s: &str) -> bool {
    s.parse::<f64>().is_ok_and(f64::is_finite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_help() {
        assert_eq!(parse_command("!help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("  !help me"), Some(ChatCommand::Help));
    }

    #[test]
    fn parses_sked_and_uppercases_call() {
        let parsed = parse_command("!sked 28050.0 iv3zzz 15");
        assert_eq!(
            parsed,
            Some(ChatCommand::Sked(Sked {
                frequency_khz: "28050.0".into(),
                call: "IV3ZZZ".into(),
                wpm: "15".into(),
            }))
        );
    }

    #[test]
    fn rejects_malformed_sked() {
        for bad in [
            "!sked",
            "!sked 28050.0 IV3ZZZ",
            "!sked 28050.0 IV3ZZZ 15 extra",
            "!sked abc IV3ZZZ 15",
            "!sked 28050.0 IV3/ZZZ 15",
            "!sked 28050.0 IV3ZZZ fast",
            "!skedx 28050.0 IV3ZZZ 15",
        ] {
            assert_eq!(parse_command(bad), Some(ChatCommand::InvalidSked), "{bad}");
        }
    }

    #[test]
    fn parses_purge() {
        assert_eq!(parse_command("!!deleteall"), Some(ChatCommand::Purge));
        assert_eq!(parse_command("!deleteall"), None);
        assert_eq!(purge_notice(12), "MAINTENANCE: deleting 12 old messages...");
    }

    #[test]
    fn ignores_ordinary_chat() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("sked 7010 A1AA 12"), None);
    }
}
