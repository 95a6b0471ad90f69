//! Wire format of queued commands.

use std::fmt;

pub const PAUSE: &str = "PAUSE";
pub const RESUME: &str = "RESUME";

/// A playback command decoded from a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    /// Any other body, kept verbatim for logging
    Unknown(String),
}

impl Command {
    /// Decode a message body. Matching is exact: no trimming and no case
    /// folding.
    pub fn parse(body: &str) -> Self {
        match body {
            PAUSE => Command::Pause,
            RESUME => Command::Resume,
            other => Command::Unknown(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Command::Pause => PAUSE,
            Command::Resume => RESUME,
            Command::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Unknown(raw) => write!(f, "unknown ({:?})", raw),
            known => f.write_str(known.as_wire()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("PAUSE", Command::Pause)]
    #[case("RESUME", Command::Resume)]
    #[case("STOP", Command::Unknown("STOP".to_string()))]
    #[case("pause", Command::Unknown("pause".to_string()))]
    #[case(" PAUSE", Command::Unknown(" PAUSE".to_string()))]
    #[case("RESUME\n", Command::Unknown("RESUME\n".to_string()))]
    #[case("", Command::Unknown(String::new()))]
    fn parses_exact_bodies(#[case] body: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(body), expected);
    }

    #[test]
    fn displays_wire_names() {
        assert_eq!(Command::Pause.to_string(), "PAUSE");
        assert_eq!(Command::Resume.to_string(), "RESUME");
        assert_eq!(Command::Unknown("FOO".to_string()).to_string(), "unknown (\"FOO\")");
    }

    proptest! {
        #[test]
        fn anything_but_the_two_keywords_is_unknown(body in ".*") {
            prop_assume!(body != PAUSE && body != RESUME);
            prop_assert_eq!(Command::parse(&body), Command::Unknown(body.clone()));
        }

        #[test]
        fn wire_form_is_the_body(body in "[A-Z]{0,8}") {
            let command = Command::parse(&body);
            prop_assert_eq!(command.as_wire(), body.as_str());
        }
    }
}
