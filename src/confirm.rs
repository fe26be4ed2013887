//! Deny-by-default yes/no gate for destructive operations.

use crate::console::read_bounded_line;
use std::io::{BufRead, Write};

/// Longest answer read from the user.
pub const MAX_ANSWER_SIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    prompt: String,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self {
            prompt: " [y/N]: ".to_string(),
        }
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `message` on `out` and read the answer from `input`.
    ///
    /// Only an answer starting with `y` or `Y` consents. Empty input, end of
    /// input and read errors all decline.
    pub fn confirm<R, W>(&self, input: &mut R, out: &mut W, message: &str) -> bool
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        if write!(out, "{}{}", message, self.prompt)
            .and_then(|_| out.flush())
            .is_err()
        {
            return false;
        }

        match read_bounded_line(input, MAX_ANSWER_SIZE) {
            Ok(Some(answer)) => answer.starts_with(['y', 'Y']),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answer: &str) -> (bool, String) {
        let mut input = Cursor::new(answer.to_string());
        let mut out = Vec::new();
        let ok = ConfirmationGate::new().confirm(&mut input, &mut out, "Remove 'a.txt'?");
        (ok, String::from_utf8(out).unwrap())
    }

    #[test]
    fn affirmative_answers_consent() {
        assert!(ask("y\n").0);
        assert!(ask("Y\n").0);
        assert!(ask("yes please\n").0);
    }

    #[test]
    fn everything_else_declines() {
        assert!(!ask("n\n").0);
        assert!(!ask("\n").0);
        assert!(!ask("").0);
        assert!(!ask("sure\n").0);
        assert!(!ask("no, y\n").0);
        assert!(!ask(" y\n").0);
    }

    #[test]
    fn prompt_is_written_before_reading() {
        let (_, shown) = ask("n\n");
        assert_eq!(shown, "Remove 'a.txt'? [y/N]: ");
    }

    #[test]
    fn only_one_line_is_consumed() {
        let mut input = Cursor::new("n\npwd\n".to_string());
        let mut out = Vec::new();
        assert!(!ConfirmationGate::new().confirm(&mut input, &mut out, "Overwrite?"));
        assert_eq!(read_bounded_line(&mut input, 64).unwrap().as_deref(), Some("pwd"));
    }
}
