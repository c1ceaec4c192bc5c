//! Operator decisions for the ambiguity auditor.
//!
//! The auditor never reads the terminal itself. It asks an
//! [`OperatorChoices`] implementation for the next decision, which keeps the
//! reconciliation state machine testable with scripted input.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::identity::audit::CandidateGroup;

/// What the operator wants done with the group currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorChoice {
    /// Map every other identity onto the first one
    Accept,
    /// Move the first candidate to the back and ask again
    Rotate,
    /// Drop name variants of an email already in the group and ask again
    Strip,
    /// Leave the group alone
    Ignore,
}

impl OperatorChoice {
    /// Parse one line of operator input.
    pub fn from_key(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "a" | "y" | "accept" => Some(OperatorChoice::Accept),
            "r" | "rotate" => Some(OperatorChoice::Rotate),
            "s" | "strip" => Some(OperatorChoice::Strip),
            "i" | "n" | "ignore" => Some(OperatorChoice::Ignore),
            _ => None,
        }
    }
}

/// Source of operator decisions.
pub trait OperatorChoices {
    fn next_operator_choice(&mut self, group: &CandidateGroup) -> io::Result<OperatorChoice>;
}

/// Line-buffered prompt on an input/output pair (normally stdin/stderr).
///
/// End of input is treated as "ignore" for the current and every later group.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompt { input, output }
    }
}

impl<R: BufRead, W: Write> OperatorChoices for TerminalPrompt<R, W> {
    fn next_operator_choice(&mut self, group: &CandidateGroup) -> io::Result<OperatorChoice> {
        writeln!(self.output, "Possible duplicates ({}: {}):", group.kind, group.key)?;
        for (i, identity) in group.identities.iter().enumerate() {
            let marker = if i == 0 { "=>" } else { "  " };
            writeln!(self.output, " {} {:2}. {}", marker, i + 1, identity)?;
        }

        loop {
            write!(self.output, "[a]ccept, [r]otate, [s]trip, [i]gnore? ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(OperatorChoice::Ignore);
            }

            match OperatorChoice::from_key(&line) {
                Some(choice) => return Ok(choice),
                None => writeln!(self.output, "unrecognized choice `{}`", line.trim())?,
            }
        }
    }
}

/// Pre-recorded decisions, consumed in order.
#[derive(Debug, Clone)]
pub struct ScriptedChoices {
    queue: VecDeque<OperatorChoice>,
    fallback: OperatorChoice,
}

impl ScriptedChoices {
    pub fn new(choices: impl IntoIterator<Item = OperatorChoice>) -> Self {
        ScriptedChoices {
            queue: choices.into_iter().collect(),
            fallback: OperatorChoice::Ignore,
        }
    }

    /// Decision returned once the script runs out.
    pub fn with_fallback(mut self, fallback: OperatorChoice) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl OperatorChoices for ScriptedChoices {
    fn next_operator_choice(&mut self, _group: &CandidateGroup) -> io::Result<OperatorChoice> {
        Ok(self.queue.pop_front().unwrap_or(self.fallback))
    }
}

/// Decisions computed by a policy function.
pub struct PolicyChoices<F>(pub F);

impl<F> OperatorChoices for PolicyChoices<F>
where
    F: FnMut(&CandidateGroup) -> OperatorChoice,
{
    fn next_operator_choice(&mut self, group: &CandidateGroup) -> io::Result<OperatorChoice> {
        Ok((self.0)(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::audit::GroupingKind;

    fn group() -> CandidateGroup {
        CandidateGroup {
            kind: GroupingKind::Email,
            key: "jd@x.com".to_string(),
            identities: vec!["John Doe <jd@x.com>".to_string(), "<jd@x.com>".to_string()],
        }
    }

    #[test]
    fn test_from_key() {
        assert_eq!(OperatorChoice::from_key("a\n"), Some(OperatorChoice::Accept));
        assert_eq!(OperatorChoice::from_key(" R "), Some(OperatorChoice::Rotate));
        assert_eq!(OperatorChoice::from_key("strip"), Some(OperatorChoice::Strip));
        assert_eq!(OperatorChoice::from_key("i"), Some(OperatorChoice::Ignore));
        assert_eq!(OperatorChoice::from_key("x"), None);
    }

    #[test]
    fn test_terminal_prompt_retries_on_garbage() {
        let input = io::Cursor::new("what\nr\n");
        let mut output = Vec::new();
        let mut prompt = TerminalPrompt::new(input, &mut output);

        let choice = prompt.next_operator_choice(&group()).unwrap();
        assert_eq!(choice, OperatorChoice::Rotate);

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("John Doe <jd@x.com>"));
        assert!(shown.contains("unrecognized choice `what`"));
    }

    #[test]
    fn test_terminal_prompt_eof_ignores() {
        let mut prompt = TerminalPrompt::new(io::Cursor::new(""), io::sink());
        assert_eq!(
            prompt.next_operator_choice(&group()).unwrap(),
            OperatorChoice::Ignore
        );
    }

    #[test]
    fn test_scripted_choices_fall_back() {
        let mut script =
            ScriptedChoices::new([OperatorChoice::Accept]).with_fallback(OperatorChoice::Rotate);
        assert_eq!(script.next_operator_choice(&group()).unwrap(), OperatorChoice::Accept);
        assert_eq!(script.next_operator_choice(&group()).unwrap(), OperatorChoice::Rotate);
        assert_eq!(script.remaining(), 0);
    }
}
