//! Interactive prompt seam.
//!
//! Everything that asks the operator a question goes through [`Prompter`],
//! so the install flow can be driven by a script in tests and by `inquire`
//! on a real terminal.

use inquire::{Confirm, InquireError, Select, Text};
use thiserror::Error;
use tracing::debug;

use crate::validate::ValidationError;

#[derive(Error, Debug)]
pub enum PromptError {
    /// Escape or Ctrl-C at a prompt
    #[error("cancelled by user")]
    Cancelled,

    #[error("prompt failed: {0}")]
    Failed(String),
}

impl From<InquireError> for PromptError {
    fn from(err: InquireError) -> Self {
        match err {
            InquireError::OperationCanceled | InquireError::OperationInterrupted => {
                Self::Cancelled
            }
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Questions the install flow and the extras menu ask.
pub trait Prompter {
    /// Free-form text, pre-filled with `default`.
    fn text(&mut self, message: &str, default: &str) -> Result<String, PromptError>;

    /// Pick one of `options`; returns its index.
    fn select(&mut self, message: &str, options: &[String], default: usize)
        -> Result<usize, PromptError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Show a message that needs no answer (rejected input, results).
    fn notify(&mut self, message: &str);
}

/// Ask until `parse` accepts the answer. Rejections are shown and asked again.
pub fn ask_valid<T>(
    prompter: &mut dyn Prompter,
    message: &str,
    default: &str,
    parse: impl Fn(&str) -> Result<T, ValidationError>,
) -> Result<T, PromptError> {
    loop {
        let raw = prompter.text(message, default)?;
        match parse(&raw) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!("Rejected input for {:?}: {}", message, e);
                prompter.notify(&e.to_string());
            }
        }
    }
}

/// Pick from a list of displayable values; returns the chosen value.
pub fn select_value<T: Clone + ToString + PartialEq>(
    prompter: &mut dyn Prompter,
    message: &str,
    values: &[T],
    current: &T,
) -> Result<T, PromptError> {
    let labels: Vec<String> = values.iter().map(ToString::to_string).collect();
    let default = values.iter().position(|v| v == current).unwrap_or(0);
    let index = prompter.select(message, &labels, default)?;
    values
        .get(index)
        .cloned()
        .ok_or_else(|| PromptError::Failed(format!("selection {} out of range", index)))
}

/// Terminal prompts backed by `inquire`.
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn text(&mut self, message: &str, default: &str) -> Result<String, PromptError> {
        let mut prompt = Text::new(message);
        if !default.is_empty() {
            prompt = prompt.with_default(default);
        }
        Ok(prompt.prompt()?)
    }

    fn select(
        &mut self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> Result<usize, PromptError> {
        let choice = Select::new(message, options.to_vec())
            .with_starting_cursor(default.min(options.len().saturating_sub(1)))
            .raw_prompt()?;
        Ok(choice.index)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }

    fn notify(&mut self, message: &str) {
        println!("  {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_time;
    use std::collections::VecDeque;

    struct Answers {
        texts: VecDeque<&'static str>,
        notes: Vec<String>,
    }

    impl Prompter for Answers {
        fn text(&mut self, _message: &str, _default: &str) -> Result<String, PromptError> {
            self.texts
                .pop_front()
                .map(str::to_string)
                .ok_or(PromptError::Cancelled)
        }
        fn select(&mut self, _: &str, _: &[String], default: usize) -> Result<usize, PromptError> {
            Ok(default)
        }
        fn confirm(&mut self, _: &str, default: bool) -> Result<bool, PromptError> {
            Ok(default)
        }
        fn notify(&mut self, message: &str) {
            self.notes.push(message.to_string());
        }
    }

    #[test]
    fn test_ask_valid_reprompts_until_accepted() {
        let mut answers = Answers {
            texts: VecDeque::from(["25:00", "7:3", "07:30"]),
            notes: Vec::new(),
        };
        let time = ask_valid(&mut answers, "Reboot time", "03:00", validate_time).unwrap();
        assert_eq!(time.to_string(), "07:30");
        assert_eq!(answers.notes.len(), 2);
    }

    #[test]
    fn test_ask_valid_propagates_cancel() {
        let mut answers = Answers {
            texts: VecDeque::from(["bad"]),
            notes: Vec::new(),
        };
        assert!(matches!(
            ask_valid(&mut answers, "Reboot time", "03:00", validate_time),
            Err(PromptError::Cancelled)
        ));
    }

    #[test]
    fn test_select_value_defaults_to_current() {
        let mut answers = Answers {
            texts: VecDeque::new(),
            notes: Vec::new(),
        };
        let picked = select_value(&mut answers, "Pick", &["a", "b", "c"], &"b").unwrap();
        assert_eq!(picked, "b");
    }
}
