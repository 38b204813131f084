//! Shared machinery for the sequential Q&A workflows.
//!
//! A workflow is a chain of steps over a working state: each step either asks
//! questions through the [`Prompter`](crate::core::prompt::Prompter) or
//! mutates the state directly. Chains run strictly single-threaded with one
//! pending suspension at a time; loops are bounded iteration with an explicit
//! exit predicate, never recursion. A chain ends `Committed` (the dispatch
//! layer persists once) or `Declined` (nothing is written).

use crate::core::error::BackspecError;
use crate::core::prompt::{Prompter, Question};

/// Terminal state of one editor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Working state replaces the document feature(s); persist follows.
    Committed,
    /// Declined confirmation or empty menu; the document is left untouched.
    Declined,
}

/// Pose a single-select menu of `(key, label)` options; returns the key.
pub fn menu(
    prompter: &mut dyn Prompter,
    name: &str,
    prompt: &str,
    options: &[(&str, &str)],
) -> Result<String, BackspecError> {
    let labels: Vec<String> = options.iter().map(|(_, label)| label.to_string()).collect();
    let question = Question::select(name, prompt, labels);
    let answers = prompter.ask(std::slice::from_ref(&question))?;
    let picked = answers.text(name)?;
    let key = options
        .iter()
        .find(|(_, label)| *label == picked)
        .map(|(key, _)| key.to_string())
        .ok_or_else(|| {
            BackspecError::ValidationError(format!("menu '{}' returned unknown option", name))
        })?;
    Ok(key)
}

/// Pose one confirm question and return the decision.
pub fn confirm(
    prompter: &mut dyn Prompter,
    name: &str,
    prompt: &str,
    default: bool,
) -> Result<bool, BackspecError> {
    let question = Question::confirm(name, prompt, default);
    let answers = prompter.ask(std::slice::from_ref(&question))?;
    answers.boolean(name)
}

/// Pose one question and return its text answer.
pub fn ask_text(prompter: &mut dyn Prompter, question: Question) -> Result<String, BackspecError> {
    let name = question.name.clone();
    let answers = prompter.ask(std::slice::from_ref(&question))?;
    Ok(answers.text(&name)?.to_string())
}

/// Reusable validation predicates composed inside question validators.
pub mod check {
    /// Reject empty candidates.
    pub fn non_empty(value: &str, what: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err(format!("{} must not be empty", what));
        }
        Ok(())
    }

    /// Reject candidates with characters outside the pattern.
    pub fn charset(value: &str, pattern: &regex::Regex, what: &str) -> Result<(), String> {
        if !pattern.is_match(value) {
            return Err(format!("{} may only use {}", what, pattern.as_str()));
        }
        Ok(())
    }

    /// Reject candidates longer than `max` characters.
    pub fn max_len(value: &str, max: usize, what: &str) -> Result<(), String> {
        if value.chars().count() > max {
            return Err(format!("{} must be at most {} characters", what, max));
        }
        Ok(())
    }

    /// Reject candidates already present in `taken`.
    pub fn unique(value: &str, taken: &[String], what: &str) -> Result<(), String> {
        if taken.iter().any(|existing| existing == value) {
            return Err(format!("a {} named '{}' already exists", what, value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::{Answer, ScriptedPrompter};

    #[test]
    fn menu_maps_label_back_to_key() {
        let mut prompter = ScriptedPrompter::new([Answer::text("Create a new table")]);
        let key = menu(
            &mut prompter,
            "action",
            "What next?",
            &[
                ("create", "Create a new table"),
                ("remove", "Remove a table"),
            ],
        )
        .expect("menu");
        assert_eq!(key, "create");
    }

    #[test]
    fn confirm_returns_scripted_decision() {
        let mut prompter = ScriptedPrompter::new([Answer::Bool(true)]);
        assert!(confirm(&mut prompter, "go", "Proceed?", false).expect("confirm"));
    }

    #[test]
    fn checks_cover_the_validation_error_family() {
        let re = regex::Regex::new("^[a-z]+$").expect("static regex");
        assert!(check::non_empty("", "name").is_err());
        assert!(check::charset("abc!", &re, "name").is_err());
        assert!(check::charset("abc", &re, "name").is_ok());
        assert!(check::max_len("abcdef", 3, "name").is_err());
        assert!(check::unique("a", &["a".to_string()], "table").is_err());
        assert!(check::unique("b", &["a".to_string()], "table").is_ok());
    }
}
