//! Typed questions and the Prompter collaborator.
//!
//! Editors describe what they need as a list of [`Question`]s; a [`Prompter`]
//! owns how those are posed and how validation failures are handled. The
//! console prompter re-poses a question until its validator passes. The
//! scripted prompter (tests, `--answers`) has nothing to re-ask, so a
//! validation failure aborts the enclosing chain — and with it the whole
//! invocation, leaving the document unwritten.

use crate::core::error::BackspecError;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, BufRead, Write};

/// Validation predicate over a candidate answer. The message is shown to the
/// operator (console) or becomes the abort error (scripted).
pub type Validator = Box<dyn Fn(&str) -> Result<(), String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Text,
    SingleSelect,
    MultiSelect,
    Confirm,
}

pub struct Question {
    pub name: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub choices: Vec<String>,
    pub default: Option<Answer>,
    pub validator: Option<Validator>,
}

impl Question {
    pub fn text(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Question {
            name: name.into(),
            prompt: prompt.into(),
            kind: QuestionKind::Text,
            choices: Vec::new(),
            default: None,
            validator: None,
        }
    }

    pub fn select(
        name: impl Into<String>,
        prompt: impl Into<String>,
        choices: Vec<String>,
    ) -> Self {
        Question {
            name: name.into(),
            prompt: prompt.into(),
            kind: QuestionKind::SingleSelect,
            choices,
            default: None,
            validator: None,
        }
    }

    pub fn multi_select(
        name: impl Into<String>,
        prompt: impl Into<String>,
        choices: Vec<String>,
    ) -> Self {
        Question {
            name: name.into(),
            prompt: prompt.into(),
            kind: QuestionKind::MultiSelect,
            choices,
            default: None,
            validator: None,
        }
    }

    pub fn confirm(name: impl Into<String>, prompt: impl Into<String>, default: bool) -> Self {
        Question {
            name: name.into(),
            prompt: prompt.into(),
            kind: QuestionKind::Confirm,
            choices: Vec::new(),
            default: Some(Answer::Bool(default)),
            validator: None,
        }
    }

    pub fn with_default(mut self, answer: Answer) -> Self {
        self.default = Some(answer);
        self
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&str) -> Result<(), String> + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Bool(bool),
    Many(Vec<String>),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Answer {
        Answer::Text(value.into())
    }

    pub fn many<I: IntoIterator<Item = S>, S: Into<String>>(values: I) -> Answer {
        Answer::Many(values.into_iter().map(Into::into).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Answers keyed by question name.
#[derive(Debug, Default)]
pub struct AnswerSet {
    answers: BTreeMap<String, Answer>,
}

impl AnswerSet {
    pub fn insert(&mut self, name: impl Into<String>, answer: Answer) {
        self.answers.insert(name.into(), answer);
    }

    pub fn text(&self, name: &str) -> Result<&str, BackspecError> {
        self.answers
            .get(name)
            .and_then(Answer::as_text)
            .ok_or_else(|| missing(name))
    }

    pub fn boolean(&self, name: &str) -> Result<bool, BackspecError> {
        self.answers
            .get(name)
            .and_then(Answer::as_bool)
            .ok_or_else(|| missing(name))
    }

    pub fn many(&self, name: &str) -> Result<&[String], BackspecError> {
        match self.answers.get(name) {
            Some(Answer::Many(values)) => Ok(values),
            _ => Err(missing(name)),
        }
    }
}

fn missing(name: &str) -> BackspecError {
    BackspecError::ValidationError(format!("no answer recorded for question '{}'", name))
}

/// The abstract Q&A collaborator every editor suspends on.
pub trait Prompter {
    fn ask(&mut self, questions: &[Question]) -> Result<AnswerSet, BackspecError>;
}

/// Line-oriented prompter over stdin/stdout. Re-poses a question until the
/// input parses and its validator passes; empty input takes the default.
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&mut self, questions: &[Question]) -> Result<AnswerSet, BackspecError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut answers = AnswerSet::default();
        for question in questions {
            let answer = pose(question, &mut input)?;
            answers.insert(question.name.clone(), answer);
        }
        Ok(answers)
    }
}

fn pose(question: &Question, input: &mut impl BufRead) -> Result<Answer, BackspecError> {
    loop {
        match question.kind {
            QuestionKind::Text => print!("{}", render_text_prompt(question)),
            QuestionKind::Confirm => print!("{}", render_confirm_prompt(question)),
            QuestionKind::SingleSelect | QuestionKind::MultiSelect => {
                print!("{}", render_select_prompt(question));
            }
        }
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(BackspecError::ValidationError(format!(
                "input closed while waiting for '{}'",
                question.name
            )));
        }
        let line = line.trim();

        match parse_reply(question, line) {
            Ok(answer) => return Ok(answer),
            Err(message) => println!("  {}", message),
        }
    }
}

fn render_text_prompt(question: &Question) -> String {
    match question.default.as_ref().and_then(Answer::as_text) {
        Some(default) => format!("{} [{}]: ", question.prompt, default),
        None => format!("{}: ", question.prompt),
    }
}

fn render_confirm_prompt(question: &Question) -> String {
    let hint = match question.default.as_ref().and_then(Answer::as_bool) {
        Some(true) => "[Y/n]",
        _ => "[y/N]",
    };
    format!("{} {}: ", question.prompt, hint)
}

fn render_select_prompt(question: &Question) -> String {
    let mut out = format!("{}\n", question.prompt);
    for (idx, choice) in question.choices.iter().enumerate() {
        out.push_str(&format!("  {}) {}\n", idx + 1, choice));
    }
    out.push_str("> ");
    out
}

/// Parse one console reply; `Err` carries the re-ask message.
fn parse_reply(question: &Question, line: &str) -> Result<Answer, String> {
    match question.kind {
        QuestionKind::Text => {
            let value = if line.is_empty() {
                match question.default.as_ref().and_then(Answer::as_text) {
                    Some(default) => return Ok(Answer::text(default)),
                    None => "",
                }
            } else {
                line
            };
            run_validator(question, value)?;
            Ok(Answer::text(value))
        }
        QuestionKind::Confirm => {
            if line.is_empty() {
                if let Some(default) = question.default.as_ref().and_then(Answer::as_bool) {
                    return Ok(Answer::Bool(default));
                }
            }
            match line.to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" => Ok(Answer::Bool(true)),
                "n" | "no" | "false" => Ok(Answer::Bool(false)),
                _ => Err("answer y or n".to_string()),
            }
        }
        QuestionKind::SingleSelect => {
            if line.is_empty() {
                if let Some(default) = question.default.as_ref().and_then(Answer::as_text) {
                    return Ok(Answer::text(default));
                }
            }
            let choice = resolve_choice(&question.choices, line)
                .ok_or_else(|| "pick one of the listed options".to_string())?;
            run_validator(question, &choice)?;
            Ok(Answer::Text(choice))
        }
        QuestionKind::MultiSelect => {
            if line.is_empty() {
                return Ok(question
                    .default
                    .clone()
                    .unwrap_or_else(|| Answer::Many(Vec::new())));
            }
            let mut picked = Vec::new();
            for part in line.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let choice = resolve_choice(&question.choices, part)
                    .ok_or_else(|| format!("'{}' is not a listed option", part))?;
                if !picked.contains(&choice) {
                    picked.push(choice);
                }
            }
            Ok(Answer::Many(picked))
        }
    }
}

/// Accept either a 1-based position or the exact choice text.
fn resolve_choice(choices: &[String], reply: &str) -> Option<String> {
    if let Ok(position) = reply.parse::<usize>() {
        if (1..=choices.len()).contains(&position) {
            return Some(choices[position - 1].clone());
        }
        return None;
    }
    choices.iter().find(|c| c.as_str() == reply).cloned()
}

fn run_validator(question: &Question, value: &str) -> Result<(), String> {
    match &question.validator {
        Some(validator) => validator(value),
        None => Ok(()),
    }
}

/// Prompter fed from a pre-recorded answer queue (tests and `--answers`).
///
/// Each question consumes the next queued answer; an exhausted queue falls
/// back to the question default. There is no re-ask here: any validation
/// failure is surfaced as an error and aborts the chain.
pub struct ScriptedPrompter {
    queue: VecDeque<Answer>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        ScriptedPrompter {
            queue: answers.into_iter().collect(),
        }
    }

    /// Build from a JSON array: strings, booleans, and string arrays.
    pub fn from_values(values: &[serde_json::Value]) -> Result<Self, BackspecError> {
        let mut queue = VecDeque::new();
        for value in values {
            let answer = match value {
                serde_json::Value::String(s) => Answer::text(s.clone()),
                serde_json::Value::Bool(b) => Answer::Bool(*b),
                serde_json::Value::Array(items) => {
                    let mut many = Vec::new();
                    for item in items {
                        match item.as_str() {
                            Some(s) => many.push(s.to_string()),
                            None => {
                                return Err(BackspecError::ValidationError(
                                    "answer arrays may only contain strings".to_string(),
                                ));
                            }
                        }
                    }
                    Answer::Many(many)
                }
                other => {
                    return Err(BackspecError::ValidationError(format!(
                        "unsupported answer value: {}",
                        other
                    )));
                }
            };
            queue.push_back(answer);
        }
        Ok(ScriptedPrompter { queue })
    }

    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, questions: &[Question]) -> Result<AnswerSet, BackspecError> {
        let mut answers = AnswerSet::default();
        for question in questions {
            let answer = match self.queue.pop_front() {
                Some(answer) => answer,
                None => question.default.clone().ok_or_else(|| {
                    BackspecError::ValidationError(format!(
                        "scripted answers exhausted at question '{}'",
                        question.name
                    ))
                })?,
            };
            let answer = conform(question, answer)?;
            answers.insert(question.name.clone(), answer);
        }
        Ok(answers)
    }
}

/// Check a scripted answer against the question's kind and validator.
fn conform(question: &Question, answer: Answer) -> Result<Answer, BackspecError> {
    let reject = |detail: String| {
        BackspecError::ValidationError(format!("question '{}': {}", question.name, detail))
    };
    match (question.kind, &answer) {
        (QuestionKind::Text, Answer::Text(value)) => {
            run_validator(question, value).map_err(reject)?;
            Ok(answer)
        }
        (QuestionKind::Confirm, Answer::Bool(_)) => Ok(answer),
        (QuestionKind::SingleSelect, Answer::Text(value)) => {
            if !question.choices.iter().any(|c| c == value) {
                return Err(reject(format!("'{}' is not a listed option", value)));
            }
            run_validator(question, value).map_err(reject)?;
            Ok(answer)
        }
        (QuestionKind::MultiSelect, Answer::Many(values)) => {
            for value in values {
                if !question.choices.iter().any(|c| c == value) {
                    return Err(reject(format!("'{}' is not a listed option", value)));
                }
            }
            Ok(answer)
        }
        _ => Err(reject("answer kind does not match question kind".to_string())),
    }
}
