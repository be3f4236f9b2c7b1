use std::collections::VecDeque;
use std::sync::Mutex;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::ConfirmError;

/// An answer counts as yes when it starts with `y` once trimmed and lower-cased.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

/// Asks the person running the workflow a yes/no question.
///
/// End of input is [`ConfirmError::Closed`], never a no.
#[async_trait::async_trait]
pub trait ConfirmationProvider: Send + Sync {
    /// Shows informational text before a question.
    fn present(&self, _text: &str) {}

    async fn confirm(&self, question: &str) -> Result<bool, ConfirmError>;
}

/// Reads answers from the terminal with line editing.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinConfirmation;

#[async_trait::async_trait]
impl ConfirmationProvider for StdinConfirmation {
    fn present(&self, text: &str) {
        println!("{text}");
    }

    async fn confirm(&self, question: &str) -> Result<bool, ConfirmError> {
        let prompt = format!("{question}: ");
        tokio::task::spawn_blocking(move || {
            let mut editor = DefaultEditor::new().map_err(ConfirmError::Readline)?;
            interpret(editor.readline(&prompt))
        })
        .await
        .map_err(|err| ConfirmError::Join(err.to_string()))?
    }
}

fn interpret(line: Result<String, ReadlineError>) -> Result<bool, ConfirmError> {
    match line {
        Ok(answer) => Ok(is_affirmative(&answer)),
        Err(ReadlineError::Eof) => Err(ConfirmError::Closed),
        Err(ReadlineError::Interrupted) => Err(ConfirmError::Interrupted),
        Err(err) => Err(ConfirmError::Readline(err)),
    }
}

/// Replays canned answers; once they run out the input counts as closed.
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
    presented: Mutex<Vec<String>>,
}

impl ScriptedConfirmation {
    pub fn new<I, A>(answers: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn questions(&self) -> Vec<String> {
        lock(&self.questions).clone()
    }

    pub fn presented(&self) -> Vec<String> {
        lock(&self.presented).clone()
    }
}

#[async_trait::async_trait]
impl ConfirmationProvider for ScriptedConfirmation {
    fn present(&self, text: &str) {
        lock(&self.presented).push(text.to_string());
    }

    async fn confirm(&self, question: &str) -> Result<bool, ConfirmError> {
        lock(&self.questions).push(question.to_string());
        let answer = lock(&self.answers).pop_front();
        answer
            .map(|answer| is_affirmative(&answer))
            .ok_or(ConfirmError::Closed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
