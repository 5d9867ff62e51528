use dialoguer::{Input, Password};
use is_terminal::IsTerminal;

use crate::error::{Error, Result};

/// Narrow seam to the terminal: interactive questions plus plain line
/// output. The core talks only to this trait so login flows can run
/// against scripted answers in tests.
pub trait Ui: Send + Sync {
    fn ask_for_text(&self, label: &str) -> Result<String>;
    fn ask_for_password(&self, label: &str) -> Result<String>;
    fn print_line(&self, line: &str);
    fn error_line(&self, line: &str);
}

pub struct TerminalUi;

impl TerminalUi {
    fn ensure_interactive(label: &str) -> Result<()> {
        if std::io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(Error::Prompt {
                label: label.to_string(),
                reason: "stdin is not a terminal".to_string(),
            })
        }
    }
}

impl Ui for TerminalUi {
    fn ask_for_text(&self, label: &str) -> Result<String> {
        Self::ensure_interactive(label)?;
        Input::<String>::new()
            .with_prompt(label)
            .interact()
            .map_err(|err| Error::Prompt {
                label: label.to_string(),
                reason: err.to_string(),
            })
    }

    fn ask_for_password(&self, label: &str) -> Result<String> {
        Self::ensure_interactive(label)?;
        Password::new()
            .with_prompt(label)
            .interact()
            .map_err(|err| Error::Prompt {
                label: label.to_string(),
                reason: err.to_string(),
            })
    }

    fn print_line(&self, line: &str) {
        println!("{line}");
    }

    fn error_line(&self, line: &str) {
        eprintln!("{line}");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted UI: hands out queued answers and records everything asked
    /// and printed. Running out of answers behaves like a closed input
    /// stream and surfaces as a prompt failure.
    #[derive(Default)]
    pub struct FakeUi {
        pub text_answers: Mutex<VecDeque<String>>,
        pub password_answers: Mutex<VecDeque<String>>,
        pub asked_text_labels: Mutex<Vec<String>>,
        pub asked_password_labels: Mutex<Vec<String>>,
        pub lines: Mutex<Vec<String>>,
        pub errors: Mutex<Vec<String>>,
    }

    impl FakeUi {
        pub fn with_answers(text: &[&str], passwords: &[&str]) -> Self {
            let ui = Self::default();
            ui.text_answers
                .lock()
                .unwrap()
                .extend(text.iter().map(|s| s.to_string()));
            ui.password_answers
                .lock()
                .unwrap()
                .extend(passwords.iter().map(|s| s.to_string()));
            ui
        }
    }

    impl Ui for FakeUi {
        fn ask_for_text(&self, label: &str) -> Result<String> {
            self.asked_text_labels.lock().unwrap().push(label.to_string());
            self.text_answers.lock().unwrap().pop_front().ok_or_else(|| Error::Prompt {
                label: label.to_string(),
                reason: "no scripted answer".to_string(),
            })
        }

        fn ask_for_password(&self, label: &str) -> Result<String> {
            self.asked_password_labels.lock().unwrap().push(label.to_string());
            self.password_answers.lock().unwrap().pop_front().ok_or_else(|| Error::Prompt {
                label: label.to_string(),
                reason: "no scripted answer".to_string(),
            })
        }

        fn print_line(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn error_line(&self, line: &str) {
            self.errors.lock().unwrap().push(line.to_string());
        }
    }
}
