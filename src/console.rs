//! Line-based conversation with the user.

use std::io::{self, BufRead, Write};

use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Hints and progress notes.
    Note,
    Success,
    Warning,
    Failure,
}

pub trait Console {
    /// Shows `question` and returns the answer with surrounding whitespace removed.
    fn ask(&mut self, question: &str) -> io::Result<String>;

    fn say(&mut self, tone: Tone, message: &str);
}

/// Reads from stdin, writes to stdout (stderr for failures).
pub struct TerminalConsole<R> {
    input: R,
}

impl TerminalConsole<io::StdinLock<'static>> {
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> Console for TerminalConsole<R> {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        print!("{} ", question.bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, tone: Tone, message: &str) {
        match tone {
            Tone::Note => println!("{}", message.yellow().dimmed()),
            Tone::Success => println!("{}", message.green().bold()),
            Tone::Warning => println!("{}", message.yellow().bold()),
            Tone::Failure => eprintln!("{}", message.red().bold()),
        }
    }
}

/// Interprets a yes/no answer; an empty answer takes `default`.
pub fn parse_yes_no(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub mod scripted {
    use std::collections::VecDeque;

    use super::*;

    /// Console fed from a fixed list of answers that records everything shown.
    #[derive(Default)]
    pub struct ScriptedConsole {
        answers: VecDeque<String>,
        pub questions: Vec<String>,
        pub messages: Vec<(Tone, String)>,
    }

    impl ScriptedConsole {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn said(&self, tone: Tone, needle: &str) -> bool {
            self.messages
                .iter()
                .any(|(t, m)| *t == tone && m.contains(needle))
        }
    }

    impl Console for ScriptedConsole {
        fn ask(&mut self, question: &str) -> io::Result<String> {
            self.questions.push(question.to_string());
            self.answers
                .pop_front()
                .map(|a| a.trim().to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }

        fn say(&mut self, tone: Tone, message: &str) {
            self.messages.push((tone, message.to_string()));
        }
    }
}
