//! Blocking yes/no gate in front of the mutation phase.
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// Source of the operator's decision.
pub trait Confirmer {
    /// Ask once and block until a decision is available.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// Line-based prompt over a reader/writer pair (stdin/stderr in the binary).
///
/// An empty answer takes the default, unrecognized answers are re-asked, and
/// end of input declines.
pub struct TerminalConfirm<R, W> {
    input: R,
    output: W,
}

impl TerminalConfirm<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirmer for TerminalConfirm<R, W> {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.output, "? {prompt} ({hint}) ").context("write confirmation prompt")?;
            self.output.flush().context("flush confirmation prompt")?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .context("read confirmation answer")?;
            if read == 0 {
                writeln!(self.output).context("write confirmation prompt")?;
                tracing::warn!("confirmation input closed; treating as no");
                return Ok(false);
            }

            match parse_answer(&line) {
                Some(Answer::Default) => return Ok(default),
                Some(Answer::Yes) => return Ok(true),
                Some(Answer::No) => return Ok(false),
                None => {
                    writeln!(self.output, "  please answer y or n")
                        .context("write confirmation prompt")?;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Default,
    Yes,
    No,
}

fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(Answer::Default),
        "y" | "yes" => Some(Answer::Yes),
        "n" | "no" => Some(Answer::No),
        _ => None,
    }
}
