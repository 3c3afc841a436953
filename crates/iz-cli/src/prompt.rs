//! Interactive input. Prompts are written to stderr so stdout stays clean.

use std::io::{self, BufRead, BufReader, IsTerminal, Stdin, Write};

use anyhow::anyhow;

use crate::client::{CliError, CliResult};

/// Source of interactive answers.
pub(crate) trait Prompt: Send {
    /// Print `message` and read one line without its line terminator.
    fn read_line(&mut self, message: &str) -> CliResult<String>;

    /// Read a value that must not be echoed.
    fn read_secret(&mut self, message: &str) -> CliResult<String>;

    /// Ask a yes/no question; anything but `y`/`yes` declines.
    fn confirm(&mut self, message: &str) -> CliResult<bool> {
        let answer = self.read_line(&format!("{message} [y/N]: "))?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

/// Line-oriented prompt over any buffered reader.
pub(crate) struct LinePrompt<R> {
    input: R,
    interactive: bool,
}

impl LinePrompt<BufReader<Stdin>> {
    pub(crate) fn stdin() -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        Self {
            input: BufReader::new(stdin),
            interactive,
        }
    }
}

impl<R: BufRead> LinePrompt<R> {
    #[cfg(test)]
    pub(crate) const fn new(input: R) -> Self {
        Self {
            input,
            interactive: false,
        }
    }
}

impl<R: BufRead + Send> Prompt for LinePrompt<R> {
    fn read_line(&mut self, message: &str) -> CliResult<String> {
        let mut stderr = io::stderr();
        // Prompt output is best-effort; the answer still comes from input.
        let _ = write!(stderr, "{message}");
        let _ = stderr.flush();

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|err| CliError::failure(anyhow!("failed to read from stdin: {err}")))?;
        if read == 0 {
            return Err(CliError::validation(
                "no input available on stdin; supply the value with a flag",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_secret(&mut self, message: &str) -> CliResult<String> {
        if self.interactive {
            rpassword::prompt_password(message)
                .map_err(|err| CliError::failure(anyhow!("failed to read from terminal: {err}")))
        } else {
            self.read_line(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_line_strips_terminator_and_reports_eof() {
        let mut prompt = LinePrompt::new(Cursor::new("first\r\nsecond\n"));
        assert_eq!(prompt.read_line("? ").expect("first"), "first");
        assert_eq!(prompt.read_secret("? ").expect("second"), "second");
        assert!(matches!(
            prompt.read_line("? "),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn confirm_accepts_only_yes() {
        let mut prompt = LinePrompt::new(Cursor::new("YES\nn\n\n"));
        assert!(prompt.confirm("delete?").expect("yes"));
        assert!(!prompt.confirm("delete?").expect("no"));
        assert!(!prompt.confirm("delete?").expect("empty"));
    }
}
