use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Input};

use crate::data::resolver::{ColumnPrompt, Field};

/// Asks for columns that could not be detected.
///
/// On a terminal the question goes through `dialoguer`. When stderr is not a
/// terminal (scripts, cron, `echo Date | rusty-aqi`) one line is read from
/// `lines` instead. A question that cannot be answered counts as a blank
/// answer.
pub struct TerminalPrompt {
    theme: ColorfulTheme,
    lines: Option<Box<dyn BufRead>>,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        let lines: Option<Box<dyn BufRead>> = if io::stderr().is_terminal() {
            None
        } else {
            Some(Box::new(io::stdin().lock()))
        };
        Self {
            theme: ColorfulTheme::default(),
            lines,
        }
    }
}

impl TerminalPrompt {
    /// Read answers line by line from `reader`, never touching the terminal.
    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            theme: ColorfulTheme::default(),
            lines: Some(Box::new(reader)),
        }
    }

    fn read_answer(&mut self, field: Field) -> Result<String> {
        match self.lines.as_mut() {
            Some(lines) => {
                print!("{}: ", field.prompt_text());
                io::stdout().flush().context("flushing prompt")?;
                let mut line = String::new();
                lines.read_line(&mut line).context("reading stdin")?;
                Ok(line)
            }
            None => Input::<String>::with_theme(&self.theme)
                .with_prompt(field.prompt_text())
                .allow_empty(true)
                .interact_text()
                .context("reading terminal"),
        }
    }
}

impl ColumnPrompt for TerminalPrompt {
    fn ask(&mut self, field: Field, columns: &[String]) -> Result<Option<String>> {
        log::debug!("asking for {field} among {} columns", columns.len());

        match self.read_answer(field) {
            Ok(answer) => {
                let answer = answer.trim();
                Ok((!answer.is_empty()).then(|| answer.to_string()))
            }
            Err(e) => {
                log::warn!("could not read {field} column name, treating it as blank: {e:#}");
                Ok(None)
            }
        }
    }
}
