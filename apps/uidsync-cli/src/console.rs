//! Terminal console: progress lines and yes/no confirmation.

use std::io::{BufRead, IsTerminal, Write};

use dialoguer::Confirm;
use uidsync_core::error::{CoreError, CoreResult};
use uidsync_core::traits::Console;

pub struct TerminalConsole {
    /// Answer every confirmation with "no" without reading input.
    assume_no: bool,
}

impl TerminalConsole {
    pub fn new(assume_no: bool) -> Self {
        Self { assume_no }
    }
}

/// Checks if both stdin and stderr are connected to a terminal.
fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Line-based confirmation for non-terminal input.
///
/// `y`/`yes` confirm; `n`/`no`, an empty line or end of input decline;
/// anything else asks again.
pub fn read_answer<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> CoreResult<bool> {
    let prompt_err = |e: std::io::Error| CoreError::Prompt(e.to_string());
    loop {
        write!(out, "{prompt} [y/N] ").map_err(prompt_err)?;
        out.flush().map_err(prompt_err)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(prompt_err)? == 0 {
            writeln!(out).map_err(prompt_err)?;
            return Ok(false);
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => writeln!(out, "Please enter y or n").map_err(prompt_err)?,
        }
    }
}

impl Console for TerminalConsole {
    fn say(&self, line: &str) {
        println!("{line}");
    }

    fn warn(&self, line: &str) {
        eprintln!("warning: {line}");
    }

    fn confirm(&self, prompt: &str) -> CoreResult<bool> {
        if self.assume_no {
            println!("{prompt} [y/N] n (--assume-no)");
            return Ok(false);
        }

        if is_interactive_terminal() {
            return Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .map_err(|e| CoreError::Prompt(e.to_string()));
        }

        let stdin = std::io::stdin();
        read_answer(&mut stdin.lock(), &mut std::io::stdout(), prompt)
    }
}
