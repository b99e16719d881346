/*!
shell.rs - console chat transport.

Reads one command per line and prints every reply to stdout. A single tokio
runtime is created up front and each command is driven to completion with
`block_on`, so commands run strictly one after another.
*/

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use super::format::{self, Role, StyleOptions};
use super::handler::Handler;
use crate::orchestrator::Responder;
use crate::rundeck::Transport;

/// Prints each reply followed by a newline.
pub struct ConsoleResponder<W: Write> {
    out: W,
}

impl<W: Write> ConsoleResponder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Responder for ConsoleResponder<W> {
    fn reply(&mut self, text: String) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write reply");
        }
    }
}

pub struct Console<T> {
    runtime: Runtime,
    handler: Handler<T>,
    /// Chat identity every console command runs as.
    user: String,
}

impl<T: Transport> Console<T> {
    pub fn new(handler: Handler<T>, user: impl Into<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;
        Ok(Self {
            runtime,
            handler,
            user: user.into(),
        })
    }

    /// Run a single command line.
    pub fn execute(&mut self, line: &str, out: &mut dyn Responder) {
        self.runtime
            .block_on(self.handler.handle(&self.user, line, out));
    }

    /// Feed `input` line by line until EOF or `quit`. Returns the number of
    /// commands handled.
    pub fn run_lines(
        &mut self,
        input: impl BufRead,
        out: &mut dyn Responder,
        prompt: Option<&StyleOptions>,
    ) -> Result<usize> {
        let mut handled = 0;
        if let Some(style) = prompt {
            eprintln!(
                "{}",
                format::color(Role::Dim, "Type `help` for commands, `quit` to leave.", style)
            );
        }
        show_prompt(prompt);
        for line in input.lines() {
            let line = line.context("Failed to read command from stdin")?;
            let line = line.trim();
            if matches!(line, "quit" | "exit") {
                break;
            }
            if !line.is_empty() && !line.starts_with('#') {
                self.execute(line, out);
                handled += 1;
            }
            show_prompt(prompt);
        }
        tracing::debug!(handled, "console input finished");
        Ok(handled)
    }
}

fn show_prompt(style: Option<&StyleOptions>) {
    if let Some(style) = style {
        eprint!("{} ", format::color(Role::Primary, "rundeck>", style));
    }
}
