/*!
Chat command layer.

  command.rs   chat line -> ChatCommand (clap over shell-words)
  handler.rs   Handler: dispatch a ChatCommand, reply through a Responder
  format.rs    reply rendering (exact chat text)
  shell.rs     console transport: stdin lines -> replies on stdout

Conventions:
  - Every reply is produced by a `format::*` function or an error's Display.
  - Nothing here prints except `shell.rs`.
*/

pub mod command;
pub mod format;
pub mod handler;
pub mod shell;

pub use handler::{Handler, HandlerSettings};
pub use shell::{Console, ConsoleResponder};
