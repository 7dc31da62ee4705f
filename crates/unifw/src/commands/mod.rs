//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod groups;
pub mod rules;
pub mod session;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Rules(args) => rules::handle(session, args, global).await,
        Command::Groups(args) => groups::handle(session, args, global).await,
        Command::Session(args) => session::handle(session, args, global),
        // Config and Completions are handled before a session is opened
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
