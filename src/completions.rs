use std::io::Write;

use clap_complete::{generate, Shell};

use crate::app::AppError;

/// Writes the completion script for `shell`, or for the shell named by
/// `$SHELL` when none is given.
pub fn print_completions(shell: Option<Shell>, out: &mut dyn Write) -> Result<(), AppError> {
    let shell = shell.or_else(Shell::from_env).ok_or_else(|| {
        AppError::InvalidArgument("unable to detect shell from $SHELL; pass a shell name".to_string())
    })?;
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, "edumind", out);
    Ok(())
}
