//! Debug console commands.
//!
//! ```text
//! giantscheat              toggle cheat mode
//! giantsscale <number>     set the visual scale of future giants
//! giantsprefix <text>      set the name prefix (trailing spaces kept)
//! ```

use tracing::info;

use crate::config::Tunables;

/// Toggles cheat mode.
pub const CHEAT_COMMAND: &str = "giantscheat";

/// Sets the scale factor.
pub const SCALE_COMMAND: &str = "giantsscale";

/// Sets the name prefix.
pub const PREFIX_COMMAND: &str = "giantsprefix";

/// A malformed debug command. The previous value is always kept.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The command needs an argument and none was given.
    #[error("{0} requires an argument")]
    MissingArgument(&'static str),

    /// The scale argument is not a positive finite number.
    #[error("scale must be a positive number, got {0:?}")]
    InvalidScale(String),

    /// The prefix argument is blank.
    #[error("name prefix must not be empty")]
    EmptyPrefix,
}

/// A parsed debug command.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Flip cheat mode.
    ToggleCheat,
    /// Set the scale factor.
    SetScale(f32),
    /// Set the name prefix.
    SetPrefix(String),
}

impl ConsoleCommand {
    /// Parse one console line. Returns `Ok(None)` for lines that are not ours.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for one of our commands with a bad argument.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim_start();
        let (name, rest) = match line.split_once(' ') {
            Some((name, rest)) => (name, rest),
            None => (line.trim_end(), ""),
        };

        match name {
            CHEAT_COMMAND => Ok(Some(Self::ToggleCheat)),
            SCALE_COMMAND => {
                let arg = rest.trim();
                if arg.is_empty() {
                    return Err(CommandError::MissingArgument(SCALE_COMMAND));
                }
                match arg.parse::<f32>() {
                    Ok(scale) if scale.is_finite() && scale > 0.0 => {
                        Ok(Some(Self::SetScale(scale)))
                    }
                    _ => Err(CommandError::InvalidScale(arg.to_string())),
                }
            }
            PREFIX_COMMAND => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument(PREFIX_COMMAND));
                }
                if rest.trim().is_empty() {
                    return Err(CommandError::EmptyPrefix);
                }
                Ok(Some(Self::SetPrefix(rest.to_string())))
            }
            _ => Ok(None),
        }
    }

    /// Apply the command to `tunables`.
    pub fn apply(&self, tunables: &mut Tunables) {
        match self {
            Self::ToggleCheat => {
                tunables.cheat_mode = !tunables.cheat_mode;
                info!(
                    cheat_mode = tunables.cheat_mode,
                    "cheat mode {}",
                    if tunables.cheat_mode { "on" } else { "off" }
                );
            }
            Self::SetScale(scale) => {
                tunables.scale = *scale;
                info!(scale, "giant scale updated");
            }
            Self::SetPrefix(prefix) => {
                tunables.name_prefix.clone_from(prefix);
                info!(prefix = %prefix, "giant name prefix updated");
            }
        }
    }
}
