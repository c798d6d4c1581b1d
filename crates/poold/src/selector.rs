//! Master-side scan of the invocation arguments.
//!
//! The supervisor keeps the single-dash switches of the pool it replaces:
//! `-module=<name>` restricts the run to one role group and
//! `-config=<path>` selects the configuration file. In both cases the first
//! occurrence wins.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use thiserror::Error;

use crate::role::ModuleRestriction;

const MODULE_PREFIX: &str = "-module=";
const CONFIG_PREFIX: &str = "-config=";

/// Errors raised while resolving the module restriction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The requested module is not in the whitelist.
    #[error("Invalid module \"{value}\", valid modules: {valid}")]
    InvalidModule {
        /// Value supplied after `-module=`.
        value: String,
        /// Comma-separated whitelist.
        valid: String,
    },
}

/// Returns the restriction named by the first `-module=` argument.
///
/// The value is the text between the first `=` and any further `=`.
/// Returns `Ok(None)` when no argument carries the prefix. A value that is
/// not valid UTF-8 is rejected like any other unknown module.
pub fn select_module<I, A>(args: I) -> Result<Option<ModuleRestriction>, SelectorError>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
{
    let Some(raw) = first_prefixed(args, MODULE_PREFIX) else {
        return Ok(None);
    };
    let raw = raw.to_string_lossy();
    let value = raw.split('=').next().unwrap_or_default();
    value
        .parse::<ModuleRestriction>()
        .map(Some)
        .map_err(|_| SelectorError::InvalidModule {
            value: value.to_owned(),
            valid: ModuleRestriction::whitelist(),
        })
}

/// Returns the configuration file named by the first `-config=` argument.
pub fn config_path_argument<I, A>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
{
    first_prefixed(args, CONFIG_PREFIX)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Matches on raw bytes so non-UTF-8 arguments still count as occurrences.
fn first_prefixed<I, A>(args: I, prefix: &str) -> Option<OsString>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
{
    args.into_iter().find_map(|arg| {
        let arg = arg.into();
        arg.as_bytes()
            .strip_prefix(prefix.as_bytes())
            .map(|rest| OsStr::from_bytes(rest).to_os_string())
    })
}
