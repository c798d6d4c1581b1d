//! Worker roles and the command-line restrictions that select them.
//!
//! [`Role`] is the single canonical list of process roles. The command line
//! exposes a smaller, renamed vocabulary ([`ModuleRestriction`]) which maps
//! onto roles through [`ModuleRestriction::roles`].

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString, VariantArray};
use thiserror::Error;

/// Fixed responsibility a worker process executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// Hands out mining work to connected miners.
    WorkServer,
    /// Polls the blockchain daemon for new block templates.
    DaemonWatcher,
    /// Polls the daemon of a merged-mining child pool.
    ChildDaemonWatcher,
    /// Unlocks matured block rewards.
    RewardUnlocker,
    /// Sends miner payouts.
    PayoutProcessor,
    /// Serves the HTTP API.
    ApiServer,
    /// Collects statistics for charts.
    StatsCollector,
    /// Relays notifications to chat subscribers.
    NotificationBot,
}

impl Role {
    /// Every role, in spawn order.
    pub const ALL: [Self; 8] = [
        Self::WorkServer,
        Self::DaemonWatcher,
        Self::ChildDaemonWatcher,
        Self::RewardUnlocker,
        Self::PayoutProcessor,
        Self::ApiServer,
        Self::StatsCollector,
        Self::NotificationBot,
    ];

    /// Token bound to a worker process for this role.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::WorkServer => "work-server",
            Self::DaemonWatcher => "daemon-watcher",
            Self::ChildDaemonWatcher => "child-daemon-watcher",
            Self::RewardUnlocker => "reward-unlocker",
            Self::PayoutProcessor => "payout-processor",
            Self::ApiServer => "api-server",
            Self::StatsCollector => "stats-collector",
            Self::NotificationBot => "notification-bot",
        }
    }

    /// Comma-separated list of every valid token.
    #[must_use]
    pub fn valid_tokens() -> String {
        Self::ALL.map(Self::token).join(", ")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.token())
    }
}

/// Error returned when a token names no known role.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown worker role: {0}")]
pub struct RoleParseError(String);

impl RoleParseError {
    /// Returns the token that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.token() == value)
            .ok_or_else(|| RoleParseError(value.to_owned()))
    }
}

/// Role token as read by a worker at start-up.
///
/// Tokens that name no role are kept as [`RoleToken::Unknown`] so the
/// dispatcher must handle them explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleToken {
    /// The token named one of the eight roles.
    Known(Role),
    /// The token was not recognised.
    Unknown(String),
}

impl RoleToken {
    /// Classifies a raw token.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.parse::<Role>()
            .map_or_else(|error| Self::Unknown(error.0), Self::Known)
    }
}

impl fmt::Display for RoleToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(role) => role.fmt(formatter),
            Self::Unknown(token) => formatter.write_str(token),
        }
    }
}

/// Single-role restriction requested with `-module=<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantArray)]
pub enum ModuleRestriction {
    /// Work servers, optionally bundled with the daemon watchers.
    #[strum(serialize = "pool")]
    Pool,
    /// HTTP API only.
    #[strum(serialize = "api")]
    Api,
    /// Reward unlocker only.
    #[strum(serialize = "unlocker")]
    Unlocker,
    /// Payout processor only.
    #[strum(serialize = "payments")]
    Payments,
    /// Statistics collector only.
    #[strum(serialize = "chartsDataCollector")]
    ChartsDataCollector,
    /// Notification bot only.
    #[strum(serialize = "telegramBot")]
    TelegramBot,
}

impl ModuleRestriction {
    /// Roles activated by this restriction, before watcher bundling.
    #[must_use]
    pub const fn roles(self) -> &'static [Role] {
        match self {
            Self::Pool => &[Role::WorkServer],
            Self::Api => &[Role::ApiServer],
            Self::Unlocker => &[Role::RewardUnlocker],
            Self::Payments => &[Role::PayoutProcessor],
            Self::ChartsDataCollector => &[Role::StatsCollector],
            Self::TelegramBot => &[Role::NotificationBot],
        }
    }

    /// Comma-separated whitelist of accepted names.
    #[must_use]
    pub fn whitelist() -> String {
        Self::VARIANTS
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
