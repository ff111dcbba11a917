//! Environment-sourced limiter profiles.
//!
//! Three named profiles exist: `guest`, `auth`, and `user`, each with an
//! independent capacity/window pair read from the environment:
//!
//! | variable | default |
//! |---|---|
//! | `RATE_LIMIT_GUEST_POINTS` | 50 |
//! | `RATE_LIMIT_GUEST_DURATION` | 60 (seconds) |
//! | `RATE_LIMIT_AUTH_POINTS` | 5 |
//! | `RATE_LIMIT_AUTH_DURATION` | 60 |
//! | `RATE_LIMIT_USER_POINTS` | 100 |
//! | `RATE_LIMIT_USER_DURATION` | 60 |
//!
//! Unset variables take the defaults. Present-but-invalid values (including
//! zero) are a [`ConfigError`]: the route should refuse to start rather than
//! silently default.

use crate::error::ConfigError;
use crate::http::{KeyStrategy, RouteGuard};
use crate::limiter::{Limiter, LimiterConfig};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_GUEST_POINTS: u32 = 50;
const DEFAULT_AUTH_POINTS: u32 = 5;
const DEFAULT_USER_POINTS: u32 = 100;
const DEFAULT_DURATION_SECS: u64 = 60;

/// Named limiter profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Unauthenticated traffic, keyed by IP.
    Guest,
    /// Authentication endpoints (login, OTP), keyed by IP and deliberately
    /// tight.
    Auth,
    /// Authenticated traffic, keyed by principal with IP fallback.
    User,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Auth => "auth",
            Self::User => "user",
        }
    }

    /// Key strategy the profile's guard uses.
    pub fn key_strategy(&self) -> KeyStrategy {
        match self {
            Self::Guest | Self::Auth => KeyStrategy::Ip,
            Self::User => KeyStrategy::PrincipalOrIp,
        }
    }

    fn env_suffix(&self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::Auth => "AUTH",
            Self::User => "USER",
        }
    }

    fn default_points(&self) -> u32 {
        match self {
            Self::Guest => DEFAULT_GUEST_POINTS,
            Self::Auth => DEFAULT_AUTH_POINTS,
            Self::User => DEFAULT_USER_POINTS,
        }
    }
}

/// Capacity/window settings for the three profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSettings {
    pub guest: LimiterConfig,
    pub auth: LimiterConfig,
    pub user: LimiterConfig,
}

impl ProfileSettings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings from an arbitrary variable lookup.
    ///
    /// Lets tests (or alternative config sources) supply variables without
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            guest: profile_config(&lookup, Profile::Guest)?,
            auth: profile_config(&lookup, Profile::Auth)?,
            user: profile_config(&lookup, Profile::User)?,
        })
    }

    /// The settings for one profile.
    pub fn get(&self, profile: Profile) -> LimiterConfig {
        match profile {
            Profile::Guest => self.guest,
            Profile::Auth => self.auth,
            Profile::User => self.user,
        }
    }
}

fn profile_config<F>(lookup: &F, profile: Profile) -> Result<LimiterConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let points = env_number::<F, u32>(lookup, &format!("RATE_LIMIT_{}_POINTS", profile.env_suffix()))?
        .unwrap_or_else(|| profile.default_points());
    let duration =
        env_number::<F, u64>(lookup, &format!("RATE_LIMIT_{}_DURATION", profile.env_suffix()))?
            .unwrap_or(DEFAULT_DURATION_SECS);
    LimiterConfig::new(points, Duration::from_secs(duration))
}

fn env_number<F, N>(lookup: &F, name: &str) -> Result<Option<N>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidEnvVar {
            name: name.to_owned(),
            value: raw,
        }),
    }
}

/// One configured limiter per profile, each tracking its own buckets.
///
/// Construct once at startup and hand out guards to the routing layer; the
/// limiters are owned here rather than living in process-wide singletons.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    guest: Arc<Limiter>,
    auth: Arc<Limiter>,
    user: Arc<Limiter>,
}

impl ProfileSet {
    /// Build the three limiters from resolved settings.
    pub fn new(settings: ProfileSettings) -> Self {
        Self {
            guest: Arc::new(Limiter::new(settings.guest)),
            auth: Arc::new(Limiter::new(settings.auth)),
            user: Arc::new(Limiter::new(settings.user)),
        }
    }

    /// Build the three limiters straight from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ProfileSettings::from_env()?))
    }

    /// The limiter backing one profile.
    pub fn limiter(&self, profile: Profile) -> &Arc<Limiter> {
        match profile {
            Profile::Guest => &self.guest,
            Profile::Auth => &self.auth,
            Profile::User => &self.user,
        }
    }

    /// A route guard for one profile, using its canonical key strategy.
    pub fn guard(&self, profile: Profile) -> RouteGuard {
        RouteGuard::new(self.limiter(profile).clone(), profile.key_strategy())
    }
}
