//! Gateway intents.
//!
//! Intents select which event categories the gateway delivers. Single-bit
//! flags combine with `|` into the composite groups defined here; the
//! resulting value is sent as a plain integer in the Identify payload.
//!
//! ```
//! use kantele::Intents;
//!
//! let intents = Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT;
//! assert_eq!(intents.bits(), 33280);
//! assert!(intents.contains(Intents::GUILD_MESSAGES));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KanteleError;

/// Bitmask of gateway intents.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intents(u64);

impl Intents {
    pub const GUILDS: Self = Self(1 << 0);
    pub const GUILD_MEMBERS: Self = Self(1 << 1);
    pub const GUILD_MODERATION: Self = Self(1 << 2);
    pub const GUILD_EMOJIS_AND_STICKERS: Self = Self(1 << 3);
    pub const GUILD_INTEGRATIONS: Self = Self(1 << 4);
    pub const GUILD_WEBHOOKS: Self = Self(1 << 5);
    pub const GUILD_INVITES: Self = Self(1 << 6);
    pub const GUILD_VOICE_STATES: Self = Self(1 << 7);
    pub const GUILD_PRESENCES: Self = Self(1 << 8);
    pub const GUILD_MESSAGES: Self = Self(1 << 9);
    pub const GUILD_MESSAGE_REACTIONS: Self = Self(1 << 10);
    pub const GUILD_MESSAGE_TYPING: Self = Self(1 << 11);
    pub const DIRECT_MESSAGES: Self = Self(1 << 12);
    pub const DIRECT_MESSAGE_REACTIONS: Self = Self(1 << 13);
    pub const DIRECT_MESSAGE_TYPING: Self = Self(1 << 14);
    pub const MESSAGE_CONTENT: Self = Self(1 << 15);
    pub const GUILD_SCHEDULED_EVENTS: Self = Self(1 << 16);
    // Bits 17-19 are unassigned.
    pub const AUTO_MODERATION_CONFIGURATION: Self = Self(1 << 20);
    pub const AUTO_MODERATION_EXECUTION: Self = Self(1 << 21);
    // Bits 22-23 are unassigned.
    pub const GUILD_MESSAGE_POLLS: Self = Self(1 << 24);
    pub const DIRECT_MESSAGE_POLLS: Self = Self(1 << 25);

    /// Every guild-scoped intent.
    pub const GUILD: Self = Self::GUILDS
        .union(Self::GUILD_MEMBERS)
        .union(Self::GUILD_MODERATION)
        .union(Self::GUILD_EMOJIS_AND_STICKERS)
        .union(Self::GUILD_INTEGRATIONS)
        .union(Self::GUILD_WEBHOOKS)
        .union(Self::GUILD_INVITES)
        .union(Self::GUILD_VOICE_STATES)
        .union(Self::GUILD_PRESENCES)
        .union(Self::GUILD_MESSAGES)
        .union(Self::GUILD_MESSAGE_REACTIONS)
        .union(Self::GUILD_MESSAGE_TYPING)
        .union(Self::GUILD_SCHEDULED_EVENTS)
        .union(Self::GUILD_MESSAGE_POLLS);

    /// Every direct-message intent.
    pub const DIRECT_MESSAGE: Self = Self::DIRECT_MESSAGES
        .union(Self::DIRECT_MESSAGE_REACTIONS)
        .union(Self::DIRECT_MESSAGE_TYPING)
        .union(Self::DIRECT_MESSAGE_POLLS);

    pub const MESSAGE_POLLS: Self = Self::GUILD_MESSAGE_POLLS.union(Self::DIRECT_MESSAGE_POLLS);

    pub const MODERATION: Self = Self::GUILD_MODERATION
        .union(Self::AUTO_MODERATION_CONFIGURATION)
        .union(Self::AUTO_MODERATION_EXECUTION);

    /// Intents that need no approval in the developer portal.
    pub const NON_PRIVILEGED: Self = Self::GUILDS
        .union(Self::GUILD_MODERATION)
        .union(Self::GUILD_EMOJIS_AND_STICKERS)
        .union(Self::GUILD_INTEGRATIONS)
        .union(Self::GUILD_WEBHOOKS)
        .union(Self::GUILD_INVITES)
        .union(Self::GUILD_VOICE_STATES)
        .union(Self::GUILD_MESSAGES)
        .union(Self::GUILD_MESSAGE_REACTIONS)
        .union(Self::GUILD_MESSAGE_TYPING)
        .union(Self::DIRECT_MESSAGES)
        .union(Self::DIRECT_MESSAGE_REACTIONS)
        .union(Self::DIRECT_MESSAGE_TYPING)
        .union(Self::GUILD_SCHEDULED_EVENTS)
        .union(Self::AUTO_MODERATION_CONFIGURATION)
        .union(Self::AUTO_MODERATION_EXECUTION)
        .union(Self::GUILD_MESSAGE_POLLS)
        .union(Self::DIRECT_MESSAGE_POLLS);

    pub const PRIVILEGED: Self = Self::GUILD_MEMBERS
        .union(Self::GUILD_PRESENCES)
        .union(Self::MESSAGE_CONTENT);

    pub const ALL: Self = Self::NON_PRIVILEGED.union(Self::PRIVILEGED);

    pub const NONE: Self = Self(0);

    pub const DEFAULT: Self = Self::NONE;

    /// Build from a raw bitmask. Unknown bits are kept as-is.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if any privileged intent is requested.
    #[inline]
    pub const fn is_privileged(self) -> bool {
        self.0 & Self::PRIVILEGED.0 != 0
    }
}

impl BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Intents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Intents {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<u64> for Intents {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Intents({:#b})", self.0)
    }
}

impl FromStr for Intents {
    type Err = KanteleError;

    /// Parses a decimal bitmask, e.g. `"33280"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| KanteleError::Config(format!("invalid intents {:?}: {}", s, e)))
    }
}
