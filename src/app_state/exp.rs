use core::convert::identity as id;
use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) struct Exp(pub(crate) u64);

/// Derived from [`Exp`], never stored on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) struct Level(pub(crate) u64);

/// How far a member is into their current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct LevelProgress {
    pub(crate) into_level: u64,
    pub(crate) level_span: u64,
}

impl Exp {
    pub(crate) fn to_i64(self) -> i64 {
        let Exp(exp) = self;
        #[allow(clippy::cast_possible_wrap)]
        let exp = id::<u64>(exp) as i64;
        exp
    }

    pub(crate) fn from_i64(exp: i64) -> Self {
        debug_assert!(exp >= 0);
        #[allow(clippy::cast_sign_loss)]
        let exp: u64 = id::<i64>(exp.max(0)) as u64;
        Exp(exp)
    }

    /// Adds `delta` unless the result would not fit into the `BIGINT` column.
    pub(crate) fn checked_add(self, Exp(delta): Exp) -> Option<Exp> {
        let Exp(exp) = self;
        exp.checked_add(delta)
            .filter(|sum| i64::try_from(*sum).is_ok())
            .map(Exp)
    }

    /// `floor(0.1 * sqrt(xp))`, computed on integers.
    pub(crate) fn level(self) -> Level {
        let Exp(exp) = self;
        Level(isqrt(exp) / 10)
    }

    pub(crate) fn progress(self) -> LevelProgress {
        let level = self.level();
        let Exp(floor) = level.min_exp();
        let Exp(ceil) = Level(level.0 + 1).min_exp();
        LevelProgress {
            into_level: self.0 - floor,
            level_span: ceil - floor,
        }
    }
}

impl Level {
    /// The smallest amount of exp that reaches this level.
    pub(crate) fn min_exp(self) -> Exp {
        let Level(level) = self;
        Exp(level.saturating_mul(level).saturating_mul(100))
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl LevelProgress {
    pub(crate) fn percent(self) -> u64 {
        if self.level_span == 0 {
            return 100;
        }
        self.into_level * 100 / self.level_span
    }
}

fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let mut root = (n as f64).sqrt() as u64;
    // the float estimate can be off by one in either direction for large n
    while u128::from(root) * u128::from(root) > u128::from(n) {
        root -= 1;
    }
    while u128::from(root + 1) * u128::from(root + 1) <= u128::from(n) {
        root += 1;
    }
    root
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RankTier {
    Accordian,
    Arcadia,
    Apex,
    Legendary,
}

impl RankTier {
    pub(crate) fn name(self) -> &'static str {
        match self {
            RankTier::Accordian => "Accordian",
            RankTier::Arcadia => "Arcadia",
            RankTier::Apex => "Apex",
            RankTier::Legendary => "Legendary",
        }
    }

    pub(crate) fn emoji(self) -> &'static str {
        match self {
            RankTier::Accordian => "🥉",
            RankTier::Arcadia => "🥈",
            RankTier::Apex => "🥇",
            RankTier::Legendary => "👑",
        }
    }

    /// CSS color of the tier badge on the rank card.
    pub(crate) fn color(self) -> &'static str {
        match self {
            RankTier::Accordian => "#d97706",
            RankTier::Arcadia => "#9ca3af",
            RankTier::Apex => "#eab308",
            RankTier::Legendary => "#f97316",
        }
    }
}

/// Everything the rank card shows of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct TierBadge {
    pub(crate) name: &'static str,
    pub(crate) emoji: &'static str,
    pub(crate) color: &'static str,
}

impl From<RankTier> for TierBadge {
    fn from(tier: RankTier) -> Self {
        Self {
            name: tier.name(),
            emoji: tier.emoji(),
            color: tier.color(),
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Minimum levels of the tiers above [`RankTier::Accordian`].
///
/// Must be strictly ascending, see [`crate::app_state::guild_cfg::GuildCfg::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TierCutoffs {
    pub(crate) arcadia: Level,
    pub(crate) apex: Level,
    pub(crate) legendary: Level,
}

impl Default for TierCutoffs {
    fn default() -> Self {
        Self {
            arcadia: Level(15),
            apex: Level(30),
            legendary: Level(50),
        }
    }
}

impl TierCutoffs {
    pub(crate) fn is_ascending(&self) -> bool {
        self.arcadia < self.apex && self.apex < self.legendary
    }

    pub(crate) fn tier(&self, level: Level) -> RankTier {
        if level >= self.legendary {
            RankTier::Legendary
        } else if level >= self.apex {
            RankTier::Apex
        } else if level >= self.arcadia {
            RankTier::Arcadia
        } else {
            RankTier::Accordian
        }
    }
}
