//! Round resolution.
//!
//! [`resolve`] is a pure function of the ledger and the drawn outcome. It
//! reports what the round is worth; applying that to the session is the
//! game's job.

use crate::{
    ledger::{
        BetLedger,
        Coins,
    },
    outcome::Outcome,
    palette::{
        ColorCategory,
        Faction,
    },
};
use serde::{
    Deserialize,
    Serialize,
};

/// Matched dice per faction.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ElementalBalance {
    #[serde(rename = "Fire")]
    fire: u64,
    #[serde(rename = "Water")]
    water: u64,
    #[serde(rename = "Nature")]
    nature: u64,
    #[serde(rename = "Light")]
    light: u64,
}

impl ElementalBalance {
    pub fn get(&self, faction: Faction) -> u64 {
        match faction {
            Faction::Fire => self.fire,
            Faction::Water => self.water,
            Faction::Nature => self.nature,
            Faction::Light => self.light,
        }
    }

    pub fn add(&mut self, faction: Faction, count: u64) {
        let slot = match faction {
            Faction::Fire => &mut self.fire,
            Faction::Water => &mut self.water,
            Faction::Nature => &mut self.nature,
            Faction::Light => &mut self.light,
        };
        *slot = slot.saturating_add(count);
    }

    pub fn absorb(&mut self, deltas: &ElementalBalance) {
        for faction in Faction::ALL {
            self.add(faction, deltas.get(faction));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Faction, u64)> + '_ {
        Faction::ALL.into_iter().map(|f| (f, self.get(f)))
    }

    pub fn total(&self) -> u64 {
        self.iter().map(|(_, n)| n).sum()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    pub payout: Coins,
    pub damage: u64,
    pub elemental_deltas: ElementalBalance,
    /// Dice matched by each staked color, board order. Unstaked colors stay 0.
    pub matches_by_color: [u64; 4],
}

impl Resolution {
    pub fn is_win(&self) -> bool {
        !self.payout.is_zero()
    }

    pub fn matches_for(&self, color: ColorCategory) -> u64 {
        self.matches_by_color[color.index()]
    }

    pub fn total_matches(&self) -> u64 {
        self.matches_by_color.iter().sum()
    }
}

/// Stake back plus one stake per matching die; nothing when no die matches.
pub fn winnings(stake: Coins, matches: u64) -> Coins {
    if matches == 0 {
        Coins::ZERO
    } else {
        stake + stake.saturating_mul(matches)
    }
}

pub fn resolve(ledger: &BetLedger, outcome: &Outcome) -> Resolution {
    let mut payout = Coins::ZERO;
    let mut damage = 0u64;
    let mut elemental_deltas = ElementalBalance::default();
    let mut matches_by_color = [0u64; 4];

    for (color, stake) in ledger.entries() {
        let matches = outcome.matches(color);
        if matches == 0 {
            continue;
        }
        payout += winnings(stake, matches);
        elemental_deltas.add(color.faction(), matches);
        damage = damage.saturating_add(color.points().saturating_mul(matches));
        matches_by_color[color.index()] = matches;
    }

    Resolution {
        payout,
        damage,
        elemental_deltas,
        matches_by_color,
    }
}
