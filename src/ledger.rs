use crate::palette::ColorCategory;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    ops::{
        Add,
        AddAssign,
    },
    str::FromStr,
};

/// A non-negative amount of coins.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Coins(u64);

impl Coins {
    pub const ZERO: Coins = Coins(0);

    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_sub(self, other: Coins) -> Option<Coins> {
        self.0.checked_sub(other.0).map(Coins)
    }

    pub fn saturating_mul(self, factor: u64) -> Coins {
        Coins(self.0.saturating_mul(factor))
    }
}

impl Add for Coins {
    type Output = Coins;

    fn add(self, rhs: Coins) -> Coins {
        Coins(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Coins {
    fn add_assign(&mut self, rhs: Coins) {
        *self = *self + rhs;
    }
}

impl From<u64> for Coins {
    fn from(amount: u64) -> Self {
        Coins(amount)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AmountError {
    Empty,
    Negative(String),
    NotANumber(String),
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => write!(f, "amount is empty"),
            AmountError::Negative(raw) => write!(f, "amount may not be negative: {raw}"),
            AmountError::NotANumber(raw) => write!(f, "amount is not a whole number: {raw}"),
        }
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Coins {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }
        if raw.starts_with('-') {
            return Err(AmountError::Negative(raw.to_string()));
        }
        raw.parse::<u64>()
            .map(Coins)
            .map_err(|_| AmountError::NotANumber(raw.to_string()))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StakeRejection {
    ZeroStake,
    InsufficientFunds { stake: Coins, purse: Coins },
}

/// Stakes for the round in progress, one slot per color.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BetLedger {
    stakes: [Coins; 4],
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `amount` out of `purse` and onto `color`.
    ///
    /// A stake equal to the whole purse is accepted and leaves it at zero.
    pub fn place(
        &mut self,
        color: ColorCategory,
        amount: Coins,
        purse: &mut Coins,
    ) -> Result<(), StakeRejection> {
        if amount.is_zero() {
            return Err(StakeRejection::ZeroStake);
        }
        let remaining = purse
            .checked_sub(amount)
            .ok_or(StakeRejection::InsufficientFunds {
                stake: amount,
                purse: *purse,
            })?;
        *purse = remaining;
        self.stakes[color.index()] += amount;
        Ok(())
    }

    pub fn stake(&self, color: ColorCategory) -> Coins {
        self.stakes[color.index()]
    }

    /// Colors holding a non-zero stake, in board order.
    pub fn entries(&self) -> impl Iterator<Item = (ColorCategory, Coins)> + '_ {
        ColorCategory::ALL
            .into_iter()
            .map(|color| (color, self.stake(color)))
            .filter(|(_, stake)| !stake.is_zero())
    }

    pub fn total(&self) -> Coins {
        self.stakes.iter().fold(Coins::ZERO, |acc, s| acc + *s)
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.iter().all(|s| s.is_zero())
    }

    pub fn clear(&mut self) {
        self.stakes = [Coins::ZERO; 4];
    }
}

impl FromIterator<(ColorCategory, Coins)> for BetLedger {
    fn from_iter<I: IntoIterator<Item = (ColorCategory, Coins)>>(iter: I) -> Self {
        let mut ledger = BetLedger::new();
        for (color, stake) in iter {
            ledger.stakes[color.index()] += stake;
        }
        ledger
    }
}
