//! Session state and the phase machine.
//!
//! A [`Game`] is the single owner of everything a session mutates. Every
//! command either changes it and hands back the [`Effect`]s the caller must
//! carry out, or is rejected and leaves it untouched.

use crate::{
    advisory::AdviceRequest,
    ledger::{
        BetLedger,
        Coins,
        StakeRejection,
    },
    outcome::{
        self,
        DrawSource,
        Outcome,
    },
    palette::{
        Champion,
        ColorCategory,
    },
    resolver::{
        self,
        ElementalBalance,
        Resolution,
    },
};
use std::fmt;
use tracing::info;

pub const STARTING_PURSE: Coins = Coins::new(100);
pub const BOSS_MAX_HP: u64 = 1000;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoundPhase {
    Idle,
    Rolling,
    ResultShown,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GamePhase {
    Title,
    ChampionSelect,
    Playing(RoundPhase),
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Title => "title",
            GamePhase::ChampionSelect => "champion-select",
            GamePhase::Playing(RoundPhase::Idle) => "playing/idle",
            GamePhase::Playing(RoundPhase::Rolling) => "playing/rolling",
            GamePhase::Playing(RoundPhase::ResultShown) => "playing/result-shown",
        };
        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    InsertCoin,
    SelectChampion(Champion),
    PlaceBet { color: ColorCategory, amount: Coins },
    Roll,
    Dismiss,
}

/// Why a command had no effect.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rejection {
    WrongPhase(GamePhase),
    CoinAlreadyInserted,
    NoCoinInserted,
    RollInProgress,
    ResultShowing,
    EmptyLedger,
    ZeroStake,
    InsufficientFunds { stake: Coins, purse: Coins },
}

impl From<StakeRejection> for Rejection {
    fn from(value: StakeRejection) -> Self {
        match value {
            StakeRejection::ZeroStake => Rejection::ZeroStake,
            StakeRejection::InsufficientFunds { stake, purse } => {
                Rejection::InsufficientFunds { stake, purse }
            }
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongPhase(phase) => write!(f, "not available during {phase}"),
            Rejection::CoinAlreadyInserted => write!(f, "coin already inserted"),
            Rejection::NoCoinInserted => write!(f, "insert a coin first"),
            Rejection::RollInProgress => write!(f, "the dice are still falling"),
            Rejection::ResultShowing => write!(f, "dismiss the result first"),
            Rejection::EmptyLedger => write!(f, "place a bet before rolling"),
            Rejection::ZeroStake => write!(f, "stake must be at least 1 coin"),
            Rejection::InsufficientFunds { stake, purse } => {
                write!(f, "cannot stake {stake} with {purse} coins left")
            }
        }
    }
}

/// Work the caller owes the game after a command succeeds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    /// Call [`Game::finish_roll`] once the drop delay has passed.
    ScheduleDraw,
    /// Consult the oracle without blocking the game.
    RequestAdvice(AdviceRequest),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BossState {
    hp: u64,
    max_hp: u64,
}

impl BossState {
    pub fn new(max_hp: u64) -> Self {
        Self { hp: max_hp, max_hp }
    }

    pub fn hp(&self) -> u64 {
        self.hp
    }

    pub fn max_hp(&self) -> u64 {
        self.max_hp
    }

    pub fn take_damage(&mut self, damage: u64) {
        self.hp = self.hp.saturating_sub(damage);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GameSettings {
    pub starting_purse: Coins,
    pub boss_max_hp: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            starting_purse: STARTING_PURSE,
            boss_max_hp: BOSS_MAX_HP,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundReport {
    pub round: u64,
    pub outcome: Outcome,
    pub staked: BetLedger,
    pub resolution: Resolution,
    pub streak: u32,
    pub boss_hp: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolved {
    pub report: RoundReport,
    pub effects: Vec<Effect>,
}

/// Read model handed to the presentation layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameView {
    pub phase: GamePhase,
    pub coin_inserted: bool,
    pub champion: Option<Champion>,
    pub purse: Coins,
    pub score: Coins,
    pub boss_hp: u64,
    pub boss_max_hp: u64,
    pub elemental_balance: ElementalBalance,
    pub active_bets: BetLedger,
    pub history: Vec<ColorCategory>,
    pub last_outcome: Option<Outcome>,
    pub last_round: Option<RoundReport>,
    pub is_rolling: bool,
    pub streak_count: u32,
}

#[derive(Clone, Debug)]
pub struct Game {
    phase: GamePhase,
    coin_inserted: bool,
    champion: Option<Champion>,
    purse: Coins,
    score: Coins,
    boss: BossState,
    elemental_balance: ElementalBalance,
    ledger: BetLedger,
    history: Vec<ColorCategory>,
    last_round: Option<RoundReport>,
    streak: u32,
    rounds: u64,
    advice_seq: u64,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

impl Game {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            phase: GamePhase::Title,
            coin_inserted: false,
            champion: None,
            purse: settings.starting_purse,
            score: Coins::ZERO,
            boss: BossState::new(settings.boss_max_hp),
            elemental_balance: ElementalBalance::default(),
            ledger: BetLedger::new(),
            history: Vec::new(),
            last_round: None,
            streak: 0,
            rounds: 0,
            advice_seq: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn purse(&self) -> Coins {
        self.purse
    }

    pub fn score(&self) -> Coins {
        self.score
    }

    pub fn boss(&self) -> BossState {
        self.boss
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    pub fn history(&self) -> &[ColorCategory] {
        &self.history
    }

    pub fn elemental_balance(&self) -> ElementalBalance {
        self.elemental_balance
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn champion(&self) -> Option<Champion> {
        self.champion
    }

    pub fn is_rolling(&self) -> bool {
        self.phase == GamePhase::Playing(RoundPhase::Rolling)
    }

    pub fn view(&self) -> GameView {
        GameView {
            phase: self.phase,
            coin_inserted: self.coin_inserted,
            champion: self.champion,
            purse: self.purse,
            score: self.score,
            boss_hp: self.boss.hp(),
            boss_max_hp: self.boss.max_hp(),
            elemental_balance: self.elemental_balance,
            active_bets: self.ledger.clone(),
            history: self.history.clone(),
            last_outcome: self.last_round.as_ref().map(|r| r.outcome),
            last_round: self.last_round.clone(),
            is_rolling: self.is_rolling(),
            streak_count: self.streak,
        }
    }

    pub fn handle(&mut self, command: Command) -> Result<Vec<Effect>, Rejection> {
        match command {
            Command::InsertCoin => self.insert_coin().map(|_| Vec::new()),
            Command::SelectChampion(champion) => self.select_champion(champion),
            Command::PlaceBet { color, amount } => {
                self.place_bet(color, amount).map(|_| Vec::new())
            }
            Command::Roll => self.roll(),
            Command::Dismiss => self.dismiss().map(|_| Vec::new()),
        }
    }

    /// Accepts a coin and moves straight to champion select.
    pub fn insert_coin(&mut self) -> Result<(), Rejection> {
        self.accept_coin()?;
        self.commit_coin()
    }

    /// First half of [`Game::insert_coin`] for callers that show the coin
    /// dropping before the screen changes.
    pub fn accept_coin(&mut self) -> Result<(), Rejection> {
        if self.phase != GamePhase::Title {
            return Err(Rejection::WrongPhase(self.phase));
        }
        if self.coin_inserted {
            return Err(Rejection::CoinAlreadyInserted);
        }
        self.coin_inserted = true;
        info!("coin inserted");
        Ok(())
    }

    pub fn commit_coin(&mut self) -> Result<(), Rejection> {
        if self.phase != GamePhase::Title {
            return Err(Rejection::WrongPhase(self.phase));
        }
        if !self.coin_inserted {
            return Err(Rejection::NoCoinInserted);
        }
        self.enter(GamePhase::ChampionSelect);
        Ok(())
    }

    pub fn select_champion(&mut self, champion: Champion) -> Result<Vec<Effect>, Rejection> {
        if self.phase != GamePhase::ChampionSelect {
            return Err(Rejection::WrongPhase(self.phase));
        }
        self.champion = Some(champion);
        info!(%champion, "champion selected");
        self.enter(GamePhase::Playing(RoundPhase::Idle));
        Ok(vec![Effect::RequestAdvice(self.advice_request())])
    }

    pub fn place_bet(&mut self, color: ColorCategory, amount: Coins) -> Result<(), Rejection> {
        match self.phase {
            GamePhase::Playing(RoundPhase::Idle) => {}
            GamePhase::Playing(RoundPhase::Rolling) => return Err(Rejection::RollInProgress),
            GamePhase::Playing(RoundPhase::ResultShown) => {
                return Err(Rejection::ResultShowing);
            }
            other => return Err(Rejection::WrongPhase(other)),
        }
        self.ledger.place(color, amount, &mut self.purse)?;
        info!(%color, %amount, purse = %self.purse, "bet placed");
        Ok(())
    }

    pub fn roll(&mut self) -> Result<Vec<Effect>, Rejection> {
        match self.phase {
            GamePhase::Playing(RoundPhase::Idle) => {}
            GamePhase::Playing(RoundPhase::Rolling) => return Err(Rejection::RollInProgress),
            GamePhase::Playing(RoundPhase::ResultShown) => {
                return Err(Rejection::ResultShowing);
            }
            other => return Err(Rejection::WrongPhase(other)),
        }
        if self.ledger.is_empty() {
            return Err(Rejection::EmptyLedger);
        }
        self.enter(GamePhase::Playing(RoundPhase::Rolling));
        Ok(vec![Effect::ScheduleDraw])
    }

    /// Draws the dice for the roll in flight and settles the round.
    pub fn finish_roll(&mut self, source: &mut impl DrawSource) -> Result<Resolved, Rejection> {
        if !self.is_rolling() {
            return Err(Rejection::WrongPhase(self.phase));
        }
        let drawn = outcome::draw(source);
        let report = self.settle(drawn);
        self.enter(GamePhase::Playing(RoundPhase::ResultShown));
        Ok(Resolved {
            report,
            effects: vec![Effect::RequestAdvice(self.advice_request())],
        })
    }

    pub fn dismiss(&mut self) -> Result<(), Rejection> {
        if self.phase != GamePhase::Playing(RoundPhase::ResultShown) {
            return Err(Rejection::WrongPhase(self.phase));
        }
        self.enter(GamePhase::Playing(RoundPhase::Idle));
        Ok(())
    }

    fn settle(&mut self, drawn: Outcome) -> RoundReport {
        let resolution = resolver::resolve(&self.ledger, &drawn);

        self.score += resolution.payout;
        self.purse += resolution.payout;
        self.boss.take_damage(resolution.damage);
        self.elemental_balance.absorb(&resolution.elemental_deltas);
        self.history.extend_from_slice(drawn.dice());
        self.streak = if resolution.is_win() {
            self.streak.saturating_add(1)
        } else {
            0
        };
        self.rounds += 1;
        let staked = std::mem::take(&mut self.ledger);

        info!(
            round = self.rounds,
            outcome = %drawn,
            payout = %resolution.payout,
            damage = resolution.damage,
            boss_hp = self.boss.hp(),
            streak = self.streak,
            "round resolved"
        );

        let report = RoundReport {
            round: self.rounds,
            outcome: drawn,
            staked,
            resolution,
            streak: self.streak,
            boss_hp: self.boss.hp(),
        };
        self.last_round = Some(report.clone());
        report
    }

    fn advice_request(&mut self) -> AdviceRequest {
        self.advice_seq += 1;
        AdviceRequest {
            seq: self.advice_seq,
            history: self.history.clone(),
            boss_hp: self.boss.hp(),
            elemental_balance: self.elemental_balance,
        }
    }

    fn enter(&mut self, next: GamePhase) {
        info!(from = %self.phase, to = %next, "phase change");
        self.phase = next;
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ScriptedDraws;
    use ColorCategory::*;

    fn playing() -> Game {
        let mut game = Game::default();
        game.insert_coin().unwrap();
        game.select_champion(Champion::Rei).unwrap();
        game
    }

    #[test]
    fn accept_coin__keeps_title_until_commit() {
        let mut game = Game::default();

        game.accept_coin().unwrap();

        assert_eq!(game.phase(), GamePhase::Title);
        assert!(game.view().coin_inserted);
        assert_eq!(game.accept_coin(), Err(Rejection::CoinAlreadyInserted));

        game.commit_coin().unwrap();
        assert_eq!(game.phase(), GamePhase::ChampionSelect);
    }

    #[test]
    fn commit_coin__requires_a_coin() {
        let mut game = Game::default();
        assert_eq!(game.commit_coin(), Err(Rejection::NoCoinInserted));
    }

    #[test]
    fn finish_roll__outside_rolling_is_rejected() {
        let mut game = playing();
        let mut source = ScriptedDraws::new([Red]);

        let result = game.finish_roll(&mut source);

        assert_eq!(
            result,
            Err(Rejection::WrongPhase(GamePhase::Playing(RoundPhase::Idle)))
        );
        assert_eq!(source.consumed(), 0);
    }

    #[test]
    fn advice_requests__carry_increasing_sequence_numbers() {
        let mut game = Game::default();
        game.insert_coin().unwrap();
        let first = game.select_champion(Champion::Ren).unwrap();
        game.place_bet(Red, Coins::new(5)).unwrap();
        game.roll().unwrap();
        let second = game
            .finish_roll(&mut ScriptedDraws::new([Red]))
            .unwrap()
            .effects;

        let seqs: Vec<u64> = first
            .iter()
            .chain(second.iter())
            .filter_map(|e| match e {
                Effect::RequestAdvice(req) => Some(req.seq),
                Effect::ScheduleDraw => None,
            })
            .collect();
        assert_eq!(seqs, vec![1, 2]);
    }
}
