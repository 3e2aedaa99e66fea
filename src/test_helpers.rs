use crate::{
    advisory::{
        AdviceRequest,
        Oracle,
        Prophecy,
    },
    game::{
        Game,
        GameSettings,
        RoundReport,
    },
    ledger::Coins,
    outcome::ScriptedDraws,
    palette::{
        Champion,
        ColorCategory,
    },
    resolver::ElementalBalance,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use futures::{
    FutureExt,
    future::BoxFuture,
};
use std::{
    collections::HashMap,
    time::Duration,
};

/// A game already past the title and champion screens, idle and waiting for bets.
pub struct TestContext {
    game: Game,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_purse(100)
    }

    pub fn with_purse(purse: u64) -> Self {
        let mut game = Game::new(GameSettings {
            starting_purse: Coins::new(purse),
            ..GameSettings::default()
        });
        game.insert_coin().unwrap();
        game.select_champion(Champion::Ren).unwrap();
        Self { game }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn bet(&mut self, color: ColorCategory, amount: u64) {
        self.game.place_bet(color, Coins::new(amount)).unwrap();
    }

    /// Rolls and lands exactly `dice`.
    pub fn roll_with(&mut self, dice: [ColorCategory; 3]) -> RoundReport {
        self.game.roll().unwrap();
        let mut source = ScriptedDraws::new(dice);
        self.game.finish_roll(&mut source).unwrap().report
    }

    /// Rolls, lands `dice` and dismisses the result so the next bet can go in.
    pub fn play_round(&mut self, dice: [ColorCategory; 3]) -> RoundReport {
        let report = self.roll_with(dice);
        self.game.dismiss().unwrap();
        report
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub fn advice_request(seq: u64) -> AdviceRequest {
    AdviceRequest {
        seq,
        history: Vec::new(),
        boss_hp: 1000,
        elemental_balance: ElementalBalance::default(),
    }
}

#[derive(Clone, Debug)]
pub enum ScriptedAnswer {
    Prophecy(Prophecy),
    Fail(String),
    Panic,
}

/// Answers per request sequence number, optionally after a delay.
#[derive(Clone, Debug)]
pub struct ScriptedOracle {
    by_seq: HashMap<u64, (Duration, ScriptedAnswer)>,
    otherwise: ScriptedAnswer,
}

impl ScriptedOracle {
    pub fn always(answer: ScriptedAnswer) -> Self {
        Self {
            by_seq: HashMap::new(),
            otherwise: answer,
        }
    }

    pub fn on(mut self, seq: u64, delay: Duration, answer: ScriptedAnswer) -> Self {
        self.by_seq.insert(seq, (delay, answer));
        self
    }
}

impl Oracle for ScriptedOracle {
    fn prophesy<'a>(&'a self, request: &'a AdviceRequest) -> BoxFuture<'a, Result<Prophecy>> {
        let (delay, answer) = self
            .by_seq
            .get(&request.seq)
            .cloned()
            .unwrap_or((Duration::ZERO, self.otherwise.clone()));
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match answer {
                ScriptedAnswer::Prophecy(p) => Ok(p),
                ScriptedAnswer::Fail(msg) => Err(eyre!(msg)),
                ScriptedAnswer::Panic => panic!("scripted oracle panic"),
            }
        }
        .boxed()
    }
}

pub fn prophecy(message: &str, color: &str) -> Prophecy {
    Prophecy {
        message: Some(message.to_string()),
        rationale: None,
        recommended_color: Some(color.to_string()),
        danger_level: None,
    }
}
