use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use color_game_royale::{
    advisory::{
        AdvisoryWorker,
        Consultation,
        GeminiOracle,
        Oracle,
        OracleSlot,
        StaticOracle,
    },
    config::{
        AppConfig,
        OracleMode,
    },
    game::{
        Command,
        Effect,
        Game,
        GameView,
        Rejection,
        RoundReport,
    },
    ledger::Coins,
    outcome::RngDraws,
    palette::{
        Champion,
        ColorCategory,
    },
};
use rand::rngs::StdRng;
use std::{
    pin::Pin,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Sleep,
    },
};
use tracing::{
    debug,
    error,
    info,
};

const STAKE_STEP: u64 = 5;
const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub game: GameView,
    pub stake: Coins,
    pub coin_dropping: bool,
    pub oracle: Option<Consultation>,
    pub oracle_thinking: bool,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController {
    game: Game,
    draws: RngDraws<StdRng>,
    stake: Coins,
    oracle: OracleSlot,
    advisory: AdvisoryWorker,
    coin_dropping: bool,
    roll_delay: Duration,
    coin_delay: Duration,
    status: String,
    errors: Vec<String>,
}

fn build_oracle(mode: &OracleMode) -> Result<Arc<dyn Oracle>> {
    let oracle: Arc<dyn Oracle> = match mode {
        OracleMode::Offline => {
            info!("oracle offline, using the fallback prophecy");
            Arc::new(StaticOracle::default())
        }
        OracleMode::Remote {
            base_url,
            model,
            api_key,
        } => {
            let oracle = GeminiOracle::new(base_url.as_str(), model, api_key.as_str())
                .wrap_err("configuring the oracle client failed")?;
            info!(endpoint = oracle.endpoint(), "oracle online");
            Arc::new(oracle)
        }
    };
    Ok(oracle)
}

impl AppController {
    pub fn new(
        config: AppConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Consultation>)> {
        let oracle = build_oracle(&config.oracle)?;
        let (advisory, answers) = AdvisoryWorker::new(oracle);
        let draws = match config.seed {
            Some(seed) => {
                info!(seed, "dice seeded");
                RngDraws::seeded(seed)
            }
            None => RngDraws::from_os_rng(),
        };
        let controller = Self {
            game: Game::new(config.game),
            draws,
            stake: config.stake,
            oracle: OracleSlot::default(),
            advisory,
            coin_dropping: false,
            roll_delay: config.roll_delay,
            coin_delay: config.coin_delay,
            status: String::from("Insert a coin to begin"),
            errors: Vec::new(),
        };
        Ok((controller, answers))
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            game: self.game.view(),
            stake: self.stake,
            coin_dropping: self.coin_dropping,
            oracle: self.oracle.latest().cloned(),
            oracle_thinking: self.oracle.is_thinking(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Runs a command and carries out its effects. `None` when the game
    /// rejected it, otherwise whether a draw has to be scheduled.
    fn submit(&mut self, command: Command) -> Option<bool> {
        match self.game.handle(command) {
            Ok(effects) => Some(self.carry_out(effects)),
            Err(rejection) => {
                self.reject(command, rejection);
                None
            }
        }
    }

    fn carry_out(&mut self, effects: Vec<Effect>) -> bool {
        let mut schedule_draw = false;
        for effect in effects {
            match effect {
                Effect::ScheduleDraw => schedule_draw = true,
                Effect::RequestAdvice(request) => {
                    self.oracle.requested();
                    self.advisory.request(request);
                }
            }
        }
        schedule_draw
    }

    fn reject(&mut self, command: Command, rejection: Rejection) {
        debug!(?command, %rejection, "command rejected");
        self.set_status(capitalize(&rejection.to_string()));
    }

    /// Returns true when the coin was accepted and the drop has to be timed.
    pub fn insert_coin(&mut self) -> bool {
        match self.game.accept_coin() {
            Ok(()) => {
                self.coin_dropping = true;
                self.set_status("Coin dropping...");
                true
            }
            Err(rejection) => {
                self.reject(Command::InsertCoin, rejection);
                false
            }
        }
    }

    pub fn coin_landed(&mut self) {
        self.coin_dropping = false;
        match self.game.commit_coin() {
            Ok(()) => self.set_status("Choose your champion"),
            Err(rejection) => self.reject(Command::InsertCoin, rejection),
        }
    }

    pub fn select_champion(&mut self, champion: Champion) {
        if self.submit(Command::SelectChampion(champion)).is_some() {
            self.set_status(format!("{champion} enters the arena. Place your bets"));
        }
    }

    pub fn place_bet(&mut self, color: ColorCategory) {
        let amount = self.stake;
        if self.submit(Command::PlaceBet { color, amount }).is_some() {
            self.set_status(format!(
                "{} on {color} | purse {}",
                self.game.ledger().stake(color),
                self.game.purse()
            ));
        }
    }

    /// Returns true when the dice are falling and the draw has to be timed.
    pub fn roll(&mut self) -> bool {
        let scheduled = self.submit(Command::Roll) == Some(true);
        if scheduled {
            self.set_status("The dice are falling...");
        }
        scheduled
    }

    pub fn finish_roll(&mut self) {
        match self.game.finish_roll(&mut self.draws) {
            Ok(resolved) => {
                self.set_status(round_summary(&resolved.report));
                self.carry_out(resolved.effects);
            }
            Err(rejection) => {
                error!(%rejection, "draw fired outside a roll");
                self.push_errors(vec![format!("Draw failed: {rejection}")]);
            }
        }
    }

    pub fn dismiss(&mut self) {
        if self.submit(Command::Dismiss).is_some() {
            self.set_status("Place your bets");
        }
    }

    pub fn raise_stake(&mut self) {
        self.stake = Coins::new(self.stake.get().saturating_add(STAKE_STEP));
        self.set_status(format!("Stake {}", self.stake));
    }

    pub fn lower_stake(&mut self) {
        let lowered = self.stake.get().saturating_sub(STAKE_STEP).max(1);
        self.stake = Coins::new(lowered);
        self.set_status(format!("Stake {}", self.stake));
    }

    pub fn oracle_answered(&mut self, consultation: Consultation) {
        if consultation.fell_back {
            self.push_errors(vec![format!(
                "Oracle request #{} fell back to the default prophecy",
                consultation.seq
            )]);
        }
        self.oracle.received(consultation);
    }

    pub fn roll_delay(&self) -> Duration {
        self.roll_delay
    }

    pub fn coin_delay(&self) -> Duration {
        self.coin_delay
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn round_summary(report: &RoundReport) -> String {
    let resolution = &report.resolution;
    if resolution.is_win() {
        format!(
            "Rolled {} | +{} coins | {} damage to the Umbra",
            report.outcome, resolution.payout, resolution.damage
        )
    } else {
        format!("Rolled {} | no match, stakes lost", report.outcome)
    }
}

type Timer = Option<Pin<Box<Sleep>>>;

async fn fire(timer: &mut Timer) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (controller, answers) = AppController::new(config)?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, answers, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    if let Err(err) = &res {
        error!(?err, "app loop failed");
    }
    res
}

async fn run_loop(
    mut controller: AppController,
    mut answers: mpsc::UnboundedReceiver<Consultation>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let mut roll_timer: Timer = None;
    let mut coin_timer: Timer = None;
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = fire(&mut coin_timer) => {
                coin_timer = None;
                controller.coin_landed();
            }
            _ = fire(&mut roll_timer) => {
                roll_timer = None;
                controller.finish_roll();
            }
            Some(consultation) = answers.recv() => {
                controller.oracle_answered(consultation);
            }
            maybe_event = input_events.recv() => {
                let Some(event) = maybe_event else {
                    info!("input stream closed");
                    break;
                };
                match ui::on_input(ui_state, event?) {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::InsertCoin => {
                        if controller.insert_coin() {
                            coin_timer = Some(Box::pin(time::sleep(controller.coin_delay())));
                        }
                    }
                    ui::UserEvent::SelectChampion(champion) => controller.select_champion(champion),
                    ui::UserEvent::PlaceBet(color) => controller.place_bet(color),
                    ui::UserEvent::RaiseStake => controller.raise_stake(),
                    ui::UserEvent::LowerStake => controller.lower_stake(),
                    ui::UserEvent::Roll => {
                        if controller.roll() {
                            roll_timer = Some(Box::pin(time::sleep(controller.roll_delay())));
                        }
                    }
                    ui::UserEvent::Dismiss => controller.dismiss(),
                    ui::UserEvent::Redraw | ui::UserEvent::Ignored => {}
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}
