#![allow(non_snake_case)]
use color_game_royale::{
    Coins,
    ColorCategory::*,
    Game,
    GamePhase,
    Rejection,
    RoundPhase,
    test_helpers::TestContext,
};

#[test]
fn place_bet__adds_stake_to_ledger() {
    // given
    let mut ctx = TestContext::new();

    // when
    ctx.game_mut().place_bet(Green, Coins::new(5)).unwrap();

    // then
    let game = ctx.game();
    assert_eq!(game.ledger().stake(Green), Coins::new(5));
    assert_eq!(game.purse(), Coins::new(95));
    let entries: Vec<_> = game.ledger().entries().collect();
    assert_eq!(entries, vec![(Green, Coins::new(5))]);
}

#[test]
fn place_bet__accumulates_on_the_same_color() {
    // given
    let mut ctx = TestContext::new();
    ctx.bet(Yellow, 5);

    // when
    ctx.bet(Yellow, 5);
    ctx.bet(Blue, 10);

    // then
    let game = ctx.game();
    assert_eq!(game.ledger().stake(Yellow), Coins::new(10));
    assert_eq!(game.ledger().total(), Coins::new(20));
    assert_eq!(game.purse(), Coins::new(80));
}

#[test]
fn place_bet__can_stake_the_whole_purse() {
    // given
    let mut ctx = TestContext::with_purse(10);

    // when
    ctx.game_mut().place_bet(Blue, Coins::new(10)).unwrap();

    // then
    assert_eq!(ctx.game().purse(), Coins::ZERO);
}

#[test]
fn place_bet__fails_if_purse_too_small() {
    // given
    let mut ctx = TestContext::with_purse(10);
    ctx.bet(Red, 5);
    let before = ctx.game().view();

    // when
    let result = ctx.game_mut().place_bet(Red, Coins::new(6));

    // then
    assert_eq!(
        result,
        Err(Rejection::InsufficientFunds {
            stake: Coins::new(6),
            purse: Coins::new(5),
        })
    );
    assert_eq!(ctx.game().view(), before);
}

#[test]
fn place_bet__rejects_zero_stake() {
    // given
    let mut ctx = TestContext::new();

    // when
    let result = ctx.game_mut().place_bet(Red, Coins::ZERO);

    // then
    assert_eq!(result, Err(Rejection::ZeroStake));
    assert!(ctx.game().ledger().is_empty());
    assert_eq!(ctx.game().purse(), Coins::new(100));
}

#[test]
fn place_bet__rejected_while_dice_are_falling() {
    // given
    let mut ctx = TestContext::new();
    ctx.bet(Red, 5);
    ctx.game_mut().roll().unwrap();

    // when
    let result = ctx.game_mut().place_bet(Blue, Coins::new(5));

    // then
    assert_eq!(result, Err(Rejection::RollInProgress));
    assert_eq!(ctx.game().ledger().stake(Blue), Coins::ZERO);
    assert_eq!(ctx.game().purse(), Coins::new(95));
}

#[test]
fn place_bet__rejected_until_result_is_dismissed() {
    // given
    let mut ctx = TestContext::new();
    ctx.bet(Red, 5);
    ctx.roll_with([Green, Green, Blue]);

    // when
    let blocked = ctx.game_mut().place_bet(Red, Coins::new(5));
    ctx.game_mut().dismiss().unwrap();
    let accepted = ctx.game_mut().place_bet(Red, Coins::new(5));

    // then
    assert_eq!(blocked, Err(Rejection::ResultShowing));
    assert_eq!(accepted, Ok(()));
    assert_eq!(
        ctx.game().phase(),
        GamePhase::Playing(RoundPhase::Idle)
    );
}

#[test]
fn place_bet__rejected_before_a_champion_is_chosen() {
    // given
    let mut game = Game::default();

    // when
    let result = game.place_bet(Red, Coins::new(5));

    // then
    assert_eq!(result, Err(Rejection::WrongPhase(GamePhase::Title)));
    assert_eq!(game.purse(), Coins::new(100));
}
