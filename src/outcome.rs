//! The three-dice draw.
//!
//! Randomness is injected through [`DrawSource`] so tests and seeded sessions
//! can replay exact rolls.

use crate::palette::ColorCategory;
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use std::fmt;

pub const DICE_PER_ROLL: usize = 3;

/// Something that can produce a single uniformly drawn color.
pub trait DrawSource {
    fn draw_color(&mut self) -> ColorCategory;
}

impl<T: DrawSource + ?Sized> DrawSource for &mut T {
    fn draw_color(&mut self) -> ColorCategory {
        (**self).draw_color()
    }
}

impl<T: DrawSource + ?Sized> DrawSource for Box<T> {
    fn draw_color(&mut self) -> ColorCategory {
        (**self).draw_color()
    }
}

#[derive(Debug)]
pub struct RngDraws<R> {
    rng: R,
}

impl<R: Rng> RngDraws<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngDraws<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> DrawSource for RngDraws<R> {
    fn draw_color(&mut self) -> ColorCategory {
        let idx = self.rng.random_range(0..ColorCategory::ALL.len());
        ColorCategory::ALL[idx]
    }
}

/// Replays a fixed list of colors, starting over when it runs out.
#[derive(Clone, Debug)]
pub struct ScriptedDraws {
    script: Vec<ColorCategory>,
    cursor: usize,
}

impl ScriptedDraws {
    pub fn new(script: impl IntoIterator<Item = ColorCategory>) -> Self {
        let script: Vec<ColorCategory> = script.into_iter().collect();
        assert!(!script.is_empty(), "scripted draws need at least one color");
        Self { script, cursor: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl DrawSource for ScriptedDraws {
    fn draw_color(&mut self) -> ColorCategory {
        let color = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        color
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Outcome([ColorCategory; DICE_PER_ROLL]);

impl Outcome {
    pub fn new(dice: [ColorCategory; DICE_PER_ROLL]) -> Self {
        Self(dice)
    }

    pub fn dice(&self) -> &[ColorCategory; DICE_PER_ROLL] {
        &self.0
    }

    pub fn matches(&self, color: ColorCategory) -> u64 {
        self.0.iter().filter(|d| **d == color).count() as u64
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "[{a} {b} {c}]")
    }
}

pub fn draw(source: &mut impl DrawSource) -> Outcome {
    Outcome([source.draw_color(), source.draw_color(), source.draw_color()])
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use ColorCategory::*;

    #[test]
    fn draw__takes_three_colors_in_order() {
        let mut source = ScriptedDraws::new([Red, Green, Red, Blue]);

        let outcome = draw(&mut source);

        assert_eq!(outcome.dice(), &[Red, Green, Red]);
        assert_eq!(source.consumed(), 3);
    }

    #[test]
    fn scripted_draws__cycle_when_exhausted() {
        let mut source = ScriptedDraws::new([Yellow, Blue]);

        let first = draw(&mut source);
        let second = draw(&mut source);

        assert_eq!(first.dice(), &[Yellow, Blue, Yellow]);
        assert_eq!(second.dice(), &[Blue, Yellow, Blue]);
    }

    #[test]
    fn seeded_draws__are_reproducible() {
        let mut a = RngDraws::seeded(7);
        let mut b = RngDraws::seeded(7);

        let left: Vec<Outcome> = (0..20).map(|_| draw(&mut a)).collect();
        let right: Vec<Outcome> = (0..20).map(|_| draw(&mut b)).collect();

        assert_eq!(left, right);
    }

    #[test]
    fn rng_draws__reach_every_color() {
        let mut source = RngDraws::seeded(42);
        let mut seen = [false; 4];
        for _ in 0..400 {
            seen[source.draw_color().index()] = true;
        }
        assert_eq!(seen, [true; 4]);
    }

    #[test]
    fn matches__counts_repeated_colors() {
        let outcome = Outcome::new([Blue, Blue, Blue]);
        assert_eq!(outcome.matches(Blue), 3);
        assert_eq!(outcome.matches(Red), 0);
    }
}
