//! Adaptive median attack.
//!
//! Each round the attacker observes a fresh tail contribution for every
//! tracked column and compares the column medians of the two marked keys. It
//! keeps the round with the sign that favours key 0 over key 1, and discards
//! rounds where the two medians tie. Because the kept rounds are selected on
//! their own medians, the accumulated medians drift apart faster than pure
//! noise would; the attack stops once the normalized drift of the marked keys
//! reaches the target bias-to-noise ratio.

use crate::{
    config::AttackConfig,
    error::{AttackError, ConfigError},
    noise::TailModel,
    table::CounterTable,
};
use rand::Rng;
use std::cmp::Ordering;
use tracing::{debug, trace};

/// Lifecycle of one attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackPhase {
    Running,
    Stopped,
}

/// Final state of a finished attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackOutcome {
    /// Round index at stop. The index starts at 1 and is advanced after every
    /// executed round, so this is one more than the rounds executed.
    pub win_round: u64,
    /// Rounds added to or subtracted from the accumulator.
    pub collected_rounds: u64,
    pub key_0_bias: f64,
    pub key_1_bias: f64,
}

impl AttackOutcome {
    /// Query rounds actually executed.
    pub fn rounds_executed(&self) -> u64 {
        self.win_round - 1
    }
}

/// Running state of one median attack.
#[derive(Clone, Debug)]
pub struct MedianAttack<'a> {
    config: &'a AttackConfig,
    tail: &'a TailModel,
    accumulator: CounterTable<f64>,
    round: CounterTable<f64>,
    collected: u64,
    key_0_bias: f64,
    key_1_bias: f64,
    win_round: u64,
    phase: AttackPhase,
}

impl<'a> MedianAttack<'a> {
    /// Start an attack against a sketch of `depth` lines.
    pub fn new(
        config: &'a AttackConfig,
        tail: &'a TailModel,
        depth: usize,
    ) -> Result<Self, AttackError> {
        config.validate()?;
        if depth == 0 {
            return Err(ConfigError::ZeroDepth.into());
        }
        Ok(Self {
            config,
            tail,
            accumulator: CounterTable::zeros(depth, config.columns),
            round: CounterTable::zeros(depth, config.columns),
            collected: 0,
            key_0_bias: 0.0,
            key_1_bias: 0.0,
            win_round: 1,
            phase: AttackPhase::Running,
        })
    }

    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    pub fn rounds_executed(&self) -> u64 {
        self.win_round - 1
    }

    pub fn accumulator(&self) -> &CounterTable<f64> {
        &self.accumulator
    }

    /// Query one round and update the bias estimates.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> AttackPhase {
        if self.phase == AttackPhase::Stopped {
            return self.phase;
        }

        self.tail.sample_into(&mut self.round, rng);
        let median_0 = self.round.column_median(0);
        let median_1 = self.round.column_median(1);
        match median_0.partial_cmp(&median_1) {
            Some(Ordering::Greater) => {
                self.accumulator.accumulate(&self.round);
                self.collected += 1;
            }
            Some(Ordering::Less) => {
                self.accumulator.deduct(&self.round);
                self.collected += 1;
            }
            _ => {}
        }

        let factor = if self.collected > 0 {
            (self.collected as f64 * self.tail.tail_size() as f64 / self.tail.width() as f64)
                .sqrt()
        } else {
            1.0
        };
        self.key_0_bias = self.accumulator.column_median(0) / factor;
        self.key_1_bias = self.accumulator.column_median(1) / factor;
        trace!(
            round = self.win_round,
            collected = self.collected,
            key_0_bias = self.key_0_bias,
            key_1_bias = self.key_1_bias,
            "attack round"
        );

        self.win_round += 1;
        if self
            .config
            .stop_rule
            .is_satisfied(self.key_0_bias, self.key_1_bias, self.config.target_bnr)
        {
            self.phase = AttackPhase::Stopped;
        }
        self.phase
    }

    pub fn outcome(&self) -> AttackOutcome {
        AttackOutcome {
            win_round: self.win_round,
            collected_rounds: self.collected,
            key_0_bias: self.key_0_bias,
            key_1_bias: self.key_1_bias,
        }
    }
}

/// Run one attack until its stop rule is met or its round bound is exhausted.
pub fn simulate_median_attack<R: Rng + ?Sized>(
    config: &AttackConfig,
    tail: &TailModel,
    depth: usize,
    rng: &mut R,
) -> Result<AttackOutcome, AttackError> {
    let mut attack = MedianAttack::new(config, tail, depth)?;
    while attack.phase() == AttackPhase::Running {
        if let Some(max_rounds) = config.max_rounds {
            if attack.rounds_executed() >= max_rounds {
                let outcome = attack.outcome();
                return Err(AttackError::NonConvergence {
                    rounds: max_rounds,
                    key_0_bias: outcome.key_0_bias,
                    key_1_bias: outcome.key_1_bias,
                });
            }
        }
        attack.step(rng);
    }

    let outcome = attack.outcome();
    debug!(
        "For l = {}, BNR = {}, attack wins after {} rounds. Bias: key 0 = {:.4}, key 1 = {:.4}.",
        depth, config.target_bnr, outcome.win_round, outcome.key_0_bias, outcome.key_1_bias
    );
    Ok(outcome)
}
