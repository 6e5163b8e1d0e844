//! Deterministic pulse clock
//!
//! Maps wall-clock instants (epoch milliseconds) to an exact, reversible
//! pulse coordinate: the pulse count since the genesis instant, the
//! beat/step position within the harmonic day, and the harmonic calendar
//! (42-day months, 8-month years, 7 cyclically named days).
//!
//! ## Determinism
//!
//! All conversions run on an integer micro-pulse scale (no floating
//! point), so equal inputs produce bit-identical moments and
//! [`epoch_ms_from_pulse`] inverts [`moment_from_epoch_ms`] within one
//! pulse duration. Division and remainder use Euclidean semantics
//! (non-negative remainder), so pre-genesis instants resolve to negative
//! pulse/year coordinates without any special-casing.
//!
//! ## Layout of a day
//!
//! 36 beats per day, 44 steps per beat, 11 pulses per step. Beats group
//! into 6 named arcs of 6 beats each.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Genesis instant in epoch milliseconds. Pulse 0 begins here.
pub const GENESIS_EPOCH_MS: i64 = 1_715_323_541_888;

/// Duration of one pulse in milliseconds (~5.236 s).
pub const PULSE_MS: i64 = 5_236;

/// Micro-pulses per pulse: the integer scale for exact ms conversion.
pub const MICRO_PULSES_PER_PULSE: i64 = 1_000_000;

/// Pulses per step.
pub const PULSES_PER_STEP: i64 = 11;

/// Steps per beat.
pub const STEPS_PER_BEAT: i64 = 44;

/// Beats per day.
pub const BEATS_PER_DAY: i64 = 36;

/// Pulses per day (36 beats x 44 steps x 11 pulses).
pub const PULSES_PER_DAY: i64 = BEATS_PER_DAY * STEPS_PER_BEAT * PULSES_PER_STEP;

/// Days per month.
pub const DAYS_PER_MONTH: i64 = 42;

/// Months per year.
pub const MONTHS_PER_YEAR: i64 = 8;

/// Days per year.
pub const DAYS_PER_YEAR: i64 = DAYS_PER_MONTH * MONTHS_PER_YEAR;

/// Beats per arc (6 arcs of 6 beats).
pub const BEATS_PER_ARC: i64 = 6;

/// The 7 cyclically assigned day names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChakraDay {
    Root,
    Sacral,
    SolarPlexus,
    Heart,
    Throat,
    ThirdEye,
    Crown,
}

impl ChakraDay {
    /// All days in cycle order, starting at the genesis day.
    pub const ALL: [ChakraDay; 7] = [
        ChakraDay::Root,
        ChakraDay::Sacral,
        ChakraDay::SolarPlexus,
        ChakraDay::Heart,
        ChakraDay::Throat,
        ChakraDay::ThirdEye,
        ChakraDay::Crown,
    ];

    /// Day name for a (possibly negative) day index since genesis.
    pub fn from_day_index(day_index: i64) -> Self {
        Self::ALL[day_index.rem_euclid(Self::ALL.len() as i64) as usize]
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ChakraDay::Root => "Root",
            ChakraDay::Sacral => "Sacral",
            ChakraDay::SolarPlexus => "Solar Plexus",
            ChakraDay::Heart => "Heart",
            ChakraDay::Throat => "Throat",
            ChakraDay::ThirdEye => "Third Eye",
            ChakraDay::Crown => "Crown",
        }
    }
}

impl fmt::Display for ChakraDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ChakraDay {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|d| d.label().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown chakra day: {}", s))
    }
}

/// The 6 named arcs of a day, each spanning 6 beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayArc {
    Ignition,
    Integration,
    Harmonization,
    Reflection,
    Purification,
    Dream,
}

impl DayArc {
    /// All arcs in day order.
    pub const ALL: [DayArc; 6] = [
        DayArc::Ignition,
        DayArc::Integration,
        DayArc::Harmonization,
        DayArc::Reflection,
        DayArc::Purification,
        DayArc::Dream,
    ];

    /// Arc containing the given beat (0-35).
    pub fn from_beat(beat: u8) -> Self {
        Self::ALL[(beat as i64 / BEATS_PER_ARC).rem_euclid(Self::ALL.len() as i64) as usize]
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DayArc::Ignition => "Ignition",
            DayArc::Integration => "Integration",
            DayArc::Harmonization => "Harmonization",
            DayArc::Reflection => "Reflection",
            DayArc::Purification => "Purification",
            DayArc::Dream => "Dream",
        }
    }
}

impl fmt::Display for DayArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One instant on the pulse clock.
///
/// Every field is a pure function of `pulse`; moments are computed on
/// demand and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    /// Pulses since genesis (negative before genesis).
    pub pulse: i64,
    /// Beat within the day, 0-35.
    pub beat: u8,
    /// Step within the beat, 0-43.
    pub step: u8,
    /// Cyclic day name.
    pub chakra_day: ChakraDay,
    /// Day within the month, 1-42.
    pub day_of_month: u8,
    /// Month within the year, 1-8.
    pub month: u8,
    /// Years since genesis, 0-based (negative before genesis).
    pub year: i64,
}

impl Moment {
    /// Arc containing this moment's beat.
    pub fn arc(&self) -> DayArc {
        DayArc::from_beat(self.beat)
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p{} beat {}:{:02} {} {}/{} y{}",
            self.pulse, self.beat, self.step, self.chakra_day, self.day_of_month, self.month, self.year
        )
    }
}

/// Compute the [`Moment`] for an epoch-millisecond instant.
///
/// Uses an i128 micro-pulse intermediate so the `ms * 1e6` product cannot
/// overflow, then Euclidean div/rem for every coordinate.
pub fn moment_from_epoch_ms(ms: i64) -> Moment {
    let delta_ms = ms as i128 - GENESIS_EPOCH_MS as i128;
    let micro = (delta_ms * MICRO_PULSES_PER_PULSE as i128).div_euclid(PULSE_MS as i128);

    let micro_per_day = PULSES_PER_DAY as i128 * MICRO_PULSES_PER_PULSE as i128;
    let pulse = micro.div_euclid(MICRO_PULSES_PER_PULSE as i128) as i64;
    let day_index = micro.div_euclid(micro_per_day) as i64;

    // Position within the day is always non-negative after rem_euclid.
    let pulse_in_day = (micro.rem_euclid(micro_per_day) / MICRO_PULSES_PER_PULSE as i128) as i64;
    let pulses_per_beat = STEPS_PER_BEAT * PULSES_PER_STEP;
    let beat = pulse_in_day / pulses_per_beat;
    let step = (pulse_in_day % pulses_per_beat) / PULSES_PER_STEP;

    let month_index = day_index.div_euclid(DAYS_PER_MONTH);
    let year = day_index.div_euclid(DAYS_PER_YEAR);

    Moment {
        pulse,
        beat: beat as u8,
        step: step as u8,
        chakra_day: ChakraDay::from_day_index(day_index),
        day_of_month: (day_index.rem_euclid(DAYS_PER_MONTH) + 1) as u8,
        month: (month_index.rem_euclid(MONTHS_PER_YEAR) + 1) as u8,
        year,
    }
}

/// Exact inverse of the pulse coordinate on the same integer scale.
///
/// Returns the epoch-millisecond instant at which the given pulse begins;
/// `epoch_ms_from_pulse(moment_from_epoch_ms(ms).pulse)` is within one
/// pulse duration of `ms`.
pub fn epoch_ms_from_pulse(pulse: i64) -> i64 {
    (GENESIS_EPOCH_MS as i128 + pulse as i128 * PULSE_MS as i128) as i64
}
