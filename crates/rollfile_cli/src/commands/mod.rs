//! CLI command implementations.

pub mod config;
pub mod pipe;
pub mod rotate;

use clap::ValueEnum;
use rollfile::RotationPeriod;

/// Rotation policy selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Never rotate.
    Never,
    /// Rotate at period boundaries.
    Time,
    /// Rotate past a size threshold.
    Size,
}

/// Rotation period selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    /// Every minute.
    Minutely,
    /// Every hour.
    Hourly,
    /// Every day at local midnight.
    Daily,
}

impl From<PeriodArg> for RotationPeriod {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::Minutely => Self::Minutely,
            PeriodArg::Hourly => Self::Hourly,
            PeriodArg::Daily => Self::Daily,
        }
    }
}
