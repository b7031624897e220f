//! Link quality analysis and capture-rate adaptation.
//!
//! Bit error rate is only measurable against a known transmission, so the
//! rate controller runs in the self-test loop rather than in the framed
//! receiver.

mod ber;
mod rate;
mod selftest;

pub use ber::{bit_error_rate, BerWindow};
pub use rate::{RateAdjustment, RateConfig, RateController};
pub use selftest::{SelfTest, SelfTestConfig, SelfTestRound};
