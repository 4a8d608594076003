//! # Algorithms Module
//!
//! Pure functions: lifecycle decisions and amount parsing.

pub mod amount;
pub mod lifecycle;

pub use amount::{
    format_ether, format_units, parse_duration_minutes, parse_ether, parse_positive_units,
    parse_units,
};
pub use lifecycle::{check_action, permitted_actions, permitted_in_phase, phase_of, time_left};
