//! Shared test harness modules for the agrisite CLI.

use super::*;

mod helpers;
mod unit;
