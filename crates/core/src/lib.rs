//! Case generation and batch execution domain logic.
//!
//! Everything in this crate is free of global state: components return
//! reports and the caller decides what to log.

pub mod batch;
pub mod error;
pub mod instantiate;
pub mod naming;
pub mod params;
pub mod rules;
pub mod scripting;
pub mod substitution;
pub mod template;
