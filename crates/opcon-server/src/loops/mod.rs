//! Background loops for continuous processing.

pub mod reconcile_loop;
