//! Post-parse filtering: title verification against the batch input, then the score cutoff.
//!
//! Both stages only remove records, so a run can never emit more papers than it was given.

pub mod hallucination;
pub mod threshold;


pub use hallucination::{FilterOutcome, filter};
pub use threshold::select;
