//! Prompt batching: groups papers into fixed-size chunks and renders one prompt per chunk.
//!
//! Batch `i` covers input papers `[i*k, (i+1)*k)` of its fetch; the last batch of a fetch may
//! be short and is never padded. Batches never mix papers from different fetches.

pub mod batcher;
pub mod fields;


pub use batcher::{PromptBatch, PromptBatcher};
pub use fields::{FieldSet, FieldSpec, SCORE_KEY, TITLE_KEY, normalize_key};
