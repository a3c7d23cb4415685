//! Batch partitioner.
//!
//! Splits an ordered recipient list into consecutive batches of at most
//! `max_batch_size` recipients. The output covers every input recipient
//! exactly once, in input order; only the last batch may be short.
//!
//! Dust recipients keep their slot here. The submitter drops them from
//! the transfer set, so a batch can carry fewer instructions than members.

use fanout_types::Recipient;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// A capacity-bounded group of recipients submitted as one transfer set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Zero-based position in the run.
    pub index: usize,
    /// Members in input order.
    pub recipients: Vec<Recipient>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Number of batches `recipient_count` recipients occupy.
pub fn batch_count(recipient_count: usize, max_batch_size: usize) -> usize {
    if max_batch_size == 0 {
        return 0;
    }
    recipient_count.div_ceil(max_batch_size)
}

/// Partition `recipients` into batches of at most `max_batch_size`.
///
/// # Errors
///
/// - [`EngineError::InvalidInput`] if `max_batch_size` is zero
pub fn partition(recipients: Vec<Recipient>, max_batch_size: usize) -> Result<Vec<Batch>> {
    if max_batch_size == 0 {
        return Err(EngineError::InvalidInput(
            "max batch size must be at least 1".to_string(),
        ));
    }

    let mut batches = Vec::with_capacity(batch_count(recipients.len(), max_batch_size));
    let mut iter = recipients.into_iter().peekable();
    while iter.peek().is_some() {
        let members: Vec<Recipient> = iter.by_ref().take(max_batch_size).collect();
        batches.push(Batch {
            index: batches.len(),
            recipients: members,
        });
    }
    Ok(batches)
}
