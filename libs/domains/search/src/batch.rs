//! Bounded batch accumulation.
//!
//! [`BatchAccumulator`] sits between a per-item producer (one embedding call
//! per record) and a per-group consumer (one upsert call per batch). Items are
//! appended one at a time; when the in-flight buffer reaches
//! `max_batch_size` it is detached and handed back to the caller as a
//! [`Batch`]. A short trailing batch is only ever produced by
//! [`BatchAccumulator::finalize`].
//!
//! ```
//! use domain_search::batch::{BatchAccumulator, FlushResult};
//!
//! let mut acc = BatchAccumulator::new(2).unwrap();
//! assert!(!acc.add("a").is_flushed());
//! let batch = acc.add("b").into_batch().unwrap();
//! assert_eq!(batch.as_slice(), &["a", "b"]);
//!
//! let _ = acc.add("c");
//! assert_eq!(acc.finalize().into_batch().unwrap().len(), 1);
//! assert!(matches!(acc.finalize(), FlushResult::Accumulating));
//! ```

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Invalid batch configuration: max batch size must be positive, got {max_batch_size}")]
    InvalidConfiguration { max_batch_size: usize },
}

/// An ordered, non-empty group of items detached from an accumulator.
///
/// Read-only once detached; it owns its items, so it can be moved to another
/// task for sending without further synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for batches produced by an accumulator.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Outcome of [`BatchAccumulator::add`] and [`BatchAccumulator::finalize`].
#[derive(Debug, PartialEq)]
#[must_use = "a flushed batch must be sent downstream or its items are lost"]
pub enum FlushResult<T> {
    /// The in-flight batch was detached and must be sent downstream.
    Flushed(Batch<T>),
    /// Nothing to send; the accumulator is still collecting.
    Accumulating,
}

impl<T> FlushResult<T> {
    pub fn is_flushed(&self) -> bool {
        matches!(self, FlushResult::Flushed(_))
    }

    pub fn into_batch(self) -> Option<Batch<T>> {
        match self {
            FlushResult::Flushed(batch) => Some(batch),
            FlushResult::Accumulating => None,
        }
    }
}

/// Collects items and emits them in groups of exactly `max_batch_size`.
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    buffer: Vec<T>,
    max_batch_size: usize,
}

impl<T> BatchAccumulator<T> {
    pub fn new(max_batch_size: usize) -> Result<Self, BatchError> {
        if max_batch_size == 0 {
            return Err(BatchError::InvalidConfiguration { max_batch_size });
        }

        Ok(Self {
            buffer: Vec::new(),
            max_batch_size,
        })
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Number of items currently in flight.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append an item, flushing when the batch reaches `max_batch_size`.
    ///
    /// The length check happens after the append, so an emitted batch is
    /// always exactly `max_batch_size` long.
    pub fn add(&mut self, item: T) -> FlushResult<T> {
        self.buffer.push(item);

        if self.buffer.len() == self.max_batch_size {
            FlushResult::Flushed(self.detach())
        } else {
            FlushResult::Accumulating
        }
    }

    /// Flush whatever is in flight. Calling it again on an empty
    /// accumulator returns [`FlushResult::Accumulating`].
    pub fn finalize(&mut self) -> FlushResult<T> {
        if self.buffer.is_empty() {
            FlushResult::Accumulating
        } else {
            FlushResult::Flushed(self.detach())
        }
    }

    fn detach(&mut self) -> Batch<T> {
        let items = std::mem::take(&mut self.buffer);
        Batch { items }
    }
}
