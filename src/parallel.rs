//! Batch processing of independent documents on the rayon pool.
//!
//! Each document gets its own [`SerializationContext`], so one failing input never
//! affects the others and results come back in input order.

use crate::archive::Archive;
use crate::context::SerializationContext;
use crate::error::Result;
use crate::format::Format;
use crate::options::SerializationOptions;
use crate::serialize::Serialize;
use rayon::prelude::*;

/// Outcome of one document of a batch: the result and the context it ran with.
#[derive(Debug)]
pub struct BatchItem<T> {
    /// The loaded value or the encoded bytes.
    pub result: Result<T>,
    /// Errors recorded while processing this document.
    pub context: SerializationContext,
}

impl<F: Format> Archive<F> {
    /// Loads every input into a fresh `T` in parallel.
    ///
    /// ```rust
    /// use bitscope::{JsonArchive, SerializationOptions};
    ///
    /// let inputs = ["[1, 2]", "[3]", "oops"];
    /// let loaded = JsonArchive::load_batch::<Vec<u8>, _>(&inputs, &SerializationOptions::default());
    /// assert_eq!(loaded[0].result.as_ref().ok(), Some(&vec![1, 2]));
    /// assert!(loaded[2].result.is_err());
    /// ```
    pub fn load_batch<T, I>(inputs: &[I], options: &SerializationOptions) -> Vec<BatchItem<T>>
    where
        T: Serialize + Default + Send,
        I: AsRef<[u8]> + Sync,
    {
        tracing::debug!(format = F::NAME, documents = inputs.len(), "loading batch");
        inputs
            .par_iter()
            .map(|input| {
                let mut context = SerializationContext::new(options.clone());
                let mut value = T::default();
                let result = Self::load_with(&mut value, input.as_ref(), &mut context).map(|()| value);
                BatchItem { result, context }
            })
            .collect()
    }

    /// Saves every value in parallel.
    pub fn save_batch<T>(values: &mut [T], options: &SerializationOptions) -> Vec<BatchItem<Vec<u8>>>
    where
        T: Serialize + Send,
    {
        tracing::debug!(format = F::NAME, documents = values.len(), "saving batch");
        values
            .par_iter_mut()
            .map(|value| {
                let mut context = SerializationContext::new(options.clone());
                let result = Self::save_with(value, &mut context);
                BatchItem { result, context }
            })
            .collect()
    }
}
