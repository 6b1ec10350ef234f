use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, RngExt, SeedableRng};

use super::{Dataset, Sample};
use crate::error::MaskpackError;

/// A view over `indices` of a shared dataset.
#[derive(Clone)]
pub struct Subset {
    dataset: Arc<dyn Dataset>,
    indices: Vec<usize>,
}

impl Subset {
    pub fn new(dataset: Arc<dyn Dataset>, indices: Vec<usize>) -> Self {
        Self { dataset, indices }
    }

    /// Indices into the parent dataset, in subset order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Dataset for Subset {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<Sample, MaskpackError> {
        let parent = *self
            .indices
            .get(index)
            .ok_or(MaskpackError::IndexOutOfRange {
                index,
                len: self.indices.len(),
            })?;
        self.dataset.get(parent)
    }
}

/// Permute `0..len` once and cut it into consecutive pieces of `lengths`.
///
/// The lengths must sum to `len`. `seed: None` draws the permutation from OS
/// entropy.
pub fn random_split(
    len: usize,
    lengths: &[usize],
    seed: Option<u64>,
) -> Result<Vec<Vec<usize>>, MaskpackError> {
    let total: usize = lengths.iter().sum();
    if total != len {
        return Err(MaskpackError::SplitMismatch {
            message: format!("split lengths {lengths:?} sum to {total}, dataset has {len} row(s)"),
        });
    }

    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::seed_from_u64(rand::rng().random::<u64>()),
    };
    order.shuffle(&mut rng);

    let mut pieces = Vec::with_capacity(lengths.len());
    let mut start = 0;
    for &length in lengths {
        pieces.push(order[start..start + length].to_vec());
        start += length;
    }
    Ok(pieces)
}

/// Split `dataset` into subsets of `lengths`.
pub fn split_dataset(
    dataset: Arc<dyn Dataset>,
    lengths: &[usize],
    seed: Option<u64>,
) -> Result<Vec<Subset>, MaskpackError> {
    Ok(random_split(dataset.len(), lengths, seed)?
        .into_iter()
        .map(|indices| Subset::new(Arc::clone(&dataset), indices))
        .collect())
}

/// `(train, test)` counts for the cropped dataset.
///
/// `test = floor(n / 5)` and `train = n - test`, which equals `ceil(4n / 5)`;
/// the two always cover all `n` rows.
pub fn cropped_split_lengths(n: usize) -> (usize, usize) {
    let test = n / 5;
    (n - test, test)
}
