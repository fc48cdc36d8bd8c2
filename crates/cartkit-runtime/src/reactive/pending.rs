#![forbid(unsafe_code)]

//! Per-source staleness mask for derived cells.

const WORD_BITS: usize = u64::BITS as usize;

/// One bit per source; a set bit means the source was invalidated and has
/// not delivered its new value yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PendingMask {
    words: Vec<u64>,
}

impl PendingMask {
    pub(crate) fn new(sources: usize) -> Self {
        Self {
            words: vec![0; sources.div_ceil(WORD_BITS).max(1)],
        }
    }

    pub(crate) fn mark(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word |= 1u64 << (index % WORD_BITS);
        }
    }

    pub(crate) fn clear(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word &= !(1u64 << (index % WORD_BITS));
        }
    }

    #[must_use]
    pub(crate) fn any(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }
}
