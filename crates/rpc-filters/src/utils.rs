use std::{iter::StepBy, ops::RangeInclusive};

macro_rules! await_handler {
    (@option $h:expr) => {
        match $h.await {
            Ok(Some(res)) => res,
            _ => return Err("task panicked or cancelled".to_string()),
        }
    };
}

pub(crate) use await_handler;

/// An iterator that yields _inclusive_ block ranges of a given step size
#[derive(Debug)]
pub(crate) struct BlockRangeInclusiveIter {
    iter: StepBy<RangeInclusive<u64>>,
    step: u64,
    end: u64,
}

impl BlockRangeInclusiveIter {
    pub(crate) fn new(range: RangeInclusive<u64>, step: u64) -> Self {
        Self { end: *range.end(), iter: range.step_by(step as usize + 1), step }
    }
}

impl Iterator for BlockRangeInclusiveIter {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.iter.next()?;
        let end = start.saturating_add(self.step).min(self.end);
        if start > end {
            return None;
        }
        Some((start, end))
    }
}
