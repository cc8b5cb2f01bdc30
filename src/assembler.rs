//! Record Assembler
//!
//! Sums classified amounts into the fixed six-field record. Absent
//! categories stay at 0.00; discarded amounts contribute nothing.

use crate::models::{ClassifiedAmount, TaxIncomeRecord};

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordAssembler;

impl RecordAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble<'a, I>(&self, amounts: I) -> TaxIncomeRecord
    where
        I: IntoIterator<Item = &'a ClassifiedAmount>,
    {
        amounts
            .into_iter()
            .filter_map(|item| item.category().map(|c| (c, item.amount.value)))
            .fold(TaxIncomeRecord::default(), |mut record, (category, value)| {
                record.add(category, value);
                record
            })
    }
}
