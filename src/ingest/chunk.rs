use std::io::Read;

use csv::{StringRecord, StringRecordsIntoIter};

/// Pulls raw CSV records in groups of up to `chunk_size`, so the whole file
/// is never resident at once. Lazy and non-restartable: each batch is read
/// from the underlying cursor exactly once, in file order.
pub struct Batches<R: Read> {
    records: StringRecordsIntoIter<R>,
    chunk_size: usize,
}

impl<R: Read> Batches<R> {
    /// `chunk_size` of zero is treated as 1 so the memory bound always
    /// holds.
    pub fn new(records: StringRecordsIntoIter<R>, chunk_size: usize) -> Self {
        Self {
            records,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Next batch of up to `chunk_size` records, `None` once the source is
    /// exhausted. The last batch may be shorter.
    pub fn next_batch(&mut self) -> Result<Option<Vec<StringRecord>>, csv::Error> {
        let mut batch = Vec::with_capacity(self.chunk_size);
        for result in self.records.by_ref() {
            batch.push(result?);
            if batch.len() == self.chunk_size {
                break;
            }
        }
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}
