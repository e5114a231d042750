use wareflow_core::ExpectedVersion;

use super::record::{Record, RecordKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or replace.
    Put(Record),
    Delete(RecordKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub op: WriteOp,
    pub expected: ExpectedVersion,
}

impl Write {
    pub fn key(&self) -> RecordKey {
        match &self.op {
            WriteOp::Put(record) => record.key(),
            WriteOp::Delete(key) => *key,
        }
    }
}

/// A set of writes applied all together or not at all.
///
/// Each write names the row version it was computed from; a single mismatch
/// rejects the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: impl Into<Record>) -> &mut Self {
        self.put(record, ExpectedVersion::Absent)
    }

    /// Replace a record read at row `version`.
    pub fn update(&mut self, record: impl Into<Record>, version: u64) -> &mut Self {
        self.put(record, ExpectedVersion::Exact(version))
    }

    pub fn put(&mut self, record: impl Into<Record>, expected: ExpectedVersion) -> &mut Self {
        self.writes.push(Write {
            op: WriteOp::Put(record.into()),
            expected,
        });
        self
    }

    pub fn delete(&mut self, key: RecordKey, version: u64) -> &mut Self {
        self.writes.push(Write {
            op: WriteOp::Delete(key),
            expected: ExpectedVersion::Exact(version),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = RecordKey> + '_ {
        self.writes.iter().map(Write::key)
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}
