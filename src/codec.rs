//! The wire format understood by the aggregation backend. A payload is one
//! flat JSON array:
//!
//! ```text
//! [N, s0 .. s(N-1), record0 .., record1 .., ...]
//! ```
//!
//! where `s0..s(N-1)` is the string table of the payload and every record is
//! `[T, k0, v0, .. k(T-1), v(T-1), op, value]` with keys and values given as
//! indices into that table. Each payload carries its own table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{ser::SerializeSeq, Serialize, Serializer};
use smallvec::SmallVec;

use crate::{error::Result, metrics::Op, Measurement};

pub(crate) const NAME_TAG: &str = "name";
pub(crate) const STATISTIC_TAG: &str = "statistic";

/// A measurement with its full, merged tag set, ready to be encoded.
#[derive(Debug, Clone)]
pub(crate) struct Record<'a> {
    tags: SmallVec<[(&'a str, &'a str); 16]>,
    op: Op,
    value: f64,
}

impl<'a> Record<'a> {
    /// Merge common tags, the meter's own tags and the `name`/`statistic`
    /// tags, later ones overriding earlier ones.
    pub(crate) fn new(common_tags: &'a BTreeMap<String, String>, m: &'a Measurement) -> Self {
        let mut tags: BTreeMap<&str, &str> = common_tags
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        tags.extend(m.id.tags().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        tags.insert(NAME_TAG, m.id.name());
        tags.insert(STATISTIC_TAG, m.statistic.label());
        Self {
            tags: tags.into_iter().collect(),
            op: m.statistic.op(),
            value: m.value,
        }
    }
}

struct EncodedRecord {
    tags: SmallVec<[(u32, u32); 16]>,
    op: Op,
    value: f64,
}

/// One self-contained payload.
pub(crate) struct Payload<'a> {
    strings: Vec<&'a str>,
    records: Vec<EncodedRecord>,
}

impl<'a> Payload<'a> {
    pub(crate) fn new(records: &[Record<'a>]) -> Self {
        let strings: Vec<&'a str> = records
            .iter()
            .flat_map(|r| r.tags.iter().flat_map(|(k, v)| [*k, *v]))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = |s: &str| -> u32 {
            // Every string was collected above, so the search always hits.
            strings.binary_search(&s).unwrap_or_default() as u32
        };
        let records = records
            .iter()
            .map(|r| EncodedRecord {
                tags: r.tags.iter().map(|&(k, v)| (index(k), index(v))).collect(),
                op: r.op,
                value: r.value,
            })
            .collect();
        Self { strings, records }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for Payload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1
            + self.strings.len()
            + self
                .records
                .iter()
                .map(|r| 3 + 2 * r.tags.len())
                .sum::<usize>();
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.strings.len())?;
        for s in &self.strings {
            seq.serialize_element(s)?;
        }
        for r in &self.records {
            seq.serialize_element(&r.tags.len())?;
            for (k, v) in &r.tags {
                seq.serialize_element(k)?;
                seq.serialize_element(v)?;
            }
            seq.serialize_element(&(r.op as u8))?;
            seq.serialize_element(&r.value)?;
        }
        seq.end()
    }
}

/// Split records into payloads of at most `batch_size` records each.
pub(crate) fn batches<'r, 'a>(
    records: &'r [Record<'a>],
    batch_size: usize,
) -> impl Iterator<Item = Payload<'a>> + 'r {
    records.chunks(batch_size.max(1)).map(Payload::new)
}
