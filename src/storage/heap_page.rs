//! The slotted page format. A page consists of a header bitmap with one bit
//! per tuple slot followed by the fixed-size slots themselves; the remaining
//! bytes are padding. With `n` slots of `tuple_size` bytes each, the header
//! occupies `ceil(n / 8)` bytes and `n` is the largest count for which header
//! and slots still fit: `n = (PAGE_SIZE * 8) / (tuple_size * 8 + 1)`.
//!
//! Bit `i` of header byte `j` (least significant bit first) marks slot
//! `j * 8 + i` as occupied. An empty slot carries unspecified bytes and is
//! zeroed on write.

use crate::common::{PageId, SlotId, PAGE_SIZE};
use crate::concurrency::TransactionId;
use crate::error::{DbError, Result};
use crate::tuple::schema::TupleDesc;
use crate::tuple::Tuple;

/// Number of tuple slots a page holds for the given schema.
pub fn slots_per_page(desc: &TupleDesc) -> usize {
    (PAGE_SIZE * 8) / (desc.size() * 8 + 1)
}

fn header_len(num_slots: usize) -> usize {
    (num_slots + 7) / 8
}

pub struct HeapPage {
    pid: PageId,
    desc: TupleDesc,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Parses a page from its on-disk representation. `bytes` must hold a
    /// full page. The parsed bytes become the page's before-image.
    pub fn parse(pid: PageId, desc: TupleDesc, bytes: &[u8]) -> Result<Self> {
        debug_assert_eq!(bytes.len(), PAGE_SIZE);
        let num_slots = slots_per_page(&desc);
        let header_len = header_len(num_slots);
        let header = bytes[..header_len].to_vec();
        let tuple_size = desc.size();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] >> (slot % 8) & 1 == 1 {
                let start = header_len + slot * tuple_size;
                let record_id = (pid, slot as SlotId);
                let tuple = Tuple::parse(&bytes[start..start + tuple_size], &desc, record_id)?;
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Ok(Self {
            pid,
            desc,
            header,
            tuples,
            dirtier: None,
            before_image: bytes.to_vec(),
        })
    }

    /// Serializes the page into exactly `PAGE_SIZE` bytes, empty slots and
    /// padding zero-filled.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; PAGE_SIZE];
        let header_len = self.header.len();
        bytes[..header_len].copy_from_slice(&self.header);

        let tuple_size = self.desc.size();
        for (slot, tuple) in self.tuples.iter().enumerate() {
            if let Some(tuple) = tuple {
                let start = header_len + slot * tuple_size;
                tuple.serialize(&mut bytes[start..start + tuple_size]);
            }
        }
        bytes
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.tuples.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.tuples.iter().filter(|slot| slot.is_none()).count()
    }

    /// The tuples of all occupied slots, in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    /// Stores the tuple in the lowest-index free slot and assigns its record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<()> {
        if tuple.desc() != &self.desc {
            return Err(DbError::SchemaMismatch(format!(
                "cannot insert tuple with schema ({}) into page with schema ({})",
                tuple.desc(),
                self.desc
            )));
        }
        let slot = self
            .tuples
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(DbError::PageFull)?;

        self.header[slot / 8] |= 1 << (slot % 8);
        tuple.set_record_id(Some((self.pid, slot as SlotId)));
        self.tuples[slot] = Some(tuple);
        Ok(())
    }

    /// Clears the slot the tuple was stored in.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let (pid, slot) = tuple
            .record_id()
            .ok_or_else(|| DbError::Invalid("cannot delete a tuple without a record id".to_owned()))?;
        if pid != self.pid {
            return Err(DbError::Invalid(format!(
                "tuple with record id ({:?}, {}) does not belong to page {:?}",
                pid, slot, self.pid
            )));
        }
        let slot = slot as usize;
        if slot >= self.tuples.len() || self.tuples[slot].is_none() {
            return Err(DbError::Invalid(format!(
                "slot {} of page {:?} is already empty",
                slot, self.pid
            )));
        }

        self.header[slot / 8] &= !(1 << (slot % 8));
        self.tuples[slot] = None;
        Ok(())
    }

    /// Records which transaction last modified the page, or clears the mark.
    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// The page's bytes as of the last clean baseline, used for logging and
    /// rollback.
    pub fn before_image(&self) -> &[u8] {
        &self.before_image
    }

    /// Snapshots the current bytes as the new clean baseline.
    pub fn set_before_image(&mut self) {
        self.before_image = self.serialize();
    }
}
