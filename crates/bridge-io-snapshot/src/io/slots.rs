use crate::io::state::codec::{Decoder, Encoder};
use crate::io::state::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};
use std::collections::BTreeMap;

/// One occupied slot inside a [`SlotsSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    /// Stable card name used to match the blob against whatever card occupies the slot on
    /// restore.
    pub card_name: String,
    /// Card-level snapshot version, handed back to the card's loader.
    pub card_version: u32,
    pub state: Vec<u8>,
}

/// Canonical slot table snapshot wrapper (`SLOT`).
///
/// Nests one card blob per occupied slot. The TLV tag is the slot index, so empty slots simply
/// have no field. Restore code is expected to skip entries for slots that are empty (or hold a
/// different card) on the target machine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SlotsSnapshot {
    slots: BTreeMap<u16, SlotEntry>,
}

impl SlotsSnapshot {
    /// Keeps decoding bounded when the blob comes from an untrusted file.
    const MAX_CARD_NAME_LEN: usize = 64;
    const MAX_CARD_SNAPSHOT_LEN: usize = 16 * 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: u16, entry: SlotEntry) -> Option<SlotEntry> {
        self.slots.insert(slot, entry)
    }

    pub fn get(&self, slot: u16) -> Option<&SlotEntry> {
        self.slots.get(&slot)
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, u16, SlotEntry> {
        self.slots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    fn decode_entry(field: &[u8]) -> SnapshotResult<SlotEntry> {
        let mut d = Decoder::new(field);

        let name = d.vec_u8()?;
        if name.len() > Self::MAX_CARD_NAME_LEN {
            return Err(SnapshotError::InvalidFieldEncoding("slot card name too long"));
        }
        let card_name = String::from_utf8(name)
            .map_err(|_| SnapshotError::InvalidFieldEncoding("slot card name utf-8"))?;
        let card_version = d.u32()?;
        let state = d.vec_u8()?;
        if state.len() > Self::MAX_CARD_SNAPSHOT_LEN {
            return Err(SnapshotError::InvalidFieldEncoding("slot card snapshot too large"));
        }
        d.finish()?;

        Ok(SlotEntry {
            card_name,
            card_version,
            state,
        })
    }
}

impl IoSnapshot for SlotsSnapshot {
    const DEVICE_ID: [u8; 4] = *b"SLOT";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        for (&slot, entry) in &self.slots {
            let field = Encoder::new()
                .vec_u8(entry.card_name.as_bytes())
                .u32(entry.card_version)
                .vec_u8(&entry.state)
                .finish();
            w.field_bytes(slot, field);
        }
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        self.slots.clear();

        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;

        let mut slots = BTreeMap::new();
        for (slot, field) in r.iter_fields() {
            slots.insert(slot, Self::decode_entry(field)?);
        }
        self.slots = slots;
        Ok(())
    }
}
