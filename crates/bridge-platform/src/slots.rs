use bridge_io_snapshot::io::slots::{SlotEntry, SlotsSnapshot};
use bridge_io_snapshot::io::state::{IoSnapshot, SnapshotResult};

use crate::card::Card;
use crate::io::{decode_slot_io, FloatingBus, IoHandlerMap, NUM_SLOTS};

/// Slot index → owned card.
///
/// Bus accesses are routed by decoding the slot from the address and handing the access to
/// whichever card occupies that slot. Empty slots, and slots whose card has not installed an I/O
/// handler, read as floating bus and ignore writes.
pub struct SlotTable {
    cards: [Option<Box<dyn Card>>; NUM_SLOTS],
    io: IoHandlerMap,
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            cards: std::array::from_fn(|_| None),
            io: IoHandlerMap::new(),
        }
    }

    /// Insert `card` into `slot` and let it install its I/O handler.
    ///
    /// Returns the card previously occupying the slot, if any.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a valid slot index.
    pub fn insert(&mut self, slot: u8, mut card: Box<dyn Card>) -> Option<Box<dyn Card>> {
        let idx = usize::from(slot);
        assert!(idx < NUM_SLOTS, "slot {slot} out of range");

        self.io.unregister_io_handler(slot);
        card.initialize_io(slot, &mut self.io);
        tracing::info!(slot, card = card.name(), "card installed");
        self.cards[idx].replace(card)
    }

    pub fn remove(&mut self, slot: u8) -> Option<Box<dyn Card>> {
        let card = self.cards.get_mut(usize::from(slot))?.take();
        if card.is_some() {
            self.io.unregister_io_handler(slot);
        }
        card
    }

    pub fn get(&self, slot: u8) -> Option<&dyn Card> {
        self.cards.get(usize::from(slot))?.as_deref()
    }

    pub fn get_mut(&mut self, slot: u8) -> Option<&mut (dyn Card + 'static)> {
        self.cards.get_mut(usize::from(slot))?.as_deref_mut()
    }

    pub fn io_handlers(&self) -> &IoHandlerMap {
        &self.io
    }

    /// Route one bus access.
    ///
    /// Reads outside any active slot window return `bus.read_floating(cycles)`; writes return 0.
    pub fn io(
        &mut self,
        address: u16,
        write: bool,
        value: u8,
        cycles: u64,
        bus: &mut dyn FloatingBus,
    ) -> u8 {
        let card = decode_slot_io(address)
            .filter(|(slot, _)| self.io.is_registered(*slot))
            .and_then(|(slot, _)| self.cards[usize::from(slot)].as_deref_mut());

        match card {
            Some(card) => card.io(address, write, value, cycles, bus),
            None if write => 0,
            None => bus.read_floating(cycles),
        }
    }

    pub fn read(&mut self, address: u16, cycles: u64, bus: &mut dyn FloatingBus) -> u8 {
        self.io(address, false, 0, cycles, bus)
    }

    pub fn write(&mut self, address: u16, value: u8, cycles: u64, bus: &mut dyn FloatingBus) {
        self.io(address, true, value, cycles, bus);
    }

    pub fn reset(&mut self, power_cycle: bool) {
        for card in self.cards.iter_mut().flatten() {
            card.reset(power_cycle);
        }
    }

    pub fn update(&mut self, executed_cycles: u64) {
        for card in self.cards.iter_mut().flatten() {
            card.update(executed_cycles);
        }
    }

    /// Snapshot every occupied slot into a single [`SlotsSnapshot`] blob.
    pub fn save_state(&self) -> Vec<u8> {
        let mut snap = SlotsSnapshot::new();
        for (slot, card) in self.cards.iter().enumerate() {
            let Some(card) = card else {
                continue;
            };
            snap.insert(
                slot as u16,
                SlotEntry {
                    card_name: card.name().to_string(),
                    card_version: card.snapshot_version(),
                    state: card.save_snapshot(),
                },
            );
        }
        snap.save_state()
    }

    /// Restore card state from a blob produced by [`SlotTable::save_state`].
    ///
    /// Entries for empty slots, or for slots now holding a different kind of card, are skipped.
    /// Cards with no entry keep their current state. If any card rejects its blob, cards already
    /// restored are put back to their prior state before the error is returned.
    pub fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let mut snap = SlotsSnapshot::new();
        snap.load_state(bytes)?;

        // (slot, version, blob) for every card restored so far.
        let mut previous: Vec<(u16, u32, Vec<u8>)> = Vec::new();
        for (&slot, entry) in snap.iter() {
            let Some(card) = self
                .cards
                .get_mut(usize::from(slot))
                .and_then(|c| c.as_deref_mut())
            else {
                tracing::warn!(slot, card = %entry.card_name, "snapshot entry for empty slot");
                continue;
            };
            if card.name() != entry.card_name {
                tracing::warn!(
                    slot,
                    expected = card.name(),
                    found = %entry.card_name,
                    "snapshot entry for a different card"
                );
                continue;
            }
            let prior = (slot, card.snapshot_version(), card.save_snapshot());
            if let Err(err) = card.load_snapshot(&entry.state, entry.card_version) {
                tracing::warn!(slot, error = %err, "card snapshot rejected");
                self.roll_back(previous);
                return Err(err);
            }
            previous.push(prior);
        }
        Ok(())
    }

    fn roll_back(&mut self, previous: Vec<(u16, u32, Vec<u8>)>) {
        for (slot, version, state) in previous.into_iter().rev() {
            let Some(card) = self
                .cards
                .get_mut(usize::from(slot))
                .and_then(|c| c.as_deref_mut())
            else {
                continue;
            };
            if let Err(err) = card.load_snapshot(&state, version) {
                tracing::error!(slot, error = %err, "failed to roll back card state");
            }
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}
