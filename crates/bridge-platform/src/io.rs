/// Number of peripheral slots on the emulated bus.
pub const NUM_SLOTS: usize = 8;

/// First address of the slot I/O windows (`0xC080` for slot 0).
pub const SLOT_IO_BASE: u16 = 0xC080;

/// Size of each slot's I/O window.
pub const SLOT_IO_LEN: u16 = 0x10;

/// Source of the value returned by reads that have no backing data.
///
/// Real hardware returns whatever the video circuitry last left on the data bus, so the value
/// depends on the cycle count. Hosts that don't model this can use [`ConstantFloatingBus`].
pub trait FloatingBus {
    fn read_floating(&mut self, cycles: u64) -> u8;
}

/// A floating bus that always reads back the same byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFloatingBus(pub u8);

impl Default for ConstantFloatingBus {
    fn default() -> Self {
        Self(0xFF)
    }
}

impl FloatingBus for ConstantFloatingBus {
    fn read_floating(&mut self, _cycles: u64) -> u8 {
        self.0
    }
}

impl<F> FloatingBus for F
where
    F: FnMut(u64) -> u8,
{
    fn read_floating(&mut self, cycles: u64) -> u8 {
        self(cycles)
    }
}

/// Split an address into `(slot, offset)` if it falls inside a slot I/O window.
///
/// `slot = ((address & 0xF0) >> 4) - 8` and `offset = address & 0x0F`, so `0xC0C2` is slot 4,
/// offset 2.
pub fn decode_slot_io(address: u16) -> Option<(u8, u8)> {
    let end_exclusive = u32::from(SLOT_IO_BASE) + u32::from(SLOT_IO_LEN) * NUM_SLOTS as u32;
    if u32::from(address) < u32::from(SLOT_IO_BASE) || u32::from(address) >= end_exclusive {
        return None;
    }
    let slot = (((address & 0xF0) >> 4) - 8) as u8;
    let offset = (address & 0x0F) as u8;
    Some((slot, offset))
}

/// First address of `slot`'s I/O window.
pub fn slot_io_base(slot: u8) -> u16 {
    SLOT_IO_BASE + u16::from(slot) * SLOT_IO_LEN
}

/// Which slot I/O windows currently have a handler installed.
///
/// Cards populate this from [`crate::Card::initialize_io`]. Accesses to a window without a
/// handler float the bus even if a card is physically present.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IoHandlerMap {
    registered: [bool; NUM_SLOTS],
}

impl IoHandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_io_handler(&mut self, slot: u8) {
        if let Some(entry) = self.registered.get_mut(usize::from(slot)) {
            *entry = true;
        }
    }

    pub fn unregister_io_handler(&mut self, slot: u8) {
        if let Some(entry) = self.registered.get_mut(usize::from(slot)) {
            *entry = false;
        }
    }

    pub fn is_registered(&self, slot: u8) -> bool {
        self.registered
            .get(usize::from(slot))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_covers_every_slot_window() {
        assert_eq!(decode_slot_io(0xC07F), None);
        assert_eq!(decode_slot_io(0xC080), Some((0, 0)));
        assert_eq!(decode_slot_io(0xC0C2), Some((4, 2)));
        assert_eq!(decode_slot_io(0xC0FF), Some((7, 0x0F)));
        assert_eq!(decode_slot_io(0xC100), None);
        assert_eq!(decode_slot_io(0x0000), None);

        for slot in 0..NUM_SLOTS as u8 {
            let base = slot_io_base(slot);
            assert_eq!(decode_slot_io(base), Some((slot, 0)));
            assert_eq!(decode_slot_io(base + SLOT_IO_LEN - 1), Some((slot, 0x0F)));
        }
    }

    #[test]
    fn out_of_range_slots_are_never_registered() {
        let mut map = IoHandlerMap::new();
        map.register_io_handler(8);
        map.register_io_handler(3);
        assert!(!map.is_registered(8));
        assert!(map.is_registered(3));
        map.unregister_io_handler(3);
        assert!(!map.is_registered(3));
    }

    #[test]
    fn closures_act_as_floating_bus() {
        let mut bus = |cycles: u64| (cycles & 0xFF) as u8;
        assert_eq!(bus.read_floating(0x1234), 0x34);
        assert_eq!(ConstantFloatingBus::default().read_floating(99), 0xFF);
    }
}
