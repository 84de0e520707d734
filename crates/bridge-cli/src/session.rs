use bridge_card::card::{REG_APPEND, REG_COMMAND, REG_DATA};
use bridge_card::{BridgeCard, Opcode};
use bridge_platform::io::slot_io_base;
use bridge_platform::{ConstantFloatingBus, SlotTable};

/// Cycles charged per bus access; roughly one 6502 absolute-addressed load/store.
const CYCLES_PER_ACCESS: u64 = 4;

/// Issues register accesses against a slot the way a guest program would.
pub struct Session {
    slots: SlotTable,
    slot: u8,
    bus: ConstantFloatingBus,
    cycles: u64,
}

impl Session {
    pub fn new(slots: SlotTable, slot: u8, floating_bus: u8) -> Self {
        Self {
            slots,
            slot,
            bus: ConstantFloatingBus(floating_bus),
            cycles: 0,
        }
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    fn address(&self, reg: u8) -> u16 {
        slot_io_base(self.slot) + u16::from(reg)
    }

    fn tick(&mut self) -> u64 {
        self.cycles += CYCLES_PER_ACCESS;
        self.slots.update(CYCLES_PER_ACCESS);
        self.cycles
    }

    fn write(&mut self, reg: u8, value: u8) {
        let cycles = self.tick();
        let address = self.address(reg);
        self.slots.write(address, value, cycles, &mut self.bus);
    }

    fn read(&mut self, reg: u8) -> u8 {
        let cycles = self.tick();
        let address = self.address(reg);
        self.slots.read(address, cycles, &mut self.bus)
    }

    pub fn send(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write(REG_APPEND, b);
        }
    }

    pub fn command(&mut self, op: Opcode) {
        self.write(REG_COMMAND, op as u8);
    }

    /// Response bytes the card has not streamed out yet. Zero if the slot holds no bridge card.
    pub fn pending(&self) -> usize {
        self.slots
            .get(self.slot)
            .and_then(|card| card.as_any().downcast_ref::<BridgeCard>())
            .map_or(0, |card| card.buffer().remaining())
    }

    /// Read the rest of the pending response.
    pub fn receive(&mut self) -> Vec<u8> {
        let pending = self.pending();
        (0..pending).map(|_| self.read(REG_DATA)).collect()
    }

    /// Clear the card, load `request` and run `op`. The response (if any) stays pending.
    pub fn request(&mut self, request: &[u8], op: Opcode) {
        self.command(Opcode::Reset);
        self.send(request);
        self.command(op);
    }

    /// Run one request/response transaction.
    pub fn transact(&mut self, request: &[u8], op: Opcode) -> Vec<u8> {
        self.request(request, op);
        self.receive()
    }
}
