use bridge_io_snapshot::io::state::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};
use bridge_platform::{Card, FloatingBus, IoHandlerMap};

use crate::appkey::AppKeyStore;
use crate::buffer::CommandBuffer;
use crate::command::CommandProcessor;
use crate::config::BridgeConfig;
use crate::remote::RemoteFetch;

/// Register offsets within the card's I/O window.
pub const REG_LEN_LO: u8 = 0;
pub const REG_LEN_HI: u8 = 1;
pub const REG_DATA: u8 = 2;

/// Register 0 on write: append a byte to the request.
pub const REG_APPEND: u8 = REG_LEN_LO;
/// Register 1 on write: run an opcode.
pub const REG_COMMAND: u8 = REG_LEN_HI;

/// Card-level snapshot version reported to the host.
pub const CARD_SNAPSHOT_VERSION: u32 = 1;

/// The bridge card.
///
/// A guest appends request bytes through register 0, writes an opcode to register 1, then reads
/// the response length from registers 0/1 and streams the response from register 2. All command
/// handling, including blocking file and network I/O, runs synchronously inside the register 1
/// write.
#[derive(Debug)]
pub struct BridgeCard {
    buffer: CommandBuffer,
    opcode: u8,
    processor: CommandProcessor,
    slot: Option<u8>,
}

impl BridgeCard {
    pub const NAME: &'static str = "Bridge";

    pub fn new(
        store: Box<dyn AppKeyStore>,
        fetch: Box<dyn RemoteFetch>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            buffer: CommandBuffer::new(),
            opcode: 0,
            processor: CommandProcessor::new(store, fetch, config),
            slot: None,
        }
    }

    pub fn buffer(&self) -> &CommandBuffer {
        &self.buffer
    }

    /// Last opcode written to register 1.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn slot(&self) -> Option<u8> {
        self.slot
    }

    pub fn config(&self) -> &BridgeConfig {
        self.processor.config()
    }

    /// Perform one register access at `offset` (the low nibble of the bus address).
    ///
    /// `bus` is only consulted for reads with no backing data: register 2 once the response is
    /// exhausted, and registers 3-15. Writes always return 0.
    pub fn access(
        &mut self,
        offset: u8,
        write: bool,
        value: u8,
        cycles: u64,
        bus: &mut dyn FloatingBus,
    ) -> u8 {
        if write {
            self.write_register(offset, value);
            return 0;
        }

        match offset {
            REG_LEN_LO => self.buffer.len_lo(),
            REG_LEN_HI => self.buffer.len_hi(),
            REG_DATA => match self.buffer.read_next() {
                Some(byte) => byte,
                None => bus.read_floating(cycles),
            },
            _ => bus.read_floating(cycles),
        }
    }

    fn write_register(&mut self, offset: u8, value: u8) {
        match offset {
            REG_APPEND => {
                if !self.buffer.push(value) {
                    tracing::trace!(
                        slot = self.slot,
                        capacity = self.buffer.capacity(),
                        "command buffer full; byte dropped"
                    );
                }
            }
            REG_COMMAND => {
                self.opcode = value;
                self.processor.dispatch(value, &mut self.buffer);
            }
            _ => {}
        }
    }
}

impl Card for BridgeCard {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn snapshot_version(&self) -> u32 {
        CARD_SNAPSHOT_VERSION
    }

    fn initialize_io(&mut self, slot: u8, io: &mut IoHandlerMap) {
        self.slot = Some(slot);
        io.register_io_handler(slot);
    }

    fn io(
        &mut self,
        address: u16,
        write: bool,
        value: u8,
        cycles: u64,
        bus: &mut dyn FloatingBus,
    ) -> u8 {
        let offset = (address & 0x0F) as u8;
        self.access(offset, write, value, cycles, bus)
    }

    fn reset(&mut self, power_cycle: bool) {
        tracing::info!(slot = self.slot, power_cycle, "bridge card reset");
        self.buffer.reset();
        self.opcode = 0;
    }

    fn save_snapshot(&self) -> Vec<u8> {
        self.save_state()
    }

    fn load_snapshot(&mut self, bytes: &[u8], version: u32) -> SnapshotResult<()> {
        if version == 0 || version > CARD_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedDeviceMajorVersion {
                expected: CARD_SNAPSHOT_VERSION as u16,
                found: u16::try_from(version).unwrap_or(u16::MAX),
            });
        }
        self.load_state(bytes)
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
        self
    }
}

impl IoSnapshot for BridgeCard {
    const DEVICE_ID: [u8; 4] = *b"BRDG";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        const TAG_DATA: u16 = 1;
        const TAG_CURSOR: u16 = 2;
        const TAG_OPCODE: u16 = 3;

        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_bytes(TAG_DATA, self.buffer.as_slice().to_vec());
        w.field_u32(TAG_CURSOR, self.buffer.cursor() as u32);
        w.field_u8(TAG_OPCODE, self.opcode);
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        const TAG_DATA: u16 = 1;
        const TAG_CURSOR: u16 = 2;
        const TAG_OPCODE: u16 = 3;

        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;

        let data = r.bytes(TAG_DATA).unwrap_or(&[]);
        if data.len() > self.buffer.capacity() {
            return Err(SnapshotError::InvalidFieldEncoding("buffer length"));
        }
        let cursor = r.u32(TAG_CURSOR)?.unwrap_or(0) as usize;
        if cursor > data.len() {
            return Err(SnapshotError::InvalidFieldEncoding("buffer cursor"));
        }
        let opcode = r.u8(TAG_OPCODE)?.unwrap_or(0);

        if !self.buffer.restore(data, cursor) {
            return Err(SnapshotError::Corrupt("buffer restore"));
        }
        self.opcode = opcode;
        Ok(())
    }
}
