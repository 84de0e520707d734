use bridge_io_snapshot::io::state::SnapshotResult;

use crate::io::{FloatingBus, IoHandlerMap};

/// Capability set shared by every peripheral card a slot can hold.
///
/// The host owns one boxed card per occupied slot (see [`crate::SlotTable`]) and drives it
/// through these hooks; there is no global card registry.
pub trait Card {
    /// Stable name used to tag this card's blob in a slot snapshot.
    fn name(&self) -> &'static str;

    /// Version of the card-level snapshot layout written by [`Card::save_snapshot`].
    fn snapshot_version(&self) -> u32;

    /// Install the card's I/O handler for `slot`.
    fn initialize_io(&mut self, slot: u8, io: &mut IoHandlerMap);

    /// Handle one bus access inside the card's I/O window.
    ///
    /// `address` is the full bus address; the card decodes its own offset. Reads return the data
    /// byte; writes return a value the caller ignores.
    fn io(
        &mut self,
        address: u16,
        write: bool,
        value: u8,
        cycles: u64,
        bus: &mut dyn FloatingBus,
    ) -> u8;

    /// Reset the card. `power_cycle` distinguishes a cold start from a warm reset.
    fn reset(&mut self, power_cycle: bool);

    /// Called periodically with the number of CPU cycles executed since the previous call.
    fn update(&mut self, _executed_cycles: u64) {}

    fn save_snapshot(&self) -> Vec<u8>;

    /// Restore from a blob produced by [`Card::save_snapshot`] at card snapshot `version`.
    fn load_snapshot(&mut self, bytes: &[u8], version: u32) -> SnapshotResult<()>;

    /// Concrete-type access for hosts that need card-specific state.
    fn as_any(&self) -> &dyn core::any::Any;

    fn as_any_mut(&mut self) -> &mut dyn core::any::Any;
}
