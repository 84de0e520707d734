//! Bridge card workspace facade.
//!
//! The card itself lives in [`card`]; [`platform`] is the slot/bus host it plugs into and
//! [`snapshot`] the state encoding both share.

pub use bridge_card as card;
pub use bridge_io_snapshot as snapshot;
pub use bridge_platform as platform;
