#![forbid(unsafe_code)]

pub mod card;
pub mod io;
pub mod slots;

pub use card::Card;
pub use io::{ConstantFloatingBus, FloatingBus, IoHandlerMap};
pub use slots::SlotTable;
