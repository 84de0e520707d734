pub mod slots;
pub mod state;
