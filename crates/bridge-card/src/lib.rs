//! Emulation of a "bridge" peripheral card: a tiny register protocol that lets an 8-bit guest
//! hand command bytes to host-side services (a key/value AppKey store and a remote text source)
//! and stream the response back.
//!
//! Guest programs talk to the card through three registers in the slot's I/O window:
//!
//! | Offset | Read                         | Write                          |
//! |--------|------------------------------|--------------------------------|
//! | 0      | response length, low byte    | append a byte to the buffer    |
//! | 1      | response length, high byte   | run opcode (`0` clears buffer) |
//! | 2      | next response byte           | ignored                        |
#![forbid(unsafe_code)]

pub mod appkey;
pub mod buffer;
pub mod card;
pub mod command;
pub mod config;
pub mod error;
pub mod remote;
pub mod scanner;

pub use appkey::{AppKeyId, AppKeyStore, FsAppKeyStore, MemoryAppKeyStore};
pub use buffer::{CommandBuffer, BUFFER_CAPACITY};
pub use card::BridgeCard;
pub use command::{CommandProcessor, Opcode};
pub use config::BridgeConfig;
pub use error::{FetchError, StoreError};
pub use remote::{CannedFetch, RemoteFetch};
#[cfg(not(target_arch = "wasm32"))]
pub use remote::HttpFetch;
pub use scanner::{ExtractMode, ValueScanner};
