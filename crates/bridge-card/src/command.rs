use std::fmt;

use crate::appkey::{read_app_key, write_app_key, AppKeyStore};
use crate::buffer::CommandBuffer;
use crate::config::BridgeConfig;
use crate::remote::{read_remote, RemoteFetch};

/// Command byte written to register 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Reset = 0x00,
    ReadAppKey = 0xDD,
    WriteAppKey = 0xDE,
    /// Fetch a URL and extract its values. Emulator-only; no real device speaks this opcode.
    ReadRemote = 0xFE,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Reset),
            0xDD => Some(Self::ReadAppKey),
            0xDE => Some(Self::WriteAppKey),
            0xFE => Some(Self::ReadRemote),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reset => "reset",
            Self::ReadAppKey => "read-appkey",
            Self::WriteAppKey => "write-appkey",
            Self::ReadRemote => "read-remote",
        };
        f.write_str(name)
    }
}

/// Runs opcodes against the command buffer using the injected host services.
///
/// Every handler completes (including any blocking I/O) before `dispatch` returns.
pub struct CommandProcessor {
    store: Box<dyn AppKeyStore>,
    fetch: Box<dyn RemoteFetch>,
    config: BridgeConfig,
}

impl CommandProcessor {
    pub fn new(
        store: Box<dyn AppKeyStore>,
        fetch: Box<dyn RemoteFetch>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            store,
            fetch,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Execute `opcode`. Unknown opcodes leave the buffer untouched.
    pub fn dispatch(&mut self, opcode: u8, buf: &mut CommandBuffer) {
        let Some(op) = Opcode::from_u8(opcode) else {
            tracing::trace!(opcode, "unknown opcode ignored");
            return;
        };
        tracing::debug!(%op, request_len = buf.len(), "dispatching command");

        match op {
            Opcode::Reset => buf.reset(),
            Opcode::ReadAppKey => read_app_key(&mut *self.store, buf),
            Opcode::WriteAppKey => write_app_key(&mut *self.store, buf),
            Opcode::ReadRemote => read_remote(
                &mut *self.fetch,
                self.config.fetch_limit,
                self.config.extract_mode,
                buf,
            ),
        }
    }
}

impl fmt::Debug for CommandProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
