#![forbid(unsafe_code)]

// The card's HTTP fetcher is native-only; keep the workspace building for wasm targets.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod config;
#[cfg(not(target_arch = "wasm32"))]
mod session;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::Write;

    use anyhow::{bail, Context, Result};
    use bridge_card::{BridgeCard, FsAppKeyStore, HttpFetch, Opcode, BUFFER_CAPACITY};
    use bridge_platform::SlotTable;
    use tracing_subscriber::EnvFilter;

    use crate::config::{Command, Config};
    use crate::session::Session;

    /// Request header size for `WRITE_APPKEY`: id(4) + len(2).
    const APPKEY_WRITE_HEADER: usize = 6;

    pub fn main() -> Result<()> {
        let cfg = Config::load();

        let filter = EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();

        let fetch = HttpFetch::new(cfg.fetch_timeout).context("failed to build HTTP client")?;
        let card = BridgeCard::new(
            Box::new(FsAppKeyStore::new(&cfg.appkey_dir)),
            Box::new(fetch),
            cfg.card,
        );
        let mut slots = SlotTable::new();
        slots.insert(cfg.slot, Box::new(card));
        slots.reset(true);

        if let Some(path) = &cfg.snapshot_load {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            slots
                .load_state(&bytes)
                .with_context(|| format!("failed to restore snapshot {}", path.display()))?;
        }

        let mut session = Session::new(slots, cfg.slot, cfg.floating_bus);
        let response = run(&mut session, &cfg.command)?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&response)?;
        stdout.flush()?;

        if let Some(path) = &cfg.snapshot_save {
            std::fs::write(path, session.slots().save_state())
                .with_context(|| format!("failed to write snapshot {}", path.display()))?;
            tracing::info!(path = %path.display(), "snapshot saved");
        }
        Ok(())
    }

    fn run(session: &mut Session, command: &Command) -> Result<Vec<u8>> {
        let response = match command {
            Command::AppkeyRead { id } => session.transact(&id.0, Opcode::ReadAppKey),
            Command::AppkeyWrite { id, value } => {
                let max = BUFFER_CAPACITY - APPKEY_WRITE_HEADER;
                if value.len() > max {
                    bail!(
                        "value is {} bytes; the card buffer holds at most {max}",
                        value.len()
                    );
                }
                let len = u16::try_from(value.len()).context("value longer than 65535 bytes")?;
                let mut request = Vec::with_capacity(APPKEY_WRITE_HEADER + value.len());
                request.extend_from_slice(&id.0);
                request.extend_from_slice(&len.to_le_bytes());
                request.extend_from_slice(value.as_bytes());
                // The card leaves the request in the buffer; keep it pending for `receive`.
                session.request(&request, Opcode::WriteAppKey);
                Vec::new()
            }
            Command::Fetch { url } => session.transact(url.as_bytes(), Opcode::ReadRemote),
            Command::Receive => session.receive(),
        };
        Ok(response)
    }
}
