//! Raw protocol client
//!
//! One method per opcode, each following the same sequence: encode the
//! request frame, send it, read the status byte, decode the
//! operation-specific payload. No retries, no pipelining: a method returns
//! only once its full response has been consumed, and the next request must
//! not start before then because responses carry no request identifier.
//!
//! The iteration cursor ([`iterinit`](Tyrant::iterinit) /
//! [`iternext`](Tyrant::iternext)) is connection-scoped server state.
//! Interleaving other commands with an iteration moves the cursor
//! unpredictably; dedicate a connection to an iteration in progress, or use
//! the borrow-enforced iterator on [`TyrantMap`](crate::map::TyrantMap).

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::error::{Result, TyrantError};
use crate::protocol::{frame, ExtOpts, MiscOpts, Opcode, STATUS_ERR};
use crate::transport::Transport;

/// Client for one connection to a Tyrant server
///
/// Generic over the stream type so the command set can be exercised against
/// in-memory streams; real connections use [`Tyrant::connect`] and get a
/// `Tyrant<TcpStream>`.
pub struct Tyrant<S: Read + Write> {
    transport: Transport<S>,
}

impl Tyrant<TcpStream> {
    /// Connect to the configured endpoint.
    ///
    /// Applies the socket options from `config` (nodelay, read/write
    /// timeouts). With a connect timeout set, each resolved address is tried
    /// in turn until one accepts.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let stream = match config.connect_timeout {
            Some(timeout) => {
                let addrs: Vec<SocketAddr> =
                    (config.host.as_str(), config.port).to_socket_addrs()?.collect();
                let mut last_err = None;
                let mut stream = None;
                for addr in addrs {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(s) => {
                            stream = Some(s);
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(%addr, error = %e, "connect candidate failed");
                            last_err = Some(e);
                        }
                    }
                }
                match (stream, last_err) {
                    (Some(s), _) => s,
                    (None, Some(e)) => return Err(e.into()),
                    (None, None) => {
                        return Err(TyrantError::Config(format!(
                            "no addresses resolved for {}",
                            config.addr()
                        )))
                    }
                }
            }
            None => TcpStream::connect((config.host.as_str(), config.port))?,
        };

        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;

        tracing::debug!(addr = %config.addr(), "connected");
        Ok(Self::new(stream))
    }

    /// Shut down both directions of the socket.
    ///
    /// Dropping the client closes the socket too; `close` exists for callers
    /// that want the shutdown error surfaced.
    pub fn close(self) -> Result<()> {
        self.transport.get_ref().shutdown(Shutdown::Both)?;
        Ok(())
    }
}

impl<S: Read + Write> Tyrant<S> {
    /// Client over an already-established stream
    pub fn new(stream: S) -> Self {
        Self {
            transport: Transport::new(stream),
        }
    }

    fn request(&mut self, op: Opcode, frame: &[u8]) -> Result<()> {
        tracing::trace!(op = ?op, bytes = frame.len(), "request");
        self.transport.send(frame)
    }

    // -------------------------------------------------------------------------
    // Write commands
    // -------------------------------------------------------------------------

    /// Unconditionally set key to value.
    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let frame = frame::key_value(Opcode::Put, key.as_ref(), value.as_ref())?;
        self.request(Opcode::Put, &frame)?;
        self.transport.read_status()
    }

    /// Set key to value only if the key does not already exist.
    pub fn putkeep(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let frame = frame::key_value(Opcode::PutKeep, key.as_ref(), value.as_ref())?;
        self.request(Opcode::PutKeep, &frame)?;
        self.transport.read_status()
    }

    /// Append value to the existing value for key, creating it if absent.
    pub fn putcat(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let frame = frame::key_value(Opcode::PutCat, key.as_ref(), value.as_ref())?;
        self.request(Opcode::PutCat, &frame)?;
        self.transport.read_status()
    }

    /// Append value, then truncate the stored value to its trailing `width`
    /// bytes.
    pub fn putshl(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        width: u32,
    ) -> Result<()> {
        let frame = frame::key_value_width(Opcode::PutShl, key.as_ref(), value.as_ref(), width)?;
        self.request(Opcode::PutShl, &frame)?;
        self.transport.read_status()
    }

    /// Set key to value without waiting for a response.
    ///
    /// Fire and forget: the server sends no status for this opcode, so a
    /// failure of this particular write is not observable. Do not follow it
    /// immediately with an operation that assumes the write has landed.
    pub fn putnr(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let frame = frame::key_value(Opcode::PutNr, key.as_ref(), value.as_ref())?;
        self.request(Opcode::PutNr, &frame)
    }

    /// Remove a key.
    pub fn out(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        let frame = frame::single_key(Opcode::Out, key.as_ref())?;
        self.request(Opcode::Out, &frame)?;
        self.transport.read_status()
    }

    // -------------------------------------------------------------------------
    // Read commands
    // -------------------------------------------------------------------------

    /// Get the value stored under key.
    pub fn get(&mut self, key: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let frame = frame::single_key(Opcode::Get, key.as_ref())?;
        self.request(Opcode::Get, &frame)?;
        self.transport.read_status()?;
        self.transport.read_record()
    }

    /// Get (key, value) pairs for the subset of `keys` that exist.
    ///
    /// Missing keys are silently omitted and the returned order is the
    /// server's; do not assume positional correspondence with `keys`.
    pub fn mget<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let frame = frame::key_list(Opcode::Mget, keys)?;
        self.request(Opcode::Mget, &frame)?;
        self.transport.read_status()?;
        let count = self.transport.read_u32()?;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(self.transport.read_record_pair()?);
        }
        Ok(records)
    }

    /// Get the byte length of the value stored under key.
    pub fn vsiz(&mut self, key: impl AsRef<[u8]>) -> Result<u32> {
        let frame = frame::single_key(Opcode::Vsiz, key.as_ref())?;
        self.request(Opcode::Vsiz, &frame)?;
        self.transport.read_status()?;
        self.transport.read_u32()
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// Reset this connection's iteration cursor to the start of the keyspace.
    pub fn iterinit(&mut self) -> Result<()> {
        let frame = frame::no_arg(Opcode::IterInit);
        self.request(Opcode::IterInit, &frame)?;
        self.transport.read_status()
    }

    /// Advance the cursor and return the next key.
    ///
    /// Returns `Ok(None)` when the server reports the known end-of-iteration
    /// status ([`STATUS_ERR`](crate::protocol::STATUS_ERR)); that is the
    /// cursor's terminal condition, not a fault. Any other failure code is a
    /// genuine error and propagates.
    pub fn iternext(&mut self) -> Result<Option<Vec<u8>>> {
        let frame = frame::no_arg(Opcode::IterNext);
        self.request(Opcode::IterNext, &frame)?;
        match self.transport.read_status() {
            Ok(()) => Ok(Some(self.transport.read_record()?)),
            Err(TyrantError::Server { code }) if code == STATUS_ERR => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get up to `max_keys` keys beginning with `prefix`.
    pub fn fwmkeys(&mut self, prefix: impl AsRef<[u8]>, max_keys: u32) -> Result<Vec<Vec<u8>>> {
        let frame = frame::key_count(Opcode::Fwmkeys, prefix.as_ref(), max_keys)?;
        self.request(Opcode::Fwmkeys, &frame)?;
        self.transport.read_status()?;
        let count = self.transport.read_u32()?;
        let mut keys = Vec::with_capacity(count as usize);
        for _ in 0..count {
            keys.push(self.transport.read_record()?);
        }
        Ok(keys)
    }

    // -------------------------------------------------------------------------
    // Server-side execution
    // -------------------------------------------------------------------------

    /// Call the server-side function `func(key, value)` and return its
    /// result record.
    ///
    /// `opts` selects record and/or global locking around the call.
    pub fn ext(
        &mut self,
        func: impl AsRef<[u8]>,
        opts: ExtOpts,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<Vec<u8>> {
        let frame = frame::func_key_value(
            Opcode::Ext,
            func.as_ref(),
            opts.bits(),
            key.as_ref(),
            value.as_ref(),
        )?;
        self.request(Opcode::Ext, &frame)?;
        self.transport.read_status()?;
        self.transport.read_record()
    }

    /// Generic batch entry point.
    ///
    /// Every server supports the built-in function names `putlist` (args
    /// alternate key, value), `outlist` (args are keys) and `getlist` (args
    /// are keys; the reply alternates key, value for the keys that exist).
    /// Returns the raw record list of the reply.
    pub fn misc<A: AsRef<[u8]>>(
        &mut self,
        func: impl AsRef<[u8]>,
        opts: MiscOpts,
        args: &[A],
    ) -> Result<Vec<Vec<u8>>> {
        let frame = frame::func_call(Opcode::Misc, func.as_ref(), opts.bits(), args)?;
        self.request(Opcode::Misc, &frame)?;
        self.transport.read_status()?;
        let count = self.transport.read_u32()?;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(self.transport.read_record()?);
        }
        Ok(records)
    }

    // -------------------------------------------------------------------------
    // Maintenance commands
    // -------------------------------------------------------------------------

    /// Force the server to flush updates to storage.
    pub fn sync(&mut self) -> Result<()> {
        let frame = frame::no_arg(Opcode::Sync);
        self.request(Opcode::Sync, &frame)?;
        self.transport.read_status()
    }

    /// Remove all records.
    pub fn vanish(&mut self) -> Result<()> {
        let frame = frame::no_arg(Opcode::Vanish);
        self.request(Opcode::Vanish, &frame)?;
        self.transport.read_status()
    }

    /// Hot-copy the database to `path` on the server's filesystem.
    pub fn copy(&mut self, path: impl AsRef<[u8]>) -> Result<()> {
        let frame = frame::single_key(Opcode::Copy, path.as_ref())?;
        self.request(Opcode::Copy, &frame)?;
        self.transport.read_status()
    }

    /// Restore the database from the update log at `path` on the server's
    /// filesystem, starting at `timestamp_ms`.
    pub fn restore(&mut self, path: impl AsRef<[u8]>, timestamp_ms: u64) -> Result<()> {
        let frame = frame::key_timestamp(Opcode::Restore, path.as_ref(), timestamp_ms)?;
        self.request(Opcode::Restore, &frame)?;
        self.transport.read_status()
    }

    /// Set the replication master to `host:port`.
    pub fn setmst(&mut self, host: impl AsRef<[u8]>, port: u16) -> Result<()> {
        let frame = frame::key_count(Opcode::SetMst, host.as_ref(), u32::from(port))?;
        self.request(Opcode::SetMst, &frame)?;
        self.transport.read_status()
    }

    // -------------------------------------------------------------------------
    // Statistics
    // -------------------------------------------------------------------------

    /// Number of records in the database.
    pub fn rnum(&mut self) -> Result<u64> {
        let frame = frame::no_arg(Opcode::Rnum);
        self.request(Opcode::Rnum, &frame)?;
        self.transport.read_status()?;
        self.transport.read_u64()
    }

    /// Size of the database in bytes.
    pub fn size(&mut self) -> Result<u64> {
        let frame = frame::no_arg(Opcode::Size);
        self.request(Opcode::Size, &frame)?;
        self.transport.read_status()?;
        self.transport.read_u64()
    }

    /// Raw statistics blob: `key<TAB>value` lines joined by newlines.
    ///
    /// [`TyrantMap::stats`](crate::map::TyrantMap::stats) parses this into a
    /// map.
    pub fn stat(&mut self) -> Result<Vec<u8>> {
        let frame = frame::no_arg(Opcode::Stat);
        self.request(Opcode::Stat, &frame)?;
        self.transport.read_status()?;
        self.transport.read_record()
    }
}
