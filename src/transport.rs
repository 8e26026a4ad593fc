//! Blocking transport primitives
//!
//! Moves bytes over one connection and interprets protocol-level status.
//! Everything here blocks: reads accumulate until the requested length is
//! complete, writes retry until the whole frame is on the wire. Deadlines,
//! if any, come from socket-level timeouts configured at connect time.
//!
//! The transport is generic over `Read + Write` so the response decoding can
//! be driven from in-memory streams in tests.

use std::io::{BufReader, Read, Write};

use crate::error::{Result, TyrantError};
use crate::protocol::STATUS_OK;

/// Wire primitives over a single blocking stream
pub struct Transport<S: Read + Write> {
    /// Reads are buffered; writes go straight to the underlying stream
    /// because every request is already one contiguous frame.
    stream: BufReader<S>,
}

impl<S: Read + Write> Transport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// The underlying stream
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Consume the transport, returning the underlying stream.
    ///
    /// Bytes already pulled into the read buffer are discarded, so only call
    /// this between complete request/response exchanges.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Write one complete frame and flush it.
    ///
    /// Short writes are retried internally until the frame is fully written
    /// or the connection fails.
    pub fn send(&mut self, frame: &[u8]) -> Result<()> {
        tracing::trace!(bytes = frame.len(), "sending frame");
        let stream = self.stream.get_mut();
        stream.write_all(frame)?;
        stream.flush()?;
        Ok(())
    }

    /// Read exactly `n` bytes, accumulating across short reads.
    pub fn read_exact_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read the one-byte response status.
    ///
    /// Zero is success. Any other value is returned as
    /// [`TyrantError::Server`] carrying the raw code; no payload follows a
    /// failure status, so the stream is left positioned at the next response.
    pub fn read_status(&mut self) -> Result<()> {
        let mut byte = [0u8; 1];
        self.stream.read_exact(&mut byte)?;
        match byte[0] {
            STATUS_OK => Ok(()),
            code => Err(TyrantError::Server { code }),
        }
    }

    /// Read a big-endian u32 field.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.stream.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Read a big-endian u64 field.
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.stream.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Read a length-prefixed record: u32 length, then that many bytes.
    pub fn read_record(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        self.read_exact_vec(len)
    }

    /// Read a record pair: key length, value length, key bytes, value bytes.
    pub fn read_record_pair(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        let klen = self.read_u32()? as usize;
        let vlen = self.read_u32()? as usize;
        let key = self.read_exact_vec(klen)?;
        let value = self.read_exact_vec(vlen)?;
        Ok((key, value))
    }
}
