//! Request frame encoders
//!
//! One encoder per command shape, each producing the complete frame as a
//! single contiguous buffer: magic byte, opcode byte, then the fixed-width
//! big-endian fields and length-prefixed operands in the exact order the
//! server expects. There is no padding and no alignment.
//!
//! Operand lengths are validated against the u32 length fields before any
//! bytes are written; an oversized operand fails with
//! [`TyrantError::TooLarge`](crate::error::TyrantError::TooLarge).

use bytes::BufMut;

use super::opcode::{Opcode, MAGIC};
use crate::error::{Result, TyrantError};

/// Validate that a byte-string operand fits its u32 length field.
fn record_len(bytes: &[u8]) -> Result<u32> {
    u32::try_from(bytes.len()).map_err(|_| TyrantError::TooLarge { len: bytes.len() })
}

/// Validate that a list fits its u32 count field.
fn list_len(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| TyrantError::TooLarge { len: n })
}

fn header(op: Opcode, body: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + body);
    buf.put_u8(MAGIC);
    buf.put_u8(op.as_u8());
    buf
}

/// `magic, opcode`
pub fn no_arg(op: Opcode) -> Vec<u8> {
    header(op, 0)
}

/// `magic, opcode, keyLen(u32), key`
pub fn single_key(op: Opcode, key: &[u8]) -> Result<Vec<u8>> {
    let klen = record_len(key)?;
    let mut buf = header(op, 4 + key.len());
    buf.put_u32(klen);
    buf.put_slice(key);
    Ok(buf)
}

/// `magic, opcode, keyLen(u32), count(u32), key`
pub fn key_count(op: Opcode, key: &[u8], count: u32) -> Result<Vec<u8>> {
    let klen = record_len(key)?;
    let mut buf = header(op, 8 + key.len());
    buf.put_u32(klen);
    buf.put_u32(count);
    buf.put_slice(key);
    Ok(buf)
}

/// `magic, opcode, keyLen(u32), timestamp(u64), key`
pub fn key_timestamp(op: Opcode, key: &[u8], timestamp: u64) -> Result<Vec<u8>> {
    let klen = record_len(key)?;
    let mut buf = header(op, 12 + key.len());
    buf.put_u32(klen);
    buf.put_u64(timestamp);
    buf.put_slice(key);
    Ok(buf)
}

/// `magic, opcode, keyLen(u32), valLen(u32), key, value`
pub fn key_value(op: Opcode, key: &[u8], value: &[u8]) -> Result<Vec<u8>> {
    let klen = record_len(key)?;
    let vlen = record_len(value)?;
    let mut buf = header(op, 8 + key.len() + value.len());
    buf.put_u32(klen);
    buf.put_u32(vlen);
    buf.put_slice(key);
    buf.put_slice(value);
    Ok(buf)
}

/// `magic, opcode, keyLen(u32), valLen(u32), width(u32), key, value`
pub fn key_value_width(op: Opcode, key: &[u8], value: &[u8], width: u32) -> Result<Vec<u8>> {
    let klen = record_len(key)?;
    let vlen = record_len(value)?;
    let mut buf = header(op, 12 + key.len() + value.len());
    buf.put_u32(klen);
    buf.put_u32(vlen);
    buf.put_u32(width);
    buf.put_slice(key);
    buf.put_slice(value);
    Ok(buf)
}

/// `magic, opcode, count(u32), then per key: len(u32), key`
pub fn key_list<K: AsRef<[u8]>>(op: Opcode, keys: &[K]) -> Result<Vec<u8>> {
    let count = list_len(keys.len())?;
    let mut body = 4;
    for key in keys {
        record_len(key.as_ref())?;
        body += 4 + key.as_ref().len();
    }

    let mut buf = header(op, body);
    buf.put_u32(count);
    for key in keys {
        let key = key.as_ref();
        buf.put_u32(key.len() as u32);
        buf.put_slice(key);
    }
    Ok(buf)
}

/// `magic, opcode, funcLen(u32), options(u32), argCount(u32), func, then per
/// arg: len(u32), arg`
pub fn func_call<A: AsRef<[u8]>>(
    op: Opcode,
    func: &[u8],
    opts: u32,
    args: &[A],
) -> Result<Vec<u8>> {
    let flen = record_len(func)?;
    let count = list_len(args.len())?;
    let mut body = 12 + func.len();
    for arg in args {
        record_len(arg.as_ref())?;
        body += 4 + arg.as_ref().len();
    }

    let mut buf = header(op, body);
    buf.put_u32(flen);
    buf.put_u32(opts);
    buf.put_u32(count);
    buf.put_slice(func);
    for arg in args {
        let arg = arg.as_ref();
        buf.put_u32(arg.len() as u32);
        buf.put_slice(arg);
    }
    Ok(buf)
}

/// `magic, opcode, funcLen(u32), options(u32), keyLen(u32), valLen(u32),
/// func, key, value`
pub fn func_key_value(
    op: Opcode,
    func: &[u8],
    opts: u32,
    key: &[u8],
    value: &[u8],
) -> Result<Vec<u8>> {
    let flen = record_len(func)?;
    let klen = record_len(key)?;
    let vlen = record_len(value)?;
    let mut buf = header(op, 16 + func.len() + key.len() + value.len());
    buf.put_u32(flen);
    buf.put_u32(opts);
    buf.put_u32(klen);
    buf.put_u32(vlen);
    buf.put_slice(func);
    buf.put_slice(key);
    buf.put_slice(value);
    Ok(buf)
}
