//! In-process test server
//!
//! Speaks the wire protocol over real sockets so the tests exercise the
//! whole stack, framing included. Records live in a BTreeMap shared by
//! every connection; the iteration cursor is per-connection, as on a real
//! server. Faults can be injected per opcode to script failure statuses.

// Compiled into every test root; not all roots use every helper.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use tyrantkv::Config;

const MAGIC: u8 = 0xC8;

type Store = Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>;
type Faults = Arc<Mutex<HashMap<u8, u8>>>;

pub struct MockServer {
    port: u16,
    store: Store,
    faults: Faults,
}

impl MockServer {
    /// Bind an ephemeral port and serve connections in the background.
    pub fn start() -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("local addr").port();
        let store: Store = Arc::new(Mutex::new(BTreeMap::new()));
        let faults: Faults = Arc::new(Mutex::new(HashMap::new()));

        let accept_store = Arc::clone(&store);
        let accept_faults = Arc::clone(&faults);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let store = Arc::clone(&accept_store);
                let faults = Arc::clone(&accept_faults);
                thread::spawn(move || {
                    let _ = serve(stream, store, faults);
                });
            }
        });

        MockServer {
            port,
            store,
            faults,
        }
    }

    pub fn config(&self) -> Config {
        Config::new("127.0.0.1", self.port)
    }

    /// Force every subsequent request with this opcode to fail with `code`.
    pub fn inject_fault(&self, opcode: u8, code: u8) {
        self.faults.lock().unwrap().insert(opcode, code);
    }

    /// Place a record directly, bypassing the protocol.
    pub fn seed(&self, key: &[u8], value: &[u8]) {
        self.store
            .lock()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
    }
}

// =============================================================================
// Connection loop
// =============================================================================

fn serve(stream: TcpStream, store: Store, faults: Faults) -> std::io::Result<()> {
    let mut r = BufReader::new(stream.try_clone()?);
    let mut w = stream;

    // Iteration cursor: snapshot of keys taken at iterinit.
    let mut cursor: Vec<Vec<u8>> = Vec::new();
    let mut cursor_pos = 0usize;

    loop {
        let mut header = [0u8; 2];
        if r.read_exact(&mut header).is_err() {
            return Ok(()); // client closed
        }
        if header[0] != MAGIC {
            return Ok(());
        }
        let op = header[1];

        match op {
            // put, putkeep, putcat, putnr: klen, vlen, key, value
            0x10 | 0x11 | 0x12 | 0x18 => {
                let (key, value) = read_kv(&mut r)?;
                let status = forced(&faults, op).unwrap_or_else(|| {
                    let mut store = store.lock().unwrap();
                    match op {
                        0x11 if store.contains_key(&key) => 1,
                        0x12 => {
                            store.entry(key).or_default().extend_from_slice(&value);
                            0
                        }
                        _ => {
                            store.insert(key, value);
                            0
                        }
                    }
                });
                // putnr gets no reply at all
                if op != 0x18 {
                    w.write_all(&[status])?;
                }
            }

            // putshl: klen, vlen, width, key, value
            0x13 => {
                let klen = read_u32(&mut r)? as usize;
                let vlen = read_u32(&mut r)? as usize;
                let width = read_u32(&mut r)? as usize;
                let key = read_bytes(&mut r, klen)?;
                let value = read_bytes(&mut r, vlen)?;
                let status = forced(&faults, op).unwrap_or_else(|| {
                    let mut store = store.lock().unwrap();
                    let stored = store.entry(key).or_default();
                    stored.extend_from_slice(&value);
                    if stored.len() > width {
                        let cut = stored.len() - width;
                        stored.drain(..cut);
                    }
                    0
                });
                w.write_all(&[status])?;
            }

            // out: klen, key
            0x20 => {
                let key = read_record(&mut r)?;
                let status = forced(&faults, op).unwrap_or_else(|| {
                    if store.lock().unwrap().remove(&key).is_some() {
                        0
                    } else {
                        1
                    }
                });
                w.write_all(&[status])?;
            }

            // get: klen, key -> status, vlen, value
            0x30 => {
                let key = read_record(&mut r)?;
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                match store.lock().unwrap().get(&key) {
                    Some(value) => {
                        let mut reply = vec![0u8];
                        put_record(&mut reply, value);
                        w.write_all(&reply)?;
                    }
                    None => w.write_all(&[1])?,
                }
            }

            // mget: count, then per key: klen, key
            // reply: status, found, then per record: klen, vlen, key, value
            0x31 => {
                let count = read_u32(&mut r)? as usize;
                let mut keys = Vec::with_capacity(count);
                for _ in 0..count {
                    keys.push(read_record(&mut r)?);
                }
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                let store = store.lock().unwrap();
                let found: Vec<_> = keys
                    .iter()
                    .filter_map(|k| store.get(k).map(|v| (k.clone(), v.clone())))
                    .collect();
                let mut reply = vec![0u8];
                reply.extend_from_slice(&(found.len() as u32).to_be_bytes());
                for (key, value) in found {
                    reply.extend_from_slice(&(key.len() as u32).to_be_bytes());
                    reply.extend_from_slice(&(value.len() as u32).to_be_bytes());
                    reply.extend_from_slice(&key);
                    reply.extend_from_slice(&value);
                }
                w.write_all(&reply)?;
            }

            // vsiz: klen, key -> status, len(u32)
            0x38 => {
                let key = read_record(&mut r)?;
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                match store.lock().unwrap().get(&key) {
                    Some(value) => {
                        let mut reply = vec![0u8];
                        reply.extend_from_slice(&(value.len() as u32).to_be_bytes());
                        w.write_all(&reply)?;
                    }
                    None => w.write_all(&[1])?,
                }
            }

            // iterinit
            0x50 => {
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                cursor = store.lock().unwrap().keys().cloned().collect();
                cursor_pos = 0;
                w.write_all(&[0])?;
            }

            // iternext -> status, klen, key; exhaustion is status 1
            0x51 => {
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                if cursor_pos < cursor.len() {
                    let key = &cursor[cursor_pos];
                    cursor_pos += 1;
                    let mut reply = vec![0u8];
                    put_record(&mut reply, key);
                    w.write_all(&reply)?;
                } else {
                    w.write_all(&[1])?;
                }
            }

            // fwmkeys: plen, max, prefix -> status, count, then per key: len, key
            0x58 => {
                let plen = read_u32(&mut r)? as usize;
                let max = read_u32(&mut r)? as usize;
                let prefix = read_bytes(&mut r, plen)?;
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                let store = store.lock().unwrap();
                let matches: Vec<_> = store
                    .keys()
                    .filter(|k| k.starts_with(&prefix))
                    .take(max)
                    .cloned()
                    .collect();
                let mut reply = vec![0u8];
                reply.extend_from_slice(&(matches.len() as u32).to_be_bytes());
                for key in matches {
                    put_record(&mut reply, &key);
                }
                w.write_all(&reply)?;
            }

            // ext: flen, opts, klen, vlen, func, key, value -> status, rlen, result
            0x68 => {
                let flen = read_u32(&mut r)? as usize;
                let _opts = read_u32(&mut r)?;
                let klen = read_u32(&mut r)? as usize;
                let vlen = read_u32(&mut r)? as usize;
                let func = read_bytes(&mut r, flen)?;
                let _key = read_bytes(&mut r, klen)?;
                let value = read_bytes(&mut r, vlen)?;
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                // One built-in test function; anything else is unknown.
                if func == b"echo" {
                    let mut reply = vec![0u8];
                    put_record(&mut reply, &value);
                    w.write_all(&reply)?;
                } else {
                    w.write_all(&[1])?;
                }
            }

            // sync
            0x70 => {
                let status = forced(&faults, op).unwrap_or(0);
                w.write_all(&[status])?;
            }

            // vanish
            0x71 => {
                let status = forced(&faults, op).unwrap_or_else(|| {
                    store.lock().unwrap().clear();
                    0
                });
                w.write_all(&[status])?;
            }

            // copy: plen, path
            0x72 => {
                let path = read_record(&mut r)?;
                let status = forced(&faults, op).unwrap_or(u8::from(path.is_empty()));
                w.write_all(&[status])?;
            }

            // restore: plen, ts(u64), path
            0x73 => {
                let plen = read_u32(&mut r)? as usize;
                let _ts = read_u64(&mut r)?;
                let path = read_bytes(&mut r, plen)?;
                let status = forced(&faults, op).unwrap_or(u8::from(path.is_empty()));
                w.write_all(&[status])?;
            }

            // setmst: hlen, port(u32), host
            0x78 => {
                let hlen = read_u32(&mut r)? as usize;
                let _port = read_u32(&mut r)?;
                let _host = read_bytes(&mut r, hlen)?;
                let status = forced(&faults, op).unwrap_or(0);
                w.write_all(&[status])?;
            }

            // rnum -> status, u64
            0x80 => {
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                let n = store.lock().unwrap().len() as u64;
                let mut reply = vec![0u8];
                reply.extend_from_slice(&n.to_be_bytes());
                w.write_all(&reply)?;
            }

            // size -> status, u64
            0x81 => {
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                let store = store.lock().unwrap();
                let bytes: u64 = store.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum();
                let mut reply = vec![0u8];
                reply.extend_from_slice(&bytes.to_be_bytes());
                w.write_all(&reply)?;
            }

            // stat -> status, len, blob
            0x88 => {
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                let n = store.lock().unwrap().len();
                let blob = format!("rnum\t{n}\nsize\t{}\nversion\t1.1.41\n", n * 16);
                let mut reply = vec![0u8];
                put_record(&mut reply, blob.as_bytes());
                w.write_all(&reply)?;
            }

            // misc: flen, opts, argc, func, then per arg: len, arg
            // reply: status, count, then per record: len, record
            0x90 => {
                let flen = read_u32(&mut r)? as usize;
                let _opts = read_u32(&mut r)?;
                let argc = read_u32(&mut r)? as usize;
                let func = read_bytes(&mut r, flen)?;
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(read_record(&mut r)?);
                }
                if let Some(code) = forced(&faults, op) {
                    w.write_all(&[code])?;
                    continue;
                }
                match func.as_slice() {
                    b"putlist" => {
                        let mut store = store.lock().unwrap();
                        let mut args = args.into_iter();
                        while let (Some(key), Some(value)) = (args.next(), args.next()) {
                            store.insert(key, value);
                        }
                        w.write_all(&[0, 0, 0, 0, 0])?; // status + zero records
                    }
                    b"outlist" => {
                        let mut store = store.lock().unwrap();
                        for key in &args {
                            store.remove(key);
                        }
                        w.write_all(&[0, 0, 0, 0, 0])?;
                    }
                    b"getlist" => {
                        let store = store.lock().unwrap();
                        let mut records = Vec::new();
                        for key in &args {
                            if let Some(value) = store.get(key) {
                                records.push(key.clone());
                                records.push(value.clone());
                            }
                        }
                        let mut reply = vec![0u8];
                        reply.extend_from_slice(&(records.len() as u32).to_be_bytes());
                        for record in records {
                            put_record(&mut reply, &record);
                        }
                        w.write_all(&reply)?;
                    }
                    _ => w.write_all(&[1])?,
                }
            }

            _ => return Ok(()), // unknown opcode: drop the connection
        }
    }
}

// =============================================================================
// Wire helpers
// =============================================================================

fn forced(faults: &Faults, op: u8) -> Option<u8> {
    faults.lock().unwrap().get(&op).copied().filter(|&c| c != 0)
}

fn read_u32(r: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_bytes(r: &mut impl Read, n: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_record(r: &mut impl Read) -> std::io::Result<Vec<u8>> {
    let n = read_u32(r)? as usize;
    read_bytes(r, n)
}

fn read_kv(r: &mut impl Read) -> std::io::Result<(Vec<u8>, Vec<u8>)> {
    let klen = read_u32(r)? as usize;
    let vlen = read_u32(r)? as usize;
    let key = read_bytes(r, klen)?;
    let value = read_bytes(r, vlen)?;
    Ok((key, value))
}

fn put_record(buf: &mut Vec<u8>, record: &[u8]) {
    buf.extend_from_slice(&(record.len() as u32).to_be_bytes());
    buf.extend_from_slice(record);
}
