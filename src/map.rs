//! Map-style facade over the command set
//!
//! [`TyrantMap`] gives the remote keyspace mapping semantics: reads return
//! `Option`, deletes of absent keys fail with
//! [`KeyNotFound`](crate::error::TyrantError::KeyNotFound), iteration is an
//! ordinary `Iterator`. The facade recognizes exactly one server status
//! (the stock failure code) and rewrites it per operation; every other code
//! and every transport failure passes through untouched, keeping the wire
//! and container error taxonomies distinct.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;

use crate::client::Tyrant;
use crate::config::Config;
use crate::error::{Result, TyrantError};
use crate::protocol::{ExtOpts, MiscOpts, STATUS_ERR};

/// The one status code the facade is allowed to reinterpret.
fn is_miss(err: &TyrantError) -> bool {
    matches!(err, TyrantError::Server { code: STATUS_ERR })
}

/// Mapping facade over one connection
pub struct TyrantMap<S: Read + Write> {
    db: Tyrant<S>,
}

impl TyrantMap<TcpStream> {
    /// Connect and wrap the connection in the facade.
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(Tyrant::connect(config)?))
    }

    /// Shut down the underlying socket.
    pub fn close(self) -> Result<()> {
        self.db.close()
    }
}

impl<S: Read + Write> TyrantMap<S> {
    /// Wrap an existing client
    pub fn new(db: Tyrant<S>) -> Self {
        Self { db }
    }

    /// The raw command set, for operations the facade does not cover
    pub fn db(&mut self) -> &mut Tyrant<S> {
        &mut self.db
    }

    // -------------------------------------------------------------------------
    // Point operations
    // -------------------------------------------------------------------------

    /// Whether a key is present.
    pub fn contains_key(&mut self, key: impl AsRef<[u8]>) -> Result<bool> {
        match self.db.vsiz(key) {
            Ok(_) => Ok(true),
            Err(e) if is_miss(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The value stored under key, or `None` if absent.
    pub fn get(&mut self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        match self.db.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_miss(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Store value under key, replacing any existing value.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.db.put(key, value)
    }

    /// Store value under key only if the key is absent.
    ///
    /// Fails with [`KeyExists`](TyrantError::KeyExists) when the key is
    /// already present; the stored value is left untouched.
    pub fn insert_new(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        match self.db.putkeep(key, value) {
            Ok(()) => Ok(()),
            Err(e) if is_miss(&e) => Err(TyrantError::KeyExists),
            Err(e) => Err(e),
        }
    }

    /// Remove a key.
    ///
    /// Fails with [`KeyNotFound`](TyrantError::KeyNotFound) when the key is
    /// absent; a successful return means the key existed and is now gone.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        match self.db.out(key) {
            Ok(()) => Ok(()),
            Err(e) if is_miss(&e) => Err(TyrantError::KeyNotFound),
            Err(e) => Err(e),
        }
    }

    /// Insert value if the key is absent; return the value now stored under
    /// the key either way.
    pub fn get_or_insert(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<Vec<u8>> {
        let key = key.as_ref();
        match self.insert_new(key, value.as_ref()) {
            Ok(()) => Ok(value.as_ref().to_vec()),
            Err(TyrantError::KeyExists) => match self.get(key)? {
                Some(existing) => Ok(existing),
                // Removed between the putkeep and the get.
                None => Err(TyrantError::KeyNotFound),
            },
            Err(e) => Err(e),
        }
    }

    /// Byte length of the value under key, or `None` if absent.
    pub fn value_size(&mut self, key: impl AsRef<[u8]>) -> Result<Option<u32>> {
        match self.db.vsiz(key) {
            Ok(len) => Ok(Some(len)),
            Err(e) if is_miss(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Append to the value under key; with `width`, keep only the trailing
    /// `width` bytes afterwards.
    pub fn concat(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        width: Option<u32>,
    ) -> Result<()> {
        match width {
            None => self.db.putcat(key, value),
            Some(width) => self.db.putshl(key, value, width),
        }
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// Lazy iteration over all keys.
    ///
    /// Resets the connection's cursor, then yields keys one `iternext` at a
    /// time. The handle borrows the map mutably, so no other command can
    /// interleave and move the cursor while the iteration is alive. The
    /// sequence is single-pass and non-restartable: drop the handle and call
    /// `iter` again to start over.
    pub fn iter(&mut self) -> Result<KeyIter<'_, S>> {
        self.db.iterinit()?;
        Ok(KeyIter {
            db: &mut self.db,
            done: false,
        })
    }

    /// All keys, materialized.
    pub fn keys(&mut self) -> Result<Vec<Vec<u8>>> {
        self.iter()?.collect()
    }

    /// Up to `max_keys` keys beginning with `prefix`; `None` means no limit
    /// beyond the current record count.
    pub fn prefix_keys(
        &mut self,
        prefix: impl AsRef<[u8]>,
        max_keys: Option<u32>,
    ) -> Result<Vec<Vec<u8>>> {
        let max = match max_keys {
            Some(n) => n,
            None => u32::try_from(self.db.rnum()?).unwrap_or(u32::MAX),
        };
        self.db.fwmkeys(prefix, max)
    }

    // -------------------------------------------------------------------------
    // Whole-keyspace operations
    // -------------------------------------------------------------------------

    /// Number of records.
    pub fn len(&mut self) -> Result<u64> {
        self.db.rnum()
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every record.
    pub fn clear(&mut self) -> Result<()> {
        self.db.vanish()
    }

    /// Force a durability flush on the server.
    pub fn sync(&mut self) -> Result<()> {
        self.db.sync()
    }

    // -------------------------------------------------------------------------
    // Batch operations
    // -------------------------------------------------------------------------

    /// Store every (key, value) pair from `pairs` in one round trip.
    pub fn extend<K, V, I>(&mut self, pairs: I) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut args: Vec<Vec<u8>> = Vec::new();
        for (key, value) in pairs {
            args.push(key.as_ref().to_vec());
            args.push(value.as_ref().to_vec());
        }
        self.db.misc("putlist", MiscOpts::NONE, &args)?;
        Ok(())
    }

    /// Fetch the (key, value) pairs for the subset of `keys` that exist.
    ///
    /// Absent keys are omitted and the order is the server's; the result can
    /// be shorter than `keys` and must not be matched up positionally.
    pub fn multi_get<K: AsRef<[u8]>>(
        &mut self,
        keys: &[K],
        opts: MiscOpts,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let records = self.db.misc("getlist", opts, keys)?;
        if records.len() % 2 != 0 {
            return Err(TyrantError::Protocol(format!(
                "getlist returned {} records, expected key/value pairs",
                records.len()
            )));
        }
        let mut pairs = Vec::with_capacity(records.len() / 2);
        let mut records = records.into_iter();
        while let (Some(key), Some(value)) = (records.next(), records.next()) {
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    /// Store every (key, value) pair in one round trip.
    pub fn multi_set<K, V>(&mut self, items: &[(K, V)], opts: MiscOpts) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut args: Vec<Vec<u8>> = Vec::with_capacity(items.len() * 2);
        for (key, value) in items {
            args.push(key.as_ref().to_vec());
            args.push(value.as_ref().to_vec());
        }
        self.db.misc("putlist", opts, &args)?;
        Ok(())
    }

    /// Remove every key in `keys` in one round trip; absent keys are ignored.
    pub fn multi_del<K: AsRef<[u8]>>(&mut self, keys: &[K], opts: MiscOpts) -> Result<()> {
        self.db.misc("outlist", opts, keys)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Server-side functions and statistics
    // -------------------------------------------------------------------------

    /// Call the server-side function `func(key, value)`.
    pub fn call(
        &mut self,
        func: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        record_lock: bool,
        global_lock: bool,
    ) -> Result<Vec<u8>> {
        let mut opts = ExtOpts::NONE;
        if record_lock {
            opts = opts | ExtOpts::LOCK_RECORD;
        }
        if global_lock {
            opts = opts | ExtOpts::LOCK_GLOBAL;
        }
        self.db.ext(func, opts, key, value)
    }

    /// Server statistics, parsed from the `stat` blob.
    pub fn stats(&mut self) -> Result<HashMap<String, String>> {
        let blob = self.db.stat()?;
        parse_stats(&blob)
    }
}

/// Split a stat blob into its `key<TAB>value` lines. Blank lines are
/// ignored; a non-empty line without a separator is corruption, not noise.
fn parse_stats(blob: &[u8]) -> Result<HashMap<String, String>> {
    let text = std::str::from_utf8(blob)
        .map_err(|_| TyrantError::Protocol("stat blob is not valid UTF-8".to_string()))?;
    let mut stats = HashMap::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        match line.split_once('\t') {
            Some((key, value)) => {
                stats.insert(key.to_string(), value.to_string());
            }
            None => {
                return Err(TyrantError::Protocol(format!(
                    "stat line without tab separator: {line:?}"
                )))
            }
        }
    }
    Ok(stats)
}

/// Lazy key iterator borrowing the map for its lifetime
///
/// Yields `Ok(key)` until the server reports end-of-iteration, which ends
/// the sequence cleanly. A genuine fault is yielded once as `Err` and the
/// iterator is fused afterwards.
pub struct KeyIter<'a, S: Read + Write> {
    db: &'a mut Tyrant<S>,
    done: bool,
}

impl<S: Read + Write> Iterator for KeyIter<'_, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.db.iternext() {
            Ok(Some(key)) => Some(Ok(key)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
