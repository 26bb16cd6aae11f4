//! Sortable unique identifiers
//!
//! Identifiers are ULIDs in their 26 character Crockford base32 form: a
//! 48-bit millisecond timestamp followed by 80 bits of entropy. A single
//! process-wide [`ulid::Generator`] keeps them monotonic, so identifiers
//! always compare greater than earlier ones as plain strings.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use ulid::{Generator, Ulid};

/// Encoded identifier length
pub const ID_LEN: usize = 26;

struct IdState {
    generator: Generator,
    last: Ulid,
}

static STATE: LazyLock<Mutex<IdState>> = LazyLock::new(|| {
    Mutex::new(IdState {
        generator: Generator::new(),
        last: Ulid::nil(),
    })
});

/// Entropy for the millisecond after the last identifier when the
/// generator cannot produce a greater one.
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new identifier.
pub fn new_id() -> String {
    next_ulid().to_string()
}

fn next_ulid() -> Ulid {
    let mut state = STATE.lock();
    let id = match state.generator.generate() {
        Ok(id) if id > state.last => id,
        Ok(_) => counter_after(state.last),
        Err(err) => {
            tracing::warn!(error = %err, "identifier entropy exhausted, using counter entropy");
            counter_after(state.last)
        }
    };
    state.last = id;
    id
}

fn counter_after(last: Ulid) -> Ulid {
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ulid::from_parts(last.timestamp_ms().saturating_add(1), u128::from(counter))
}

/// Millisecond timestamp embedded in an identifier, if it is well formed.
pub fn timestamp_ms(id: &str) -> Option<u64> {
    Ulid::from_string(id).ok().map(|ulid| ulid.timestamp_ms())
}
