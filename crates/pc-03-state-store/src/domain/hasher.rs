//! # State Hasher
//!
//! The app hash returned to consensus on every commit.
//!
//! ## Projection
//!
//! The hash covers a canonical byte projection of the state, not its JSON
//! rendering. Every field is written big-endian; variable-length values are
//! prefixed with their length as a `u32`.
//!
//! ```text
//! "pc-state-v1"
//! round        number | startsAt | endsAt | limit
//! posters      count | (address | balance | orderLimit | streamLimit)*
//! events       count | (block | len id | id | subject | type | address
//!                       | amount | len key | key | conf | voter*)*
//! lastEvent    add | remove | count | (len id | id)* | count | (len id | id)*
//! orderCounter
//! lastBlockHeight
//! previous app hash
//! ```
//!
//! Maps are iterated in key order, so two replicas holding equal states
//! always produce equal bytes.

use super::entities::State;
use sha2::{Digest, Sha256};
use shared_types::{Hash, StakeKind, StakeSubject, U256};

const DOMAIN_TAG: &[u8] = b"pc-state-v1";

struct Projection(Vec<u8>);

impl Projection {
    fn u64(&mut self, value: u64) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    fn u256(&mut self, value: &U256) {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.0.extend_from_slice(&bytes);
    }

    fn bytes(&mut self, value: &[u8]) {
        // Ids and keys are far below 4 GiB.
        self.0.extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.0.extend_from_slice(value);
    }

    fn fixed(&mut self, value: &[u8]) {
        self.0.extend_from_slice(value);
    }

    fn tag(&mut self, value: u8) {
        self.0.push(value);
    }
}

/// Canonical bytes the state hash is computed over.
pub fn hash_projection(state: &State) -> Vec<u8> {
    let mut out = Projection(Vec::with_capacity(256));
    out.fixed(DOMAIN_TAG);

    let round = &state.round;
    out.u64(round.number);
    out.u64(round.starts_at);
    out.u64(round.ends_at);
    out.u64(round.limit);

    out.u64(state.posters.len() as u64);
    for (address, poster) in &state.posters {
        out.fixed(address.as_bytes());
        out.u256(&poster.balance);
        out.u64(poster.order_limit);
        out.u64(poster.stream_limit);
    }

    out.u64(state.events.len() as u64);
    for (block, id, event) in state.events.iter() {
        out.u64(block);
        out.bytes(id.as_bytes());
        out.tag(match event.subject {
            StakeSubject::Poster => 0,
            StakeSubject::Validator => 1,
        });
        out.tag(match event.kind {
            StakeKind::Add => 0,
            StakeKind::Remove => 1,
        });
        out.fixed(event.address.as_bytes());
        out.u256(&event.amount);
        out.bytes(event.public_key.as_deref().unwrap_or_default().as_bytes());
        out.u64(event.conf);
        for voter in &event.voters {
            out.fixed(voter.as_bytes());
        }
    }

    let last = &state.last_event;
    out.u64(last.add);
    out.u64(last.remove);
    for applied in [&last.applied_add, &last.applied_remove] {
        out.u64(applied.len() as u64);
        for id in applied {
            out.bytes(id.as_bytes());
        }
    }
    out.u64(state.order_counter);
    out.u64(state.last_block_height);
    out.fixed(&state.last_block_app_hash);

    out.0
}

/// SHA-256 of [`hash_projection`].
pub fn compute_state_hash(state: &State) -> Hash {
    Sha256::digest(hash_projection(state)).into()
}
