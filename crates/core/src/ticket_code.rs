//! Order ticket-code generation.
//!
//! Format: `TKT-<unix millis>-<suffix>`, where the suffix is
//! [`SUFFIX_LENGTH`] random upper-case alphanumerics. Uniqueness is enforced
//! by the `uq_orders_ticket_code` constraint, not by this generator.

use rand::Rng;

use crate::types::Timestamp;

/// Prefix shared by all ticket codes.
pub const PREFIX: &str = "TKT";

/// Number of random characters appended to the timestamp.
pub const SUFFIX_LENGTH: usize = 4;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a ticket code stamped with `now`.
pub fn generate_ticket_code(now: Timestamp) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{PREFIX}-{}-{suffix}", now.timestamp_millis())
}
