//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// Joins the two user ids of a conversation key. User ids never contain it.
pub const PAIR_KEY_SEPARATOR: char = '_';

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new lowercase ULID.
    ///
    /// ULIDs sort by creation millisecond only; two ids minted in the same
    /// millisecond have no defined order.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an opaque bearer token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Canonical key for an unordered pair of user ids.
    ///
    /// `pair_key(a, b) == pair_key(b, a)` for all inputs. The key is only
    /// unique when neither id contains [`PAIR_KEY_SEPARATOR`].
    #[must_use]
    pub fn pair_key(&self, a: &str, b: &str) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("{low}{PAIR_KEY_SEPARATOR}{high}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_generate_token() {
        let token = IdGenerator::new().generate_token();
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let id_gen = IdGenerator::new();
        assert_eq!(id_gen.pair_key("bob", "alice"), "alice_bob");
        assert_eq!(id_gen.pair_key("alice", "bob"), "alice_bob");
    }
}
