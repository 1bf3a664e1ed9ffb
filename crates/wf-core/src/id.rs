use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by node and connection IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter behind generated IDs (`node_0`, `conn_1`, ...).
static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an ID, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate an ID with the default prefix.
            pub fn generate() -> Self {
                Self::with_prefix($prefix)
            }

            /// Generate an ID with a custom prefix (e.g. `action_12`).
            ///
            /// Unique among generated IDs only; callers that accept
            /// caller-supplied IDs must still check their store.
            pub fn with_prefix(prefix: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{prefix}_{n}"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::intern(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Interned identifier of a workflow node. 4 bytes, `Copy`, O(1) `Eq`/`Hash`.
    NodeId,
    "node"
);

interned_id!(
    /// Interned identifier of a connection between two nodes.
    ConnectionId,
    "conn"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("fetch_users");
        let b = NodeId::intern("fetch_users");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "fetch_users");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("node_"));

        let c = ConnectionId::generate();
        assert!(c.as_str().starts_with("conn_"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ConnectionId::intern("edge-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"edge-1\"");
        let back: ConnectionId = serde_json::from_str("\"edge-1\"").unwrap();
        assert_eq!(back, id);
    }
}
