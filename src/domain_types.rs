//! Strongly-typed domain values used throughout the broker and component
//! runtime, following the validated-newtype style of the router's own
//! domain types: construction can fail, and once constructed a value is
//! known-good for the lifetime of the program.

use nutype::nutype;
use uuid::Uuid;

/// The floor enforced on [`MaxBufferSize`] regardless of configured value.
pub const MIN_BUFFER_SIZE: usize = 100;

/// Upper bound on a single component's buffered backlog for one outbound
/// peer. Values below [`MIN_BUFFER_SIZE`] are clamped up, never rejected —
/// a broker is always usable, just not necessarily as small as asked.
#[nutype(
    validate(greater_or_equal = 1),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsRef)
)]
pub struct MaxBufferSize(usize);

impl MaxBufferSize {
    /// Builds a buffer size, clamping anything below [`MIN_BUFFER_SIZE`] up
    /// to the floor rather than failing construction.
    #[must_use]
    pub fn clamped(requested: usize) -> Self {
        let value = requested.max(MIN_BUFFER_SIZE);
        Self::try_new(value).unwrap_or_else(|_| {
            Self::try_new(MIN_BUFFER_SIZE).expect("floor is always valid")
        })
    }
}

impl Default for MaxBufferSize {
    fn default() -> Self {
        Self::clamped(MIN_BUFFER_SIZE)
    }
}

/// How often the [`crate::resilience::ResilienceService`] flush timer fires.
#[nutype(
    validate(greater_or_equal = 1),
    default = 10,
    derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRef)
)]
pub struct FlushIntervalSecs(u64);

/// Declared-but-unenforced redundancy target for a future resend
/// controller (see Open Question 4): the ratio of messages expected to be
/// re-sent under steady load.
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    default = 0.01,
    derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize, AsRef)
)]
pub struct RedundancyTarget(f64);

/// Loop cap a component runs before terminating. Production components use
/// [`MessageCap::unbounded`]; tests supply a finite budget for determinism.
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRef))]
pub struct MessageCap(usize);

impl MessageCap {
    /// A cap that is never reached in practice.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Whether `completed` iterations have exhausted this cap.
    #[must_use]
    pub fn exhausted(self, completed: usize) -> bool {
        completed >= self.into_inner()
    }
}

impl Default for MessageCap {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A non-empty component identity, used as router-frame peer identity and
/// in logging/framing. Opaque beyond "not empty" per spec.
#[nutype(
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, AsRef, Display)
)]
pub struct ComponentName(String);

/// A key into the process [`crate::cache::Cache`]. Stash keys are minted
/// fresh per message; user-supplied cache keys arrive via `PalmMessage.cache`.
#[nutype(
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display)
)]
pub struct CacheKey(String);

impl CacheKey {
    /// Mints a fresh, collision-resistant key the way the broker does at
    /// ingress and the cache service does for keyless `set`.
    #[must_use]
    pub fn generate() -> Self {
        Self::try_new(Uuid::new_v4().to_string()).expect("uuid string is never empty")
    }

    /// Namespaces this key under a component name, keeping envelope-stash
    /// keys out of the user-set key space (§9 re-architecture guidance).
    #[must_use]
    pub fn namespaced(component: &ComponentName, raw: &str) -> Self {
        Self::try_new(format!("{component}:{raw}")).expect("namespaced key is never empty")
    }
}

/// The `"<server>.<method>"` function selector on a [`crate::wire::PalmMessage`].
#[nutype(validate(not_empty), derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display))]
pub struct FunctionName(String);

impl FunctionName {
    /// Splits `"server.method"` into its two parts, the static-dispatch
    /// replacement for the original's `function.split('.')` + `getattr`.
    #[must_use]
    pub fn split_once(&self) -> Option<(&str, &str)> {
        self.as_ref().split_once('.')
    }

    /// The method half, used by [`crate::cache_service::CacheService`] to
    /// decode the operation out of a `"<anything>.<op>"` selector.
    #[must_use]
    pub fn method(&self) -> &str {
        self.split_once().map_or(self.as_ref(), |(_, m)| m)
    }
}
