//! Read consistency levels and routing targets.
//!
//! | Consistency | Routed to | Cache | Use case |
//! |-------------|-----------|-------|----------|
//! | **Eventual** | replica (primary on fail-over) | read-through | list, search, plain reads |
//! | **ReadYourWrites** | primary | bypassed | single-key read right after a write in the same flow |
//!
//! Read-your-writes only holds inside one logical flow that asks for it. Two
//! independent requests get no such guarantee: a read on another request may
//! hit a replica that has not caught up yet, or a cached page from before the
//! write, for up to one TTL.

/// Consistency requested by a read.
///
/// ```
/// use catalog_cache::strategy::ReadConsistency;
///
/// assert_eq!(ReadConsistency::default(), ReadConsistency::Eventual);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReadConsistency {
    /// Any store copy may answer; cached values are acceptable.
    #[default]
    Eventual,

    /// Must observe every write committed earlier in this flow.
    ///
    /// Flow:
    /// 1. Skip the cache
    /// 2. Read the primary
    /// 3. Do not populate the cache (the caller already has fresh data)
    ReadYourWrites,
}

impl std::fmt::Display for ReadConsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadConsistency::Eventual => write!(f, "Eventual"),
            ReadConsistency::ReadYourWrites => write!(f, "ReadYourWrites"),
        }
    }
}

/// Which store handle serves a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Primary,
    Replica,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Primary => write!(f, "primary"),
            Route::Replica => write!(f, "replica"),
        }
    }
}
