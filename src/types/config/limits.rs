//! Queue and thread limit configuration types

use std::num::NonZeroUsize;

nonzero_newtype! {
    /// Maximum number of commands that may wait in one backend's queue
    ///
    /// The in-flight command does not count against this bound.
    ///
    /// # Examples
    /// ```
    /// use rcon_proxy::types::QueueDepth;
    ///
    /// let depth = QueueDepth::new(32).unwrap();
    /// assert_eq!(depth.get(), 32);
    ///
    /// // A zero-length queue would reject every command
    /// assert!(QueueDepth::new(0).is_none());
    /// ```
    #[doc(alias = "backlog")]
    pub struct QueueDepth(NonZeroUsize: usize, serialize as serialize_u64);
}

impl QueueDepth {
    /// Default per-backend queue depth
    pub const DEFAULT: Self =
        Self(NonZeroUsize::new(crate::constants::dispatcher::QUEUE_DEPTH).unwrap());
}

impl Default for QueueDepth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

nonzero_newtype! {
    /// A non-zero thread count
    ///
    /// Ensures thread pools always have at least 1 thread.
    pub struct ThreadCount(NonZeroUsize: usize, serialize as serialize_u64);
}

impl ThreadCount {
    /// Default thread count
    pub const DEFAULT: Self = Self(NonZeroUsize::new(1).unwrap());
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::str::FromStr for ThreadCount {
    type Err = std::num::ParseIntError;

    /// `0` selects one thread per available CPU core
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<usize>()?;
        if value == 0 {
            let cores = std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1);
            return Ok(Self::new(cores).unwrap_or(Self::DEFAULT));
        }
        Ok(Self::new(value).unwrap_or(Self::DEFAULT))
    }
}
