//! Incremental recomputation primitives
//!
//! The layout pipeline is a small dependency graph: inputs carry a version
//! stamp, derived values remember the version key they were computed from
//! and recompute on demand. One invalidation, one atomic downstream pass;
//! nothing hides in global mutable state.

/// A versioned input cell. Every write bumps the version.
#[derive(Debug, Clone)]
pub struct Input<T> {
    value: T,
    version: u64,
}

impl<T> Input<T> {
    pub fn new(value: T) -> Self {
        Self { value, version: 1 }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.version += 1;
    }

    /// Mutate in place; counts as a write
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.version += 1;
    }

    /// Mark dirty without changing the value (external state changed
    /// underneath, e.g. the host's wrap geometry)
    pub fn touch(&mut self) {
        self.version += 1;
    }
}

/// A derived value memoized on the version key of the inputs it consumed.
#[derive(Debug, Clone, Default)]
pub struct Memo<K, T> {
    cached: Option<(K, T)>,
}

impl<K: PartialEq, T> Memo<K, T> {
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Pull the value, recomputing only when the key moved.
    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> T) -> &T {
        let fresh = matches!(&self.cached, Some((k, _)) if *k == key);
        if !fresh {
            self.cached = Some((key, compute()));
        }
        &self.cached.as_ref().unwrap().1
    }

    /// Whether the cached value was computed from exactly this key
    pub fn is_fresh(&self, key: &K) -> bool {
        matches!(&self.cached, Some((k, _)) if k == key)
    }

    /// Store a value computed outside `get_or_compute` (callers that need
    /// to borrow other graph state while computing)
    pub fn store(&mut self, key: K, value: T) {
        self.cached = Some((key, value));
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn peek(&self) -> Option<&T> {
        self.cached.as_ref().map(|(_, v)| v)
    }
}

/// A value written during one pass and consumed on the next. Breaks the
/// layout ↔ overlay-width cycle: the producer publishes, the consumer sees
/// it at the start of its next pass, never synchronously.
#[derive(Debug, Clone)]
pub struct SideChannel<T> {
    current: T,
    pending: Option<T>,
    epoch: u64,
}

impl<T: PartialEq> SideChannel<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial,
            pending: None,
            epoch: 1,
        }
    }

    /// Queue a value produced mid-pass
    pub fn publish(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// Promote the queued value at the start of a pass. The epoch advances
    /// only when the value actually changed, so republishing the same value
    /// cannot ping-pong the graph.
    pub fn begin_pass(&mut self) -> &T {
        if let Some(pending) = self.pending.take() {
            if pending != self.current {
                self.current = pending;
                self.epoch += 1;
            }
        }
        &self.current
    }

    pub fn value(&self) -> &T {
        &self.current
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_versions_move_on_every_write() {
        let mut input = Input::new(3);
        let v0 = input.version();
        input.set(4);
        assert!(input.version() > v0);
        let v1 = input.version();
        input.touch();
        assert!(input.version() > v1, "touch marks dirty without a value");
        assert_eq!(*input.get(), 4);
    }

    #[test]
    fn test_memo_recomputes_only_on_key_change() {
        let mut runs = 0;
        let mut memo: Memo<(u64, u64), u32> = Memo::new();

        let a = *memo.get_or_compute((1, 1), || {
            runs += 1;
            42
        });
        assert_eq!(a, 42);
        let _ = *memo.get_or_compute((1, 1), || {
            runs += 1;
            42
        });
        assert_eq!(runs, 1, "same key must hit the cache");

        let _ = *memo.get_or_compute((1, 2), || {
            runs += 1;
            43
        });
        assert_eq!(runs, 2);
        assert_eq!(memo.peek(), Some(&43));
    }

    #[test]
    fn test_side_channel_value_lands_on_the_next_pass() {
        let mut channel = SideChannel::new(0.0_f64);
        let e0 = channel.epoch();

        channel.publish(120.0);
        assert_eq!(*channel.value(), 0.0, "published value is not read back mid-pass");

        assert_eq!(*channel.begin_pass(), 120.0);
        assert!(channel.epoch() > e0);
    }

    #[test]
    fn test_side_channel_ignores_republished_identical_value() {
        let mut channel = SideChannel::new(80.0_f64);
        channel.publish(80.0);
        let e0 = channel.epoch();
        channel.begin_pass();
        assert_eq!(channel.epoch(), e0, "identical value must not spin the graph");
    }
}
