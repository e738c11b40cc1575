use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal, polled by every blocking primitive.
pub trait AbortSource: Send + Sync {
    fn should_abort(&self) -> bool;
}

/// Never aborts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAbort;

impl AbortSource for NoAbort {
    fn should_abort(&self) -> bool {
        false
    }
}

/// Programmatically settable flag; clones share state. The panic-key
/// listener raises the same flag.
#[derive(Debug, Default, Clone)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn shared(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl AbortSource for AbortFlag {
    fn should_abort(&self) -> bool {
        self.is_set()
    }
}

/// Engine-wide abort: the local flag or an external source.
#[derive(Clone)]
pub struct Abort {
    flag: AbortFlag,
    external: Arc<dyn AbortSource>,
}

impl Abort {
    pub fn new(flag: AbortFlag, external: Arc<dyn AbortSource>) -> Self {
        Self { flag, external }
    }

    pub fn flag(&self) -> &AbortFlag {
        &self.flag
    }
}

impl Default for Abort {
    fn default() -> Self {
        Self::new(AbortFlag::new(), Arc::new(NoAbort))
    }
}

impl AbortSource for Abort {
    fn should_abort(&self) -> bool {
        self.flag.is_set() || self.external.should_abort()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always;
    impl AbortSource for Always {
        fn should_abort(&self) -> bool {
            true
        }
    }

    #[test]
    fn flag_clones_share_state() {
        let a = AbortFlag::new();
        let b = a.clone();
        assert!(!b.should_abort());
        a.set();
        assert!(b.should_abort());
        b.clear();
        assert!(!a.is_set());
    }

    #[test]
    fn abort_combines_sources() {
        let flag = AbortFlag::new();
        let quiet = Abort::new(flag.clone(), Arc::new(NoAbort));
        assert!(!quiet.should_abort());
        flag.set();
        assert!(quiet.should_abort());

        let loud = Abort::new(AbortFlag::new(), Arc::new(Always));
        assert!(loud.should_abort());
    }
}
