/// Owner of the single pending cache-expiry task.
///
/// `H` is a deferred-task handle that cancels its task when dropped
/// (`gloo_timers::callback::Timeout` in the browser). Scheduling a new expiry
/// drops the previous handle first, so at most one expiry is ever pending.
#[derive(Debug)]
pub struct ExpiryTimer<H> {
    pending: Option<(i64, H)>,
}

impl<H> Default for ExpiryTimer<H> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<H> ExpiryTimer<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is pending and track `handle` as firing at `expires_at`.
    pub fn replace(&mut self, expires_at: i64, handle: H) {
        self.cancel();
        self.pending = Some((expires_at, handle));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<i64> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Milliseconds from `now_ms` until `expires_at`, never negative.
pub fn delay_ms(expires_at: i64, now_ms: i64) -> u32 {
    (expires_at - now_ms).clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Handle(Rc<Cell<u32>>);

    impl Drop for Handle {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn replacing_cancels_previous_handle() {
        let cancelled = Rc::new(Cell::new(0));
        let mut timer = ExpiryTimer::new();

        timer.replace(100, Handle(cancelled.clone()));
        assert_eq!(cancelled.get(), 0);

        timer.replace(200, Handle(cancelled.clone()));
        assert_eq!(cancelled.get(), 1);
        assert_eq!(timer.deadline(), Some(200));

        timer.cancel();
        assert_eq!(cancelled.get(), 2);
        assert!(!timer.is_pending());
    }

    #[test]
    fn delay_never_negative() {
        assert_eq!(delay_ms(1_000, 400), 600);
        assert_eq!(delay_ms(1_000, 5_000), 0);
    }
}
