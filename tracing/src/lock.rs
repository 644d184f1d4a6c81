//! Lock and condition variable wrappers measuring wait and hold times
use crate::event::{EventKind, IMPLICIT_UNLOCK_TAG, Subject};
use crate::logger::Logger;
use crate::time::elapsed_ms;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Guard returned by [`Logger::timed_lock`].
///
/// Releasing it, explicitly with [`TimedMutexGuard::unlock`] or by dropping it, records
/// `mutex_unlock <hold_ms>`.
pub struct TimedMutexGuard<'a, T> {
    logger: &'a Logger,
    subject: &'a Subject,
    guard: Option<MutexGuard<'a, T>>,
    acquired: Instant,
}

impl Logger {
    /// Locks the mutex and records `mutex_lock <wait_ms>`
    pub fn timed_lock<'a, T>(
        &'a self,
        subject: &'a Subject,
        mutex: &'a Mutex<T>,
    ) -> TimedMutexGuard<'a, T> {
        let begin = Instant::now();
        let guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);
        self.record_event(subject, EventKind::MutexLock, &elapsed_ms(begin).to_string());
        TimedMutexGuard {
            logger: self,
            subject,
            guard: Some(guard),
            acquired: Instant::now(),
        }
    }

    /// Waits on the condition variable.
    ///
    /// The wait releases the lock: the time held so far is recorded as an implicit
    /// unlock, the whole wait as `cond_wait_returned`, and hold time restarts when the
    /// wait returns.
    pub fn timed_condition_wait<'a, T>(
        &'a self,
        mut guard: TimedMutexGuard<'a, T>,
        condvar: &Condvar,
    ) -> TimedMutexGuard<'a, T> {
        let inner = guard.release_for_wait();
        let begin = Instant::now();
        let inner = condvar.wait(inner).unwrap_or_else(PoisonError::into_inner);
        self.record_event(
            guard.subject,
            EventKind::CondWaitReturned,
            &elapsed_ms(begin).to_string(),
        );
        guard.reacquired(inner);
        guard
    }

    /// Same as [`Logger::timed_condition_wait`] with a timeout, records
    /// `cond_timedwait_returned`. The flag is true when the wait timed out.
    pub fn timed_condition_timed_wait<'a, T>(
        &'a self,
        mut guard: TimedMutexGuard<'a, T>,
        condvar: &Condvar,
        timeout: Duration,
    ) -> (TimedMutexGuard<'a, T>, bool) {
        let inner = guard.release_for_wait();
        let begin = Instant::now();
        let (inner, wait_result) = condvar
            .wait_timeout(inner, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        self.record_event(
            guard.subject,
            EventKind::CondTimedwaitReturned,
            &elapsed_ms(begin).to_string(),
        );
        guard.reacquired(inner);
        (guard, wait_result.timed_out())
    }
}

impl<'a, T> TimedMutexGuard<'a, T> {
    /// Releases the lock, recording the hold time
    pub fn unlock(self) {
        drop(self);
    }

    fn release_for_wait(&mut self) -> MutexGuard<'a, T> {
        let payload = format!("{} {IMPLICIT_UNLOCK_TAG}", elapsed_ms(self.acquired));
        self.logger
            .record_event(self.subject, EventKind::MutexUnlock, &payload);
        match self.guard.take() {
            Some(inner) => inner,
            None => self
                .logger
                .fatal(&format!("{}: waiting without holding the lock", self.subject)),
        }
    }

    fn reacquired(&mut self, inner: MutexGuard<'a, T>) {
        self.guard = Some(inner);
        self.acquired = Instant::now();
    }
}

impl<T> Deref for TimedMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.guard {
            Some(guard) => &**guard,
            None => unreachable!("guard is only taken for the duration of a wait"),
        }
    }
}

impl<T> DerefMut for TimedMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.guard {
            Some(guard) => &mut **guard,
            None => unreachable!("guard is only taken for the duration of a wait"),
        }
    }
}

impl<T> Drop for TimedMutexGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            let hold_ms = elapsed_ms(self.acquired);
            drop(guard);
            self.logger
                .record_event(self.subject, EventKind::MutexUnlock, &hold_ms.to_string());
        }
    }
}
