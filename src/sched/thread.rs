/*
 * Thread control blocks.
 *
 * One fixed-size pool slot per thread. A slot records everything the
 * scheduler needs to enter, suspend, resume and eventually reclaim a
 * thread, including the two continuations that make the shared-stack
 * model work: the resume point inside the thread and the scheduler-side
 * entry frame its stack region unwinds back to.
 */

use core::ffi::c_void;

use crate::arch::JumpContext;

#[cfg(any(feature = "idle", feature = "yield-after", feature = "wait"))]
use crate::tick::Tick;

#[cfg(feature = "wait")]
use super::wait::SemId;

/// Thread entry routine. Receives the opaque argument given at spawn
/// time; returning from it terminates the thread.
pub type ThreadProc = fn(*mut c_void);

/// Lifecycle of a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ThreadState {
    /// Slot unoccupied. The default value.
    #[default]
    Empty,
    /// Registered; stack not yet reserved, procedure not yet entered.
    New,
    /// Started and runnable.
    Run,
    /// Procedure returned, but the stack region still sits beneath a
    /// deeper active thread's region and cannot be reclaimed yet.
    Hole,
    /// Sleeping until its wake-up tick.
    #[cfg(feature = "idle")]
    Idle,
    /// Blocked on a semaphore id.
    #[cfg(feature = "wait")]
    Wait,
}

impl ThreadState {
    /// Started threads own a live stack region: running, sleeping or
    /// waiting, but not holes and not threads that have yet to enter.
    pub(crate) fn is_started(self) -> bool {
        match self {
            ThreadState::Run => true,
            #[cfg(feature = "idle")]
            ThreadState::Idle => true,
            #[cfg(feature = "wait")]
            ThreadState::Wait => true,
            _ => false,
        }
    }
}

#[cfg(feature = "wait")]
bitflags::bitflags! {
    /// Wait bookkeeping bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct WaitFlags: u8 {
        /// A notify targeted this thread.
        const NOTIFIED = 1 << 0;
        /// Wait forever; the deadline does not apply.
        const INFINITE = 1 << 1;
    }
}

/// One slot of the thread pool.
pub(crate) struct Tcb {
    /// Entry routine. Present from registration until the slot empties.
    pub(crate) proc: Option<ThreadProc>,
    /// Optional display name.
    pub(crate) name: Option<&'static str>,
    /// Stack reservation in bytes.
    pub(crate) stack_sz: usize,
    /// Opaque argument handed to the routine.
    pub(crate) arg: *mut c_void,
    pub(crate) state: ThreadState,
    /// Tick the thread sleeps up to.
    #[cfg(feature = "idle")]
    pub(crate) idle_to: Tick,
    /// Tick at which the scheduler last handed control to the thread.
    #[cfg(feature = "yield-after")]
    pub(crate) switch_tick: Tick,
    /// Semaphore id being waited on.
    #[cfg(feature = "wait")]
    pub(crate) sem_id: SemId,
    /// Tick a timed wait expires at.
    #[cfg(feature = "wait")]
    pub(crate) wait_to: Tick,
    #[cfg(feature = "wait")]
    pub(crate) wait_flags: WaitFlags,
    /// 1-based ordinal of this thread's stack region counted from the
    /// deepest one. 0 until the region is reserved.
    pub(crate) depth: usize,
    /// Resume point inside the thread: its most recent yield.
    pub(crate) exe_ctx: JumpContext,
    /// Scheduler-side entry frame, the unwind target when this thread's
    /// region is reclaimed.
    pub(crate) entry_ctx: JumpContext,
}

impl Tcb {
    pub(crate) const EMPTY: Tcb = Tcb {
        proc: None,
        name: None,
        stack_sz: 0,
        arg: core::ptr::null_mut(),
        state: ThreadState::Empty,
        #[cfg(feature = "idle")]
        idle_to: 0,
        #[cfg(feature = "yield-after")]
        switch_tick: 0,
        #[cfg(feature = "wait")]
        sem_id: 0,
        #[cfg(feature = "wait")]
        wait_to: 0,
        #[cfg(feature = "wait")]
        wait_flags: WaitFlags::empty(),
        depth: 0,
        exe_ctx: JumpContext::EMPTY,
        entry_ctx: JumpContext::EMPTY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default_state() {
        assert_eq!(ThreadState::default(), ThreadState::Empty);
        assert_eq!(Tcb::EMPTY.state, ThreadState::Empty);
        assert_eq!(Tcb::EMPTY.depth, 0);
    }

    #[test]
    fn test_started_states() {
        assert!(ThreadState::Run.is_started());
        assert!(!ThreadState::Empty.is_started());
        assert!(!ThreadState::New.is_started());
        assert!(!ThreadState::Hole.is_started());
        #[cfg(feature = "idle")]
        assert!(ThreadState::Idle.is_started());
        #[cfg(feature = "wait")]
        assert!(ThreadState::Wait.is_started());
    }
}
