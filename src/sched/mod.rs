/*
 * Scheduler core.
 *
 * A fixed pool of thread slots serviced in strict round-robin order by
 * `service()`. The distinctive part is where thread stacks live: all of
 * them are carved out of the single main stack. Entering a new thread
 * leaves the scheduler activation in place underneath it, and the
 * thread's first yield reserves its stack region and recursively
 * re-enters the service loop above the reservation. Suspension and
 * dispatch are non-local jumps between saved continuations; a returning
 * procedure either leaves a hole (its region pinned beneath a deeper
 * thread) or unwinds the main stack down to the next live entry frame.
 *
 * The scheduler state sits behind a spin mutex. Guards are held only for
 * short read/modify sequences and never across a capture or resume, so
 * the single execution unit cannot deadlock on it. Pointers into the
 * state handed to the jump primitives stay valid across unlocks because
 * the state is a static and never moves.
 */

#[cfg(feature = "idle")]
pub(crate) mod idle;
pub(crate) mod stack;
pub(crate) mod thread;
#[cfg(feature = "wait")]
pub(crate) mod wait;

use core::ffi::c_void;

use spin::Mutex;

use crate::arch::{JumpContext, capture, resume};
use crate::config::{DEFAULT_STACK_SIZE, MAX_THREADS, MIN_STACK_SIZE};
use thread::{Tcb, ThreadProc, ThreadState};

#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::platform::platform;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::tick::tick_reached;
#[cfg(feature = "yield-after")]
use crate::tick::Tick;
#[cfg(feature = "wait")]
use thread::WaitFlags;

/// Registration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// A caller-supplied argument violates a precondition.
    InvalidArg,
    /// Every pool slot is occupied.
    LimitReached,
}

/// Whole scheduler state. One instance exists per process.
pub(crate) struct SchedState {
    /// Slot currently being processed. Starts one step before slot 0 so
    /// the first round-robin advance lands on it.
    cur_thrd: usize,
    /// Occupied (non-empty) slots.
    busy_n: usize,
    /// Terminated threads still pinning their stack region.
    hole_n: usize,
    /// Sleeping threads.
    #[cfg(feature = "idle")]
    idle_n: usize,
    /// Stack regions currently carved out of the main stack.
    depth: usize,
    /// The scheduler's own resume point while a thread runs.
    exe_ctx: JumpContext,
    /// The thread pool.
    thrds: [Tcb; MAX_THREADS],
}

impl SchedState {
    const fn new() -> Self {
        SchedState {
            cur_thrd: usize::MAX,
            busy_n: 0,
            hole_n: 0,
            #[cfg(feature = "idle")]
            idle_n: 0,
            depth: 0,
            exe_ctx: JumpContext::EMPTY,
            thrds: [Tcb::EMPTY; MAX_THREADS],
        }
    }
}

// Slots carry raw argument pointers. They are only ever touched by the
// one execution unit driving the scheduler, under the lock.
unsafe impl Send for SchedState {}

static SCHED: Mutex<SchedState> = Mutex::new(SchedState::new());

/// Short scoped access to the scheduler state. Never nest calls, and
/// never capture or resume while inside.
pub(crate) fn with_sched<R>(f: impl FnOnce(&mut SchedState) -> R) -> R {
    f(&mut SCHED.lock())
}

/// Register a thread. The procedure is not entered until [`run`] reaches
/// the slot.
///
/// A `stack_sz` of 0 selects [`DEFAULT_STACK_SIZE`]; a nonzero size below
/// [`MIN_STACK_SIZE`] is rejected. `name` and `arg` are kept as given and
/// never interpreted.
pub fn spawn(
    proc: ThreadProc,
    name: Option<&'static str>,
    stack_sz: usize,
    arg: *mut c_void,
) -> Result<(), SchedError> {
    if stack_sz != 0 && stack_sz < MIN_STACK_SIZE {
        return Err(SchedError::InvalidArg);
    }

    with_sched(|s| {
        if s.busy_n >= MAX_THREADS {
            return Err(SchedError::LimitReached);
        }
        for i in 0..MAX_THREADS {
            if s.thrds[i].state == ThreadState::Empty {
                s.thrds[i] = Tcb::EMPTY;
                s.thrds[i].proc = Some(proc);
                s.thrds[i].name = name;
                s.thrds[i].stack_sz = if stack_sz == 0 {
                    DEFAULT_STACK_SIZE
                } else {
                    stack_sz
                };
                s.thrds[i].arg = arg;
                s.thrds[i].state = ThreadState::New;
                s.busy_n += 1;
                log::debug!("thread #{i} scheduled to run");
                break;
            }
        }
        Ok(())
    })
}

/// Name of the thread currently being serviced, if any.
pub fn current_name() -> Option<&'static str> {
    with_sched(|s| {
        if s.cur_thrd < MAX_THREADS {
            s.thrds[s.cur_thrd].name
        } else {
            None
        }
    })
}

/// Number of occupied pool slots: running, sleeping, waiting, not yet
/// started and hole threads alike.
pub fn active_threads() -> usize {
    with_sched(|s| s.busy_n)
}

/// Run the scheduler until no threads remain.
///
/// Returns once every registered thread has terminated and every stack
/// region has been reclaimed; the scheduler is then back in its initial
/// state, and registering threads afterwards starts fresh.
pub fn run() {
    service();
}

/// One scheduler activation.
///
/// The outermost call comes from [`run`]; recursive calls come from
/// first-yield stack reservation (`stack::reserve_and_service`). The
/// depth-1 entry frame always lives in the outermost activation, so only
/// the outermost activation can watch the pool drain to empty and reach
/// the reset at the bottom. Recursive activations are abandoned by the
/// unwind jumps instead of returning.
#[inline(never)]
pub(crate) fn service() {
    loop {
        let idx = with_sched(|s| {
            if s.busy_n == 0 {
                return None;
            }
            // Recursion re-enters this loop in a fresh frame, so the step
            // to the next slot happens at the top of the iteration, not
            // the bottom.
            s.cur_thrd = s.cur_thrd.wrapping_add(1) % MAX_THREADS;
            Some(s.cur_thrd)
        });
        let Some(idx) = idx else { break };

        #[cfg(feature = "idle")]
        idle::system_idle();

        dispatch(idx);
    }

    // Leave a clean scheduler behind for the next run.
    with_sched(|s| *s = SchedState::new());
}

/// Act on the slot the round-robin step landed on.
#[inline(never)]
fn dispatch(idx: usize) {
    let state = with_sched(|s| s.thrds[idx].state);

    match state {
        ThreadState::Empty | ThreadState::Hole => {}

        #[cfg(feature = "idle")]
        ThreadState::Idle => {
            let idle_to = with_sched(|s| s.thrds[idx].idle_to);
            if !tick_reached(platform().tick(), idle_to) {
                // other threads are runnable, so this one keeps sleeping
                return;
            }
            log::debug!("thread #{idx} IDLE -> RUN (scheduler visit)");
            with_sched(|s| {
                s.thrds[idx].state = ThreadState::Run;
                s.idle_n -= 1;
            });
            enter_running(idx);
        }

        #[cfg(feature = "wait")]
        ThreadState::Wait => {
            let (infinite, wait_to) = with_sched(|s| {
                let t = &s.thrds[idx];
                (t.wait_flags.contains(WaitFlags::INFINITE), t.wait_to)
            });
            if infinite || !tick_reached(platform().tick(), wait_to) {
                return;
            }
            log::debug!("thread #{idx} WAIT -> RUN (timed out)");
            with_sched(|s| s.thrds[idx].state = ThreadState::Run);
            enter_running(idx);
        }

        ThreadState::Run => enter_running(idx),

        ThreadState::New => enter_new(idx),
    }
}

/// Hand control to a started thread. Comes back on the thread's next
/// yield, or when a terminated thread's scheduler frame is restored on
/// top of a fresh hole.
#[inline(never)]
fn enter_running(idx: usize) {
    #[cfg(feature = "yield-after")]
    {
        let now = platform().tick();
        with_sched(|s| s.thrds[idx].switch_tick = now);
    }

    let (sched_ctx, thrd_ctx) = with_sched(|s| {
        (
            &mut s.exe_ctx as *mut JumpContext,
            &s.thrds[idx].exe_ctx as *const JumpContext,
        )
    });

    log::trace!("scheduler -> thread #{idx}");
    unsafe { jump_to(sched_ctx, thrd_ctx) };
    log::trace!("scheduler resumed from thread #{idx}");
}

/// First dispatch of a new thread. The entry continuation captured here
/// is where the main stack unwinds back to once this thread's region is
/// reclaimed.
#[inline(never)]
fn enter_new(idx: usize) {
    let entry_ctx = with_sched(|s| &mut s.thrds[idx].entry_ctx as *mut JumpContext);

    if unsafe { capture(entry_ctx) } != 0 {
        // the main stack was just unwound back to this frame
        log::trace!("scheduler stack unwound to thread #{idx} entry");
        return;
    }

    let (proc, arg, depth) = with_sched(|s| {
        s.depth += 1;
        s.thrds[idx].depth = s.depth;
        let t = &s.thrds[idx];
        (t.proc.expect("new thread without a procedure"), t.arg, s.depth)
    });

    #[cfg(feature = "yield-after")]
    {
        let now = platform().tick();
        with_sched(|s| s.thrds[idx].switch_tick = now);
    }

    log::debug!("thread #{idx} entering at depth {depth}");
    proc(arg);

    // The procedure returned. This runs on the terminated thread's entry
    // frame; finish_current never comes back here.
    finish_current()
}

/// Terminated-thread handling.
///
/// Runs after the procedure of the slot named by `cur_thrd` has returned.
/// Either the region stays pinned beneath a deeper thread (hole) and the
/// scheduler frame is restored on top of the carved stack, or the main
/// stack unwinds down to the shallowest reclaimable entry frame.
fn finish_current() -> ! {
    let ctx = with_sched(|s| {
        let cur = s.cur_thrd;
        if s.thrds[cur].depth < s.depth {
            log::debug!("thread #{cur} RUN -> HOLE");
            s.thrds[cur].state = ThreadState::Hole;
            s.hole_n += 1;
            &s.exe_ctx as *const JumpContext
        } else {
            let target = mark_unwind(s);
            log::debug!("unwinding stack to thread #{target} entry frame");
            &s.thrds[target].entry_ctx as *const JumpContext
        }
    });
    unsafe { resume(ctx, 1) }
}

/// Empty the terminating slot and every hole its departure uncovers.
/// Returns the slot whose entry frame the unwound stack stops at.
fn mark_unwind(s: &mut SchedState) -> usize {
    let cur = s.cur_thrd;
    let mut target = cur;

    log::debug!("thread #{cur} RUN -> EMPTY");
    s.thrds[cur].state = ThreadState::Empty;
    s.busy_n -= 1;

    // the deepest still-started region sets the new stack depth
    let mut depth = 0;
    for t in s.thrds.iter() {
        if t.state.is_started() && t.depth > depth {
            depth = t.depth;
        }
    }

    if depth + 1 < s.depth {
        // Every hole above the new depth goes with the unwind. The hole
        // sitting directly on the new top, when there is one, is where
        // the stack stops instead of at the terminator.
        for i in 0..MAX_THREADS {
            if s.thrds[i].state == ThreadState::Hole && s.thrds[i].depth > depth {
                if s.thrds[i].depth == depth + 1 {
                    target = i;
                }
                log::debug!("thread #{i} HOLE -> EMPTY");
                s.thrds[i].state = ThreadState::Empty;
                s.busy_n -= 1;
                s.hole_n -= 1;
            }
        }
    }
    s.depth = depth;

    target
}

/// Capture into `save` and jump to `go`. Returns when something resumes
/// `save`. Kept as its own minimal frame so the twice-returning capture
/// has nothing around it to disturb.
#[inline(never)]
unsafe fn jump_to(save: *mut JumpContext, go: *const JumpContext) {
    unsafe {
        if capture(save) == 0 {
            resume(go, 1);
        }
    }
}

/// Move the calling thread into `new_state` and give control back to the
/// scheduler. Returns when the scheduler next dispatches the thread.
///
/// The first suspension of a new thread is special: its stack region does
/// not exist yet, so this is where it gets reserved and where the
/// recursive scheduler activation that runs on top of it starts.
#[inline(never)]
pub(crate) fn suspend(new_state: ThreadState) {
    let (idx, first) = with_sched(|s| {
        let i = s.cur_thrd;
        let first = s.thrds[i].state == ThreadState::New;
        if s.thrds[i].state != new_state {
            log::debug!("thread #{i} {:?} -> {:?}", s.thrds[i].state, new_state);
        }
        s.thrds[i].state = new_state;
        (i, first)
    });

    let exe_ctx = with_sched(|s| &mut s.thrds[idx].exe_ctx as *mut JumpContext);

    if first {
        if unsafe { capture(exe_ctx) } == 0 {
            let stack_sz = with_sched(|s| s.thrds[idx].stack_sz);
            log::trace!("thread #{idx} first yield; reserving {stack_sz} stack bytes");
            stack::reserve_and_service(stack_sz);
            // A recursive activation is only ever left through an unwind
            // jump, so this point is not reached.
        } else {
            log::trace!("thread #{idx} resumed on its own stack");
        }
    } else {
        let sched_ctx = with_sched(|s| &s.exe_ctx as *const JumpContext);
        unsafe { jump_to(exe_ctx, sched_ctx) };
        log::trace!("thread #{idx} resumed");
    }
}

/// Give other threads a chance to run. Returns when the scheduler next
/// dispatches the calling thread.
pub fn yield_now() {
    suspend(ThreadState::Run);
}

/// Yield only when at least `after` ticks have elapsed since the
/// scheduler last dispatched the calling thread. Returns whether a yield
/// happened.
///
/// Lets long computations cooperate at a bounded rate without paying for
/// a full suspension on every check.
#[cfg(feature = "yield-after")]
pub fn yield_after(after: Tick) -> bool {
    let deadline = with_sched(|s| s.thrds[s.cur_thrd].switch_tick).wrapping_add(after);
    if tick_reached(platform().tick(), deadline) {
        log::trace!("yielding after {after} ticks");
        suspend(ThreadState::Run);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // The pool is a process-wide singleton; tests in this module take the
    // lock and reset it so they can run in any order.
    static POOL_LOCK: StdMutex<()> = StdMutex::new(());

    fn reset() {
        with_sched(|s| *s = SchedState::new());
    }

    fn nop(_: *mut c_void) {}

    #[test]
    fn test_spawn_fills_first_empty_slot() {
        let _g = POOL_LOCK.lock().unwrap();
        reset();

        assert_eq!(spawn(nop, Some("a"), 0, core::ptr::null_mut()), Ok(()));
        with_sched(|s| {
            assert_eq!(s.busy_n, 1);
            assert_eq!(s.thrds[0].state, ThreadState::New);
            assert_eq!(s.thrds[0].name, Some("a"));
            assert_eq!(s.thrds[0].stack_sz, DEFAULT_STACK_SIZE);
            assert_eq!(s.thrds[0].depth, 0);
        });
    }

    #[test]
    fn test_spawn_rejects_undersized_stack() {
        let _g = POOL_LOCK.lock().unwrap();
        reset();

        let r = spawn(nop, None, MIN_STACK_SIZE - 1, core::ptr::null_mut());
        assert_eq!(r, Err(SchedError::InvalidArg));
        assert_eq!(active_threads(), 0);
    }

    #[test]
    fn test_spawn_honors_pool_limit() {
        let _g = POOL_LOCK.lock().unwrap();
        reset();

        for _ in 0..MAX_THREADS {
            assert_eq!(spawn(nop, None, 0, core::ptr::null_mut()), Ok(()));
        }
        let r = spawn(nop, None, 0, core::ptr::null_mut());
        assert_eq!(r, Err(SchedError::LimitReached));
        assert_eq!(active_threads(), MAX_THREADS);
    }

    #[test]
    fn test_current_name_outside_any_thread() {
        let _g = POOL_LOCK.lock().unwrap();
        reset();

        assert_eq!(current_name(), None);
    }

    #[test]
    fn test_run_with_empty_pool_returns() {
        let _g = POOL_LOCK.lock().unwrap();
        reset();

        run();
        assert_eq!(active_threads(), 0);
    }
}
