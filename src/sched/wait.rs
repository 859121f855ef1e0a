/*
 * Wait and notify on numeric semaphore ids.
 *
 * A semaphore id is just a number naming a rendezvous; no count is kept
 * behind it. Waiters park in their pool slot, notifiers flip them back
 * to runnable. Notifying never yields, so a released thread runs on its
 * next scheduler visit, in slot order.
 */

use crate::config::MAX_THREADS;
use crate::platform::platform;
use crate::tick::Tick;

use super::thread::{ThreadState, WaitFlags};
use super::{suspend, with_sched};

/// Names a wait queue. Any value is valid; no registration is needed.
pub type SemId = i32;

/// Block the calling thread until `sem_id` is notified or `timeout`
/// ticks pass. A `timeout` of 0 waits forever.
///
/// Returns `true` when the wake-up came from a notify, `false` on
/// timeout.
pub fn wait(sem_id: SemId, timeout: Tick) -> bool {
    let deadline = if timeout == 0 {
        0
    } else {
        platform().tick().wrapping_add(timeout)
    };

    let idx = with_sched(|s| {
        let i = s.cur_thrd;
        let t = &mut s.thrds[i];
        t.sem_id = sem_id;
        t.wait_to = deadline;
        t.wait_flags = if timeout == 0 {
            WaitFlags::INFINITE
        } else {
            WaitFlags::empty()
        };
        i
    });
    if timeout == 0 {
        log::debug!("thread #{idx} waiting on sem {sem_id}");
    } else {
        log::debug!("thread #{idx} waiting on sem {sem_id} for {timeout} ticks");
    }

    suspend(ThreadState::Wait);

    let notified = with_sched(|s| s.thrds[idx].wait_flags.contains(WaitFlags::NOTIFIED));
    if notified {
        log::debug!("thread #{idx} notified on sem {sem_id}");
    } else {
        log::debug!("thread #{idx} timed out on sem {sem_id}");
    }
    notified
}

/// Release the first thread waiting on `sem_id`, if any. At most one
/// thread is released per call.
pub fn notify(sem_id: SemId) {
    with_sched(|s| {
        for i in 0..MAX_THREADS {
            let t = &mut s.thrds[i];
            if t.state == ThreadState::Wait && t.sem_id == sem_id {
                log::debug!("thread #{i} WAIT -> RUN (notify on sem {sem_id})");
                t.wait_flags.insert(WaitFlags::NOTIFIED);
                t.state = ThreadState::Run;
                break;
            }
        }
    });
}

/// Release every thread waiting on `sem_id`.
pub fn notify_all(sem_id: SemId) {
    with_sched(|s| {
        for i in 0..MAX_THREADS {
            let t = &mut s.thrds[i];
            if t.state == ThreadState::Wait && t.sem_id == sem_id {
                log::debug!("thread #{i} WAIT -> RUN (notify_all on sem {sem_id})");
                t.wait_flags.insert(WaitFlags::NOTIFIED);
                t.state = ThreadState::Run;
            }
        }
    });
}
