/*
 * Timed sleep and whole-system idle.
 *
 * A sleeping thread parks in its slot until a wake-up tick. When every
 * non-hole thread is asleep the scheduler has nothing to do at all, so
 * it hands the host a deep-idle hint sized to the nearest wake-up
 * instead of spinning on the clock.
 */

use crate::config::MAX_THREADS;
use crate::platform::platform;
use crate::tick::{MAX_TICK, Tick, tick_reached};

use super::thread::ThreadState;
use super::{suspend, with_sched};

/// Put the calling thread to sleep for `period` ticks. `sleep(0)` is a
/// plain yield.
///
/// The thread resumes no earlier than `period` ticks after the call,
/// rounded by however often the scheduler gets to look at the clock.
pub fn sleep(period: Tick) {
    let mut new_state = ThreadState::Run;

    if period > 0 {
        let wake = platform().tick().wrapping_add(period);
        with_sched(|s| {
            let i = s.cur_thrd;
            log::debug!("thread #{i} sleeping for {period} ticks");
            s.thrds[i].idle_to = wake;
            s.idle_n += 1;
        });
        new_state = ThreadState::Idle;
    }
    suspend(new_state);
}

/// Deep-idle check, run once per scheduler iteration.
///
/// While every non-hole thread sleeps, nothing can make progress until a
/// deadline passes. Each pass wakes the threads whose time has come;
/// when none has, the host is asked to halt for the distance to the
/// nearest wake-up and the scan repeats. The loop ends the moment one
/// sleeper wakes or a runnable thread exists again.
pub(crate) fn system_idle() {
    loop {
        let all_idle = with_sched(|s| s.idle_n > 0 && s.busy_n - s.hole_n <= s.idle_n);
        if !all_idle {
            return;
        }

        let now = platform().tick();
        let mut min_idle = MAX_TICK;
        let woke = with_sched(|s| {
            let mut woke = false;
            for i in 0..MAX_THREADS {
                if s.thrds[i].state != ThreadState::Idle {
                    continue;
                }
                if tick_reached(now, s.thrds[i].idle_to) {
                    log::debug!("thread #{i} IDLE -> RUN (idle loop)");
                    s.thrds[i].state = ThreadState::Run;
                    s.idle_n -= 1;
                    woke = true;
                } else {
                    let left = s.thrds[i].idle_to.wrapping_sub(now);
                    if left < min_idle {
                        min_idle = left;
                    }
                }
            }
            woke
        });

        if woke {
            return;
        }

        log::debug!("system idle for {min_idle} ticks");
        platform().deep_idle(min_idle);
    }
}
