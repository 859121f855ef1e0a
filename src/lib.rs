/*
 * costack - Cooperative Threads on a Shared Stack
 *
 * A lightweight cooperative threading library for environments without
 * preemptive multitasking, a runtime, or even an allocator. Threads are
 * plain functions serviced round-robin by a scheduler that runs them all
 * on the single main execution stack: a new thread's stack region is
 * reserved directly on top of the caller's, and control moves between
 * threads through saved continuations instead of a heap of per-thread
 * stacks.
 *
 * Key features:
 * - Fixed thread pool, zero heap allocation
 * - Round-robin cooperative scheduling with explicit yield points
 * - Timed sleep with whole-system deep idle (feature `idle`)
 * - Semaphore-id wait/notify with timeouts (feature `wait`)
 * - Elapsed-tick conditional yield (feature `yield-after`)
 */

//! Cooperative threads multiplexed on the main stack.
//!
//! Register thread procedures with [`spawn`], then hand the flow of
//! execution to [`run`]. Threads cooperate by calling [`yield_now`] (or
//! [`sleep`], [`wait`], [`yield_after`]) and terminate by returning from
//! their procedure. [`run`] returns once every thread has terminated.
//!
//! Anything time-based needs a tick source from the host; register one
//! with [`set_platform`] before the first timed call.
//!
//! ```no_run
//! use core::ffi::c_void;
//!
//! fn worker(_: *mut c_void) {
//!     for _ in 0..3 {
//!         costack::yield_now();
//!     }
//! }
//!
//! fn main() {
//!     costack::spawn(worker, Some("worker"), 0, core::ptr::null_mut()).unwrap();
//!     costack::spawn(worker, Some("peer"), 0, core::ptr::null_mut()).unwrap();
//!     costack::run();
//! }
//! ```

#![cfg_attr(not(test), no_std)]

mod arch;
mod config;
mod platform;
mod sched;
mod tick;

pub use config::{DEFAULT_STACK_SIZE, MAX_THREADS, MIN_STACK_SIZE};
pub use platform::{Platform, set_platform};
pub use sched::thread::ThreadProc;
pub use sched::{SchedError, active_threads, current_name, run, spawn, yield_now};
pub use tick::{MAX_TICK, Tick};

#[cfg(feature = "idle")]
pub use sched::idle::sleep;
#[cfg(feature = "wait")]
pub use sched::wait::{SemId, notify, notify_all, wait};
#[cfg(feature = "yield-after")]
pub use sched::yield_after;
