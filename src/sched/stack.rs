/*
 * Stack reservation.
 *
 * Thread stacks are not heap allocations. When a new thread yields for
 * the first time, the yield site reserves the requested number of bytes
 * directly on the main stack and re-enters the scheduler loop on top of
 * the reservation. The suspended frames in between then serve as that
 * thread's private stack: everything the thread does after being resumed
 * grows downward into the reserved bytes, while the recursive scheduler
 * activation keeps servicing the pool from below them.
 */

use core::hint::black_box;

/// Bytes pinned per recursion level.
const RESERVE_CHUNK: usize = 256;

/// Reserve at least `remaining` bytes of zeroed main-stack space, then
/// run the scheduler loop on top of the reservation.
///
/// Each level pins one zeroed chunk. The `black_box` calls keep the
/// buffer, and with it the frame, from being elided or tail-called; the
/// reservation has to outlive the recursive `service` activation, which
/// is only ever left through a non-local jump.
#[inline(never)]
pub(crate) fn reserve_and_service(remaining: usize) {
    let mut chunk = [0u8; RESERVE_CHUNK];
    black_box(chunk.as_mut_ptr());
    if remaining > RESERVE_CHUNK {
        reserve_and_service(remaining - RESERVE_CHUNK);
    } else {
        super::service();
    }
    black_box(chunk.as_mut_ptr());
}
