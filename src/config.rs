/*
 * Compile-time configuration.
 *
 * Pool size and stack sizing are fixed at build time; there is no dynamic
 * allocation anywhere in the crate. The optional subsystems are cargo
 * features, not values here.
 */

/// Number of slots in the thread pool. Registration fails once every slot
/// is occupied.
pub const MAX_THREADS: usize = 4;

/// Stack reservation for threads spawned with a stack size of 0.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// Smallest explicit stack reservation accepted by `spawn`. Anything a
/// thread calls, including the suspension machinery itself, has to fit in
/// its reservation.
pub const MIN_STACK_SIZE: usize = 1024;
