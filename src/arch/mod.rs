/*
 * Architecture-specific continuation primitives.
 *
 * `capture` saves the execution state at its call site (callee-saved
 * registers, stack pointer, return address) and returns 0. `resume`
 * restores a saved state: control reappears at the matching `capture`
 * site, which this time returns the value handed to `resume`. Together
 * they are the non-local jumps the whole scheduler is built on.
 *
 * Discipline required of callers:
 * - `resume` may only target a continuation whose capturing frame still
 *   exists on the current stack; resuming into an unwound frame is
 *   undefined behavior.
 * - Each `resume` pairs with a fresh `capture` at the same site.
 * - Frames jumped over must hold nothing that needs dropping.
 */

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
pub(crate) use x86_64::{JumpContext, capture, resume};

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
pub(crate) use aarch64::{JumpContext, capture, resume};

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("costack supports x86_64 and aarch64 targets only");

#[cfg(all(target_arch = "x86_64", target_os = "windows"))]
compile_error!("the x86_64 continuation primitives assume the System V ABI");
