/*++

Licensed under the Apache-2.0 license.

File Name:

    zeroize.rs

Abstract:

    File contains the buffer sanitization routine used on failure paths.

--*/

use asufw_error::BufStatus;
use core::sync::atomic::{compiler_fence, Ordering};

/// Clear `buf` and read it back.
///
/// # Returns
///
/// * `BufStatus::Cleared` if every byte reads back as zero, else `BufStatus::ClearFailed`
pub fn secure_zeroize(buf: &mut [u8]) -> BufStatus {
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference.
        unsafe { core::ptr::write_volatile(byte, 0) };
    }
    compiler_fence(Ordering::SeqCst);
    // SAFETY: `byte` is a valid reference.
    if buf.iter().all(|byte| unsafe { core::ptr::read_volatile(byte) } == 0) {
        BufStatus::Cleared
    } else {
        BufStatus::ClearFailed
    }
}
