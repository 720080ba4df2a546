/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions to implement bounded wait routines.

--*/

use asufw_error::{AsufwError, AsufwResult};

/// Poll until `poll` returns true, at most `max_polls` times.
///
/// The closure is responsible for any delay between polls.
///
/// # Arguments
///
/// * `max_polls` - Poll budget
/// * `err` - Error reported when the budget runs out
/// * `poll` - Condition check
pub fn poll_until<F>(max_polls: u32, err: AsufwError, mut poll: F) -> AsufwResult<()>
where
    F: FnMut() -> bool,
{
    for _ in 0..max_polls {
        if poll() {
            return Ok(());
        }
    }
    Err(err)
}
