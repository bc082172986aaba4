//! Rank-0-reads-then-broadcasts helpers.
//!
//! [`collective_read`] is the single path by which file contents reach non-root
//! ranks. The root broadcasts a [`WireStatus`] before any payload, so a failed
//! read fails on every rank instead of leaving peers blocked on a broadcast
//! that never comes.

use crate::algs::communicator::Communicator;
use crate::algs::wire::{WireStatus, cast_slice, collect_from_bytes};
use crate::pvld_error::PvldError;
use bytemuck::Pod;

/// Broadcast one plain value from rank 0.
pub fn broadcast_scalar<T: Pod, C: Communicator + ?Sized>(comm: &C, value: &mut T) {
    if comm.size() <= 1 {
        return;
    }
    let mut bytes = cast_slice(std::slice::from_ref(value)).to_vec();
    comm.broadcast_bytes(&mut bytes);
    if !comm.is_root() {
        if let Some(v) = collect_from_bytes::<T>(&bytes).into_iter().next() {
            *value = v;
        }
    }
}

/// Broadcast a vector from rank 0; non-root contents and length are replaced.
pub fn broadcast_vec<T: Pod, C: Communicator + ?Sized>(comm: &C, values: &mut Vec<T>) {
    if comm.size() <= 1 {
        return;
    }
    let mut bytes = cast_slice(values.as_slice()).to_vec();
    comm.broadcast_bytes(&mut bytes);
    if !comm.is_root() {
        *values = collect_from_bytes(&bytes);
    }
}

/// Broadcast a UTF-8 string from rank 0.
pub fn broadcast_string<C: Communicator + ?Sized>(comm: &C, text: &mut String) {
    if comm.size() <= 1 {
        return;
    }
    let mut bytes = text.as_bytes().to_vec();
    comm.broadcast_bytes(&mut bytes);
    if !comm.is_root() {
        *text = String::from_utf8_lossy(&bytes).into_owned();
    }
}

/// Run `read` on rank 0 only and hand its result to every rank.
///
/// On failure the root returns its own error and every other rank returns
/// [`PvldError::Communication`] carrying the root's message.
pub fn collective_read<T, C, F>(comm: &C, read: F) -> Result<Vec<T>, PvldError>
where
    T: Pod,
    C: Communicator + ?Sized,
    F: FnOnce() -> Result<Vec<T>, PvldError>,
{
    if comm.size() <= 1 {
        return read();
    }

    let (mut status, outcome) = if comm.is_root() {
        match read() {
            Ok(values) => (WireStatus::ok(values.len()), Ok(values)),
            Err(e) => (WireStatus::failed(), Err(e)),
        }
    } else {
        (WireStatus::failed(), Ok(Vec::new()))
    };
    broadcast_scalar(comm, &mut status);

    if !status.is_ok() {
        let mut message = match &outcome {
            Err(e) if comm.is_root() => e.to_string(),
            _ => String::new(),
        };
        broadcast_string(comm, &mut message);
        return match outcome {
            Err(e) => Err(e),
            Ok(_) => Err(PvldError::Communication(message)),
        };
    }

    let mut values = outcome?;
    broadcast_vec(comm, &mut values);
    if values.len() != status.len() {
        return Err(PvldError::Communication(format!(
            "expected {} broadcast values, received {}",
            status.len(),
            values.len()
        )));
    }
    Ok(values)
}
