//! Two-phase all-to-all exchange over point-to-point handles.
//!
//! Phase 1 sends one [`WireCount`] to *every* other rank (zeros included);
//! phase 2 sends a payload to every other rank (empty ones included), sized
//! by what phase 1 announced. Both functions post all receives first, then
//! all sends, and always drain every handle before returning, even when an
//! error was seen, so no rank is left with a dangling message.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, cast_slice_mut};
use crate::mesh_error::MeshFaceError;

/// Collective inputs carry one entry per rank.
pub fn check_rank_vector(rank: usize, size: usize, len: usize) -> Result<(), MeshFaceError> {
    if len == size {
        Ok(())
    } else {
        Err(MeshFaceError::CommError {
            neighbor: rank,
            message: format!("collective input has {len} entries for a world of size {size}"),
        })
    }
}

/// Exchange one count with every rank. `send[r]` goes to rank `r`.
pub fn exchange_counts<C>(
    comm: &C,
    send: &[usize],
    tag: CommTag,
) -> Result<Vec<usize>, MeshFaceError>
where
    C: Communicator + ?Sized,
{
    let (me, size) = (comm.rank(), comm.size());
    check_rank_vector(me, size, send.len())?;
    if let Some((peer, &n)) = send.iter().enumerate().find(|&(_, &n)| n > u32::MAX as usize) {
        return Err(MeshFaceError::CommError {
            neighbor: peer,
            message: format!("count {n} does not fit the wire format"),
        });
    }
    let peers: Vec<usize> = (0..size).filter(|&r| r != me).collect();

    // 1) post all receives
    let mut recvs: Vec<(usize, C::RecvHandle)> = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut cnt = WireCount::new(0);
        let h = comm.irecv(
            peer,
            tag.as_u16(),
            cast_slice_mut(std::slice::from_mut(&mut cnt)),
        );
        recvs.push((peer, h));
    }

    // 2) post all sends, zero counts included
    let mut pending_sends = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let cnt = WireCount::new(send[peer]);
        pending_sends.push(comm.isend(
            peer,
            tag.as_u16(),
            cast_slice(std::slice::from_ref(&cnt)),
        ));
    }

    // 3) wait for all recvs, collect counts (but do not early-return)
    let mut counts = vec![0usize; size];
    counts[me] = send[me];
    let mut maybe_err = None;
    for (peer, h) in recvs {
        match h.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireCount>() => {
                let mut cnt = WireCount::new(0);
                cast_slice_mut(std::slice::from_mut(&mut cnt)).copy_from_slice(&data);
                counts[peer] = cnt.get();
            }
            Some(data) => {
                maybe_err.get_or_insert(MeshFaceError::PayloadSizeMismatch {
                    neighbor: peer,
                    expected: std::mem::size_of::<WireCount>(),
                    found: data.len(),
                });
            }
            None => {
                maybe_err.get_or_insert(MeshFaceError::CommError {
                    neighbor: peer,
                    message: format!("failed to receive count from rank {peer}"),
                });
            }
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(counts),
    }
}

/// Exchange variable-length byte payloads with every rank.
///
/// `recv_len[r]` must be the byte length announced by rank `r`; a mismatch
/// is reported as [`MeshFaceError::PayloadSizeMismatch`].
pub fn exchange_payloads<C>(
    comm: &C,
    send: &[Vec<u8>],
    recv_len: &[usize],
    tag: CommTag,
) -> Result<Vec<Vec<u8>>, MeshFaceError>
where
    C: Communicator + ?Sized,
{
    let (me, size) = (comm.rank(), comm.size());
    check_rank_vector(me, size, send.len())?;
    check_rank_vector(me, size, recv_len.len())?;
    let peers: Vec<usize> = (0..size).filter(|&r| r != me).collect();

    // 1) post all receives
    let mut recvs: Vec<(usize, C::RecvHandle)> = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut buffer = vec![0u8; recv_len[peer]];
        let h = comm.irecv(peer, tag.as_u16(), &mut buffer);
        recvs.push((peer, h));
    }

    // 2) post all sends; always post, even if empty
    let mut pending_sends = Vec::with_capacity(peers.len());
    for &peer in &peers {
        pending_sends.push(comm.isend(peer, tag.as_u16(), &send[peer]));
    }

    // 3) wait + collect
    let mut out = vec![Vec::new(); size];
    out[me] = send[me].clone();
    let mut maybe_err = None;
    for (peer, h) in recvs {
        match h.wait() {
            Some(data) if data.len() == recv_len[peer] => out[peer] = data,
            Some(data) => {
                maybe_err.get_or_insert(MeshFaceError::PayloadSizeMismatch {
                    neighbor: peer,
                    expected: recv_len[peer],
                    found: data.len(),
                });
            }
            None => {
                maybe_err.get_or_insert(MeshFaceError::CommError {
                    neighbor: peer,
                    message: format!("failed to receive payload from rank {peer}"),
                });
            }
        }
    }

    // 4) always drain all sends
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(out),
    }
}
