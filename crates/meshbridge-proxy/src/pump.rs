//! Bidirectional byte pumping between two connections.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Largest chunk a pump moves per read.
pub const MAX_CHUNK: u64 = 65535;

/// Read size for a stack with the given MTU.
pub fn chunk_size(mtu: u64) -> usize {
    mtu.clamp(1, MAX_CHUNK) as usize
}

/// Copy from `reader` to `writer` in reads of at most `chunk` bytes until a
/// read hits EOF or either side fails. `moved` counts bytes fully written.
pub async fn pump<R, W>(reader: &mut R, writer: &mut W, chunk: usize, moved: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk.max(1)];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        *moved += n as u64;
    }
}

/// Run two pumps (`a` to `b` and `b` to `a`) until the first one ends or
/// `cancel` fires, then drop both connections.
///
/// Returns `(a_to_b, b_to_a)` byte counts.
pub async fn proxy_streams<A, B>(a: A, b: B, chunk: usize, cancel: &CancellationToken) -> (u64, u64)
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut a_read, mut a_write) = tokio::io::split(a);
    let (mut b_read, mut b_write) = tokio::io::split(b);
    let mut a_to_b = 0u64;
    let mut b_to_a = 0u64;

    tokio::select! {
        res = pump(&mut a_read, &mut b_write, chunk, &mut a_to_b) => {
            trace!(result = ?res, "forward pump ended");
        }
        res = pump(&mut b_read, &mut a_write, chunk, &mut b_to_a) => {
            trace!(result = ?res, "reverse pump ended");
        }
        _ = cancel.cancelled() => {
            trace!("pumps cancelled");
        }
    }

    (a_to_b, b_to_a)
}
