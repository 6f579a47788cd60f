use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::instrument;
use zerocopy::{FromZeros, IntoBytes};

use crate::error::Result;
use crate::protocol::packet::{self, PacketHeader, SequenceId};

/// Packet-level view of one client socket
///
/// Reads go through a buffer; writes are flushed after every packet so the
/// client never waits on bytes sitting in a buffer.
pub struct PacketStream<S> {
    inner: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> PacketStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Read one whole packet, header included, into `buffer`
    ///
    /// Returns `false` if the client closed the connection instead.
    #[instrument(skip_all)]
    pub async fn read_frame(&mut self, buffer: &mut Vec<u8>) -> Result<bool> {
        let mut header = PacketHeader::new_zeroed();

        buffer.clear();
        match self.inner.read_exact(header.as_mut_bytes()).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let length = header.length();
        buffer.reserve(PacketHeader::SIZE + length);
        buffer.extend_from_slice(header.as_bytes());
        buffer.resize(PacketHeader::SIZE + length, 0);
        self.inner.read_exact(&mut buffer[PacketHeader::SIZE..]).await?;

        tracing::trace!(seq = header.sequence_id, length, "packet received");
        Ok(true)
    }

    /// Frame and send one payload with the next sequence id
    #[instrument(skip_all)]
    pub async fn write_packet(
        &mut self,
        payload: &[u8],
        sequence_id: &mut SequenceId,
    ) -> Result<()> {
        let frame = packet::encode(payload, sequence_id.get())?;
        sequence_id.advance();
        self.send(&frame).await
    }

    /// Send several payloads in order, one sequence id each
    ///
    /// Every payload is framed before the first byte is written, so a payload
    /// that cannot be framed leaves nothing half-sent.
    #[instrument(skip_all)]
    pub async fn write_packets(
        &mut self,
        payloads: &[Vec<u8>],
        sequence_id: &mut SequenceId,
    ) -> Result<()> {
        let mut next = *sequence_id;
        let frames = payloads
            .iter()
            .map(|payload| packet::encode(payload, next.advance()))
            .collect::<Result<Vec<_>>>()?;
        *sequence_id = next;

        for frame in &frames {
            self.send(frame).await?;
        }
        Ok(())
    }

    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        let inner = self.inner.get_mut();
        inner.write_all(frame).await?;
        inner.flush().await?;
        tracing::trace!(bytes = frame.len(), "packet sent");
        Ok(())
    }

    /// Close the write half; errors are ignored since the session is over
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.inner.get_mut().shutdown().await {
            tracing::debug!(error = %e, "socket shutdown failed");
        }
    }
}
