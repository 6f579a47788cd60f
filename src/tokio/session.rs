use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::instrument;

use crate::backend::{Backend, Cursor, CursorGuard};
use crate::error::{Error, Result};
use crate::opts::{ServerIdentity, Timeouts};
use crate::protocol::command::resultset::{encode_result_set, show_databases};
use crate::protocol::command::{Command, CommandKind, Route, classify, read_command};
use crate::protocol::connection::{authenticate, read_handshake_response, write_initial_handshake};
use crate::protocol::packet::{self, PacketHeader, SequenceId};
use crate::protocol::response::{OkPayload, write_err, write_ok};

use super::stream::PacketStream;

/// What the command loop does after a command has been answered
enum Flow {
    Continue,
    Close,
}

/// One client connection, from greeting to close
///
/// The exchange is strictly request/response: a command is read, answered in
/// full, and only then is the next one read.
pub struct Session<S> {
    stream: PacketStream<S>,
    identity: Arc<ServerIdentity>,
    timeouts: Timeouts,
    buffer: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(stream: S, identity: Arc<ServerIdentity>, timeouts: Timeouts) -> Self {
        Self {
            stream: PacketStream::new(stream),
            identity,
            timeouts,
            buffer: Vec::new(),
        }
    }

    /// Serve the client until it quits, disconnects, idles out or fails
    ///
    /// Timeouts and disconnects are `Ok`. Any cursor opened for the session is
    /// closed before the socket is.
    pub async fn run<B: Backend>(mut self, backend: &B) -> Result<()> {
        let result = self.serve(backend).await;
        self.stream.shutdown().await;
        result
    }

    async fn serve<B: Backend>(&mut self, backend: &B) -> Result<()> {
        let Some(client_seq) = self.handshake().await? else {
            return Ok(());
        };

        let mut seq = SequenceId::reply_to(client_seq);
        let mut cursor = match backend.open() {
            Ok(cursor) => CursorGuard::new(cursor),
            Err(err) => {
                let err = Error::from(err);
                tracing::error!(error = %err, "failed to open backend cursor");
                self.report(&err, seq).await;
                return Err(err);
            }
        };
        self.send_ok(&mut seq).await?;
        self.command_loop(&mut cursor).await
    }

    /// Greet, read the handshake response and authenticate
    ///
    /// Returns the client's sequence id on success, `None` if the client went
    /// away or never answered.
    #[instrument(skip_all)]
    async fn handshake(&mut self) -> Result<Option<u8>> {
        let mut out = Vec::with_capacity(128);
        write_initial_handshake(&mut out, &self.identity);
        self.stream.write_packet(&out, &mut SequenceId::start()).await?;

        match timeout(self.timeouts.handshake, self.stream.read_frame(&mut self.buffer)).await {
            Err(_elapsed) => {
                tracing::debug!("timed out waiting for handshake response");
                return Ok(None);
            }
            Ok(Ok(false)) => {
                tracing::debug!("client disconnected before handshake response");
                return Ok(None);
            }
            Ok(Ok(true)) => {}
            Ok(Err(err)) => return Err(err),
        }
        tracing::trace!(packet = ?self.buffer, "handshake response");

        let client_seq = PacketHeader::from_bytes(&self.buffer)?.sequence_id;
        let identity = &self.identity;
        let outcome = read_handshake_response(&self.buffer).and_then(|response| {
            tracing::debug!(
                capabilities = response.capability_flags.bits(),
                max_packet_size = response.max_packet_size,
                charset = response.charset,
                "handshake response"
            );
            authenticate(&identity.credentials, &identity.salt, &response)?;
            Ok(response.username)
        });

        match outcome {
            Ok(username) => {
                tracing::info!(%username, "client authenticated");
                Ok(Some(client_seq))
            }
            Err(err) => {
                tracing::warn!(error = %err, "handshake rejected");
                self.report(&err, SequenceId::reply_to(client_seq)).await;
                Err(err)
            }
        }
    }

    async fn command_loop<C: Cursor>(&mut self, cursor: &mut CursorGuard<C>) -> Result<()> {
        loop {
            let Some(command) = self.next_command().await? else {
                return Ok(());
            };

            let mut seq = SequenceId::reply_to(command.sequence_id);
            match self.dispatch(cursor, &command, &mut seq).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => {
                    tracing::debug!("client quit");
                    return Ok(());
                }
                Err(err) => {
                    if err.is_protocol() {
                        tracing::warn!(error = %err, "command failed");
                    } else {
                        tracing::error!(error = %err, "command failed");
                    }
                    self.report(&err, seq).await;
                    return Err(err);
                }
            }
        }
    }

    /// Wait for the next command; `None` on idle timeout or disconnect
    async fn next_command(&mut self) -> Result<Option<Command>> {
        match timeout(self.timeouts.idle, self.stream.read_frame(&mut self.buffer)).await {
            Err(_elapsed) => {
                tracing::debug!("idle timeout");
                Ok(None)
            }
            Ok(Ok(false)) => {
                tracing::debug!("client disconnected");
                Ok(None)
            }
            Ok(Ok(true)) => {
                let (_, sequence_id, payload) = packet::decode(&self.buffer)?;
                Ok(Some(read_command(sequence_id, payload)))
            }
            Ok(Err(err)) => Err(err),
        }
    }

    #[instrument(skip_all)]
    async fn dispatch<C: Cursor>(
        &mut self,
        cursor: &mut CursorGuard<C>,
        command: &Command,
        seq: &mut SequenceId,
    ) -> Result<Flow> {
        let sql = match &command.kind {
            CommandKind::Quit => return Ok(Flow::Close),
            CommandKind::Ping | CommandKind::InitDb => {
                self.send_ok(seq).await?;
                return Ok(Flow::Continue);
            }
            CommandKind::Text(sql) => sql,
        };
        tracing::debug!(%sql, "query");

        match classify(sql) {
            Route::Query(sql) => {
                let result = cursor.query(sql)?;
                let packets = encode_result_set(&result)?;
                self.stream.write_packets(&packets, seq).await?;
            }
            Route::ShowDatabases => {
                let packets = encode_result_set(&show_databases())?;
                self.stream.write_packets(&packets, seq).await?;
            }
            Route::Use => self.send_ok(seq).await?,
            Route::Statement(sql) => {
                cursor.execute(sql)?;
                self.send_ok(seq).await?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn send_ok(&mut self, seq: &mut SequenceId) -> Result<()> {
        let mut out = Vec::with_capacity(7);
        write_ok(&mut out, &OkPayload::default());
        self.stream.write_packet(&out, seq).await
    }

    /// Best-effort ERR packet before the session closes
    async fn report(&mut self, err: &Error, mut seq: SequenceId) {
        let Some(payload) = err.err_payload() else {
            return;
        };
        let mut out = Vec::new();
        write_err(&mut out, &payload);
        if let Err(e) = self.stream.write_packet(&out, &mut seq).await {
            tracing::debug!(error = %e, "failed to send error packet");
        }
    }
}
