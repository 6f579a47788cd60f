use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::backend::Backend;
use crate::error::Result;
use crate::opts::{Opts, ServerIdentity, Timeouts};

use super::session::Session;

/// TCP listener that runs one [`Session`] task per accepted connection
///
/// Sessions share nothing but the immutable [`ServerIdentity`] and the
/// backend; a failing session never stops the listener.
pub struct Server<B> {
    listener: TcpListener,
    identity: Arc<ServerIdentity>,
    timeouts: Timeouts,
    backend: Arc<B>,
    next_session_id: AtomicU64,
}

impl<B: Backend + 'static> Server<B> {
    /// Bind to `opts.bind_address()`; port 0 picks a free port
    pub async fn bind(opts: Opts, backend: B) -> Result<Self> {
        let listener = TcpListener::bind(opts.bind_address()).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            identity: Arc::new(opts.identity),
            timeouts: opts.timeouts,
            backend: Arc::new(backend),
            next_session_id: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F: Future<Output = ()>>(self, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!("session", id, %peer);

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(parent: &span, error = %e, "failed to set TCP_NODELAY");
        }

        let session = Session::new(stream, Arc::clone(&self.identity), self.timeouts);
        let backend = Arc::clone(&self.backend);
        tokio::spawn(
            async move {
                tracing::info!("client connected");
                match session.run(backend.as_ref()).await {
                    Ok(()) => tracing::info!("session closed"),
                    Err(err) => tracing::warn!(error = %err, "session closed with error"),
                }
            }
            .instrument(span),
        );
    }
}
