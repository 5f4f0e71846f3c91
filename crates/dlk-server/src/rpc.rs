use std::sync::Arc;

use dlk_protocol::{FrameCodec, ProxyRequest};
use dlk_proxy::MemoryPeer;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// Serves a [`MemoryPeer`] over the framed RPC channel.
///
/// Each connection gets its own task; requests on one connection are
/// answered in order.
pub struct RpcServer {
    peer: Arc<MemoryPeer>,
}

impl RpcServer {
    pub fn new(peer: Arc<MemoryPeer>) -> Self {
        Self { peer }
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        info!(addr = %listener.local_addr()?, "rpc channel listening");
        loop {
            let (stream, remote) = listener.accept().await?;
            let peer = Arc::clone(&self.peer);
            tokio::spawn(async move {
                debug!(remote = %remote, "rpc client connected");
                match handle_connection(peer, stream).await {
                    Ok(()) => debug!(remote = %remote, "rpc client disconnected"),
                    Err(e) => warn!(remote = %remote, error = %e, "rpc connection closed with error"),
                }
            });
        }
    }
}

async fn handle_connection(peer: Arc<MemoryPeer>, stream: TcpStream) -> ServerResult<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();
    while let Some(request) = FrameCodec::read_frame_async::<ProxyRequest, _>(&mut reader).await? {
        let peer = Arc::clone(&peer);
        let response = tokio::task::spawn_blocking(move || peer.dispatch(request))
            .await
            .map_err(|e| ServerError::Internal(format!("peer task failed: {e}")))?;
        FrameCodec::write_frame_async(&mut writer, &response).await?;
    }
    Ok(())
}
