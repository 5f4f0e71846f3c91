use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;

use dlk_protocol::{FrameCodec, ProxyRequest, ProxyResponse};
use tracing::{debug, warn};

use crate::channel::ProxyChannel;
use crate::error::{ProxyError, ProxyResult};

/// RPC channel over a blocking TCP connection.
///
/// Requests are serialised: one round trip at a time holds the stream.
/// A transport failure closes the channel.
pub struct TcpChannel {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpChannel {
    /// Connect to `addr`. `timeout` bounds the connect and every read and
    /// write.
    pub fn connect(addr: &str, timeout: Duration) -> ProxyResult<Self> {
        let mut last_err = None;
        for sock in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&sock, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(addr, "rpc channel connected");
                    return Ok(Self {
                        addr: addr.to_string(),
                        stream: Mutex::new(Some(stream)),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => ProxyError::Io(e),
            None => ProxyError::Transport(format!("{addr} resolved to no address")),
        })
    }

    fn round_trip(mut stream: &TcpStream, request: &ProxyRequest) -> ProxyResult<ProxyResponse> {
        FrameCodec::write_frame(&mut stream, request)?;
        Ok(FrameCodec::read_frame(&mut stream)?)
    }
}

impl ProxyChannel for TcpChannel {
    fn call(&self, request: ProxyRequest) -> ProxyResult<ProxyResponse> {
        let mut guard = self.stream.lock().expect("lock poisoned");
        let Some(stream) = guard.as_ref() else {
            return Err(ProxyError::Transport(format!("channel to {} is closed", self.addr)));
        };
        match Self::round_trip(stream, &request) {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(addr = %self.addr, request = request.type_name(), error = %e, "rpc call failed, closing channel");
                if let Some(stream) = guard.take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                Err(e)
            }
        }
    }

    fn endpoint(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn close(&self) {
        if let Some(stream) = self.stream.lock().expect("lock poisoned").take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(addr = %self.addr, "rpc channel closed");
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TcpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpChannel").field("addr", &self.addr).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;
    use std::net::TcpListener;
    use std::thread;

    use crate::memory::MemoryPeer;

    /// Serve one connection from `peer` on a background thread.
    fn serve_once(peer: MemoryPeer) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            while let Ok(request) = FrameCodec::read_frame::<ProxyRequest, _>(&mut reader) {
                let response = peer.dispatch(request);
                if FrameCodec::write_frame(&mut &stream, &response).is_err() {
                    break;
                }
            }
        });
        addr
    }

    #[test]
    fn calls_reach_the_peer() {
        let addr = serve_once(MemoryPeer::new().with_version("9.9"));
        let channel = TcpChannel::connect(&addr, Duration::from_secs(5)).unwrap();
        assert_eq!(channel.get_version().unwrap(), "9.9");
        assert_eq!(channel.endpoint(), format!("tcp://{addr}"));
    }

    #[test]
    fn closed_channel_fails_fast() {
        let addr = serve_once(MemoryPeer::new());
        let channel = TcpChannel::connect(&addr, Duration::from_secs(5)).unwrap();
        channel.close();
        let err = channel.get_version().unwrap_err();
        assert!(matches!(err, ProxyError::Transport(_)));
    }

    #[test]
    fn connect_refused() {
        // bind then drop to get a port with nothing listening
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let err = TcpChannel::connect(&format!("127.0.0.1:{port}"), Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }
}
