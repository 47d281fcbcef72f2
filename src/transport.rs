use crate::{Result, RobotError};
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// TCP transport to the controller's script port.
///
/// Writes are fire-and-forget: the controller sends nothing back on this
/// channel that the client waits for.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `host:port`, trying each resolved address until one answers
    /// within `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpTransport> {
        let addrs = (host, port).to_socket_addrs().map_err(RobotError::Connect)?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    // `timeout` covers the connect only; sends block without a limit.
                    // Script lines are small; push each one out immediately.
                    let _ = stream.set_nodelay(true);
                    return Ok(TcpTransport { stream });
                }
                Err(e) => {
                    log::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(RobotError::Connect(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address resolved for {}", host),
            )
        })))
    }

    /// Write a block of bytes in full.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .and_then(|_| self.stream.flush())
            .map_err(RobotError::Transmission)
    }

    /// Second handle to the same socket, for reading acknowledgments.
    pub fn try_clone_reader(&self) -> Result<TcpStream> {
        self.stream.try_clone().map_err(RobotError::Io)
    }

    pub fn shutdown(self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_write() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport =
            TcpTransport::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        transport.write_all(b"popup(\"hi\")\n").unwrap();
        transport.shutdown();

        let mut received = String::new();
        peer.read_to_string(&mut received).unwrap();
        assert_eq!(received, "popup(\"hi\")\n");
    }

    #[test]
    fn test_sends_have_no_write_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport =
            TcpTransport::connect("127.0.0.1", port, Duration::from_millis(500)).unwrap();
        let _peer = listener.accept().unwrap();
        assert_eq!(transport.stream.write_timeout().unwrap(), None);
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = TcpTransport::connect("127.0.0.1", port, Duration::from_millis(500));
        assert!(matches!(err, Err(RobotError::Connect(_))));
    }
}
