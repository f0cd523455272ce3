//! SCPI-over-TCP instrument transport.
//!
//! The CMW500 exposes a direct socket SCPI interface: newline-framed
//! textual commands over TCP, one reply line per query. This transport
//! keeps no protocol state beyond the connection and the default
//! timeout; command vocabulary is passed through verbatim.

use crate::error::{AppResult, SweepError};
use crate::instrument::ScpiEndpoint;
use log::debug;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Default port of the instrument's direct socket SCPI service.
const DEFAULT_SCPI_PORT: u16 = 5025;

/// A newline-framed SCPI session over a raw TCP socket.
pub struct SocketInstrument {
    address: String,
    stream: Option<TcpStream>,
    reader: Option<BufReader<TcpStream>>,
    timeout: Duration,
}

impl SocketInstrument {
    /// Connects to the instrument at `address` (`host` or `host:port`;
    /// port defaults to 5025). Fails with [`SweepError::Connection`],
    /// which is fatal to the whole sweep.
    pub fn open(address: &str) -> AppResult<Self> {
        let target = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:{}", address, DEFAULT_SCPI_PORT)
        };

        let stream = TcpStream::connect(&target).map_err(|e| SweepError::Connection {
            address: target.clone(),
            reason: e.to_string(),
        })?;
        stream
            .set_nodelay(true)
            .map_err(|e| SweepError::Connection {
                address: target.clone(),
                reason: e.to_string(),
            })?;
        let reader_stream = stream.try_clone().map_err(|e| SweepError::Connection {
            address: target.clone(),
            reason: e.to_string(),
        })?;

        debug!("SCPI socket opened to {}", target);
        Ok(Self {
            address: target,
            stream: Some(stream),
            reader: Some(BufReader::new(reader_stream)),
            timeout: Duration::from_secs(30),
        })
    }

    /// Builder-style default timeout override.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The resolved address this session is connected to.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn send_line(&mut self, cmd: &str) -> AppResult<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SweepError::Communication("session is closed".to_string()))?;
        stream
            .write_all(cmd.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .map_err(|e| SweepError::Communication(format!("write failed for '{}': {}", cmd, e)))
    }

    fn read_line(&mut self, cmd: &str, timeout: Duration) -> AppResult<String> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| SweepError::Communication("session is closed".to_string()))?;
        reader
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(|e| SweepError::Communication(format!("set_read_timeout failed: {}", e)))?;

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => Err(SweepError::Communication(format!(
                "connection closed by instrument while awaiting reply to '{}'",
                cmd
            ))),
            Ok(_) => Ok(line.trim().to_string()),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Err(SweepError::Timeout {
                    command: cmd.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(e) => Err(SweepError::Communication(format!(
                "read failed for '{}': {}",
                cmd, e
            ))),
        }
    }
}

impl ScpiEndpoint for SocketInstrument {
    fn write(&mut self, cmd: &str) -> AppResult<()> {
        debug!("SCPI write: {}", cmd);
        self.send_line(cmd)
    }

    fn query_with_timeout(&mut self, cmd: &str, timeout: Duration) -> AppResult<String> {
        self.send_line(cmd)?;
        let response = self.read_line(cmd, timeout)?;
        debug!("SCPI query '{}' -> '{}'", cmd, response);
        Ok(response)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn close(&mut self) -> AppResult<()> {
        self.reader = None;
        if let Some(stream) = self.stream.take() {
            // Best effort; the peer may already have dropped the link.
            let _ = stream.shutdown(std::net::Shutdown::Both);
            debug!("SCPI socket to {} closed", self.address);
        }
        Ok(())
    }
}

impl Drop for SocketInstrument {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Minimal one-shot SCPI responder on an ephemeral port.
    fn spawn_responder(replies: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut stream = stream;
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap_or(0) > 0 {
                let cmd = line.trim().to_string();
                for (expected, reply) in &replies {
                    if cmd == *expected {
                        stream.write_all(reply.as_bytes()).unwrap();
                        stream.write_all(b"\n").unwrap();
                    }
                }
                line.clear();
            }
        });
        addr
    }

    #[test]
    fn test_open_refused() {
        // Port 1 on localhost is essentially guaranteed closed.
        let result = SocketInstrument::open("127.0.0.1:1");
        assert!(matches!(result, Err(SweepError::Connection { .. })));
    }

    #[test]
    fn test_query_round_trip() {
        let addr = spawn_responder(vec![("*IDN?", "Rohde&Schwarz,CMW,1201.0002k50,3.7.30")]);
        let mut session = SocketInstrument::open(&addr)
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        let idn = session.identify().unwrap();
        assert!(idn.contains("CMW"));
        session.close().unwrap();
    }

    #[test]
    fn test_write_then_query() {
        let addr = spawn_responder(vec![("SYST:ERR?", "0,\"No error\"")]);
        let mut session = SocketInstrument::open(&addr)
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        session.write("CONFigure:LTE:SIGN:PCC:BAND OB3").unwrap();
        let err = session.query("SYST:ERR?").unwrap();
        assert_eq!(err, "0,\"No error\"");
    }

    #[test]
    fn test_query_timeout() {
        // Responder that never replies.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(5));
        });

        let mut session = SocketInstrument::open(&addr).unwrap();
        let result = session.query_with_timeout("*IDN?", Duration::from_millis(50));
        assert!(matches!(result, Err(SweepError::Timeout { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let addr = spawn_responder(vec![]);
        let mut session = SocketInstrument::open(&addr).unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert!(session.write("*RST").is_err());
    }
}
