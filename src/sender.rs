use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use log::{debug, info, warn};
use tokio_util::codec::Encoder;

use crate::angles::AngleSnapshot;
use crate::config::SenderConfig;
use crate::protocol::JsonLinesCodec;

/// Outcome of checking on a background connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPoll {
    /// no attempt in flight
    Idle,
    Pending,
    Connected,
    Failed,
}

/// Best-effort snapshot stream to the robot receiver.
///
/// Failures never propagate: a failed connect leaves the sender
/// disconnected, a failed write drops the connection, and `send` on a
/// disconnected sender just drops the frame. Reconnecting is always an
/// explicit `connect` or `connect_in_background` call.
pub struct SnapshotSender {
    stream: Option<TcpStream>,
    pending: Option<Receiver<Option<TcpStream>>>,
    codec: JsonLinesCodec,
    buffer: BytesMut,
    timeout: Duration,
}

impl SnapshotSender {
    pub fn new(timeout: Duration) -> Self {
        Self {
            stream: None,
            pending: None,
            codec: JsonLinesCodec::default(),
            buffer: BytesMut::with_capacity(512),
            timeout,
        }
    }

    pub fn from_config(config: &SenderConfig) -> Self {
        Self::new(Duration::from_millis(config.connect_timeout_ms))
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_connecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Blocking connect, bounded by the connect timeout.
    pub fn connect(&mut self, addr: &str) -> bool {
        self.pending = None;
        self.stream = open_stream(addr, self.timeout);
        self.stream.is_some()
    }

    /// Start a connect on a helper thread. The frame loop picks the result
    /// up with `poll_connect` and never waits on the peer.
    pub fn connect_in_background(&mut self, addr: &str) {
        if self.pending.is_some() {
            return;
        }
        self.stream = None;

        let (tx, rx) = mpsc::channel();
        let addr = addr.to_string();
        let timeout = self.timeout;
        thread::spawn(move || {
            // receiver gone means the sender was disconnected meanwhile
            let _ = tx.send(open_stream(&addr, timeout));
        });
        self.pending = Some(rx);
    }

    pub fn poll_connect(&mut self) -> ConnectPoll {
        let Some(rx) = self.pending.as_ref() else {
            return ConnectPoll::Idle;
        };

        match rx.try_recv() {
            Err(TryRecvError::Empty) => ConnectPoll::Pending,
            Ok(Some(stream)) => {
                self.pending = None;
                self.stream = Some(stream);
                ConnectPoll::Connected
            }
            Ok(None) | Err(TryRecvError::Disconnected) => {
                self.pending = None;
                ConnectPoll::Failed
            }
        }
    }

    /// Serialize and write one snapshot. Returns false if nothing was sent.
    pub fn send(&mut self, snapshot: &AngleSnapshot) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        self.buffer.clear();
        if let Err(e) = self.codec.encode(snapshot, &mut self.buffer) {
            warn!("failed to encode snapshot: {}", e);
            return false;
        }

        match stream.write_all(&self.buffer) {
            Ok(()) => {
                debug!("sent {} bytes", self.buffer.len());
                true
            }
            Err(e) => {
                warn!("send failed, dropping connection: {}", e);
                self.stream = None;
                false
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.pending = None;
        if self.stream.take().is_some() {
            info!("connection closed");
        }
    }
}

fn open_stream(addr: &str, timeout: Duration) -> Option<TcpStream> {
    let addrs = match addr.to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            warn!("cannot resolve {}: {}", addr, e);
            return None;
        }
    };

    for socket_addr in addrs {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => {
                if let Err(e) = stream
                    .set_write_timeout(Some(timeout))
                    .and_then(|_| stream.set_nodelay(true))
                {
                    warn!("failed to configure connection to {}: {}", socket_addr, e);
                    continue;
                }
                info!("connected to robot at {}", socket_addr);
                return Some(stream);
            }
            Err(e) => warn!("connection to {} failed: {}", socket_addr, e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::{AngleAggregator, AngleResult, JointField};
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    #[test]
    fn test_send_while_disconnected_drops() {
        let mut sender = SnapshotSender::new(Duration::from_millis(100));
        assert!(!sender.is_connected());
        assert!(!sender.send(&AngleSnapshot::default()));
    }

    #[test]
    fn test_connect_failure_stays_disconnected() {
        // bind then drop to get a port with nothing listening
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let mut sender = SnapshotSender::new(Duration::from_millis(200));
        assert!(!sender.connect(&addr.to_string()));
        assert!(!sender.is_connected());
    }

    #[test]
    fn test_unresolvable_address() {
        let mut sender = SnapshotSender::new(Duration::from_millis(200));
        assert!(!sender.connect("not an address"));
    }

    #[test]
    fn test_sends_one_line_per_snapshot() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut sender = SnapshotSender::new(Duration::from_secs(2));
        assert!(sender.connect(&addr));
        let (peer, _) = listener.accept().unwrap();

        let mut agg = AngleAggregator::new();
        agg.update(JointField::HeadPitch, Some(AngleResult::from_degrees(10.0)));
        assert!(sender.send(agg.snapshot()));
        agg.update(JointField::HeadPitch, Some(AngleResult::from_degrees(20.0)));
        assert!(sender.send(agg.snapshot()));
        sender.disconnect();

        let lines: Vec<String> = BufReader::new(peer).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        let second: AngleSnapshot = serde_json::from_str(&lines[1]).unwrap();
        let pitch = second.get(JointField::HeadPitch).unwrap();
        assert_eq!(pitch.degree, 20.0);
        assert!((pitch.radian - 20f64.to_radians()).abs() < 1e-12);
    }

    fn poll_until_done(sender: &mut SnapshotSender) -> ConnectPoll {
        let start = std::time::Instant::now();
        loop {
            match sender.poll_connect() {
                ConnectPoll::Pending if start.elapsed() < Duration::from_secs(5) => {
                    thread::sleep(Duration::from_millis(5))
                }
                other => return other,
            }
        }
    }

    #[test]
    fn test_background_connect_hands_over_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut sender = SnapshotSender::new(Duration::from_secs(2));
        assert_eq!(sender.poll_connect(), ConnectPoll::Idle);
        sender.connect_in_background(&addr);
        assert!(sender.is_connecting());

        assert_eq!(poll_until_done(&mut sender), ConnectPoll::Connected);
        assert!(sender.is_connected());
        assert!(!sender.is_connecting());
        let (peer, _) = listener.accept().unwrap();

        assert!(sender.send(&AngleSnapshot::default()));
        sender.disconnect();
        assert_eq!(BufReader::new(peer).lines().count(), 1);
    }

    #[test]
    fn test_background_connect_failure() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let mut sender = SnapshotSender::new(Duration::from_millis(200));
        sender.connect_in_background(&addr.to_string());
        assert_eq!(poll_until_done(&mut sender), ConnectPoll::Failed);
        assert!(!sender.is_connected());
        assert_eq!(sender.poll_connect(), ConnectPoll::Idle);
    }
}
