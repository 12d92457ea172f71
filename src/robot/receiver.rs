use std::io::{ErrorKind, Read};
use std::net::TcpListener;

use anyhow::{Context, Result};
use bytes::BytesMut;
use log::{debug, error, info};
use serde_json::Value;
use tokio_util::codec::Decoder;

use super::actuator::{Actuator, StiffnessGuard};
use super::mapper::{ActuatorCommand, JointCommandMapper};
use crate::config::ReceiverConfig;
use crate::protocol::JsonLinesCodec;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes: u64,
    pub messages: u64,
    pub head_commands: u64,
    pub elbow_commands: u64,
    pub failed_commands: u64,
}

/// Accepts a single vision sender and drives the actuator from its stream.
pub struct RobotReceiver<A: Actuator> {
    actuator: A,
    mapper: JointCommandMapper,
    stiffness_group: String,
    read_buffer: usize,
    max_message_bytes: usize,
}

impl<A: Actuator> RobotReceiver<A> {
    pub fn new(actuator: A, config: &ReceiverConfig) -> Self {
        Self {
            actuator,
            mapper: JointCommandMapper::from_config(config),
            stiffness_group: config.stiffness_group.clone(),
            read_buffer: config.read_buffer,
            max_message_bytes: config.max_message_bytes,
        }
    }

    /// Serve exactly one connection. The motors are stiffened once the peer
    /// is accepted and relaxed when the session ends, on success or error.
    pub fn serve_once(&mut self, listener: &TcpListener) -> Result<SessionStats> {
        if let Ok(addr) = listener.local_addr() {
            info!("waiting for the vision sender on {}", addr);
        }
        let (mut stream, peer) = listener.accept().context("failed to accept connection")?;
        info!("vision sender connected from {}", peer);

        let mut guard = StiffnessGuard::acquire(&mut self.actuator, &self.stiffness_group);
        let mut codec = JsonLinesCodec::new(self.max_message_bytes);
        let result = run_session(
            &mut stream,
            guard.actuator(),
            &self.mapper,
            &mut codec,
            self.read_buffer,
        );
        drop(guard);

        match &result {
            Ok(stats) => info!("session with {} ended: {:?}", peer, stats),
            Err(e) => error!("session with {} failed: {:#}", peer, e),
        }
        result
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }
}

/// Read until the peer closes, decoding and dispatching every complete
/// message. Incomplete input stays buffered for the next read.
pub fn run_session<R: Read, A: Actuator>(
    reader: &mut R,
    actuator: &mut A,
    mapper: &JointCommandMapper,
    codec: &mut JsonLinesCodec,
    read_buffer: usize,
) -> Result<SessionStats> {
    let mut stats = SessionStats::default();
    let mut chunk = vec![0u8; read_buffer.max(1)];
    let mut buffer = BytesMut::with_capacity(chunk.len());

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read from vision sender"),
        };
        stats.bytes += n as u64;
        buffer.extend_from_slice(&chunk[..n]);

        while let Some(message) = codec.decode(&mut buffer)? {
            stats.messages += 1;
            dispatch(&message, actuator, mapper, &mut stats);
        }
    }

    if !buffer.is_empty() {
        debug!("peer closed with {} unparsed bytes", buffer.len());
    }
    Ok(stats)
}

fn dispatch<A: Actuator>(message: &Value, actuator: &mut A, mapper: &JointCommandMapper, stats: &mut SessionStats) {
    match mapper.head_command(message) {
        Some(cmd) => {
            if issue(actuator, &cmd) {
                stats.head_commands += 1;
            } else {
                stats.failed_commands += 1;
            }
        }
        None => debug!("head skipped: pitch or yaw missing"),
    }

    match mapper.elbow_command(message) {
        Some(cmd) => {
            if issue(actuator, &cmd) {
                stats.elbow_commands += 1;
            } else {
                stats.failed_commands += 1;
            }
        }
        None => debug!("elbows skipped: left or right roll missing"),
    }
}

fn issue<A: Actuator>(actuator: &mut A, cmd: &ActuatorCommand) -> bool {
    match actuator.set_angles(&cmd.names, &cmd.values, cmd.speed) {
        Ok(()) => true,
        Err(e) => {
            error!("command {:?} failed: {:#}", cmd.names, e);
            false
        }
    }
}
