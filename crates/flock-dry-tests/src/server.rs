// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Loopback TCP server speaking the framed Flock protocol.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use flock_proto::wire::{self, Call, Reply, HEADER_LEN};

/// Server on an ephemeral `127.0.0.1` port answering each decoded call
/// through a closure.
///
/// Connections are served one after another on a background thread that
/// lives until the process exits. Clones of the recorded call list are
/// available through [`calls`](Self::calls).
pub struct LoopbackServer {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl LoopbackServer {
    /// Bind and start serving.
    ///
    /// # Panics
    ///
    /// The serving thread panics if a reply does not fit in a frame, which
    /// stops the server; the client sees the peer hang up.
    #[allow(clippy::panic)]
    pub fn spawn<F>(respond: F) -> io::Result<Self>
    where
        F: Fn(&Call) -> Reply + Send + 'static,
    {
        Self::spawn_raw(move |call, seq| {
            let reply = respond(call);
            match wire::encode_reply(&reply, seq, wire::DEFAULT_MAX_PAYLOAD) {
                Ok(bytes) => bytes,
                Err(err) => panic!("loopback server cannot encode {reply:?}: {err}"),
            }
        })
    }

    /// Bind and start serving, writing whatever bytes `respond` returns for
    /// a call with sequence number `seq`.
    pub fn spawn_raw<F>(respond: F) -> io::Result<Self>
    where
        F: Fn(&Call, u64) -> Vec<u8> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, &recorded, &respond);
            }
        });

        Ok(Self { addr, calls })
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Calls decoded so far, across all connections.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn serve<F>(mut stream: TcpStream, calls: &Mutex<Vec<Call>>, respond: &F)
where
    F: Fn(&Call, u64) -> Vec<u8>,
{
    loop {
        let mut header = [0u8; HEADER_LEN];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let Ok(rest) = wire::remaining_len(&header, wire::DEFAULT_MAX_PAYLOAD) else {
            return;
        };
        let mut packet = vec![0u8; HEADER_LEN + rest];
        packet[..HEADER_LEN].copy_from_slice(&header);
        if stream.read_exact(&mut packet[HEADER_LEN..]).is_err() {
            return;
        }
        let Ok((call, seq, _)) = wire::decode_call(&packet, wire::DEFAULT_MAX_PAYLOAD) else {
            return;
        };
        calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call.clone());
        let reply = respond(&call, seq);
        if stream.write_all(&reply).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_and_records_one_call() {
        let server = LoopbackServer::spawn(|_| Reply::Bool(true)).unwrap();
        let mut stream = TcpStream::connect(server.addr()).unwrap();

        let call = Call::ContainsMetadata {
            source_id: 1,
            graph_id: 2,
        };
        stream
            .write_all(&wire::encode_call(&call, 7, wire::DEFAULT_MAX_PAYLOAD).unwrap())
            .unwrap();

        let mut header = [0u8; HEADER_LEN];
        stream.read_exact(&mut header).unwrap();
        let rest = wire::remaining_len(&header, wire::DEFAULT_MAX_PAYLOAD).unwrap();
        let mut packet = header.to_vec();
        packet.resize(HEADER_LEN + rest, 0);
        stream.read_exact(&mut packet[HEADER_LEN..]).unwrap();

        let (reply, seq, _) = wire::decode_reply(&packet, wire::DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!((reply, seq), (Reply::Bool(true), 7));
        assert_eq!(server.calls(), vec![call]);
    }

    #[test]
    fn unencodable_reply_drops_the_connection() {
        let huge = Reply::Error(flock_proto::FlockError::new(
            "x".repeat(wire::DEFAULT_MAX_PAYLOAD + 1),
        ));
        let server = LoopbackServer::spawn(move |_| huge.clone()).unwrap();
        let mut stream = TcpStream::connect(server.addr()).unwrap();

        let call = Call::ContainsMetadata {
            source_id: 1,
            graph_id: 2,
        };
        stream
            .write_all(&wire::encode_call(&call, 1, wire::DEFAULT_MAX_PAYLOAD).unwrap())
            .unwrap();

        let mut byte = [0u8; 1];
        assert_eq!(stream.read(&mut byte).unwrap(), 0);
    }
}
