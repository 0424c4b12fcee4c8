//! Composes an `ItchEncoder` + `MoldUdp64Framer` + a UDP socket into an
//! `EventSink`. UDP sends are fire-and-forget; failures are logged and
//! dropped (NetworkTransient), never retried.

use super::EventSink;
use crate::error::Result;
use crate::itch::ItchEncoder;
use crate::mold::MoldUdp64Framer;
use crate::types::EventRecord;
use std::net::{ToSocketAddrs, UdpSocket};
use tracing::warn;

pub struct NetworkWireSink {
    encoder: ItchEncoder,
    framer: MoldUdp64Framer,
    socket: UdpSocket,
    destination: std::net::SocketAddr,
}

impl NetworkWireSink {
    pub fn new(
        symbol: &str,
        stock_locate: u16,
        tick_size: u32,
        session_id: &str,
        mtu_payload: usize,
        destination: impl ToSocketAddrs,
    ) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let destination = destination
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| crate::error::QrsdpError::Configuration("no destination address resolved".into()))?;
        Ok(NetworkWireSink {
            encoder: ItchEncoder::new(symbol, stock_locate, tick_size),
            framer: MoldUdp64Framer::new(session_id, mtu_payload),
            socket,
            destination,
        })
    }

    fn send(&self, datagram: &[u8]) {
        if datagram.is_empty() {
            return;
        }
        if let Err(e) = self.socket.send_to(datagram, self.destination) {
            warn!(error = %e, "udp send failed, dropping datagram (no retry)");
        }
    }
}

impl EventSink for NetworkWireSink {
    fn append(&mut self, record: &EventRecord) -> Result<()> {
        if let Some(message) = self.encoder.encode(record) {
            if let Some(datagram) = self.framer.push(message) {
                self.send(&datagram);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let datagram = self.framer.flush();
        self.send(&datagram);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventFlags, EventType, Side};

    #[test]
    fn loopback_round_trip_decodes_same_fields() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();
        receiver.set_read_timeout(Some(std::time::Duration::from_secs(2))).unwrap();

        let mut sink = NetworkWireSink::new("AAPL", 1, 100, "sess1", 1400, ("127.0.0.1", port)).unwrap();
        let record = EventRecord {
            ts_ns: 42,
            event_type: EventType::AddBid,
            side: Side::Bid,
            price_ticks: 10_000,
            qty: 5,
            order_id: 7,
            flags: EventFlags::empty(),
        };
        sink.append(&record).unwrap();
        sink.flush().unwrap();

        let mut buf = [0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let decoded = crate::mold::decode_datagram(&buf[..len]).unwrap();
        assert_eq!(decoded.message_count, 1);
        let order_ref = u64::from_be_bytes(decoded.messages[0][11..19].try_into().unwrap());
        assert_eq!(order_ref, 7);
    }
}
