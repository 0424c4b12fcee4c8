//! C10: accumulates encoded ITCH messages into MTU-aware UDP datagrams
//! with monotonic, global sequence numbers.

pub const HEADER_SIZE: usize = 20;
pub const SESSION_ID_LEN: usize = 10;
pub const DEFAULT_MTU_PAYLOAD: usize = 1400;

fn pad_session(session_id: &str) -> [u8; SESSION_ID_LEN] {
    let mut buf = [b' '; SESSION_ID_LEN];
    let bytes = session_id.as_bytes();
    let n = bytes.len().min(SESSION_ID_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

pub struct MoldUdp64Framer {
    session_id: [u8; SESSION_ID_LEN],
    mtu_payload: usize,
    /// Global monotonic counter; the next packet's header carries the
    /// sequence number of its first message.
    next_sequence: u64,
    datagram: Vec<u8>,
    pending_messages: Vec<(u64, Vec<u8>)>,
    pending_first_seq: Option<u64>,
}

impl MoldUdp64Framer {
    pub fn new(session_id: &str, mtu_payload: usize) -> Self {
        MoldUdp64Framer {
            session_id: pad_session(session_id),
            mtu_payload,
            next_sequence: 1,
            datagram: Vec::new(),
            pending_messages: Vec::new(),
            pending_first_seq: None,
        }
    }

    fn current_payload_len(&self) -> usize {
        self.pending_messages.iter().map(|(_, m)| 2 + m.len()).sum()
    }

    /// Pushes one ITCH message; returns `Some(datagram)` if this push
    /// filled the current datagram (the message itself starts a new one).
    /// Messages are never split across datagrams.
    pub fn push(&mut self, message: Vec<u8>) -> Option<Vec<u8>> {
        let added = 2 + message.len();
        let mut emitted = None;
        if !self.pending_messages.is_empty() && self.current_payload_len() + added > self.mtu_payload {
            emitted = Some(self.build_datagram());
        }
        if self.pending_first_seq.is_none() {
            self.pending_first_seq = Some(self.next_sequence);
        }
        self.next_sequence += 1;
        self.pending_messages.push((0, message));
        emitted
    }

    /// Returns the partially-filled datagram (may be empty).
    pub fn flush(&mut self) -> Vec<u8> {
        if self.pending_messages.is_empty() {
            self.datagram.clear();
            return Vec::new();
        }
        self.build_datagram()
    }

    fn build_datagram(&mut self) -> Vec<u8> {
        let first_seq = self.pending_first_seq.take().unwrap_or(self.next_sequence);
        let count = self.pending_messages.len() as u16;
        let mut out = Vec::with_capacity(HEADER_SIZE + self.current_payload_len());
        out.extend_from_slice(&self.session_id);
        out.extend_from_slice(&first_seq.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        for (_, msg) in self.pending_messages.drain(..) {
            out.extend_from_slice(&(msg.len() as u16).to_be_bytes());
            out.extend_from_slice(&msg);
        }
        out
    }
}

/// Decodes a MoldUDP64 datagram back into its header fields and message
/// blocks; used by tests and by any consumer validating wire output.
pub struct DecodedDatagram {
    pub session_id: [u8; SESSION_ID_LEN],
    pub sequence_number: u64,
    pub message_count: u16,
    pub messages: Vec<Vec<u8>>,
}

pub fn decode_datagram(bytes: &[u8]) -> Option<DecodedDatagram> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }
    let mut session_id = [0u8; SESSION_ID_LEN];
    session_id.copy_from_slice(&bytes[0..10]);
    let sequence_number = u64::from_be_bytes(bytes[10..18].try_into().ok()?);
    let message_count = u16::from_be_bytes(bytes[18..20].try_into().ok()?);
    let mut messages = Vec::with_capacity(message_count as usize);
    let mut pos = HEADER_SIZE;
    for _ in 0..message_count {
        if pos + 2 > bytes.len() {
            return None;
        }
        let len = u16::from_be_bytes(bytes[pos..pos + 2].try_into().ok()?) as usize;
        pos += 2;
        if pos + len > bytes.len() {
            return None;
        }
        messages.push(bytes[pos..pos + len].to_vec());
        pos += len;
    }
    Some(DecodedDatagram {
        session_id,
        sequence_number,
        message_count,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_small_message_is_not_flushed_until_asked() {
        let mut framer = MoldUdp64Framer::new("sess1", DEFAULT_MTU_PAYLOAD);
        assert!(framer.push(vec![1, 2, 3]).is_none());
        let dg = framer.flush();
        let decoded = decode_datagram(&dg).unwrap();
        assert_eq!(decoded.message_count, 1);
        assert_eq!(decoded.sequence_number, 1);
        assert_eq!(decoded.messages[0], vec![1, 2, 3]);
    }

    #[test]
    fn sequence_numbers_advance_by_message_count() {
        let mut framer = MoldUdp64Framer::new("sess1", 40);
        // each message is 10 bytes + 2-byte length prefix = 12; 3 fit, 4th overflows.
        let msg = vec![0u8; 10];
        let mut first = None;
        for _ in 0..4 {
            if let Some(dg) = framer.push(msg.clone()) {
                let decoded = decode_datagram(&dg).unwrap();
                first = Some(decoded);
            }
        }
        let dg2 = framer.flush();
        let second = decode_datagram(&dg2).unwrap();
        let first = first.unwrap();
        assert_eq!(second.sequence_number, first.sequence_number + first.message_count as u64);
    }

    #[test]
    fn no_message_exceeds_mtu_cap() {
        let mtu = 40;
        let mut framer = MoldUdp64Framer::new("sess1", mtu);
        let msg = vec![0u8; 10];
        let mut datagrams = Vec::new();
        for _ in 0..10 {
            if let Some(dg) = framer.push(msg.clone()) {
                datagrams.push(dg);
            }
        }
        datagrams.push(framer.flush());
        for dg in &datagrams {
            assert!(dg.len() <= mtu + HEADER_SIZE);
        }
    }

    #[test]
    fn concatenated_messages_equal_original_sequence() {
        let mut framer = MoldUdp64Framer::new("sess1", 30);
        let originals: Vec<Vec<u8>> = (0..20).map(|i| vec![i as u8; 5]).collect();
        let mut datagrams = Vec::new();
        for m in &originals {
            if let Some(dg) = framer.push(m.clone()) {
                datagrams.push(dg);
            }
        }
        datagrams.push(framer.flush());
        let mut reconstructed = Vec::new();
        for dg in &datagrams {
            if dg.is_empty() {
                continue;
            }
            reconstructed.extend(decode_datagram(dg).unwrap().messages);
        }
        assert_eq!(reconstructed, originals);
    }

    #[test]
    fn flush_on_empty_framer_returns_empty_vec() {
        let mut framer = MoldUdp64Framer::new("sess1", DEFAULT_MTU_PAYLOAD);
        assert!(framer.flush().is_empty());
    }

    #[test]
    fn session_id_is_fixed_and_padded() {
        let mut framer = MoldUdp64Framer::new("s1", DEFAULT_MTU_PAYLOAD);
        framer.push(vec![9]);
        let dg = framer.flush();
        let decoded = decode_datagram(&dg).unwrap();
        assert_eq!(&decoded.session_id, b"s1        ");
    }
}
