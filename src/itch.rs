//! C9: NASDAQ ITCH 5.0 subset encoder. Big-endian, packed, no padding.

use crate::types::{EventRecord, EventType};

pub const SYMBOL_LEN: usize = 8;

fn pad_symbol(symbol: &str) -> [u8; SYMBOL_LEN] {
    let mut buf = [b' '; SYMBOL_LEN];
    let bytes = symbol.as_bytes();
    let n = bytes.len().min(SYMBOL_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

fn ts48(ts_ns: u64) -> [u8; 6] {
    let full = ts_ns.to_be_bytes();
    let mut out = [0u8; 6];
    out.copy_from_slice(&full[2..8]);
    out
}

/// Stateful only in its match-number counter; callers that need
/// determinism across resumes must persist that counter themselves.
pub struct ItchEncoder {
    symbol: [u8; SYMBOL_LEN],
    stock_locate: u16,
    tick_size: u32,
    match_number: u64,
}

impl ItchEncoder {
    pub fn new(symbol: &str, stock_locate: u16, tick_size: u32) -> Self {
        ItchEncoder {
            symbol: pad_symbol(symbol),
            stock_locate,
            tick_size,
            match_number: 0,
        }
    }

    /// 12-byte System Event message ('S'), carrying a single event code.
    pub fn encode_system_event(&self, event_code: u8, ts_ns: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(12);
        out.push(b'S');
        out.extend_from_slice(&self.stock_locate.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // tracking number
        out.extend_from_slice(&ts48(ts_ns));
        out.push(event_code);
        out
    }

    /// 39-byte Stock Directory message ('R').
    pub fn encode_stock_directory(&self, ts_ns: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(39);
        out.push(b'R');
        out.extend_from_slice(&self.stock_locate.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&ts48(ts_ns));
        out.extend_from_slice(&self.symbol);
        out.resize(39, 0);
        out
    }

    /// Translates an `EventRecord` into its ITCH message. Returns `None`
    /// for event types with no direct ITCH mapping (none currently; kept
    /// as a capability-set extension point).
    pub fn encode(&mut self, record: &EventRecord) -> Option<Vec<u8>> {
        match record.event_type {
            EventType::AddBid | EventType::AddAsk => Some(self.encode_add_order(record)),
            EventType::CancelBid | EventType::CancelAsk => Some(self.encode_order_delete(record)),
            EventType::ExecuteBuy | EventType::ExecuteSell => Some(self.encode_order_executed(record)),
        }
    }

    /// 36-byte Add Order message ('A').
    fn encode_add_order(&self, record: &EventRecord) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.push(b'A');
        out.extend_from_slice(&self.stock_locate.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&ts48(record.ts_ns));
        out.extend_from_slice(&record.order_id.to_be_bytes());
        let buy_sell = if record.event_type == EventType::AddBid { b'B' } else { b'S' };
        out.push(buy_sell);
        out.extend_from_slice(&record.qty.to_be_bytes());
        out.extend_from_slice(&self.symbol);
        let price = (record.price_ticks as i64 * self.tick_size as i64) as u32;
        out.extend_from_slice(&price.to_be_bytes());
        out
    }

    /// 19-byte Order Delete message ('D').
    fn encode_order_delete(&self, record: &EventRecord) -> Vec<u8> {
        let mut out = Vec::with_capacity(19);
        out.push(b'D');
        out.extend_from_slice(&self.stock_locate.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&ts48(record.ts_ns));
        out.extend_from_slice(&record.order_id.to_be_bytes());
        out
    }

    /// 31-byte Order Executed message ('E'). Advances the match-number
    /// counter, which starts at 1.
    fn encode_order_executed(&mut self, record: &EventRecord) -> Vec<u8> {
        self.match_number += 1;
        let mut out = Vec::with_capacity(31);
        out.push(b'E');
        out.extend_from_slice(&self.stock_locate.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&ts48(record.ts_ns));
        out.extend_from_slice(&record.order_id.to_be_bytes());
        out.extend_from_slice(&record.qty.to_be_bytes());
        out.extend_from_slice(&self.match_number.to_be_bytes());
        out
    }
}
