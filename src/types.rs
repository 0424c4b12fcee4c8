use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed enumeration of the six event types the producer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    AddBid,
    AddAsk,
    CancelBid,
    CancelAsk,
    ExecuteBuy,
    ExecuteSell,
}

impl EventType {
    /// Fixed scan order used by `EventSampler::sample_type`; part of the
    /// reproducibility contract — do not reorder.
    pub const SCAN_ORDER: [EventType; 6] = [
        EventType::AddBid,
        EventType::AddAsk,
        EventType::CancelBid,
        EventType::CancelAsk,
        EventType::ExecuteBuy,
        EventType::ExecuteSell,
    ];

    pub fn as_disk_byte(self) -> u8 {
        match self {
            EventType::AddBid => 0,
            EventType::AddAsk => 1,
            EventType::CancelBid => 2,
            EventType::CancelAsk => 3,
            EventType::ExecuteBuy => 4,
            EventType::ExecuteSell => 5,
        }
    }

    pub fn from_disk_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => EventType::AddBid,
            1 => EventType::AddAsk,
            2 => EventType::CancelBid,
            3 => EventType::CancelAsk,
            4 => EventType::ExecuteBuy,
            5 => EventType::ExecuteSell,
            _ => return None,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::AddBid => "ADD_BID",
            EventType::AddAsk => "ADD_ASK",
            EventType::CancelBid => "CANCEL_BID",
            EventType::CancelAsk => "CANCEL_ASK",
            EventType::ExecuteBuy => "EXECUTE_BUY",
            EventType::ExecuteSell => "EXECUTE_SELL",
        };
        write!(f, "{s}")
    }
}

/// Side of the book a record refers to; `Na` covers messages with no side
/// (none are emitted by the producer today, but the wire encoder needs the
/// full tri-state for non-order ITCH messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
    Na,
}

impl Side {
    pub fn as_disk_byte(self) -> u8 {
        match self {
            Side::Bid => 0,
            Side::Ask => 1,
            Side::Na => 2,
        }
    }

    pub fn from_disk_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Side::Bid,
            1 => Side::Ask,
            2 => Side::Na,
            _ => return None,
        })
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
            Side::Na => Side::Na,
        }
    }
}

/// Minimal hand-rolled bitflags macro: the corpus does not depend on the
/// `bitflags` crate anywhere, and three bits do not warrant pulling it in.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(pub $repr);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn set(&mut self, other: Self) {
                self.0 |= other.0;
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitflags_like! {
    /// Producer-only annotations. Never persisted — `DiskEventRecord` has
    /// no `flags` field, which is the whole point of the split.
    pub struct EventFlags: u32 {
        const SHIFT_UP = 1 << 0;
        const SHIFT_DOWN = 1 << 1;
        const BOOK_REINIT = 1 << 2;
    }
}

/// In-memory event record, 30 bytes logically (fields as laid out below
/// occupy more than 30 bytes of Rust struct storage due to alignment and
/// enum tag width; the 30-byte figure describes the wire-equivalent field
/// widths: 8+1+1+4+4+8+4 = 30).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub ts_ns: u64,
    pub event_type: EventType,
    pub side: Side,
    pub price_ticks: i32,
    pub qty: u32,
    pub order_id: u64,
    pub flags: EventFlags,
}

/// On-disk record: 26 bytes packed, little-endian. No `flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct DiskEventRecord {
    pub ts_ns: u64,
    pub event_type: u8,
    pub side: u8,
    pub price_ticks: i32,
    pub qty: u32,
    pub order_id: u64,
}

pub const DISK_EVENT_RECORD_SIZE: usize = 26;
const _: () = assert!(std::mem::size_of::<DiskEventRecord>() == DISK_EVENT_RECORD_SIZE);

impl DiskEventRecord {
    pub fn from_event_record(r: &EventRecord) -> Self {
        DiskEventRecord {
            ts_ns: r.ts_ns,
            event_type: r.event_type.as_disk_byte(),
            side: r.side.as_disk_byte(),
            price_ticks: r.price_ticks,
            qty: r.qty,
            order_id: r.order_id,
        }
    }

    pub fn to_bytes(&self) -> [u8; DISK_EVENT_RECORD_SIZE] {
        let mut buf = [0u8; DISK_EVENT_RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.ts_ns.to_le_bytes());
        buf[8] = self.event_type;
        buf[9] = self.side;
        buf[10..14].copy_from_slice(&self.price_ticks.to_le_bytes());
        buf[14..18].copy_from_slice(&self.qty.to_le_bytes());
        buf[18..26].copy_from_slice(&self.order_id.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; DISK_EVENT_RECORD_SIZE]) -> Self {
        DiskEventRecord {
            ts_ns: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            event_type: buf[8],
            side: buf[9],
            price_ticks: i32::from_le_bytes(buf[10..14].try_into().unwrap()),
            qty: u32::from_le_bytes(buf[14..18].try_into().unwrap()),
            order_id: u64::from_le_bytes(buf[18..26].try_into().unwrap()),
        }
    }
}

/// Derived O(1) features of the book, recomputed every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookFeatures {
    pub best_bid: i32,
    pub best_ask: i32,
    pub spread: i32,
    pub best_bid_depth: u32,
    pub best_ask_depth: u32,
    pub imbalance: f64,
    pub total_bid_depth: u64,
    pub total_ask_depth: u64,
}

/// Full book snapshot, used only by the curve-based intensity model.
#[derive(Debug, Clone, PartialEq)]
pub struct BookState {
    pub features: BookFeatures,
    /// Per-level depths, index 0 = best, length K.
    pub bid_depths: Vec<u32>,
    pub ask_depths: Vec<u32>,
}

/// Six non-negative rates in events/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intensities {
    pub add_bid: f64,
    pub add_ask: f64,
    pub cancel_bid: f64,
    pub cancel_ask: f64,
    pub exec_buy: f64,
    pub exec_sell: f64,
}

/// Clamps every component to a tiny positive floor and rejects NaN/Inf.
pub const EPSILON_GUARD: f64 = 1e-9;

impl Intensities {
    pub fn clamp(mut self) -> Self {
        for v in [
            &mut self.add_bid,
            &mut self.add_ask,
            &mut self.cancel_bid,
            &mut self.cancel_ask,
            &mut self.exec_buy,
            &mut self.exec_sell,
        ] {
            if !v.is_finite() || *v < EPSILON_GUARD {
                *v = EPSILON_GUARD;
            }
        }
        self
    }

    pub fn total(&self) -> f64 {
        self.add_bid + self.add_ask + self.cancel_bid + self.cancel_ask + self.exec_buy + self.exec_sell
    }

    /// Values in `EventType::SCAN_ORDER`.
    pub fn in_scan_order(&self) -> [f64; 6] {
        [
            self.add_bid,
            self.add_ask,
            self.cancel_bid,
            self.cancel_ask,
            self.exec_buy,
            self.exec_sell,
        ]
    }
}

/// A single security's simulation parameters, shared across its days.
#[derive(Debug, Clone)]
pub struct TradingSession {
    pub seed: u64,
    pub p0_ticks: i32,
    pub session_seconds: u32,
    pub levels_per_side: u32,
    pub tick_size: u32,
    pub initial_spread_ticks: u32,
    pub initial_depth: u32,
    pub market_open_ns: u64,
    pub chunk_capacity: u32,
}

impl Default for TradingSession {
    fn default() -> Self {
        TradingSession {
            seed: 0,
            p0_ticks: 10_000,
            session_seconds: 23_400,
            levels_per_side: 5,
            tick_size: 100,
            initial_spread_ticks: 2,
            initial_depth: 5,
            market_open_ns: 0,
            chunk_capacity: 4096,
        }
    }
}

/// Selects which `IntensityModel` implementation a security's sessions use.
/// `SimpleImbalance` needs no parameters beyond `levels_per_side`;
/// `CurveIntensity` either loads a table from JSON or falls back to
/// `CurveIntensity::defaults` when no path is given.
#[derive(Debug, Clone)]
pub enum ModelChoice {
    SimpleImbalance,
    CurveIntensity {
        curve_table_path: Option<std::path::PathBuf>,
        n_max: usize,
    },
}

impl Default for ModelChoice {
    fn default() -> Self {
        ModelChoice::SimpleImbalance
    }
}

/// A symbol string bound to a `TradingSession` template and a model choice.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub symbol: String,
    pub template: TradingSession,
    pub model: ModelChoice,
}

/// Top-level run configuration, either single- or multi-security.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_seed: u64,
    pub output_dir: std::path::PathBuf,
    pub start_date: String,
    pub num_days: u32,
    pub tick_size: u32,
    pub p0_ticks: i32,
    pub securities: Vec<SecurityConfig>,
    pub realtime: bool,
    pub speed_multiplier: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_event_record_is_26_bytes() {
        assert_eq!(std::mem::size_of::<DiskEventRecord>(), 26);
    }

    #[test]
    fn disk_record_round_trips_through_bytes() {
        let r = EventRecord {
            ts_ns: 123_456_789,
            event_type: EventType::AddBid,
            side: Side::Bid,
            price_ticks: -42,
            qty: 7,
            order_id: 99,
            flags: EventFlags::empty(),
        };
        let disk = DiskEventRecord::from_event_record(&r);
        let bytes = disk.to_bytes();
        let back = DiskEventRecord::from_bytes(&bytes);
        assert_eq!(disk, back);
        assert_eq!(back.price_ticks, -42);
    }

    #[test]
    fn event_type_disk_byte_round_trips() {
        for t in EventType::SCAN_ORDER {
            assert_eq!(EventType::from_disk_byte(t.as_disk_byte()), Some(t));
        }
    }

    #[test]
    fn intensities_clamp_rejects_nan_and_negative() {
        let i = Intensities {
            add_bid: f64::NAN,
            add_ask: -1.0,
            cancel_bid: 0.0,
            cancel_ask: 5.0,
            exec_buy: f64::INFINITY,
            exec_sell: 3.0,
        }
        .clamp();
        assert!(i.add_bid >= EPSILON_GUARD && i.add_bid.is_finite());
        assert!(i.add_ask >= EPSILON_GUARD);
        assert!(i.cancel_bid >= EPSILON_GUARD);
        assert_eq!(i.cancel_ask, 5.0);
        assert!(i.exec_buy >= EPSILON_GUARD && i.exec_buy.is_finite());
        assert!(i.total() > 0.0);
    }

    #[test]
    fn event_flags_accumulate() {
        let mut f = EventFlags::empty();
        assert!(!f.contains(EventFlags::SHIFT_UP));
        f.set(EventFlags::SHIFT_UP);
        assert!(f.contains(EventFlags::SHIFT_UP));
        assert!(!f.contains(EventFlags::SHIFT_DOWN));
    }
}
