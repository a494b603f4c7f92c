use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::warn;

use super::protocol::{Packet, PacketHeader, PacketType, sequence_greater_than};

pub const RESEND_INTERVAL: Duration = Duration::from_millis(200);
pub const MAX_SEND_ATTEMPTS: u32 = 15;
const ACK_WINDOW: u32 = 32;
const RECENT_WINDOW: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    /// Fire and forget. Snapshots supersede each other.
    Unreliable,
    /// Resent until acknowledged.
    Reliable,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    sequence: u32,
    sent_at: Instant,
}

/// Tracks our outgoing sequences and turns the peer's acks into RTT samples.
#[derive(Debug)]
pub struct AckTracker {
    in_flight: VecDeque<InFlight>,
    capacity: usize,
    srtt_ms: f32,
    rtt_var_ms: f32,
}

impl AckTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            in_flight: VecDeque::with_capacity(capacity),
            capacity,
            srtt_ms: 100.0,
            rtt_var_ms: 50.0,
        }
    }

    pub fn track(&mut self, sequence: u32, sent_at: Instant) {
        if self.in_flight.len() == self.capacity {
            self.in_flight.pop_front();
        }
        self.in_flight.push_back(InFlight { sequence, sent_at });
    }

    /// Returns the sequences newly covered by `ack` and `bits`.
    pub fn on_ack(&mut self, ack: u32, bits: u32, now: Instant) -> Vec<u32> {
        let mut acked = Vec::new();
        let mut samples = Vec::new();
        self.in_flight.retain(|entry| {
            if !is_covered(entry.sequence, ack, bits) {
                return true;
            }
            acked.push(entry.sequence);
            samples.push(now.duration_since(entry.sent_at).as_secs_f32() * 1000.0);
            false
        });
        for sample in samples {
            self.add_rtt_sample(sample);
        }
        acked
    }

    fn add_rtt_sample(&mut self, rtt_ms: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;
        self.rtt_var_ms = (1.0 - BETA) * self.rtt_var_ms + BETA * (rtt_ms - self.srtt_ms).abs();
        self.srtt_ms = (1.0 - ALPHA) * self.srtt_ms + ALPHA * rtt_ms;
    }

    pub fn srtt_ms(&self) -> f32 {
        self.srtt_ms
    }

    pub fn rtt_var_ms(&self) -> f32 {
        self.rtt_var_ms
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

fn is_covered(sequence: u32, ack: u32, bits: u32) -> bool {
    if sequence == ack {
        return true;
    }
    if !sequence_greater_than(ack, sequence) {
        return false;
    }
    let distance = ack.wrapping_sub(sequence);
    distance <= ACK_WINDOW && bits & (1 << (distance - 1)) != 0
}

/// Remembers which peer sequences arrived, for acks and duplicate
/// suppression.
#[derive(Debug)]
pub struct ReceiveTracker {
    latest: Option<u32>,
    bits: u32,
    recent: [Option<u32>; RECENT_WINDOW],
}

impl Default for ReceiveTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiveTracker {
    pub fn new() -> Self {
        Self {
            latest: None,
            bits: 0,
            recent: [None; RECENT_WINDOW],
        }
    }

    /// Returns `false` for a sequence already seen.
    pub fn record(&mut self, sequence: u32) -> bool {
        let slot = sequence as usize % RECENT_WINDOW;
        if self.recent[slot] == Some(sequence) {
            return false;
        }
        self.recent[slot] = Some(sequence);

        match self.latest {
            None => self.latest = Some(sequence),
            Some(latest) if sequence_greater_than(sequence, latest) => {
                let shift = sequence.wrapping_sub(latest);
                self.bits = if shift <= ACK_WINDOW {
                    self.bits.checked_shl(shift).unwrap_or(0) | 1 << (shift - 1)
                } else {
                    0
                };
                self.latest = Some(sequence);
            }
            Some(latest) => {
                let distance = latest.wrapping_sub(sequence);
                if (1..=ACK_WINDOW).contains(&distance) {
                    self.bits |= 1 << (distance - 1);
                }
            }
        }
        true
    }

    pub fn ack_data(&self) -> (u32, u32) {
        (self.latest.unwrap_or(0), self.bits)
    }
}

#[derive(Debug, Clone)]
struct ReliableEntry {
    packet: Packet,
    last_sent: Instant,
    attempts: u32,
}

/// One end of a sequenced, acknowledged conversation with a peer.
///
/// Every outgoing packet carries acks for what we have received. Reliable
/// packets are kept and resent with their original sequence until the
/// peer acknowledges them.
#[derive(Debug)]
pub struct Channel {
    next_sequence: u32,
    received: ReceiveTracker,
    acks: AckTracker,
    reliable: VecDeque<ReliableEntry>,
    resend_interval: Duration,
    dropped_reliable: u64,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    /// Sequences start at 1 so that an ack of 0 means nothing received yet.
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            received: ReceiveTracker::new(),
            acks: AckTracker::new(256),
            reliable: VecDeque::new(),
            resend_interval: RESEND_INTERVAL,
            dropped_reliable: 0,
        }
    }

    pub fn with_resend_interval(mut self, interval: Duration) -> Self {
        self.resend_interval = interval;
        self
    }

    pub fn send(&mut self, payload: PacketType, reliability: Reliability) -> Packet {
        self.send_at(payload, reliability, Instant::now())
    }

    pub fn send_at(&mut self, payload: PacketType, reliability: Reliability, now: Instant) -> Packet {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1).max(1);
        let (ack, bits) = self.received.ack_data();
        let packet = Packet::new(PacketHeader::new(sequence, ack, bits), payload);
        self.acks.track(sequence, now);
        if reliability == Reliability::Reliable {
            self.reliable.push_back(ReliableEntry {
                packet: packet.clone(),
                last_sent: now,
                attempts: 1,
            });
        }
        packet
    }

    /// Consumes the header of an incoming packet. Returns the payload unless
    /// the packet is a duplicate.
    pub fn receive(&mut self, packet: Packet) -> Option<PacketType> {
        self.receive_at(packet, Instant::now())
    }

    pub fn receive_at(&mut self, packet: Packet, now: Instant) -> Option<PacketType> {
        let header = packet.header;
        let (ack, bits) = (header.ack, header.ack_bitfield);
        self.acks.on_ack(ack, bits, now);
        self.reliable
            .retain(|entry| !is_covered(entry.packet.header.sequence, ack, bits));

        if !self.received.record(header.sequence) {
            return None;
        }
        Some(packet.payload)
    }

    /// Reliable packets due for another attempt, with refreshed acks.
    pub fn collect_resends(&mut self) -> Vec<Packet> {
        self.collect_resends_at(Instant::now())
    }

    pub fn collect_resends_at(&mut self, now: Instant) -> Vec<Packet> {
        let (ack, bits) = self.received.ack_data();
        let mut resends = Vec::new();
        let interval = self.resend_interval;
        let mut dropped = 0;
        self.reliable.retain_mut(|entry| {
            if now.duration_since(entry.last_sent) < interval {
                return true;
            }
            if entry.attempts >= MAX_SEND_ATTEMPTS {
                dropped += 1;
                return false;
            }
            entry.attempts += 1;
            entry.last_sent = now;
            entry.packet.header.ack = ack;
            entry.packet.header.ack_bitfield = bits;
            resends.push(entry.packet.clone());
            true
        });
        if dropped > 0 {
            warn!("gave up on {dropped} reliable packet(s)");
            self.dropped_reliable += dropped;
        }
        resends
    }

    pub fn pending_reliable(&self) -> usize {
        self.reliable.len()
    }

    pub fn dropped_reliable(&self) -> u64 {
        self.dropped_reliable
    }

    pub fn rtt_ms(&self) -> f32 {
        self.acks.srtt_ms()
    }

    pub fn rtt_var_ms(&self) -> f32 {
        self.acks.rtt_var_ms()
    }
}
