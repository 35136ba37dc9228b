use std::collections::VecDeque;

use bytes::Bytes;

/// Per-class queue limit in packets applied when a class is configured
/// with a zero qlimit.
pub const DEFAULT_QLIMIT: u32 = 50;

/// Bounded drop-tail FIFO with byte accounting.
#[derive(Debug)]
pub(crate) struct ClassQueue {
    packets: VecDeque<Bytes>,
    qlimit: u32,
    bytes: u64,
}

impl ClassQueue {
    pub(crate) fn new(qlimit: u32) -> Self {
        Self { packets: VecDeque::new(), qlimit, bytes: 0 }
    }

    /// Appends a packet, handing it back if the queue is at its limit.
    pub(crate) fn enqueue(&mut self, packet: Bytes) -> Result<(), Bytes> {
        if self.packets.len() as u32 >= self.qlimit {
            return Err(packet);
        }
        self.bytes += packet.len() as u64;
        self.packets.push_back(packet);
        Ok(())
    }

    pub(crate) fn dequeue(&mut self) -> Option<Bytes> {
        let packet = self.packets.pop_front()?;
        self.bytes -= packet.len() as u64;
        Some(packet)
    }

    pub(crate) fn head(&self) -> Option<&Bytes> {
        self.packets.front()
    }

    pub(crate) fn head_len(&self) -> Option<u64> {
        self.packets.front().map(|p| p.len() as u64)
    }

    pub(crate) fn len(&self) -> u32 {
        self.packets.len() as u32
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub(crate) fn qlimit(&self) -> u32 {
        self.qlimit
    }
}
