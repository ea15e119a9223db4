//! Append-only outbound byte stream.
//!
//! A [`WriteStream`] accumulates typed little-endian values. Flushing hands
//! the whole buffer to a [`Transport`] as one unit and clears it, so every
//! event appended during a tick reaches the peer together and in order.

use std::cell::RefCell;
use std::rc::Rc;

use crate::math::{Rotation, Vector3};

/// Receives flushed stream contents. Implemented by the network layer.
pub trait Transport {
    /// Deliver one batch of bytes.
    fn send(&mut self, bytes: &[u8]);
}

/// Transport that keeps every batch in memory. Useful for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    /// Batches in delivery order.
    pub batches: Vec<Vec<u8>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes received across all batches.
    pub fn total_bytes(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, bytes: &[u8]) {
        self.batches.push(bytes.to_vec());
    }
}

impl<T: Transport> Transport for Rc<RefCell<T>> {
    fn send(&mut self, bytes: &[u8]) {
        self.borrow_mut().send(bytes);
    }
}

/// Transport that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, _bytes: &[u8]) {}
}

/// Growable little-endian byte buffer with typed writers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteStream {
    buffer: Vec<u8>,
}

impl WriteStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Write a 16-bit integer.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 32-bit integer.
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 64-bit integer.
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Write a float rounded and clamped into the `i16` range.
    pub fn write_saturated16(&mut self, value: f32) {
        self.buffer.extend_from_slice(&saturate_i16(value).to_le_bytes());
    }

    /// Write a string prefixed by its byte length as `u16`.
    ///
    /// Strings longer than `u16::MAX` bytes are truncated at the last
    /// character boundary that fits.
    pub fn write_string(&mut self, value: &str) {
        let mut end = value.len().min(u16::MAX as usize);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        self.write_u16(end as u16);
        self.buffer.extend_from_slice(&value.as_bytes()[..end]);
    }

    /// Write an `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a vector at full precision.
    pub fn write_vector(&mut self, value: &Vector3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    /// Write a vector with each component saturated to `i16`.
    pub fn write_vector16(&mut self, value: &Vector3) {
        self.write_saturated16(value.x);
        self.write_saturated16(value.y);
        self.write_saturated16(value.z);
    }

    /// Write a rotation at reduced precision: each axis as `i16` of its
    /// normalised angle scaled by `32767 / 180`.
    pub fn write_rotation(&mut self, value: &Rotation) {
        for angle in [value.pitch, value.yaw, value.roll] {
            let scaled = Rotation::normalize_angle(angle) * (i16::MAX as f32 / 180.0);
            self.buffer.extend_from_slice(&saturate_i16(scaled).to_le_bytes());
        }
    }

    /// Write a rotation at full precision.
    pub fn write_precision_rotation(&mut self, value: &Rotation) {
        self.write_f32(value.pitch);
        self.write_f32(value.yaw);
        self.write_f32(value.roll);
    }

    /// Write a value in `-1.0..=1.0` as a signed byte scaled by 127.
    pub fn write_signed_fraction(&mut self, value: f32) {
        let scaled = (value.clamp(-1.0, 1.0) * 127.0).round() as i8;
        self.buffer.extend_from_slice(&scaled.to_le_bytes());
    }

    /// Append the contents of another stream.
    pub fn write_stream(&mut self, other: &WriteStream) {
        self.buffer.extend_from_slice(&other.buffer);
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Hand the buffer to `transport` as one batch and clear it.
    /// Does nothing when the stream is empty.
    pub fn flush(&mut self, transport: &mut dyn Transport) {
        if self.buffer.is_empty() {
            return;
        }
        transport.send(&self.buffer);
        self.buffer.clear();
    }

    /// Discard everything written so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn saturate_i16(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
