//! Fixed-size wire records for boundary messages.
//!
//! A boundary message is a plain concatenation of `BodyRecord`s, so its
//! body count is its byte length divided by `RECORD_SIZE`. A length that
//! does not divide evenly means the stream is corrupt.

use crate::body::{Body, BodyId};
use crate::vector::Vec3;
use bytemuck::{Pod, Zeroable};
use collider_env::Rank;
use thiserror::Error;

/// Size in bytes of one encoded body.
pub const RECORD_SIZE: usize = std::mem::size_of::<BodyRecord>();

/// Malformed boundary message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("payload of {len} bytes is not a whole number of {record_size}-byte records")]
    Misaligned { len: usize, record_size: usize },

    #[error("probed {probed} bytes but received {received}")]
    SizeMismatch { probed: usize, received: usize },
}

/// Wire layout of one body.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BodyRecord {
    pub origin: u32,
    pub reserved: u32,
    pub serial: u64,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub color: [f64; 3],
}

fn to_array(v: &Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

fn from_array(a: [f64; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

impl From<&Body> for BodyRecord {
    fn from(body: &Body) -> Self {
        Self {
            origin: body.id.origin.0,
            reserved: 0,
            serial: body.id.serial,
            position: to_array(&body.position),
            velocity: to_array(&body.velocity),
            color: to_array(&body.color),
        }
    }
}

impl From<BodyRecord> for Body {
    fn from(record: BodyRecord) -> Self {
        Self {
            id: BodyId {
                origin: Rank(record.origin),
                serial: record.serial,
            },
            position: from_array(record.position),
            velocity: from_array(record.velocity),
            color: from_array(record.color),
        }
    }
}

/// Serializes bodies into one boundary message.
pub fn encode_bodies(bodies: &[Body]) -> Vec<u8> {
    let records: Vec<BodyRecord> = bodies.iter().map(BodyRecord::from).collect();
    bytemuck::cast_slice(&records).to_vec()
}

/// Number of bodies in a message of `len` bytes.
pub fn record_count(len: usize) -> Result<usize, WireError> {
    if len % RECORD_SIZE != 0 {
        return Err(WireError::Misaligned {
            len,
            record_size: RECORD_SIZE,
        });
    }
    Ok(len / RECORD_SIZE)
}

/// Decodes a boundary message, appending the bodies to `out`.
///
/// Received byte buffers carry no alignment guarantee, so records are read
/// unaligned.
pub fn decode_into(bytes: &[u8], out: &mut Vec<Body>) -> Result<usize, WireError> {
    let count = record_count(bytes.len())?;
    out.extend(
        bytes
            .chunks_exact(RECORD_SIZE)
            .map(|chunk| Body::from(bytemuck::pod_read_unaligned::<BodyRecord>(chunk))),
    );
    Ok(count)
}
