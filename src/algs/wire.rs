//! Fixed, little-endian wire records for collective reads.

use bytemuck::{Pod, Zeroable};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Copy bytes into a typed vector; tolerates any source alignment.
pub fn collect_from_bytes<T: Pod>(v: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(v)
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Header broadcast before every collective payload.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireStatus {
    pub version_le: u16,
    pub ok_le: u16,   // 1 = payload follows, 0 = error message follows
    pub len_le: u32,  // element count of the payload
}

impl WireStatus {
    pub fn ok(len: usize) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            ok_le: 1u16.to_le(),
            len_le: (len as u32).to_le(),
        }
    }

    pub fn failed() -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            ok_le: 0,
            len_le: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        u16::from_le(self.ok_le) == 1
    }

    pub fn len(&self) -> usize {
        u32::from_le(self.len_le) as usize
    }

    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_survives_byte_copy() {
        let status = WireStatus::ok(17);
        let bytes = cast_slice(std::slice::from_ref(&status)).to_vec();
        let back: Vec<WireStatus> = collect_from_bytes(&bytes);
        assert!(back[0].is_ok());
        assert_eq!(back[0].len(), 17);
        assert_eq!(back[0].version(), WIRE_VERSION);
        assert!(!WireStatus::failed().is_ok());
    }
}
