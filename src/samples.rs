use std::path::Path;

use glam::Vec3;

use crate::error::AssetError;

/// Precomputed spatial point samples for one foliage mesh.
///
/// Binary layout (little endian): `u32` sample count, `u32` floats per
/// sample (>= 3), then `count * floats_per_sample` f32 values. The first
/// three floats of every record are the world-space position; the rest are
/// ignored.
pub struct SpatialSamples {
    positions: Vec<Vec3>,
}

impl SpatialSamples {
    pub fn from_file(path: impl AsRef<Path>) -> Result<SpatialSamples, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;
        Self::from_bytes(&bytes).map_err(|reason| AssetError::malformed(path, reason))
    }

    fn from_bytes(bytes: &[u8]) -> Result<SpatialSamples, String> {
        let read_u32 = |offset: usize| -> Result<u32, String> {
            let end = offset + 4;
            let slice = bytes
                .get(offset..end)
                .ok_or_else(|| format!("truncated header at byte {offset}"))?;
            Ok(u32::from_le_bytes(slice.try_into().unwrap()))
        };

        let count = read_u32(0)? as usize;
        let floats_per_sample = read_u32(4)? as usize;
        if floats_per_sample < 3 {
            return Err(format!(
                "floats per sample must be >= 3, got {floats_per_sample}"
            ));
        }

        let payload = &bytes[8..];
        // Checked so a corrupt header cannot wrap the size past the bounds
        // test below.
        let expected = count
            .checked_mul(floats_per_sample)
            .and_then(|floats| floats.checked_mul(4))
            .ok_or_else(|| format!("sample count {count} x stride {floats_per_sample} overflows"))?;
        if payload.len() < expected {
            return Err(format!(
                "expected {expected} payload bytes for {count} samples, got {}",
                payload.len()
            ));
        }

        let mut positions = Vec::with_capacity(count);
        for sample in 0..count {
            let base = sample * floats_per_sample * 4;
            let component = |i: usize| {
                let offset = base + i * 4;
                f32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap())
            };
            positions.push(Vec3::new(component(0), component(1), component(2)));
        }

        Ok(SpatialSamples { positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Vec3> {
        self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(floats_per_sample: u32, samples: &[&[f32]]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(samples.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&floats_per_sample.to_le_bytes());
        for sample in samples {
            for value in *sample {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn parses_positions_and_skips_extra_floats() {
        let bytes = encode(
            4,
            &[&[1.0, 2.0, 3.0, 9.0], &[-4.0, 0.5, 6.0, 9.0]],
        );
        let samples = SpatialSamples::from_bytes(&bytes).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples.positions()[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(samples.positions()[1], Vec3::new(-4.0, 0.5, 6.0));
    }

    #[test]
    fn empty_sample_set_is_valid() {
        let samples = SpatialSamples::from_bytes(&encode(3, &[])).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = encode(3, &[&[1.0, 2.0, 3.0]]);
        bytes.truncate(bytes.len() - 2);
        assert!(SpatialSamples::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_undersized_records() {
        let bytes = encode(2, &[&[1.0, 2.0]]);
        assert!(SpatialSamples::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_short_header() {
        assert!(SpatialSamples::from_bytes(&[0, 0, 0]).is_err());
    }

    #[test]
    fn rejects_header_with_overflowing_size() {
        // count and stride whose product wraps around usize
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x8000_0000u32.to_le_bytes());
        bytes.extend_from_slice(&0x8000_0000u32.to_le_bytes());
        assert!(SpatialSamples::from_bytes(&bytes).is_err());

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        assert!(SpatialSamples::from_bytes(&bytes).is_err());
    }
}
