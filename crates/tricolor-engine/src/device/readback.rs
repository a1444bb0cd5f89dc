//! GPU → CPU buffer transfers.

use std::sync::mpsc;

use anyhow::{Context, Result};

/// Row pitch for a texture-to-buffer copy of `width` RGBA8 texels, or `None`
/// when it does not fit in a `u32`.
///
/// wgpu requires `bytes_per_row` to be a multiple of
/// `COPY_BYTES_PER_ROW_ALIGNMENT` (256).
pub fn padded_bytes_per_row(width: u32) -> Option<u32> {
    width
        .checked_mul(4)?
        .checked_next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Removes row padding: keeps the first `row_bytes` of every `pitch`-byte row.
pub fn strip_row_padding(padded: &[u8], row_bytes: usize, pitch: usize, rows: usize) -> Vec<u8> {
    debug_assert!(row_bytes <= pitch);

    let mut out = Vec::with_capacity(row_bytes * rows);
    for chunk in padded.chunks(pitch).take(rows) {
        out.extend_from_slice(&chunk[..row_bytes]);
    }
    out
}

/// Maps `buffer` for reading, blocks until the GPU is done with it and copies its
/// contents out.
///
/// `buffer` must have been created with `MAP_READ` and all writes to it must
/// already be submitted.
pub fn read_buffer(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
    let slice = buffer.slice(..);

    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver only disappears if read_buffer already bailed out.
        let _ = tx.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed while waiting for readback")?;

    rx.recv()
        .context("map_async callback was dropped")?
        .context("failed to map readback buffer")?;

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_pitch_is_aligned() {
        assert_eq!(padded_bytes_per_row(1), Some(256));
        assert_eq!(padded_bytes_per_row(64), Some(256));
        assert_eq!(padded_bytes_per_row(65), Some(512));
        assert_eq!(padded_bytes_per_row(100), Some(512));
    }

    #[test]
    fn row_pitch_overflow_is_none() {
        assert_eq!(padded_bytes_per_row(1 << 30), None);
        assert_eq!(padded_bytes_per_row(u32::MAX), None);
        // 4 * width fits, rounding up to 256 does not.
        assert_eq!(padded_bytes_per_row((u32::MAX - 255) / 4 + 1), None);
        assert_eq!(padded_bytes_per_row((1 << 30) - 64), Some(u32::MAX - 255));
    }

    #[test]
    fn strip_padding_keeps_texels_only() {
        // 2x2 image, each row padded to 256 bytes.
        let mut padded = vec![0xAAu8; 512];
        padded[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        padded[256..264].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

        let tight = strip_row_padding(&padded, 8, 256, 2);
        assert_eq!(tight, (1..=16).collect::<Vec<u8>>());
    }
}
