use anyhow::{Context, Result};

use crate::device::readback::{padded_bytes_per_row, read_buffer, strip_row_padding};
use crate::device::HeadlessGpu;
use crate::paint::Color;

use super::{RenderCtx, RenderTarget, TriangleRenderer};

/// Format of offscreen targets. Not sRGB, so stored bytes are the interpolated
/// linear values quantized to 8 bits.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Tightly packed RGBA8 pixels, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// Wraps raw pixels; `None` if the length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Pixel at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// Color texture plus a staging buffer large enough to read it back.
pub struct OffscreenTarget {
    width: u32,
    height: u32,
    bytes_per_row: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    staging: wgpu::Buffer,
}

impl OffscreenTarget {
    /// Fails when the size is zero or beyond what `device` allows.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "offscreen target has zero size");

        let limits = device.limits();
        let max_dim = limits.max_texture_dimension_2d;
        anyhow::ensure!(
            width <= max_dim && height <= max_dim,
            "offscreen target {width}x{height} exceeds the device's {max_dim}px texture limit"
        );

        let bytes_per_row = padded_bytes_per_row(width)
            .with_context(|| format!("row pitch for width {width} overflows"))?;
        let staging_size = u64::from(bytes_per_row) * u64::from(height);
        anyhow::ensure!(
            staging_size <= limits.max_buffer_size,
            "readback buffer of {staging_size} bytes exceeds the device's {} byte limit",
            limits.max_buffer_size
        );

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tricolor offscreen color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tricolor offscreen staging"),
            size: staging_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            width,
            height,
            bytes_per_row,
            texture,
            view,
            staging,
        })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Records a pass that clears the target to `color`.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder, color: Color) {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tricolor offscreen clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    /// Records the texture → staging copy. Submit before calling [`read`](Self::read).
    pub fn copy_to_staging(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Reads the staging buffer back as an image.
    pub fn read(&self, device: &wgpu::Device) -> Result<RgbaImage> {
        let padded = read_buffer(device, &self.staging)?;
        let pixels = strip_row_padding(
            &padded,
            self.width as usize * 4,
            self.bytes_per_row as usize,
            self.height as usize,
        );
        RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))
    }
}

/// Clears a fresh `width` x `height` target, draws the fixture and reads it back.
///
/// Errors when the size exceeds the device limits or the renderer's pipeline
/// fails validation (e.g. a malformed custom shader); nothing is submitted then.
pub fn render_offscreen(
    gpu: &HeadlessGpu,
    renderer: &mut TriangleRenderer,
    width: u32,
    height: u32,
    clear: Color,
) -> Result<RgbaImage> {
    let target = OffscreenTarget::new(gpu.device(), width, height)?;
    let ctx = RenderCtx::new(gpu.device(), gpu.queue(), OFFSCREEN_FORMAT);

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tricolor offscreen encoder"),
        });

    target.clear(&mut encoder, clear);
    {
        let mut rt = RenderTarget::new(&mut encoder, target.view());
        renderer.render(&ctx, &mut rt)?;
    }
    target.copy_to_staging(&mut encoder);

    gpu.queue().submit(std::iter::once(encoder.finish()));

    let image = target.read(gpu.device())?;
    log::debug!("offscreen render read back ({width}x{height})");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_checks_length() {
        assert!(RgbaImage::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(RgbaImage::from_raw(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn pixel_indexing_is_row_major() {
        let pixels: Vec<u8> = (0..24).collect();
        let img = RgbaImage::from_raw(3, 2, pixels).unwrap();
        assert_eq!(img.pixel(0, 0), [0, 1, 2, 3]);
        assert_eq!(img.pixel(2, 0), [8, 9, 10, 11]);
        assert_eq!(img.pixel(0, 1), [12, 13, 14, 15]);
    }
}
