/// A surface frame in flight.
///
/// Holding the surface texture blocks acquisition of the next one, so hand the
/// frame back to `Gpu::submit` as soon as recording is done.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
