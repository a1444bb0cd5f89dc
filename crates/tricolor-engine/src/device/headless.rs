use anyhow::Result;

use super::init::open_device;
use super::GpuInit;

/// GPU context without a surface, for offscreen rendering and compute.
///
/// Creation fails when the machine exposes no usable adapter; tests treat that as
/// a reason to skip rather than fail.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = init.instance();
        let (adapter, device, queue) =
            open_device(&instance, None, &init, "tricolor headless device").await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Blocking form of [`new`](Self::new).
    pub fn new_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
