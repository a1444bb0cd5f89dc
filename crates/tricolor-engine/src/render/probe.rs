use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::device::readback::read_buffer;
use crate::device::validated;
use crate::fixture::TriangleVertex;

const GENERATOR_WGSL: &str = include_str!("shaders/generator.wgsl");
const PROBE_WGSL: &str = include_str!("shaders/probe.wgsl");

const WORKGROUP_SIZE: u32 = 64;
const RECORD_SIZE: u64 = std::mem::size_of::<ProbeRecord>() as u64;

/// Mirrors `ProbeRecord` in `probe.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ProbeRecord {
    position: [f32; 4],
    color: [f32; 4], // w unused
}

impl From<ProbeRecord> for TriangleVertex {
    fn from(r: ProbeRecord) -> Self {
        TriangleVertex {
            position: r.position,
            color: [r.color[0], r.color[1], r.color[2]],
        }
    }
}

/// Runs the fixture's WGSL generator on the GPU for arbitrary indices.
///
/// The render pipeline only ever sees indices 0..3; the probe lets callers check
/// what the shader does for any `u32`, including the out-of-range fallback.
#[derive(Default)]
pub struct VertexProbe {
    pipeline: Option<wgpu::ComputePipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

impl VertexProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates the generator for each of `indices`, in order.
    ///
    /// Fails when the batch is larger than one dispatch on `device` can cover.
    pub fn evaluate(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        indices: &[u32],
    ) -> Result<Vec<TriangleVertex>> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let dispatch = Dispatch::plan(indices.len(), &device.limits())?;

        self.ensure_pipeline(device)?;
        let (Some(pipeline), Some(bgl)) = (self.pipeline.as_ref(), self.bind_group_layout.as_ref())
        else {
            anyhow::bail!("probe pipeline unavailable");
        };

        let output_size = dispatch.output_size;

        let input = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tricolor probe indices"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tricolor probe records"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tricolor probe staging"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tricolor probe bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tricolor probe encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("tricolor probe pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(dispatch.workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&output, 0, &staging, 0, output_size);
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_buffer(device, &staging)?;
        // Copies into a properly aligned allocation; the byte Vec only guarantees align 1.
        let records: Vec<ProbeRecord> = bytemuck::pod_collect_to_vec(&bytes);

        Ok(records.into_iter().map(TriangleVertex::from).collect())
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device) -> Result<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        log::debug!("building vertex probe pipeline");

        let (pipeline, bind_group_layout) = validated(device, "probe pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tricolor probe shader"),
                source: wgpu::ShaderSource::Wgsl(format!("{GENERATOR_WGSL}\n{PROBE_WGSL}").into()),
            });

            let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            };

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tricolor probe bgl"),
                entries: &[storage(0, true), storage(1, false)],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tricolor probe pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("tricolor probe pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some("cs_main"),
                compilation_options: Default::default(),
                cache: None,
            });

            (pipeline, bind_group_layout)
        })?;

        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        Ok(())
    }
}

/// Size of one probe dispatch, checked against the device limits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Dispatch {
    workgroups: u32,
    output_size: u64,
}

impl Dispatch {
    fn plan(len: usize, limits: &wgpu::Limits) -> Result<Self> {
        let len = u32::try_from(len).with_context(|| format!("{len} indices do not fit a dispatch"))?;

        let workgroups = len.div_ceil(WORKGROUP_SIZE);
        anyhow::ensure!(
            workgroups <= limits.max_compute_workgroups_per_dimension,
            "{len} indices need {workgroups} workgroups; the device allows {}",
            limits.max_compute_workgroups_per_dimension
        );

        let output_size = u64::from(len) * RECORD_SIZE;
        let max_binding = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        anyhow::ensure!(
            output_size <= max_binding,
            "{len} indices need a {output_size} byte output binding; the device allows {max_binding}"
        );

        Ok(Self {
            workgroups,
            output_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_matches_wgsl_stride() {
        assert_eq!(std::mem::size_of::<ProbeRecord>(), 32);
    }

    #[test]
    fn workgroups_cover_every_index() {
        let limits = wgpu::Limits::downlevel_defaults();
        let groups = |len| Dispatch::plan(len, &limits).unwrap().workgroups;
        assert_eq!(groups(1), 1);
        assert_eq!(groups(64), 1);
        assert_eq!(groups(65), 2);
        assert_eq!(Dispatch::plan(3, &limits).unwrap().output_size, 96);
    }

    #[test]
    fn oversized_batches_are_rejected() {
        let limits = wgpu::Limits::downlevel_defaults();
        assert!(Dispatch::plan(usize::MAX, &limits).is_err());

        let many_groups = wgpu::Limits {
            max_compute_workgroups_per_dimension: u32::MAX,
            ..limits.clone()
        };
        let max_records = (u64::from(limits.max_storage_buffer_binding_size) / RECORD_SIZE) as usize;
        assert!(Dispatch::plan(max_records, &many_groups).is_ok());
        assert!(Dispatch::plan(max_records + 1, &many_groups).is_err());

        let few_groups = wgpu::Limits {
            max_compute_workgroups_per_dimension: 2,
            ..limits
        };
        assert!(Dispatch::plan(128, &few_groups).is_ok());
        assert!(Dispatch::plan(129, &few_groups).is_err());
    }

    #[test]
    fn record_drops_padding_channel() {
        let r = ProbeRecord {
            position: [1.0, -1.0, 0.0, 1.0],
            color: [0.0, 0.0, 1.0, 0.0],
        };
        let v = TriangleVertex::from(r);
        assert_eq!(v.color, [0.0, 0.0, 1.0]);
        assert_eq!(v.position, [1.0, -1.0, 0.0, 1.0]);
    }
}
