use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::device::validated;
use crate::fixture::{TriangleVertex, TRIANGLE, VERTEX_COUNT};
use crate::render::{RenderCtx, RenderTarget};

const GENERATOR_WGSL: &str = include_str!("shaders/generator.wgsl");
const TRIANGLE_WGSL: &str = include_str!("shaders/triangle.wgsl");

/// Where the fixture's vertex stage gets its data from.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureSource {
    /// Built-in shader; geometry comes from `@builtin(vertex_index)` only.
    Procedural,
    /// Built-in shader fed from a vertex buffer holding [`TRIANGLE`].
    Buffered,
    /// Replacement WGSL module. Must define `vs_main(@builtin(vertex_index))`
    /// and `fs_main`; it is compiled as-is.
    Custom(String),
}

impl FixtureSource {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FixtureSource::Procedural => "procedural",
            FixtureSource::Buffered => "buffered",
            FixtureSource::Custom(_) => "custom",
        }
    }

    fn vertex_entry(&self) -> &'static str {
        match self {
            FixtureSource::Buffered => "vs_buffered",
            FixtureSource::Procedural | FixtureSource::Custom(_) => "vs_main",
        }
    }

    fn wgsl(&self) -> String {
        match self {
            FixtureSource::Custom(src) => src.clone(),
            FixtureSource::Procedural | FixtureSource::Buffered => {
                format!("{GENERATOR_WGSL}\n{TRIANGLE_WGSL}")
            }
        }
    }
}

/// Draws the triangle fixture: one non-indexed draw of three vertices.
///
/// The pipeline is created lazily and rebuilt when the target format changes.
pub struct TriangleRenderer {
    source: FixtureSource,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    vertex_buffer: Option<wgpu::Buffer>,
}

impl TriangleRenderer {
    pub fn new(source: FixtureSource) -> Self {
        Self {
            source,
            pipeline_format: None,
            pipeline: None,
            vertex_buffer: None,
        }
    }

    pub fn source(&self) -> &FixtureSource {
        &self.source
    }

    /// Records one render pass drawing the fixture into `target`.
    ///
    /// The pass loads the existing contents, so clear the target first. Fails
    /// when the shader or pipeline does not validate; nothing is recorded then.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> Result<()> {
        self.ensure_vertex_buffer(ctx);
        self.ensure_pipeline(ctx)?;

        let Some(pipeline) = self.pipeline.as_ref() else {
            anyhow::bail!("triangle pipeline unavailable");
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tricolor triangle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        if let Some(vbo) = self.vertex_buffer.as_ref() {
            rpass.set_vertex_buffer(0, vbo.slice(..));
        }
        rpass.draw(0..VERTEX_COUNT, 0..1);
        Ok(())
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) -> Result<()> {
        if self.pipeline_format == Some(ctx.target_format) && self.pipeline.is_some() {
            return Ok(());
        }

        log::debug!(
            "building triangle pipeline ({:?}, {})",
            ctx.target_format,
            self.source.vertex_entry()
        );

        let pipeline = validated(ctx.device, "triangle pipeline", || {
            let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tricolor triangle shader"),
                source: wgpu::ShaderSource::Wgsl(self.source.wgsl().into()),
            });

            let pipeline_layout = ctx
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("tricolor triangle pipeline layout"),
                    bind_group_layouts: &[],
                    immediate_size: 0,
                });

            let buffered_layout = [TriangleVertex::layout()];
            let buffers: &[wgpu::VertexBufferLayout<'_>] = match self.source {
                FixtureSource::Buffered => &buffered_layout,
                FixtureSource::Procedural | FixtureSource::Custom(_) => &[],
            };

            ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("tricolor triangle pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(self.source.vertex_entry()),
                    compilation_options: Default::default(),
                    buffers,
                },

                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Fixture winds clockwise; never cull it.
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })?;

        self.pipeline_format = Some(ctx.target_format);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn ensure_vertex_buffer(&mut self, ctx: &RenderCtx<'_>) {
        if self.source != FixtureSource::Buffered || self.vertex_buffer.is_some() {
            return;
        }

        self.vertex_buffer = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tricolor triangle vbo"),
            contents: bytemuck::cast_slice(&TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }
}
