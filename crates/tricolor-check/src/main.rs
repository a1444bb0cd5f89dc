use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use tricolor_engine::core::{App, AppControl, FrameCtx};
use tricolor_engine::device::{GpuInit, HeadlessGpu};
use tricolor_engine::fixture::triangle_vertex;
use tricolor_engine::logging::{init_logging, LoggingConfig};
use tricolor_engine::paint::Color;
use tricolor_engine::render::{render_offscreen, FixtureSource, TriangleRenderer, VertexProbe};
use tricolor_engine::resources::ContentRoots;
use tricolor_engine::verify::{verify_image, VerifyConfig};
use tricolor_engine::window::{Runtime, RuntimeConfig};

/// Draws the tricolor fixture. A correct pipeline shows a red/green/blue
/// triangle spanning the bottom corners and the top center.
#[derive(Debug, Parser)]
#[command(name = "tricolor-check", version)]
struct Args {
    /// Render offscreen, verify against the CPU reference and exit.
    #[arg(long)]
    headless: bool,

    /// Write the headless render to this PNG.
    #[arg(long, requires = "headless")]
    out: Option<PathBuf>,

    /// Headless target size, `WIDTHxHEIGHT`.
    #[arg(long, default_value = "256x256", value_parser = parse_size)]
    size: (u32, u32),

    /// Feed the vertices from a vertex buffer instead of the vertex index.
    #[arg(long, conflicts_with = "shader")]
    buffered: bool,

    /// Replacement fixture shader, looked up by name under the content roots.
    #[arg(long)]
    shader: Option<String>,

    /// Directory searched for `--shader`. Repeatable; defaults to the working directory.
    #[arg(long = "content-root")]
    content_roots: Vec<PathBuf>,

    /// Evaluate the GPU generator for these vertex indices and exit.
    #[arg(long, value_delimiter = ',')]
    probe: Vec<u32>,

    /// Accept a software adapter.
    #[arg(long)]
    fallback_adapter: bool,

    /// Log filter (env_logger syntax); overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((w, h))
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(match args.log.clone() {
        Some(filter) => LoggingConfig::with_filter(filter),
        None => LoggingConfig::default(),
    });

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when a check ran and failed.
fn run(args: Args) -> Result<bool> {
    let source = fixture_source(&args)?;

    let gpu_init = |base: GpuInit| GpuInit {
        force_fallback_adapter: args.fallback_adapter,
        ..base
    };

    if !args.probe.is_empty() {
        let gpu = HeadlessGpu::new_blocking(gpu_init(GpuInit::headless()))?;
        return probe(&gpu, &args.probe);
    }

    if args.headless {
        let gpu = HeadlessGpu::new_blocking(gpu_init(GpuInit::headless()))?;
        return headless(&gpu, source, args.size, args.out.as_deref());
    }

    Runtime::run(
        RuntimeConfig {
            title: "tricolor check".to_string(),
            ..RuntimeConfig::default()
        },
        gpu_init(GpuInit::default()),
        CheckApp::new(source),
    )?;
    Ok(true)
}

fn fixture_source(args: &Args) -> Result<FixtureSource> {
    if let Some(name) = args.shader.as_deref() {
        let roots = if args.content_roots.is_empty() {
            vec![std::env::current_dir().context("no working directory")?]
        } else {
            args.content_roots.clone()
        };
        let roots = ContentRoots::new(roots)?;
        let wgsl = roots.read_shader(name)?;
        log::info!("using fixture shader {:?}", roots.get_shader_file(name)?);
        return Ok(FixtureSource::Custom(wgsl));
    }

    Ok(if args.buffered {
        FixtureSource::Buffered
    } else {
        FixtureSource::Procedural
    })
}

fn probe(gpu: &HeadlessGpu, indices: &[u32]) -> Result<bool> {
    let outputs = VertexProbe::new().evaluate(gpu.device(), gpu.queue(), indices)?;

    let mut ok = true;
    for (&index, v) in indices.iter().zip(&outputs) {
        let reference = triangle_vertex(index);
        let matches = *v == reference;
        ok &= matches;
        log::info!(
            "index {index}: position {:?} color {:?}{}",
            v.position,
            v.color,
            if matches { "" } else { "  (differs from CPU reference)" }
        );
    }
    Ok(ok)
}

fn headless(
    gpu: &HeadlessGpu,
    source: FixtureSource,
    (width, height): (u32, u32),
    out: Option<&std::path::Path>,
) -> Result<bool> {
    let config = VerifyConfig::default();
    let mut renderer = TriangleRenderer::new(source);
    let rendered = render_offscreen(gpu, &mut renderer, width, height, config.clear)?;

    let report = verify_image(&rendered, &config);
    if report.is_pass() {
        log::info!("fixture verified: {report}");
    } else {
        log::error!("fixture mismatch: {report}");
    }

    if let Some(path) = out {
        image::save_buffer(
            path,
            &rendered.pixels,
            rendered.width,
            rendered.height,
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }

    Ok(report.is_pass())
}

struct CheckApp {
    renderer: TriangleRenderer,
    clear: Color,
}

impl CheckApp {
    fn new(source: FixtureSource) -> Self {
        Self {
            renderer: TriangleRenderer::new(source),
            clear: Color::BLACK,
        }
    }
}

impl App for CheckApp {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => AppControl::Exit,
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if ctx.time.frame_index == 0 {
            let info = ctx.gpu.adapter_info();
            log::info!(
                "drawing {} fixture on {} ({:?}); press Escape to quit",
                self.renderer.source().kind(),
                info.name,
                ctx.gpu.surface_format()
            );
        }

        let renderer = &mut self.renderer;
        ctx.render(self.clear, |rctx, target| renderer.render(rctx, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("256x128"), Ok((256, 128)));
        assert_eq!(parse_size("64X64"), Ok((64, 64)));
        assert!(parse_size("64").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn probe_list_is_comma_separated() {
        let args = Args::try_parse_from(["tricolor-check", "--probe", "0,1,2,7"]).unwrap();
        assert_eq!(args.probe, vec![0, 1, 2, 7]);
    }

    #[test]
    fn out_requires_headless() {
        assert!(Args::try_parse_from(["tricolor-check", "--out", "x.png"]).is_err());
    }
}
