use anyhow::Result;

/// What the frame loop should do after `Gpu::begin_frame` fails.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was lost or outdated and has been reconfigured.
    Reconfigured,
    /// Timeout or transient failure; drop this frame.
    SkipFrame,
    /// Out of memory; stop rendering.
    Fatal,
}

/// Runs `f` inside a validation error scope and returns the captured error, if
/// any, as `Err`.
///
/// Outside a scope wgpu hands validation errors to the uncaptured-error
/// handler, which panics.
pub(crate) fn validated<T>(device: &wgpu::Device, what: &str, f: impl FnOnce() -> T) -> Result<T> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(scope.pop()) {
        None => Ok(value),
        Some(err) => Err(anyhow::anyhow!("{what} rejected by wgpu: {err}")),
    }
}
