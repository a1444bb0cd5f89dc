//! GPU device management.
//!
//! - [`Gpu`]: device + surface bound to a window
//! - [`HeadlessGpu`]: device without a surface, for offscreen renders and compute
//! - [`readback`]: copying buffers back to the CPU

mod error;
mod frame;
mod gpu;
mod headless;
mod init;
pub mod readback;
mod surface;

pub use error::SurfaceErrorAction;
pub(crate) use error::validated;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use headless::HeadlessGpu;
pub use init::GpuInit;
