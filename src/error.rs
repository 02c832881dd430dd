//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::renderer::frame::FramePhase;

/// Errors produced by the deep-deferred crate.
#[derive(Debug)]
pub enum DeferredError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A named shader program failed to compose or validate.
    ShaderLoad {
        /// Shader program name (e.g. `PointLight`).
        name: &'static str,
        /// Composer / validator message.
        message: String,
    },
    /// Pipeline or bind group creation was rejected by the device.
    PipelineCreation(String),
    /// Render target allocation failed (typically out of GPU memory).
    TargetAllocation(String),
    /// Failed to acquire the next surface texture.
    Surface(wgpu::SurfaceError),
    /// A frame operation was called out of order.
    FrameOrder {
        /// Phase the operation required.
        expected: FramePhase,
        /// Phase the frame driver was actually in.
        found: FramePhase,
    },
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for DeferredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::ShaderLoad { name, message } => {
                write!(f, "failed to load shader '{name}': {message}")
            }
            Self::PipelineCreation(msg) => {
                write!(f, "pipeline creation failed: {msg}")
            }
            Self::TargetAllocation(msg) => {
                write!(f, "render target allocation failed: {msg}")
            }
            Self::Surface(e) => write!(f, "surface error: {e}"),
            Self::FrameOrder { expected, found } => write!(
                f,
                "frame operation out of order: expected {expected:?}, \
                 found {found:?}"
            ),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for DeferredError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Surface(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for DeferredError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for DeferredError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<wgpu::SurfaceError> for DeferredError {
    fn from(e: wgpu::SurfaceError) -> Self {
        Self::Surface(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_order_message_names_both_phases() {
        let err = DeferredError::FrameOrder {
            expected: FramePhase::Resolved,
            found: FramePhase::Idle,
        };
        let msg = err.to_string();
        assert!(msg.contains("Resolved"));
        assert!(msg.contains("Idle"));
    }

    #[test]
    fn surface_error_keeps_source() {
        use std::error::Error;
        let err = DeferredError::from(wgpu::SurfaceError::Lost);
        assert!(err.source().is_some());
    }
}
