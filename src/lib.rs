//! TTK - one character-grid renderer contract, three backends
//!
//! Applications draw into a grid of cells through [`Renderer`] and receive
//! input as unified [`Event`]s. The same code runs on:
//! - `terminal`: ANSI terminals through crossterm
//! - `cpu`: a native window composited in software (feature `native`)
//! - `gpu`: a native window drawn with wgpu (feature `gpu`)
//!
//! Use [`create_renderer`] to construct a backend by kind, or
//! [`initialize_with_fallback`] to take the first one that initializes.

pub mod config;

use std::fmt;
use std::str::FromStr;

pub use ttk_core::*;
pub use ttk_terminal::{ColorMode, TerminalRenderer};

#[cfg(feature = "native")]
pub use ttk_native::{CpuRenderer, NativeRenderer};

#[cfg(feature = "gpu")]
pub use ttk_native::GpuRenderer;

/// The available backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Terminal,
    Cpu,
    Gpu,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Gpu, BackendKind::Cpu, BackendKind::Terminal];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Terminal => "terminal",
            BackendKind::Cpu => "cpu",
            BackendKind::Gpu => "gpu",
        }
    }

    /// Whether this build contains the backend
    pub fn is_compiled(self) -> bool {
        match self {
            BackendKind::Terminal => true,
            BackendKind::Cpu => cfg!(feature = "native"),
            BackendKind::Gpu => cfg!(feature = "gpu"),
        }
    }

    /// Backends to try, in order, when this one is preferred
    pub fn fallback_chain(self) -> Vec<BackendKind> {
        let start = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[start..]
            .iter()
            .copied()
            .filter(|k| k.is_compiled())
            .collect()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "terminal" => Ok(BackendKind::Terminal),
            "cpu" => Ok(BackendKind::Cpu),
            "gpu" => Ok(BackendKind::Gpu),
            other => Err(Error::InvalidArgument(format!("unknown backend '{}'", other))),
        }
    }
}

/// GPU on macOS where a window server is always present, terminal elsewhere
pub fn recommended_backend() -> BackendKind {
    if cfg!(all(target_os = "macos", feature = "gpu")) {
        BackendKind::Gpu
    } else {
        BackendKind::Terminal
    }
}

/// Construct an uninitialized renderer of the given kind
pub fn create_renderer(kind: BackendKind, options: &InitOptions) -> Result<Box<dyn Renderer>> {
    match kind {
        BackendKind::Terminal => Ok(Box::new(TerminalRenderer::new(options))),
        #[cfg(feature = "native")]
        BackendKind::Cpu => Ok(Box::new(CpuRenderer::new(options))),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => Ok(Box::new(GpuRenderer::new(options))),
        #[allow(unreachable_patterns)]
        other => Err(Error::init(
            other.name(),
            format!("this build does not include the {} backend", other),
        )),
    }
}

/// Initialize the preferred backend, falling back along its chain
///
/// `build` constructs each candidate. Returns the first renderer that
/// initialized, or the last error.
pub fn initialize_with_fallback<F>(preferred: BackendKind, mut build: F) -> Result<Box<dyn Renderer>>
where
    F: FnMut(BackendKind) -> Result<Box<dyn Renderer>>,
{
    let mut last_error = None;
    for kind in preferred.fallback_chain() {
        let mut renderer = build(kind)?;
        match renderer.initialize() {
            Ok(()) => {
                log::info!("using {} backend", kind);
                return Ok(renderer);
            }
            Err(e) => {
                log::warn!("{} backend unavailable: {}", kind, e);
                renderer.shutdown();
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| Error::init(preferred.name(), "no backend available")))
}
