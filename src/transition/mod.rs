//! Boundary transitions: type registry and the per-boundary renderer.

mod render;

use crate::foundation::error::{CutError, CutResult};
use crate::source::Frame;

/// Visual blend applied across the frame overlap at a clip boundary.
///
/// `None` and `Random` are selector values: `None` disables transitions for
/// the run and `Random` resolves to a different concrete kind at every
/// boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// Hard cuts, no blending.
    None,
    /// Pick a concrete kind per boundary.
    Random,
    /// Linear dissolve.
    Fade,
    /// Slide along a direction vector.
    Directional,
    /// Faces folding like a rotating cube.
    Cube,
    /// Center-pulled warp sweeping left to right.
    Crosswarp,
    /// Rows streaking out with ragged random edges.
    Wind,
    /// Columns melting down in bars.
    DoomScreen,
    /// Grid cells flipping over at staggered times.
    GridFlip,
    /// Wavy vertical ripple dissolve.
    Dreamy,
    /// Zoom into the outgoing frame.
    SimpleZoom,
    /// Mosaic coarsening and resolving.
    Pixelize,
}

impl TransitionType {
    /// The concrete kinds `Random` picks from.
    pub const POOL: &'static [TransitionType] = &[
        Self::Fade,
        Self::Directional,
        Self::Cube,
        Self::Crosswarp,
        Self::Wind,
        Self::DoomScreen,
        Self::GridFlip,
        Self::Dreamy,
        Self::SimpleZoom,
        Self::Pixelize,
    ];

    /// Whether this kind renders blended frames itself (not a selector).
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::None | Self::Random)
    }

    /// Parse a kind from its configuration tag.
    pub fn parse(kind: &str) -> CutResult<Self> {
        let kind = kind.trim().to_ascii_lowercase();
        match kind.as_str() {
            "none" => Ok(Self::None),
            "random" => Ok(Self::Random),
            "fade" => Ok(Self::Fade),
            "directional" | "slide" => Ok(Self::Directional),
            "cube" => Ok(Self::Cube),
            "crosswarp" | "warp" => Ok(Self::Crosswarp),
            "wind" => Ok(Self::Wind),
            "doom_screen" | "doomscreen" | "doom" => Ok(Self::DoomScreen),
            "grid_flip" | "gridflip" => Ok(Self::GridFlip),
            "dreamy" => Ok(Self::Dreamy),
            "simple_zoom" | "simplezoom" | "zoom" => Ok(Self::SimpleZoom),
            "pixelize" => Ok(Self::Pixelize),
            other => Err(CutError::validation(format!(
                "unknown transition kind '{other}'"
            ))),
        }
    }

    /// Resolve a selector to a concrete kind for one boundary.
    ///
    /// `Random` derives its pick from the run seed and boundary index, so a
    /// single run is internally varied but reproducible from its seed.
    pub fn resolve(self, seed: u64, boundary: usize) -> Self {
        match self {
            Self::Random => {
                let h = xxhash_rust::xxh3::xxh3_64_with_seed(&boundary.to_le_bytes(), seed);
                Self::POOL[(h % Self::POOL.len() as u64) as usize]
            }
            other => other,
        }
    }
}

/// Type-specific transition parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionParams {
    /// Slide direction for [`TransitionType::Directional`], unit-ish vector.
    pub direction: [f32; 2],
    /// Bar count for [`TransitionType::DoomScreen`].
    pub bars: u32,
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            direction: [1.0, 0.0],
            bars: 100,
        }
    }
}

/// Renders the blended frames of one active clip boundary.
///
/// A transitioner is created lazily when the render loop enters a boundary's
/// overlap window and dropped when the boundary is passed; under `Random`
/// that re-resolution is what picks the next boundary's kind.
pub struct Transitioner {
    kind: TransitionType,
    params: TransitionParams,
    frame: Frame,
}

impl Transitioner {
    /// Create a transitioner for one boundary.
    ///
    /// `kind` must be concrete; resolve selectors with
    /// [`TransitionType::resolve`] first.
    pub fn new(
        kind: TransitionType,
        params: TransitionParams,
        width: u32,
        height: u32,
    ) -> CutResult<Self> {
        if !kind.is_concrete() {
            return Err(CutError::validation(format!(
                "transitioner requires a concrete transition kind, got {kind:?}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(CutError::validation(
                "transitioner width/height must be non-zero",
            ));
        }
        Ok(Self {
            kind,
            params,
            frame: Frame::black(width, height),
        })
    }

    /// The concrete kind this boundary renders with.
    pub fn kind(&self) -> TransitionType {
        self.kind
    }

    /// Blend `from` and `to` at `progress` in [0, 1].
    pub fn render(&mut self, from: &Frame, to: &Frame, progress: f32) -> CutResult<&Frame> {
        if from.width != self.frame.width
            || from.height != self.frame.height
            || to.width != self.frame.width
            || to.height != self.frame.height
        {
            return Err(CutError::validation(format!(
                "transition frame size mismatch: {}x{} vs {}x{}",
                from.width, from.height, self.frame.width, self.frame.height
            )));
        }

        render::render_transition(
            self.kind,
            &self.params,
            &from.data,
            &to.data,
            self.frame.width,
            self.frame.height,
            progress.clamp(0.0, 1.0),
            &mut self.frame.data,
        );
        Ok(&self.frame)
    }
}
