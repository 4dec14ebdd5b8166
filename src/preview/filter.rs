use crate::camera::backend::RawFrame;

/// The fixed filter applied to every preview frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Sepia,
}

/// Filter parameters. Constant in the current scope but modeled as
/// configuration so the pipeline never hard-codes the transform. A plain
/// value type, cheap to copy into the frame sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub kind: FilterKind,
    pub intensity: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            kind: FilterKind::Sepia,
            intensity: 0.8,
        }
    }
}

/// A processed frame in a directly displayable pixel format (RGB24).
///
/// Carries its own dimensions: filters may crop or pad, so consumers must
/// read the output extent from here, never from the input frame.
pub struct DisplayFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Apply the configured filter to a raw frame.
///
/// Returns `None` (frame dropped, not an error) when the buffer cannot be
/// interpreted (zero extent, length/dimension mismatch) or the filter cannot
/// produce output (non-finite intensity). Stateless across frames; safe to
/// call concurrently from multiple delivery threads.
pub fn process(frame: &RawFrame, params: FilterParams) -> Option<DisplayFrame> {
    if frame.width == 0 || frame.height == 0 {
        return None;
    }
    let expected = (frame.width as usize)
        .checked_mul(frame.height as usize)?
        .checked_mul(3)?;
    if frame.data.len() != expected {
        return None;
    }
    if !params.intensity.is_finite() {
        return None;
    }

    let data = match params.kind {
        FilterKind::Sepia => sepia(&frame.data, params.intensity.clamp(0.0, 1.0)),
    };

    Some(DisplayFrame {
        data,
        width: frame.width,
        height: frame.height,
    })
}

/// Classic sepia weighting matrix, blended with the source by `intensity`.
/// At 0.0 the frame passes through unchanged; at 1.0 it is fully toned.
fn sepia(rgb: &[u8], intensity: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgb.len());
    for px in rgb.chunks_exact(3) {
        let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));

        let sr = 0.393 * r + 0.769 * g + 0.189 * b;
        let sg = 0.349 * r + 0.686 * g + 0.168 * b;
        let sb = 0.272 * r + 0.534 * g + 0.131 * b;

        out.push(blend(r, sr, intensity));
        out.push(blend(g, sg, intensity));
        out.push(blend(b, sb, intensity));
    }
    out
}

fn blend(original: f32, toned: f32, intensity: f32) -> u8 {
    (original + (toned - original) * intensity).round().clamp(0.0, 255.0) as u8
}
