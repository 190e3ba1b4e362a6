//! Pixel-level transition algorithms.
//!
//! Every algorithm implements the same contract: given two same-sized opaque
//! RGBA frames and a progress ratio in [0, 1], produce one blended frame.
//! Progress 0 must reproduce the outgoing frame and progress 1 the incoming
//! frame, so boundaries splice seamlessly into the surrounding clip frames.

use crate::transition::{TransitionParams, TransitionType};

pub(crate) fn render_transition(
    kind: TransitionType,
    params: &TransitionParams,
    from: &[u8],
    to: &[u8],
    width: u32,
    height: u32,
    progress: f32,
    dst: &mut [u8],
) {
    match kind {
        TransitionType::Fade => fade(from, to, progress, dst),
        TransitionType::Directional => directional(from, to, width, height, progress, params.direction, dst),
        TransitionType::Cube => cube(from, to, width, height, progress, dst),
        TransitionType::Crosswarp => crosswarp(from, to, width, height, progress, dst),
        TransitionType::Wind => wind(from, to, width, height, progress, dst),
        TransitionType::DoomScreen => doom_screen(from, to, width, height, progress, params.bars, dst),
        TransitionType::GridFlip => grid_flip(from, to, width, height, progress, dst),
        TransitionType::Dreamy => dreamy(from, to, width, height, progress, dst),
        TransitionType::SimpleZoom => simple_zoom(from, to, width, height, progress, dst),
        TransitionType::Pixelize => pixelize(from, to, width, height, progress, dst),
        // Selectors never reach the renderer; pass the outgoing frame through.
        TransitionType::None | TransitionType::Random => dst.copy_from_slice(from),
    }
}

fn fade(from: &[u8], to: &[u8], t: f32, dst: &mut [u8]) {
    let tt = ((t * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;
    for ((d, a), b) in dst
        .chunks_exact_mut(4)
        .zip(from.chunks_exact(4))
        .zip(to.chunks_exact(4))
    {
        for i in 0..4 {
            d[i] = add_sat(mul_div255(u16::from(a[i]), it), mul_div255(u16::from(b[i]), tt));
        }
    }
}

fn directional(
    from: &[u8],
    to: &[u8],
    width: u32,
    height: u32,
    t: f32,
    direction: [f32; 2],
    dst: &mut [u8],
) {
    let (w, h) = (width as f32, height as f32);
    for y in 0..height {
        let v = (y as f32 + 0.5) / h;
        for x in 0..width {
            let u = (x as f32 + 0.5) / w;
            let su = u + t * direction[0];
            let sv = v + t * direction[1];

            let px = if (0.0..1.0).contains(&su) && (0.0..1.0).contains(&sv) {
                sample_uv(from, width, height, su, sv)
            } else {
                sample_uv(to, width, height, su.rem_euclid(1.0), sv.rem_euclid(1.0))
            };
            put(dst, width, x, y, px);
        }
    }
}

fn cube(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    let (w, h) = (width as f32, height as f32);
    let split = 1.0 - t;
    for y in 0..height {
        let v = (y as f32 + 0.5) / h;
        for x in 0..width {
            let u = (x as f32 + 0.5) / w;

            let px = if u < split && split > 0.0 {
                // Outgoing face, compressed toward the left edge; the seam
                // edge recedes, so stretch the sampled vertical extent there.
                let lu = u / split;
                let lv = (v - 0.5) * (1.0 + 0.3 * t * lu) + 0.5;
                shade(sample_uv(from, width, height, lu, lv), 1.0 - 0.25 * t)
            } else if t > 0.0 {
                let lu = (u - split) / t;
                let lv = (v - 0.5) * (1.0 + 0.3 * (1.0 - t) * (1.0 - lu)) + 0.5;
                shade(sample_uv(to, width, height, lu, lv), 0.75 + 0.25 * t)
            } else {
                sample_uv(from, width, height, u, v)
            };
            put(dst, width, x, y, px);
        }
    }
}

fn crosswarp(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    let (w, h) = (width as f32, height as f32);
    for y in 0..height {
        let v = (y as f32 + 0.5) / h;
        for x in 0..width {
            let u = (x as f32 + 0.5) / w;
            let s = smoothstep(0.0, 1.0, t * 2.0 + u - 1.0);

            let a = sample_uv(
                from,
                width,
                height,
                (u - 0.5) * (1.0 - s) + 0.5,
                (v - 0.5) * (1.0 - s) + 0.5,
            );
            let b = sample_uv(
                to,
                width,
                height,
                (u - 0.5) * s + 0.5,
                (v - 0.5) * s + 0.5,
            );
            put(dst, width, x, y, mix_px(a, b, s));
        }
    }
}

fn wind(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    const SIZE: f32 = 0.2;
    let (w, h) = (width as f32, height as f32);
    for y in 0..height {
        let v = (y as f32 + 0.5) / h;
        let r = hash01(u64::from(y), 0x57_1D);
        for x in 0..width {
            let u = (x as f32 + 0.5) / w;
            let m = smoothstep(
                0.0,
                -SIZE,
                u * (1.0 - SIZE) + SIZE * r - t * (1.0 + SIZE),
            );
            let a = sample_uv(from, width, height, u, v);
            let b = sample_uv(to, width, height, u, v);
            put(dst, width, x, y, mix_px(a, b, m));
        }
    }
}

fn doom_screen(
    from: &[u8],
    to: &[u8],
    width: u32,
    height: u32,
    t: f32,
    bars: u32,
    dst: &mut [u8],
) {
    // Per-bar random phase: bars start melting at different times, like the
    // classic level-exit wipe.
    const STAGGER: f32 = 0.5;
    let bars = bars.max(1);
    for x in 0..width {
        let bar = u64::from(x) * u64::from(bars) / u64::from(width.max(1));
        let r = hash01(bar, 0xD0_0D);
        let drop = ((t * (1.0 + STAGGER)) - r * STAGGER).clamp(0.0, 1.0);
        let offset = (drop * height as f32).round() as i64;

        for y in 0..height {
            let src_y = y as i64 - offset;
            let px = if src_y >= 0 {
                texel(from, width, height, i64::from(x), src_y)
            } else {
                texel(to, width, height, i64::from(x), i64::from(y))
            };
            put(dst, width, x, y, px);
        }
    }
}

fn grid_flip(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    const GRID: u32 = 4;
    const STAGGER: f32 = 0.5;
    let (w, h) = (width as f32, height as f32);
    for y in 0..height {
        let gy = (y * GRID / height.max(1)).min(GRID - 1);
        for x in 0..width {
            let gx = (x * GRID / width.max(1)).min(GRID - 1);
            let r = hash01(u64::from(gy * GRID + gx), 0x6F_11);
            let start = r * STAGGER;
            let s = smoothstep(0.0, 1.0, ((t - start) / (1.0 - STAGGER)).clamp(0.0, 1.0));

            let u = (x as f32 + 0.5) / w;
            let v = (y as f32 + 0.5) / h;
            let a = sample_uv(from, width, height, u, v);
            let b = sample_uv(to, width, height, u, v);
            // Cells darken briefly mid-flip.
            let px = shade(mix_px(a, b, s), 1.0 - s * (1.0 - s));
            put(dst, width, x, y, px);
        }
    }
}

fn dreamy(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    fn shift(progress: f32, u: f32, theta: f32) -> f32 {
        let phase = progress * progress + progress + theta;
        0.03 * progress * (10.0 * (phase + u)).cos()
    }

    let (w, h) = (width as f32, height as f32);
    for y in 0..height {
        let v = (y as f32 + 0.5) / h;
        for x in 0..width {
            let u = (x as f32 + 0.5) / w;
            let a = sample_uv(from, width, height, u, v + shift(t, u, 0.0));
            let b = sample_uv(to, width, height, u, v + shift(1.0 - t, u, std::f32::consts::PI));
            put(dst, width, x, y, mix_px(a, b, t));
        }
    }
}

fn simple_zoom(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    const QUICKNESS: f32 = 0.8;
    let (w, h) = (width as f32, height as f32);
    let zoom = smoothstep(0.0, QUICKNESS, t);
    let mixw = smoothstep(QUICKNESS - 0.2, 1.0, t);
    for y in 0..height {
        let v = (y as f32 + 0.5) / h;
        for x in 0..width {
            let u = (x as f32 + 0.5) / w;
            let a = sample_uv(
                from,
                width,
                height,
                0.5 + (u - 0.5) * (1.0 - zoom),
                0.5 + (v - 0.5) * (1.0 - zoom),
            );
            let b = sample_uv(to, width, height, u, v);
            put(dst, width, x, y, mix_px(a, b, mixw));
        }
    }
}

fn pixelize(from: &[u8], to: &[u8], width: u32, height: u32, t: f32, dst: &mut [u8]) {
    const STEPS: f32 = 50.0;
    let d = t.min(1.0 - t);
    let dist = (d * STEPS).ceil() / STEPS;
    // Block size peaks mid-transition at ~1/10 of the short edge.
    let block = ((dist * width.min(height) as f32) / 10.0).floor().max(1.0) as u32;

    for y in 0..height {
        let qy = (y / block) * block + block / 2;
        for x in 0..width {
            let qx = (x / block) * block + block / 2;
            let a = texel(from, width, height, i64::from(qx), i64::from(qy));
            let b = texel(to, width, height, i64::from(qx), i64::from(qy));
            put(dst, width, x, y, mix_px(a, b, t));
        }
    }
}

#[inline]
fn texel(buf: &[u8], width: u32, height: u32, x: i64, y: i64) -> [u8; 4] {
    let x = x.clamp(0, i64::from(width) - 1) as usize;
    let y = y.clamp(0, i64::from(height) - 1) as usize;
    let i = (y * width as usize + x) * 4;
    [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
}

#[inline]
fn sample_uv(buf: &[u8], width: u32, height: u32, u: f32, v: f32) -> [u8; 4] {
    texel(
        buf,
        width,
        height,
        (u * width as f32).floor() as i64,
        (v * height as f32).floor() as i64,
    )
}

#[inline]
fn put(dst: &mut [u8], width: u32, x: u32, y: u32, px: [u8; 4]) {
    let i = (y as usize * width as usize + x as usize) * 4;
    dst[i..i + 4].copy_from_slice(&px);
}

#[inline]
fn mix_px(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let tt = ((t.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat(mul_div255(u16::from(a[i]), it), mul_div255(u16::from(b[i]), tt));
    }
    out
}

#[inline]
fn shade(px: [u8; 4], factor: f32) -> [u8; 4] {
    let f = ((factor.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    [
        mul_div255(u16::from(px[0]), f),
        mul_div255(u16::from(px[1]), f),
        mul_div255(u16::from(px[2]), f),
        px[3],
    ]
}

#[inline]
fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Deterministic per-element pseudo-random value in [0, 1).
#[inline]
fn hash01(n: u64, salt: u64) -> f32 {
    let h = xxhash_rust::xxh3::xxh3_64_with_seed(&n.to_le_bytes(), salt);
    ((h >> 40) as f32) / ((1u64 << 24) as f32)
}

#[inline]
fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[inline]
fn add_sat(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
