//! WGSL sources for the compute kernels.
//!
//! Every kernel binds its input at 0, its output at 1 and a uniform named
//! `metadata` at 2.

use bytemuck::{Pod, Zeroable};

use crate::ops::narrow;
use crate::{DType, DeviceError, Interpolation, KernelKey, KernelKind, Layout, MAX_DIMS};

pub const GATHER_WORKGROUP: u32 = 64;
pub const GEOMETRY_WORKGROUP: u32 = 16;

/// Uniform for the gather and cast kernels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GatherMeta {
    pub dims: [u32; 4],
    pub strides: [i32; 4],
    pub offset: u32,
    pub numel: u32,
    pub _pad: [u32; 2],
}

impl GatherMeta {
    pub fn new(layout: &Layout) -> Result<Self, DeviceError> {
        let mut dims = [0u32; MAX_DIMS];
        let mut strides = [0i32; MAX_DIMS];
        for d in 0..MAX_DIMS {
            dims[d] = narrow(layout.dims()[d])?;
            strides[d] = narrow(layout.strides()[d])?;
        }
        Ok(Self {
            dims,
            strides,
            offset: narrow(layout.offset())?,
            numel: narrow(layout.elements())?,
            _pad: [0; 2],
        })
    }
}

pub fn wgsl_type(dt: DType) -> Option<&'static str> {
    match dt {
        DType::F32 => Some("f32"),
        DType::I32 => Some("i32"),
        DType::U32 => Some("u32"),
        _ => None,
    }
}

fn ty(dt: DType) -> &'static str {
    wgsl_type(dt).unwrap_or("f32")
}

/// Conversion with the same saturating semantics as the host path.
fn convert_expr(from: DType, to: DType, expr: &str) -> String {
    match (from, to) {
        (a, b) if a == b => expr.to_string(),
        (DType::I32, DType::U32) => format!("u32(max({}, 0i))", expr),
        (DType::U32, DType::I32) => format!("i32(min({}, 2147483647u))", expr),
        (_, b) => format!("{}({})", ty(b), expr),
    }
}

/// Strided gather from `from` into a contiguous `to` buffer. `from == to` is a plain copy.
pub fn convert_source(from: DType, to: DType) -> String {
    let (src_ty, dst_ty) = (ty(from), ty(to));
    let value = convert_expr(from, to, "X[u32(src)]");
    format!(
        r#"
struct Meta {{
    dims: vec4<u32>,
    strides: vec4<i32>,
    offset: u32,
    numel: u32,
    pad0: u32,
    pad1: u32,
}}

@group(0) @binding(0) var<storage, read> X: array<{src_ty}>;
@group(0) @binding(1) var<storage, read_write> Y: array<{dst_ty}>;
@group(0) @binding(2) var<uniform> metadata: Meta;

@compute @workgroup_size({wg})
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {{
    let index = gid.x + gid.y * groups.x * {wg}u;
    if (index >= metadata.numel) {{
        return;
    }}
    var rem = index;
    let i0 = rem % metadata.dims.x;
    rem = rem / metadata.dims.x;
    let i1 = rem % metadata.dims.y;
    rem = rem / metadata.dims.y;
    let i2 = rem % metadata.dims.z;
    let i3 = rem / metadata.dims.z;
    let src = i32(metadata.offset)
        + i32(i0) * metadata.strides.x
        + i32(i1) * metadata.strides.y
        + i32(i2) * metadata.strides.z
        + i32(i3) * metadata.strides.w;
    Y[index] = {value};
}}
"#,
        wg = GATHER_WORKGROUP,
    )
}

const GEOMETRY_PRELUDE: &str = r#"
struct Meta {
    out_dims: vec4<u32>,
    in_dims: vec4<u32>,
    out_strides: vec4<i32>,
    in_strides: vec4<i32>,
    in_offset: u32,
    pad0: u32,
    pad1: u32,
    pad2: u32,
    tf0: vec4<f32>,
    tf1: vec4<f32>,
    tf2: vec4<f32>,
}

fn load(x: u32, y: u32, p2: u32, p3: u32) -> f32 {
    let i = i32(metadata.in_offset)
        + i32(x) * metadata.in_strides.x
        + i32(y) * metadata.in_strides.y
        + i32(p2) * metadata.in_strides.z
        + i32(p3) * metadata.in_strides.w;
    return f32(X[u32(i)]);
}

fn nearest_index(c: f32, extent: u32) -> u32 {
    return min(u32(max(floor(c + 0.5), 0.0)), extent - 1u);
}

fn nearest_clamped(x: f32, y: f32, p2: u32, p3: u32) -> f32 {
    return load(nearest_index(x, metadata.in_dims.x), nearest_index(y, metadata.in_dims.y), p2, p3);
}

fn bilinear_clamped(x: f32, y: f32, p2: u32, p3: u32) -> f32 {
    let cx = clamp(x, 0.0, f32(metadata.in_dims.x - 1u));
    let cy = clamp(y, 0.0, f32(metadata.in_dims.y - 1u));
    let x0 = u32(floor(cx));
    let y0 = u32(floor(cy));
    let x1 = min(x0 + 1u, metadata.in_dims.x - 1u);
    let y1 = min(y0 + 1u, metadata.in_dims.y - 1u);
    let wx = cx - floor(cx);
    let wy = cy - floor(cy);
    return (1.0 - wx) * (1.0 - wy) * load(x0, y0, p2, p3)
        + wx * (1.0 - wy) * load(x1, y0, p2, p3)
        + (1.0 - wx) * wy * load(x0, y1, p2, p3)
        + wx * wy * load(x1, y1, p2, p3);
}

fn inside(x: f32, y: f32) -> bool {
    return x >= 0.0 && x <= f32(metadata.in_dims.x - 1u)
        && y >= 0.0 && y <= f32(metadata.in_dims.y - 1u);
}

fn nearest_bounded(x: f32, y: f32, p2: u32, p3: u32) -> f32 {
    let xi = floor(x + 0.5);
    let yi = floor(y + 0.5);
    if (!inside(xi, yi)) {
        return 0.0;
    }
    return load(u32(xi), u32(yi), p2, p3);
}

fn bilinear_bounded(x: f32, y: f32, p2: u32, p3: u32) -> f32 {
    if (!inside(x, y)) {
        return 0.0;
    }
    return bilinear_clamped(x, y, p2, p3);
}

fn round_half_away(v: f32) -> f32 {
    return sign(v) * floor(abs(v) + 0.5);
}
"#;

/// Resize or transform kernel for one `(dtype, interpolation)` pair.
pub fn geometry_source(key: KernelKey) -> String {
    let t = ty(key.dt);
    let sampler = match key.interp {
        Interpolation::Bilinear => "bilinear",
        _ => "nearest",
    };
    let coords = match key.kind {
        KernelKind::Resize => {
            r#"let sx = f32(x) * (f32(metadata.in_dims.x) / f32(metadata.out_dims.x));
    let sy = f32(y) * (f32(metadata.in_dims.y) / f32(metadata.out_dims.y));"#
        }
        KernelKind::Transform => {
            r#"let pt = vec3<f32>(f32(x), f32(y), 1.0);
    let w = dot(metadata.tf2.xyz, pt);
    let sx = dot(metadata.tf0.xyz, pt) / w;
    let sy = dot(metadata.tf1.xyz, pt) / w;"#
        }
    };
    let mode = match key.kind {
        KernelKind::Resize => "clamped",
        KernelKind::Transform => "bounded",
    };
    let store = if key.dt.is_integer() {
        format!("{}(round_half_away(v))", t)
    } else {
        "v".to_string()
    };
    format!(
        r#"
@group(0) @binding(0) var<storage, read> X: array<{t}>;
@group(0) @binding(1) var<storage, read_write> Y: array<{t}>;
@group(0) @binding(2) var<uniform> metadata: Meta;
{prelude}
@compute @workgroup_size({wg}, {wg})
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let x = gid.x;
    let y = gid.y;
    if (x >= metadata.out_dims.x || y >= metadata.out_dims.y) {{
        return;
    }}
    {coords}
    for (var p3 = 0u; p3 < metadata.out_dims.w; p3 = p3 + 1u) {{
        for (var p2 = 0u; p2 < metadata.out_dims.z; p2 = p2 + 1u) {{
            let v = {sampler}_{mode}(sx, sy, p2, p3);
            let o = i32(x) * metadata.out_strides.x
                + i32(y) * metadata.out_strides.y
                + i32(p2) * metadata.out_strides.z
                + i32(p3) * metadata.out_strides.w;
            Y[u32(o)] = {store};
        }}
    }}
}}
"#,
        prelude = GEOMETRY_PRELUDE,
        wg = GEOMETRY_WORKGROUP,
    )
}
