//! GL objects shared by every pass: the full-screen quad, sampler objects, bitmap textures.

use glow::HasContext;
use pulse_core::{BitmapImage, GraphicsError, PixelFormat};
use pulse_runtime::runtime_contract::{ATTRIB_POSITION, ATTRIB_TEXCOORD, QUAD_INDICES, QUAD_VERTICES};
use pulse_show::{Filter, Wrap};

use crate::ledger::{GpuLedger, GpuObject};

// -------------------------------------------------------------------------------------------------
// Quad
// -------------------------------------------------------------------------------------------------

/// Four shared vertices, two indexed triangles.
#[derive(Debug)]
pub struct Quad {
    vao: glow::NativeVertexArray,
}

impl Quad {
    pub unsafe fn new(gl: &glow::Context, ledger: &mut GpuLedger) -> Result<Self, GraphicsError> {
        let vao = gl
            .create_vertex_array()
            .map_err(|e| GraphicsError::Create(format!("create_vertex_array: {e}")))?;
        ledger.record(GpuObject::VertexArray(vao));
        let vbo = gl
            .create_buffer()
            .map_err(|e| GraphicsError::Create(format!("create_buffer(vertices): {e}")))?;
        ledger.record(GpuObject::Buffer(vbo));
        let ebo = gl
            .create_buffer()
            .map_err(|e| GraphicsError::Create(format!("create_buffer(indices): {e}")))?;
        ledger.record(GpuObject::Buffer(ebo));

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_VERTICES),
            glow::STATIC_DRAW,
        );
        // Element buffer binding is VAO state.
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
        gl.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_INDICES),
            glow::STATIC_DRAW,
        );

        let stride = 4 * std::mem::size_of::<f32>() as i32;
        gl.enable_vertex_attrib_array(ATTRIB_POSITION.0);
        gl.vertex_attrib_pointer_f32(ATTRIB_POSITION.0, 2, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(ATTRIB_TEXCOORD.0);
        gl.vertex_attrib_pointer_f32(ATTRIB_TEXCOORD.0, 2, glow::FLOAT, false, stride, 2 * 4);

        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);

        Ok(Self { vao })
    }

    pub unsafe fn draw(&self, gl: &glow::Context) {
        gl.bind_vertex_array(Some(self.vao));
        gl.draw_elements(
            glow::TRIANGLES,
            QUAD_INDICES.len() as i32,
            glow::UNSIGNED_SHORT,
            0,
        );
        gl.bind_vertex_array(None);
    }
}

// -------------------------------------------------------------------------------------------------
// Samplers
// -------------------------------------------------------------------------------------------------

const FILTERS: [Filter; 2] = [Filter::Nearest, Filter::Linear];
const WRAPS: [Wrap; 3] = [Wrap::Clamp, Wrap::Repeat, Wrap::MirrorRepeat];

fn filter_index(filter: Filter) -> usize {
    match filter {
        Filter::Nearest => 0,
        Filter::Linear => 1,
    }
}

fn wrap_index(wrap: Wrap) -> usize {
    match wrap {
        Wrap::Clamp => 0,
        Wrap::Repeat => 1,
        Wrap::MirrorRepeat => 2,
    }
}

pub(crate) fn gl_filter(filter: Filter) -> i32 {
    (match filter {
        Filter::Nearest => glow::NEAREST,
        Filter::Linear => glow::LINEAR,
    }) as i32
}

pub(crate) fn gl_wrap(wrap: Wrap) -> i32 {
    (match wrap {
        Wrap::Clamp => glow::CLAMP_TO_EDGE,
        Wrap::Repeat => glow::REPEAT,
        Wrap::MirrorRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

/// One sampler object per (filter, wrap) combination. Textures are shared between channels
/// with different settings, so the settings live on the sampler bound to the unit.
#[derive(Debug)]
pub struct Samplers {
    table: [[glow::NativeSampler; 3]; 2],
}

impl Samplers {
    pub unsafe fn new(gl: &glow::Context, ledger: &mut GpuLedger) -> Result<Self, GraphicsError> {
        let mut made = Vec::with_capacity(FILTERS.len() * WRAPS.len());
        for filter in FILTERS {
            for wrap in WRAPS {
                let s = gl
                    .create_sampler()
                    .map_err(|e| GraphicsError::Create(format!("create_sampler: {e}")))?;
                ledger.record(GpuObject::Sampler(s));
                gl.sampler_parameter_i32(s, glow::TEXTURE_MIN_FILTER, gl_filter(filter));
                gl.sampler_parameter_i32(s, glow::TEXTURE_MAG_FILTER, gl_filter(filter));
                gl.sampler_parameter_i32(s, glow::TEXTURE_WRAP_S, gl_wrap(wrap));
                gl.sampler_parameter_i32(s, glow::TEXTURE_WRAP_T, gl_wrap(wrap));
                made.push(s);
            }
        }
        let row = |f: usize| [made[f * 3], made[f * 3 + 1], made[f * 3 + 2]];
        Ok(Self {
            table: [row(0), row(1)],
        })
    }

    pub fn get(&self, filter: Filter, wrap: Wrap) -> glow::NativeSampler {
        self.table[filter_index(filter)][wrap_index(wrap)]
    }
}

// -------------------------------------------------------------------------------------------------
// Bitmaps
// -------------------------------------------------------------------------------------------------

/// Copy of `bitmap`'s rows bottom-up, the order GL expects for `fragCoord01.y == 0` at the bottom.
pub fn rows_bottom_up(bitmap: &BitmapImage) -> Vec<u8> {
    let row = bitmap.width() as usize * bitmap.format().bytes_per_pixel();
    if row == 0 {
        return Vec::new();
    }
    bitmap
        .bytes()
        .chunks_exact(row)
        .rev()
        .flatten()
        .copied()
        .collect()
}

/// Upload a decoded bitmap. `Luma8` becomes a swizzled `R8` so all four components read the
/// coverage.
pub unsafe fn upload_bitmap(
    gl: &glow::Context,
    ledger: &mut GpuLedger,
    bitmap: &BitmapImage,
) -> Result<glow::NativeTexture, GraphicsError> {
    let tex = gl
        .create_texture()
        .map_err(|e| GraphicsError::Create(format!("create_texture(bitmap): {e}")))?;
    ledger.record(GpuObject::Texture(tex));

    let (internal, format) = match bitmap.format() {
        PixelFormat::Luma8 => (glow::R8, glow::RED),
        PixelFormat::Rgba8 => (glow::RGBA8, glow::RGBA),
    };
    let pixels = rows_bottom_up(bitmap);

    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        internal as i32,
        bitmap.width().max(1) as i32,
        bitmap.height().max(1) as i32,
        0,
        format,
        glow::UNSIGNED_BYTE,
        (!pixels.is_empty()).then_some(pixels.as_slice()),
    );
    if bitmap.format() == PixelFormat::Luma8 {
        for swizzle in [
            glow::TEXTURE_SWIZZLE_G,
            glow::TEXTURE_SWIZZLE_B,
            glow::TEXTURE_SWIZZLE_A,
        ] {
            gl.tex_parameter_i32(glow::TEXTURE_2D, swizzle, glow::RED as i32);
        }
    }
    gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
    gl.bind_texture(glow::TEXTURE_2D, None);
    Ok(tex)
}
