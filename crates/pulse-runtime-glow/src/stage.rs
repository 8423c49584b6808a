use glow::HasContext;
use pulse_core::{GlErrorPolicy, GraphicsError, Resolution};
use pulse_runtime::runtime_contract::{channel_texture_index, foreground_index};
use pulse_show::BufferId;

use crate::gl_check::check_gl;
use crate::ledger::{GpuLedger, GpuObject};

/// Two equal-size textures for one buffer slot. Which one is written is decided by the
/// frame parity at read time; the handles themselves never swap.
#[derive(Debug, Clone, Copy)]
pub struct PingPongPair {
    pub textures: [glow::NativeTexture; 2],
}

impl PingPongPair {
    pub fn foreground(&self, frame_parity: u64) -> glow::NativeTexture {
        self.textures[foreground_index(frame_parity)]
    }
}

/// Five ping-pong pairs, indexed by render order.
#[derive(Debug, Clone)]
pub struct Stage {
    pairs: [PingPongPair; 5],
}

impl Stage {
    /// Allocate ten `RGBA32F` textures cleared to transparent black.
    ///
    /// `fbo` is the shared offscreen framebuffer, used here only to clear.
    pub unsafe fn new(
        gl: &glow::Context,
        ledger: &mut GpuLedger,
        fbo: glow::NativeFramebuffer,
        resolution: Resolution,
        policy: GlErrorPolicy,
    ) -> Result<Self, GraphicsError> {
        let (w, h) = resolution.gl_size();
        let mut made = Vec::with_capacity(10);
        for _ in 0..10 {
            let tex = gl
                .create_texture()
                .map_err(|e| GraphicsError::Create(format!("create_texture(stage): {e}")))?;
            ledger.record(GpuObject::Texture(tex));
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA32F as i32,
                w,
                h,
                0,
                glow::RGBA,
                glow::FLOAT,
                None,
            );
            check_gl(gl, policy, "tex_image_2d", "stage texture");
            made.push(tex);
        }
        gl.bind_texture(glow::TEXTURE_2D, None);

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.viewport(0, 0, w, h);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        for &tex in &made {
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(tex),
                0,
            );
            check_gl(gl, policy, "attach", "stage texture");
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                return Err(GraphicsError::Create(format!(
                    "stage framebuffer incomplete: 0x{status:x}"
                )));
            }
            gl.clear(glow::COLOR_BUFFER_BIT);
            check_gl(gl, policy, "clear", "stage texture");
        }
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);

        let pair = |slot: usize| PingPongPair {
            textures: [made[slot * 2], made[slot * 2 + 1]],
        };
        Ok(Self {
            pairs: [pair(0), pair(1), pair(2), pair(3), pair(4)],
        })
    }

    pub fn pair(&self, buffer: BufferId) -> &PingPongPair {
        &self.pairs[buffer.index()]
    }

    /// Texture `consumer` samples when its channel reads `source` on this frame.
    pub fn channel_texture(
        &self,
        consumer: BufferId,
        source: BufferId,
        frame_parity: u64,
    ) -> glow::NativeTexture {
        let idx =
            channel_texture_index(consumer.render_order(), source.render_order(), frame_parity);
        self.pair(source).textures[idx]
    }

    pub fn owns(&self, tex: glow::NativeTexture) -> bool {
        self.pairs.iter().any(|p| p.textures.contains(&tex))
    }
}
