use glow::HasContext;

/// A GL object owned by a render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuObject {
    Texture(glow::NativeTexture),
    Framebuffer(glow::NativeFramebuffer),
    Sampler(glow::NativeSampler),
    Shader(glow::NativeShader),
    Program(glow::NativeProgram),
    Buffer(glow::NativeBuffer),
    VertexArray(glow::NativeVertexArray),
}

impl GpuObject {
    pub unsafe fn delete(self, gl: &glow::Context) {
        match self {
            GpuObject::Texture(t) => gl.delete_texture(t),
            GpuObject::Framebuffer(f) => gl.delete_framebuffer(f),
            GpuObject::Sampler(s) => gl.delete_sampler(s),
            GpuObject::Shader(s) => gl.delete_shader(s),
            GpuObject::Program(p) => gl.delete_program(p),
            GpuObject::Buffer(b) => gl.delete_buffer(b),
            GpuObject::VertexArray(v) => gl.delete_vertex_array(v),
        }
    }
}

/// Every GL object created for a show, in creation order.
///
/// Release always walks the ledger backwards, so dependents go before what they depend on.
#[derive(Debug, Default)]
pub struct GpuLedger {
    objects: Vec<GpuObject>,
}

impl GpuLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, object: GpuObject) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[GpuObject] {
        &self.objects
    }

    /// Drain everything in reverse creation order.
    pub fn release_with(&mut self, mut release: impl FnMut(GpuObject)) {
        while let Some(object) = self.objects.pop() {
            release(object);
        }
    }

    /// Remove the objects matching `pred` (newest first), keeping the rest in order.
    pub fn release_matching_with(
        &mut self,
        pred: impl Fn(&GpuObject) -> bool,
        mut release: impl FnMut(GpuObject),
    ) {
        for object in self.objects.iter().rev().filter(|o| pred(o)) {
            release(*object);
        }
        self.objects.retain(|o| !pred(o));
    }

    pub unsafe fn release_all(&mut self, gl: &glow::Context) {
        self.release_with(|object| object.delete(gl));
    }

    pub unsafe fn release_matching(
        &mut self,
        gl: &glow::Context,
        pred: impl Fn(&GpuObject) -> bool,
    ) {
        self.release_matching_with(pred, |object| object.delete(gl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn tex(n: u32) -> GpuObject {
        GpuObject::Texture(glow::NativeTexture(NonZeroU32::new(n).unwrap()))
    }

    fn program(n: u32) -> GpuObject {
        GpuObject::Program(glow::NativeProgram(NonZeroU32::new(n).unwrap()))
    }

    #[test]
    fn releases_in_reverse_creation_order() {
        let mut ledger = GpuLedger::new();
        for object in [tex(1), program(2), tex(3)] {
            ledger.record(object);
        }
        let mut released = Vec::new();
        ledger.release_with(|o| released.push(o));
        assert_eq!(released, vec![tex(3), program(2), tex(1)]);
        assert!(ledger.is_empty());

        // Second release is a no-op.
        ledger.release_with(|o| released.push(o));
        assert_eq!(released.len(), 3);
    }

    #[test]
    fn selective_release_keeps_the_rest() {
        let mut ledger = GpuLedger::new();
        for object in [tex(1), program(2), tex(3), program(4)] {
            ledger.record(object);
        }
        let mut released = Vec::new();
        ledger.release_matching_with(
            |o| matches!(o, GpuObject::Texture(_)),
            |o| released.push(o),
        );
        assert_eq!(released, vec![tex(3), tex(1)]);
        assert_eq!(ledger.objects(), &[program(2), program(4)]);
    }
}
