use glow::HasContext;
use pulse_core::{GlErrorPolicy, GraphicsError};
use tracing::error;

/// Upper bound on queued error flags drained per check. Some drivers report
/// `CONTEXT_LOST` forever.
const MAX_DRAINED: usize = 8;

/// Source of pending GL error codes.
pub(crate) trait ErrorQueue {
    unsafe fn pop_error(&self) -> u32;
}

impl ErrorQueue for glow::Context {
    unsafe fn pop_error(&self) -> u32 {
        self.get_error()
    }
}

/// Drain the error queue right after `step` on `label` and apply `policy`.
///
/// Called after each state-changing GL call, so the reported step is the one that raised
/// the flag. `Halt` panics on the first error so it can be inspected in a debugger; `Log`
/// reports it and lets the frame continue.
pub(crate) unsafe fn check_gl<Q: ErrorQueue + ?Sized>(
    queue: &Q,
    policy: GlErrorPolicy,
    step: &'static str,
    label: &str,
) {
    for _ in 0..MAX_DRAINED {
        let code = queue.pop_error();
        if code == glow::NO_ERROR {
            return;
        }
        report(
            policy,
            GraphicsError::Device {
                code,
                call: format!("{step} {label}"),
            },
        );
    }
}

pub(crate) fn report(policy: GlErrorPolicy, err: GraphicsError) {
    match policy {
        GlErrorPolicy::Halt => panic!("{err}"),
        GlErrorPolicy::Log => error!(%err, "gl error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Error flags raised by a scripted call sequence.
    #[derive(Default)]
    struct FakeQueue {
        pending: RefCell<Vec<u32>>,
        drained: RefCell<usize>,
    }

    impl FakeQueue {
        fn raise(&self, code: u32) {
            self.pending.borrow_mut().push(code);
        }
    }

    impl ErrorQueue for FakeQueue {
        unsafe fn pop_error(&self) -> u32 {
            *self.drained.borrow_mut() += 1;
            self.pending.borrow_mut().pop().unwrap_or(glow::NO_ERROR)
        }
    }

    #[test]
    fn clean_queue_reads_once() {
        let queue = FakeQueue::default();
        unsafe { check_gl(&queue, GlErrorPolicy::Halt, "use_program", "Image") };
        assert_eq!(*queue.drained.borrow(), 1);
    }

    #[test]
    #[should_panic(expected = "after bind iChannel2 scene 's' buffer Image")]
    fn halt_names_the_call_that_raised_the_flag() {
        let queue = FakeQueue::default();
        unsafe {
            check_gl(&queue, GlErrorPolicy::Halt, "attach", "scene 's' buffer Image");
            check_gl(&queue, GlErrorPolicy::Halt, "bind iChannel1", "scene 's' buffer Image");
            queue.raise(glow::INVALID_OPERATION);
            check_gl(&queue, GlErrorPolicy::Halt, "bind iChannel2", "scene 's' buffer Image");
            check_gl(&queue, GlErrorPolicy::Halt, "draw", "scene 's' buffer Image");
        }
    }

    #[test]
    fn log_policy_drains_a_bounded_number_of_flags() {
        let queue = FakeQueue::default();
        for _ in 0..20 {
            queue.raise(glow::CONTEXT_LOST);
        }
        unsafe { check_gl(&queue, GlErrorPolicy::Log, "draw", "Image") };
        assert_eq!(*queue.drained.borrow(), MAX_DRAINED);
        assert_eq!(queue.pending.borrow().len(), 20 - MAX_DRAINED);
    }

    #[test]
    fn log_policy_does_not_panic() {
        report(
            GlErrorPolicy::Log,
            GraphicsError::Device {
                code: glow::INVALID_OPERATION,
                call: "draw Image".into(),
            },
        );
    }

    #[test]
    #[should_panic(expected = "GL error 0x0502 after draw Image")]
    fn halt_policy_panics_with_code_and_call() {
        report(
            GlErrorPolicy::Halt,
            GraphicsError::Device {
                code: glow::INVALID_OPERATION,
                call: "draw Image".into(),
            },
        );
    }
}
