mod showreel;

use anyhow::{anyhow, Context as _};
use pulse_audio_out::CpalDevice;
use pulse_core::{Resolution, RuntimeConfig};
use pulse_runtime::{AudioDevice, Playback};
use pulse_transport::{Transport, TransportConfig};

use std::num::NonZeroU32;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use raw_window_handle::HasRawWindowHandle;

const RUNTIME_CONFIG_PATH: &str = "showreel.json";
const KEYMAP_PATH: &str = "keymap.json";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("[showreel] error: {e:#}");
        std::process::exit(1);
    }
}

fn non_zero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v.max(1)).unwrap_or(NonZeroU32::MIN)
}

fn run() -> anyhow::Result<()> {
    let config = RuntimeConfig::load_or_default(RUNTIME_CONFIG_PATH)
        .with_context(|| format!("loading {RUNTIME_CONFIG_PATH}"))?;
    let keymap = TransportConfig::load_or_default(KEYMAP_PATH)
        .with_context(|| format!("loading {KEYMAP_PATH}"))?;
    let transport = Transport::from_config(&keymap);
    info!(keys = transport.keymap().len(), "transport ready");

    // Configuration errors surface here, before a window exists.
    let show = showreel::build(&config)?;

    let device: Option<Box<dyn AudioDevice>> = if config.audio {
        let track = showreel::click_track(showreel::BPM, showreel::LENGTH_IN_BEATS)?;
        let device = CpalDevice::open(&track).context("opening audio output")?;
        Some(Box::new(device))
    } else {
        None
    };
    let mut playback = Playback::with_instant_clock(device);
    playback.set_pitch(config.pitch);

    let event_loop = EventLoop::new();

    let window_builder = WindowBuilder::new()
        .with_title("pulse: showreel")
        .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));

    let template = glutin::config::ConfigTemplateBuilder::new().with_alpha_size(8);

    let display_builder =
        glutin_winit::DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |mut configs| {
            configs.next().expect("no GL config available")
        })
        .map_err(|e| anyhow!("DisplayBuilder.build: {e}"))?;

    let window = window.ok_or_else(|| anyhow!("DisplayBuilder did not create a window"))?;
    let gl_display = gl_config.display();

    let raw_window_handle = window.raw_window_handle();

    let context_attributes = glutin::context::ContextAttributesBuilder::new()
        .with_profile(glutin::context::GlProfile::Core)
        .build(Some(raw_window_handle));

    let not_current_gl_context = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .context("create_context")?
    };

    let size = window.inner_size();
    let attrs = glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new()
        .build(raw_window_handle, non_zero(size.width), non_zero(size.height));

    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .context("create_window_surface")?
    };

    let gl_context = not_current_gl_context
        .make_current(&gl_surface)
        .context("make_current")?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match std::ffi::CString::new(s) {
            Ok(name) => gl_display.get_proc_address(name.as_c_str()) as *const _,
            Err(_) => std::ptr::null(),
        })
    };

    let resolution = Resolution::new(size.width.max(1), size.height.max(1));
    let mut state = unsafe { pulse_runtime_glow::setup(&gl, resolution, &show, &config)? };

    let mut frame: u64 = 0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                WindowEvent::ReceivedCharacter(ch) => {
                    if ch == '\u{1b}' {
                        *control_flow = ControlFlow::Exit;
                    } else {
                        transport.on_key(ch, &mut playback);
                    }
                }

                WindowEvent::Resized(physical_size) => {
                    let w = physical_size.width.max(1);
                    let h = physical_size.height.max(1);

                    gl_surface.resize(&gl_context, non_zero(w), non_zero(h));

                    if let Err(err) =
                        unsafe { pulse_runtime_glow::resize(&gl, Resolution::new(w, h), &mut state) }
                    {
                        tracing::error!(%err, "resize failed; stopping");
                        *control_flow = ControlFlow::Exit;
                    }

                    window.request_redraw();
                }

                _ => {}
            },

            Event::MainEventsCleared => window.request_redraw(),

            Event::RedrawRequested(_) => {
                if !state.is_live() {
                    return;
                }
                unsafe {
                    pulse_runtime_glow::render(&gl, playback.time(), frame, &state);
                }
                if let Err(err) = gl_surface.swap_buffers(&gl_context) {
                    warn!(%err, "swap_buffers failed");
                }
                frame = frame.wrapping_add(1);
            }

            Event::LoopDestroyed => {
                playback.pause();
                unsafe { pulse_runtime_glow::teardown(&gl, &mut state) };
            }

            _ => {}
        }
    });
}
