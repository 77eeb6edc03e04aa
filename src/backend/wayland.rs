//! Layer-shell window for the software backend

use log::{debug, info, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_layer, delegate_output, delegate_pointer, delegate_registry,
    delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        pointer::{PointerEvent, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use wayland_client::{
    backend::WaylandError,
    globals::registry_queue_init,
    protocol::{wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, EventQueue, QueueHandle,
};

use crate::backend::pointer::translate_pointer_events;
use crate::backend::software::Presenter;
use crate::config::CanvasSettings;
use crate::error::{CanvasError, Result};
use crate::input::InputEvent;
use crate::raster::Pixmap;

fn setup_error(e: impl ToString) -> CanvasError {
    CanvasError::Setup(e.to_string())
}

fn backend_error(e: impl ToString) -> CanvasError {
    CanvasError::Backend(e.to_string())
}

struct WaylandState {
    registry_state: RegistryState,
    output_state: OutputState,
    seat_state: SeatState,
    shm_state: Shm,
    layer_surface: Option<LayerSurface>,
    pool: SlotPool,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,
    configured: bool,
    pointer: Option<wl_pointer::WlPointer>,
    events: Vec<InputEvent>,
}

/// Shows frames on a wlr layer surface and collects pointer input.
pub struct WaylandPresenter {
    event_queue: EventQueue<WaylandState>,
    state: WaylandState,
}

impl WaylandPresenter {
    pub fn connect(settings: &CanvasSettings) -> Result<Self> {
        let conn = Connection::connect_to_env().map_err(setup_error)?;
        let (globals, mut event_queue) = registry_queue_init(&conn).map_err(setup_error)?;
        let qh = event_queue.handle();

        let compositor = CompositorState::bind(&globals, &qh).map_err(setup_error)?;
        let layer_shell = LayerShell::bind(&globals, &qh).map_err(setup_error)?;
        let shm = Shm::bind(&globals, &qh).map_err(setup_error)?;
        let seat_state = SeatState::new(&globals, &qh);

        let (width, height) = (settings.width, settings.height);
        let pool = SlotPool::new(width as usize * height as usize * 4, &shm).map_err(setup_error)?;

        let surface = compositor.create_surface(&qh);
        let layer_surface = layer_shell.create_layer_surface(
            &qh,
            surface,
            Layer::Top,
            Some(settings.title.clone()),
            None,
        );
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        layer_surface.set_size(width, height);
        layer_surface.wl_surface().commit();

        let mut state = WaylandState {
            registry_state: RegistryState::new(&globals),
            output_state: OutputState::new(&globals, &qh),
            seat_state,
            shm_state: shm,
            layer_surface: Some(layer_surface),
            pool,
            buffer: None,
            width,
            height,
            configured: false,
            pointer: None,
            events: Vec::new(),
        };

        info!("waiting for the compositor to configure the surface");
        while !state.configured {
            event_queue
                .blocking_dispatch(&mut state)
                .map_err(setup_error)?;
            if state.layer_surface.is_none() {
                return Err(CanvasError::Setup(
                    "surface closed before it was configured".into(),
                ));
            }
        }
        info!("surface configured at {}x{}", state.width, state.height);

        Ok(Self { event_queue, state })
    }
}

impl Presenter for WaylandPresenter {
    fn present(&mut self, frame: &Pixmap) -> Result<()> {
        let state = &mut self.state;
        let Some(layer_surface) = &state.layer_surface else {
            return Ok(());
        };
        let (width, height) = (frame.width(), frame.height());
        let (buffer, canvas) = state
            .pool
            .create_buffer(
                width as i32,
                height as i32,
                (width * 4) as i32,
                wl_shm::Format::Argb8888,
            )
            .map_err(backend_error)?;

        // Argb8888 is little endian: B, G, R, A in memory.
        for (dst, src) in canvas.chunks_exact_mut(4).zip(frame.data().chunks_exact(4)) {
            dst.copy_from_slice(&[src[2], src[1], src[0], src[3]]);
        }

        let surface = layer_surface.wl_surface();
        buffer.attach_to(surface).map_err(backend_error)?;
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();
        state.buffer = Some(buffer);

        self.event_queue.flush().map_err(backend_error)
    }

    fn poll_events(&mut self, events: &mut Vec<InputEvent>) -> Result<()> {
        self.event_queue.flush().map_err(backend_error)?;
        if let Some(guard) = self.event_queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(backend_error(e)),
            }
        }
        self.event_queue
            .dispatch_pending(&mut self.state)
            .map_err(backend_error)?;
        events.append(&mut self.state.events);
        Ok(())
    }
}

impl CompositorHandler for WaylandState {
    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
        debug!("scale factor changed");
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("transform changed");
    }

    // Frames are paced by the canvas timer, not by frame callbacks.
    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }
}

impl OutputHandler for WaylandState {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("new output");
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("output destroyed");
    }
}

impl LayerShellHandler for WaylandState {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        info!("layer surface closed by compositor");
        self.layer_surface = None;
        self.events.push(InputEvent::CloseRequested);
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        let (w, h) = configure.new_size;
        if (w != 0 && w != self.width) || (h != 0 && h != self.height) {
            warn!(
                "compositor suggested {w}x{h}, keeping canvas size {}x{}",
                self.width, self.height
            );
        }
        self.configured = true;
    }
}

impl SeatHandler for WaylandState {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Pointer && self.pointer.is_none() {
            self.pointer = self.seat_state.get_pointer(qh, &seat).ok();
            debug!("pointer bound: {}", self.pointer.is_some());
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Pointer {
            if let Some(pointer) = self.pointer.take() {
                pointer.release();
            }
        }
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {}
}

impl PointerHandler for WaylandState {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        translate_pointer_events(events, &mut self.events);
    }
}

impl ShmHandler for WaylandState {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm_state
    }
}

impl ProvidesRegistryState for WaylandState {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

delegate_compositor!(WaylandState);
delegate_output!(WaylandState);
delegate_shm!(WaylandState);
delegate_layer!(WaylandState);
delegate_seat!(WaylandState);
delegate_pointer!(WaylandState);
delegate_registry!(WaylandState);
