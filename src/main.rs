use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use scene_stack::camera::{CameraControl, OrbitCameraControl, StaticPerspectiveCamera};
use scene_stack::cli::Cli;
use scene_stack::clock::FrameClock;
use scene_stack::config::AppConfig;
use scene_stack::drop::FileDrop;
use scene_stack::loaders::load_environment_async;
use scene_stack::render::{SceneRenderer, WgpuContext};
use scene_stack::scene::SceneObject;
use scene_stack::scenes::{AxisGridHelpers, DirectoryContentSource};
use scene_stack::stacks::{effects_for, light_provider, scene_stack, ContentLibrary, SceneSource};
use scene_stack::texture::Texture;
use scene_stack::ui::SettingsPanel;

const INITIAL_WINDOW_WIDTH: u32 = 1280;
const INITIAL_WINDOW_HEIGHT: u32 = 720;

/// Result of a background load, installed on the event loop thread
enum Loaded {
    Scene(SceneObject),
    Environment(Rc<Texture>),
}

/// Everything that needs a window and a device
struct Viewer {
    window: Arc<Window>,
    renderer: SceneRenderer<WgpuContext>,
    camera: OrbitCameraControl,
    panel: SettingsPanel,
}

struct App {
    cli: Cli,
    config: AppConfig,
    library: ContentLibrary,
    viewer: Option<Viewer>,
    clock: FrameClock,
    pool: LocalPool,
    sender: UnboundedSender<Result<Loaded>>,
    receiver: UnboundedReceiver<Result<Loaded>>,
}

impl App {
    fn new(cli: Cli, config: AppConfig) -> Self {
        let library = ContentLibrary::new(Rc::new(DirectoryContentSource::new(&cli.content_dir)));
        let (sender, receiver) = mpsc::unbounded();
        Self {
            cli,
            config,
            library,
            viewer: None,
            clock: FrameClock::new(),
            pool: LocalPool::new(),
            sender,
            receiver,
        }
    }

    fn scene_source(&self) -> SceneSource {
        match (&self.cli.gltf, &self.cli.id) {
            (Some(path), _) => SceneSource::Gltf(path.clone()),
            (None, Some(id)) => SceneSource::Content(id.clone()),
            (None, None) => SceneSource::Cube,
        }
    }

    fn create_viewer(&self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title("Scene Stack")
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        INITIAL_WINDOW_WIDTH,
                        INITIAL_WINDOW_HEIGHT,
                    )),
            )?,
        );
        let size = window.inner_size();
        let backend = self.cli.backend;

        let context = pollster::block_on(WgpuContext::new(window.clone(), backend))?;
        let mut renderer = SceneRenderer::new(context, self.config.renderer);
        renderer.set_size(size.width, size.height);
        renderer.add_effects(effects_for(backend, &self.config));
        pollster::block_on(renderer.add_lights(light_provider(backend).as_ref()))?;
        if self.cli.helpers {
            pollster::block_on(renderer.add_helper(&AxisGridHelpers::default()))?;
        }

        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let mut camera = OrbitCameraControl::new(
            StaticPerspectiveCamera::new(&self.config.camera, aspect),
            self.config.orbit,
        );
        let camera_changed = renderer.camera_change_flag();
        camera.add_change_listener(move || camera_changed.set(true));
        camera.set_sizes(size.width, size.height);

        let panel = SettingsPanel::new(&window, !self.cli.no_ui);
        info!("Viewer ready: {}", renderer.render_status_message());

        Ok(Viewer {
            window,
            renderer,
            camera,
            panel,
        })
    }

    fn spawn_scene(&self, source: SceneSource) {
        let provider = scene_stack(&source, self.config.shadow_plane, &self.library);
        let sender = self.sender.clone();
        info!("Loading scene {source:?}");
        let spawned = self.pool.spawner().spawn_local(async move {
            let result = provider.create().await.map(Loaded::Scene);
            sender.unbounded_send(result).ok();
        });
        if let Err(err) = spawned {
            error!("Failed to start scene load: {err}");
        }
    }

    fn spawn_environment(&self, path: PathBuf) {
        let sender = self.sender.clone();
        info!("Loading environment {}", path.display());
        let spawned = self.pool.spawner().spawn_local(async move {
            let result = load_environment_async(path)
                .await
                .map(|texture| Loaded::Environment(Rc::new(texture)));
            sender.unbounded_send(result).ok();
        });
        if let Err(err) = spawned {
            error!("Failed to start environment load: {err}");
        }
    }

    fn handle_drop(&mut self, path: PathBuf) {
        match FileDrop::classify(&path) {
            Ok(FileDrop::Scene(path)) => self.spawn_scene(SceneSource::Gltf(path)),
            Ok(FileDrop::Environment(path)) => self.spawn_environment(path),
            Err(err) => {
                error!("Rejected dropped file: {err}");
                if let Some(viewer) = &mut self.viewer {
                    viewer.panel.notice = Some(err.to_string());
                }
            }
        }
    }

    /// Installs finished loads in arrival order without waiting on pending ones; the last one wins
    fn install_loads(&mut self) {
        self.pool.run_until_stalled();
        let Some(viewer) = &mut self.viewer else {
            return;
        };
        while let Ok(result) = self.receiver.try_recv() {
            match result {
                Ok(Loaded::Scene(batch)) => {
                    viewer.renderer.install_scene(batch);
                    viewer.panel.notice = None;
                }
                Ok(Loaded::Environment(texture)) => {
                    viewer.renderer.set_environment_map(texture);
                    viewer.panel.notice = None;
                }
                Err(err) => {
                    error!("Load failed, keeping the current scene: {err:#}");
                    viewer.panel.notice = Some(format!("{err:#}"));
                }
            }
        }
    }

    fn redraw(&mut self) {
        let delta_time_ms = self.clock.tick();
        self.install_loads();

        let Some(viewer) = &mut self.viewer else {
            return;
        };
        viewer.camera.update();
        viewer.renderer.animate(delta_time_ms);

        if let Err(err) = pollster::block_on(viewer.renderer.render(viewer.camera.camera())) {
            error!("Render error: {err:#}");
        }
        let ui = viewer.panel.run(&viewer.window, &mut viewer.renderer);
        if let Err(err) = viewer.renderer.context_mut().present(ui) {
            error!("Present error: {err:#}");
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match self.create_viewer(event_loop) {
            Ok(viewer) => {
                self.viewer = Some(viewer);
                self.spawn_scene(self.scene_source());
                if let Some(path) = self.cli.environment.clone() {
                    self.spawn_environment(path);
                }
            }
            Err(err) => {
                error!("Failed to initialize viewer: {err:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(viewer) = &mut self.viewer {
            if viewer.panel.handle_event(&viewer.window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                if let Some(mut viewer) = self.viewer.take() {
                    viewer.renderer.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.renderer.set_size(size.width, size.height);
                    viewer.camera.set_sizes(size.width, size.height);
                }
            }
            WindowEvent::DroppedFile(path) => self.handle_drop(path),
            WindowEvent::RedrawRequested => self.redraw(),
            other => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.camera.handle_window_event(&other);
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli, config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
