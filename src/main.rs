// main.rs — 产品展示查看器：菜单、设置面板、状态栏和 3D 交互

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod animation;
mod camera;
mod config;
mod error;
mod loader;
mod mesh;
mod renderer;
mod scene;
mod viewer;

use renderer::Renderer;
use viewer::ViewerContext;

use camera::{Projection, TransitionPolicy, ViewKey};
use config::Rgb;
use glam::Vec2;

use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const MODEL_EXTENSIONS: [&str; 2] = ["glb", "gltf"];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match config::load_from_args() {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            log::error!("failed to create window: {err}");
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(
        window.clone(),
        config.background,
        &config.light,
        config.floor.as_ref(),
    )) {
        Ok(renderer) => renderer,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    let size = window.inner_size();
    let mut ctx = match ViewerContext::new(config, size.width, size.height) {
        Ok(ctx) => ctx,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    ctx.start_loading();

    // 交互状态
    let mut mouse_pressed = false;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;

    // FPS 计算
    let mut last_fps_time = Instant::now();
    let mut last_tick = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        ctx.resize(new_size.width, new_size.height);
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = pick_model_file() {
                                        open_model(&mut ctx, path);
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&mut ctx, &window),
                                Some(VirtualKeyCode::R) => ctx.reset_view(),
                                _ => {}
                            }
                        }
                    }

                    // 鼠标交互
                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            mouse_pressed = state == ElementState::Pressed;
                            if !mouse_pressed {
                                last_mouse_pos = None;
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        if mouse_pressed {
                            if let Some(last_pos) = last_mouse_pos {
                                let dx = (position.x - last_pos.x) as f32;
                                let dy = (position.y - last_pos.y) as f32;
                                ctx.controller.orbit(Vec2::new(dx, dy));
                            }
                            last_mouse_pos = Some(position);
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        ctx.controller.zoom(scroll);
                    }

                    WindowEvent::DroppedFile(path) => open_model(&mut ctx, path),

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                // FPS 统计
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_fps_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_fps_time).as_secs_f32();
                    frame_count = 0;
                    last_fps_time = now;
                }
                let dt = now.duration_since(last_tick).as_secs_f32();
                last_tick = now;

                // 后台加载结果交给渲染器
                let events = ctx.poll_loads();
                if let Some(sky) = events.skybox {
                    renderer.load_skybox(&sky);
                }
                for (product, img) in events.screens {
                    renderer.set_screen_texture(&product, &img);
                }

                ctx.tick(dt);
                renderer.update_camera(ctx.controller.active_camera());
                renderer.sync_scene(&ctx);

                let mut next_model = None;
                let render_result = renderer.render_with_ui(&window, |egui_ctx| {
                    draw_ui(egui_ctx, &mut ctx, &mut next_model, fps, &window);
                });

                if let Some(path) = next_model {
                    open_model(&mut ctx, path);
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn pick_model_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("glTF model", &MODEL_EXTENSIONS)
        .pick_file()
}

/// Opened files replace the first product's model.
fn open_model(ctx: &mut ViewerContext, path: PathBuf) {
    let Some(product) = ctx.models.first().map(|slot| slot.config.key.clone()) else {
        log::warn!("no product configured to receive {}", path.display());
        return;
    };
    ctx.replace_model(&product, path);
}

fn toggle_fullscreen(ctx: &mut ViewerContext, window: &Window) {
    ctx.is_fullscreen = !ctx.is_fullscreen;
    if ctx.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn draw_ui(
    egui_ctx: &egui::Context,
    ctx: &mut ViewerContext,
    next_model: &mut Option<PathBuf>,
    fps: f32,
    window: &Window,
) {
    egui::TopBottomPanel::top("menu_bar").show(egui_ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // File
            ui.menu_button("File", |ui| {
                if ui.button("Open model…").clicked() {
                    ui.close_menu();
                    *next_model = pick_model_file();
                }
                if ui.button("Exit").clicked() {
                    std::process::exit(0);
                }
            });

            // View
            ui.menu_button("View", |ui| {
                if ui.button("Reset view").clicked() {
                    ctx.reset_view();
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button("Transition", |ui| {
                    let mut policy = ctx.controller.default_policy();
                    let instant = ui
                        .radio_value(&mut policy, TransitionPolicy::Instant, "Instant")
                        .clicked();
                    let animated = ui
                        .radio_value(&mut policy, TransitionPolicy::Animated, "Animated")
                        .clicked();
                    if instant || animated {
                        ctx.set_policy(policy);
                        ui.close_menu();
                    }
                });

                if ui
                    .button(if ctx.is_fullscreen {
                        "Exit fullscreen"
                    } else {
                        "Fullscreen"
                    })
                    .clicked()
                {
                    toggle_fullscreen(ctx, window);
                    ui.close_menu();
                }

                ui.separator();
                if ui.checkbox(&mut ctx.show_fps, "Show FPS").clicked() {
                    ui.close_menu();
                }
            });
        });
    });

    egui::Window::new("Settings")
        .default_pos([16.0, 48.0])
        .resizable(false)
        .show(egui_ctx, |ui| {
            egui::CollapsingHeader::new("Camera Views")
                .default_open(true)
                .show(ui, |ui| camera_views(ui, ctx));
            egui::CollapsingHeader::new("Product Customization")
                .default_open(true)
                .show(ui, |ui| product_customization(ui, ctx));
        });

    egui::TopBottomPanel::bottom("status_bar").show(egui_ctx, |ui| {
        ui.horizontal(|ui| {
            if ctx.is_loading() {
                ui.label(egui::RichText::new("Loading…").color(egui::Color32::YELLOW));
                ui.label("|");
            }
            for err in [ctx.load_error(), ctx.view_error.as_deref()].into_iter().flatten() {
                ui.label(egui::RichText::new(err).color(egui::Color32::RED));
                ui.label("|");
            }

            let camera = ctx.controller.active_camera();
            ui.label(format!("View: {}", ctx.controller.view_state().active));
            ui.label("|");
            match camera.projection {
                Projection::Perspective { fovy, .. } => ui.label(format!("FOV: {fovy:.1}°")),
                Projection::Orthographic { half_extent, .. } => {
                    ui.label(format!("Extent: ±{half_extent:.2}"))
                }
            };
            if let Some(progress) = ctx.controller.transition_progress() {
                ui.label("|");
                ui.label(format!("Transition: {:.0}%", progress * 100.0));
            }

            if ctx.show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN),
                );
            }
        });
    });
}

fn camera_views(ui: &mut egui::Ui, ctx: &mut ViewerContext) {
    let active = ctx.controller.view_state().active.clone();
    let mut clicked: Option<ViewKey> = None;

    // keys() 已排序，同一产品的视角相邻
    let keys = ctx.controller.keys();
    let mut start = 0;
    while start < keys.len() {
        let product = &keys[start].product;
        let end = keys[start..]
            .iter()
            .position(|k| &k.product != product)
            .map_or(keys.len(), |n| start + n);
        ui.label(egui::RichText::new(product).strong());
        ui.horizontal_wrapped(|ui| {
            for key in &keys[start..end] {
                if ui.selectable_label(*key == active, key.view.as_str()).clicked() {
                    clicked = Some(key.clone());
                }
            }
        });
        start = end;
    }

    if let Some(key) = clicked {
        ctx.switch_view(&key.product, &key.view);
    }
}

fn product_customization(ui: &mut egui::Ui, ctx: &mut ViewerContext) {
    let mut tints = Vec::new();
    let mut flips = Vec::new();
    let mut spins = Vec::new();

    for slot in &ctx.models {
        let key = &slot.config.key;
        ui.label(egui::RichText::new(key).strong());
        let Some(model) = slot.model() else {
            match slot.failure() {
                Some(reason) => ui.label(egui::RichText::new(reason).color(egui::Color32::RED)),
                None => ui.label("Loading…"),
            };
            continue;
        };

        ui.horizontal(|ui| {
            let mut color = model.tint().0;
            ui.label("Color");
            if ui.color_edit_button_srgb(&mut color).changed() {
                tints.push((key.clone(), Rgb(color)));
            }
        });

        if slot.config.flip || slot.config.spin {
            ui.horizontal(|ui| {
                if slot.config.flip {
                    let label = if model.motion.is_flipped() { "Flip back" } else { "Flip" };
                    if ui.button(label).clicked() {
                        flips.push(key.clone());
                    }
                    if model.motion.is_flipping() {
                        ui.weak("flipping…");
                    }
                }
                if slot.config.spin {
                    let mut spinning = model.motion.is_spinning;
                    if ui.checkbox(&mut spinning, "Spin").changed() {
                        spins.push(key.clone());
                    }
                }
            });
        }
    }

    for (key, color) in tints {
        ctx.set_tint(&key, color);
    }
    for key in flips {
        ctx.toggle_flip(&key);
    }
    for key in spins {
        ctx.toggle_spin(&key);
    }
}
