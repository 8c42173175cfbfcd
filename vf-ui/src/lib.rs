use bevy::input::ButtonInput;
use bevy::prelude::*;
use bevy_egui::{
    EguiContexts, EguiPlugin, EguiPrimaryContextPass,
    egui::{self},
};
use vf_utils::{
    ConnectionLifecycle, ConnectionStage, LifecycleEvent, REGION_SERVERS, ToNet, ToNetMessage,
};

/// Menu state that outlives individual screens: text fields, the chosen
/// region, and the last status line (connect errors, server notices).
#[derive(Resource)]
pub struct MenuUiState {
    pub username: String,
    pub direct_address: String,
    pub selected_region: Option<usize>,
    pub status: String,
    pub paused: bool,
}

impl Default for MenuUiState {
    fn default() -> Self {
        Self {
            username: "player".to_string(),
            direct_address: String::new(),
            selected_region: None,
            status: String::new(),
            paused: false,
        }
    }
}

impl MenuUiState {
    /// Address to connect to: direct text wins over the region pick.
    pub fn target_address(&self) -> Option<String> {
        if !self.direct_address.trim().is_empty() {
            return Some(self.direct_address.trim().to_string());
        }
        self.selected_region
            .and_then(|i| REGION_SERVERS.get(i))
            .map(|(_, addr)| addr.to_string())
    }
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut bevy::app::App) {
        app.add_plugins(EguiPlugin::default())
            .init_resource::<MenuUiState>()
            .add_systems(EguiPrimaryContextPass, menu_ui);
    }
}

fn menu_ui(
    mut contexts: EguiContexts,
    mut state: ResMut<MenuUiState>,
    mut lifecycle: ResMut<ConnectionLifecycle>,
    to_net: Res<ToNet>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    if keys.just_pressed(KeyCode::Escape) && lifecycle.stage() == ConnectionStage::InGame {
        state.paused = !state.paused;
    }

    match lifecycle.stage() {
        ConnectionStage::Start => {
            egui::Window::new("Voxelfront")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.heading("Voxelfront");
                    ui.add_space(12.0);
                    if ui.button("Start").clicked() {
                        lifecycle.advance(LifecycleEvent::StartPressed);
                    }
                });
        }
        ConnectionStage::ServerSelect => {
            egui::Window::new("Select Server")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label("Region:");
                    for (i, (label, addr)) in REGION_SERVERS.iter().enumerate() {
                        let selected = state.selected_region == Some(i);
                        if ui
                            .selectable_label(selected, format!("{label} ({addr})"))
                            .clicked()
                        {
                            state.selected_region = if selected { None } else { Some(i) };
                        }
                    }
                    ui.add_space(8.0);
                    ui.label("Direct connect:");
                    ui.text_edit_singleline(&mut state.direct_address);
                    ui.label("Username:");
                    ui.text_edit_singleline(&mut state.username);
                    ui.add_space(8.0);
                    if ui.button("Join").clicked() {
                        let target = state.target_address();
                        lifecycle.advance(LifecycleEvent::ServerChosen {
                            has_target: target.is_some(),
                        });
                        if lifecycle.stage() == ConnectionStage::Connecting {
                            if let Some(address) = target {
                                state.status.clear();
                                let _ = to_net.0.send(ToNetMessage::Connect {
                                    address,
                                    username: state.username.clone(),
                                });
                            }
                        }
                    }
                    if !state.status.is_empty() {
                        ui.add_space(4.0);
                        ui.colored_label(egui::Color32::LIGHT_RED, &state.status);
                    }
                });
        }
        ConnectionStage::Connecting => {
            egui::Window::new("Connecting")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label("Connecting...");
                    if ui.button("Cancel").clicked() {
                        let _ = to_net.0.send(ToNetMessage::Disconnect);
                        lifecycle.retreat();
                    }
                });
        }
        ConnectionStage::Loading => {
            let (done, max) = lifecycle.loaded_progress();
            progress_window(ctx, "Loading world", done, max);
        }
        ConnectionStage::LoadingChunks => {
            let (done, max) = lifecycle.chunk_progress();
            progress_window(ctx, "Loading chunks", done, max);
        }
        ConnectionStage::InGame => {
            if state.paused {
                egui::Window::new("Paused")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                    .show(ctx, |ui| {
                        ui.heading("Game Paused");
                        ui.add_space(8.0);
                        if ui.button("Back to game").clicked() {
                            state.paused = false;
                        }
                        if ui.button("Disconnect").clicked() {
                            let _ = to_net.0.send(ToNetMessage::Disconnect);
                            lifecycle.advance(LifecycleEvent::DisconnectPressed);
                            state.paused = false;
                        }
                    });
            }
        }
        ConnectionStage::Disconnecting => {
            let (remaining, max) = lifecycle.unload_progress();
            progress_window(ctx, "Disconnecting", max.saturating_sub(remaining), max);
        }
    }
}

fn progress_window(ctx: &egui::Context, title: &str, done: u32, max: u32) {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(format!("{title}: {done}/{max}"));
            let fraction = if max == 0 {
                1.0
            } else {
                done as f32 / max as f32
            };
            ui.add(egui::ProgressBar::new(fraction).show_percentage());
        });
}
