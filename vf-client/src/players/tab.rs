use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use vf_utils::{ConnectionLifecycle, ConnectionStage};

use super::RemotePlayers;
use super::rig::NameTagText;

fn egui_color(color: Color) -> egui::Color32 {
    let srgba = color.to_srgba();
    egui::Color32::from_rgba_unmultiplied(
        (srgba.red * 255.0) as u8,
        (srgba.green * 255.0) as u8,
        (srgba.blue * 255.0) as u8,
        (srgba.alpha * 255.0) as u8,
    )
}

/// Projects each rig's name tag into the viewport and paints it as
/// foreground text.
pub fn draw_player_name_tags(
    mut contexts: EguiContexts,
    camera_query: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    tags: Query<(&GlobalTransform, &NameTagText, &InheritedVisibility)>,
) {
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("player_name_tags"),
    ));

    for (transform, tag, visibility) in &tags {
        if !visibility.get() {
            continue;
        }
        let Ok(screen_pos) = camera.world_to_viewport(camera_transform, transform.translation())
        else {
            continue;
        };
        painter.text(
            egui::pos2(screen_pos.x, screen_pos.y),
            egui::Align2::CENTER_BOTTOM,
            &tag.text,
            egui::TextStyle::Body.resolve(&ctx.style()),
            egui_color(tag.color),
        );
    }
}

/// Held-Tab player list: name, averaged ping, operator marker, hearts.
pub fn draw_player_tab(
    mut contexts: EguiContexts,
    keys: Res<ButtonInput<KeyCode>>,
    players: Res<RemotePlayers>,
    lifecycle: Res<ConnectionLifecycle>,
) {
    if lifecycle.stage() != ConnectionStage::InGame || !keys.pressed(KeyCode::Tab) {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let mut rows: Vec<_> = players.records.values().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    egui::Window::new("player_tab")
        .title_bar(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 32.0))
        .show(ctx, |ui| {
            egui::Grid::new("player_tab_grid")
                .spacing(egui::vec2(16.0, 4.0))
                .show(ui, |ui| {
                    for record in rows {
                        let name = if record.operator {
                            format!("{} [admin]", record.name)
                        } else {
                            record.name.clone()
                        };
                        ui.label(egui::RichText::new(name).color(if record.operator {
                            egui::Color32::GOLD
                        } else {
                            egui::Color32::WHITE
                        }));
                        ui.label(ping_label(record.ping.average()));
                        let hearts = (record.hp / 2.0).ceil().max(0.0) as u32;
                        ui.label(
                            egui::RichText::new("\u{2764}".repeat(hearts as usize))
                                .color(egui::Color32::RED),
                        );
                        ui.end_row();
                    }
                });
        });
}

fn ping_label(average: Option<u32>) -> String {
    match average {
        Some(ms) => format!("{ms} ms"),
        None => "disc".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vf_utils::PingWindow;

    #[test]
    fn empty_ping_window_reads_disc() {
        assert_eq!(ping_label(None), "disc");
        let mut window = PingWindow::default();
        window.push(20);
        window.push(40);
        assert_eq!(ping_label(window.average()), "30 ms");
    }
}
