use bevy::prelude::*;
use clap::Parser;
use std::thread;
use tracing::info;
use vf_utils::{FromNet, ToNet, ToNetMessage};

mod bot;
mod entities;
mod message_handler;
mod players;
mod plugins;

#[derive(Parser, Debug)]
#[command(name = "voxelfront", about = "Voxel world game client")]
struct Args {
    /// Connect directly to this server address on startup.
    #[arg(long)]
    server: Option<String>,

    /// Player name announced in the join handshake.
    #[arg(long, default_value = "player")]
    username: String,
}

fn main() {
    tracing_subscriber::fmt().without_time().compact().init();

    let args = Args::parse();
    info!("Starting voxelfront");

    let (to_net_tx, to_net_rx) = crossbeam::channel::unbounded::<ToNetMessage>();
    let (from_net_tx, from_net_rx) = crossbeam::channel::unbounded();
    thread::spawn(move || vf_net::start_networking(to_net_rx, from_net_tx));

    let mut menu = vf_ui::MenuUiState {
        username: args.username,
        ..Default::default()
    };
    if let Some(server) = args.server {
        menu.direct_address = server;
    }

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Voxelfront".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(menu)
        .add_plugins(vf_ui::UiPlugin)
        .add_plugins(plugins::ClientCorePlugin::new(
            ToNet(to_net_tx.clone()),
            FromNet(from_net_rx),
        ))
        .add_plugins(plugins::ClientNetPlugin)
        .add_plugins(plugins::ClientPlayerPlugin)
        .add_plugins(plugins::ClientEntityPlugin)
        .add_plugins(plugins::ClientBotPlugin)
        .add_systems(Startup, setup_scene)
        .run();

    let _ = to_net_tx.send(ToNetMessage::Shutdown);
}

fn setup_scene(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 80.0, 120.0).looking_at(Vec3::new(0.0, 64.0, 0.0), Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: false,
            ..Default::default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.4, 0.0)),
    ));
}
