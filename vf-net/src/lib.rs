use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vf_utils::{EntitySnapshot, FromNetMessage, PlayerSnapshot, ToNetMessage};

/// Wire messages from a region server, one JSON object per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerMessage {
    PlayerStates {
        players: HashMap<String, PlayerSnapshot>,
    },
    PlayerJoin {
        player: PlayerSnapshot,
    },
    PlayerLeave {
        id: String,
    },
    EntitySpawn {
        entity: EntitySnapshot,
    },
    EntityUpdate {
        entity: EntitySnapshot,
    },
    EntityDespawn {
        id: String,
    },
    LoadStep,
    ChunkLoad,
    ChunkUnload,
    Message {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientMessage {
    Join { name: String },
    Leave,
}

pub fn start_networking(
    from_main: crossbeam::channel::Receiver<ToNetMessage>,
    to_main: crossbeam::channel::Sender<FromNetMessage>,
) {
    let mut writer: Option<TcpStream> = None;

    while let Ok(msg) = from_main.recv() {
        match msg {
            ToNetMessage::Connect { address, username } => {
                info!("Connecting to region server at {} as {}", address, username);
                match connect(&address) {
                    Ok(stream) => {
                        info!("Connected to {}", address);
                        let reader_stream = match stream.try_clone() {
                            Ok(s) => s,
                            Err(e) => {
                                let _ = to_main.send(FromNetMessage::ConnectFailed(e.to_string()));
                                continue;
                            }
                        };
                        writer = Some(stream);
                        let to_main_thread = to_main.clone();
                        thread::spawn(move || read_loop(reader_stream, to_main_thread));
                        let _ = to_main.send(FromNetMessage::Connected);
                    }
                    Err(e) => {
                        warn!("Failed to connect to {}: {}", address, e);
                        let _ = to_main.send(FromNetMessage::ConnectFailed(e.to_string()));
                    }
                }
            }
            ToNetMessage::Join { username } => {
                if let Some(stream) = writer.as_mut() {
                    if let Err(e) = send_message(stream, &ClientMessage::Join { name: username }) {
                        warn!("Failed to send join handshake: {}", e);
                    }
                }
            }
            ToNetMessage::Disconnect => {
                if let Some(stream) = writer.take() {
                    let _ = send_message(&stream, &ClientMessage::Leave);
                    let _ = stream.shutdown(Shutdown::Both);
                }
            }
            ToNetMessage::Shutdown => {
                if let Some(stream) = writer.take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                break;
            }
        }
    }
}

fn connect(address: &str) -> Result<TcpStream, Box<dyn std::error::Error>> {
    let stream = TcpStream::connect(address)?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

fn send_message(mut stream: &TcpStream, msg: &ClientMessage) -> std::io::Result<()> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    stream.write_all(line.as_bytes())
}

fn read_loop(stream: TcpStream, to_main: crossbeam::channel::Sender<FromNetMessage>) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Read error from server: {}", e);
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        let msg: ServerMessage = match serde_json::from_str(&line) {
            Ok(msg) => msg,
            Err(e) => {
                // Unknown or malformed messages are skipped, not fatal.
                warn!("Dropping unparseable server message: {}", e);
                continue;
            }
        };
        if to_main.send(translate(msg)).is_err() {
            // Main thread hung up
            break;
        }
    }
    let _ = to_main.send(FromNetMessage::Disconnected);
}

fn translate(msg: ServerMessage) -> FromNetMessage {
    match msg {
        ServerMessage::PlayerStates { players } => FromNetMessage::PlayerStates(players),
        ServerMessage::PlayerJoin { player } => FromNetMessage::PlayerJoin(player),
        ServerMessage::PlayerLeave { id } => FromNetMessage::PlayerLeave { id },
        ServerMessage::EntitySpawn { entity } => FromNetMessage::EntitySpawn(entity),
        ServerMessage::EntityUpdate { entity } => FromNetMessage::EntityUpdate(entity),
        ServerMessage::EntityDespawn { id } => FromNetMessage::EntityDespawn { id },
        ServerMessage::LoadStep => FromNetMessage::LoadProgress,
        ServerMessage::ChunkLoad => FromNetMessage::ChunkLoaded,
        ServerMessage::ChunkUnload => FromNetMessage::ChunkUnloaded,
        ServerMessage::Message { text } => FromNetMessage::ServerMessageText(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_player_states_line() {
        let line = r#"{"type":"playerStates","players":{"p1":{
            "id":"p1",
            "pos":{"x":0,"y":64,"z":0},"rot":{"x":0,"y":0,"z":0},
            "dir":{"x":0,"y":0,"z":0},"vel":{"x":0,"y":0,"z":0},
            "hp":20,"mode":"creative","operator":true,"currSlot":0,
            "toolbar":[null],"ping":10,"walking":false,"sneaking":false,
            "punching":false,"blocking":false,"fps":60,"name":"alex"
        }}}"#;
        let msg: ServerMessage = serde_json::from_str(line).unwrap();
        match translate(msg) {
            FromNetMessage::PlayerStates(players) => {
                assert_eq!(players.len(), 1);
                assert_eq!(players["p1"].name, "alex");
            }
            _ => panic!("expected player states"),
        }
    }

    #[test]
    fn parses_lifecycle_lines() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"chunkLoad"}"#).unwrap();
        assert!(matches!(translate(msg), FromNetMessage::ChunkLoaded));
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"loadStep"}"#).unwrap();
        assert!(matches!(translate(msg), FromNetMessage::LoadProgress));
    }

    #[test]
    fn join_handshake_serializes_with_tag() {
        let json = serde_json::to_string(&ClientMessage::Join {
            name: "steve".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"join","name":"steve"}"#);
    }
}
