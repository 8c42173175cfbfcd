use bevy::ecs::resource::Resource;

/// Load-progress steps required before chunk streaming starts.
pub const LOADED_TARGET: u32 = 16;
/// Chunks that must arrive before the player enters the world.
pub const CHUNK_TARGET: u32 = 49;

/// Discrete menu/connection stages, ordered. Forward transitions advance by
/// exactly one ordinal. Reverse edges all land on ServerSelect: the
/// Disconnecting countdown, the Loading bail-out, and socket loss from any
/// connected stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStage {
    Start,
    ServerSelect,
    Connecting,
    Loading,
    LoadingChunks,
    InGame,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    StartPressed,
    /// Join pressed on the server-select screen. `has_target` is true when
    /// either a region server is selected or direct-connect text is present.
    ServerChosen {
        has_target: bool,
    },
    /// Transport-level connect succeeded. Only unblocks the UI; the stage
    /// itself advances once progress counters start moving.
    SocketConnected,
    /// Transport dropped or refused the connection.
    SocketLost,
    DisconnectPressed,
}

#[derive(Debug, Resource)]
pub struct ConnectionLifecycle {
    stage: ConnectionStage,
    loaded_count: u32,
    chunk_count: u32,
    unload_remaining: u32,
    max_disconnect: u32,
    join_sent: bool,
    socket_up: bool,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self {
            stage: ConnectionStage::Start,
            loaded_count: 0,
            chunk_count: 0,
            unload_remaining: 0,
            max_disconnect: 0,
            join_sent: false,
            socket_up: false,
        }
    }
}

impl ConnectionLifecycle {
    pub fn stage(&self) -> ConnectionStage {
        self.stage
    }

    pub fn socket_up(&self) -> bool {
        self.socket_up
    }

    /// Apply a UI or socket event. Events that are not accepted in the
    /// current stage are ignored.
    pub fn advance(&mut self, event: LifecycleEvent) {
        use ConnectionStage::*;
        use LifecycleEvent::*;
        match (self.stage, event) {
            (Start, StartPressed) => self.stage = ServerSelect,
            (ServerSelect, ServerChosen { has_target: true }) => self.stage = Connecting,
            (InGame, DisconnectPressed) => {
                self.max_disconnect = self.chunk_count;
                self.unload_remaining = self.chunk_count;
                self.stage = Disconnecting;
                if self.unload_remaining == 0 {
                    self.reset_to_server_select();
                }
            }
            (_, SocketConnected) => self.socket_up = true,
            // SocketLost retreats from every connected stage, not just the
            // Loading reverse edge: mid-session loss from LoadingChunks or
            // InGame, and the socket closing while Disconnecting. The
            // disconnect gesture shuts the transport down, so no further
            // chunkUnload lines can arrive and the close itself must finish
            // the countdown.
            (
                Connecting | Loading | LoadingChunks | InGame | Disconnecting,
                SocketLost,
            ) => self.retreat(),
            _ => {}
        }
    }

    /// Reverse transition back to the server list, clearing progress and the
    /// join-handshake guard. Used for connection loss and connect failure.
    pub fn retreat(&mut self) {
        match self.stage {
            ConnectionStage::Start | ConnectionStage::ServerSelect => {}
            _ => self.reset_to_server_select(),
        }
    }

    /// One asset/terrain load step. The first step moves Connecting into
    /// Loading; reaching the threshold moves Loading into LoadingChunks.
    pub fn note_load_progress(&mut self) {
        if self.stage == ConnectionStage::Connecting {
            self.stage = ConnectionStage::Loading;
            return;
        }
        if self.stage != ConnectionStage::Loading {
            return;
        }
        self.loaded_count += 1;
        if self.loaded_count >= LOADED_TARGET {
            self.stage = ConnectionStage::LoadingChunks;
        }
    }

    /// A chunk arrived. Counts in every connected stage so the disconnect
    /// countdown target matches what was actually loaded.
    pub fn note_chunk_loaded(&mut self) {
        match self.stage {
            ConnectionStage::Loading | ConnectionStage::LoadingChunks | ConnectionStage::InGame => {
                self.chunk_count += 1;
                if self.stage == ConnectionStage::LoadingChunks && self.chunk_count >= CHUNK_TARGET
                {
                    self.stage = ConnectionStage::InGame;
                }
            }
            _ => {}
        }
    }

    /// A chunk was torn down while disconnecting. Reaching zero completes
    /// the Disconnecting -> ServerSelect reverse transition.
    pub fn note_chunk_unloaded(&mut self) {
        if self.stage != ConnectionStage::Disconnecting {
            return;
        }
        self.unload_remaining = self.unload_remaining.saturating_sub(1);
        if self.unload_remaining == 0 {
            self.reset_to_server_select();
        }
    }

    /// The join handshake (announcing the player name) may fire at most once
    /// per connection window. Returns true exactly once after the stage has
    /// left Connecting; cleared only by a full reset.
    pub fn take_join_handshake(&mut self) -> bool {
        let past_connecting = matches!(
            self.stage,
            ConnectionStage::Loading | ConnectionStage::LoadingChunks | ConnectionStage::InGame
        );
        if past_connecting && !self.join_sent {
            self.join_sent = true;
            return true;
        }
        false
    }

    pub fn loaded_progress(&self) -> (u32, u32) {
        (self.loaded_count, LOADED_TARGET)
    }

    pub fn chunk_progress(&self) -> (u32, u32) {
        (self.chunk_count, CHUNK_TARGET)
    }

    pub fn unload_progress(&self) -> (u32, u32) {
        (self.unload_remaining, self.max_disconnect)
    }

    fn reset_to_server_select(&mut self) {
        self.stage = ConnectionStage::ServerSelect;
        self.loaded_count = 0;
        self.chunk_count = 0;
        self.unload_remaining = 0;
        self.max_disconnect = 0;
        self.join_sent = false;
        self.socket_up = false;
    }
}
