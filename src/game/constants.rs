/// Grid index defaults
pub mod grid {
    /// Default arena extent along the world Z axis (grid rows)
    pub const DEFAULT_ARENA_LENGTH: f32 = 360.0;
    /// Default arena extent along the world X axis (grid columns)
    pub const DEFAULT_ARENA_WIDTH: f32 = 360.0;
    /// Default edge length of one square cell in world units
    /// 360 / 10 = 36x36 cells, small enough for an exhaustive search every tick
    pub const DEFAULT_TILE_SIZE: f32 = 10.0;
    /// Upper bound on cell count; larger grids are rejected at arena load
    pub const MAX_CELLS: usize = 1 << 20;
    /// Initial capacity for the dynamic entity range index
    pub const DYNAMIC_INDEX_CAPACITY: usize = 32;
}

/// Bot decision engine constants
pub mod ai {
    /// Distance to target (world units) under which a bot may switch to CHASE
    pub const PROXIMITY_THRESHOLD: f32 = 100.0;
    /// Length of one chase cycle in seconds; the chase timer wraps to zero after this
    pub const MAX_CHASE_CYCLE: f32 = 15.0;
    /// Opening part of each chase cycle (seconds) during which the bot keeps seeking
    pub const CHASE_COOLDOWN: f32 = 3.0;
    /// Distance to the current seek point that counts as arrived
    pub const SEEK_ARRIVAL_DISTANCE: f32 = 15.0;
    /// Manhattan displacement along the path before a cell becomes the steering target
    pub const LOOKAHEAD_DISTANCE: f32 = 25.0;
    /// Maximum facing error (radians) that still counts as aligned with the target
    pub const AIM_ACCURACY: f32 = 0.08;
    /// Per-axis distance to the steering target below which no push is applied
    pub const MOVE_DEAD_ZONE: f32 = 1.0;
    /// Speed of the direct positional nudge toward the steering target (units/s)
    pub const NUDGE_SPEED: f32 = 20.0;
    /// Cells around the bot's own footprint that trigger spikes when another hovercraft is inside
    pub const SPIKE_CELL_RADIUS: i32 = 1;
    /// Seek point landmarks as fractions of the arena extent (quadrant centres + centre)
    pub const SEEK_POINT_FRACTIONS: [(f32, f32); 5] = [
        (0.25, 0.25),
        (0.75, 0.25),
        (0.25, 0.75),
        (0.75, 0.75),
        (0.5, 0.5),
    ];
}

/// AI coordinator constants
pub mod coordinator {
    /// Number of bots spawned by the simulation binary
    pub const DEFAULT_BOT_COUNT: usize = 3;
    /// Trail fuel fraction that must be exceeded before a bot lights its flame trail
    pub const TRAIL_FUEL_THRESHOLD: f32 = 0.5;
    /// Pending contact effects the queue holds between ticks
    pub const CONTACT_QUEUE_CAPACITY: usize = 1024;
}

/// Sandbox kinematics (headless simulation and tests)
pub mod sim {
    /// Tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Accepted tick rate range in Hz
    pub const MIN_TICK_RATE: u32 = 1;
    pub const MAX_TICK_RATE: u32 = 240;
    /// Delta time per tick in seconds
    pub const DT: f32 = 1.0 / 60.0;
    /// Half of a hovercraft's square footprint
    pub const HOVERCRAFT_HALF_EXTENT: f32 = 4.0;
    /// Hover height used when lifting ground positions to 3D
    pub const HOVER_HEIGHT: f32 = 1.5;
    /// Acceleration applied per unit of move input (units/s^2)
    pub const MOVE_ACCELERATION: f32 = 60.0;
    /// Maximum ground speed
    pub const MAX_SPEED: f32 = 80.0;
    /// Exponential velocity decay per tick
    pub const DRAG: f32 = 0.02;
    /// Yaw rate per unit of turn input (radians/s)
    pub const TURN_RATE: f32 = 3.0;
    /// Trail fuel burned per second while the flame trail is lit
    pub const TRAIL_FUEL_DRAIN: f32 = 0.25;
    /// Trail fuel recovered per second while the flame trail is off
    pub const TRAIL_FUEL_REGEN: f32 = 0.1;
    /// Rocket cooldown in seconds
    pub const ROCKET_COOLDOWN: f32 = 2.0;
    /// Spike trap cooldown in seconds
    pub const SPIKES_COOLDOWN: f32 = 4.0;
    /// Dash cooldown in seconds
    pub const DASH_COOLDOWN: f32 = 3.0;
    /// Instant speed added by a dash
    pub const DASH_IMPULSE: f32 = 60.0;
}
