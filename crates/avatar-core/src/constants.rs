// Shared animation tuning constants. Times are milliseconds, visual values are
// normalized opacity/scale or calibration units.

// Blink
pub const DOUBLE_BLINK_GAP_MS: f64 = 100.0; // pause between the two blinks of a double blink
pub const BLINK_SCALE_CLOSED_Y: f32 = 0.1; // vertical squash for the scale method
pub const BLINK_OFFSET_DROP: f32 = 3.0; // downward lid travel for the offset method
pub const BLINK_OFFSET_OPACITY: f32 = 0.7; // lid opacity for the offset method

// Breath
pub const BREATH_SCALE_PER_DEGREE: f32 = 0.003; // amplitude angle -> scale delta
pub const BREATH_DRIFT_PER_MS: f64 = 0.001; // time modulation of the random waveform

// Lights
pub const LIGHT_INITIAL_OPACITY: f32 = 0.6;
pub const LIGHTS_DEFAULT_PERIOD_MS: f64 = 1500.0;
pub const LIGHTS_DEFAULT_INTENSITY: f32 = 0.75;

// Equalizer
pub const EQ_DISPLAY_OPACITY: f32 = 0.8; // background and bars while thinking
pub const EQ_DAMPING: f32 = 0.15; // fraction of the remaining distance covered per frame
pub const EQ_SNAP_THRESHOLD: f32 = 0.5; // closer than this snaps to target
pub const EQ_DEFAULT_SPEED: f64 = 100.0;

// Mouth signals
pub const SIGNAL_SPACING: f32 = 5.0; // horizontal distance between signal elements
pub const SIGNAL_SIZE: f32 = 4.0;
pub const SIGNAL_FILL: &str = "#ff3300";
pub const SIGNAL_STROKE: &str = "#ff6600";
pub const SIGNAL_STROKE_WIDTH: f32 = 1.5;
pub const SIGNAL_DEFAULT_MIN_PERIOD_MS: f64 = 200.0;
pub const SIGNAL_DEFAULT_MAX_PERIOD_MS: f64 = 600.0;
pub const SHIMMER_FLOOR: f32 = 0.4; // lowest intensity while speaking
pub const SHIMMER_SPAN: f32 = 0.6; // FLOOR + SPAN = full intensity
pub const PULSE_HIGH: f32 = 0.8; // synchronized pulse upper intensity
pub const PULSE_LOW: f32 = 0.3;
pub const PULSE_HALF_PERIOD_MS: f64 = 700.0; // one leg of the back-and-forth
pub const PULSE_FILL: &str = "#ff4500";

// Eyes
pub const EYE_SIZE: f32 = 12.0;
pub const EYE_FILL: &str = "#000000";

// Light halo
pub const LIGHT_STROKE_WIDTH: f32 = 2.0;

// Default container surface
pub const DEFAULT_SURFACE_SIZE: f32 = 256.0;
