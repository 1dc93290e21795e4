mod provider;
mod script;

use anyhow::Context;
use avatar_core::{LivingAvatar, Surface};
use clap::Parser;
use instant::Instant;
use log::{info, LevelFilter};
use provider::FsProvider;
use script::{parse_script, Script, ScriptPlayer};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "avatar-native")]
#[command(about = "Drive a living avatar through scripted interaction states", long_about = None)]
#[command(version)]
struct Args {
    /// Directory holding `avatars/` and `personalities/`
    #[arg(long, default_value = "demos/data")]
    data_dir: PathBuf,

    #[arg(long, default_value = "cyborg-female")]
    avatar: String,

    #[arg(long, default_value = "ENFJ")]
    personality: String,

    /// Surface side length in pixels
    #[arg(long, default_value_t = 256.0)]
    size: f32,

    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Fixed seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Comma separated `state:millis` steps
    #[arg(
        long,
        default_value = "idle:2000,listening:3000,thinking:3000,speaking:4000,idle:2000",
        value_parser = parse_script
    )]
    script: Script,

    /// Restart the script instead of exiting when it ends
    #[arg(long)]
    loop_script: bool,

    /// Milliseconds between status lines
    #[arg(long, default_value_t = 1000)]
    report_ms: u64,

    #[arg(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let provider = FsProvider::new(&args.data_dir);
    let mut avatar = LivingAvatar::new(&args.avatar, &args.personality);
    if let Some(seed) = args.seed {
        avatar = avatar.with_seed(seed);
    }
    avatar
        .init(&Surface::square("native", args.size), &provider)
        .with_context(|| {
            format!(
                "initialising {}/{} from {}",
                args.avatar,
                args.personality,
                provider.root().display()
            )
        })?;

    run(&mut avatar, &args);

    let teardown = avatar.destroy();
    info!(
        "stopped {:?}, {} drivers left",
        teardown.stopped.as_slice(),
        teardown.pending_drivers
    );
    Ok(())
}

fn run(avatar: &mut LivingAvatar, args: &Args) {
    let frame = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let report = Duration::from_millis(args.report_ms.max(1));
    let mut player = ScriptPlayer::new(args.script.clone(), args.loop_script);
    if let Some(state) = player.first() {
        avatar.set_state(state);
    }

    let mut last = Instant::now();
    let mut since_report = Duration::ZERO;
    while !player.is_finished() {
        thread::sleep(frame);
        let now = Instant::now();
        let dt = now - last;
        last = now;

        avatar.tick(dt);
        if let Some(state) = player.advance(dt) {
            avatar.set_state(state);
        }

        since_report += dt;
        if since_report >= report {
            since_report = Duration::ZERO;
            info!("{}", avatar.snapshot());
        }
    }
}
