use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use scribit_geom::{ConfigBuilder, LenExt as _, DEFAULT_ANCHOR_DISTANCE};
use scribit_planner::{convert, session::DEFAULT_PEN_FEED, DrawingConfig, JogSession};
use scribit_protocol::{JogKey, MotionProgram, PenSlot};

use crate::mqtt::{Robot, RobotConfig};

mod jog;
mod mqtt;
mod preview;
mod server;
mod svg;

/// The only port the firmware will fetch from.
const HTTP_PORT: u16 = 80;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Turn an SVG into a calibration program and a drawing program.
    Convert(ConvertArgs),
    /// Draw a motion program into an SVG.
    Preview(PreviewArgs),
    /// Drive the robot from the keyboard.
    Jog(JogArgs),
}

#[derive(Args)]
struct ConvertArgs {
    svg: PathBuf,
    #[arg(long, default_value_t = DEFAULT_ANCHOR_DISTANCE)]
    anchor_distance: f64,
    #[arg(long, default_value_t = 0.70)]
    fit_frac: f64,
    #[arg(long, default_value_t = 1.0)]
    step_mm: f64,
    #[arg(long, default_value_t = 5.0)]
    travel_step_mm: f64,
    #[arg(long, default_value_t = 600)]
    travel_feed: u32,
    #[arg(long, default_value_t = 300)]
    draw_feed: u32,
    #[arg(long, default_value_t = 600)]
    carousel_feed: u32,
    #[arg(long, default_value_t = 0.20)]
    dot_dwell: f64,
    #[arg(long, default_value_t = 1)]
    bbox_pen: u8,
    #[arg(long, default_value_t = 1)]
    default_pen: u8,
    #[arg(long)]
    no_home_carousel: bool,
    #[arg(long, default_value = "bbox_dots.gcode")]
    out_bbox: PathBuf,
    #[arg(long, default_value = "drawing.gcode")]
    out_draw: PathBuf,
    /// Also write an SVG preview of the drawing program.
    #[arg(long)]
    preview: Option<PathBuf>,
}

#[derive(Args)]
struct PreviewArgs {
    gcode: PathBuf,
    #[arg(long, default_value = "preview.svg")]
    out: PathBuf,
    #[arg(long, default_value_t = DEFAULT_ANCHOR_DISTANCE)]
    anchor_distance: f64,
}

#[derive(Args)]
struct JogArgs {
    #[arg(long)]
    robot_id: String,
    #[arg(long)]
    mqtt_host: String,
    #[arg(long, default_value_t = 1883)]
    mqtt_port: u16,
    #[arg(long, default_value = "scribit")]
    mqtt_user: String,
    #[arg(long, default_value = "scribit")]
    mqtt_pass: String,
    /// An address of this machine that the robot can reach.
    #[arg(long)]
    host_ip: String,
    #[arg(long, default_value_t = HTTP_PORT)]
    http_port: u16,
    #[arg(long, default_value = "G4 P0")]
    suffix: String,
    #[arg(long, default_value_t = 2.0)]
    step: f64,
    #[arg(long, default_value_t = 900)]
    feed: u32,
}

fn geometry(anchor_distance: f64) -> anyhow::Result<scribit_geom::Config> {
    Ok(ConfigBuilder::default()
        .with_anchor_distance(anchor_distance.mm())
        .build()?)
}

fn run_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let config = DrawingConfig {
        geom: geometry(args.anchor_distance)?,
        fit_frac: args.fit_frac,
        step_mm: args.step_mm,
        travel_step_mm: args.travel_step_mm,
        travel_feed: args.travel_feed,
        draw_feed: args.draw_feed,
        carousel_feed: args.carousel_feed,
        dot_dwell_s: args.dot_dwell,
        bbox_pen: PenSlot::new(args.bbox_pen)?,
        default_pen: PenSlot::new(args.default_pen)?,
        home_carousel: !args.no_home_carousel,
    };
    // Catch a bad configuration before parsing the SVG.
    config.validate()?;

    let (strokes, pens) = svg::load_svg(&args.svg, config.default_pen)?;
    log::info!("{} strokes, colors: {pens}", strokes.len());
    let programs = convert(&strokes, &config)?;

    std::fs::write(&args.out_bbox, programs.bbox_dots.to_string())?;
    std::fs::write(&args.out_draw, programs.drawing.to_string())?;
    eprintln!("wrote {}", args.out_bbox.display());
    eprintln!("wrote {}", args.out_draw.display());

    if let Some(out) = &args.preview {
        preview::write_preview(out, &programs.drawing, &config.geom)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn run_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let geom = geometry(args.anchor_distance)?;
    let text = std::fs::read_to_string(&args.gcode)?;
    let program: MotionProgram = text.parse()?;
    preview::write_preview(&args.out, &program, &geom)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn run_jog(args: JogArgs) -> anyhow::Result<()> {
    if args.http_port != HTTP_PORT {
        bail!("the firmware rejects URLs with a port, so the HTTP server must be on port {HTTP_PORT}");
    }

    let session = Arc::new(
        JogSession::new(JogKey::new(args.step, args.feed)).with_pen_feed(DEFAULT_PEN_FEED),
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.http_port))
        .await
        .map_err(|e| anyhow!("couldn't bind port {} (are you root?): {e}", args.http_port))?;
    let app = server::router(Arc::clone(&session));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("HTTP server stopped: {e}");
        }
    });
    log::info!("HTTP listening on 0.0.0.0:{}", args.http_port);

    let robot = Robot::connect(RobotConfig {
        robot_id: args.robot_id,
        mqtt_host: args.mqtt_host,
        mqtt_port: args.mqtt_port,
        mqtt_user: args.mqtt_user,
        mqtt_pass: args.mqtt_pass,
        host_ip: args.host_ip,
        suffix: args.suffix,
    });
    if let Err(e) = robot.wake().await {
        log::warn!("couldn't wake the robot: {e}");
    }

    jog::run(session, &robot).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Preview(args) => run_preview(args),
        Command::Jog(args) => run_jog(args).await,
    }
}
