// main.rs: line-oriented terminal front end.
//
// Enter shows a preview frame, `c` captures, `a` analyzes, `r` returns to
// the camera and `q` quits. Everything runs on one thread; an analysis
// request blocks the prompt until it completes.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use nutricam_lib::ai::openai_vision::OpenAiVisionClient;
use nutricam_lib::ai::{parse_nutrition, NutritionEntry};
use nutricam_lib::capture::{Frame, FrameSource};
use nutricam_lib::controller::{CaptureController, ControllerError};
use nutricam_lib::settings::{Settings, API_KEY_ENV};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings =
        Settings::load(config_path.as_deref())?.with_env_api_key(std::env::var(API_KEY_ENV).ok());

    let client = OpenAiVisionClient::new(settings.api_key.clone())
        .with_endpoint(settings.endpoint.clone())
        .with_model(settings.model.clone())
        .with_prompt(settings.prompt.clone())
        .with_max_tokens(settings.max_tokens);

    let camera = open_camera(&settings);
    let controller = CaptureController::new(
        camera,
        Arc::new(client),
        settings.output_dir.clone(),
        settings.jpeg_quality,
    );
    drive(controller).await
}

#[cfg(target_os = "linux")]
fn open_camera(settings: &Settings) -> nutricam_lib::capture::v4l2::V4l2Camera {
    nutricam_lib::capture::v4l2::V4l2Camera::new(
        settings.camera_index,
        settings.frame_width,
        settings.frame_height,
    )
}

#[cfg(not(target_os = "linux"))]
fn open_camera(settings: &Settings) -> nutricam_lib::capture::mock::MockCamera {
    log::warn!("No camera backend on this platform; showing a test pattern");
    nutricam_lib::capture::mock::MockCamera::new(settings.frame_width, settings.frame_height)
}

async fn drive<S: FrameSource>(
    mut controller: CaptureController<S>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Camera");
    if let Err(e) = controller.start() {
        println!("Error: {e}");
    }
    print_help(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" if !controller.session().photo_taken() => match controller.preview() {
                Ok(frame) => println!("{}", describe_frame(frame)),
                Err(e) => println!("Error: {e}"),
            },
            "c" => match controller.capture() {
                Ok(captured) => {
                    println!("Captured Photo ({}x{})", captured.width, captured.height);
                    println!("Photo saved as {}", captured.path.display());
                }
                Err(ControllerError::Codec(e)) => println!("Photo captured but not saved: {e}"),
                Err(e) => println!("Error: {e}"),
            },
            "a" => match controller.analyze().await {
                Ok(text) => print_analysis(text),
                Err(e) => println!("Error: {e}"),
            },
            "r" => {
                if let Err(e) = controller.reset() {
                    println!("Error: {e}");
                }
            }
            "q" => break,
            _ => {}
        }
        print_help(&controller);
    }
    Ok(())
}

fn print_help<S: FrameSource>(controller: &CaptureController<S>) {
    if controller.session().photo_taken() {
        println!("[a] Analyze Image  [r] Return to Camera  [q] Quit");
    } else if controller.is_streaming() {
        println!("[Enter] Preview  [c] Take Photo  [q] Quit");
    } else {
        println!("[r] Reopen Camera  [q] Quit");
    }
}

/// One-line summary of a preview frame: size and average colour.
fn describe_frame(frame: &Frame) -> String {
    let count = u64::from(frame.width()) * u64::from(frame.height());
    let mut sums = [0u64; 3];
    for pixel in frame.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }
    let mean = sums.map(|s| s.checked_div(count).unwrap_or(0));
    format!(
        "preview {}x{} avg rgb({}, {}, {})",
        frame.width(),
        frame.height(),
        mean[0],
        mean[1],
        mean[2]
    )
}

fn print_analysis(text: &str) {
    println!("API Response:");
    println!("{text}");
    let rows = parse_nutrition(text);
    if !rows.is_empty() {
        println!("{}", format_table(&rows));
    }
}

fn format_table(rows: &[NutritionEntry]) -> String {
    let mut out = format!(
        "{:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "item", "kcal", "sugar", "fat", "protein", "iron", "carbs"
    );
    for row in rows {
        let calories = row
            .calories
            .map_or_else(|| "?".to_string(), |c| c.to_string());
        out.push_str(&format!(
            "\n{:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            row.item, calories, row.sugar, row.fat, row.protein, row.iron, row.carbohydrates
        ));
    }
    out
}
