use clap::Parser;

/// Capture a full page as one stitched PNG.
#[derive(Parser, Debug)]
#[command(name = "pagestitch", version, about)]
struct Args {
    /// Page to capture
    url: String,

    /// Directory the PNG is written into
    #[arg(long, default_value = ".")]
    out_dir: String,

    /// Output filename (timestamped when omitted)
    #[arg(long)]
    filename: Option<String>,

    /// Wait after each scroll before capturing, in milliseconds
    #[arg(long, default_value_t = 150)]
    settle_ms: u64,

    /// Bound on each capture round trip, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Browser window width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Browser window height
    #[arg(long, default_value_t = 720)]
    height: u32,
}

#[cfg(feature = "cdp")]
#[tokio::main]
async fn main() {
    use pagestitch::cdp::CdpSession;
    use pagestitch::delivery::FileDelivery;
    use pagestitch::{CaptureConfig, Pipeline};

    let args = Args::parse();

    let session = match CdpSession::launch(&args.url, args.width, args.height) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("pagestitch: {err}");
            std::process::exit(1);
        }
    };
    let capture = session.capture_handle();

    let config = CaptureConfig {
        settle_delay_ms: args.settle_ms,
        capture_timeout_ms: args.timeout_ms,
        filename: args.filename,
        ..Default::default()
    };

    let mut pipeline = Pipeline::new(session, capture, FileDelivery::new(&args.out_dir), config);
    match pipeline.run().await {
        Ok(outcome) => {
            println!(
                "captured {} tile(s) into {}/{} ({}x{})",
                outcome.tile_count, args.out_dir, outcome.filename, outcome.width, outcome.height
            );
        }
        Err(err) => {
            eprintln!("pagestitch: capture failed: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "cdp"))]
fn main() {
    let _ = Args::parse();
    eprintln!("pagestitch: built without a capture backend; rebuild with --features cdp");
    std::process::exit(2);
}
