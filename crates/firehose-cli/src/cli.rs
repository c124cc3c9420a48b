use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use firehose_core::auth::{BearerSigner, StreamRequest};
use firehose_core::config::{self, StreamConfig};
use firehose_core::control::{CancelToken, SessionControl};
use firehose_core::handler::RecordHandler;
use firehose_core::processor::RecordProcessor;
use firehose_core::session::StreamSession;
use firehose_core::transport::CurlTransport;
use serde_json::Value;
use std::io::Write;

/// Top-level CLI for the firehose stream ingestion client.
#[derive(Debug, Parser)]
#[command(name = "firehose")]
#[command(about = "firehose: resilient filtered-stream ingestion client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Start the stream session; runs until Ctrl-C or a fatal error.
    Run {
        /// Override the `track` filter parameter (comma-separated terms).
        #[arg(long)]
        track: Option<String>,
    },

    /// Print the resolved configuration and its path.
    Config,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { track } => run_stream(cfg, track),
            CliCommand::Config => {
                let path = config::config_path()?;
                println!("# {}", path.display());
                print!("{}", toml::to_string_pretty(&cfg)?);
                Ok(())
            }
        }
    }
}

/// Writes every record as one compact JSON line on stdout.
struct StdoutHandler;

impl RecordHandler for StdoutHandler {
    fn process_one(&mut self, record: &Value) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        // A closed pipe is not worth killing the session over.
        let _ = writeln!(out, "{}", record);
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

fn run_stream(cfg: StreamConfig, track: Option<String>) -> Result<()> {
    let mut params = cfg.param_pairs();
    if let Some(track) = track {
        params.retain(|(k, _)| k != "track");
        params.push(("track".to_string(), track));
    }
    anyhow::ensure!(
        !params.is_empty(),
        "no filter parameters; set [params] in the config or pass --track"
    );

    let control = SessionControl::new();
    let token = control.register("filter");
    install_shutdown_hook(token.clone());

    let transport = CurlTransport::new(cfg.stall_timeout(), token.clone());
    let signer = BearerSigner::new(cfg.credentials.access_token.clone());
    let request = StreamRequest::new(cfg.endpoint.clone(), params);
    let processor = RecordProcessor::new(vec![Box::new(StdoutHandler)], cfg.window_size);

    let mut session = StreamSession::new(
        transport,
        signer,
        request,
        processor,
        cfg.backoff.to_table(),
        cfg.connect_retry_delay(),
        token,
    );
    let result = session.run();
    control.unregister("filter");
    result.context("stream session terminated")
}

#[cfg(unix)]
fn install_shutdown_hook(token: CancelToken) {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    static SIGNALLED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_signal(_sig: libc::c_int) {
        SIGNALLED.store(true, Ordering::Relaxed);
    }

    let handler = on_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }

    // The handler itself only sets a flag; this thread turns the flag into
    // session cancellation.
    std::thread::spawn(move || loop {
        if SIGNALLED.load(Ordering::Relaxed) {
            tracing::info!("shutdown signal received");
            token.cancel();
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    });
}

#[cfg(not(unix))]
fn install_shutdown_hook(_token: CancelToken) {}
