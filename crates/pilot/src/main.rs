//! pilot - record mouse and keyboard macros, replay them with global hotkeys
//!
//! No flags: the console reads one command per line while the hotkeys work
//! from any application. `RUST_LOG` controls log output on stderr.

mod config;
mod console;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, never, select, tick};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pilot_recorder::platform::native::{NativeInput, NativeSink};
use pilot_recorder::{MacroEngine, MacroStore};

use console::{Console, Flow};

const TICK: Duration = Duration::from_millis(100);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings_path = config::settings_path()?;
    let settings = config::load(&settings_path);
    let store = MacroStore::new().context("could not open the macro folder")?;

    let engine = MacroEngine::new(NativeInput::shared(), Arc::new(NativeSink::new()), settings)
        .context("could not start the input hook")?;
    let hotkeys = engine.hotkey_actions();
    let mut console = Console::new(engine, store, settings_path);
    console.banner();

    let (quit_tx, quit_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = quit_tx.try_send(());
    })?;

    let lines = stdin_lines();
    let closed = never();
    let mut stdin_open = true;
    let ticker = tick(TICK);

    loop {
        select! {
            recv(hotkeys) -> action => {
                if let Ok(action) = action {
                    console.on_hotkey(action);
                }
            }
            recv(if stdin_open { &lines } else { &closed }) -> line => match line {
                Ok(line) => {
                    if console.execute(&line) == Flow::Quit {
                        break;
                    }
                }
                Err(_) => {
                    info!("stdin closed, hotkeys stay active until Ctrl+C");
                    stdin_open = false;
                }
            },
            recv(quit_rx) -> _ => break,
            recv(ticker) -> _ => console.tick(),
        }
    }

    console.shutdown();
    Ok(())
}

/// Lines typed into the terminal, read on their own thread
fn stdin_lines() -> crossbeam_channel::Receiver<String> {
    let (tx, rx) = bounded(16);
    thread::Builder::new()
        .name("pilot-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| tracing::error!("could not read stdin: {}", e));
    rx
}
