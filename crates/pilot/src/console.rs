//! Console commands
//!
//! Every line typed into the terminal is parsed as one command, with clap in
//! multicall mode so the first word is the subcommand.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use pilot_recorder::settings::clamp_speed;
use pilot_recorder::{
    Action, EngineState, Error, HotkeyAction, Hotkey, MacroEngine, MacroStore, ReplayStats,
    Settings,
};
use std::path::{Path, PathBuf};

use crate::config;

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Start or stop recording
    Rec,
    /// Play the current macro
    Play,
    /// Stop recording or playback
    Stop,
    /// Load a macro file (bare names are looked up in the macro folder)
    Open { file: String },
    /// Save the current macro (default: a timestamped name)
    Save { file: Option<String> },
    /// List saved macros
    List,
    /// Summarize the current macro
    Show {
        #[arg(long)]
        all: bool,
    },
    /// Print the settings
    Settings,
    /// Change a setting
    Set {
        #[command(subcommand)]
        option: SetOption,
    },
    /// Stop everything and exit
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug, PartialEq)]
enum SetOption {
    /// Passes per play, 0 or less loops until stopped
    Repeat {
        #[arg(allow_negative_numbers = true)]
        count: i32,
    },
    /// Playback speed factor
    Speed { factor: f64 },
    /// Keep the window above others (used by graphical front-ends)
    OnTop {
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    RecordHotkey { combo: String },
    PlayHotkey { combo: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    engine: MacroEngine,
    store: MacroStore,
    settings_path: PathBuf,
    /// A playback was started and its end not reported yet
    playing: bool,
}

impl Console {
    pub fn new(engine: MacroEngine, store: MacroStore, settings_path: PathBuf) -> Self {
        Self {
            engine,
            store,
            settings_path,
            playing: false,
        }
    }

    pub fn engine(&self) -> &MacroEngine {
        &self.engine
    }

    pub fn banner(&self) {
        let s = self.engine.settings();
        println!("Pilot - macro recorder");
        println!("  {}  start/stop recording", s.record_hotkey);
        println!("  {}  start/stop playback", s.play_hotkey);
        println!("Type `help` for commands, Ctrl+C to quit.");
    }

    /// Run one console line
    pub fn execute(&mut self, line: &str) -> Flow {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Flow::Continue;
        }
        let command = match Line::try_parse_from(words) {
            Ok(line) => line.command,
            Err(e) => {
                let _ = e.print();
                return Flow::Continue;
            }
        };
        match self.run(command) {
            Ok(flow) => flow,
            Err(e) => {
                eprintln!("Error: {}", e);
                Flow::Continue
            }
        }
    }

    pub fn on_hotkey(&mut self, action: HotkeyAction) {
        let result = match action {
            HotkeyAction::ToggleRecord => self.toggle_recording(),
            HotkeyAction::TogglePlay => self.toggle_playback(),
        };
        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    /// Report a playback that ended on its own
    pub fn tick(&mut self) {
        if self.playing && self.engine.state() != EngineState::Playing {
            self.playing = false;
            if let Some(stats) = self.engine.wait_playback() {
                print_stats("Playback finished", &stats);
            }
        }
    }

    pub fn shutdown(&mut self) {
        if self.engine.state() == EngineState::Recording {
            self.stop_recording();
        }
        self.engine.shutdown();
        self.playing = false;
    }

    fn run(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Rec => self.toggle_recording()?,
            Command::Play => self.play()?,
            Command::Stop => self.stop(),
            Command::Open { file } => {
                let path = self.resolve(&file);
                let n = self.engine.load(&path)?;
                println!("Opened {} ({} events)", path.display(), n);
            }
            Command::Save { file } => {
                let path = match file {
                    Some(file) => self.resolve(&file),
                    None => self.store.timestamped_path(),
                };
                self.engine.save(&path)?;
                println!("Saved: {}", path.display());
            }
            Command::List => {
                let files = self.store.list()?;
                if files.is_empty() {
                    println!("No macros saved in {}", self.store.path().display());
                } else {
                    for f in files {
                        println!("{}", f);
                    }
                }
            }
            Command::Show { all } => self.show(all),
            Command::Settings => {
                println!("{}", serde_json::to_string_pretty(&self.engine.settings())?);
            }
            Command::Set { option } => self.set(option)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn toggle_recording(&mut self) -> Result<()> {
        if self.engine.state() == EngineState::Recording {
            self.stop_recording();
        } else {
            self.engine.start_recording()?;
            println!(
                "Recording... ({} or `rec` to stop)",
                self.engine.settings().record_hotkey
            );
        }
        Ok(())
    }

    fn stop_recording(&mut self) {
        if let Some(n) = self.engine.stop_recording() {
            let duration = self.engine.current_macro().duration();
            println!("Recorded {} events ({:.2}s)", n, duration.as_secs_f64());
        }
    }

    fn toggle_playback(&mut self) -> Result<()> {
        if self.engine.state() == EngineState::Playing {
            self.stop_playback();
            Ok(())
        } else {
            self.play()
        }
    }

    fn play(&mut self) -> Result<()> {
        match self.engine.play() {
            Ok(()) => {}
            Err(Error::EmptyMacro) => {
                println!("No macro recorded");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        self.playing = true;

        let s = self.engine.settings();
        let repeat = if s.repeat_count <= 0 {
            "until stopped".to_string()
        } else {
            format!("x{}", s.repeat_count)
        };
        println!(
            "Playing {} events {} at {}x speed ({} to stop)",
            self.engine.current_macro().len(),
            repeat,
            s.speed(),
            s.play_hotkey
        );
        Ok(())
    }

    fn stop_playback(&mut self) {
        self.playing = false;
        if let Some(stats) = self.engine.stop_playback() {
            print_stats("Playback stopped", &stats);
        } else if let Some(stats) = self.engine.wait_playback() {
            print_stats("Playback finished", &stats);
        }
    }

    fn stop(&mut self) {
        match self.engine.state() {
            EngineState::Recording => self.stop_recording(),
            EngineState::Playing => self.stop_playback(),
            EngineState::Idle => println!("Nothing to stop"),
        }
    }

    fn show(&self, all: bool) {
        let m = self.engine.current_macro();
        if m.is_empty() {
            println!("No macro recorded");
            return;
        }

        let (mut moves, mut clicks, mut scrolls, mut keys) = (0, 0, 0, 0);
        for e in &m {
            match e.action {
                Action::Move { .. } => moves += 1,
                Action::Click { .. } => clicks += 1,
                Action::Scroll { .. } => scrolls += 1,
                Action::KeyPress { .. } | Action::KeyRelease { .. } => keys += 1,
            }
        }
        println!("Events: {} ({:.2}s)", m.len(), m.duration().as_secs_f64());
        println!(
            "Summary: {} moves, {} clicks, {} scrolls, {} keys",
            moves, clicks, scrolls, keys
        );
        if all {
            for (i, e) in m.iter().enumerate() {
                println!("{:>5}: +{:.3}s {}", i, e.delay(), describe(&e.action));
            }
        }
    }

    fn set(&mut self, option: SetOption) -> Result<()> {
        let mut s = self.engine.settings();
        match option {
            SetOption::Repeat { count } => s.repeat_count = count,
            SetOption::Speed { factor } => s.playback_speed = clamp_speed(factor),
            SetOption::OnTop { value } => s.always_on_top = value,
            SetOption::RecordHotkey { combo } => s.record_hotkey = combo.parse::<Hotkey>()?,
            SetOption::PlayHotkey { combo } => s.play_hotkey = combo.parse::<Hotkey>()?,
        }
        self.apply(s)
    }

    fn apply(&mut self, settings: Settings) -> Result<()> {
        self.engine.update_settings(settings.clone())?;
        config::save(&self.settings_path, &settings)?;
        println!("Settings saved");
        Ok(())
    }

    /// Bare names live in the macro folder
    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.components().count() > 1 || path.is_absolute() {
            path.to_path_buf()
        } else {
            self.store.resolve(file)
        }
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::Move { x, y } => format!("move ({}, {})", x, y),
        Action::Click { x, y, button, pressed } => format!(
            "{:?} {} at ({}, {})",
            button,
            if *pressed { "down" } else { "up" },
            x,
            y
        ),
        Action::Scroll { x, y, dx, dy } => format!("scroll ({}, {}) at ({}, {})", dx, dy, x, y),
        Action::KeyPress { key } => format!("key {} down", key),
        Action::KeyRelease { key } => format!("key {} up", key),
    }
}

fn print_stats(what: &str, stats: &ReplayStats) {
    println!(
        "{}: {} events, {} passes, {} skipped",
        what, stats.events, stats.passes, stats.skipped
    );
}
