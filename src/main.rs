//! Line-oriented driver for one human-like engine instance.
//!
//! Commands on stdin, one per line:
//!
//! ```text
//! position <fen>                  position the engine is to move in
//! previous <fen>                  position before the opponent's last move
//! lastmove <uci>                  the opponent's last move
//! go <start_ms> <own_ms> <opp_ms> decide, wait the declared delay, reply
//! premove <fen>                   speculative reply, opponent to move
//! reset
//! quit
//! ```
//!
//! Replies are `move <uci> think_ms <n>`, `resign`, `premove <uci>`,
//! `premove none` or `error <message>`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{error, info};

use human_chess::engines::engine_humanized::HumanEngine;
use human_chess::engines::engine_trait::{ClockInfo, HumanlikeEngine, MoveDecision};
use human_chess::engines::policy::HumanPolicy;
use human_chess::engines::think_delay::{DelayGate, DelayOutcome};
use human_chess::errors::{HumanEngineError, HumanResult};
use human_chess::game_state::chess_types::Color;
use human_chess::game_state::game_state::GameState;
use human_chess::oracle::oracle_trait::PositionalOracle;
use human_chess::oracle::uci_oracle::shared_oracle;
use human_chess::predictor::centrality_predictor::CentralityPredictor;
use human_chess::predictor::linear_predictor::LinearPredictor;
use human_chess::predictor::predictor_trait::PlausibilityPredictor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Color {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Color::Light,
            SideArg::Black => Color::Dark,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "human_move", version, about = "Human-like move decisions over a UCI oracle")]
struct Args {
    /// UCI engine executable used as the positional oracle
    #[arg(long)]
    oracle: PathBuf,

    #[arg(long, value_enum, default_value_t = SideArg::White)]
    side: SideArg,

    /// TOML file overriding behaviour parameters
    #[arg(long)]
    policy: Option<PathBuf>,

    /// JSON predictor weights; the centrality heuristic is used without them
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Seed for reproducible decisions
    #[arg(long)]
    seed: Option<u64>,

    /// Pin normal-play think times for calibration runs
    #[arg(long)]
    shadow: bool,
}

struct DriverState {
    engine: HumanEngine,
    prev_position: Option<GameState>,
    last_move: Option<String>,
    gate: Arc<DelayGate>,
    stop: Arc<AtomicBool>,
}

/// Parse the three millisecond fields of `go`.
fn parse_clocks(args: &[&str]) -> Result<ClockInfo, String> {
    let [start, own, opp] = args else {
        return Err(format!("go expects <start_ms> <own_ms> <opp_ms>, got {}", args.join(" ")));
    };
    let parse = |field: &str| {
        field
            .parse::<u64>()
            .map_err(|_| format!("invalid clock value '{field}'"))
    };
    Ok(ClockInfo::from_millis(parse(start)?, parse(own)?, parse(opp)?))
}

/// The `move` line for a decision, `None` when the engine resigned.
fn move_reply(decision: &MoveDecision) -> Option<String> {
    let chosen = decision.chosen_move.as_deref()?;
    Some(format!("move {chosen} think_ms {}", decision.think_time.as_millis()))
}

fn parse_position(fen: &str) -> HumanResult<GameState> {
    GameState::from_fen(fen.trim()).map_err(HumanEngineError::InvalidPosition)
}

impl DriverState {
    fn handle_command(&mut self, line: &str, out: &mut impl Write) -> io::Result<bool> {
        let trimmed = line.trim();
        let (command, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));

        let result = match command {
            "" => Ok(()),
            "quit" => return Ok(true),
            "reset" => {
                self.engine.reset();
                self.prev_position = None;
                self.last_move = None;
                Ok(())
            }
            "position" => parse_position(rest).map(|game| self.engine.update_position(game)),
            "previous" => parse_position(rest).map(|game| self.prev_position = Some(game)),
            "lastmove" => {
                self.last_move = Some(rest.trim().to_owned());
                Ok(())
            }
            "go" => self.go(rest, out),
            "premove" => self.premove(rest, out),
            other => Err(HumanEngineError::Config(format!("unknown command '{other}'"))),
        };

        if let Err(err) = result {
            error!("{err}");
            writeln!(out, "error {err}")?;
        }
        Ok(false)
    }

    fn go(&mut self, rest: &str, out: &mut impl Write) -> HumanResult<()> {
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let clocks = parse_clocks(&fields).map_err(HumanEngineError::Config)?;
        let started = Instant::now();
        self.stop.store(false, Ordering::Relaxed);
        self.gate.reset();

        let decision = self.engine.make_move(
            clocks,
            self.prev_position.as_ref(),
            self.last_move.as_deref(),
        )?;
        self.prev_position = None;
        self.last_move = None;

        let Some(reply) = move_reply(&decision) else {
            writeln!(out, "resign")?;
            return Ok(());
        };

        let remaining = decision.total_delay().saturating_sub(started.elapsed());
        if self.gate.wait(remaining) == DelayOutcome::Cancelled {
            info!("game ended while waiting to send '{reply}'");
            return Ok(());
        }
        writeln!(out, "{reply}")?;
        Ok(())
    }

    fn premove(&mut self, rest: &str, out: &mut impl Write) -> HumanResult<()> {
        let game = parse_position(rest)?;
        match self.engine.premove(&game)? {
            Some(uci) => writeln!(out, "premove {uci}")?,
            None => writeln!(out, "premove none")?,
        }
        Ok(())
    }
}

/// Forward stdin lines, cancelling waits and searches as soon as the game
/// ends rather than when the main loop gets to the line.
fn spawn_stdin_reader(gate: Arc<DelayGate>, stop: Arc<AtomicBool>) -> Receiver<String> {
    let (tx, rx) = channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if matches!(line.trim(), "quit" | "reset") {
                stop.store(true, Ordering::Relaxed);
                gate.cancel();
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn build_engine(args: &Args, stop: Arc<AtomicBool>) -> HumanResult<HumanEngine> {
    let mut policy = match &args.policy {
        Some(path) => HumanPolicy::load(path)?,
        None => HumanPolicy::default(),
    };
    if args.shadow {
        policy.timing.shadow_mode = true;
    }

    let oracle: Arc<dyn PositionalOracle> = shared_oracle(&args.oracle)?;
    let predictor: Arc<dyn PlausibilityPredictor> = match &args.weights {
        Some(path) => Arc::new(LinearPredictor::load(path)?),
        None => Arc::new(CentralityPredictor::new()),
    };

    let side = Color::from(args.side);
    let mut engine = match args.seed {
        Some(seed) => HumanEngine::with_seed(side, oracle, predictor, policy, seed),
        None => HumanEngine::new(side, oracle, predictor, policy),
    };
    engine.set_stop_signal(Some(stop));
    Ok(engine)
}

fn run(args: Args) -> HumanResult<()> {
    let gate = Arc::new(DelayGate::new());
    let stop = Arc::new(AtomicBool::new(false));
    let engine = build_engine(&args, Arc::clone(&stop))?;
    info!("playing {:?} with oracle {}", args.side, args.oracle.display());

    let mut driver = DriverState {
        engine,
        prev_position: None,
        last_move: None,
        gate: Arc::clone(&gate),
        stop: Arc::clone(&stop),
    };

    let commands = spawn_stdin_reader(gate, stop);
    let mut stdout = io::stdout();
    for line in commands {
        let should_quit = driver.handle_command(&line, &mut stdout)?;
        stdout.flush()?;
        if should_quit {
            break;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_clocks_are_parsed_in_milliseconds() {
        let clocks = parse_clocks(&["60000", "5000", "20000"]).expect("clocks");
        assert_eq!(clocks, ClockInfo::from_millis(60_000, 5_000, 20_000));
        assert!(parse_clocks(&["60000", "5000"]).is_err());
        assert!(parse_clocks(&["60000", "five", "20000"]).is_err());
    }

    #[test]
    fn decisions_become_move_lines() {
        use human_chess::analysis::phase::GamePhase;
        use human_chess::engines::engine_trait::ModeFlags;
        use std::time::Duration;

        let mut decision = MoveDecision::resigned(GamePhase::Endgame, ModeFlags::default());
        assert_eq!(move_reply(&decision), None);

        decision.chosen_move = Some("e2e4".to_owned());
        decision.think_time = Duration::from_millis(1250);
        decision.extra_delay = Duration::from_millis(300);
        assert_eq!(move_reply(&decision).as_deref(), Some("move e2e4 think_ms 1250"));
        assert_eq!(decision.total_delay(), Duration::from_millis(1550));
    }

    #[test]
    fn side_flag_maps_to_colors() {
        assert_eq!(Color::from(SideArg::White), Color::Light);
        assert_eq!(Color::from(SideArg::Black), Color::Dark);
    }

    #[test]
    fn command_line_requires_an_oracle() {
        assert!(Args::try_parse_from(["human_move"]).is_err());
        let args = Args::try_parse_from(["human_move", "--oracle", "/usr/bin/stockfish", "--side", "black", "--seed", "7"])
            .expect("args");
        assert_eq!(args.side, SideArg::Black);
        assert_eq!(args.seed, Some(7));
        assert!(!args.shadow);
    }
}
