//! UCI subprocess client implementing [`PositionalOracle`].
//!
//! One child process per executable. A reader thread forwards stdout lines
//! over a channel so every wait can be bounded with `recv_timeout`; requests
//! are serialised through a mutex, which lets one process serve many games.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::game_state::GameState;
use crate::oracle::oracle_trait::{
    sort_best_first, EngineLine, EvaluationRequest, PlayResult, PositionalOracle, SearchLimit,
};
use crate::oracle::score::Score;

const ORACLE_READY_TIMEOUT: Duration = Duration::from_secs(30);
const ORACLE_QUIT_TIMEOUT: Duration = Duration::from_secs(1);
const ORACLE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How often a running search checks the caller's cancel flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Hard limit for depth-limited searches.
const DEPTH_SEARCH_TIMEOUT: Duration = Duration::from_secs(60);
/// Slack on top of a `movetime` search before `stop` is sent.
const MOVETIME_GRACE: Duration = Duration::from_secs(2);
/// Time allowed for `bestmove` to arrive after `stop`.
const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct UciOracle {
    path: PathBuf,
    process: Mutex<UciProcess>,
}

struct UciProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    multipv: usize,
    /// A search was left running or the pipe broke; respawn before reuse.
    out_of_sync: bool,
}

/// What a search loop ended with.
enum SearchEnd {
    BestMove(String),
    Cancelled,
}

impl UciOracle {
    /// Spawn the executable and run the `uci` / `isready` / `ucinewgame`
    /// handshake.
    pub fn spawn(path: impl AsRef<Path>) -> HumanResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut process = UciProcess::spawn(&path)?;
        process.initialize()?;
        info!("oracle {} ready", path.display());
        Ok(Self {
            path,
            process: Mutex::new(process),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one request against the process, respawning it first if an
    /// earlier request left it out of sync.
    fn with_process<T>(&self, f: impl FnOnce(&mut UciProcess) -> HumanResult<T>) -> HumanResult<T> {
        let mut process = self.process.lock().unwrap_or_else(PoisonError::into_inner);
        if process.out_of_sync {
            warn!("restarting oracle {}", self.path.display());
            let mut fresh = UciProcess::spawn(&self.path)?;
            fresh.initialize()?;
            *process = fresh;
        }
        let result = f(&mut process);
        if matches!(
            result,
            Err(HumanEngineError::OracleIo(_) | HumanEngineError::OracleTimeout(_))
        ) {
            process.out_of_sync = true;
        }
        result
    }
}

impl PositionalOracle for UciOracle {
    fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
        cancel: Option<&AtomicBool>,
    ) -> HumanResult<Vec<EngineLine>> {
        self.with_process(|process| {
            let multipv = request.effective_multipv();
            process.sync_ready()?;
            process.set_multipv(multipv)?;
            process.write_line(&position_command(request.position))?;
            process.write_line(&go_command(request.limit, request.root_moves))?;

            let mut latest: BTreeMap<usize, EngineLine> = BTreeMap::new();
            let end = process.run_search(request.limit, cancel, |line| {
                if let Some((index, engine_line)) = parse_info_line(line)? {
                    latest.insert(index, engine_line);
                }
                Ok(())
            })?;
            if let SearchEnd::Cancelled = end {
                return Err(HumanEngineError::Cancelled);
            }

            let mut lines: Vec<EngineLine> = latest.into_values().take(multipv).collect();
            sort_best_first(&mut lines);
            debug!(
                "oracle returned {} line(s) for {}",
                lines.len(),
                request.position.get_fen()
            );
            Ok(lines)
        })
    }

    fn play(
        &self,
        position: &GameState,
        limit: SearchLimit,
        cancel: Option<&AtomicBool>,
    ) -> HumanResult<PlayResult> {
        self.with_process(|process| {
            process.sync_ready()?;
            process.set_multipv(1)?;
            process.write_line(&position_command(position))?;
            process.write_line(&go_command(limit, &[]))?;

            match process.run_search(limit, cancel, |_| Ok(()))? {
                SearchEnd::Cancelled => Err(HumanEngineError::Cancelled),
                SearchEnd::BestMove(line) => parse_bestmove(&line)?.ok_or_else(|| {
                    HumanEngineError::OracleProtocol(format!(
                        "oracle has no move in {}",
                        position.get_fen()
                    ))
                }),
            }
        })
    }
}

impl UciProcess {
    fn spawn(path: &Path) -> HumanResult<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            HumanEngineError::OracleProtocol("oracle stdin unavailable".to_owned())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            HumanEngineError::OracleProtocol("oracle stdout unavailable".to_owned())
        })?;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            multipv: 1,
            out_of_sync: false,
        })
    }

    fn initialize(&mut self) -> HumanResult<()> {
        self.write_line("uci")?;
        let deadline = Instant::now() + ORACLE_READY_TIMEOUT;
        loop {
            let line = self.recv_until(deadline)?;
            if line.trim() == "uciok" {
                break;
            }
        }
        self.sync_ready()?;
        self.write_line("ucinewgame")?;
        self.sync_ready()
    }

    /// `isready` / `readyok`. Anything still buffered from an abandoned
    /// search is discarded on the way.
    fn sync_ready(&mut self) -> HumanResult<()> {
        self.write_line("isready")?;
        let deadline = Instant::now() + ORACLE_READY_TIMEOUT;
        loop {
            let line = self.recv_until(deadline)?;
            if line.trim() == "readyok" {
                return Ok(());
            }
        }
    }

    fn set_multipv(&mut self, multipv: usize) -> HumanResult<()> {
        if self.multipv != multipv {
            self.write_line(&format!("setoption name MultiPV value {multipv}"))?;
            self.multipv = multipv;
        }
        Ok(())
    }

    /// Read until `bestmove`, feeding every other line to `on_line`.
    ///
    /// Every way out of a search goes through `bestmove`: a raised cancel
    /// flag, a line `on_line` rejects and an overrun all send `stop` and keep
    /// draining, so the process is idle before the lock is released. A
    /// process that never answers the `stop` is marked out of sync.
    fn run_search(
        &mut self,
        limit: SearchLimit,
        cancel: Option<&AtomicBool>,
        mut on_line: impl FnMut(&str) -> HumanResult<()>,
    ) -> HumanResult<SearchEnd> {
        let start = Instant::now();
        let soft_deadline = start
            + match limit {
                SearchLimit::Depth(_) => DEPTH_SEARCH_TIMEOUT,
                SearchLimit::Time(budget) => budget + MOVETIME_GRACE,
            };
        // Set once `stop` has been sent.
        let mut drain_deadline: Option<Instant> = None;
        let mut cancelled = false;
        let mut failure: Option<HumanEngineError> = None;

        loop {
            if drain_deadline.is_none() && cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!("oracle search cancelled after {:?}", start.elapsed());
                cancelled = true;
                drain_deadline = Some(self.send_stop()?);
            }

            match self.rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(line) => {
                    if line.starts_with("bestmove") {
                        if let Some(err) = failure {
                            return Err(err);
                        }
                        return Ok(if cancelled {
                            SearchEnd::Cancelled
                        } else {
                            SearchEnd::BestMove(line)
                        });
                    }
                    if drain_deadline.is_none() {
                        if let Err(err) = on_line(&line) {
                            warn!("abandoning oracle search: {err}");
                            failure = Some(err);
                            drain_deadline = Some(self.send_stop()?);
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    match drain_deadline {
                        Some(deadline) if now >= deadline => {
                            warn!("oracle ignored stop after {:?}", start.elapsed());
                            self.out_of_sync = true;
                            return Err(failure.unwrap_or(if cancelled {
                                HumanEngineError::Cancelled
                            } else {
                                HumanEngineError::OracleTimeout(start.elapsed())
                            }));
                        }
                        None if now >= soft_deadline => {
                            warn!("oracle overran its search limit, sending stop");
                            drain_deadline = Some(self.send_stop()?);
                        }
                        _ => {}
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.out_of_sync = true;
                    return Err(exited_unexpectedly());
                }
            }
        }
    }

    /// Send `stop`, returning the deadline for `bestmove` to arrive.
    fn send_stop(&mut self) -> HumanResult<Instant> {
        self.write_line("stop")?;
        Ok(Instant::now() + STOP_DRAIN_TIMEOUT)
    }

    fn recv_until(&self, deadline: Instant) -> HumanResult<String> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) => Err(HumanEngineError::OracleTimeout(remaining)),
            Err(RecvTimeoutError::Disconnected) => Err(exited_unexpectedly()),
        }
    }

    fn write_line(&mut self, msg: &str) -> HumanResult<()> {
        self.stdin.write_all(msg.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        let _ = self.write_line("quit");
        let deadline = Instant::now() + ORACLE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            std::thread::sleep(ORACLE_QUIT_POLL_INTERVAL);
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn exited_unexpectedly() -> HumanEngineError {
    HumanEngineError::OracleIo(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "oracle exited unexpectedly",
    ))
}

/// One oracle process per executable path, spawned on first use and shared by
/// every game afterwards.
pub fn shared_oracle(path: impl AsRef<Path>) -> HumanResult<Arc<UciOracle>> {
    static ORACLES: OnceLock<Mutex<HashMap<PathBuf, Arc<UciOracle>>>> = OnceLock::new();

    let path = path.as_ref().to_path_buf();
    let mut oracles = ORACLES
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(oracle) = oracles.get(&path) {
        return Ok(Arc::clone(oracle));
    }
    let oracle = Arc::new(UciOracle::spawn(&path)?);
    oracles.insert(path, Arc::clone(&oracle));
    Ok(oracle)
}

pub fn position_command(position: &GameState) -> String {
    format!("position fen {}", position.get_fen())
}

pub fn go_command(limit: SearchLimit, root_moves: &[String]) -> String {
    let mut command = match limit {
        SearchLimit::Depth(depth) => format!("go depth {depth}"),
        SearchLimit::Time(budget) => format!("go movetime {}", budget.as_millis().max(1)),
    };
    if !root_moves.is_empty() {
        command.push_str(" searchmoves ");
        command.push_str(&root_moves.join(" "));
    }
    command
}

/// Decode `info ... multipv k ... score cp|mate v ... pv m1 ...`.
///
/// Lines without both a score and a principal variation (currmove updates,
/// strings, hashfull reports) yield `None`. A missing `multipv` means line 1.
/// Bound markers after the score value are skipped.
pub fn parse_info_line(line: &str) -> HumanResult<Option<(usize, EngineLine)>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") {
        return Ok(None);
    }

    let mut index = 1usize;
    let mut score = None;
    let mut first_pv_move = None;

    while let Some(token) = tokens.next() {
        match token {
            "multipv" => {
                let value = tokens.next().unwrap_or_default();
                index = value.parse().map_err(|_| {
                    HumanEngineError::OracleProtocol(format!("bad multipv '{value}' in '{line}'"))
                })?;
            }
            "score" => {
                let kind = tokens.next().unwrap_or_default();
                let value = tokens.next().unwrap_or_default();
                score = Some(Score::from_uci(kind, value)?);
            }
            "pv" => {
                first_pv_move = tokens.next();
                break;
            }
            "string" => return Ok(None),
            _ => {}
        }
    }

    match (score, first_pv_move) {
        (Some(score), Some(mv)) => Ok(Some((index, EngineLine::new(mv, score)))),
        _ => Ok(None),
    }
}

/// Decode `bestmove X [ponder Y]`. `bestmove (none)` yields `None`.
pub fn parse_bestmove(line: &str) -> HumanResult<Option<PlayResult>> {
    let rest = line.strip_prefix("bestmove").ok_or_else(|| {
        HumanEngineError::OracleProtocol(format!("expected bestmove, got '{line}'"))
    })?;
    let mut tokens = rest.split_whitespace();
    let best_move = match tokens.next() {
        None | Some("(none)") | Some("0000") => return Ok(None),
        Some(mv) => mv.to_owned(),
    };
    let ponder = match (tokens.next(), tokens.next()) {
        (Some("ponder"), Some(mv)) => Some(mv.to_owned()),
        _ => None,
    };
    Ok(Some(PlayResult { best_move, ponder }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::score::MateSide;

    #[test]
    fn info_line_with_multipv_and_centipawns() {
        let line = "info depth 12 seldepth 18 multipv 2 score cp -35 nodes 48213 nps 1200000 pv e7e5 g1f3 b8c6";
        let (index, engine_line) = parse_info_line(line).expect("valid").expect("has a line");
        assert_eq!(index, 2);
        assert_eq!(engine_line.move_uci, "e7e5");
        assert_eq!(engine_line.score, Score::Centipawns(-35));
    }

    #[test]
    fn info_line_with_mate_and_bound() {
        let line = "info depth 9 score mate -3 upperbound pv h7h6 d1h5";
        let (index, engine_line) = parse_info_line(line).expect("valid").expect("has a line");
        assert_eq!(index, 1);
        assert_eq!(
            engine_line.score,
            Score::MateIn {
                moves: 3,
                side: MateSide::Receiving
            }
        );
    }

    #[test]
    fn info_lines_without_pv_are_skipped() {
        assert!(parse_info_line("info depth 3 currmove e2e4 currmovenumber 1")
            .expect("valid")
            .is_none());
        assert!(parse_info_line("info string NNUE evaluation enabled")
            .expect("valid")
            .is_none());
        assert!(parse_info_line("readyok").expect("valid").is_none());
    }

    #[test]
    fn garbage_score_is_a_protocol_error() {
        let result = parse_info_line("info depth 4 multipv 1 score cp 1x2 pv e2e4");
        assert!(matches!(result, Err(HumanEngineError::OracleProtocol(_))));
    }

    #[test]
    fn bestmove_with_and_without_ponder() {
        let played = parse_bestmove("bestmove e2e4 ponder e7e5")
            .expect("valid")
            .expect("has a move");
        assert_eq!(played.best_move, "e2e4");
        assert_eq!(played.ponder.as_deref(), Some("e7e5"));

        let bare = parse_bestmove("bestmove g1f3").expect("valid").expect("has a move");
        assert_eq!(bare.ponder, None);

        assert_eq!(parse_bestmove("bestmove (none)").expect("valid"), None);
        assert!(parse_bestmove("info depth 1").is_err());
    }

    #[test]
    fn go_command_lists_searchmoves() {
        let roots = vec!["e2e4".to_owned(), "d2d4".to_owned()];
        assert_eq!(
            go_command(SearchLimit::Depth(8), &roots),
            "go depth 8 searchmoves e2e4 d2d4"
        );
        assert_eq!(
            go_command(SearchLimit::Time(Duration::from_millis(1500)), &[]),
            "go movetime 1500"
        );
        assert_eq!(
            position_command(&GameState::new_game()),
            "position fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    /// A shell engine whose first search reports a corrupt score and only
    /// finishes after `readyok` has gone out; later searches are well formed.
    #[cfg(unix)]
    fn scripted_engine(name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = r#"#!/bin/sh
searches=0
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name scripted"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      searches=$((searches + 1))
      if [ "$searches" -eq 1 ]; then
        echo "info depth 4 multipv 1 score cp 1x2 pv e2e4"
        (sleep 0.3; echo "bestmove e2e4") &
      else
        echo "info depth 4 multipv 1 score cp 30 pv d2d4"
        echo "info depth 4 multipv 2 score cp 20 pv g1f3"
        echo "bestmove d2d4"
      fi ;;
    quit) exit 0 ;;
  esac
done
"#;
        let path = std::env::temp_dir().join(format!("{name}-{}.sh", std::process::id()));
        std::fs::write(&path, script).expect("write engine script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make engine script executable");
        path
    }

    #[cfg(unix)]
    #[test]
    fn corrupt_search_is_drained_before_the_next_request() {
        let path = scripted_engine("corrupt-score-engine");
        let oracle = UciOracle::spawn(&path).expect("scripted engine starts");
        let game = GameState::new_game();
        let request = EvaluationRequest::new(&game, SearchLimit::Depth(4), 2);

        let first = oracle.evaluate(&request, None);
        assert!(matches!(first, Err(HumanEngineError::OracleProtocol(_))));

        let second = oracle.evaluate(&request, None).expect("second search succeeds");
        let moves: Vec<&str> = second.iter().map(|line| line.move_uci.as_str()).collect();
        assert_eq!(moves, vec!["d2d4", "g1f3"]);

        drop(oracle);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn spawning_a_missing_binary_fails_with_io() {
        let result = UciOracle::spawn("/nonexistent/oracle-binary");
        assert!(matches!(result, Err(HumanEngineError::OracleIo(_))));
    }
}
