/// Score keeper: per-skill leaderboards with the current run in-board.
///
/// A leaderboard holds exactly eleven entries — the top ten plus the
/// slot for the run in progress, which starts at the bottom and bubbles
/// upward with a single insertion-sort pass every time the score grows
/// past a neighbor. Boards are keyed by skill name and serialized to a
/// flat delimited text record; a version line guards the file format and
/// unknown versions abort the load outright rather than half-applying.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand_pcg::Pcg32;

pub const LEADERBOARD_SIZE: usize = 11; // top-10 plus current run

const FORMAT_VERSION: u32 = 4;
const SCORE_FILE: &str = "leaderboard";

/// Board separator between the name preamble and its entries.
const BOARD_SEP: char = '\u{1}';
/// Field separator inside an entry.
const FIELD_SEP: char = '\u{2}';

const DEFAULT_NAMES: [&str; 6] = ["NOVA", "PIP", "SHADOW", "ACE", "MAZE", "JINX"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: i32,
    /// Unix seconds when the score was last touched.
    pub time: i64,
    /// Pickups eaten this run.
    pub points: u32,
    pub ms_played: u32,
}

impl ScoreEntry {
    fn anonymous() -> Self {
        ScoreEntry {
            name: "Anonymous".into(),
            score: 0,
            time: 0,
            points: 0,
            ms_played: 0,
        }
    }
}

struct ScoreBoard {
    name: String,
    data: String,
}

pub struct ScoreKeeper {
    boards: Vec<ScoreBoard>,
    leader_board: Vec<ScoreEntry>,
    board_name: String,
    current_index: usize,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl ScoreKeeper {
    pub fn new(rng: &mut Pcg32) -> Self {
        ScoreKeeper {
            boards: vec![],
            leader_board: default_board(rng),
            board_name: String::new(),
            current_index: LEADERBOARD_SIZE - 1,
        }
    }

    // ── Current run ──

    /// Start a new run: the bottom slot becomes ours, zeroed.
    pub fn reset_current(&mut self) {
        self.current_index = LEADERBOARD_SIZE - 1;
        self.leader_board[self.current_index] = ScoreEntry::anonymous();
    }

    /// Add to the current run. An increment of exactly 1 is a pickup and
    /// bumps the pickup counter; `ms_played` restamps the run length.
    pub fn add_to_current(&mut self, score: i32, ms_played: u32) {
        let e = &mut self.leader_board[self.current_index];
        e.score += score;
        if score == 1 {
            e.points += 1;
        }
        e.ms_played = ms_played;
        e.time = unix_now();
        self.sort_current_up();
    }

    pub fn current_score(&self) -> i32 {
        self.leader_board[self.current_index].score
    }

    pub fn high_score(&self) -> i32 {
        self.leader_board[0].score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_is_top_ten(&self) -> bool {
        self.current_index < LEADERBOARD_SIZE - 1
    }

    pub fn set_name_for_current(&mut self, name: &str) {
        self.leader_board[self.current_index].name = name.to_string();
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.leader_board
    }

    /// Bubble the current slot upward while it outscores its neighbor.
    /// One pass, O(k) swaps; a score only ever grows, so this keeps the
    /// board ordered.
    fn sort_current_up(&mut self) {
        if self.current_index == 0 {
            return;
        }
        let tmp = self.leader_board[self.current_index].clone();
        while self.current_index > 0 && tmp.score > self.leader_board[self.current_index - 1].score {
            self.leader_board[self.current_index] = self.leader_board[self.current_index - 1].clone();
            self.current_index -= 1;
        }
        self.leader_board[self.current_index] = tmp;
    }

    // ── Board selection ──

    /// Switch the active leaderboard (one per skill). Unknown names get
    /// a fresh default board registered on the spot.
    pub fn set_board(&mut self, name: &str, rng: &mut Pcg32) {
        self.sync_active_board();
        if let Some(b) = self.boards.iter().find(|b| b.name == name) {
            if let Some((_, entries)) = parse_board(&b.data) {
                self.leader_board = entries;
                pad_board(&mut self.leader_board);
            }
        } else {
            self.leader_board = default_board(rng);
            let data = board_to_string(&mut self.leader_board, name);
            self.boards.push(ScoreBoard {
                name: name.to_string(),
                data,
            });
        }
        self.board_name = name.to_string();
        self.current_index = LEADERBOARD_SIZE - 1;
    }

    pub fn board_name(&self) -> &str {
        &self.board_name
    }

    /// Write the active leaderboard back into its board record.
    fn sync_active_board(&mut self) {
        if self.board_name.is_empty() {
            return;
        }
        let data = board_to_string(&mut self.leader_board, &self.board_name);
        if let Some(b) = self.boards.iter_mut().find(|b| b.name == self.board_name) {
            b.data = data;
        } else {
            self.boards.push(ScoreBoard {
                name: self.board_name.clone(),
                data,
            });
        }
    }

    /// Install serialized board data (from disk or tests).
    pub fn add_board_data(&mut self, data: &str) {
        if let Some((name, _)) = parse_board(data) {
            if let Some(b) = self.boards.iter_mut().find(|b| b.name == name) {
                b.data = data.to_string();
            } else {
                self.boards.push(ScoreBoard {
                    name,
                    data: data.to_string(),
                });
            }
        }
    }

    // ── Persistence ──

    pub fn load(&mut self) {
        let path = score_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => {
                log::info!("no leaderboard file at {}", path.display());
                return;
            }
        };
        log::info!("loading leaderboard from {}", path.display());

        for line in content.lines() {
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("Version") {
                let version: u32 = rest.trim().parse().unwrap_or(0);
                if version != FORMAT_VERSION {
                    log::error!("wrong version {} in score file", version);
                    return;
                }
                continue;
            }
            self.add_board_data(line);
        }

        // Re-read the active board now that data is in.
        if !self.board_name.is_empty() {
            if let Some(b) = self.boards.iter().find(|b| b.name == self.board_name) {
                if let Some((_, entries)) = parse_board(&b.data) {
                    self.leader_board = entries;
                    pad_board(&mut self.leader_board);
                }
            }
        }
    }

    pub fn save(&mut self) -> Result<(), String> {
        self.sync_active_board();
        let path = score_path();
        log::info!("saving leaderboard to {}", path.display());

        let mut out = String::new();
        out.push_str("#------LeaderBoard-----#\n");
        out.push_str(&format!("Version {}\n", FORMAT_VERSION));
        for b in &self.boards {
            out.push_str(&b.data);
            out.push('\n');
        }
        std::fs::write(&path, out).map_err(|e| format!("leaderboard save failed: {e}"))
    }
}

// ── Board (de)serialization ──

fn default_board(rng: &mut Pcg32) -> Vec<ScoreEntry> {
    let start: usize = rng.random_range(0..DEFAULT_NAMES.len());
    let now = unix_now();
    let mut lb: Vec<ScoreEntry> = (0..LEADERBOARD_SIZE)
        .map(|i| ScoreEntry {
            name: DEFAULT_NAMES[(i + start) % DEFAULT_NAMES.len()].into(),
            score: 10 * i as i32,
            time: now,
            points: 0,
            ms_played: 0,
        })
        .collect();
    lb.sort_by(|a, b| b.score.cmp(&a.score));
    lb
}

/// Keep a deserialized board at the fixed size.
fn pad_board(lb: &mut Vec<ScoreEntry>) {
    lb.truncate(LEADERBOARD_SIZE);
    while lb.len() < LEADERBOARD_SIZE {
        lb.push(ScoreEntry::anonymous());
    }
}

fn board_to_string(lb: &mut [ScoreEntry], board_name: &str) -> String {
    let mut out = String::new();
    out.push_str(board_name);
    out.push(BOARD_SEP);
    for e in lb.iter_mut() {
        if e.name.is_empty() {
            e.name = "Anonymous".into();
        }
        out.push_str(&format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}",
            e.name,
            e.score,
            e.time,
            e.points,
            e.ms_played,
            sep = FIELD_SEP
        ));
    }
    out
}

fn parse_board(data: &str) -> Option<(String, Vec<ScoreEntry>)> {
    let mut toks = data.split([BOARD_SEP, FIELD_SEP]).filter(|t| !t.is_empty());
    let name = toks.next()?.to_string();

    let mut entries = vec![];
    while let Some(entry_name) = toks.next() {
        let score: i32 = toks.next()?.trim().parse().ok()?;
        let time: i64 = toks.next()?.trim().parse().ok()?;
        // Trailing fields are tolerated missing in older records.
        let points: u32 = toks.next().and_then(|t| t.trim().parse().ok()).unwrap_or(0);
        let ms_played: u32 = toks.next().and_then(|t| t.trim().parse().ok()).unwrap_or(0);
        entries.push(ScoreEntry {
            name: entry_name.to_string(),
            score,
            time,
            points,
            ms_played,
        });
    }

    // Should already be sorted, but better be safe.
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    Some((name, entries))
}

/// Directory for the score file: exe dir when writable, else XDG data
/// home, else the working directory.
fn score_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let probe = parent.join(".write_test_mazechase");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.join(SCORE_FILE);
            }
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mazechase");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg.join(SCORE_FILE);
        }
    }
    PathBuf::from(SCORE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(42)
    }

    /// A board of eleven zero-score entries, installed and active.
    fn zeroed_keeper() -> ScoreKeeper {
        let mut r = rng();
        let mut sk = ScoreKeeper::new(&mut r);
        let mut zeros: Vec<ScoreEntry> = (0..LEADERBOARD_SIZE)
            .map(|_| ScoreEntry {
                name: "Z".into(),
                score: 0,
                time: 0,
                points: 0,
                ms_played: 0,
            })
            .collect();
        let data = board_to_string(&mut zeros, "Test");
        sk.add_board_data(&data);
        sk.set_board("Test", &mut r);
        sk
    }

    #[test]
    fn runs_insert_in_order() {
        let mut sk = zeroed_keeper();
        for score in [5, 3, 9, 1] {
            sk.reset_current();
            sk.add_to_current(score, 0);
        }
        let top: Vec<i32> = sk.entries().iter().take(4).map(|e| e.score).collect();
        assert_eq!(top, vec![9, 5, 3, 1]);
        // The last run (score 1) is the current slot, relocated to rank 4.
        assert_eq!(sk.current_index(), 3);
    }

    #[test]
    fn current_slot_bubbles_up() {
        let mut sk = zeroed_keeper();
        sk.reset_current();
        assert_eq!(sk.current_index(), LEADERBOARD_SIZE - 1);

        sk.add_to_current(1, 100);
        assert_eq!(sk.current_index(), 0, "only scorer on a zeroed board");
        assert_eq!(sk.current_score(), 1);

        // Scoring while on top is a no-op for position.
        sk.add_to_current(10, 200);
        assert_eq!(sk.current_index(), 0);
        assert_eq!(sk.high_score(), 11);
    }

    #[test]
    fn pickup_counter_tracks_unit_scores() {
        let mut sk = zeroed_keeper();
        sk.reset_current();
        sk.add_to_current(1, 0);
        sk.add_to_current(1, 0);
        sk.add_to_current(100, 0);
        let e = &sk.entries()[sk.current_index()];
        assert_eq!(e.points, 2);
        assert_eq!(e.score, 102);
    }

    #[test]
    fn top_ten_detection() {
        let mut r = rng();
        let mut sk = ScoreKeeper::new(&mut r);
        sk.set_board("Normal", &mut r);
        sk.reset_current();
        // The default board's lowest ranked entry holds 10 points; beat
        // it to get off the last slot.
        assert!(!sk.current_is_top_ten());
        sk.add_to_current(15, 0);
        assert!(sk.current_is_top_ten());
    }

    #[test]
    fn board_string_round_trip() {
        let mut r = rng();
        let mut entries = default_board(&mut r);
        entries[3].name = "".into(); // exercises the Anonymous substitution
        let data = board_to_string(&mut entries, "Expert");
        let (name, parsed) = parse_board(&data).unwrap();
        assert_eq!(name, "Expert");
        assert_eq!(parsed, entries);
        // And a second trip is exact.
        let data2 = board_to_string(&mut parsed.clone(), "Expert");
        assert_eq!(data, data2);
    }

    #[test]
    fn switching_boards_keeps_scores_separate() {
        let mut r = rng();
        let mut sk = ScoreKeeper::new(&mut r);
        sk.set_board("Beginner", &mut r);
        sk.reset_current();
        sk.add_to_current(5000, 0);
        assert_eq!(sk.high_score(), 5000);

        sk.set_board("Expert", &mut r);
        assert!(sk.high_score() < 5000);

        sk.set_board("Beginner", &mut r);
        assert_eq!(sk.high_score(), 5000);
    }

    #[test]
    fn version_guard_rejects_unknown() {
        let mut r = rng();
        let mut sk = ScoreKeeper::new(&mut r);
        sk.set_board("Normal", &mut r);
        let before = sk.entries().to_vec();

        // Simulate the load loop on hostile content: the version check
        // short-circuits before any board line applies.
        let mut hit_version_guard = false;
        for line in ["#comment", "Version 3", "Evil\u{1}X\u{2}9999\u{2}0\u{2}0\u{2}0\u{2}"] {
            if line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("Version") {
                if rest.trim().parse::<u32>().unwrap_or(0) != FORMAT_VERSION {
                    hit_version_guard = true;
                    break;
                }
                continue;
            }
            sk.add_board_data(line);
        }
        assert!(hit_version_guard);
        assert_eq!(sk.entries(), &before[..]);
    }

    #[test]
    fn parse_tolerates_missing_trailing_fields() {
        let data = format!("Old{b}A{f}50{f}1234{f}", b = BOARD_SEP, f = FIELD_SEP);
        let (_, entries) = parse_board(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].score, 50);
        assert_eq!(entries[0].points, 0);
        assert_eq!(entries[0].ms_played, 0);
    }
}
