//! Deterministic replay of recorded contact traces.
//!
//! A trace is a CSV file with one report per line:
//!
//! ```text
//! touch_contacts,ms,count,id0,x0,y0,tip0,id1,x1,y1,tip1,...
//! ```
//!
//! `count` is the number of contact groups that follow; `touch_contacts,ms,0`
//! is the all-fingers-lifted report. Blank lines, `#` comments and lines with
//! another tag in the first column are ignored.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use crate::config::{Tunables, TunablesSource};
use crate::gesture::{GestureEngine, FAILSAFE_PERIOD_MS, INERTIA_TICK_US};
use crate::io::{EngineOutput, PointerCommand, SharedRecorder};
use crate::runtime::GestureRuntime;
use crate::touch::Contact;

pub const TRACE_TAG: &str = "touch_contacts";
pub const TRACE_HEADER: &str = "touch_contacts,ms,count,contacts";
/// Virtual time simulated after the last report so pending cancellations and
/// coasting can finish.
pub const REPLAY_TAIL_MS: u64 = 3_000;

const FIELDS_PER_CONTACT: usize = 4;
const TICKS_PER_MS: u64 = 1_000 / INERTIA_TICK_US;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("line {line}: timestamp {ms} is before previous report at {previous}")]
    OutOfOrder { line: usize, ms: u64, previous: u64 },
}

impl ReplayError {
    fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceReport {
    pub line: usize,
    pub at_ms: u64,
    pub contacts: Vec<Contact>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayRecord {
    pub t_ms: u64,
    pub command: PointerCommand,
}

pub fn read_trace(path: &Path) -> Result<Vec<TraceReport>, ReplayError> {
    let text = fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(&text)
}

pub fn parse_trace(text: &str) -> Result<Vec<TraceReport>, ReplayError> {
    let mut reports: Vec<TraceReport> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == TRACE_HEADER {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts[0] != TRACE_TAG {
            continue;
        }
        if parts.len() < 3 {
            return Err(ReplayError::parse(
                line,
                "expected at least 3 columns (tag, ms, count)",
            ));
        }

        let at_ms = parse_field::<u64>(parts[1], line, "ms")?;
        let count = parse_field::<usize>(parts[2], line, "count")?;
        let groups = &parts[3..];
        if groups.len() != count * FIELDS_PER_CONTACT {
            return Err(ReplayError::parse(
                line,
                format!(
                    "count={} needs {} contact columns, found {}",
                    count,
                    count * FIELDS_PER_CONTACT,
                    groups.len()
                ),
            ));
        }

        let contacts = groups
            .chunks_exact(FIELDS_PER_CONTACT)
            .map(|group| -> Result<Contact, ReplayError> {
                Ok(Contact::new(
                    parse_field::<u32>(group[0], line, "id")?,
                    parse_field::<i32>(group[1], line, "x")?,
                    parse_field::<i32>(group[2], line, "y")?,
                    parse_tip(group[3], line)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(previous) = reports.last().map(|r| r.at_ms) {
            if at_ms < previous {
                return Err(ReplayError::OutOfOrder {
                    line,
                    ms: at_ms,
                    previous,
                });
            }
        }

        reports.push(TraceReport {
            line,
            at_ms,
            contacts,
        });
    }
    Ok(reports)
}

/// Expected command kinds, one per line (`down`, `move`, `up`).
pub fn parse_expected_kinds(text: &str) -> Result<Vec<&'static str>, ReplayError> {
    let mut kinds = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let token = raw.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        let kind = match token.to_ascii_lowercase().as_str() {
            "down" => "down",
            "move" => "move",
            "up" => "up",
            _ => {
                return Err(ReplayError::parse(
                    idx + 1,
                    format!("invalid expected kind: {token}"),
                ))
            }
        };
        kinds.push(kind);
    }
    Ok(kinds)
}

/// Runs `reports` through a fresh engine on a virtual clock: failsafe ticks
/// every 50 ms and inertia ticks at their real rate while coasting.
pub fn replay(reports: &[TraceReport], tunables: &Tunables) -> Vec<ReplayRecord> {
    let Some(first) = reports.first() else {
        return Vec::new();
    };

    let mut clock = VirtualClock {
        engine: GestureEngine::new(),
        tunables,
        now_ms: first.at_ms,
        next_failsafe_ms: first.at_ms + FAILSAFE_PERIOD_MS,
        records: Vec::new(),
    };

    for report in reports {
        clock.advance_to(report.at_ms);
        let output = clock
            .engine
            .process_report(report.at_ms, &report.contacts, tunables);
        clock.record(report.at_ms, &output);
    }

    let end_ms = clock.now_ms.saturating_add(REPLAY_TAIL_MS);
    clock.advance_to(end_ms);
    log::debug!(
        "replay: done reports={} commands={} end_ms={}",
        reports.len(),
        clock.records.len(),
        end_ms
    );
    clock.records
}

struct VirtualClock<'a> {
    engine: GestureEngine,
    tunables: &'a Tunables,
    now_ms: u64,
    next_failsafe_ms: u64,
    records: Vec<ReplayRecord>,
}

impl VirtualClock<'_> {
    fn advance_to(&mut self, target_ms: u64) {
        while self.now_ms < target_ms {
            let coasting = self.engine.is_coasting();
            self.now_ms = if coasting {
                self.now_ms + 1
            } else {
                self.next_failsafe_ms.min(target_ms)
            };

            if coasting {
                for _ in 0..TICKS_PER_MS {
                    if !self.engine.is_coasting() {
                        break;
                    }
                    let output = self.engine.inertia_tick(self.tunables);
                    self.record(self.now_ms, &output);
                }
            }

            if self.now_ms == self.next_failsafe_ms {
                let output = self.engine.failsafe_tick(self.now_ms, self.tunables);
                self.record(self.now_ms, &output);
                self.next_failsafe_ms += FAILSAFE_PERIOD_MS;
            }
        }
    }

    fn record(&mut self, t_ms: u64, output: &EngineOutput) {
        self.records.extend(output.iter().map(|command| ReplayRecord {
            t_ms,
            command: *command,
        }));
    }
}

/// Feeds `reports` to a threaded runtime in real time and returns what the
/// pointer received.
pub fn replay_realtime(
    reports: &[TraceReport],
    tunables: Arc<dyn TunablesSource>,
) -> io::Result<Vec<PointerCommand>> {
    let recorder = SharedRecorder::new();
    let mut runtime = GestureRuntime::start(recorder.clone(), tunables)?;
    let sender = runtime.sender();

    let mut last_ms = reports.first().map_or(0, |r| r.at_ms);
    for report in reports {
        thread::sleep(Duration::from_millis(report.at_ms.saturating_sub(last_ms)));
        last_ms = report.at_ms;
        sender.submit(report.contacts.clone());
    }
    thread::sleep(Duration::from_millis(REPLAY_TAIL_MS));
    runtime.shutdown();

    Ok(recorder.snapshot().commands)
}

fn parse_field<T>(raw: &str, line: usize, field: &str) -> Result<T, ReplayError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ReplayError::parse(line, format!("invalid {field} '{raw}': {e}")))
}

fn parse_tip(raw: &str, line: usize) -> Result<bool, ReplayError> {
    match raw {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ReplayError::parse(line, format!("invalid tip '{raw}'"))),
    }
}
