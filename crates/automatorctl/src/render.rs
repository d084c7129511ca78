//! Plain-text tables for the mirrored entities.

use std::fmt::Write as _;

use automator_core::display::{format_timestamp, since_last_cycle, since_last_task};
use automator_core::{Handle, ProcessEntity, RefreshMode, TaskEntity};
use chrono::{DateTime, Utc};

/// Shown wherever a timestamp is the "never" sentinel.
pub const PLACEHOLDER: &str = "-";

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0).max("NAME".len())
}

fn process_status(p: &ProcessEntity) -> String {
    if p.is_updating_status() {
        format!("{} (pending)", p.effective_status())
    } else {
        p.remote_status().to_string()
    }
}

fn task_status(t: &TaskEntity) -> String {
    if t.is_starting_instance() {
        "starting".to_owned()
    } else {
        t.remote_status().to_string()
    }
}

pub fn processes_table(processes: &[Handle<ProcessEntity>], now: DateTime<Utc>) -> String {
    let rows: Vec<ProcessEntity> = processes.iter().map(Handle::get).collect();
    let w = name_width(rows.iter().map(ProcessEntity::name));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<w$}  {:<18}  {:>9}  {:>6}  LAST CYCLE",
        "NAME", "STATUS", "CYCLE (s)", "CYCLES"
    );
    for p in &rows {
        let _ = writeln!(
            out,
            "{:<w$}  {:<18}  {:>9}  {:>6}  {}",
            p.name(),
            process_status(p),
            p.cycle_time_seconds(),
            p.cycles_completed(),
            since_last_cycle(p.last_cycle_at(), now, PLACEHOLDER),
        );
    }
    out
}

pub fn tasks_table(tasks: &[Handle<TaskEntity>], now: DateTime<Utc>) -> String {
    let rows: Vec<TaskEntity> = tasks.iter().map(Handle::get).collect();
    let w = name_width(rows.iter().map(TaskEntity::name));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<w$}  {:<9}  {:>8}  {:<29}  LAST RUN",
        "NAME", "STATUS", "DURATION", "STARTED"
    );
    for t in &rows {
        let _ = writeln!(
            out,
            "{:<w$}  {:<9}  {:>8}  {:<29}  {}",
            t.name(),
            task_status(t),
            t.duration_seconds(),
            format_timestamp(t.started_at(), PLACEHOLDER),
            since_last_task(t, now, PLACEHOLDER),
        );
    }
    out
}

pub fn mode_line(mode: RefreshMode, now: DateTime<Utc>) -> String {
    format!("[{}] {}", mode.label(), now.format("%H:%M:%S"))
}
