use chrono::{Local, NaiveDateTime, NaiveTime};
use serde::Serialize;

use reelay_core::{JsonLedgerStore, LedgerStore, QuietWindow, SourceMode};

use crate::{
    AppContext, AppError, DisplayFallback, LedgerForgetArgs, LedgerListArgs, Result,
    ScheduleCheckArgs,
};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub node_name: String,
    pub environment: String,
    pub source_mode: &'static str,
    pub quiet_window: String,
    pub quiet_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_active: Option<String>,
    pub ledger_path: String,
    pub ledger_entries: usize,
}

impl DisplayFallback for StatusReport {
    fn display(&self) -> String {
        vec![
            format!("Node: {} (env: {})", self.node_name, self.environment),
            format!("Source: {}", self.source_mode),
            match &self.next_active {
                Some(wake) => format!(
                    "Quiet window: {} (currently quiet, active again at {wake})",
                    self.quiet_window
                ),
                None => format!("Quiet window: {} (currently active)", self.quiet_window),
            },
            format!(
                "Ledger: {} entries at {}",
                self.ledger_entries, self.ledger_path
            ),
        ]
        .join("\n")
    }
}

pub async fn status(context: &AppContext) -> Result<StatusReport> {
    let reelay = &context.bundle.reelay;
    let schedule = &reelay.schedule;
    let window = QuietWindow::parse(&schedule.quiet_start, &schedule.quiet_end)?;
    let ledger_path = reelay.ledger_path();
    let used = JsonLedgerStore::new(&ledger_path).load().await?;
    let now = Local::now().naive_local();
    let quiet_now = window.is_quiet(now);

    Ok(StatusReport {
        node_name: reelay.system.node_name.clone(),
        environment: reelay.system.environment.clone(),
        source_mode: match reelay.source.mode {
            SourceMode::Shorts => "shorts",
            SourceMode::Archive => "archive",
        },
        quiet_window: format!("{}-{}", schedule.quiet_start, schedule.quiet_end),
        quiet_now,
        next_active: quiet_now
            .then(|| window.wake_time(now).format("%Y-%m-%dT%H:%M").to_string()),
        ledger_path: ledger_path.display().to_string(),
        ledger_entries: used.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct LedgerList {
    pub total: usize,
    pub ids: Vec<String>,
}

impl DisplayFallback for LedgerList {
    fn display(&self) -> String {
        if self.ids.is_empty() {
            return "ledger is empty".to_string();
        }
        let mut lines: Vec<String> = self.ids.clone();
        if self.ids.len() < self.total {
            lines.push(format!("... {} more", self.total - self.ids.len()));
        }
        lines.join("\n")
    }
}

pub async fn ledger_list(context: &AppContext, args: &LedgerListArgs) -> Result<LedgerList> {
    let store = JsonLedgerStore::new(context.bundle.reelay.ledger_path());
    let used = store.load().await?;
    Ok(LedgerList {
        total: used.len(),
        ids: used.iter().take(args.limit).map(str::to_string).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct LedgerForgetResult {
    pub id: String,
    pub remaining: usize,
}

impl DisplayFallback for LedgerForgetResult {
    fn display(&self) -> String {
        format!("forgot {} ({} entries remain)", self.id, self.remaining)
    }
}

pub async fn ledger_forget(
    context: &AppContext,
    args: &LedgerForgetArgs,
) -> Result<LedgerForgetResult> {
    let store = JsonLedgerStore::new(context.bundle.reelay.ledger_path());
    let mut used = store.load().await?;
    if !used.remove(&args.id) {
        return Err(AppError::MissingResource(format!(
            "id {} not in ledger",
            args.id
        )));
    }
    store.record(&used).await?;
    Ok(LedgerForgetResult {
        id: args.id.clone(),
        remaining: used.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct ScheduleReport {
    pub at: String,
    pub quiet: bool,
    pub next_active: String,
}

impl DisplayFallback for ScheduleReport {
    fn display(&self) -> String {
        if self.quiet {
            format!("{}: quiet, next active at {}", self.at, self.next_active)
        } else {
            format!("{}: active", self.at)
        }
    }
}

pub fn schedule_check(context: &AppContext, args: &ScheduleCheckArgs) -> Result<ScheduleReport> {
    let schedule = &context.bundle.reelay.schedule;
    let window = QuietWindow::parse(&schedule.quiet_start, &schedule.quiet_end)?;
    let at = match &args.at {
        Some(raw) => parse_instant(raw)?,
        None => Local::now().naive_local(),
    };
    Ok(ScheduleReport {
        at: at.format("%Y-%m-%dT%H:%M").to_string(),
        quiet: window.is_quiet(at),
        next_active: window.wake_time(at).format("%Y-%m-%dT%H:%M").to_string(),
    })
}

fn parse_instant(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Ok(at);
    }
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Ok(Local::now().date_naive().and_time(time));
    }
    Err(AppError::InvalidArgument(format!(
        "{raw}: expected HH:MM or YYYY-MM-DDTHH:MM"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instants_parse_in_both_forms() {
        let full = parse_instant("2026-08-20T23:15").unwrap();
        assert_eq!(full.format("%H:%M").to_string(), "23:15");

        let today = parse_instant("07:45").unwrap();
        assert_eq!(today.date(), Local::now().date_naive());
        assert_eq!(today.format("%H:%M").to_string(), "07:45");

        assert!(parse_instant("next tuesday").is_err());
    }
}
