use std::path::PathBuf;

use cheongyak::config::AppConfig;
use cheongyak::error::AppError;
use cheongyak::notices::{UserProfile, WeekClock};
use cheongyak::strategy::StrategyFailure;
use cheongyak::telemetry;
use chrono::NaiveDate;
use clap::Args;
use tracing::warn;

use crate::infra::{build_service, parse_date, LiveService};

#[derive(Args, Debug, Default)]
pub(crate) struct CalendarArgs {
    /// Write the feed to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Treat this date (YYYY-MM-DD) as today when picking the week
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StrategyArgs {
    /// The applicant owns no home
    #[arg(long)]
    pub(crate) homeless: bool,
    /// The applicant is married
    #[arg(long)]
    pub(crate) married: bool,
    /// Years since marriage
    #[arg(long, default_value_t = 0)]
    pub(crate) marriage_years: i32,
    /// Number of children
    #[arg(long = "children", default_value_t = 0)]
    pub(crate) children_count: i32,
    /// The applicant is the head of household
    #[arg(long)]
    pub(crate) householder: bool,
    /// The applicant holds a subscription savings account
    #[arg(long)]
    pub(crate) has_account: bool,
    /// The applicant has owned a home before
    #[arg(long)]
    pub(crate) house_history: bool,
    /// Treat this date (YYYY-MM-DD) as today when picking the week
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

impl StrategyArgs {
    pub(crate) fn profile(&self) -> UserProfile {
        UserProfile {
            is_homeless: self.homeless,
            is_married: self.married,
            marriage_years: self.marriage_years,
            children_count: self.children_count,
            is_householder: self.householder,
            has_account: self.has_account,
            has_house_history: self.house_history,
        }
    }
}

fn prepare(today: Option<NaiveDate>) -> Result<LiveService, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let service = build_service(&config)?;
    Ok(match today {
        Some(date) => service.with_clock(WeekClock::pinned(date)),
        None => service,
    })
}

pub(crate) async fn run_calendar(args: CalendarArgs) -> Result<(), AppError> {
    let service = prepare(args.today)?;
    let (body, weekly) = service.calendar().await;

    if !weekly.failures.is_empty() {
        warn!(sources = ?weekly.failed_sources(), "calendar is missing failed sources");
    }

    match args.output {
        Some(path) => {
            std::fs::write(&path, body)?;
            eprintln!(
                "Wrote {} notices for {} ~ {} to {}",
                weekly.notices.len(),
                weekly.week.start,
                weekly.week.end,
                path.display()
            );
        }
        None => print!("{body}"),
    }
    Ok(())
}

pub(crate) async fn run_strategy(args: StrategyArgs) -> Result<(), AppError> {
    let service = prepare(args.today)?;
    let outcome = service.strategy(&args.profile()).await;

    if !outcome.failures.is_empty() {
        warn!(
            sources = ?outcome.failures.iter().map(|f| f.source).collect::<Vec<_>>(),
            "recommendation is missing failed sources"
        );
    }

    let rendered = match &outcome.result {
        Ok(recommendation) => serde_json::to_string_pretty(recommendation)?,
        Err(error) => serde_json::to_string_pretty(&StrategyFailure::from(error))?,
    };
    println!("{rendered}");
    Ok(())
}
