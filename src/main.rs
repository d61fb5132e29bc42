use std::{io, path::PathBuf, process::ExitCode};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use log::{info, warn};
use schedula::{
    api::{ReqwestTransport, SchedulaClient},
    config::FileConfig,
    confirm::confirm,
    export::{
        fixture_records, push_results, read_csv, read_people, stale_check, write_csv,
        FixtureRecord, PushRow,
    },
    hierarchy::DateWindow,
    schema::FixtureId,
};
use schedula_utils::{
    credentials::Credentials,
    fs_json_util::{read_json, read_toml},
};

#[derive(Parser)]
struct Opts {
    /// TOML file with connection defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON file with `username` and `password`.
    #[arg(long)]
    credentials: Option<PathBuf>,
    /// Log in as this user and ask for the password.
    #[arg(short, long)]
    username: Option<String>,
    /// HTTP proxy, e.g. `http://127.0.0.1:8080`.
    #[arg(short = 'x', long)]
    proxy: Option<String>,
    #[command(subcommand)]
    sub: Sub,
}

#[derive(Clone, Subcommand)]
enum Sub {
    /// Export every fixture of a season.
    PullAll(PullAll),
    /// Export the fixtures of the next days.
    PullN(PullN),
    /// Export the officials of a season.
    PullPeople(PullPeople),
    /// Apply the appointments of a push file.
    Push(Push),
}

#[derive(Clone, Args)]
struct PullAll {
    /// Season label, e.g. `2020`.
    #[arg(short, long)]
    season: Option<String>,
    #[arg(short, long)]
    output: PathBuf,
    /// Also export the officials to this file.
    #[arg(short, long)]
    people: Option<PathBuf>,
}

#[derive(Clone, Args)]
struct PullN {
    #[arg(short = 'n', long, default_value_t = 28)]
    days: u64,
    /// First day, `YYYY-MM-DD`.  Defaults to today.
    #[arg(short = 'N', long)]
    start: Option<NaiveDate>,
    #[arg(short, long)]
    season: Option<String>,
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Clone, Args)]
struct PullPeople {
    #[arg(short, long)]
    season: Option<String>,
    /// Only this panel instead of all of them.
    #[arg(long)]
    panel: Option<String>,
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Clone, Args)]
struct Push {
    /// Fixtures file the push file was prepared from.
    #[arg(short = 'f', long)]
    stored: PathBuf,
    /// Desired appointments.
    #[arg(short, long)]
    input: PathBuf,
    /// Officials file.
    #[arg(short = 'o', long)]
    people: PathBuf,
    /// Where to write the result of every fixture.
    #[arg(long)]
    results: Option<PathBuf>,
}

fn credentials(opts: &Opts, config: &FileConfig) -> anyhow::Result<Credentials> {
    if let Some(username) = &opts.username {
        let password = inquire::Password::new("Password:")
            .without_confirmation()
            .prompt()
            .context("Failed to read the password")?;
        return Ok(Credentials::builder()
            .username(username.clone().into())
            .password(password.into())
            .build());
    }
    match opts.credentials.as_ref().or(config.credentials_path.as_ref()) {
        Some(path) => read_json(path),
        None => bail!("Either --username or a credentials file is required"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let opts = Opts::parse();

    let config: FileConfig = match &opts.config {
        Some(path) => read_toml(path)?,
        None => FileConfig::default(),
    };
    let credentials = credentials(&opts, &config)?;
    let session = config.session(opts.proxy.clone());
    let client = SchedulaClient::new(ReqwestTransport::new(&session)?, &session.base_url)?;
    client.login(&credentials).await?;

    let default_season = config.season.clone();
    match opts.sub {
        Sub::PullAll(sub) => {
            let season = sub.season.or(default_season);
            let pulled = client.pull_all(season.as_deref()).await?;
            write_csv(&sub.output, &fixture_records(&pulled))?;
            info!("Saved {} fixture(s) to {:?}", pulled.len(), sub.output);
            if let Some(path) = sub.people {
                let people = client.officials_roster(season.as_deref(), None).await?;
                write_csv(&path, &people)?;
                info!("Saved {} official(s) to {path:?}", people.len());
            }
        }
        Sub::PullN(sub) => {
            let start = sub
                .start
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            let season = sub.season.or(default_season);
            let window = DateWindow::new(start, sub.days)?;
            let pulled = client.pull_window(window, season.as_deref()).await?;
            write_csv(&sub.output, &fixture_records(&pulled))?;
            info!("Saved {} fixture(s) to {:?}", pulled.len(), sub.output);
        }
        Sub::PullPeople(sub) => {
            let season = sub.season.or(default_season);
            let people = client
                .officials_roster(season.as_deref(), sub.panel.as_deref())
                .await?;
            write_csv(&sub.output, &people)?;
            info!("Saved {} official(s) to {:?}", people.len(), sub.output);
        }
        Sub::Push(sub) => {
            let exported: Vec<FixtureRecord> = read_csv(&sub.stored)?;
            let rows: Vec<PushRow> = read_csv(&sub.input)?;
            let people = read_people(&sub.people)?;

            let mut desired = vec![];
            for row in &rows {
                let fixture = FixtureId::from(row.fixture_id.trim());
                let live = client.lookup_appointments(&fixture).await?.records;
                match stale_check(row, &exported, &live) {
                    Ok(()) => desired.push(row.desired()),
                    Err(reason) => warn!("Withholding fixture {fixture}: {reason}"),
                }
            }
            if desired.is_empty() {
                println!("Nothing to push.");
                return Ok(ExitCode::SUCCESS);
            }
            println!(
                "About to update {} fixture(s): {}",
                desired.len(),
                desired.iter().map(|d| &d.fixture_id).format(", ")
            );
            let answer = confirm(io::stdin().lock(), io::stdout())?;
            if let Some(code) = answer.exit_code() {
                return Ok(ExitCode::from(code));
            }

            let report = client.push_appointments(&desired, &people).await?;
            for (fixture, outcome) in &report.outcomes {
                println!("{fixture}: {outcome}");
            }
            if let Some(path) = sub.results {
                write_csv(&path, &push_results(&report))?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
