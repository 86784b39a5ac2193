use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

use stylecast::config::ForecastProvider;
use stylecast::forecast::{self, LocationQuery};
use stylecast::regions;
use stylecast::session::{Gender, PersonalColor, QUICK_PROMPTS, StylePreference};
use stylecast::{Advisor, SessionContext, StyleConfig, StyleError, TurnError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Weather-aware outfit advice", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List catalogue regions, or the districts of one region.
    Regions { region: Option<String> },
    /// Show the condensed forecast for a location and date.
    Forecast {
        #[command(flatten)]
        target: TargetArgs,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the stylist, once with --message or interactively.
    Chat {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Single message to answer, then exit
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Catalogue region (e.g. 서울, busan)
    #[arg(long)]
    region: Option<String>,
    /// District within the region, or 전체
    #[arg(long, requires = "region")]
    district: Option<String>,
    /// Free-form location: coordinates or a place name
    #[arg(long, conflicts_with = "region")]
    location: Option<String>,
    /// Target date (YYYY-MM-DD), today through five days ahead
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Forecast provider override (kma, openweathermap)
    #[arg(long)]
    provider: Option<ForecastProvider>,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    gender: Option<Gender>,
    /// Age band, e.g. 20대
    #[arg(long)]
    age: Option<String>,
    #[arg(long)]
    height: Option<u16>,
    #[arg(long)]
    weight: Option<u16>,
    #[arg(long)]
    style: Option<StylePreference>,
    /// Time, place and occasion
    #[arg(long)]
    tpo: Option<String>,
    /// Preferred or avoided colours
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    personal_color: Option<PersonalColor>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StyleConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    stylecast::logging::init(&config.logging, cli.verbose)?;
    debug!("stylecast {} starting with command: {:?}", stylecast::VERSION, cli.command);

    match cli.command {
        Commands::Regions { region } => list_regions(region.as_deref()),
        Commands::Forecast { target, json } => {
            if let Some(provider) = target.provider {
                config.forecast.provider = provider;
            }
            let tz = config.timezone()?;
            let now = local_now(tz);
            let mut session = SessionContext::new(now.date());
            if let Err(e) = apply_target(&mut session, &target, now.date()) {
                fail(&e);
            }
            match show_forecast(&config, &session, now, json).await {
                Ok(()) => Ok(()),
                Err(e) => fail(&e),
            }
        }
        Commands::Chat {
            target,
            profile,
            message,
        } => {
            if let Some(provider) = target.provider {
                config.forecast.provider = provider;
            }
            let tz = config.timezone()?;
            let today = local_now(tz).date();
            let mut session = SessionContext::new(today);
            if let Err(e) = apply_target(&mut session, &target, today) {
                fail(&e);
            }
            apply_profile(&mut session, profile);

            match message {
                Some(message) => {
                    let mut slot = None;
                    if !run_turn(&mut slot, &config, &mut session, &message, tz).await {
                        std::process::exit(1);
                    }
                    Ok(())
                }
                None => repl(&config, session, tz).await,
            }
        }
    }
}

fn local_now(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

fn fail(err: &StyleError) -> ! {
    error!(kind = %err.kind(), "{}", err);
    eprintln!("❌ {}", err.user_message());
    std::process::exit(1)
}

fn list_regions(region: Option<&str>) -> Result<()> {
    match region {
        Some(name) => match regions::districts(name) {
            Ok(districts) => {
                for district in districts {
                    println!("{district}");
                }
                Ok(())
            }
            Err(e) => fail(&e),
        },
        None => {
            for region in regions::regions() {
                println!(
                    "{} ({}): {}",
                    region.name,
                    region.alias,
                    regions::district_names(region).join(", ")
                );
            }
            Ok(())
        }
    }
}

fn apply_target(
    session: &mut SessionContext,
    target: &TargetArgs,
    today: NaiveDate,
) -> stylecast::Result<()> {
    if let Some(location) = &target.location {
        session.set_location(LocationQuery::parse(location)?)?;
    } else if let Some(region) = &target.region {
        session.select_location(region, target.district.as_deref())?;
    }
    if let Some(date) = target.date {
        session.set_target_date(date, today)?;
    }
    Ok(())
}

fn apply_profile(session: &mut SessionContext, args: ProfileArgs) {
    let profile = &mut session.profile;
    if let Some(gender) = args.gender {
        profile.gender = gender;
    }
    if let Some(age) = args.age {
        profile.age = age;
    }
    if args.height.is_some() {
        profile.height_cm = args.height;
    }
    if args.weight.is_some() {
        profile.weight_kg = args.weight;
    }
    if let Some(style) = args.style {
        profile.style = style;
    }
    if let Some(tpo) = args.tpo {
        profile.tpo = tpo;
    }
    if args.color.is_some() {
        profile.color_preference = args.color;
    }
    if let Some(personal_color) = args.personal_color {
        profile.personal_color = personal_color;
    }
}

async fn show_forecast(
    config: &StyleConfig,
    session: &SessionContext,
    now: NaiveDateTime,
    json: bool,
) -> stylecast::Result<()> {
    let source = forecast::from_config(config)?;
    let summary = forecast::summarize(
        source.as_ref(),
        session.location(),
        session.target_date(),
        now,
        &config.normalizer,
    )
    .await?;

    if json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| StyleError::validation(format!("Failed to render summary: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{summary}");
    }
    Ok(())
}

/// Run one turn, building the advisor on first use. Returns whether it succeeded.
async fn run_turn(
    slot: &mut Option<Advisor>,
    config: &StyleConfig,
    session: &mut SessionContext,
    message: &str,
    tz: Tz,
) -> bool {
    if slot.is_none() {
        match Advisor::from_config(config.clone()) {
            Ok(advisor) => *slot = Some(advisor),
            Err(e) => {
                error!(kind = %e.kind(), "{}", e);
                eprintln!("❌ {}", e.user_message());
                return false;
            }
        }
    }
    let Some(advisor) = slot.as_ref() else {
        return false;
    };

    let mut stdout_sink = |fragment: &str| {
        print!("{fragment}");
        let _ = std::io::stdout().flush();
    };
    match advisor
        .handle_turn(session, message, local_now(tz), &mut stdout_sink)
        .await
    {
        Ok(reply) => {
            println!();
            info!("Answered with {} characters", reply.answer.chars().count());
            true
        }
        Err(e) => {
            report_turn_error(&e);
            false
        }
    }
}

fn report_turn_error(err: &TurnError) {
    error!(kind = %err.kind(), "Turn failed: {}", err);
    eprintln!("❌ {}", err.user_message());
}

const HELP: &str = "\
Commands:
  /date YYYY-MM-DD         dress for another day (up to 5 days ahead)
  /region <region> [dist]  pick a catalogue region and district
  /location <place>        use coordinates or a place name
  /quick <1-3>             ask a canned question
  /profile                 show the current profile
  /help                    show this help
  /quit                    leave";

async fn repl(config: &StyleConfig, mut session: SessionContext, tz: Tz) -> Result<()> {
    for message in session.history() {
        println!("{}", message.content);
    }
    println!("{HELP}");
    for (i, prompt) in QUICK_PROMPTS.iter().enumerate() {
        println!("  {}. {prompt}", i + 1);
    }

    let mut advisor = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let today = local_now(tz).date();

        let outcome: stylecast::Result<Option<String>> = match command {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{HELP}");
                Ok(None)
            }
            "/profile" => {
                print!("{}", stylecast::prompt::profile_text(&session.profile));
                println!("- 날짜: {}", session.target_date());
                Ok(None)
            }
            "/date" => rest
                .parse::<NaiveDate>()
                .map_err(|_| StyleError::validation(format!("'{rest}' is not a YYYY-MM-DD date")))
                .and_then(|date| session.set_target_date(date, today))
                .map(|()| None),
            "/region" => {
                let mut words = rest.split_whitespace();
                match words.next() {
                    Some(region) => {
                        let district = words.collect::<Vec<_>>().join(" ");
                        let district = (!district.is_empty()).then_some(district);
                        session
                            .select_location(region, district.as_deref())
                            .map(|()| None)
                    }
                    None => Err(StyleError::validation("Usage: /region <region> [district]")),
                }
            }
            "/location" => LocationQuery::parse(rest)
                .and_then(|query| session.set_location(query))
                .map(|()| None),
            "/quick" => rest
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| StyleError::validation("Usage: /quick <1-3>"))
                .and_then(|index| session.apply_quick_prompt(index))
                .map(|prompt| Some(prompt.to_string())),
            _ if command.starts_with('/') => Err(StyleError::validation(format!(
                "Unknown command '{command}'. Type /help for commands."
            ))),
            _ => Ok(Some(line.to_string())),
        };

        match outcome {
            Ok(Some(message)) => {
                run_turn(&mut advisor, config, &mut session, &message, tz).await;
            }
            Ok(None) => {}
            Err(e) => eprintln!("❌ {}", e.user_message()),
        }
    }
    Ok(())
}
