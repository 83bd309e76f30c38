//! Command-line resource finder. Loads the feed once, resolves one query and
//! prints the nearest matches.
//!
//! ```text
//! find_food [--file PATH | --url BASE] [--near LAT,LNG] [--limit N]
//!           [--select LABEL | --chat TEXT | QUERY...]
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use feedla_discovery::config::DiscoveryConfig;
use feedla_discovery::controller::{DiscoveryController, Notice, ViewSettings};
use feedla_discovery::geo::GeoPoint;
use feedla_discovery::ingest::{
    self,
    providers::{FixtureFeedProvider, HttpFeedProvider},
    types::FeedProvider,
};
use feedla_discovery::intent::{find_option, CHAT_OPTIONS};
use feedla_discovery::locate::{resolve_location, StaticLocation};
use feedla_discovery::telemetry;

enum Query {
    Menu,
    Select(String),
    Chat(String),
    Search(String),
}

struct Args {
    file: Option<PathBuf>,
    url: Option<String>,
    near: Option<GeoPoint>,
    limit: Option<usize>,
    query: Query,
}

fn parse_point(raw: &str) -> Result<GeoPoint> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("--near expects LAT,LNG"))?;
    let p = GeoPoint::new(
        lat.trim().parse().context("--near latitude")?,
        lng.trim().parse().context("--near longitude")?,
    );
    if !p.is_finite() {
        bail!("--near must be finite");
    }
    Ok(p)
}

fn parse_args(raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        file: None,
        url: None,
        near: None,
        limit: None,
        query: Query::Menu,
    };
    let mut words = Vec::new();
    let mut it = raw;
    while let Some(a) = it.next() {
        let mut value = |flag: &str| it.next().ok_or_else(|| anyhow!("{flag} needs a value"));
        match a.as_str() {
            "--file" => args.file = Some(PathBuf::from(value("--file")?)),
            "--url" => args.url = Some(value("--url")?),
            "--near" => args.near = Some(parse_point(&value("--near")?)?),
            "--limit" => args.limit = Some(value("--limit")?.parse().context("--limit")?),
            "--select" => args.query = Query::Select(value("--select")?),
            "--chat" => args.query = Query::Chat(value("--chat")?),
            other if other.starts_with("--") => bail!("unknown flag {other}"),
            _ => words.push(a),
        }
    }
    if !words.is_empty() {
        args.query = Query::Search(words.join(" "));
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing("warn");

    let args = parse_args(std::env::args().skip(1))?;
    if let Query::Menu = args.query {
        println!("What are you looking for?");
        for opt in CHAT_OPTIONS {
            println!("  --select \"{}\"", opt.label);
        }
        return Ok(());
    }
    if let Query::Select(label) = &args.query {
        if find_option(label).is_none() {
            bail!("unknown option {label:?}");
        }
    }

    let cfg = DiscoveryConfig::load_default()?;
    let provider: Box<dyn FeedProvider> = match (&args.file, &args.url) {
        (Some(path), _) => Box::new(FixtureFeedProvider::from_path(path)?),
        (None, Some(url)) => Box::new(HttpFeedProvider::new(url, cfg.feed_timeout())?),
        (None, None) => Box::new(HttpFeedProvider::new(&cfg.feed_base_url, cfg.feed_timeout())?),
    };

    let mut settings = ViewSettings::from(&cfg);
    if let Some(limit) = args.limit {
        settings.result_limit = limit.max(1);
    }
    let mut ctl = DiscoveryController::new(settings);

    let here = StaticLocation(args.near);
    let (feed, located) = tokio::join!(
        ingest::load_resources(provider.as_ref()),
        resolve_location(&here, cfg.geolocation_timeout()),
    );
    ctl.on_feed(feed);
    ctl.on_geolocation(located.point());

    match &args.query {
        Query::Select(label) => {
            if let Some(turn) = ctl.select_chat_option(label) {
                println!("{}", turn.reply);
            }
        }
        Query::Chat(text) => {
            if let Some(turn) = ctl.submit_chat_text(text) {
                println!("{}", turn.reply);
            }
        }
        Query::Search(text) => {
            ctl.search_text(text);
        }
        Query::Menu => {}
    }

    let view = ctl.view();
    match &view.notice {
        Some(Notice::ResourcesUnavailable { message }) => bail!("{message}"),
        Some(Notice::NoMatches { message, .. }) => println!("{message}"),
        _ => {}
    }
    for (i, r) in view.results.iter().enumerate() {
        println!(
            "{:>2}. {:<40} {:>6.2} km  [{}]  {}",
            i + 1,
            r.resource.name,
            r.distance_km,
            r.resource.category,
            r.resource.address
        );
    }
    Ok(())
}
