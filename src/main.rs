use std::env::args;
use std::str::FromStr;
use std::string::ToString;

use strum::IntoEnumIterator;
use strum_macros::{self, Display, EnumIter, EnumString};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tasks_n_locks::demo::{self, IntPair, INCREMENTS};

fn main() -> Result<(), String> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tasks_n_locks=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // the counter demo is the default
    let selector = args().nth(1).unwrap_or_else(|| Demo::Counter.to_string());
    Demo::from_str(&selector)
        .map_err(|_| {
            format!(
                "unknown demo `{selector}', use one of {}",
                Demo::iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<String>>()
                    .join(",")
            )
        })
        .and_then(|selected| {
            match selected {
                Demo::Counter => demo::counter(INCREMENTS)
                    .map(|total| println!("counter = {total}")),
                Demo::RacyCounter => demo::racy_counter(INCREMENTS).map(|total| {
                    println!("counter = {total}, expected {}", 2 * INCREMENTS);
                    println!("heart of the problem is uncontrolled scheduling");
                }),
                Demo::RoundTrip => demo::round_trip(IntPair { x: 10, y: 20 })
                    .map(|p| println!("returned {} {}", p.x, p.y)),
                Demo::ReadyFlag => demo::ready_flag(3)
                    .map(|r| println!("ready = {} after {} checks", r.ready, r.checks)),
            }
            .map_err(|e| e.to_string())
        })
}

#[derive(EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
enum Demo {
    Counter,
    RacyCounter,
    RoundTrip,
    ReadyFlag,
}
