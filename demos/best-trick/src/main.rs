use anyhow::{Context, Result};
use semq::observe::render_slots;
use semq::{Config, Event, Observer, Session, TRICKS};
use tracing_subscriber::EnvFilter;

/// Narrates the session: skaters join the queue, the judge releases them to
/// drop in.
struct Announcer;

impl Observer for Announcer {
    fn observe(&self, event: Event) {
        match event {
            Event::Ready => tracing::info!("judge is in position and waiting"),
            Event::Produced { item, snapshot } => tracing::info!(
                "skater {:02} joined the queue with {}  {}",
                item.sequence_id(),
                item.payload(),
                render_slots(snapshot),
            ),
            Event::Released { item, snapshot } => tracing::info!(
                "judge released skater {:02}  {}",
                item.sequence_id(),
                render_slots(snapshot),
            ),
            Event::Processed { item } => tracing::info!(
                "skater {:02} landed {}",
                item.sequence_id(),
                item.payload(),
            ),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!("loaded configuration, config={config:?}");

    let session = Session::new(config.capacity, config.items)?;
    let mut rng = config.rng();
    let producer_delay = config.delay(rng.fork());
    let consumer_delay = config.delay(rng.fork());

    tracing::info!("starting best trick session");
    let report = session
        .run(TRICKS, rng, producer_delay, consumer_delay, &Announcer)
        .context("best trick session failed")?;
    tracing::info!(
        "session over, skaters={}, queue_full_waits={}, queue_empty_waits={}",
        report.consumed.len(),
        report.stats.producer_waits,
        report.stats.consumer_waits,
    );

    Ok(())
}
