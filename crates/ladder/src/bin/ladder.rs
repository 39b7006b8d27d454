use ladder::{
    Ladder,
    config::{RunSettings, load_dotenv, log_level},
    evaluation::Evaluation,
    feed::read_feed,
    player::Role,
    standings::Standings,
    store::{MemoryStore, Snapshot},
};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    // `.env` may carry LOG_LEVEL, so it is loaded before the subscriber.
    load_dotenv()?;
    tracing_subscriber::fmt()
        .with_max_level(log_level(|var| std::env::var(var).ok()))
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;

    let settings = RunSettings::try_from_env()?;
    let ladder = Ladder::new(settings.config)?;
    let feed = read_feed(&settings.feed)?;

    let resumed = settings
        .snapshot
        .as_deref()
        .map(Snapshot::load)
        .transpose()?
        .flatten();
    let (mut store, offset) = match resumed {
        Some(snapshot) => {
            info!("resuming after {} matches", snapshot.processed);
            (snapshot.restore(), snapshot.processed)
        }
        None => (MemoryStore::new(), 0),
    };
    if offset > feed.len() {
        error!(
            "snapshot covers {offset} matches but `{}` only has {}",
            settings.feed.display(),
            feed.len()
        );
        anyhow::bail!("snapshot does not belong to `{}`", settings.feed.display());
    }

    let predictions = ladder.run(&mut store, &feed, offset);
    Evaluation::from_predictions(&predictions).log_summary();

    if let Some(path) = &settings.snapshot {
        Snapshot::capture(&store, feed.len()).save(path)?;
    }

    let standings = Standings::from_store(&store);
    for role in Role::ALL {
        for (rank, (player, standing)) in standings.ranked(role).into_iter().take(10).enumerate() {
            info!(
                "{role} #{}: {player} {:.0} ± {:.0} ({}-{})",
                rank + 1,
                standing.rating,
                standing.deviation,
                standing.wins,
                standing.losses
            );
        }
    }
    if let Some(path) = &settings.standings {
        standings.save(path)?;
    }
    Ok(())
}
