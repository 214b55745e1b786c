use kiroku::broker::Broker;
use kiroku::config::{BrokerConfig, DEFAULT_CONFIG_PATH};
use kiroku::Error;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        error!("broker failed: {}", err);
        std::process::exit(1);
    }
}

fn run() -> kiroku::Result<()> {
    let config = BrokerConfig::load(Path::new(DEFAULT_CONFIG_PATH))?;
    info!("starting broker with data dir {:?}", config.data_dir);
    let broker = Broker::new(&config.data_dir, config.max_segment_bytes);

    let Some(name) = config.bootstrap_topic_name.as_deref() else {
        info!("no bootstrap topic configured, nothing to do");
        return Ok(());
    };
    broker.create_topic(name, config.bootstrap_partition_count)?;

    let topic = broker
        .get_topic(name)
        .ok_or_else(|| Error::UnknownTopic(name.to_string()))?;
    for i in 0..5 {
        let key = format!("order-{}", i);
        let value = format!("customer-{} placed an order", i);
        let pid = broker.partition_for_key(name, key.as_bytes())?;
        let offset = topic
            .partition(pid)?
            .log
            .append(key.as_bytes(), value.as_bytes())?;
        info!("appended offset {} to {}/partition-{}", offset, name, pid);
    }

    for partition in topic.partitions() {
        for record in partition.log.read(0, 10)? {
            info!(
                "{}/partition-{}: [{}] {} = {}",
                name,
                partition.id,
                record.offset,
                String::from_utf8_lossy(&record.key),
                String::from_utf8_lossy(&record.value)
            );
        }
    }

    Ok(())
}
