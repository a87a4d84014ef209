use async_trait::async_trait;

use crate::level::LevelReading;

/// Destination for readings produced by the level meter.
#[async_trait]
pub trait LevelSink: Send + Sync {
    fn name(&self) -> &str;
    async fn report(&self, reading: &LevelReading) -> anyhow::Result<()>;
}

/// One line per reading on stdout.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn format_line(reading: &LevelReading) -> String {
        format!(
            "Current Noise Level: {:.2} dB -> {}",
            reading.decibels,
            reading.status.indicator()
        )
    }
}

#[async_trait]
impl LevelSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn report(&self, reading: &LevelReading) -> anyhow::Result<()> {
        println!("{}", Self::format_line(reading));
        Ok(())
    }
}

/// Publish sink used when messaging is disabled.
pub struct NullSink;

#[async_trait]
impl LevelSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    async fn report(&self, _reading: &LevelReading) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 按顺序把读数交给每个 sink，某个 sink 失败不影响其他 sink
pub async fn dispatch(sinks: &[Box<dyn LevelSink>], reading: &LevelReading) {
    for sink in sinks {
        if let Err(e) = sink.report(reading).await {
            log::warn!("Failed to report to {}: {:#}", sink.name(), e);
        }
    }
}
