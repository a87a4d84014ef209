mod audio;
mod config;
mod level;
mod mqtt_link;
mod protocol;
mod sink;

use audio::{AlsaSource, LevelMeter};
use config::Config;
use level::LevelReading;
use sink::{ConsoleSink, LevelSink};
use tokio::signal;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let config = Config::new().map_err(anyhow::Error::msg)?;
    log::info!("{} {} starting", env!("APP_NAME"), env!("APP_VERSION"));

    println!("Noise Monitoring System (Real Microphone Input)\n");
    println!("Press Ctrl+C to stop\n");

    // 发布端：启用 MQTT 时启动事件循环，否则使用空 sink
    let (publisher, mqtt_link) = mqtt_link::publisher(&config)?;
    if let Some(link) = mqtt_link {
        tokio::spawn(async move {
            link.run().await;
        });
    }
    let sinks: Vec<Box<dyn LevelSink>> = vec![Box::new(ConsoleSink), publisher];

    // 读数通道，采集线程 -> 主循环
    let (tx_reading, mut rx_reading) = mpsc::channel::<LevelReading>(4);

    let audio_config = config.audio_config();
    let mut meter = LevelMeter::start(
        move || AlsaSource::open(&audio_config),
        config.estimator(),
        config.poll_interval(),
        tx_reading,
    )?;

    loop {
        tokio::select! {
            // 监听 Ctrl+C 信号
            _ = signal::ctrl_c() => {
                println!("\nStopped monitoring.");
                break;
            }

            reading = rx_reading.recv() => {
                match reading {
                    Some(reading) => sink::dispatch(&sinks, &reading).await,
                    None => {
                        log::error!("Level meter stopped unexpectedly, shutting down");
                        break;
                    }
                }
            }
        }
    }

    // 先释放接收端，避免采集线程阻塞在发送上
    drop(rx_reading);
    tokio::task::spawn_blocking(move || meter.stop()).await?;

    Ok(())
}
