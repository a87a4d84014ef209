use anyhow::{anyhow, Context};
use async_trait::async_trait;
use mac_address::get_mac_address;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::level::LevelReading;
use crate::protocol::NoisePayload;
use crate::sink::{LevelSink, NullSink};

const DEFAULT_PORT: u16 = 1883;
// rumqttc 请求队列长度，发布为 fire-and-forget，队列满时直接丢弃
const REQUEST_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
}

/// 解析 mqtt://host[:port] 或 tcp://host[:port]
pub fn parse_endpoint(raw: &str) -> anyhow::Result<MqttEndpoint> {
    let url = Url::parse(raw).with_context(|| format!("Invalid MQTT url '{}'", raw))?;
    match url.scheme() {
        "mqtt" | "tcp" => {}
        other => anyhow::bail!("Unsupported MQTT scheme: {}", other),
    }
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| anyhow!("MQTT url has no host: {}", raw))?;

    Ok(MqttEndpoint {
        host: host.to_string(),
        port: url.port().unwrap_or(DEFAULT_PORT),
    })
}

/// 如果客户端ID是unknown-client，则尝试用MAC地址生成，否则退回到UUID
pub fn resolve_client_id(configured: &str) -> String {
    if configured != "unknown-client" {
        return configured.to_string();
    }
    match get_mac_address() {
        Ok(Some(mac)) => format!("noise-monitor-{}", mac.to_string().to_lowercase().replace(':', "")),
        _ => format!("noise-monitor-{}", Uuid::new_v4()),
    }
}

/// 发布端：启用 MQTT 时返回 MqttSink 与需要 spawn 的事件循环，否则返回 NullSink
/// 客户端ID只在启用时解析，禁用时不会读取MAC地址
pub fn publisher(config: &Config) -> anyhow::Result<(Box<dyn LevelSink>, Option<MqttLink>)> {
    if !config.mqtt_enabled {
        log::info!("MQTT disabled, readings are printed only");
        return Ok((Box::new(NullSink), None));
    }
    let mut config = config.clone();
    config.client_id = resolve_client_id(&config.client_id);
    let (sink, link) = MqttLink::new(&config)?;
    Ok((Box::new(sink), Some(link)))
}

/// Publishes every reading as a [`NoisePayload`] to one topic.
pub struct MqttSink {
    client: AsyncClient,
    topic: String,
}

#[async_trait]
impl LevelSink for MqttSink {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn report(&self, reading: &LevelReading) -> anyhow::Result<()> {
        let payload = NoisePayload::from_reading(reading).to_json()?;
        log::debug!("Publishing to {}: {}", self.topic, payload);
        // QoS 0，不等待确认
        self.client
            .try_publish(self.topic.clone(), QoS::AtMostOnce, false, payload)
            .context("Failed to queue MQTT publish")?;
        Ok(())
    }
}

/// Drives the rumqttc event loop: connects, keeps alive and reconnects.
pub struct MqttLink {
    eventloop: EventLoop,
    endpoint: MqttEndpoint,
    client_id: String,
}

impl MqttLink {
    /// 根据配置创建 sink 与对应的事件循环，事件循环需要单独 spawn
    pub fn new(config: &Config) -> anyhow::Result<(MqttSink, MqttLink)> {
        let endpoint = parse_endpoint(config.mqtt_url)?;

        let mut options = MqttOptions::new(config.client_id.clone(), endpoint.host.clone(), endpoint.port);
        options.set_keep_alive(Duration::from_secs(config.mqtt_keep_alive_secs.max(1)));

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        log::info!(
            "MQTT publisher: broker={}:{}, topic={}, client_id={}",
            endpoint.host,
            endpoint.port,
            config.mqtt_topic,
            config.client_id,
        );

        let sink = MqttSink {
            client,
            topic: config.mqtt_topic.to_string(),
        };
        let link = MqttLink {
            eventloop,
            endpoint,
            client_id: config.client_id.clone(),
        };
        Ok((sink, link))
    }

    // 如果发生错误断开连接，按指数退避重连
    pub async fn run(mut self) {
        let mut retry_delay = 1;
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!(
                        "MQTT connected to {}:{} as {}",
                        self.endpoint.host,
                        self.endpoint.port,
                        self.client_id
                    );
                    retry_delay = 1;
                }
                Ok(_) => {}
                Err(ConnectionError::RequestsDone) => {
                    // 所有 client 都已释放，正常退出
                    log::info!("MQTT link closed");
                    break;
                }
                Err(e) => {
                    log::warn!("MQTT connection error: {}. Retrying in {}s...", e, retry_delay);
                    tokio::time::sleep(Duration::from_secs(retry_delay)).await;
                    retry_delay = std::cmp::min(retry_delay * 2, 60);
                }
            }
        }
    }
}
