use std::time::Duration;

use crate::audio::AudioConfig;
use crate::level::LevelEstimator;

#[derive(Debug, Clone)]
pub struct Config {
    // 音频采集配置
    pub capture_device: &'static str,
    pub sample_rate: u32,
    pub duration_ms: u64,
    pub interval_ms: u64,

    // 分贝估算配置：校准偏移量与阈值相互独立
    pub offset_db: f64,
    pub threshold_db: f64,

    // MQTT 配置
    pub mqtt_enabled: bool,
    pub mqtt_url: &'static str,
    pub mqtt_topic: &'static str,
    pub mqtt_keep_alive_secs: u64,

    // 客户端标识（动态部分，可在运行时修改）
    pub client_id: String,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        let config = Self {
            // 音频采集配置
            capture_device: env!("AUDIO_CAPTURE_DEVICE"),
            sample_rate: env!("AUDIO_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse AUDIO_SAMPLE_RATE")?,
            duration_ms: env!("AUDIO_DURATION_MS").parse()
                .map_err(|_| "Failed to parse AUDIO_DURATION_MS")?,
            interval_ms: env!("AUDIO_INTERVAL_MS").parse()
                .map_err(|_| "Failed to parse AUDIO_INTERVAL_MS")?,

            // 分贝估算配置
            offset_db: env!("LEVEL_OFFSET_DB").parse()
                .map_err(|_| "Failed to parse LEVEL_OFFSET_DB")?,
            threshold_db: env!("LEVEL_THRESHOLD_DB").parse()
                .map_err(|_| "Failed to parse LEVEL_THRESHOLD_DB")?,

            // MQTT 配置
            mqtt_enabled: env!("MQTT_ENABLED").parse()
                .map_err(|_| "Failed to parse MQTT_ENABLED")?,
            mqtt_url: env!("MQTT_URL"),
            mqtt_topic: env!("MQTT_TOPIC"),
            mqtt_keep_alive_secs: env!("MQTT_KEEP_ALIVE_SECS").parse()
                .map_err(|_| "Failed to parse MQTT_KEEP_ALIVE_SECS")?,

            // 客户端ID初始化为config.toml中的值
            client_id: env!("MQTT_CLIENT_ID").to_string(),
        };

        if config.duration_ms == 0 {
            return Err("AUDIO_DURATION_MS must be greater than zero");
        }
        Ok(config)
    }

    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            capture_device: self.capture_device.to_string(),
            sample_rate: self.sample_rate,
            duration_ms: self.duration_ms,
        }
    }

    pub fn estimator(&self) -> LevelEstimator {
        LevelEstimator::new(self.offset_db, self.threshold_db)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
