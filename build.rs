use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    audio: Audio,
    level: Level,
    mqtt: Mqtt,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Audio {
    capture_device: String,
    sample_rate: u32,
    duration_ms: u64,
    interval_ms: u64,
}

#[derive(Deserialize)]
struct Level {
    offset_db: f64,
    threshold_db: f64,
}

#[derive(Deserialize)]
struct Mqtt {
    enabled: bool,
    url: String,
    topic: String,
    client_id: String,
    keep_alive_secs: u64,
}


// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 音频采集配置
    println!("cargo:rustc-env=AUDIO_CAPTURE_DEVICE={}", config.audio.capture_device);
    println!("cargo:rustc-env=AUDIO_SAMPLE_RATE={}", config.audio.sample_rate);
    println!("cargo:rustc-env=AUDIO_DURATION_MS={}", config.audio.duration_ms);
    println!("cargo:rustc-env=AUDIO_INTERVAL_MS={}", config.audio.interval_ms);

    // 分贝估算配置，{:?} 保证浮点数总是带小数点
    println!("cargo:rustc-env=LEVEL_OFFSET_DB={:?}", config.level.offset_db);
    println!("cargo:rustc-env=LEVEL_THRESHOLD_DB={:?}", config.level.threshold_db);

    // MQTT 配置
    println!("cargo:rustc-env=MQTT_ENABLED={}", config.mqtt.enabled);
    println!("cargo:rustc-env=MQTT_URL={}", config.mqtt.url);
    println!("cargo:rustc-env=MQTT_TOPIC={}", config.mqtt.topic);
    println!("cargo:rustc-env=MQTT_CLIENT_ID={}", config.mqtt.client_id);
    println!("cargo:rustc-env=MQTT_KEEP_ALIVE_SECS={}", config.mqtt.keep_alive_secs);
}
