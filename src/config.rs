use crate::audio::AudioConfig;
use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,

    // 远端服务配置
    pub ws_url: String,
    pub model: &'static str,
    pub voice: &'static str,
    /// Name of the environment variable holding the API key. The key itself
    /// is never baked into the binary.
    pub api_key_env: &'static str,
    pub event_buffer: usize,
    pub frame_buffer: usize,

    // 音频设备配置
    pub capture_device: &'static str,
    pub playback_device: &'static str,
    pub capture_sample_rate: u32,
    pub playback_sample_rate: u32,
    pub capture_frame_samples: usize,
    pub playback_period_size: usize,
}

fn parse<T: std::str::FromStr>(name: &str, raw: &str) -> SessionResult<T> {
    raw.parse()
        .map_err(|_| SessionError::Config(format!("Failed to parse {}: {:?}", name, raw)))
}

impl Config {
    /// Build the configuration from the environment variables set at compile
    /// time by `build.rs` from `config.toml`.
    pub fn new() -> SessionResult<Self> {
        let config = Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            ws_url: env!("WS_URL").to_string(),
            model: env!("LIVE_MODEL"),
            voice: env!("LIVE_VOICE"),
            api_key_env: env!("API_KEY_ENV"),
            event_buffer: parse("EVENT_BUFFER", env!("EVENT_BUFFER"))?,
            frame_buffer: parse("FRAME_BUFFER", env!("FRAME_BUFFER"))?,

            capture_device: env!("CAPTURE_DEVICE"),
            playback_device: env!("PLAYBACK_DEVICE"),
            capture_sample_rate: parse("CAPTURE_SAMPLE_RATE", env!("CAPTURE_SAMPLE_RATE"))?,
            playback_sample_rate: parse("PLAYBACK_SAMPLE_RATE", env!("PLAYBACK_SAMPLE_RATE"))?,
            capture_frame_samples: parse("CAPTURE_FRAME_SAMPLES", env!("CAPTURE_FRAME_SAMPLES"))?,
            playback_period_size: parse("PLAYBACK_PERIOD_SIZE", env!("PLAYBACK_PERIOD_SIZE"))?,
        };

        if config.capture_frame_samples == 0 || config.playback_period_size == 0 {
            return Err(SessionError::Config(
                "capture_frame_samples and playback_period_size must be non-zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read the API key from the environment variable named in `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn audio(&self) -> AudioConfig {
        AudioConfig {
            capture_device: self.capture_device.to_string(),
            playback_device: self.playback_device.to_string(),
            capture_sample_rate: self.capture_sample_rate,
            playback_sample_rate: self.playback_sample_rate,
            capture_frame_samples: self.capture_frame_samples,
            playback_period_size: self.playback_period_size,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
