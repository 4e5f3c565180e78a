use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub broker_api_key: String,
    pub broker_api_secret: String,
    pub broker_base_url: String,
    pub broker_ws_base_url: String,
    pub broker_demo: bool,

    pub gate_base_url: String,
    pub gate_hmac_secret: String,

    pub positions_mirror_path: String,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // loads `.env` automatically, same as the teacher

        let broker_api_key = env::var("BROKER_API_KEY").map_err(|_| "BROKER_API_KEY missing")?;
        let broker_api_secret =
            env::var("BROKER_API_SECRET").map_err(|_| "BROKER_API_SECRET missing")?;
        let broker_base_url = env::var("BROKER_BASE_URL")
            .unwrap_or_else(|_| "https://api.broker.example".to_string());
        let broker_ws_base_url = env::var("BROKER_WS_BASE_URL")
            .unwrap_or_else(|_| "wss://stream.broker.example".to_string());
        let broker_demo = env::var("BROKER_DEMO")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let gate_base_url = env::var("GATE_BASE_URL").map_err(|_| "GATE_BASE_URL missing")?;
        let gate_hmac_secret =
            env::var("GATE_HMAC_SECRET").map_err(|_| "GATE_HMAC_SECRET missing")?;

        let positions_mirror_path =
            env::var("POSITIONS_MIRROR_PATH").unwrap_or_else(|_| "positions.json".to_string());

        Ok(Self {
            broker_api_key,
            broker_api_secret,
            broker_base_url,
            broker_ws_base_url,
            broker_demo,
            gate_base_url,
            gate_hmac_secret,
            positions_mirror_path,
        })
    }
}
