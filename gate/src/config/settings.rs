use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_port: u16,

    pub database_url: String,

    pub broker_api_key: String,
    pub broker_base_url: String,

    pub gate_hmac_secret: String,
    pub constitution_path: String,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // loads `.env` automatically, same as the teacher

        let server_port = env::var("GATE_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse::<u16>()
            .map_err(|_| "GATE_PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL missing")?;

        let broker_api_key = env::var("BROKER_API_KEY").map_err(|_| "BROKER_API_KEY missing")?;
        let broker_base_url = env::var("BROKER_BASE_URL")
            .unwrap_or_else(|_| "https://api.broker.example".to_string());

        let gate_hmac_secret =
            env::var("GATE_HMAC_SECRET").map_err(|_| "GATE_HMAC_SECRET missing")?;
        let constitution_path = env::var("CONSTITUTION_PATH")
            .unwrap_or_else(|_| "constitution.json".to_string());

        Ok(Self {
            server_port,
            database_url,
            broker_api_key,
            broker_base_url,
            gate_hmac_secret,
            constitution_path,
        })
    }
}
