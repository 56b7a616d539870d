//! Current weather tool using the OpenWeatherMap API.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{ToolContext, env_credential, error_value};
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::ToolResult;

const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";
const FALLBACK_API_KEY: &str = "dummy_key_for_testing";
const UNITS: [&str; 3] = ["metric", "imperial", "standard"];

/// Parameters for the current weather lookup.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FetchWeatherParams {
    /// City name or location
    pub location: String,

    /// Temperature unit (metric, imperial, standard)
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_units() -> String {
    "metric".to_string()
}

/// OpenWeatherMap current-weather tool.
#[derive(Debug, Clone)]
pub struct FetchWeatherTool {
    ctx: ToolContext,
}

impl FetchWeatherTool {
    pub const NAME: &'static str = "fetch_weather";
    pub const DESCRIPTION: &'static str = "Fetch current weather data for a location: temperature, \
         conditions, humidity and wind speed.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<FetchWeatherParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: FetchWeatherParams) -> ToolResult<Value> {
        let api_key = env_credential(API_KEY_VAR).unwrap_or_else(|| FALLBACK_API_KEY.to_string());
        let units = if UNITS.contains(&params.units.as_str()) {
            params.units
        } else {
            debug!("Unknown units '{}', using metric", params.units);
            default_units()
        };

        info!("Fetching weather for '{}'", params.location);

        let response = self
            .ctx
            .client()
            .get(&self.ctx.endpoints().openweather)
            .query(&[
                ("q", params.location.as_str()),
                ("appid", api_key.as_str()),
                ("units", units.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));
            return Ok(error_value(message));
        }

        let data: Value = response.json().await?;
        let main = &data["main"];
        let weather = &data["weather"][0];

        Ok(json!({
            "location": data.get("name").cloned().unwrap_or_else(|| json!(params.location)),
            "temperature": main["temp"],
            "feels_like": main["feels_like"],
            "min_temp": main["temp_min"],
            "max_temp": main["temp_max"],
            "humidity": main["humidity"],
            "wind_speed": data["wind"]["speed"],
            "description": weather.get("description").cloned().unwrap_or_else(|| json!("Unknown")),
            "icon": weather["icon"],
            "units": units,
        }))
    }
}

#[async_trait]
impl SuspendingTool for FetchWeatherTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: FetchWeatherParams = parse_params(arguments)?;
        self.execute(params).await
    }
}
