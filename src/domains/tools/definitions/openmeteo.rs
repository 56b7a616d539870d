//! Weather forecast tool using the Open-Meteo API.
//!
//! Two requests per call: geocode the location, then fetch the daily
//! forecast for the best match. No API key required.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::common::{ToolContext, clamp, error_value, json_body};
use crate::domains::tools::callable::{Arguments, SuspendingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::{ToolError, ToolResult};

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,weathercode";

/// Parameters for the forecast lookup.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct OpenMeteoParams {
    /// City name or location
    pub location: String,

    /// Number of forecast days (1-14)
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

/// Human-readable description of a WMO weather code.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Open-Meteo forecast tool.
#[derive(Debug, Clone)]
pub struct OpenMeteoForecastTool {
    ctx: ToolContext,
}

impl OpenMeteoForecastTool {
    pub const NAME: &'static str = "openmeteo_forecast";
    pub const DESCRIPTION: &'static str = "Get a daily weather forecast for a location: temperature \
         range, precipitation and conditions.";

    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<OpenMeteoParams>(Self::NAME, Self::DESCRIPTION).suspending()
    }

    pub async fn execute(&self, params: OpenMeteoParams) -> ToolResult<Value> {
        let days = clamp(params.days, 1, 14);
        let endpoints = self.ctx.endpoints();

        info!("Forecasting {} day(s) for '{}'", days, params.location);

        let response = self
            .ctx
            .client()
            .get(&endpoints.openmeteo_geocoding)
            .query(&[
                ("name", params.location.as_str()),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(error_value(format!("API error: {}", response.status().as_u16())));
        }

        let geo = json_body(response).await?;
        let place = match &geo {
            Value::Array(results) => results.first(),
            Value::Object(_) => geo["results"].as_array().and_then(|r| r.first()),
            _ => None,
        };
        let Some(place) = place else {
            return Ok(error_value(format!("Location not found: {}", params.location)));
        };

        let (Some(latitude), Some(longitude)) = (place["latitude"].as_f64(), place["longitude"].as_f64())
        else {
            return Err(ToolError::execution_failed(
                "Geocoding result is missing coordinates",
            ));
        };
        let name = place["name"].as_str().unwrap_or(&params.location);
        let full_location = match place["country"].as_str() {
            Some(country) if !country.is_empty() => format!("{name}, {country}"),
            _ => name.to_string(),
        };

        let response = self
            .ctx
            .client()
            .get(&endpoints.openmeteo_forecast)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", days.to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(error_value(format!("API error: {}", response.status().as_u16())));
        }

        let forecast = json_body(response).await?;
        let daily = &forecast["daily"];
        let Some(dates) = daily["time"].as_array() else {
            return Ok(error_value("Invalid forecast data received"));
        };

        let daily_forecast: Vec<Value> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                let code = daily["weathercode"][i].as_i64().unwrap_or(0);
                json!({
                    "date": date,
                    "max_temp": daily["temperature_2m_max"][i],
                    "min_temp": daily["temperature_2m_min"][i],
                    "precipitation": daily["precipitation_sum"][i],
                    "weather_code": code,
                    "weather_description": describe_weather_code(code),
                })
            })
            .collect();

        Ok(json!({
            "location": full_location,
            "latitude": latitude,
            "longitude": longitude,
            "timezone": forecast["timezone"].as_str().unwrap_or("UTC"),
            "daily_forecast": daily_forecast,
        }))
    }
}

#[async_trait]
impl SuspendingTool for OpenMeteoForecastTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: OpenMeteoParams = parse_params(arguments)?;
        self.execute(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::test_support::{Canned, FixtureServer};

    fn params(location: &str, days: i64) -> OpenMeteoParams {
        OpenMeteoParams {
            location: location.to_string(),
            days,
        }
    }

    #[test]
    fn test_weather_codes() {
        assert_eq!(describe_weather_code(0), "Clear sky");
        assert_eq!(describe_weather_code(95), "Thunderstorm");
        assert_eq!(describe_weather_code(42), "Unknown");
    }

    #[tokio::test]
    async fn test_forecast_is_reshaped() {
        let server = FixtureServer::start(vec![
            Canned::get("/v1/search").json(json!({
                "results": [{"name": "Berlin", "country": "Germany", "latitude": 52.52, "longitude": 13.41}]
            })),
            Canned::get("/v1/forecast").json(json!({
                "timezone": "Europe/Berlin",
                "daily": {
                    "time": ["2024-05-01", "2024-05-02"],
                    "temperature_2m_max": [20.1, 18.4],
                    "temperature_2m_min": [9.0, 8.2],
                    "precipitation_sum": [0.0, 3.5],
                    "weathercode": [1, 63]
                }
            })),
        ])
        .await;

        let value = OpenMeteoForecastTool::new(server.context())
            .execute(params("Berlin", 30))
            .await
            .unwrap();

        assert_eq!(value["location"], "Berlin, Germany");
        assert_eq!(value["timezone"], "Europe/Berlin");
        let days = value["daily_forecast"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1]["weather_description"], "Moderate rain");
        assert_eq!(days[1]["precipitation"], 3.5);

        let requests = server.requests();
        assert_eq!(requests[1].query_param("forecast_days").as_deref(), Some("14"));
    }

    #[tokio::test]
    async fn test_unknown_location_is_reported() {
        let server = FixtureServer::start(vec![Canned::get("/v1/search").json(json!({}))]).await;
        let value = OpenMeteoForecastTool::new(server.context())
            .execute(params("Nowhere", 3))
            .await
            .unwrap();
        assert_eq!(value, json!({"error": "Location not found: Nowhere"}));
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let server = FixtureServer::start(vec![Canned::get("/v1/search").status(503)]).await;
        let value = OpenMeteoForecastTool::new(server.context())
            .execute(params("Rome", 0))
            .await
            .unwrap();
        assert_eq!(value, json!({"error": "API error: 503"}));
    }

    #[tokio::test]
    async fn test_missing_daily_is_invalid() {
        let server = FixtureServer::start(vec![
            Canned::get("/v1/search").json(json!([{"name": "Lima", "latitude": -12.0, "longitude": -77.0}])),
            Canned::get("/v1/forecast").json(json!({"daily": {}})),
        ])
        .await;
        let value = OpenMeteoForecastTool::new(server.context())
            .execute(params("Lima", 2))
            .await
            .unwrap();
        assert_eq!(value, json!({"error": "Invalid forecast data received"}));
    }
}
