//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements                | Connects to                  |
//! |--------------|---------------------------|------------------------------|
//! | `hardware`   | TemperaturePort, IrPort   | DS18B20 (1-Wire), LIRC       |
//! | `file_store` | ConfigPort                | JSON file, atomic rename     |
//! | `mqtt`       | CloudPort                 | MQTT broker (rumqttc)        |
//! | `log_cloud`  | CloudPort                 | Log output                   |
//! | `weather`    | WeatherPort               | OpenWeatherMap over HTTP     |
//! | `time`       | Clock                     | Wall clock / simulated time  |
//! | `device_id`  | -                         | Network interfaces           |
//! | `signal`     | -                         | SIGINT / SIGTERM             |

pub mod device_id;
pub mod file_store;
pub mod hardware;
pub mod log_cloud;
pub mod mqtt;
pub mod signal;
pub mod time;
pub mod weather;
