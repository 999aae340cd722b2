//! The MQTT side of jogging: telling the robot which program to fetch.

use std::time::Duration;

use rumqttc::{AsyncClient, MqttOptions, QoS};
use scribit_protocol::CommandId;

// The firmware needs a moment between the wake-up, the stop and the print.
const WAKE_PAUSE: Duration = Duration::from_millis(20);
const RESET_PAUSE: Duration = Duration::from_millis(80);

#[derive(Clone, Debug)]
pub struct RobotConfig {
    pub robot_id: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    /// The address the robot can reach us at. The firmware rejects URLs
    /// with a port, so the HTTP server has to be on port 80.
    pub host_ip: String,
    /// The part of the print payload after the `;`.
    pub suffix: String,
}

impl RobotConfig {
    pub fn topic(&self, name: &str) -> String {
        format!("tin/{}/{name}", self.robot_id)
    }

    pub fn print_payload(&self, cmd: CommandId) -> String {
        format!("http://{}/g/{cmd}.gcode;{}", self.host_ip, self.suffix)
    }
}

pub struct Robot {
    config: RobotConfig,
    client: AsyncClient,
}

impl Robot {
    /// Connects to the broker. The connection is driven by a background task.
    pub fn connect(config: RobotConfig) -> Self {
        let client_id = format!("scribit-feeder-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, config.mqtt_host.clone(), config.mqtt_port);
        options.set_credentials(config.mqtt_user.clone(), config.mqtt_pass.clone());
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut event_loop) = AsyncClient::new(options, 100);
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(ev) => log::trace!("mqtt: {ev:?}"),
                    Err(e) => {
                        log::warn!("mqtt connection error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Robot { config, client }
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    async fn publish(&self, name: &str, payload: String) -> anyhow::Result<()> {
        let topic = self.config.topic(name);
        log::debug!("publishing {payload:?} to {topic}");
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await?;
        Ok(())
    }

    /// Nudges the firmware out of its idle states. Harmless to repeat.
    pub async fn wake(&self) -> anyhow::Result<()> {
        self.publish("status", "{}".to_owned()).await
    }

    /// Stops whatever the robot is doing.
    pub async fn reset(&self) -> anyhow::Result<()> {
        self.publish("reset", "N".to_owned()).await
    }

    /// Tells the robot to fetch and run the program for `cmd`.
    pub async fn run(&self, cmd: CommandId) -> anyhow::Result<String> {
        self.wake().await?;
        tokio::time::sleep(WAKE_PAUSE).await;
        self.reset().await?;
        tokio::time::sleep(RESET_PAUSE).await;
        let payload = self.config.print_payload(cmd);
        self.publish("print", payload.clone()).await?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use scribit_protocol::{PenAction, PenSlot};

    use super::*;

    #[test]
    fn topics_and_payloads() {
        let config = RobotConfig {
            robot_id: "abc123".to_owned(),
            mqtt_host: "localhost".to_owned(),
            mqtt_port: 1883,
            mqtt_user: "scribit".to_owned(),
            mqtt_pass: "scribit".to_owned(),
            host_ip: "192.168.1.20".to_owned(),
            suffix: "G4 P0".to_owned(),
        };
        assert_eq!(config.topic("print"), "tin/abc123/print");
        assert_eq!(config.topic("status"), "tin/abc123/status");
        assert_eq!(
            config.print_payload(CommandId::Pen(PenSlot::new(3).unwrap(), PenAction::Down)),
            "http://192.168.1.20/g/P3_DOWN.gcode;G4 P0"
        );
        assert_eq!(
            config.print_payload(CommandId::Home),
            "http://192.168.1.20/g/G77.gcode;G4 P0"
        );
    }
}
