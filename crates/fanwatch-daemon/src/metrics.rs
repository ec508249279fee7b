//! Prometheus metrics for sensors and fans.

use fanwatch_hw::{Fan, Feature, Sensor};
use prometheus::{
    register_gauge_vec_with_registry, Encoder, GaugeVec, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::debug;

const NAMESPACE: &str = "fanwatch";

/// Gauges refreshed on every scrape.
pub struct Metrics {
    sensor_moving_avg: GaugeVec,
    fan_pwm: GaugeVec,
    fan_rpm: GaugeVec,
    registry: Registry,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some(NAMESPACE.to_string()), None)?;

        let sensor_moving_avg = register_gauge_vec_with_registry!(
            "sensor_moving_avg",
            "Moving average of the sensor value",
            &["id"],
            registry
        )?;

        let fan_pwm = register_gauge_vec_with_registry!(
            "fan_pwm",
            "Current PWM value of the fan",
            &["id"],
            registry
        )?;

        let fan_rpm = register_gauge_vec_with_registry!(
            "fan_rpm",
            "Current RPM value of the fan",
            &["id"],
            registry
        )?;

        Ok(Self {
            sensor_moving_avg,
            fan_pwm,
            fan_rpm,
            registry,
        })
    }

    /// Samples every sensor and fan and renders the text exposition format.
    ///
    /// A fan value that cannot be read is left out of this scrape.
    pub async fn render(
        &self,
        sensors: &[Arc<dyn Sensor>],
        fans: &[Arc<dyn Fan>],
    ) -> prometheus::Result<String> {
        for sensor in sensors {
            self.sensor_moving_avg
                .with_label_values(&[sensor.id()])
                .set(sensor.moving_avg());
        }

        for fan in fans {
            let id = fan.id();
            match fan.pwm().await {
                Ok(pwm) => self.fan_pwm.with_label_values(&[id]).set(f64::from(pwm)),
                Err(e) => {
                    debug!("Skipping PWM of fan {}: {}", id, e);
                    let _ = self.fan_pwm.remove_label_values(&[id]);
                }
            }

            if !fan.supports(Feature::RpmSensor) {
                continue;
            }
            match fan.rpm().await {
                Ok(rpm) => self.fan_rpm.with_label_values(&[id]).set(f64::from(rpm)),
                Err(e) => {
                    debug!("Skipping RPM of fan {}: {}", id, e);
                    let _ = self.fan_rpm.remove_label_values(&[id]);
                }
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use fanwatch_hw::{Error, MovingAverage, Result};

    pub(crate) struct StaticSensor {
        pub id: &'static str,
        pub avg: MovingAverage,
    }

    #[async_trait]
    impl Sensor for StaticSensor {
        fn id(&self) -> &str {
            self.id
        }

        async fn value(&self) -> Result<f64> {
            Ok(self.avg.get())
        }

        fn moving_avg(&self) -> f64 {
            self.avg.get()
        }

        fn set_moving_avg(&self, avg: f64) {
            self.avg.set(avg);
        }
    }

    pub(crate) struct StaticFan {
        pub id: &'static str,
        pub pwm: Option<u8>,
        pub rpm: Option<u32>,
    }

    #[async_trait]
    impl Fan for StaticFan {
        fn id(&self) -> &str {
            self.id
        }

        async fn pwm(&self) -> Result<u8> {
            self.pwm.ok_or_else(|| Error::SampleRead {
                id: self.id.to_string(),
                reason: "no pwm".to_string(),
            })
        }

        async fn rpm(&self) -> Result<u32> {
            self.rpm.ok_or_else(|| Error::UnsupportedFeature {
                id: self.id.to_string(),
                feature: Feature::RpmSensor.to_string(),
            })
        }

        fn supports(&self, feature: Feature) -> bool {
            match feature {
                Feature::RpmSensor => self.rpm.is_some(),
            }
        }
    }

    #[tokio::test]
    async fn test_render_sensors_and_fans() {
        let metrics = Metrics::new().unwrap();
        let sensors: Vec<Arc<dyn Sensor>> = vec![Arc::new(StaticSensor {
            id: "cpu",
            avg: MovingAverage::new(42.5),
        })];
        let fans: Vec<Arc<dyn Fan>> = vec![
            Arc::new(StaticFan {
                id: "cpu_fan",
                pwm: Some(128),
                rpm: Some(1200),
            }),
            Arc::new(StaticFan {
                id: "case_fan",
                pwm: Some(64),
                rpm: None,
            }),
        ];

        let text = metrics.render(&sensors, &fans).await.unwrap();
        assert!(text.contains("fanwatch_sensor_moving_avg{id=\"cpu\"} 42.5"));
        assert!(text.contains("fanwatch_fan_pwm{id=\"cpu_fan\"} 128"));
        assert!(text.contains("fanwatch_fan_pwm{id=\"case_fan\"} 64"));
        assert!(text.contains("fanwatch_fan_rpm{id=\"cpu_fan\"} 1200"));
        assert!(!text.contains("fanwatch_fan_rpm{id=\"case_fan\"}"));
    }

    #[tokio::test]
    async fn test_failed_pwm_read_is_skipped() {
        let metrics = Metrics::new().unwrap();
        let fans: Vec<Arc<dyn Fan>> = vec![Arc::new(StaticFan {
            id: "dead_fan",
            pwm: None,
            rpm: None,
        })];

        let text = metrics.render(&[], &fans).await.unwrap();
        assert!(!text.contains("dead_fan"));
    }
}
