use anyhow::Result;
use log::{info, warn};

/// The robot's motion interface.
pub trait Actuator {
    fn set_angles(&mut self, names: &[&str], values: &[f64], speed: f64) -> Result<()>;

    /// `level` in [0, 1]; 0 relaxes the motors
    fn set_stiffness(&mut self, group: &str, level: f64) -> Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn set_angles(&mut self, names: &[&str], values: &[f64], speed: f64) -> Result<()> {
        (**self).set_angles(names, values, speed)
    }

    fn set_stiffness(&mut self, group: &str, level: f64) -> Result<()> {
        (**self).set_stiffness(group, level)
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_angles(&mut self, names: &[&str], values: &[f64], speed: f64) -> Result<()> {
        (**self).set_angles(names, values, speed)
    }

    fn set_stiffness(&mut self, group: &str, level: f64) -> Result<()> {
        (**self).set_stiffness(group, level)
    }
}

/// Dry-run actuator: logs every command instead of moving anything.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    commands: u64,
}

impl LoggingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_count(&self) -> u64 {
        self.commands
    }
}

impl Actuator for LoggingActuator {
    fn set_angles(&mut self, names: &[&str], values: &[f64], speed: f64) -> Result<()> {
        self.commands += 1;
        let joints: Vec<String> = names
            .iter()
            .zip(values)
            .map(|(name, value)| format!("{}={:.3} rad ({:.1}°)", name, value, value.to_degrees()))
            .collect();
        info!("setAngles [{}] speed={:.2}", joints.join(", "), speed);
        Ok(())
    }

    fn set_stiffness(&mut self, group: &str, level: f64) -> Result<()> {
        info!("setStiffness {} -> {:.1}", group, level);
        Ok(())
    }
}

/// Holds the motors stiff for as long as it lives and relaxes them exactly
/// once when dropped, whichever way the session ends.
pub struct StiffnessGuard<A: Actuator> {
    actuator: A,
    group: String,
}

impl<A: Actuator> StiffnessGuard<A> {
    /// A failed stiffen is logged; the guard still relaxes on drop.
    pub fn acquire(mut actuator: A, group: &str) -> Self {
        match actuator.set_stiffness(group, 1.0) {
            Ok(()) => info!("stiffness on for {}", group),
            Err(e) => warn!("failed to stiffen {}: {:#}", group, e),
        }
        Self {
            actuator,
            group: group.to_string(),
        }
    }

    pub fn actuator(&mut self) -> &mut A {
        &mut self.actuator
    }
}

impl<A: Actuator> Drop for StiffnessGuard<A> {
    fn drop(&mut self) {
        match self.actuator.set_stiffness(&self.group, 0.0) {
            Ok(()) => info!("motors relaxed for {}", self.group),
            Err(e) => warn!("failed to relax {}: {:#}", self.group, e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::bail;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Angles(Vec<String>, Vec<f64>, f64),
        Stiffness(String, f64),
    }

    /// Records every call; optionally fails `set_angles`.
    #[derive(Debug, Default)]
    pub struct RecordingActuator {
        pub calls: Vec<Call>,
        pub fail_angles: bool,
    }

    impl RecordingActuator {
        pub fn angle_calls(&self) -> Vec<(Vec<String>, Vec<f64>, f64)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Angles(n, v, s) => Some((n.clone(), v.clone(), *s)),
                    _ => None,
                })
                .collect()
        }

        pub fn stiffness_calls(&self) -> Vec<(String, f64)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Stiffness(g, l) => Some((g.clone(), *l)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Actuator for RecordingActuator {
        fn set_angles(&mut self, names: &[&str], values: &[f64], speed: f64) -> Result<()> {
            self.calls.push(Call::Angles(
                names.iter().map(|n| n.to_string()).collect(),
                values.to_vec(),
                speed,
            ));
            if self.fail_angles {
                bail!("motion proxy rejected command");
            }
            Ok(())
        }

        fn set_stiffness(&mut self, group: &str, level: f64) -> Result<()> {
            self.calls.push(Call::Stiffness(group.to_string(), level));
            Ok(())
        }
    }
}
