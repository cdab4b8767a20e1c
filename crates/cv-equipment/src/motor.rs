//! Motor command surface.

use serde::Deserialize;

use cv_core::SpeedProfile;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn flipped(self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// What a phase handler may do to a motor.
///
/// Kinematics are the host's business: the handler switches the motor and
/// reads back the configured limits to time its own waits.
pub trait Motor {
    fn motor_on(&mut self);
    fn motor_off(&mut self);
    fn is_on(&self) -> bool;

    /// Commanded running speed (m/s).
    fn speed(&self) -> f64;
    fn set_speed(&mut self, speed: f64);

    fn acceleration(&self) -> f64;
    fn deceleration(&self) -> f64;

    fn direction(&self) -> Direction;
    fn set_direction(&mut self, direction: Direction);

    /// Configured top speed, regardless of any temporary slow-down.
    fn rated_speed(&self) -> f64;

    /// Restore the commanded speed to the configured top speed.
    fn reset_speed(&mut self);
}

/// Software motor: a speed profile plus on/off, commanded speed and direction.
#[derive(Clone, Debug, PartialEq)]
pub struct SimMotor {
    profile:   SpeedProfile,
    speed:     f64,
    on:        bool,
    direction: Direction,
}

impl SimMotor {
    pub fn new(profile: SpeedProfile) -> Self {
        Self {
            profile,
            speed:     profile.max,
            on:        false,
            direction: Direction::Forward,
        }
    }

    pub fn profile(&self) -> &SpeedProfile {
        &self.profile
    }

    /// Replace the profile and reset the commanded speed to its top speed.
    pub fn set_profile(&mut self, profile: SpeedProfile) {
        self.profile = profile;
        self.speed = profile.max;
    }
}

impl Motor for SimMotor {
    fn motor_on(&mut self) {
        self.on = true;
    }

    fn motor_off(&mut self) {
        self.on = false;
    }

    fn is_on(&self) -> bool {
        self.on
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    fn acceleration(&self) -> f64 {
        self.profile.acc
    }

    fn deceleration(&self) -> f64 {
        self.profile.dec
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    fn rated_speed(&self) -> f64 {
        self.profile.max
    }

    fn reset_speed(&mut self) {
        self.speed = self.profile.max;
    }
}
