//! Lamp animation state.

use glam::{Vec3, Vec4};
use rand::Rng;

/// Initial glow depth.
pub const LAMP_DEPTH: f32 = 0.03;
/// Initial lamp color.
pub const LAMP_COLOR: Vec4 = Vec4::new(0.3, 0.15, 0.15, 1.0);

/// Moves a value back and forth between `min` and `max` at a random speed,
/// picking a new speed at every bounce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimmer {
    /// Change per second.
    pub factor: f32,
    pub factor_min: f32,
    pub factor_max: f32,
    /// Direction: true moves towards `max`.
    pub add: bool,
    pub min: f32,
    pub max: f32,
}

impl Dimmer {
    /// Dimmer moving down, with a speed drawn from `[factor_min, factor_max]`.
    pub fn new(min: f32, max: f32, factor_min: f32, factor_max: f32, rng: &mut impl Rng) -> Self {
        let mut dimmer = Self {
            factor: 0.0,
            factor_min,
            factor_max,
            add: false,
            min,
            max,
        };
        dimmer.next_factor(rng);
        dimmer
    }

    /// Start moving up instead of down.
    pub fn rising(mut self) -> Self {
        self.add = true;
        self
    }

    /// Step `value` by `dt` seconds and return the new value.
    pub fn update(&mut self, dt: f32, value: f32, rng: &mut impl Rng) -> f32 {
        let step = self.factor * dt;
        let value = if self.add { value + step } else { value - step };

        if value > self.max {
            self.add = false;
            self.next_factor(rng);
        } else if value < self.min {
            self.add = true;
            self.next_factor(rng);
        }

        value
    }

    pub fn next_factor(&mut self, rng: &mut impl Rng) {
        self.factor = if self.factor_max > self.factor_min {
            rng.gen_range(self.factor_min..=self.factor_max)
        } else {
            self.factor_min
        };
    }
}

/// The lamp: a color and a glow depth, animated by dimmers while auto play
/// is on.
pub struct Lamp<R: Rng> {
    pub depth: f32,
    pub color: Vec4,
    pub auto_play: bool,
    depth_dimmer: Dimmer,
    color_dimmers: [Dimmer; 4],
    rng: R,
}

impl<R: Rng> Lamp<R> {
    pub fn new(mut rng: R) -> Self {
        let depth_dimmer = Dimmer::new(0.01, 0.03, 0.000_01, 0.0001, &mut rng);
        let color = |rng: &mut R| Dimmer::new(0.0, 1.0, 0.0005, 0.02, rng);
        let color_dimmers = [
            color(&mut rng).rising(),
            color(&mut rng).rising(),
            color(&mut rng),
            Dimmer {
                min: 0.2,
                ..color(&mut rng)
            },
        ];

        Self {
            depth: LAMP_DEPTH,
            color: LAMP_COLOR,
            auto_play: true,
            depth_dimmer,
            color_dimmers,
            rng,
        }
    }

    /// Advance the animation by `dt` seconds of run time.
    pub fn update(&mut self, dt: f32) {
        if !self.auto_play {
            return;
        }

        self.depth = self.depth_dimmer.update(dt, self.depth, &mut self.rng);

        let mut channels = self.color.to_array();
        for (channel, dimmer) in channels.iter_mut().zip(&mut self.color_dimmers) {
            *channel = dimmer.update(dt, *channel, &mut self.rng);
        }
        self.color = Vec4::from_array(channels);
    }

    pub fn toggle_auto_play(&mut self) {
        self.auto_play = !self.auto_play;
    }

    /// Color to fill the backbuffer with: the lamp blended over `ground` by
    /// its alpha, brighter the deeper it glows.
    pub fn shade(&self, ground: [f32; 4]) -> [f32; 4] {
        let ground = Vec3::new(ground[0], ground[1], ground[2]);
        let alpha = self.color.w.clamp(0.0, 1.0);
        let glow = ((self.depth - 0.01) / 0.02).clamp(0.0, 1.0);
        let lamp = self.color.truncate() * (0.8 + 0.4 * glow);

        let rgb = ground.lerp(lamp, alpha).clamp(Vec3::ZERO, Vec3::ONE);
        [rgb.x, rgb.y, rgb.z, 1.0]
    }
}
