//! Two-phase approach model.
//!
//! A note becomes visible one approach window before it arrives. In the
//! first half of the window it grows in place near the centre, in the second
//! half it travels out to the judgment ring. After arrival it either stays on
//! the ring (holds, until released) or drifts outward while fading.

/// Approach window at hi-speed 1, in milliseconds.
pub const BASE_WINDOW_MS: f64 = 4800.0;

/// Radius (fraction of the ring) at which notes appear.
pub const SPAWN_RADIUS: f64 = 0.25;

/// Extra radius travelled while fading out.
const FADE_DRIFT: f64 = 0.2;

/// Approach window for a hi-speed setting.
pub fn window_ms(hi_speed: f64) -> f64 {
    BASE_WINDOW_MS / hi_speed.clamp(crate::config::MIN_HI_SPEED, crate::config::MAX_HI_SPEED)
}

/// Where a note is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Hidden,
    /// Growing at the spawn radius; `scale` runs 0 to 1.
    Growing { scale: f64 },
    /// Moving outward; `progress` runs 0 (spawn) to 1 (ring).
    Travelling { progress: f64 },
    /// Arrived and held on the ring.
    Holding,
    /// Past release; `progress` runs 0 to 1 as it fades.
    Fading { progress: f64 },
}

/// Drawing parameters for a phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Distance from the centre as a fraction of the ring radius.
    pub radius: f64,
    /// Size multiplier for the note glyph.
    pub scale: f64,
    /// Opacity, 0-1.
    pub alpha: f64,
}

/// Approach timing for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    window_ms: f64,
}

impl Approach {
    pub fn new(hi_speed: f64) -> Self {
        Self {
            window_ms: window_ms(hi_speed),
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    /// Length of the fade after release: one approach phase.
    pub fn fade_ms(&self) -> f64 {
        self.window_ms / 2.0
    }

    /// Phase of a note arriving at `arrival_ms` and released at
    /// `release_ms` (equal for non-hold notes).
    pub fn phase(&self, arrival_ms: f64, release_ms: f64, now_ms: f64) -> Phase {
        let half = self.window_ms / 2.0;
        let until = arrival_ms - now_ms;
        if until > self.window_ms {
            Phase::Hidden
        } else if until > half {
            Phase::Growing {
                scale: 1.0 - (until - half) / half,
            }
        } else if until > 0.0 {
            Phase::Travelling {
                progress: 1.0 - until / half,
            }
        } else if now_ms <= release_ms {
            Phase::Holding
        } else {
            let since = now_ms - release_ms;
            if since < self.fade_ms() {
                Phase::Fading {
                    progress: since / self.fade_ms(),
                }
            } else {
                Phase::Hidden
            }
        }
    }

    /// Whether a note spanning `arrival_ms..release_ms` is on screen.
    pub fn is_visible(&self, arrival_ms: f64, release_ms: f64, now_ms: f64) -> bool {
        self.phase(arrival_ms, release_ms, now_ms) != Phase::Hidden
    }

    /// Radius a note arriving at `arrival_ms` would have now, clamped to the
    /// spawn radius while it is still too far away to be shown. Used for the
    /// far end of holds.
    pub fn radius_toward(&self, arrival_ms: f64, now_ms: f64) -> f64 {
        match self.phase(arrival_ms, arrival_ms, now_ms) {
            Phase::Travelling { progress } => SPAWN_RADIUS + (1.0 - SPAWN_RADIUS) * progress,
            Phase::Hidden if arrival_ms > now_ms => SPAWN_RADIUS,
            Phase::Growing { .. } => SPAWN_RADIUS,
            _ => 1.0,
        }
    }
}

impl Phase {
    /// Converts the phase to drawing parameters. `None` when hidden.
    pub fn placement(self) -> Option<Placement> {
        match self {
            Phase::Hidden => None,
            Phase::Growing { scale } => Some(Placement {
                radius: SPAWN_RADIUS,
                scale,
                alpha: 1.0,
            }),
            Phase::Travelling { progress } => Some(Placement {
                radius: SPAWN_RADIUS + (1.0 - SPAWN_RADIUS) * progress,
                scale: 1.0,
                alpha: 1.0,
            }),
            Phase::Holding => Some(Placement {
                radius: 1.0,
                scale: 1.0,
                alpha: 1.0,
            }),
            Phase::Fading { progress } => Some(Placement {
                radius: 1.0 + FADE_DRIFT * progress,
                scale: 1.0,
                alpha: 1.0 - progress,
            }),
        }
    }

    /// Approach completion from 0 (appeared) to 1 (arrived).
    pub fn completion(self) -> f64 {
        match self {
            Phase::Hidden => 0.0,
            Phase::Growing { scale } => scale * 0.5,
            Phase::Travelling { progress } => 0.5 + progress * 0.5,
            Phase::Holding | Phase::Fading { .. } => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_scales_inversely() {
        assert_eq!(window_ms(6.0), 800.0);
        assert_eq!(window_ms(3.0), 1600.0);
        assert_eq!(window_ms(100.0), window_ms(9.0));
    }

    #[test]
    fn test_phases_in_order() {
        let a = Approach::new(6.0); // 800ms window
        assert_eq!(a.phase(1000.0, 1000.0, 100.0), Phase::Hidden);
        assert_eq!(a.phase(1000.0, 1000.0, 400.0), Phase::Growing { scale: 0.5 });
        assert_eq!(a.phase(1000.0, 1000.0, 800.0), Phase::Travelling { progress: 0.5 });
        assert_eq!(a.phase(1000.0, 1000.0, 1000.0), Phase::Holding);
        assert_eq!(a.phase(1000.0, 1000.0, 1100.0), Phase::Fading { progress: 0.25 });
        assert_eq!(a.phase(1000.0, 1000.0, 1300.0), Phase::Fading { progress: 0.75 });
        assert_eq!(a.phase(1000.0, 1000.0, 1400.0), Phase::Hidden);
    }

    #[test]
    fn test_hold_stays_on_ring_until_release() {
        let a = Approach::new(6.0);
        assert_eq!(a.phase(1000.0, 3000.0, 2500.0), Phase::Holding);
        let placement = a.phase(1000.0, 3000.0, 2500.0).placement().unwrap();
        assert_eq!(placement.radius, 1.0);
    }

    #[test]
    fn test_travel_reaches_ring() {
        let a = Approach::new(6.0);
        let p = a.phase(1000.0, 1000.0, 999.999).placement().unwrap();
        assert!((p.radius - 1.0).abs() < 1e-3);
        let fading = a.phase(1000.0, 1000.0, 1250.0).placement().unwrap();
        assert!(fading.radius > 1.0 && fading.alpha < 0.5);
    }

    #[test]
    fn test_radius_toward() {
        let a = Approach::new(6.0);
        assert_eq!(a.radius_toward(5000.0, 0.0), SPAWN_RADIUS);
        assert_eq!(a.radius_toward(1000.0, 800.0), SPAWN_RADIUS + (1.0 - SPAWN_RADIUS) * 0.5);
        assert_eq!(a.radius_toward(1000.0, 2000.0), 1.0);
    }

    #[test]
    fn test_fade_matches_one_approach_phase() {
        let a = Approach::new(6.0);
        assert_eq!(a.fade_ms(), a.window_ms() / 2.0);
        // a hold fades for the same time after its release
        assert!(a.is_visible(1000.0, 3000.0, 3399.0));
        assert!(!a.is_visible(1000.0, 3000.0, 3400.0));
    }
}
