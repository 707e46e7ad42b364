use crate::{BitId, CoreError, Point, Rgb};

/// Pickup animation progress added per tick.
pub const PICKUP_STEP: f32 = 0.1;

/// One colored particle: a single pixel sample of the target field.
///
/// `carried` and `delivered` are never both set, and once a bit is
/// delivered it cannot be picked up again.
#[derive(Debug, Clone, PartialEq)]
pub struct Bit {
    id: BitId,
    pub position: Point,
    pub color: Rgb,
    /// Destination stored with the bit itself (image and reverse fields).
    pub target: Option<Point>,
    carried: bool,
    delivered: bool,
    pickup_progress: f32,
    pickup_start: Option<Point>,
}

impl Bit {
    pub fn new(id: BitId, position: Point, color: Rgb) -> Self {
        Self {
            id,
            position,
            color,
            target: None,
            carried: false,
            delivered: false,
            pickup_progress: 0.0,
            pickup_start: None,
        }
    }

    pub fn with_target(mut self, target: Point) -> Self {
        self.target = Some(target);
        self
    }

    pub fn id(&self) -> BitId {
        self.id
    }

    pub fn is_carried(&self) -> bool {
        self.carried
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Neither carried nor delivered.
    #[inline]
    pub fn is_available(&self) -> bool {
        !self.carried && !self.delivered
    }

    pub fn pickup_progress(&self) -> f32 {
        self.pickup_progress
    }

    /// Marks the bit as carried and starts the pickup animation from its
    /// current position.
    pub fn pick_up(&mut self) -> Result<(), CoreError> {
        if self.delivered {
            return Err(CoreError::BitDelivered(self.id));
        }
        if self.carried {
            return Err(CoreError::BitCarried(self.id));
        }
        self.carried = true;
        self.pickup_progress = 0.0;
        self.pickup_start = Some(self.position);
        Ok(())
    }

    /// Moves a carried bit towards (or onto) the carrier's jaw point.
    ///
    /// While the pickup animation runs the bit eases from where it was picked
    /// up towards `jaw`; afterwards it is held exactly at `jaw`.
    pub fn follow_jaw(&mut self, jaw: Point) {
        if !self.carried {
            return;
        }
        match self.pickup_start {
            Some(start) if self.pickup_progress < 1.0 => {
                let t = self.pickup_progress + PICKUP_STEP;
                // Absorb accumulated float error so ten steps finish the animation.
                if t >= 1.0 - PICKUP_STEP * 0.01 {
                    self.pickup_progress = 1.0;
                    self.position = jaw;
                } else {
                    self.pickup_progress = t;
                    let eased = t * t * (3.0 - 2.0 * t);
                    self.position = start.lerp(jaw, eased);
                }
            }
            _ => self.position = jaw,
        }
    }

    /// Drops the bit for good at `position`.
    pub fn deliver(&mut self, position: Point) -> Result<(), CoreError> {
        if !self.carried {
            return Err(CoreError::BitNotCarried(self.id));
        }
        self.position = position;
        self.carried = false;
        self.delivered = true;
        self.pickup_progress = 1.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bit() -> Bit {
        Bit::new(BitId::new(0), Point::new(10.0, 10.0), Rgb::new(85, 38, 38))
    }

    #[test]
    fn delivered_bit_cannot_be_picked_up_again() {
        let mut b = bit();
        b.pick_up().unwrap();
        assert!(b.is_carried());
        b.deliver(Point::new(50.0, 60.0)).unwrap();
        assert!(b.is_delivered());
        assert!(!b.is_carried());
        assert_eq!(b.pick_up(), Err(CoreError::BitDelivered(b.id())));
        assert!(b.is_delivered());
    }

    #[test]
    fn second_pickup_is_rejected() {
        let mut b = bit();
        b.pick_up().unwrap();
        assert_eq!(b.pick_up(), Err(CoreError::BitCarried(b.id())));
    }

    #[test]
    fn deliver_requires_carry() {
        let mut b = bit();
        assert!(b.deliver(Point::ZERO).is_err());
        assert!(b.is_available());
    }

    #[test]
    fn pickup_animation_eases_then_holds_at_jaw() {
        let mut b = bit();
        b.pick_up().unwrap();
        let jaw = Point::new(20.0, 10.0);

        b.follow_jaw(jaw);
        // smoothstep(0.1) = 0.028
        assert!((b.position.x - 10.28).abs() < 1e-3);

        for _ in 0..9 {
            b.follow_jaw(jaw);
        }
        assert_eq!(b.pickup_progress(), 1.0);
        assert_eq!(b.position, jaw);

        let moved = Point::new(30.0, 12.0);
        b.follow_jaw(moved);
        assert_eq!(b.position, moved);
    }
}
