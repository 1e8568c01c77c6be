//! Pure contact classification. Physics events arrive as raw entity pairs;
//! this module turns them into cart-part vs surface-kind facts and answers
//! the roof-landing angle test.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartPart {
    Chassis,
    RearWheel,
    FrontWheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Ground,
    Hazard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Started,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticContact {
    pub part: CartPart,
    pub surface: SurfaceKind,
    pub phase: ContactPhase,
}

/// Pairs a cart part with a course surface regardless of which side of the
/// event each came in on. Contacts that are not part-vs-surface are dropped.
pub fn classify_pair(
    first: Option<CartPart>,
    first_surface: Option<SurfaceKind>,
    second: Option<CartPart>,
    second_surface: Option<SurfaceKind>,
    phase: ContactPhase,
) -> Option<SemanticContact> {
    match (first, first_surface, second, second_surface) {
        (Some(part), _, _, Some(surface)) | (_, Some(surface), Some(part), _) => {
            Some(SemanticContact {
                part,
                surface,
                phase,
            })
        }
        _ => None,
    }
}

/// True when the chassis is upside down enough that a ground contact counts
/// as landing on the roof. The window is open-ended in normalized degrees.
pub fn roof_landing(chassis_angle_rad: f32) -> bool {
    let degrees = chassis_angle_rad.to_degrees().rem_euclid(360.0);
    degrees > 30.0 && degrees < 210.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_part_on_either_side() {
        let forward = classify_pair(
            Some(CartPart::RearWheel),
            None,
            None,
            Some(SurfaceKind::Ground),
            ContactPhase::Started,
        );
        let flipped = classify_pair(
            None,
            Some(SurfaceKind::Ground),
            Some(CartPart::RearWheel),
            None,
            ContactPhase::Started,
        );
        let expected = Some(SemanticContact {
            part: CartPart::RearWheel,
            surface: SurfaceKind::Ground,
            phase: ContactPhase::Started,
        });
        assert_eq!(forward, expected);
        assert_eq!(flipped, expected);
    }

    #[test]
    fn ignores_pairs_without_a_cart_part_and_surface() {
        assert_eq!(
            classify_pair(None, None, None, None, ContactPhase::Started),
            None
        );
        assert_eq!(
            classify_pair(
                Some(CartPart::Chassis),
                None,
                Some(CartPart::FrontWheel),
                None,
                ContactPhase::Stopped,
            ),
            None
        );
    }

    #[test]
    fn roof_window_covers_upside_down_angles() {
        assert!(roof_landing(std::f32::consts::PI));
        assert!(roof_landing(35.0_f32.to_radians()));
        assert!(roof_landing(-200.0_f32.to_radians()));
    }

    #[test]
    fn roof_window_excludes_upright_and_wheelie_angles() {
        assert!(!roof_landing(0.0));
        assert!(!roof_landing(20.0_f32.to_radians()));
        assert!(!roof_landing(-10.0_f32.to_radians()));
        assert!(!roof_landing(260.0_f32.to_radians()));
        assert!(!roof_landing(350.0_f32.to_radians()));
    }
}
