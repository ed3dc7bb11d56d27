use uuid::Uuid;

/// Uniform value in `0..upper`.
pub fn below(upper: u32) -> u32 {
    if upper == 0 {
        return 0;
    }
    (Uuid::new_v4().as_u128() % upper as u128) as u32
}

/// Six digit numeric verification code.
pub fn verification_code() -> String {
    (100_000 + below(900_000)).to_string()
}

/// `RDV-<year>-<5 digits>`
pub fn booking_reference(year: i32) -> String {
    format!("RDV-{year}-{}", 10_000 + below(90_000))
}

/// True with the given probability, clamped to `0.0..=1.0`.
pub fn chance(probability: f64) -> bool {
    let permille = (probability.clamp(0.0, 1.0) * 1000.0).round() as u32;
    below(1000) < permille
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_verification_code_shape() {
        for _ in 0..100 {
            let code = verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_booking_reference_shape() {
        let reference = booking_reference(2024);
        let suffix = reference.strip_prefix("RDV-2024-").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.parse::<u32>().unwrap() >= 10_000);
    }

    #[test]
    fn test_chance_bounds() {
        assert!((0..100).all(|_| chance(1.0)));
        assert!((0..100).all(|_| !chance(0.0)));
        assert!((0..100).all(|_| !chance(-3.0)));
    }
}
