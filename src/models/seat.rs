use serde::{Deserialize, Serialize};
use std::fmt;

/// Ключ места внутри сеанса: `"{row}:{seat}"`.
///
/// Ряд и место записываются десятичными числами без ведущих нулей через `:`,
/// поэтому разные пары `(row, seat)` всегда дают разные ключи.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatKey(String);

impl SeatKey {
    pub fn encode(row: u32, seat: u32) -> Self {
        SeatKey(format!("{}:{}", row, seat))
    }

    /// Ключ в том виде, в каком он лежит в хранилище. Формат не проверяется.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        SeatKey(raw.into())
    }

    /// Обратное преобразование. Нужно только при загрузке каталога,
    /// ядро бронирования ключи не разбирает.
    pub fn decode(&self) -> Option<(u32, u32)> {
        let (row, seat) = self.0.split_once(':')?;
        let is_canonical = |s: &str| !s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit());
        if !is_canonical(row) || !is_canonical(seat) {
            return None;
        }
        Some((row.parse().ok()?, seat.parse().ok()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_row_and_seat() {
        assert_eq!(SeatKey::encode(5, 10).as_str(), "5:10");
        assert_eq!(SeatKey::encode(5, 10), SeatKey::encode(5, 10));
    }

    #[test]
    fn digit_concatenation_does_not_collide() {
        assert_ne!(SeatKey::encode(1, 23), SeatKey::encode(12, 3));
        assert_ne!(SeatKey::encode(11, 1), SeatKey::encode(1, 11));
    }

    #[test]
    fn decode_rejects_non_canonical_keys() {
        assert_eq!(SeatKey::from_stored("7:3").decode(), Some((7, 3)));
        assert_eq!(SeatKey::from_stored("07:3").decode(), None);
        assert_eq!(SeatKey::from_stored("7-3").decode(), None);
        assert_eq!(SeatKey::from_stored("7:").decode(), None);
        assert_eq!(SeatKey::from_stored("a:3").decode(), None);
    }

    proptest! {
        #[test]
        fn encode_is_injective(a in (1u32.., 1u32..), b in (1u32.., 1u32..)) {
            prop_assume!(a != b);
            prop_assert_ne!(SeatKey::encode(a.0, a.1), SeatKey::encode(b.0, b.1));
        }

        #[test]
        fn decode_inverts_encode(row in 1u32.., seat in 1u32..) {
            prop_assert_eq!(SeatKey::encode(row, seat).decode(), Some((row, seat)));
        }
    }
}
