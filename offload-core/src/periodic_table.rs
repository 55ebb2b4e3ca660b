use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

macro_rules! elements {
    ($($symbol:ident = $number:literal),* $(,)?) => {
        /// A chemical element. The discriminant is the nuclear charge.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum ElementType {
            $($symbol = $number),*
        }

        impl ElementType {
            pub fn from_atomic_number(number: u64) -> Option<Self> {
                match number {
                    $($number => Some(Self::$symbol),)*
                    _ => None,
                }
            }

            pub fn from_symbol(symbol: &str) -> Option<Self> {
                match symbol {
                    $(stringify!($symbol) => Some(Self::$symbol),)*
                    _ => None,
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(Self::$symbol => stringify!($symbol)),*
                }
            }
        }
    };
}

elements! {
    H = 1, He = 2,
    Li = 3, Be = 4, B = 5, C = 6, N = 7, O = 8, F = 9, Ne = 10,
    Na = 11, Mg = 12, Al = 13, Si = 14, P = 15, S = 16, Cl = 17, Ar = 18,
    K = 19, Ca = 20, Sc = 21, Ti = 22, V = 23, Cr = 24, Mn = 25, Fe = 26, Co = 27,
    Ni = 28, Cu = 29, Zn = 30, Ga = 31, Ge = 32, As = 33, Se = 34, Br = 35, Kr = 36,
}

impl ElementType {
    pub fn atomic_number(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for ElementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

// Basis Set Exchange keys elements by atomic number ("8"), molecule files use
// symbols ("O"), so both spellings are accepted.
impl<'de> Deserialize<'de> for ElementType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ElementVisitor;

        impl de::Visitor<'_> for ElementVisitor {
            type Value = ElementType;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an element symbol or atomic number")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                ElementType::from_atomic_number(value)
                    .ok_or_else(|| E::custom(format!("unknown atomic number {value}")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u64::try_from(value)
                    .map_err(|_| E::custom(format!("negative atomic number {value}")))
                    .and_then(|value| self.visit_u64(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                match value.parse::<u64>() {
                    Ok(number) => self.visit_u64(number),
                    Err(_) => ElementType::from_symbol(value)
                        .ok_or_else(|| E::custom(format!("unknown element {value:?}"))),
                }
            }
        }

        deserializer.deserialize_any(ElementVisitor)
    }
}
