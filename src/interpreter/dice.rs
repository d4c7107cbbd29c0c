//=====================================================
// File: interpreter/dice.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Dice notation for the roll() builtin
// Objective: Parse `NdM+K` style dice strings and roll them against the
//            evaluator's random source
//=====================================================

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use super::errors::RuntimeErrorKind;

const MAX_DICE: u32 = 1_000;
const MAX_SIDES: u32 = 1_000_000;
const MAX_MODIFIER: i64 = 1_000_000;

static DICE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d*)\s*d\s*(\d+)\s*(?:([+-])\s*(\d+))?\s*$")
        .expect("dice regex must compile")
});

static CONSTANT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)\s*$").expect("constant regex must compile"));

/// `count` dice of `sides` faces plus a flat `modifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl DiceExpr {
    pub fn min(&self) -> i64 {
        if self.sides == 0 {
            self.modifier
        } else {
            i64::from(self.count) + self.modifier
        }
    }

    pub fn max(&self) -> i64 {
        i64::from(self.count) * i64::from(self.sides) + self.modifier
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        if self.sides == 0 {
            return self.modifier;
        }
        let sides = i64::from(self.sides);
        let total: i64 = (0..self.count).map(|_| rng.gen_range(1..=sides)).sum();
        total + self.modifier
    }
}

impl FromStr for DiceExpr {
    type Err = RuntimeErrorKind;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || RuntimeErrorKind::ArgumentError(format!("invalid dice expression '{}'", text));

        if let Some(caps) = CONSTANT_PATTERN.captures(text) {
            let modifier = caps[1].parse::<i64>().map_err(|_| invalid())?;
            check_modifier(text, modifier)?;
            return Ok(Self {
                count: 0,
                sides: 0,
                modifier,
            });
        }

        let caps = DICE_PATTERN.captures(text).ok_or_else(invalid)?;
        let count = match caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
            Some(digits) => digits.parse::<u32>().map_err(|_| invalid())?,
            None => 1,
        };
        let sides = caps[2].parse::<u32>().map_err(|_| invalid())?;
        let modifier = match (caps.get(3), caps.get(4)) {
            (Some(sign), Some(amount)) => {
                let amount = amount.as_str().parse::<i64>().map_err(|_| invalid())?;
                if sign.as_str() == "-" { -amount } else { amount }
            }
            _ => 0,
        };

        if sides == 0 {
            return Err(RuntimeErrorKind::ArgumentError(format!(
                "dice in '{}' must have at least one side",
                text
            )));
        }
        if count > MAX_DICE || sides > MAX_SIDES {
            return Err(RuntimeErrorKind::ArgumentError(format!(
                "dice expression '{}' exceeds {} dice of {} sides",
                text, MAX_DICE, MAX_SIDES
            )));
        }
        check_modifier(text, modifier)?;

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

// Keeps min(), max() and roll() inside i64 for every accepted expression.
fn check_modifier(text: &str, modifier: i64) -> Result<(), RuntimeErrorKind> {
    if (-MAX_MODIFIER..=MAX_MODIFIER).contains(&modifier) {
        Ok(())
    } else {
        Err(RuntimeErrorKind::ArgumentError(format!(
            "modifier in '{}' exceeds {}",
            text, MAX_MODIFIER
        )))
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sides == 0 {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn parses_common_forms() {
        assert_eq!(
            "2d6+4".parse::<DiceExpr>().unwrap(),
            DiceExpr {
                count: 2,
                sides: 6,
                modifier: 4
            }
        );
        assert_eq!("d20".parse::<DiceExpr>().unwrap().count, 1);
        assert_eq!("3D8 - 2".parse::<DiceExpr>().unwrap().modifier, -2);
        assert_eq!("7".parse::<DiceExpr>().unwrap().max(), 7);
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "2d", "d0", "abc", "2d6+", "2d6*3", "5000d6"] {
            assert!(text.parse::<DiceExpr>().is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn rejects_oversized_modifiers() {
        for text in [
            "1d6+9223372036854775807",
            "1d6-9223372036854775807",
            "9223372036854775807",
            "-1000001",
            "2d6+1000001",
        ] {
            assert!(
                matches!(text.parse::<DiceExpr>(), Err(RuntimeErrorKind::ArgumentError(_))),
                "{text} should be rejected"
            );
        }

        let largest: DiceExpr = "1000d1000000+1000000".parse().unwrap();
        assert_eq!(largest.max(), 1_000_001_000_000);
        assert_eq!("-1000000".parse::<DiceExpr>().unwrap().min(), -1_000_000);
    }

    #[test]
    fn bounds_and_rolls() {
        let dice: DiceExpr = "2d6+4".parse().unwrap();
        assert_eq!((dice.min(), dice.max()), (6, 16));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let value = dice.roll(&mut rng);
            assert!((6..=16).contains(&value));
        }
        assert_eq!(dice.to_string(), "2d6+4");
    }
}

//=====================================================
// End of file
//=====================================================
