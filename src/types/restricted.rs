//! Integer types constrained by a value range and inclusion/exclusion sets.
//!
//! A [`RestrictedInt`] describes a subset of `int`: the values in its range
//! (minus exclusions) plus any explicit inclusions. Array lengths are the main
//! consumer: an array-init builder asks for one restricted length per
//! dimension so that no generated array is smaller than a safe minimum.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use rand::seq::IteratorRandom;

use super::TypeError;

/// Ranges at most this much wider than the exclusion set are enumerated
/// instead of sampled.
const ENUMERATE_SLACK: u64 = 64;

// ---------------------------------------------------------------------------
// IntRange
// ---------------------------------------------------------------------------

/// An inclusive `[min, max]` interval of `int` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl IntRange {
    /// Create `[min, max]`. Fails when `min > max`.
    pub fn new(min: i32, max: i32) -> Result<Self, TypeError> {
        if min > max {
            return Err(TypeError::EmptyRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }

    /// True if every value of `other` lies in `self`.
    pub fn contains_range(&self, other: &IntRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Number of values in the range.
    pub fn width(&self) -> u64 {
        (i64::from(self.max) - i64::from(self.min)) as u64 + 1
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// RestrictedInt
// ---------------------------------------------------------------------------

/// An `int` whose admissible values are `inclusions ∪ (range \ exclusions)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestrictedInt {
    range: Option<IntRange>,
    inclusions: BTreeSet<i32>,
    exclusions: BTreeSet<i32>,
}

impl RestrictedInt {
    /// Build a restricted int. Either a range or at least one inclusion is
    /// required.
    pub fn new(
        range: Option<IntRange>,
        inclusions: impl IntoIterator<Item = i32>,
        exclusions: impl IntoIterator<Item = i32>,
    ) -> Result<Self, TypeError> {
        let inclusions: BTreeSet<i32> = inclusions.into_iter().collect();
        if range.is_none() && inclusions.is_empty() {
            return Err(TypeError::UnconstrainedRestrictedInt);
        }
        Ok(Self {
            range,
            inclusions,
            exclusions: exclusions.into_iter().collect(),
        })
    }

    /// A restricted int covering exactly `range`.
    pub fn with_range(range: IntRange) -> Self {
        Self {
            range: Some(range),
            inclusions: BTreeSet::new(),
            exclusions: BTreeSet::new(),
        }
    }

    pub fn range(&self) -> Option<IntRange> {
        self.range
    }

    pub fn inclusions(&self) -> &BTreeSet<i32> {
        &self.inclusions
    }

    pub fn exclusions(&self) -> &BTreeSet<i32> {
        &self.exclusions
    }

    /// Whether `value` is admissible under this type.
    pub fn is_valid(&self, value: i32) -> bool {
        if self.inclusions.contains(&value) {
            return true;
        }
        match self.range {
            Some(range) => range.contains(value) && !self.exclusions.contains(&value),
            None => false,
        }
    }

    /// `self = other` is legal without a cast.
    ///
    /// Holds iff `other`'s range is absent or contained in ours, none of our
    /// exclusions is admissible under `other`, and all of `other`'s
    /// inclusions are admissible under us.
    pub fn is_assignable_from(&self, other: &RestrictedInt) -> bool {
        let range_ok = match other.range {
            None => true,
            Some(theirs) => self.range.is_some_and(|ours| ours.contains_range(&theirs)),
        };
        range_ok
            && !self.exclusions.iter().any(|&e| other.is_valid(e))
            && other.inclusions.iter().all(|&i| self.is_valid(i))
    }

    /// Draw an admissible value, or `None` when the type admits nothing.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<i32> {
        let from_inclusions = !self.inclusions.is_empty()
            && (self.range.is_none() || rng.gen_bool(0.5));
        if from_inclusions {
            return self.inclusions.iter().copied().choose(rng);
        }
        let Some(range) = self.range else {
            return self.inclusions.iter().copied().choose(rng);
        };
        let excluded_in_range = self.exclusions.iter().filter(|&&e| range.contains(e)).count();
        if range.width() <= excluded_in_range as u64 + ENUMERATE_SLACK {
            return (range.min..=range.max)
                .filter(|v| !self.exclusions.contains(v))
                .chain(self.inclusions.iter().copied())
                .choose(rng);
        }
        // The range is wider than the exclusion set, so walking forward from
        // any start finds an admissible value within `excluded_in_range` steps.
        let mut value = rng.gen_range(range.min..=range.max);
        while self.exclusions.contains(&value) {
            value = if value == range.max { range.min } else { value + 1 };
        }
        Some(value)
    }

    /// Canonical descriptor fragment, e.g. `I[10,64]+{1}-{0}`.
    pub fn descriptor(&self) -> String {
        let mut out = String::from("I");
        if let Some(range) = self.range {
            out.push_str(&range.to_string());
        }
        if !self.inclusions.is_empty() {
            out.push('+');
            push_set(&mut out, &self.inclusions);
        }
        if !self.exclusions.is_empty() {
            out.push('-');
            push_set(&mut out, &self.exclusions);
        }
        out
    }
}

fn push_set(out: &mut String, set: &BTreeSet<i32>) {
    out.push('{');
    let items: Vec<String> = set.iter().map(i32::to_string).collect();
    out.push_str(&items.join(","));
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rint(range: Option<(i32, i32)>, incl: &[i32], excl: &[i32]) -> RestrictedInt {
        let range = range.map(|(lo, hi)| IntRange::new(lo, hi).unwrap());
        RestrictedInt::new(range, incl.iter().copied(), excl.iter().copied()).unwrap()
    }

    #[test]
    fn requires_range_or_inclusions() {
        assert!(matches!(
            RestrictedInt::new(None, [], []),
            Err(TypeError::UnconstrainedRestrictedInt)
        ));
        assert!(RestrictedInt::new(None, [3], []).is_ok());
    }

    #[test]
    fn empty_range_rejected() {
        assert!(IntRange::new(5, 4).is_err());
        assert_eq!(IntRange::new(4, 4).unwrap().width(), 1);
    }

    #[test]
    fn validity_combines_range_and_sets() {
        let t = rint(Some((0, 10)), &[42], &[5]);
        assert!(t.is_valid(0));
        assert!(t.is_valid(42));
        assert!(!t.is_valid(5));
        assert!(!t.is_valid(11));
    }

    #[test]
    fn narrower_range_is_assignable() {
        let wide = rint(Some((0, 100)), &[], &[]);
        let narrow = rint(Some((10, 20)), &[], &[]);
        assert!(wide.is_assignable_from(&narrow));
        assert!(!narrow.is_assignable_from(&wide));
    }

    #[test]
    fn exclusion_valid_under_source_blocks_assignment() {
        let target = rint(Some((0, 100)), &[], &[15]);
        let source = rint(Some((10, 20)), &[], &[]);
        assert!(!target.is_assignable_from(&source));
        let source_without = rint(Some((10, 20)), &[], &[15]);
        assert!(target.is_assignable_from(&source_without));
    }

    #[test]
    fn inclusions_must_be_valid_under_target() {
        let target = rint(Some((0, 10)), &[], &[]);
        assert!(target.is_assignable_from(&rint(None, &[3, 7], &[])));
        assert!(!target.is_assignable_from(&rint(None, &[3, 70], &[])));
    }

    #[test]
    fn rangeless_target_needs_rangeless_source() {
        let target = rint(None, &[1, 2, 3], &[]);
        assert!(target.is_assignable_from(&rint(None, &[2], &[])));
        assert!(!target.is_assignable_from(&rint(Some((1, 2)), &[], &[])));
    }

    /// Assignability agrees with "every value admissible under the source
    /// is admissible under the target" on a small universe where both
    /// definitions can be checked exhaustively.
    #[test]
    fn assignability_is_sound_on_small_universe() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let a = random_small(&mut rng);
            let b = random_small(&mut rng);
            if a.is_assignable_from(&b) {
                for v in -5..=25 {
                    if b.is_valid(v) {
                        assert!(a.is_valid(v), "{} <- {} leaks {v}", a.descriptor(), b.descriptor());
                    }
                }
            }
        }
    }

    fn random_small(rng: &mut impl Rng) -> RestrictedInt {
        let range = if rng.gen_bool(0.8) {
            let lo = rng.gen_range(0..10);
            Some(IntRange::new(lo, lo + rng.gen_range(0..10)).unwrap())
        } else {
            None
        };
        let incl: Vec<i32> = (0..rng.gen_range(0..3)).map(|_| rng.gen_range(0..20)).collect();
        let excl: Vec<i32> = (0..rng.gen_range(0..3)).map(|_| rng.gen_range(0..20)).collect();
        let incl = if range.is_none() && incl.is_empty() { vec![1] } else { incl };
        RestrictedInt::new(range, incl, excl).unwrap()
    }

    #[test]
    fn samples_are_valid() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let types = [
            rint(Some((10, 64)), &[], &[]),
            rint(Some((0, 3)), &[100], &[0, 1, 2]),
            rint(Some((i32::MIN, i32::MAX)), &[], &[0]),
            rint(None, &[7, 9], &[]),
        ];
        for t in &types {
            for _ in 0..200 {
                let v = t.sample(&mut rng).unwrap();
                assert!(t.is_valid(v), "{} produced {v}", t.descriptor());
            }
        }
    }

    #[test]
    fn unsatisfiable_sample_is_none() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let t = rint(Some((0, 1)), &[], &[0, 1]);
        assert_eq!(t.sample(&mut rng), None);
    }

    #[test]
    fn descriptor_is_canonical() {
        let a = rint(Some((0, 9)), &[3, 1], &[5]);
        let b = rint(Some((0, 9)), &[1, 3, 3], &[5]);
        assert_eq!(a.descriptor(), "I[0,9]+{1,3}-{5}");
        assert_eq!(a.descriptor(), b.descriptor());
    }
}
