//! Identifier generation.
//!
//! Class names are random adjective-animal pairs (`SwiftPenguin`); variables
//! and methods draw from class-wide counters so no two declarations ever
//! share a name: `a`..`z`, `aa`..`zz`, `aaa`.. for variables and
//! `methodA`, `methodB`, .., `methodAa`.. for methods.

use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "Amber", "Bold", "Brisk", "Calm", "Clever", "Cosmic", "Crisp", "Dapper", "Eager", "Fierce",
    "Gentle", "Glowing", "Hasty", "Humble", "Jolly", "Keen", "Lively", "Lucky", "Mellow", "Nimble",
    "Proud", "Quick", "Quiet", "Rapid", "Rustic", "Silent", "Sleek", "Spry", "Steady", "Swift",
    "Tidy", "Vivid", "Wary", "Witty", "Zesty",
];

const ANIMALS: &[&str] = &[
    "Badger", "Beaver", "Bison", "Cobra", "Condor", "Coyote", "Crane", "Dingo", "Falcon", "Ferret",
    "Gecko", "Heron", "Ibex", "Jackal", "Koala", "Lemur", "Lynx", "Marmot", "Moose", "Narwhal",
    "Ocelot", "Otter", "Panda", "Penguin", "Puffin", "Quokka", "Raven", "Salmon", "Stoat", "Tapir",
    "Toucan", "Walrus", "Weasel", "Wombat", "Yak",
];

/// A random class name such as `SwiftPenguin`.
pub fn class_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Plain");
    let animal = ANIMALS.choose(rng).copied().unwrap_or("Class");
    format!("{adjective}{animal}")
}

/// Class-wide counters for fresh identifiers.
#[derive(Debug, Clone, Default)]
pub struct NameGen {
    vars: usize,
    methods: usize,
}

impl NameGen {
    /// Next variable name. Shared by fields, locals and loop counters.
    pub fn var(&mut self) -> String {
        let name = repeat_letter(self.vars, false);
        self.vars += 1;
        name
    }

    /// Next method name.
    pub fn method(&mut self) -> String {
        let suffix = repeat_letter(self.methods, true);
        self.methods += 1;
        format!("method{suffix}")
    }
}

/// `i = 0 -> "a"`, `25 -> "z"`, `26 -> "aa"`; with `capitalize`, `26 -> "Aa"`.
fn repeat_letter(i: usize, capitalize: bool) -> String {
    let letter = char::from(b'a' + (i % 26) as u8);
    let count = i / 26 + 1;
    let mut out = String::with_capacity(count);
    for n in 0..count {
        out.push(if capitalize && n == 0 {
            letter.to_ascii_uppercase()
        } else {
            letter
        });
    }
    out
}

/// Parameter names are positional and never collide with generated
/// variables.
pub fn param_name(index: usize) -> String {
    format!("p{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn variable_names_roll_over() {
        let mut names = NameGen::default();
        let first: Vec<String> = (0..28).map(|_| names.var()).collect();
        assert_eq!(first[0], "a");
        assert_eq!(first[25], "z");
        assert_eq!(first[26], "aa");
        assert_eq!(first[27], "bb");
    }

    #[test]
    fn method_names_are_capitalized() {
        let mut names = NameGen::default();
        let all: Vec<String> = (0..27).map(|_| names.method()).collect();
        assert_eq!(all[0], "methodA");
        assert_eq!(all[1], "methodB");
        assert_eq!(all[26], "methodAa");
    }

    #[test]
    fn names_are_unique() {
        let mut names = NameGen::default();
        let vars: HashSet<String> = (0..200).map(|_| names.var()).collect();
        assert_eq!(vars.len(), 200);
        assert!(!vars.contains(&param_name(0)));
    }

    #[test]
    fn class_names_are_identifiers() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let name = class_name(&mut rng);
            assert!(name.chars().next().is_some_and(|c| c.is_ascii_uppercase()));
            assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
