/// Readable default player names
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};

/// Training set: gemstones, minerals and building stones
const TRAINING_NAMES: &[&str] = &[
    "Agate", "Amber", "Beryl", "Cobalt", "Coral", "Garnet", "Jasper", "Jade",
    "Onyx", "Opal", "Pearl", "Quartz", "Ruby", "Topaz", "Zircon", "Spinel",
    "Basalt", "Granite", "Marble", "Slate", "Flint", "Gneiss", "Shale", "Pumice",
    "Mica", "Talc", "Gypsum", "Calcite", "Pyrite", "Galena", "Bauxite", "Halite",
    "Tourmaline", "Peridot", "Obsidian", "Citrine", "Olivine", "Azurite", "Malachite", "Rhodonite",
];

const MAX_NAME_LEN: usize = 10;

fn create_name_generator() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(TRAINING_NAMES.iter().copied())
        .build()
}

/// Generate a pronounceable random name made of ASCII letters only
pub fn generate_random_name() -> String {
    let mut generator = create_name_generator();
    loop {
        let name = generator.generate_one();
        if (3..=MAX_NAME_LEN).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphabetic()) {
            return name;
        }
    }
}

/// Generate a random name with a numeric suffix, e.g. "Garnite_417"
pub fn generate_unique_name() -> String {
    let base_name = generate_random_name();
    let suffix: u16 = rand::random::<u16>() % 1000;
    format!("{}_{}", base_name, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_name() {
        for _ in 0..10 {
            let name = generate_random_name();
            assert!((3..=MAX_NAME_LEN).contains(&name.len()), "{}", name);
            assert!(name.chars().all(|c| c.is_ascii_alphabetic()), "{}", name);
        }
    }

    #[test]
    fn test_generate_unique_name() {
        let name = generate_unique_name();
        let (base, suffix) = name.rsplit_once('_').expect("suffix separator");
        assert!(!base.is_empty());
        assert!(suffix.parse::<u16>().unwrap() < 1000);
    }
}
